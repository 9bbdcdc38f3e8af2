//! Streaming checksums for export bundle verification.
//!
//! The export service publishes an MD5 digest of each compressed bundle.
//! Bytes are hashed as they arrive so a bundle is never read twice.

use std::fmt;
use std::str::FromStr;

use md5::Md5;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Buffer size for reading files during checksum calculation (64KB).
pub(crate) const BUFFER_SIZE: usize = 64 * 1024;

/// Digest algorithm applied to compressed bundles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    /// MD5, as published by the export service.
    #[default]
    Md5,
    Sha256,
}

impl ChecksumAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChecksumAlgorithm::Md5 => "md5",
            ChecksumAlgorithm::Sha256 => "sha256",
        }
    }

    /// Start a new streaming computation.
    pub fn hasher(&self) -> StreamingChecksum {
        match self {
            ChecksumAlgorithm::Md5 => StreamingChecksum::Md5(Md5::new()),
            ChecksumAlgorithm::Sha256 => StreamingChecksum::Sha256(Sha256::new()),
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChecksumAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "md5" => Ok(ChecksumAlgorithm::Md5),
            "sha256" | "sha-256" => Ok(ChecksumAlgorithm::Sha256),
            other => Err(format!("unknown checksum algorithm '{}'", other)),
        }
    }
}

/// Incremental digest state, fed chunk by chunk.
#[derive(Clone)]
pub enum StreamingChecksum {
    Md5(Md5),
    Sha256(Sha256),
}

impl fmt::Debug for StreamingChecksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamingChecksum::Md5(_) => f.write_str("StreamingChecksum::Md5"),
            StreamingChecksum::Sha256(_) => f.write_str("StreamingChecksum::Sha256"),
        }
    }
}

impl StreamingChecksum {
    pub fn update(&mut self, bytes: &[u8]) {
        match self {
            StreamingChecksum::Md5(h) => h.update(bytes),
            StreamingChecksum::Sha256(h) => h.update(bytes),
        }
    }

    /// Finish and return the lowercase hexadecimal digest.
    pub fn finalize_hex(self) -> String {
        match self {
            StreamingChecksum::Md5(h) => format!("{:x}", h.finalize()),
            StreamingChecksum::Sha256(h) => format!("{:x}", h.finalize()),
        }
    }
}

/// Compare two hex digests ignoring case and surrounding whitespace.
pub fn checksums_match(expected: &str, actual: &str) -> bool {
    expected.trim().eq_ignore_ascii_case(actual.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest(algorithm: ChecksumAlgorithm, bytes: &[u8]) -> String {
        let mut hasher = algorithm.hasher();
        hasher.update(bytes);
        hasher.finalize_hex()
    }

    #[test]
    fn test_md5_known_value() {
        assert_eq!(
            digest(ChecksumAlgorithm::Md5, b"hello world"),
            "5eb63bbbe01eeed093cb22bb8f5acdc3"
        );
    }

    #[test]
    fn test_sha256_known_value() {
        assert_eq!(
            digest(ChecksumAlgorithm::Sha256, b"hello world"),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_chunked_update_matches_single_update() {
        let data = vec![0xABu8; 100_000];
        let mut chunked = ChecksumAlgorithm::Md5.hasher();
        for chunk in data.chunks(7_000) {
            chunked.update(chunk);
        }
        assert_eq!(chunked.finalize_hex(), digest(ChecksumAlgorithm::Md5, &data));
    }

    #[test]
    fn test_checksums_match_ignores_case() {
        assert!(checksums_match(
            "5EB63BBBE01EEED093CB22BB8F5ACDC3",
            "5eb63bbbe01eeed093cb22bb8f5acdc3"
        ));
        assert!(!checksums_match("abc", "abd"));
    }

    #[test]
    fn test_algorithm_parse() {
        assert_eq!("MD5".parse::<ChecksumAlgorithm>().unwrap(), ChecksumAlgorithm::Md5);
        assert_eq!(
            "sha256".parse::<ChecksumAlgorithm>().unwrap(),
            ChecksumAlgorithm::Sha256
        );
        assert!("crc32".parse::<ChecksumAlgorithm>().is_err());
        assert_eq!(ChecksumAlgorithm::default(), ChecksumAlgorithm::Md5);
    }
}
