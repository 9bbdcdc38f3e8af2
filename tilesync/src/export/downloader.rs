//! Verified download and install of export bundles.

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::checksum::{checksums_match, ChecksumAlgorithm, BUFFER_SIZE};
use super::extractor::decompress_gzip;
use super::{ExportFailure, ExportManifest};
use crate::api::BundleSource;
use crate::coord::TileCoordinate;
use crate::store::TileStore;

/// Directory under the data directory where bundles are staged.
pub const STAGING_DIR_NAME: &str = "staging";

/// Removes a staging file when dropped, whatever the outcome.
struct StagedFile {
    path: PathBuf,
}

impl StagedFile {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove staged file"),
        }
    }
}

/// Downloads a tile bundle, verifies it against its manifest and installs it.
pub struct IntegrityVerifyingDownloader {
    bundles: Arc<dyn BundleSource>,
    store: Arc<dyn TileStore>,
    staging_dir: PathBuf,
    algorithm: ChecksumAlgorithm,
}

impl IntegrityVerifyingDownloader {
    pub fn new(
        bundles: Arc<dyn BundleSource>,
        store: Arc<dyn TileStore>,
        staging_dir: impl Into<PathBuf>,
        algorithm: ChecksumAlgorithm,
    ) -> Self {
        Self {
            bundles,
            store,
            staging_dir: staging_dir.into(),
            algorithm,
        }
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Download, verify, decompress and install the bundle for `tile`.
    ///
    /// The Tile Store is only touched once size and checksum both match.
    /// Staged files are removed on every path. Returns the compressed size.
    pub fn install_export(
        &self,
        tile: TileCoordinate,
        manifest: &ExportManifest,
    ) -> Result<u64, ExportFailure> {
        fs::create_dir_all(&self.staging_dir).map_err(|e| ExportFailure::Io {
            path: self.staging_dir.clone(),
            source: e,
        })?;

        let stem = tile.file_stem();
        let compressed = StagedFile::new(self.staging_dir.join(format!("{stem}.bundle.gz.part")));
        let (received, actual) = self.download(tile, manifest, compressed.path())?;

        if received != manifest.compressed_size {
            return Err(ExportFailure::SizeMismatch {
                tile,
                expected: manifest.compressed_size,
                actual: received,
            });
        }
        if !checksums_match(&manifest.checksum, &actual) {
            return Err(ExportFailure::ChecksumMismatch {
                tile,
                expected: manifest.checksum.clone(),
                actual,
            });
        }

        let bundle = StagedFile::new(self.staging_dir.join(format!("{stem}.bundle")));
        let plain_bytes = decompress_gzip(compressed.path(), bundle.path())?;
        drop(compressed);

        self.store
            .install_bundle(bundle.path(), tile)
            .map_err(|e| ExportFailure::Install { tile, source: e })?;

        info!(
            tile = %tile,
            bytes = received,
            decompressed = plain_bytes,
            "Installed export bundle"
        );
        Ok(received)
    }

    /// Stream the bundle to `dest`, hashing as it goes.
    ///
    /// Returns the byte count and the hex digest.
    fn download(
        &self,
        tile: TileCoordinate,
        manifest: &ExportManifest,
        dest: &Path,
    ) -> Result<(u64, String), ExportFailure> {
        let mut reader = self
            .bundles
            .open(&manifest.download_url)
            .map_err(|e| ExportFailure::Fetch { tile, source: e })?;

        let file = File::create(dest).map_err(|e| ExportFailure::Io {
            path: dest.to_path_buf(),
            source: e,
        })?;
        let mut writer = BufWriter::new(file);
        let mut hasher = self.algorithm.hasher();
        let mut buffer = vec![0u8; BUFFER_SIZE];
        let mut received = 0u64;

        loop {
            let bytes_read = reader
                .read(&mut buffer)
                .map_err(|e| ExportFailure::Stream { tile, source: e })?;

            if bytes_read == 0 {
                break;
            }

            let chunk = &buffer[..bytes_read];
            hasher.update(chunk);
            writer.write_all(chunk).map_err(|e| ExportFailure::Io {
                path: dest.to_path_buf(),
                source: e,
            })?;
            received += bytes_read as u64;
        }

        writer.flush().map_err(|e| ExportFailure::Io {
            path: dest.to_path_buf(),
            source: e,
        })?;

        debug!(tile = %tile, bytes = received, expected = manifest.compressed_size, "Bundle downloaded");
        Ok((received, hasher.finalize_hex()))
    }
}
