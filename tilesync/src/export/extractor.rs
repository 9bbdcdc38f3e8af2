//! Gzip decompression of verified export bundles.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::read::MultiGzDecoder;

use super::checksum::BUFFER_SIZE;
use super::ExportFailure;

/// Decompress the gzip file at `src` into `dest`.
///
/// Returns the number of decompressed bytes written. A truncated or corrupt
/// stream is reported as [`ExportFailure::Decompress`]; whatever was written
/// to `dest` is left for the caller to clean up.
pub fn decompress_gzip(src: &Path, dest: &Path) -> Result<u64, ExportFailure> {
    let input = File::open(src).map_err(|e| ExportFailure::Io {
        path: src.to_path_buf(),
        source: e,
    })?;

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| ExportFailure::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    let output = File::create(dest).map_err(|e| ExportFailure::Io {
        path: dest.to_path_buf(),
        source: e,
    })?;

    let mut decoder = MultiGzDecoder::new(BufReader::new(input));
    let mut writer = BufWriter::new(output);
    let mut buffer = vec![0u8; BUFFER_SIZE];
    let mut total = 0u64;

    loop {
        let bytes_read = decoder
            .read(&mut buffer)
            .map_err(|e| ExportFailure::Decompress {
                path: src.to_path_buf(),
                source: e,
            })?;

        if bytes_read == 0 {
            break;
        }

        writer
            .write_all(&buffer[..bytes_read])
            .map_err(|e| ExportFailure::Io {
                path: dest.to_path_buf(),
                source: e,
            })?;
        total += bytes_read as u64;
    }

    writer.flush().map_err(|e| ExportFailure::Io {
        path: dest.to_path_buf(),
        source: e,
    })?;

    Ok(total)
}
