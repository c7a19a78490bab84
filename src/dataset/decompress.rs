//! Gzip archive decompression

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use flate2::bufread::GzDecoder;
use tokio::task;

use crate::{HarnessError, Result};

/// Decompress the gzip archive at `src` into `dest`.
///
/// Runs on a blocking task since flate2 is synchronous. Returns the
/// decompressed size. A corrupt archive is fatal; the caller owns cleanup
/// of any partial `dest`.
pub async fn decompress_gz(src: &Path, dest: &Path) -> Result<u64> {
    let src = src.to_owned();
    let dest = dest.to_owned();

    task::spawn_blocking(move || {
        let input = File::open(&src).map_err(|e| {
            HarnessError::DecompressError(format!("Failed to open {}: {}", src.display(), e))
        })?;
        let mut decoder = GzDecoder::new(BufReader::new(input));

        let output = File::create(&dest).map_err(|e| {
            HarnessError::DecompressError(format!("Failed to create {}: {}", dest.display(), e))
        })?;
        let mut writer = BufWriter::new(output);

        let bytes = std::io::copy(&mut decoder, &mut writer).map_err(|e| {
            HarnessError::DecompressError(format!(
                "Failed to decompress {}: {}",
                src.display(),
                e
            ))
        })?;
        writer.flush().map_err(|e| {
            HarnessError::DecompressError(format!("Failed to flush {}: {}", dest.display(), e))
        })?;

        Ok(bytes)
    })
    .await
    .map_err(|e| HarnessError::DecompressError(format!("Decompression task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[tokio::test]
    async fn test_decompress_gz() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("logs.json.gz");
        let dest = dir.path().join("logs.json");

        let content = b"{\"severity_text\":\"INFO\",\"body\":\"block served\"}\n";
        std::fs::write(&src, gzip(content)).unwrap();

        let bytes = decompress_gz(&src, &dest).await.unwrap();
        assert_eq!(bytes, content.len() as u64);
        assert_eq!(std::fs::read(&dest).unwrap(), content);
    }

    #[tokio::test]
    async fn test_corrupt_archive_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("bad.gz");
        let dest = dir.path().join("bad.json");

        std::fs::write(&src, b"this is not gzip").unwrap();

        let err = decompress_gz(&src, &dest).await;
        assert!(matches!(err, Err(HarnessError::DecompressError(_))));
    }
}
