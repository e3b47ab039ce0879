use std::io::{self, Read};

use serde_derive::Serialize;
use strum::Display;
use thiserror::Error;

/// Block codec tag as stored in front of every compressed block.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Display, Serialize)]
#[repr(u8)]
pub enum CompressionMode {
    #[strum(serialize = "LZ4")]
    Lz4 = 1,
    #[strum(serialize = "Zstandard")]
    Zstd = 2,
}

impl CompressionMode {
    /// Maps a raw tag, returning `None` for tags the format does not define.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(CompressionMode::Lz4),
            2 => Some(CompressionMode::Zstd),
            _ => None,
        }
    }

    #[inline]
    pub fn is_supported(self) -> bool { matches!(self, CompressionMode::Zstd) }
}

#[derive(Debug, Error)]
pub enum DecompressError {
    #[error("unsupported compression mode {0}")]
    Unsupported(CompressionMode),
    #[error("decompressed size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("{mode} stream is corrupt")]
    Codec {
        mode: CompressionMode,
        #[source]
        source: io::Error,
    },
}

/// Decompresses `compressed_data` to exactly `decompressed_size` bytes.
pub fn decompress_buffer(
    mode: CompressionMode,
    compressed_data: &[u8],
    decompressed_size: usize,
) -> Result<Vec<u8>, DecompressError> {
    let mut out = Vec::with_capacity(decompressed_size);
    match mode {
        CompressionMode::Zstd => {
            let codec_err = |source| DecompressError::Codec { mode, source };
            let decoder = zstd::stream::read::Decoder::with_buffer(compressed_data).map_err(codec_err)?;
            // Read one byte past the expected size so overlong streams are caught
            decoder.take(decompressed_size as u64 + 1).read_to_end(&mut out).map_err(codec_err)?;
        }
        CompressionMode::Lz4 => return Err(DecompressError::Unsupported(mode)),
    }
    if out.len() != decompressed_size {
        return Err(DecompressError::SizeMismatch {
            expected: decompressed_size,
            actual: out.len(),
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zstd_round_trip() {
        let data = b"geometry payload geometry payload".to_vec();
        let compressed = zstd::stream::encode_all(&data[..], 0).unwrap();
        let out = decompress_buffer(CompressionMode::Zstd, &compressed, data.len()).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn zstd_size_mismatch() {
        let data = vec![7u8; 64];
        let compressed = zstd::stream::encode_all(&data[..], 0).unwrap();
        let short = decompress_buffer(CompressionMode::Zstd, &compressed, 65).unwrap_err();
        assert!(matches!(short, DecompressError::SizeMismatch { expected: 65, actual: 64 }));
        let long = decompress_buffer(CompressionMode::Zstd, &compressed, 10).unwrap_err();
        assert!(matches!(long, DecompressError::SizeMismatch { expected: 10, actual: 11 }));
    }

    #[test]
    fn lz4_is_unsupported() {
        // Valid-looking bytes must not be touched
        let err = decompress_buffer(CompressionMode::Lz4, &[0x10, 0x41], 1).unwrap_err();
        assert!(matches!(err, DecompressError::Unsupported(CompressionMode::Lz4)));
    }

    #[test]
    fn unknown_tags() {
        assert_eq!(CompressionMode::from_tag(2), Some(CompressionMode::Zstd));
        assert_eq!(CompressionMode::from_tag(1), Some(CompressionMode::Lz4));
        assert_eq!(CompressionMode::from_tag(0), None);
        assert_eq!(CompressionMode::from_tag(3), None);
        assert!(CompressionMode::Zstd.is_supported());
        assert!(!CompressionMode::Lz4.is_supported());
    }

    #[test]
    fn corrupt_stream() {
        let err = decompress_buffer(CompressionMode::Zstd, &[1, 2, 3, 4, 5], 4).unwrap_err();
        assert!(matches!(err, DecompressError::Codec { .. }));
    }
}
