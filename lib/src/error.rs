use std::io;

use thiserror::Error;

use crate::util::compression::DecompressError;

pub type Result<T, E = PigError> = std::result::Result<T, E>;

/// Broad failure classes, so callers can tell bad data from missing support.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorCategory {
    MalformedRecord,
    UnsupportedFeature,
    TruncatedInput,
    DanglingReference,
}

#[derive(Debug, Error)]
pub enum PigError {
    #[error("invalid {record} record at {offset:#x}: expected ident {expected}, found {found}")]
    BadIdent { record: &'static str, offset: u64, expected: u32, found: u32 },
    #[error("unknown compression mode {mode} at {offset:#x}")]
    UnknownCompressionMode { offset: u64, mode: u8 },
    #[error("failed to decompress block at {offset:#x}")]
    Decompress {
        offset: u64,
        #[source]
        source: DecompressError,
    },
    #[error("mesh at {offset:#x} declares {face_count} face indices, not a multiple of 3")]
    InvalidFaceCount { offset: u64, face_count: u32 },
    #[error("unexpected end of input reading {what} at {offset:#x} ({available} bytes left)")]
    UnexpectedEof { what: &'static str, offset: u64, available: u64 },
    #[error("{what} at {offset:#x} needs {needed} bytes, only {available} available")]
    PayloadTooSmall { what: &'static str, offset: u64, needed: u64, available: u64 },
    #[error("dangling {what} at {offset:#x}: index {index} out of range for {len} entries")]
    DanglingReference { what: &'static str, offset: u64, index: i64, len: usize },
    #[error("failed to read {what} at {offset:#x}")]
    Binary {
        what: &'static str,
        offset: u64,
        #[source]
        source: binrw::Error,
    },
}

impl PigError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            PigError::Decompress { source: DecompressError::Unsupported(_), .. } => {
                ErrorCategory::UnsupportedFeature
            }
            PigError::UnexpectedEof { .. } | PigError::PayloadTooSmall { .. } => {
                ErrorCategory::TruncatedInput
            }
            PigError::DanglingReference { .. } => ErrorCategory::DanglingReference,
            PigError::BadIdent { .. }
            | PigError::UnknownCompressionMode { .. }
            | PigError::Decompress { .. }
            | PigError::InvalidFaceCount { .. }
            | PigError::Binary { .. } => ErrorCategory::MalformedRecord,
        }
    }

    /// Byte offset in the input stream where the failing record starts.
    pub fn offset(&self) -> u64 {
        match *self {
            PigError::BadIdent { offset, .. }
            | PigError::UnknownCompressionMode { offset, .. }
            | PigError::Decompress { offset, .. }
            | PigError::InvalidFaceCount { offset, .. }
            | PigError::UnexpectedEof { offset, .. }
            | PigError::PayloadTooSmall { offset, .. }
            | PigError::DanglingReference { offset, .. }
            | PigError::Binary { offset, .. } => offset,
        }
    }

    pub(crate) fn from_binrw(
        err: binrw::Error,
        what: &'static str,
        offset: u64,
        available: u64,
    ) -> Self {
        if err.is_eof() {
            PigError::UnexpectedEof { what, offset, available }
        } else {
            PigError::Binary { what, offset, source: err }
        }
    }

    pub(crate) fn from_io(err: io::Error, what: &'static str, offset: u64, available: u64) -> Self {
        Self::from_binrw(binrw::Error::Io(err), what, offset, available)
    }
}
