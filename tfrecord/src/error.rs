use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum RecordWriterError {
    #[error("Writer is closed")]
    Closed,

    #[error("Invalid compression level {0}, expected a level in 0..=9")]
    InvalidCompressionLevel(u32),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("Cannot open `{path:?}` for writing: {inner}")]
    Open { path: PathBuf, inner: io::Error },

    #[error("Unknown compression type `{0}`, expected one of \"\", \"GZIP\", \"ZLIB\"")]
    UnknownCompressionType(String),
}

impl RecordWriterError {
    pub fn open_error(path: impl Into<PathBuf>, inner: io::Error) -> Self {
        RecordWriterError::Open {
            path: path.into(),
            inner,
        }
    }
}

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum RecordReadError {
    #[error("Data checksum mismatch: expected {expected:#010x}, computed {computed:#010x}")]
    DataChecksum { expected: u32, computed: u32 },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("Length checksum mismatch: expected {expected:#010x}, computed {computed:#010x}")]
    LengthChecksum { expected: u32, computed: u32 },

    #[error("Cannot open `{path:?}` for reading: {inner}")]
    Open { path: PathBuf, inner: io::Error },

    #[error("Record is truncated")]
    Truncated,
}
