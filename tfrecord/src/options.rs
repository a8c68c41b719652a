use std::fmt;
use std::str::FromStr;

use flate2::Compression;
use serde::{Deserialize, Serialize};

use crate::error::RecordWriterError;

/// Default capacity of the buffer between the compressor and the sink.
pub const DEFAULT_BUFFER_SIZE: usize = 256 * 1024;

/// Compression applied to the stream of frames.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum CompressionType {
    /// Frames are written as-is.
    #[default]
    #[serde(rename = "")]
    None,

    /// Gzip stream (RFC 1952).
    #[serde(rename = "GZIP")]
    Gzip,

    /// Zlib stream (RFC 1950).
    #[serde(rename = "ZLIB")]
    Zlib,
}

impl CompressionType {
    /// The compression type name, as accepted by [`CompressionType::from_str`].
    pub fn as_str(&self) -> &'static str {
        match self {
            CompressionType::None => "",
            CompressionType::Gzip => "GZIP",
            CompressionType::Zlib => "ZLIB",
        }
    }
}

impl fmt::Display for CompressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompressionType {
    type Err = RecordWriterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Ok(CompressionType::None),
            "GZIP" => Ok(CompressionType::Gzip),
            "ZLIB" => Ok(CompressionType::Zlib),
            unknown => Err(RecordWriterError::UnknownCompressionType(unknown.to_string())),
        }
    }
}

/// Record writer options.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RecordWriterOptions {
    /// Compression of the frame stream.
    #[serde(default)]
    pub compression_type: CompressionType,

    /// Compression level in `0..=9`, the compressor's default if absent.
    ///
    /// Ignored when the frames are not compressed.
    #[serde(default)]
    pub compression_level: Option<u32>,

    /// Capacity of the buffered writer in front of the sink.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

impl Default for RecordWriterOptions {
    fn default() -> Self {
        RecordWriterOptions {
            compression_type: CompressionType::None,
            compression_level: None,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl RecordWriterOptions {
    /// Options for a compression type name: `""`, `"GZIP"`, or `"ZLIB"`.
    pub fn from_compression_type(compression_type: &str) -> Result<Self, RecordWriterError> {
        Ok(RecordWriterOptions {
            compression_type: compression_type.parse()?,
            ..Default::default()
        })
    }

    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = Some(level);
        self
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Resolve the compression level.
    pub(crate) fn compression(&self) -> Result<Compression, RecordWriterError> {
        match self.compression_level {
            None => Ok(Compression::default()),
            Some(level) if level <= 9 => Ok(Compression::new(level)),
            Some(level) => Err(RecordWriterError::InvalidCompressionLevel(level)),
        }
    }
}
