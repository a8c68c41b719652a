//! TFRecord writer
//!
//! This crate writes sequences of records in the TFRecord format. Each
//! record is framed with its length and masked CRC32C checksums of both
//! the length and the data, so that readers can detect corruption and
//! truncation per record. The stream of frames can optionally be
//! compressed with gzip or zlib.
//!
//! ```no_run
//! use tfrecord::{RecordWriterOptions, TFRecordWriter};
//!
//! let options = RecordWriterOptions::from_compression_type("GZIP")?;
//! let mut writer = TFRecordWriter::create("examples.tfrecord.gz", &options)?;
//! writer.write_record(b"first")?;
//! writer.write_record(b"second")?;
//! writer.close()?;
//! # Ok::<(), tfrecord::RecordWriterError>(())
//! ```

mod crc32;
pub use crc32::{mask, unmask, Checksummer};

mod crc32c_table;

mod error;
pub use error::{RecordReadError, RecordWriterError};

mod options;
pub use options::{CompressionType, RecordWriterOptions, DEFAULT_BUFFER_SIZE};

mod reader;
pub use reader::TFRecordReader;

mod sink;
pub use sink::{Sink, SinkPipeline};

mod writer;
pub use writer::{FileRecordWriter, TFRecordWriter, FRAME_OVERHEAD};
