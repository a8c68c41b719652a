use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::crc32::Checksummer;
use crate::error::RecordWriterError;
use crate::options::RecordWriterOptions;
use crate::sink::{Sink, SinkPipeline};

// TFRecord format:
//
// uint64 length
// uint32 masked_crc32_of_length
// byte   data[length]
// uint32 masked_crc32_of_data

/// Length of the frame header: the record length and its checksum.
pub(crate) const HEADER_LEN: usize = 12;

/// Length of the frame footer: the data checksum.
pub(crate) const FOOTER_LEN: usize = 4;

/// Number of bytes that a frame adds to a record.
pub const FRAME_OVERHEAD: usize = HEADER_LEN + FOOTER_LEN;

/// TFRecord writer for files.
pub type FileRecordWriter = TFRecordWriter<BufWriter<File>>;

/// Write data in TFRecord format.
///
/// The writer is open from construction until [`TFRecordWriter::close`] is
/// called. Dropping an open writer closes it, discarding errors.
pub struct TFRecordWriter<S>
where
    S: Sink,
{
    checksummer: Checksummer,
    pipeline: Option<SinkPipeline<S>>,
    records_written: u64,
}

impl TFRecordWriter<BufWriter<File>> {
    /// Create a writer for the file at `path`.
    ///
    /// An existing file is truncated. Failures are logged, since no writer
    /// exists afterwards to report them.
    pub fn create(
        path: impl AsRef<Path>,
        options: &RecordWriterOptions,
    ) -> Result<Self, RecordWriterError> {
        let path = path.as_ref();

        let pipeline = SinkPipeline::create(path, options).map_err(|err| {
            log::error!("Cannot create record writer: {}", err);
            err
        })?;

        log::debug!(
            "Writing records to `{}` (compression type: \"{}\")",
            path.display(),
            options.compression_type
        );

        Ok(Self::from_pipeline(pipeline))
    }

    /// Create a writer for the file at `path`, using the given compression
    /// type name.
    pub fn create_with_compression_type(
        path: impl AsRef<Path>,
        compression_type: &str,
    ) -> Result<Self, RecordWriterError> {
        let options = RecordWriterOptions::from_compression_type(compression_type).map_err(|err| {
            log::error!("Cannot create record writer: {}", err);
            err
        })?;
        Self::create(path, &options)
    }
}

impl<S> TFRecordWriter<S>
where
    S: Sink,
{
    /// Construct a writer from a sink.
    ///
    /// Failures are logged, like those of [`TFRecordWriter::create`].
    pub fn new(sink: S, options: &RecordWriterOptions) -> Result<Self, RecordWriterError> {
        let pipeline = SinkPipeline::new(sink, options).map_err(|err| {
            log::error!("Cannot create record writer: {}", err);
            err
        })?;
        Ok(Self::from_pipeline(pipeline))
    }

    fn from_pipeline(pipeline: SinkPipeline<S>) -> Self {
        TFRecordWriter {
            checksummer: Checksummer::new(),
            pipeline: Some(pipeline),
            records_written: 0,
        }
    }

    /// Close the writer.
    ///
    /// Closing an already-closed writer succeeds without performing I/O.
    /// The writer is closed afterwards, even when closing fails.
    pub fn close(&mut self) -> Result<(), RecordWriterError> {
        match self.pipeline.take() {
            Some(pipeline) => {
                log::debug!("Closing record writer after {} records", self.records_written);
                Ok(pipeline.close()?)
            }
            None => Ok(()),
        }
    }

    /// Flush buffered and compressed data to the sink.
    pub fn flush(&mut self) -> Result<(), RecordWriterError> {
        let pipeline = self.pipeline.as_mut().ok_or(RecordWriterError::Closed)?;
        Ok(pipeline.flush()?)
    }

    /// Returns `true` until the writer is closed.
    pub fn is_open(&self) -> bool {
        self.pipeline.is_some()
    }

    /// The number of records that were written successfully.
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Write a record.
    ///
    /// If writing fails, a partial frame may have been written. The writer
    /// remains open, but the output should be considered corrupt.
    pub fn write_record(&mut self, data: &[u8]) -> Result<(), RecordWriterError> {
        let pipeline = self.pipeline.as_mut().ok_or(RecordWriterError::Closed)?;

        let len = (data.len() as u64).to_le_bytes();
        let mut header = [0u8; HEADER_LEN];
        header[..8].copy_from_slice(&len);
        header[8..].copy_from_slice(&self.checksummer.crc32c_masked(&len).to_le_bytes());
        let footer = self.checksummer.crc32c_masked(data).to_le_bytes();

        pipeline.write_all(&header)?;
        pipeline.write_all(data)?;
        pipeline.write_all(&footer)?;

        self.records_written += 1;

        Ok(())
    }
}
