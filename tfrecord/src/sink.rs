use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, ErrorKind, Write};
use std::path::Path;

use flate2::write::{GzEncoder, ZlibEncoder};

use crate::error::RecordWriterError;
use crate::options::{CompressionType, RecordWriterOptions};

/// A byte sink that can be closed explicitly.
///
/// Closing reports errors that would otherwise be lost when the sink is
/// dropped. No writes are issued to a sink after it was closed.
pub trait Sink: Write {
    fn close(&mut self) -> io::Result<()>;
}

/// Closing a file does not sync it to disk, so that pipes and devices
/// can be used as destinations. The descriptor is released on drop.
impl Sink for File {
    fn close(&mut self) -> io::Result<()> {
        self.flush()
    }
}

impl Sink for Vec<u8> {
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S> Sink for &mut S
where
    S: Sink + ?Sized,
{
    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

impl<S> Sink for Box<S>
where
    S: Sink + ?Sized,
{
    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

impl<S> Sink for BufWriter<S>
where
    S: Sink,
{
    fn close(&mut self) -> io::Result<()> {
        self.flush()?;
        self.get_mut().close()
    }
}

/// Sink owned by a compressor.
///
/// Once released, the sink rejects all writes. Encoders finish their
/// stream again when they are dropped; releasing the sink keeps that
/// from reaching a sink that was closed or failed to finalize.
struct CompressedSink<S>
where
    S: Sink,
{
    sink: S,
    released: bool,
}

impl<S> CompressedSink<S>
where
    S: Sink,
{
    fn new(sink: S) -> Self {
        CompressedSink {
            sink,
            released: false,
        }
    }

    /// Close the sink if the compression stream was finalized, release
    /// it in either case.
    fn finalize(&mut self, finished: io::Result<()>) -> io::Result<()> {
        let closed = finished.and_then(|()| self.sink.close());
        self.released = true;
        closed
    }

    fn check_released(&self) -> io::Result<()> {
        if self.released {
            Err(io::Error::new(ErrorKind::BrokenPipe, "sink is released"))
        } else {
            Ok(())
        }
    }
}

impl<S> Write for CompressedSink<S>
where
    S: Sink,
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.check_released()?;
        self.sink.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.check_released()?;
        self.sink.flush()
    }
}

/// Compression stage in front of the sink.
enum Stage<S>
where
    S: Sink,
{
    Raw(S),
    Gzip(GzEncoder<CompressedSink<S>>),
    Zlib(ZlibEncoder<CompressedSink<S>>),
}

impl<S> Stage<S>
where
    S: Sink,
{
    /// Finalize the compression stream, then close the sink.
    ///
    /// If finalization fails, the sink is not closed and no further bytes
    /// are written to it.
    fn close(self) -> io::Result<()> {
        match self {
            Stage::Raw(mut sink) => sink.close(),
            Stage::Gzip(mut encoder) => {
                let finished = encoder.try_finish();
                encoder.get_mut().finalize(finished)
            }
            Stage::Zlib(mut encoder) => {
                let finished = encoder.try_finish();
                encoder.get_mut().finalize(finished)
            }
        }
    }
}

impl<S> Write for Stage<S>
where
    S: Sink,
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Stage::Raw(sink) => sink.write(buf),
            Stage::Gzip(encoder) => encoder.write(buf),
            Stage::Zlib(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Stage::Raw(sink) => sink.flush(),
            Stage::Gzip(encoder) => encoder.flush(),
            Stage::Zlib(encoder) => encoder.flush(),
        }
    }
}

/// A sink with an optional compression stage.
///
/// Bytes written to the pipeline pass through the compressor (if any)
/// before they reach the sink. The pipeline is finalized when it is closed
/// or dropped: the compressor writes its trailer first, then the sink is
/// closed.
pub struct SinkPipeline<S>
where
    S: Sink,
{
    // Only `None` once the pipeline is closed or dropped.
    stage: Option<Stage<S>>,
}

impl SinkPipeline<BufWriter<File>> {
    /// Open `path` for writing and construct a pipeline on top of it.
    ///
    /// The file is created if it does not exist and truncated otherwise.
    pub fn create(
        path: impl AsRef<Path>,
        options: &RecordWriterOptions,
    ) -> Result<Self, RecordWriterError> {
        let path = path.as_ref();

        // Reject invalid options before touching the file system.
        options.compression()?;

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|err| RecordWriterError::open_error(path, err))?;

        SinkPipeline::new(BufWriter::with_capacity(options.buffer_size, file), options)
    }
}

impl<S> SinkPipeline<S>
where
    S: Sink,
{
    /// Construct a pipeline that writes to `sink`.
    pub fn new(sink: S, options: &RecordWriterOptions) -> Result<Self, RecordWriterError> {
        let compression = options.compression()?;

        let stage = match options.compression_type {
            CompressionType::None => Stage::Raw(sink),
            CompressionType::Gzip => {
                Stage::Gzip(GzEncoder::new(CompressedSink::new(sink), compression))
            }
            CompressionType::Zlib => {
                Stage::Zlib(ZlibEncoder::new(CompressedSink::new(sink), compression))
            }
        };

        Ok(SinkPipeline { stage: Some(stage) })
    }

    /// Finalize the compression stage and close the sink.
    ///
    /// The pipeline is released, even if finalization fails.
    pub fn close(mut self) -> io::Result<()> {
        match self.stage.take() {
            Some(stage) => stage.close(),
            None => Ok(()),
        }
    }

    fn stage_mut(&mut self) -> io::Result<&mut Stage<S>> {
        self.stage
            .as_mut()
            .ok_or_else(|| io::Error::new(ErrorKind::BrokenPipe, "sink pipeline is closed"))
    }
}

impl<S> Write for SinkPipeline<S>
where
    S: Sink,
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stage_mut()?.write(buf)
    }

    /// Push buffered compressor output to the sink, then flush the sink.
    fn flush(&mut self) -> io::Result<()> {
        self.stage_mut()?.flush()
    }
}

impl<S> Drop for SinkPipeline<S>
where
    S: Sink,
{
    fn drop(&mut self) {
        if let Some(stage) = self.stage.take() {
            if let Err(err) = stage.close() {
                log::warn!("Cannot close record sink: {}", err);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::RefCell;
    use std::io::{self, ErrorKind, Read, Write};
    use std::rc::Rc;

    use flate2::read::{GzDecoder, ZlibDecoder};

    use super::{Sink, SinkPipeline};
    use crate::options::{CompressionType, RecordWriterOptions};

    /// Operations observed by a [`RecordingSink`].
    #[derive(Clone, Debug, Eq, PartialEq)]
    pub enum SinkEvent {
        Write(usize),
        Flush,
        Close,
    }

    #[derive(Debug, Default)]
    pub struct SinkLog {
        pub data: Vec<u8>,
        pub events: Vec<SinkEvent>,
        pub closed: bool,
        pub fail_writes: bool,
    }

    /// Sink for tests that records operations and can fail on demand.
    ///
    /// Writes fail once `fail_after` bytes were accepted or when
    /// `fail_writes` is set in the log, closing fails when `fail_close` is
    /// set.
    #[derive(Clone, Default)]
    pub struct RecordingSink {
        pub log: Rc<RefCell<SinkLog>>,
        pub fail_after: Option<usize>,
        pub fail_close: bool,
    }

    impl RecordingSink {
        pub fn failing_after(n_bytes: usize) -> Self {
            RecordingSink {
                fail_after: Some(n_bytes),
                ..Default::default()
            }
        }

        pub fn failing_close() -> Self {
            RecordingSink {
                fail_close: true,
                ..Default::default()
            }
        }

        pub fn data(&self) -> Vec<u8> {
            self.log.borrow().data.clone()
        }

        pub fn events(&self) -> Vec<SinkEvent> {
            self.log.borrow().events.clone()
        }

        /// Fail all subsequent writes and flushes.
        pub fn fail_writes(&self) {
            self.log.borrow_mut().fail_writes = true;
        }
    }

    impl Write for RecordingSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let mut log = self.log.borrow_mut();
            assert!(!log.closed, "write after close");
            if log.fail_writes {
                return Err(io::Error::new(ErrorKind::Other, "device error"));
            }

            let n = match self.fail_after {
                Some(limit) if log.data.len() + buf.len() > limit => limit - log.data.len(),
                _ => buf.len(),
            };
            if n == 0 && !buf.is_empty() {
                return Err(io::Error::new(ErrorKind::Other, "sink is full"));
            }

            log.data.extend_from_slice(&buf[..n]);
            log.events.push(SinkEvent::Write(n));
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            let mut log = self.log.borrow_mut();
            assert!(!log.closed, "flush after close");
            if log.fail_writes {
                return Err(io::Error::new(ErrorKind::Other, "device error"));
            }
            log.events.push(SinkEvent::Flush);
            Ok(())
        }
    }

    impl Sink for RecordingSink {
        fn close(&mut self) -> io::Result<()> {
            let mut log = self.log.borrow_mut();
            assert!(!log.closed, "sink closed twice");
            log.closed = true;
            log.events.push(SinkEvent::Close);
            if self.fail_close {
                Err(io::Error::new(ErrorKind::Other, "cannot close sink"))
            } else {
                Ok(())
            }
        }
    }

    fn options(compression_type: CompressionType) -> RecordWriterOptions {
        RecordWriterOptions {
            compression_type,
            ..Default::default()
        }
    }

    #[test]
    fn raw_pipeline_passes_bytes_through() {
        let sink = RecordingSink::default();
        let mut pipeline = SinkPipeline::new(sink.clone(), &options(CompressionType::None)).unwrap();
        pipeline.write_all(b"hello").unwrap();
        pipeline.flush().unwrap();
        pipeline.close().unwrap();

        assert_eq!(sink.data(), b"hello");
        assert_eq!(
            sink.events(),
            vec![SinkEvent::Write(5), SinkEvent::Flush, SinkEvent::Close]
        );
    }

    #[test]
    fn compressor_is_finalized_before_the_sink_is_closed() {
        for compression_type in [CompressionType::Gzip, CompressionType::Zlib] {
            let sink = RecordingSink::default();
            let mut pipeline = SinkPipeline::new(sink.clone(), &options(compression_type)).unwrap();
            pipeline.write_all(b"hello world").unwrap();
            pipeline.close().unwrap();

            let events = sink.events();
            assert_eq!(events.last(), Some(&SinkEvent::Close));
            assert_eq!(
                events.iter().filter(|e| **e == SinkEvent::Close).count(),
                1
            );

            let mut decompressed = Vec::new();
            let data = sink.data();
            match compression_type {
                CompressionType::Gzip => GzDecoder::new(&data[..])
                    .read_to_end(&mut decompressed)
                    .unwrap(),
                CompressionType::Zlib => ZlibDecoder::new(&data[..])
                    .read_to_end(&mut decompressed)
                    .unwrap(),
                CompressionType::None => unreachable!(),
            };
            assert_eq!(decompressed, b"hello world");
        }
    }

    #[test]
    fn flush_pushes_compressed_bytes_to_the_sink() {
        let sink = RecordingSink::default();
        let mut pipeline = SinkPipeline::new(sink.clone(), &options(CompressionType::Zlib)).unwrap();
        pipeline.write_all(b"hello world").unwrap();
        pipeline.flush().unwrap();

        let flushed = sink.data();
        assert!(!flushed.is_empty());
        assert!(!sink.log.borrow().closed);

        // A sync flush emits every byte written so far.
        let mut decompressed = vec![0; 11];
        ZlibDecoder::new(&flushed[..])
            .read_exact(&mut decompressed)
            .unwrap();
        assert_eq!(decompressed, b"hello world");
    }

    #[test]
    fn dropping_closes_like_close() {
        for compression_type in [
            CompressionType::None,
            CompressionType::Gzip,
            CompressionType::Zlib,
        ] {
            let closed = RecordingSink::default();
            let mut pipeline = SinkPipeline::new(closed.clone(), &options(compression_type)).unwrap();
            pipeline.write_all(b"some frames").unwrap();
            pipeline.close().unwrap();

            let dropped = RecordingSink::default();
            let mut pipeline =
                SinkPipeline::new(dropped.clone(), &options(compression_type)).unwrap();
            pipeline.write_all(b"some frames").unwrap();
            drop(pipeline);

            assert_eq!(closed.data(), dropped.data());
            assert_eq!(dropped.events().last(), Some(&SinkEvent::Close));
        }
    }

    #[test]
    fn close_reports_sink_failures() {
        let sink = RecordingSink::failing_close();
        let pipeline = SinkPipeline::new(sink.clone(), &options(CompressionType::Gzip)).unwrap();
        assert!(pipeline.close().is_err());
        assert!(sink.log.borrow().closed);
    }

    #[test]
    fn drop_swallows_close_failures() {
        let sink = RecordingSink::failing_close();
        let mut pipeline = SinkPipeline::new(sink.clone(), &options(CompressionType::None)).unwrap();
        pipeline.write_all(b"x").unwrap();
        drop(pipeline);
        assert!(sink.log.borrow().closed);
    }

    #[test]
    fn failed_finalization_is_not_retried() {
        for compression_type in [CompressionType::Gzip, CompressionType::Zlib] {
            let sink = RecordingSink::default();
            let mut pipeline = SinkPipeline::new(sink.clone(), &options(compression_type)).unwrap();
            pipeline.write_all(b"frames that stay in the compressor").unwrap();

            sink.fail_writes();
            let events = sink.events();
            assert!(pipeline.close().is_err());

            // The encoder was dropped as well, without touching the sink.
            assert_eq!(sink.events(), events);
            assert!(!sink.log.borrow().closed);
        }
    }

    #[test]
    fn failed_finalization_on_drop_is_not_retried() {
        let sink = RecordingSink::default();
        let mut pipeline = SinkPipeline::new(sink.clone(), &options(CompressionType::Gzip)).unwrap();
        pipeline.write_all(b"frames").unwrap();

        sink.fail_writes();
        let events = sink.events();
        drop(pipeline);

        assert_eq!(sink.events(), events);
        assert!(!sink.log.borrow().closed);
    }

    #[cfg(unix)]
    #[test]
    fn file_sinks_close_without_syncing() {
        use std::fs::OpenOptions;

        // Devices cannot be synced.
        let file = OpenOptions::new().write(true).open("/dev/null").unwrap();
        let mut pipeline = SinkPipeline::new(file, &options(CompressionType::Gzip)).unwrap();
        pipeline.write_all(b"discarded").unwrap();
        pipeline.close().unwrap();
    }

    #[test]
    fn write_failures_propagate() {
        let sink = RecordingSink::failing_after(3);
        let mut pipeline = SinkPipeline::new(sink.clone(), &options(CompressionType::None)).unwrap();
        assert!(pipeline.write_all(b"hello").is_err());
        assert_eq!(sink.data(), b"hel");
    }
}
