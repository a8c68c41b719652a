use std::fs::File;
use std::io::{self, BufReader, ErrorKind, Read};
use std::path::Path;

use flate2::read::{GzDecoder, ZlibDecoder};

use crate::crc32::{read_u32_le, Checksummer};
use crate::error::RecordReadError;
use crate::options::CompressionType;
use crate::writer::{FOOTER_LEN, HEADER_LEN};

/// Decompression stage in front of the reader.
enum Decoder<R>
where
    R: Read,
{
    Raw(R),
    Gzip(GzDecoder<R>),
    Zlib(ZlibDecoder<R>),
}

impl<R> Read for Decoder<R>
where
    R: Read,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Decoder::Raw(read) => read.read(buf),
            Decoder::Gzip(decoder) => decoder.read(buf),
            Decoder::Zlib(decoder) => decoder.read(buf),
        }
    }
}

/// Read data in TFRecord format.
///
/// Both checksums of every frame are verified.
pub struct TFRecordReader<R>
where
    R: Read,
{
    checksummer: Checksummer,
    read: Decoder<R>,
    failed: bool,
}

impl TFRecordReader<BufReader<File>> {
    /// Open a TFRecord file.
    pub fn open(
        path: impl AsRef<Path>,
        compression_type: CompressionType,
    ) -> Result<Self, RecordReadError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|inner| RecordReadError::Open {
            path: path.to_owned(),
            inner,
        })?;
        Ok(TFRecordReader::new(BufReader::new(file), compression_type))
    }
}

impl<R> TFRecordReader<R>
where
    R: Read,
{
    /// Construct a reader that reads a frame stream with the given
    /// compression from `read`.
    pub fn new(read: R, compression_type: CompressionType) -> Self {
        let read = match compression_type {
            CompressionType::None => Decoder::Raw(read),
            CompressionType::Gzip => Decoder::Gzip(GzDecoder::new(read)),
            CompressionType::Zlib => Decoder::Zlib(ZlibDecoder::new(read)),
        };

        TFRecordReader {
            checksummer: Checksummer::new(),
            read,
            failed: false,
        }
    }

    /// Read the next record.
    ///
    /// Returns `None` when the stream ends at a frame boundary.
    pub fn read_record(&mut self) -> Result<Option<Vec<u8>>, RecordReadError> {
        let mut header = [0u8; HEADER_LEN];
        match self.fill(&mut header)? {
            0 => return Ok(None),
            HEADER_LEN => (),
            _ => return Err(RecordReadError::Truncated),
        }

        let (len_bytes, len_crc) = header.split_at(8);
        let expected = read_u32_le(len_crc);
        let computed = self.checksummer.crc32c_masked(len_bytes);
        if expected != computed {
            return Err(RecordReadError::LengthChecksum { expected, computed });
        }

        let mut len = [0u8; 8];
        len.copy_from_slice(len_bytes);
        let len = u64::from_le_bytes(len);

        // Grow as data arrives, the length is not trusted for allocation.
        let mut data = Vec::new();
        Read::by_ref(&mut self.read).take(len).read_to_end(&mut data)?;
        if (data.len() as u64) < len {
            return Err(RecordReadError::Truncated);
        }

        let mut footer = [0u8; FOOTER_LEN];
        if self.fill(&mut footer)? != FOOTER_LEN {
            return Err(RecordReadError::Truncated);
        }

        let expected = u32::from_le_bytes(footer);
        let computed = self.checksummer.crc32c_masked(&data);
        if expected != computed {
            return Err(RecordReadError::DataChecksum { expected, computed });
        }

        Ok(Some(data))
    }

    /// Read until `buf` is full or the stream ends, returning the number
    /// of bytes read.
    fn fill(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.read.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(filled)
    }
}

impl<R> Iterator for TFRecordReader<R>
where
    R: Read,
{
    type Item = Result<Vec<u8>, RecordReadError>;

    /// Iteration stops after the first error, since frame boundaries are
    /// lost at that point.
    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        let record = self.read_record().transpose();
        if let Some(Err(_)) = record {
            self.failed = true;
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use tempfile::TempDir;

    use super::TFRecordReader;
    use crate::error::RecordReadError;
    use crate::options::{CompressionType, RecordWriterOptions};
    use crate::writer::TFRecordWriter;

    fn write_records(compression_type: CompressionType, records: &[&[u8]]) -> Vec<u8> {
        let options = RecordWriterOptions {
            compression_type,
            ..Default::default()
        };
        let mut data = vec![];
        let mut writer = TFRecordWriter::new(&mut data, &options).unwrap();
        for record in records {
            writer.write_record(record).unwrap();
        }
        writer.close().unwrap();
        drop(writer);
        data
    }

    fn read_all(data: Vec<u8>, compression_type: CompressionType) -> Vec<Vec<u8>> {
        TFRecordReader::new(Cursor::new(data), compression_type)
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn reads_back_written_records() {
        let records: &[&[u8]] = &[b"a", b"", b"bc", &[0xff; 1000]];
        for compression_type in [
            CompressionType::None,
            CompressionType::Gzip,
            CompressionType::Zlib,
        ] {
            let data = write_records(compression_type, records);
            assert_eq!(read_all(data, compression_type), records);
        }
    }

    #[test]
    fn empty_stream_has_no_records() {
        assert!(read_all(Vec::new(), CompressionType::None).is_empty());
    }

    #[test]
    fn detects_corrupt_length() {
        let mut data = write_records(CompressionType::None, &[b"record"]);
        data[0] ^= 1;

        let mut reader = TFRecordReader::new(Cursor::new(data), CompressionType::None);
        assert!(matches!(
            reader.next(),
            Some(Err(RecordReadError::LengthChecksum { .. }))
        ));
        assert!(reader.next().is_none());
    }

    #[test]
    fn detects_corrupt_data() {
        let mut data = write_records(CompressionType::None, &[b"record", b"next"]);
        data[13] ^= 0x80;

        let mut reader = TFRecordReader::new(Cursor::new(data), CompressionType::None);
        assert!(matches!(
            reader.read_record(),
            Err(RecordReadError::DataChecksum { .. })
        ));
    }

    #[test]
    fn detects_truncation() {
        let data = write_records(CompressionType::None, &[b"record"]);
        for len in [1, 11, 12, 17, data.len() - 1] {
            let mut reader =
                TFRecordReader::new(Cursor::new(data[..len].to_vec()), CompressionType::None);
            assert!(
                matches!(reader.read_record(), Err(RecordReadError::Truncated)),
                "truncation to {} bytes not detected",
                len
            );
        }
    }

    #[test]
    fn opens_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.tfrecord.zz");
        let mut writer = TFRecordWriter::create_with_compression_type(&path, "ZLIB").unwrap();
        writer.write_record(b"in a file").unwrap();
        writer.close().unwrap();

        let records = TFRecordReader::open(&path, CompressionType::Zlib)
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(records, vec![b"in a file".to_vec()]);

        assert!(matches!(
            TFRecordReader::open(dir.path().join("missing"), CompressionType::None),
            Err(RecordReadError::Open { .. })
        ));
    }
}
