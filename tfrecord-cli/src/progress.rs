use std::time::Instant;

/// Measure the number of records processed per second.
///
/// When an instance of `RecordSpeed` is constructed, it takes the
/// current time. `count_record` should be called for each record that
/// was processed. The processing speed is logged when the instance is
/// dropped.
pub struct RecordSpeed {
    start: Instant,
    n_records: usize,
    n_bytes: usize,
}

impl RecordSpeed {
    /// Construct a new instance.
    pub fn new() -> Self {
        RecordSpeed {
            start: Instant::now(),
            n_records: 0,
            n_bytes: 0,
        }
    }

    /// Count a processed record of `len` bytes.
    pub fn count_record(&mut self, len: usize) {
        self.n_records += 1;
        self.n_bytes += len;
    }

    pub fn n_records(&self) -> usize {
        self.n_records
    }
}

impl Default for RecordSpeed {
    fn default() -> Self {
        RecordSpeed::new()
    }
}

impl Drop for RecordSpeed {
    fn drop(&mut self) {
        let elapsed_secs = self.start.elapsed().as_secs_f32();
        log::info!(
            "Processed {} records ({} bytes) in {:.1}s ({:.1} records/s)",
            self.n_records,
            self.n_bytes,
            elapsed_secs,
            self.n_records as f32 / elapsed_secs
        );
    }
}
