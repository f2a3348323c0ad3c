use super::{Record, RecordStorage, Recorder, RecordValue};
use anyhow::Result;

/// Buffered recorder.
///
/// Keeps flushed records and snapshots in memory, which is handy for
/// inspecting a short training run in tests.
#[derive(Default)]
pub struct BufferedRecorder {
    buf: Vec<Record>,
    storage: RecordStorage,
    snapshots: Vec<(usize, serde_json::Value)>,
}

impl BufferedRecorder {
    /// Construct the recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns an iterator over the records.
    pub fn iter(&self) -> std::slice::Iter<Record> {
        self.buf.iter()
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns `true` if no record has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Snapshots saved so far, with their iterations.
    pub fn snapshots(&self) -> &[(usize, serde_json::Value)] {
        &self.snapshots
    }
}

impl Recorder for BufferedRecorder {
    fn write(&mut self, record: Record) {
        self.buf.push(record);
    }

    fn store(&mut self, record: Record) {
        self.storage.store(record);
    }

    fn flush(&mut self, step: i64) {
        let mut record = self.storage.aggregate();
        record.insert("Itr", RecordValue::Scalar(step as f64));
        self.buf.push(record);
    }

    fn save_snapshot(&mut self, itr: usize, snapshot: &serde_json::Value) -> Result<()> {
        self.snapshots.push((itr, snapshot.clone()));
        Ok(())
    }
}
