use super::Record;
use anyhow::Result;

/// Writes records to an output destination.
///
/// [`Recorder::store`] accumulates records of the current iteration and
/// [`Recorder::flush`] writes the aggregated values.
pub trait Recorder {
    /// Writes a record immediately.
    fn write(&mut self, record: Record);

    /// Stores a record until the next [`Recorder::flush`].
    fn store(&mut self, record: Record);

    /// Writes values aggregated from the stored records.
    fn flush(&mut self, step: i64);

    /// Saves a snapshot of the parameters at the given iteration.
    ///
    /// Recorders without a snapshot directory ignore it.
    #[allow(unused_variables)]
    fn save_snapshot(&mut self, itr: usize, snapshot: &serde_json::Value) -> Result<()> {
        Ok(())
    }
}
