//! Sample processor.
use super::{Path, SamplesData};
use crate::record::Record;
use anyhow::Result;

/// Computes returns and advantage estimates from raw paths.
pub trait SampleProcessor {
    /// Processes the paths of every task of the meta-batch.
    ///
    /// Statistics of the returns are put in the returned record with keys
    /// prefixed by `prefix`.
    fn process_samples(
        &mut self,
        paths_meta_batch: &[Vec<Path>],
        prefix: &str,
    ) -> Result<(Vec<SamplesData>, Record)>;
}
