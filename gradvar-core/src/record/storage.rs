//! Record storage and aggregation.
//!
//! Scalars stored more than once between two flushes are summarized with
//! their minimum, maximum and mean. Other values keep their latest entry.
use super::{Record, RecordValue};
use std::collections::HashSet;
use xxhash_rust::xxh3::Xxh3Builder;

/// A storage of records with aggregation on [`RecordStorage::aggregate`].
#[derive(Default)]
pub struct RecordStorage {
    data: Vec<Record>,
}

fn min(vs: &[f64]) -> RecordValue {
    RecordValue::Scalar(vs.iter().cloned().fold(f64::INFINITY, f64::min))
}

fn max(vs: &[f64]) -> RecordValue {
    RecordValue::Scalar(vs.iter().cloned().fold(f64::NEG_INFINITY, f64::max))
}

fn mean(vs: &[f64]) -> RecordValue {
    RecordValue::Scalar(vs.iter().sum::<f64>() / vs.len() as f64)
}

impl RecordStorage {
    /// Creates an empty storage.
    pub fn new() -> Self {
        Self { data: vec![] }
    }

    /// Stores a record.
    pub fn store(&mut self, record: Record) {
        self.data.push(record);
    }

    /// Returns `true` if no record is stored.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn get_keys(&self) -> HashSet<String, Xxh3Builder> {
        let mut keys = HashSet::<String, Xxh3Builder>::default();
        for record in self.data.iter() {
            for k in record.keys() {
                keys.insert(k.clone());
            }
        }
        keys
    }

    fn latest(&self, key: &str) -> Option<&RecordValue> {
        self.data.iter().rev().find_map(|record| record.get(key))
    }

    fn scalars(&self, key: &str) -> Vec<f64> {
        self.data
            .iter()
            .filter_map(|record| match record.get(key) {
                Some(RecordValue::Scalar(v)) => Some(*v),
                _ => None,
            })
            .collect()
    }

    /// Aggregates all stored records and clears the storage.
    pub fn aggregate(&mut self) -> Record {
        let mut record = Record::empty();

        for key in self.get_keys().iter() {
            let vs = self.scalars(key);
            if vs.len() > 1 {
                record.insert(format!("{}_min", key), min(&vs));
                record.insert(format!("{}_max", key), max(&vs));
                record.insert(format!("{}_mean", key), mean(&vs));
            } else if let Some(value) = self.latest(key) {
                record.insert(key.clone(), value.clone());
            }
        }

        self.data = vec![];

        record
    }
}
