//! Types and traits for recording metrics of a meta-training run.
//!
//! * [`Record`] - a container of key-value pairs of various data types
//! * [`RecordValue`] - the values that can be stored in a [`Record`]
//! * [`Recorder`] - writes records (and parameter snapshots) somewhere
//! * [`RecordStorage`] - stores records and aggregates them on flush
//! * [`BufferedRecorder`] - keeps written records in memory
//! * [`NullRecorder`] - discards everything
//!
//! ```rust
//! use gradvar_core::record::{Record, RecordValue};
//!
//! let mut record = Record::empty();
//! record.insert("Itr", RecordValue::Scalar(3.0));
//! record.insert("Step_0-AverageReturn", RecordValue::Scalar(-12.5));
//! assert_eq!(record.get_scalar("Itr").unwrap(), 3.0);
//! ```
mod base;
mod buffered_recorder;
mod null_recorder;
mod recorder;
mod storage;

pub use base::{Record, RecordValue};
pub use buffered_recorder::BufferedRecorder;
pub use null_recorder::NullRecorder;
pub use recorder::Recorder;
pub use storage::RecordStorage;
