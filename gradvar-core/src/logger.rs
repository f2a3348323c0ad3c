//! Writes metrics and parameter snapshots into an experiment directory.
//!
//! [`ExperimentLogger`] implements [`Recorder`]. On every flush the aggregated
//! record is written to each configured [`OutputFormat`]:
//!
//! * [`OutputFormat::Stdout`] - a key/value table through [`log::info!`]
//! * [`OutputFormat::Log`] - the same table appended to `log.txt`
//! * [`OutputFormat::Csv`] - one row of `progress.csv`
//!
//! Snapshots passed to [`Recorder::save_snapshot`] are written according to
//! [`SnapshotMode`].
use crate::record::{Record, RecordStorage, RecordValue, Recorder};
use anyhow::Result;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet},
    fs::{self, File, OpenOptions},
    io::{BufReader, Write},
    path::{Path, PathBuf},
};

/// Name of the CSV file of progress.
pub const PROGRESS_CSV: &str = "progress.csv";

/// Name of the text log file.
pub const LOG_TXT: &str = "log.txt";

/// Name of the snapshot overwritten at every iteration.
pub const LAST_SNAPSHOT: &str = "snapshot_last.json";

/// Output destination of flushed records.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Tabular dump via [`log::info!`].
    Stdout,

    /// Tabular dump appended to `log.txt`.
    Log,

    /// Rows of `progress.csv`.
    Csv,
}

/// When parameter snapshots are written.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotMode {
    /// `itr_<n>.json` at every iteration.
    All,

    /// `snapshot_last.json`, overwritten at every iteration.
    Last,

    /// `itr_<n>.json` every `n` iterations.
    Gap(usize),

    /// `snapshot_last.json` at every iteration and `itr_<n>.json` every `n`
    /// iterations.
    LastGap(usize),

    /// No snapshot.
    None,
}

/// Configuration of [`ExperimentLogger`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct LoggerConfig {
    /// Directory where logs and snapshots are written.
    pub dir: PathBuf,

    /// Output formats of flushed records.
    pub formats: Vec<OutputFormat>,

    /// Snapshot policy.
    pub snapshot_mode: SnapshotMode,

    /// If set, only the most recent `itr_<n>.json` snapshots are kept.
    pub max_gap_snapshots: Option<usize>,
}

impl LoggerConfig {
    /// Creates a configuration writing to `dir` with all output formats and
    /// [`SnapshotMode::Last`].
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            formats: vec![OutputFormat::Stdout, OutputFormat::Log, OutputFormat::Csv],
            snapshot_mode: SnapshotMode::Last,
            max_gap_snapshots: None,
        }
    }

    /// Sets the output formats.
    pub fn formats(mut self, formats: Vec<OutputFormat>) -> Self {
        self.formats = formats;
        self
    }

    /// Sets the snapshot policy.
    pub fn snapshot_mode(mut self, mode: SnapshotMode) -> Self {
        self.snapshot_mode = mode;
        self
    }

    /// Sets the number of `itr_<n>.json` snapshots to keep.
    pub fn max_gap_snapshots(mut self, v: usize) -> Self {
        self.max_gap_snapshots = Some(v);
        self
    }

    /// Constructs [`LoggerConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`LoggerConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// Recorder writing into an experiment directory.
///
/// [`Recorder::write`] and [`Recorder::flush`] cannot fail. An I/O error on
/// `log.txt` or `progress.csv` is logged with `warn!` and training goes on,
/// so these files may miss rows after such an error. The other output
/// formats are still written. Errors on snapshots are returned by
/// [`Recorder::save_snapshot`].
pub struct ExperimentLogger {
    config: LoggerConfig,
    storage: RecordStorage,
    csv: Option<(csv::Writer<File>, Vec<String>)>,
    gap_snapshots: Vec<PathBuf>,
}

impl ExperimentLogger {
    /// Creates the experiment directory and the logger.
    pub fn new(config: LoggerConfig) -> Result<Self> {
        fs::create_dir_all(&config.dir)?;
        info!("Logging to {:?}", config.dir);
        Ok(Self {
            config,
            storage: RecordStorage::new(),
            csv: None,
            gap_snapshots: vec![],
        })
    }

    /// Directory of the logger.
    pub fn dir(&self) -> &Path {
        &self.config.dir
    }

    fn table(record: &BTreeMap<String, String>) -> String {
        let width_k = record.keys().map(|k| k.len()).max().unwrap_or(0);
        let width_v = record.values().map(|v| v.len()).max().unwrap_or(0);
        let dashes = "-".repeat(width_k + width_v + 7);
        let mut lines = vec![dashes.clone()];
        for (k, v) in record.iter() {
            lines.push(format!("| {:<wk$} | {:>wv$} |", k, v, wk = width_k, wv = width_v));
        }
        lines.push(dashes);
        lines.join("\n")
    }

    fn write_csv(&mut self, record: &BTreeMap<String, String>) -> Result<()> {
        if self.csv.is_none() {
            let path = self.config.dir.join(PROGRESS_CSV);
            let mut wtr = csv::Writer::from_path(path)?;
            let header: Vec<String> = record.keys().cloned().collect();
            wtr.write_record(&header)?;
            self.csv = Some((wtr, header));
        }

        if let Some((wtr, header)) = self.csv.as_mut() {
            let known: BTreeSet<&String> = header.iter().collect();
            for k in record.keys().filter(|k| !known.contains(k)) {
                warn!("Key {} is not in the header of {}; dropped", k, PROGRESS_CSV);
            }
            let row: Vec<&str> = header
                .iter()
                .map(|k| record.get(k).map(|v| v.as_str()).unwrap_or(""))
                .collect();
            wtr.write_record(&row)?;
            wtr.flush()?;
        }
        Ok(())
    }

    fn write_log(&self, record: &BTreeMap<String, String>) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.config.dir.join(LOG_TXT))?;
        writeln!(file, "{}", Self::table(record))?;
        Ok(())
    }

    fn dump(&mut self, record: Record) {
        let cells: BTreeMap<String, String> = record
            .iter()
            .map(|(k, v)| (k.clone(), v.to_cell()))
            .collect();
        let formats = self.config.formats.clone();

        for format in formats.iter() {
            let res = match format {
                OutputFormat::Stdout => {
                    info!("\n{}", Self::table(&cells));
                    Ok(())
                }
                OutputFormat::Log => self.write_log(&cells),
                OutputFormat::Csv => self.write_csv(&cells),
            };
            if let Err(e) = res {
                warn!("Failed to write a record to {:?} output: {}", format, e);
            }
        }
    }

    fn write_json(path: &Path, snapshot: &serde_json::Value) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer(file, snapshot)?;
        Ok(())
    }

    fn save_gap_snapshot(&mut self, itr: usize, snapshot: &serde_json::Value) -> Result<()> {
        let path = self.config.dir.join(format!("itr_{}.json", itr));
        Self::write_json(&path, snapshot)?;
        self.gap_snapshots.push(path);

        if let Some(n) = self.config.max_gap_snapshots {
            while self.gap_snapshots.len() > n {
                let old = self.gap_snapshots.remove(0);
                fs::remove_file(&old)?;
            }
        }
        Ok(())
    }
}

impl Recorder for ExperimentLogger {
    fn write(&mut self, record: Record) {
        self.dump(record);
    }

    fn store(&mut self, record: Record) {
        self.storage.store(record);
    }

    fn flush(&mut self, step: i64) {
        let mut record = self.storage.aggregate();
        record.insert("Itr", RecordValue::Scalar(step as f64));
        self.write(record);
    }

    fn save_snapshot(&mut self, itr: usize, snapshot: &serde_json::Value) -> Result<()> {
        match self.config.snapshot_mode {
            SnapshotMode::All => self.save_gap_snapshot(itr, snapshot)?,
            SnapshotMode::Last => {
                Self::write_json(&self.config.dir.join(LAST_SNAPSHOT), snapshot)?
            }
            SnapshotMode::Gap(gap) => {
                if gap > 0 && itr % gap == 0 {
                    self.save_gap_snapshot(itr, snapshot)?;
                }
            }
            SnapshotMode::LastGap(gap) => {
                Self::write_json(&self.config.dir.join(LAST_SNAPSHOT), snapshot)?;
                if gap > 0 && itr % gap == 0 {
                    self.save_gap_snapshot(itr, snapshot)?;
                }
            }
            SnapshotMode::None => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_csv_columns_fixed_by_first_row() -> Result<()> {
        let dir = TempDir::new("logger")?;
        let config = LoggerConfig::new(dir.path()).formats(vec![OutputFormat::Csv]);
        let mut logger = ExperimentLogger::new(config)?;

        logger.store(Record::from_scalar("a", 1.0));
        logger.flush(0);
        logger.store(Record::from_scalar("a", 2.0));
        logger.store(Record::from_scalar("a", 3.0));
        logger.store(Record::from_scalar("b", 5.0));
        logger.flush(1);

        let mut rdr = csv::Reader::from_path(dir.path().join(PROGRESS_CSV))?;
        let header: Vec<String> = rdr.headers()?.iter().map(|s| s.to_string()).collect();
        assert_eq!(header, vec!["Itr".to_string(), "a".to_string()]);
        let rows: Vec<csv::StringRecord> = rdr.records().collect::<Result<_, _>>()?;
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "0");
        // "a" was stored twice in the second iteration
        assert_eq!(&rows[1][1], "");
        Ok(())
    }

    #[test]
    fn test_failed_output_does_not_stop_others() -> Result<()> {
        let dir = TempDir::new("logger")?;
        // log.txt cannot be opened as a file
        fs::create_dir(dir.path().join(LOG_TXT))?;
        let config =
            LoggerConfig::new(dir.path()).formats(vec![OutputFormat::Log, OutputFormat::Csv]);
        let mut logger = ExperimentLogger::new(config)?;

        logger.store(Record::from_scalar("a", 1.0));
        logger.flush(0);
        logger.store(Record::from_scalar("a", 2.0));
        logger.flush(1);

        let mut rdr = csv::Reader::from_path(dir.path().join(PROGRESS_CSV))?;
        assert_eq!(rdr.records().count(), 2);
        assert!(dir.path().join(LOG_TXT).is_dir());
        Ok(())
    }

    #[test]
    fn test_last_gap_snapshots() -> Result<()> {
        let dir = TempDir::new("logger")?;
        let config = LoggerConfig::new(dir.path())
            .formats(vec![])
            .snapshot_mode(SnapshotMode::LastGap(2))
            .max_gap_snapshots(2);
        let mut logger = ExperimentLogger::new(config)?;

        for itr in 0..7 {
            logger.save_snapshot(itr, &serde_json::json!({ "itr": itr }))?;
        }

        assert!(dir.path().join(LAST_SNAPSHOT).exists());
        assert!(!dir.path().join("itr_0.json").exists());
        assert!(!dir.path().join("itr_2.json").exists());
        assert!(dir.path().join("itr_4.json").exists());
        assert!(dir.path().join("itr_6.json").exists());
        assert!(!dir.path().join("itr_5.json").exists());

        let last: serde_json::Value =
            serde_json::from_reader(File::open(dir.path().join(LAST_SNAPSHOT))?)?;
        assert_eq!(last["itr"], 6);
        Ok(())
    }

    #[test]
    fn test_log_txt_is_appended() -> Result<()> {
        let dir = TempDir::new("logger")?;
        let config = LoggerConfig::new(dir.path()).formats(vec![OutputFormat::Log]);
        let mut logger = ExperimentLogger::new(config)?;
        logger.write(Record::from_scalar("AverageReturn", -3.0));
        logger.write(Record::from_scalar("AverageReturn", -2.0));

        let text = fs::read_to_string(dir.path().join(LOG_TXT))?;
        assert_eq!(text.matches("AverageReturn").count(), 2);
        Ok(())
    }
}
