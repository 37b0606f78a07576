//! Append-only audit log of prediction requests.
//!
//! One CSV row per scored request: canonical feature values, prediction,
//! probability, status, execution time and timestamp. The file is the input
//! of the offline drift check, so the column layout is fixed.

use crate::error::AuditError;
use crate::types::outcome::{round_probability, ChurnLabel};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, error};

/// Columns appended after the feature columns
pub const TRAILING_COLUMNS: [&str; 5] = ["prediction", "probability", "status", "exec_time", "timestamp"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditStatus {
    Success,
    Error,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditStatus::Success => "success",
            AuditStatus::Error => "error",
        }
    }
}

/// One audit row. Built once per request, never mutated after append.
#[derive(Debug, Clone)]
pub struct AuditRecord {
    /// Feature name and value in schema order
    pub fields: Vec<(String, f64)>,
    pub prediction: Option<ChurnLabel>,
    pub probability: Option<f64>,
    pub status: AuditStatus,
    pub exec_time: Duration,
    pub timestamp: DateTime<Utc>,
}

impl AuditRecord {
    pub fn success(
        fields: Vec<(String, f64)>,
        prediction: ChurnLabel,
        probability: f64,
        exec_time: Duration,
    ) -> Self {
        Self {
            fields,
            prediction: Some(prediction),
            probability: Some(probability),
            status: AuditStatus::Success,
            exec_time,
            timestamp: Utc::now(),
        }
    }

    pub fn failure(fields: Vec<(String, f64)>, exec_time: Duration) -> Self {
        Self {
            fields,
            prediction: None,
            probability: None,
            status: AuditStatus::Error,
            exec_time,
            timestamp: Utc::now(),
        }
    }

    fn header_line(&self) -> String {
        let columns = self
            .fields
            .iter()
            .map(|(name, _)| csv_field(name))
            .chain(TRAILING_COLUMNS.iter().map(|c| c.to_string()));
        join_line(columns)
    }

    fn row_line(&self) -> String {
        let columns = self
            .fields
            .iter()
            .map(|(_, value)| value.to_string())
            .chain([
                self.prediction.map(|p| p.to_string()).unwrap_or_default(),
                self.probability
                    .map(|p| round_probability(p).to_string())
                    .unwrap_or_default(),
                self.status.as_str().to_string(),
                format!("{:.6}", self.exec_time.as_secs_f64()),
                self.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
            ]);
        join_line(columns)
    }
}

fn join_line(columns: impl Iterator<Item = String>) -> String {
    let mut line = columns.collect::<Vec<_>>().join(",");
    line.push('\n');
    line
}

/// Quote a CSV field when it carries a delimiter, quote or newline
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// File-backed audit log shared by all request handlers
#[derive(Debug)]
pub struct AuditLogger {
    path: PathBuf,
    /// Lazily opened append handle; the lock is the append critical section
    file: Mutex<Option<File>>,
}

impl AuditLogger {
    pub fn new(log_dir: impl AsRef<Path>, file_name: &str) -> Self {
        Self {
            path: log_dir.as_ref().join(file_name),
            file: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a record; failures are logged and swallowed.
    pub fn record(&self, record: &AuditRecord) {
        if let Err(e) = self.try_record(record) {
            error!(
                path = %self.path.display(),
                status = record.status.as_str(),
                error = %e,
                "Failed to write audit record"
            );
        }
    }

    fn open(&self) -> Result<File, AuditError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        Ok(file)
    }

    /// Append a record, writing the header first if the file is empty.
    pub fn try_record(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let mut guard = self.file.lock().map_err(|_| AuditError::Poisoned)?;

        let file = match guard.take() {
            Some(file) => file,
            None => self.open()?,
        };
        let file = guard.insert(file);

        let mut buffer = String::new();
        if file.metadata()?.len() == 0 {
            buffer.push_str(&record.header_line());
        }
        buffer.push_str(&record.row_line());

        // Single write per record so rows never interleave
        file.write_all(buffer.as_bytes())?;
        file.flush()?;

        debug!(path = %self.path.display(), status = record.status.as_str(), "Audit record appended");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn fields() -> Vec<(String, f64)> {
        vec![
            ("tenure".to_string(), 12.0),
            ("MonthlyCharges".to_string(), 70.5),
        ]
    }

    fn success() -> AuditRecord {
        AuditRecord::success(
            fields(),
            ChurnLabel::WillChurn,
            0.812345,
            Duration::from_millis(3),
        )
    }

    #[test]
    fn test_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let logger = AuditLogger::new(dir.path().join("logs"), "predictions.csv");

        logger.try_record(&success()).unwrap();
        logger.try_record(&success()).unwrap();

        let contents = fs::read_to_string(logger.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "tenure,MonthlyCharges,prediction,probability,status,exec_time,timestamp"
        );
        assert!(lines[1].starts_with("12,70.5,Will Churn,0.8123,success,0.003000,"));
    }

    #[test]
    fn test_existing_file_keeps_single_header() {
        let dir = tempfile::tempdir().unwrap();
        AuditLogger::new(dir.path(), "audit.csv")
            .try_record(&success())
            .unwrap();
        // New logger instance, same file (process restart)
        AuditLogger::new(dir.path(), "audit.csv")
            .try_record(&success())
            .unwrap();

        let contents = fs::read_to_string(dir.path().join("audit.csv")).unwrap();
        assert_eq!(contents.matches("prediction,probability").count(), 1);
        assert_eq!(contents.lines().count(), 3);
    }

    #[test]
    fn test_failure_row() {
        let dir = tempfile::tempdir().unwrap();
        let logger = AuditLogger::new(dir.path(), "audit.csv");
        logger
            .try_record(&AuditRecord::failure(fields(), Duration::from_millis(1)))
            .unwrap();

        let contents = fs::read_to_string(logger.path()).unwrap();
        let row = contents.lines().nth(1).unwrap();
        assert!(row.starts_with("12,70.5,,,error,"));
    }

    #[test]
    fn test_concurrent_writers() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Arc::new(AuditLogger::new(dir.path(), "audit.csv"));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let logger = logger.clone();
                thread::spawn(move || {
                    for _ in 0..25 {
                        logger.try_record(&success()).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let contents = fs::read_to_string(logger.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 8 * 25 + 1);
        assert!(lines[1..].iter().all(|l| l.split(',').count() == 7));
    }

    #[test]
    fn test_unwritable_path_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        fs::write(&blocker, b"x").unwrap();

        let logger = AuditLogger::new(&blocker, "audit.csv");
        assert!(logger.try_record(&success()).is_err());
        // Must not panic
        logger.record(&success());
    }

    #[test]
    fn test_failed_open_reports_io_and_retries() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("logs");
        fs::write(&blocker, b"x").unwrap();

        let logger = AuditLogger::new(&blocker, "audit.csv");
        assert!(matches!(logger.try_record(&success()), Err(AuditError::Io(_))));

        fs::remove_file(&blocker).unwrap();
        logger.try_record(&success()).unwrap();
        assert_eq!(fs::read_to_string(logger.path()).unwrap().lines().count(), 2);
    }

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
