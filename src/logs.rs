//! Append-only error and incident logs.
//!
//! Each log class is one text file. Records are an RFC 3339 timestamp line,
//! the free-text body, and a blank separator line. Consumers treat the whole
//! file as one opaque string.

use crate::error::{Result, ServiceError};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

/// One of the two persisted log streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogClass {
    Errors,
    Incidents,
}

impl LogClass {
    /// Replay order for new subscribers.
    pub const ALL: [LogClass; 2] = [LogClass::Errors, LogClass::Incidents];

    /// File name of this log, also used as the JSON key when pushed.
    pub fn file_name(self) -> &'static str {
        match self {
            LogClass::Errors => "errors.log",
            LogClass::Incidents => "incidents.log",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogClass::Errors => "errors",
            LogClass::Incidents => "incidents",
        }
    }
}

impl fmt::Display for LogClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogClass {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "errors" | "errors.log" => Ok(LogClass::Errors),
            "incidents" | "incidents.log" => Ok(LogClass::Incidents),
            other => Err(ServiceError::config_error(format!(
                "Unknown log class: {}",
                other
            ))),
        }
    }
}

/// Push message carrying the full content of one log.
pub fn log_message(class: LogClass, content: &str) -> String {
    serde_json::json!({ class.file_name(): content }).to_string()
}

/// Format one record as written to disk.
pub fn format_record(at: DateTime<Utc>, body: &str) -> String {
    format!(
        "{}\n{}\n\n",
        at.to_rfc3339_opts(SecondsFormat::Millis, true),
        body
    )
}

/// Writes and reads the log files in one directory.
///
/// Every write and read goes through one lock, so a reader never observes a
/// partially appended record.
#[derive(Debug)]
pub struct LogSink {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl LogSink {
    /// Open a sink rooted at `dir`, creating the directory if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, class: LogClass) -> PathBuf {
        self.dir.join(class.file_name())
    }

    /// Append a timestamped record and return the log's full content.
    ///
    /// The record is synced to disk before this returns, so the returned
    /// content can be forwarded to subscribers straight away.
    pub async fn write(&self, class: LogClass, body: &str) -> Result<String> {
        let _guard = self.lock.lock().await;
        let path = self.path(class);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(format_record(Utc::now(), body).as_bytes())
            .await?;
        file.sync_data().await?;
        debug!("Appended {} record to {:?}", class, path);

        Ok(fs::read_to_string(&path).await?)
    }

    /// Full content of a log, or `None` if it has never been written.
    pub async fn read(&self, class: LogClass) -> Result<Option<String>> {
        let _guard = self.lock.lock().await;
        match fs::read_to_string(self.path(class)).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_log_class_names() {
        assert_eq!(LogClass::Errors.file_name(), "errors.log");
        assert_eq!(LogClass::Incidents.file_name(), "incidents.log");
        assert_eq!("incidents".parse::<LogClass>().unwrap(), LogClass::Incidents);
        assert_eq!("errors.log".parse::<LogClass>().unwrap(), LogClass::Errors);
        assert!("metrics".parse::<LogClass>().is_err());
    }

    #[test]
    fn test_format_record() {
        let at = Utc.timestamp_millis_opt(1693741005254).unwrap();
        assert_eq!(
            format_record(at, "Test Error"),
            "2023-09-03T11:36:45.254Z\nTest Error\n\n"
        );
    }

    #[test]
    fn test_log_message_shape() {
        let message = log_message(LogClass::Errors, "line\n");
        let value: serde_json::Value = serde_json::from_str(&message).unwrap();
        assert_eq!(value["errors.log"], "line\n");
    }

    #[tokio::test]
    async fn test_read_missing_log() {
        let dir = tempfile::tempdir().unwrap();
        let sink = LogSink::open(dir.path()).await.unwrap();
        assert!(sink.read(LogClass::Errors).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_write_appends_to_named_class() {
        let dir = tempfile::tempdir().unwrap();
        let sink = LogSink::open(dir.path()).await.unwrap();

        sink.write(LogClass::Errors, "first").await.unwrap();
        let content = sink.write(LogClass::Errors, "second").await.unwrap();

        assert!(content.contains("first\n\n"));
        assert!(content.ends_with("second\n\n"));
        assert_eq!(sink.read(LogClass::Errors).await.unwrap(), Some(content));
        assert!(sink.read(LogClass::Incidents).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_open_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("logs").join("battery");
        let sink = LogSink::open(&nested).await.unwrap();
        sink.write(LogClass::Incidents, "hot").await.unwrap();
        assert!(nested.join("incidents.log").exists());
    }
}
