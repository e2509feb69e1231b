//! # JSONL Report Log
//!
//! Appends every telemetry report to a daily-rotated JSON Lines file.
//! Searching status lines are not logged.

use std::io::Write;
use std::path::Path;

use async_trait::async_trait;
use tracing::debug;
use tracing_appender::rolling::{RollingFileAppender, Rotation};

use super::sink::ReportSink;
use crate::config::TelemetryConfig;
use crate::error::{IssBridgeError, Result};

/// Report sink backed by a rolling file
pub struct JsonlLogger<W: Write + Send = RollingFileAppender> {
    writer: W,
    records: u64,
}

impl JsonlLogger {
    /// Open a daily-rotated log `<dir>/<prefix>.<date>`, keeping `max_files` files
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created or the log file cannot be opened
    pub fn open<P: AsRef<Path>>(dir: P, prefix: &str, max_files: usize) -> Result<Self> {
        let appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(prefix)
            .max_log_files(max_files)
            .build(dir.as_ref())
            .map_err(|e| {
                IssBridgeError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("Failed to open report log in {}: {}", dir.as_ref().display(), e),
                ))
            })?;

        debug!("Report log opened in {}", dir.as_ref().display());
        Ok(Self::new(appender))
    }

    /// Open the log described by the `[telemetry]` configuration section
    pub fn from_config(config: &TelemetryConfig) -> Result<Self> {
        Self::open(&config.log_dir, &config.log_prefix, config.max_files_to_keep)
    }
}

impl<W: Write + Send> JsonlLogger<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, records: 0 }
    }

    /// Reports written so far
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Append one report line
    pub fn write_record(&mut self, line: &str) -> Result<()> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.records += 1;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<W: Write + Send> ReportSink for JsonlLogger<W> {
    async fn emit_report(&mut self, line: &str) -> Result<()> {
        self.write_record(line)
    }

    async fn emit_status(&mut self, _line: &str) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_record() {
        let mut logger = JsonlLogger::new(Vec::new());
        logger.write_record("{ \"a\": 1 }").unwrap();
        logger.write_record("{ \"a\": 2 }").unwrap();

        assert_eq!(logger.records(), 2);
        let text = String::from_utf8(logger.into_inner()).unwrap();
        assert_eq!(text, "{ \"a\": 1 }\n{ \"a\": 2 }\n");
    }

    #[tokio::test]
    async fn test_status_lines_are_not_logged() {
        let mut logger = JsonlLogger::new(Vec::new());
        logger.emit_status("Searching 1 at 902355835 Hz").await.unwrap();
        logger.emit_report("{ \"version\": \"1.0\" }").await.unwrap();

        assert_eq!(logger.records(), 1);
        let text = String::from_utf8(logger.into_inner()).unwrap();
        assert!(!text.contains("Searching"));
    }

    #[test]
    fn test_open_rolling_log() {
        let dir = tempfile::tempdir().unwrap();
        let mut logger = JsonlLogger::open(dir.path(), "iss.jsonl", 3).unwrap();
        logger.write_record("{ \"version\": \"1.0\" }").unwrap();
        drop(logger);

        let mut contents = String::new();
        for entry in std::fs::read_dir(dir.path()).unwrap() {
            let path = entry.unwrap().path();
            let name = path.file_name().unwrap().to_string_lossy().to_string();
            assert!(name.starts_with("iss.jsonl"), "Unexpected file {}", name);
            contents.push_str(&std::fs::read_to_string(&path).unwrap());
        }

        assert_eq!(contents, "{ \"version\": \"1.0\" }\n");
    }

    #[test]
    fn test_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = TelemetryConfig {
            log_enabled: true,
            log_dir: dir.path().join("nested").to_string_lossy().to_string(),
            ..TelemetryConfig::default()
        };

        let logger = JsonlLogger::from_config(&config).unwrap();
        assert_eq!(logger.records(), 0);
    }
}
