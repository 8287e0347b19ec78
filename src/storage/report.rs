//! Append-only attempt report and plain-text error log
//!
//! Both files are opened in append mode and flushed after every line, so a crash
//! loses at most the line being written.

use crate::state::AttemptResult;
use crate::storage::LedgerError;
use chrono::Utc;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

fn open_append(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Line-delimited JSON report, one object per attempt
pub struct ReportWriter {
    file: File,
}

impl ReportWriter {
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        Ok(Self {
            file: open_append(path)?,
        })
    }

    pub fn append(&mut self, attempt: &AttemptResult) -> Result<(), LedgerError> {
        let mut line = serde_json::to_string(attempt)?;
        line.push('\n');
        self.file.write_all(line.as_bytes())?;
        self.file.flush()?;
        Ok(())
    }
}

/// Tab-separated `{timestamp}\t{url}\t{message}` lines for quick triage
pub struct ErrorLog {
    file: File,
}

impl ErrorLog {
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        Ok(Self {
            file: open_append(path)?,
        })
    }

    pub fn append(&mut self, url: &str, message: &str) -> Result<(), LedgerError> {
        // Tabs and newlines inside the message would break the line format
        let message = message.replace(['\t', '\n', '\r'], " ");
        writeln!(
            self.file,
            "{}\t{}\t{}",
            Utc::now().to_rfc3339(),
            url,
            message
        )?;
        self.file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Target;
    use crate::state::{AttemptStatus, Strategy};
    use tempfile::TempDir;
    use url::Url;

    fn failed(id: &str) -> AttemptResult {
        let target = Target {
            id: id.to_string(),
            title: id.to_string(),
            url: Url::parse("https://example.com/").unwrap(),
        };
        AttemptResult::failed(&target, Strategy::None, None, "timed out", 10)
    }

    #[test]
    fn test_report_appends_json_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("report.jsonl");

        let mut report = ReportWriter::open(&path).unwrap();
        report.append(&failed("a")).unwrap();
        report.append(&failed("b")).unwrap();
        drop(report);

        // Reopening keeps existing lines
        let mut report = ReportWriter::open(&path).unwrap();
        report.append(&failed("c")).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<AttemptResult> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2].target_id, "c");
        assert_eq!(lines[0].status, AttemptStatus::Failed);
    }

    #[test]
    fn test_error_log_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("errors.log");

        let mut log = ErrorLog::open(&path).unwrap();
        log.append("https://bad.invalid/", "dns\terror\nline").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let fields: Vec<&str> = content.trim_end().split('\t').collect();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[1], "https://bad.invalid/");
        assert_eq!(fields[2], "dns error line");
    }
}
