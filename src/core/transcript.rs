//! Per-call transcript recorder.
//!
//! Entries are kept in memory for the lifetime of a call and written out as a
//! single plain-text file when the call ends.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};
use tracing::debug;

/// Default directory for transcript files, relative to the working directory.
pub const DEFAULT_TRANSCRIPT_DIR: &str = "logs";

const ISO_8601_MILLIS: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
);

#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("Failed to write transcript {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Who said a transcript line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Speaker {
    System,
    Customer,
    Assistant,
    #[default]
    Unknown,
}

impl Speaker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Speaker::System => "system",
            Speaker::Customer => "customer",
            Speaker::Assistant => "assistant",
            Speaker::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable transcript line.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptEntry {
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: OffsetDateTime,
}

impl TranscriptEntry {
    /// Create an entry stamped with the current time.
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: OffsetDateTime) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Render as `[timestamp] speaker: text`.
    pub fn format_line(&self) -> String {
        format!(
            "[{}] {}: {}",
            iso_timestamp(self.timestamp),
            self.speaker,
            self.text
        )
    }
}

impl Default for TranscriptEntry {
    fn default() -> Self {
        Self::new(Speaker::Unknown, String::new())
    }
}

/// ISO-8601 UTC timestamp with millisecond precision, e.g. `2024-05-01T10:00:00.000Z`.
pub fn iso_timestamp(timestamp: OffsetDateTime) -> String {
    timestamp
        .to_offset(UtcOffset::UTC)
        .format(ISO_8601_MILLIS)
        .unwrap_or_else(|_| timestamp.unix_timestamp().to_string())
}

/// Replace everything outside `[A-Za-z0-9_-]` with `_`.
fn sanitize_session_id(session_id: &str) -> String {
    let sanitized: String = session_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() {
        "unknown".to_string()
    } else {
        sanitized
    }
}

/// Build the transcript file name for a session created at `created_at`.
pub fn transcript_file_name(created_at: OffsetDateTime, session_id: &str) -> String {
    format!(
        "{}-{}.txt",
        iso_timestamp(created_at).replace(':', "-"),
        sanitize_session_id(session_id)
    )
}

/// Append-only transcript for one call.
#[derive(Debug)]
pub struct SessionLogger {
    file_path: PathBuf,
    entries: Vec<TranscriptEntry>,
    persisted: bool,
}

impl SessionLogger {
    pub fn new(log_dir: impl AsRef<Path>, session_id: &str) -> Self {
        let file_name = transcript_file_name(OffsetDateTime::now_utc(), session_id);
        Self {
            file_path: log_dir.as_ref().join(file_name),
            entries: Vec::new(),
            persisted: false,
        }
    }

    pub fn push(&mut self, entry: TranscriptEntry) {
        self.entries.push(entry);
    }

    /// Render the whole transcript, one line per entry with a trailing newline.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&entry.format_line());
            out.push('\n');
        }
        out
    }

    /// Write the transcript to disk.
    ///
    /// Returns `Ok(None)` when nothing was recorded or the transcript was
    /// already written. The file appears in one step: content goes to a
    /// sibling temp file which is then renamed into place.
    pub async fn persist(&mut self) -> Result<Option<PathBuf>, TranscriptError> {
        if self.persisted || self.entries.is_empty() {
            return Ok(None);
        }
        self.persisted = true;

        let write_err = |path: &Path, source: std::io::Error| TranscriptError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = self.file_path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| write_err(parent, e))?;
        }

        let tmp_path = self.file_path.with_extension("txt.tmp");
        tokio::fs::write(&tmp_path, self.render())
            .await
            .map_err(|e| write_err(&tmp_path, e))?;
        tokio::fs::rename(&tmp_path, &self.file_path)
            .await
            .map_err(|e| write_err(&self.file_path, e))?;

        debug!(
            path = %self.file_path.display(),
            entries = self.entries.len(),
            "Transcript written"
        );
        Ok(Some(self.file_path.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use time::macros::datetime;

    #[test]
    fn test_iso_timestamp_has_millis() {
        let ts = datetime!(2024-05-01 10:02:03.456 UTC);
        assert_eq!(iso_timestamp(ts), "2024-05-01T10:02:03.456Z");
    }

    #[test]
    fn test_file_name_sanitizes() {
        let ts = datetime!(2024-05-01 10:02:03.456 UTC);
        assert_eq!(
            transcript_file_name(ts, "abc/def:1"),
            "2024-05-01T10-02-03.456Z-abc_def_1.txt"
        );
        assert_eq!(
            transcript_file_name(ts, ""),
            "2024-05-01T10-02-03.456Z-unknown.txt"
        );
        assert_eq!(
            transcript_file_name(ts, "a1-b2_c3"),
            "2024-05-01T10-02-03.456Z-a1-b2_c3.txt"
        );
    }

    #[test]
    fn test_default_entry() {
        let entry = TranscriptEntry::default();
        assert_eq!(entry.speaker, Speaker::Unknown);
        assert!(entry.text.is_empty());
        assert!(entry.format_line().ends_with("] unknown: "));
    }

    #[tokio::test]
    async fn test_persist_without_entries_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let mut logger = SessionLogger::new(dir.path(), "session-1");

        let result = logger.persist().await.unwrap();
        assert!(result.is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_persist_writes_lines_in_order() {
        let dir = TempDir::new().unwrap();
        let mut logger = SessionLogger::new(dir.path(), "session-1");
        logger.push(
            TranscriptEntry::new(Speaker::System, "Call connected (CA1).")
                .with_timestamp(datetime!(2024-05-01 10:00:00 UTC)),
        );
        logger.push(
            TranscriptEntry::new(Speaker::Customer, "Hello")
                .with_timestamp(datetime!(2024-05-01 10:00:01.5 UTC)),
        );

        let path = logger.persist().await.unwrap().unwrap();
        assert!(path.starts_with(dir.path()));
        assert!(path.to_string_lossy().ends_with("-session-1.txt"));

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "[2024-05-01T10:00:00.000Z] system: Call connected (CA1).\n\
             [2024-05-01T10:00:01.500Z] customer: Hello\n"
        );
    }

    #[tokio::test]
    async fn test_persist_only_once() {
        let dir = TempDir::new().unwrap();
        let mut logger = SessionLogger::new(dir.path(), "s");
        logger.push(TranscriptEntry::new(Speaker::Assistant, "Hi"));

        assert!(logger.persist().await.unwrap().is_some());
        assert!(logger.persist().await.unwrap().is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_persist_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("nested").join("logs");
        let mut logger = SessionLogger::new(&nested, "s");
        logger.push(TranscriptEntry::new(Speaker::System, "x"));

        let path = logger.persist().await.unwrap().unwrap();
        assert!(path.exists());
    }
}
