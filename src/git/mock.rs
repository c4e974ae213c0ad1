use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::error::{CloudPagesError, Result};
use crate::git::{CommitLog, LogEntry};

/// Mock commit log for testing without a git repository
#[derive(Debug, Default)]
pub struct MockLog {
    entries: Vec<LogEntry>,
    failure: Option<String>,
    requests: Mutex<Vec<PathBuf>>,
}

impl MockLog {
    /// Create a new empty mock log
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock whose reads always fail with the given message
    pub fn failing(message: impl Into<String>) -> Self {
        MockLog {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// Append an entry; entries are returned in insertion order
    pub fn with_entry(
        mut self,
        hash: impl Into<String>,
        date: DateTime<Utc>,
        message: impl Into<String>,
    ) -> Self {
        self.entries.push(LogEntry::new(hash, date, message));
        self
    }

    /// Repository paths the log has been asked for
    pub fn requests(&self) -> Vec<PathBuf> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

impl CommitLog for MockLog {
    fn log(&self, repository: &Path) -> Result<Vec<LogEntry>> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(repository.to_path_buf());
        }

        match &self.failure {
            Some(message) => Err(CloudPagesError::repository(
                repository,
                git2::Error::from_str(message),
            )),
            None => Ok(self.entries.clone()),
        }
    }
}
