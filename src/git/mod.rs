//! Repository history access
//!
//! This module provides a trait-based abstraction over reading the commit log
//! of a repository, so that version history can come from a real Git
//! repository or from a mock in tests.
//!
//! # Overview
//!
//! - [CommitLog]: the log provider contract
//! - [repository::Git2Log]: a real implementation using the `git2` crate
//! - [mock::MockLog]: a canned log for testing
//!
//! [read_versions] turns a log into the newest-first list of
//! [VersionRecord]s the retention policy works on.
//!
//! ```rust
//! # use cloud_pages::git::{read_versions, CommitLog};
//! # use std::path::Path;
//! # fn example<L: CommitLog>(log: &L) -> cloud_pages::Result<()> {
//! for version in read_versions(log, Path::new("."))? {
//!     println!("{} -> {}", version.tag, version.hash);
//! }
//! # Ok(())
//! # }
//! ```

pub mod mock;
pub mod repository;

pub use mock::MockLog;
pub use repository::Git2Log;

use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::{expand_versions, CommitRecord, VersionRecord};
use crate::error::Result;

/// A raw entry of the repository log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// The full commit hash
    pub hash: String,
    /// The commit date
    pub date: DateTime<Utc>,
    /// The one-line message, decorated with the refs pointing at the commit
    pub message: String,
}

impl LogEntry {
    pub fn new(hash: impl Into<String>, date: DateTime<Utc>, message: impl Into<String>) -> Self {
        LogEntry {
            hash: hash.into(),
            date,
            message: message.into(),
        }
    }
}

/// Source of repository commit history
///
/// ## Ordering
///
/// Entries are returned newest first, the native `git log` order. The
/// retention policy relies on this order to tell recent versions apart.
///
/// ## Error Handling
///
/// Implementations report unreadable repositories as
/// [crate::error::CloudPagesError::RepositoryReadFailure] with the repository
/// path and the underlying cause.
pub trait CommitLog: Send + Sync {
    /// Read the commit log of the repository at `repository`
    fn log(&self, repository: &Path) -> Result<Vec<LogEntry>>;
}

/// Reads the repository log and normalizes it into version records.
///
/// Each commit contributes one record per valid semantic-version tag found in
/// its decorated message; untagged commits contribute nothing.
pub fn read_versions<L: CommitLog + ?Sized>(
    log: &L,
    repository: &Path,
) -> Result<Vec<VersionRecord>> {
    let entries = log.log(repository)?;
    debug!(commits = entries.len(), "Read repository log");

    let commits = entries
        .into_iter()
        .map(|entry| CommitRecord::parse(entry.hash, entry.date, entry.message));
    let versions = expand_versions(commits);

    debug!(versions = versions.len(), "Found tagged versions");
    Ok(versions)
}
