use chrono::{DateTime, Utc};

use super::commit::CommitRecord;

/// One deployable version: a semantic-version tag and the commit it points at.
///
/// A commit carrying several version tags yields one record per tag, all
/// sharing the commit's hash and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRecord {
    pub tag: String,
    pub hash: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl VersionRecord {
    /// Create a new version record
    pub fn new(
        tag: impl Into<String>,
        hash: impl Into<String>,
        timestamp: DateTime<Utc>,
        message: impl Into<String>,
    ) -> Self {
        VersionRecord {
            tag: tag.into(),
            hash: hash.into(),
            timestamp,
            message: message.into(),
        }
    }

    /// Key prefix holding this version's objects in the bucket
    pub fn prefix(&self) -> String {
        format!("{}/", self.tag)
    }
}

/// Expands commits into version records, keeping log order.
///
/// Commits without version tags contribute nothing.
pub fn expand_versions<I>(commits: I) -> Vec<VersionRecord>
where
    I: IntoIterator<Item = CommitRecord>,
{
    commits
        .into_iter()
        .flat_map(|commit| {
            let CommitRecord {
                hash,
                timestamp,
                message,
                tags,
            } = commit;
            tags.into_iter()
                .map(move |tag| VersionRecord::new(tag, hash.clone(), timestamp, message.clone()))
        })
        .collect()
}
