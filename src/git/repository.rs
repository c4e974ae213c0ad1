use std::collections::HashMap;
use std::path::Path;

use chrono::{TimeZone, Utc};
use git2::{Oid, Repository as Git2Repo, Sort};

use crate::error::{CloudPagesError, Result};
use crate::git::{CommitLog, LogEntry};

/// Commit log backed by a git repository on disk, read through `git2`
///
/// Messages are rendered like `git log --format='%s%d'`: the commit summary
/// followed by the refs that point at the commit, e.g.
/// `Release 1.2.0 (HEAD -> main, tag: v1.2.0)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Git2Log;

impl Git2Log {
    pub fn new() -> Self {
        Git2Log
    }

    /// Map every commit to the labels of the refs pointing at it
    fn decorations(repo: &Git2Repo) -> std::result::Result<HashMap<Oid, Vec<String>>, git2::Error> {
        let mut decorations: HashMap<Oid, Vec<String>> = HashMap::new();

        for reference in repo.references()? {
            let reference = reference?;
            let Some(name) = reference.name() else {
                continue;
            };

            let label = if let Some(tag) = name.strip_prefix("refs/tags/") {
                format!("tag: {}", tag)
            } else if let Some(branch) = name.strip_prefix("refs/heads/") {
                branch.to_string()
            } else if let Some(remote) = name.strip_prefix("refs/remotes/") {
                remote.to_string()
            } else {
                continue;
            };

            // Annotated tags peel through the tag object; refs to trees or blobs are skipped
            let Ok(commit) = reference.peel_to_commit() else {
                continue;
            };
            decorations.entry(commit.id()).or_default().push(label);
        }

        Ok(decorations)
    }

    fn read(repository: &Path) -> std::result::Result<Vec<LogEntry>, git2::Error> {
        let repo = Git2Repo::discover(repository)?;
        let decorations = Self::decorations(&repo)?;

        let mut revwalk = repo.revwalk()?;
        revwalk.push_head()?;
        revwalk.set_sorting(Sort::TIME)?;

        let mut entries = Vec::new();
        for oid_result in revwalk {
            let oid = oid_result?;
            let commit = repo.find_commit(oid)?;

            let summary = commit.summary().unwrap_or_default();
            let message = match decorations.get(&oid) {
                Some(refs) => format!("{} ({})", summary, refs.join(", ")),
                None => summary.to_string(),
            };

            let seconds = commit.author().when().seconds();
            let date = Utc
                .timestamp_opt(seconds, 0)
                .single()
                .ok_or_else(|| git2::Error::from_str("commit date out of range"))?;

            entries.push(LogEntry {
                hash: oid.to_string(),
                date,
                message,
            });
        }

        Ok(entries)
    }
}

impl CommitLog for Git2Log {
    fn log(&self, repository: &Path) -> Result<Vec<LogEntry>> {
        Self::read(repository).map_err(|e| CloudPagesError::repository(repository, e))
    }
}
