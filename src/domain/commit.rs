use chrono::{DateTime, Utc};
use regex::Regex;

/// Trailing parenthesized ref group of a decorated log line, e.g. `(HEAD -> main, tag: v1.0.0)`
const TAG_GROUP_PATTERN: &str = r"\(([^)]+)\)$";

/// Prefix marking a tag inside a ref group
pub const TAG_MARKER: &str = "tag: ";

/// A commit from the repository log with the version tags found on it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub hash: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub tags: Vec<String>,
}

impl CommitRecord {
    /// Build a commit record, extracting version tags from the message
    pub fn parse(
        hash: impl Into<String>,
        timestamp: DateTime<Utc>,
        message: impl Into<String>,
    ) -> Self {
        let message = message.into();
        let tags = parse_version_tags(&message);

        CommitRecord {
            hash: hash.into(),
            timestamp,
            message,
            tags,
        }
    }
}

/// Extracts the semantic-version tags from the trailing ref group of a message.
///
/// Only entries of the form `tag: <name>` are considered, and only names that
/// parse as semantic versions are kept. Order is preserved and duplicates are
/// dropped.
///
/// # Example
/// ```ignore
/// assert_eq!(parse_version_tags("3.0.0 (tag: v3.0.0)"), vec!["v3.0.0"]);
/// assert!(parse_version_tags("fix typo").is_empty());
/// ```
pub fn parse_version_tags(message: &str) -> Vec<String> {
    let Some(captures) = Regex::new(TAG_GROUP_PATTERN)
        .ok()
        .and_then(|re| re.captures(message))
    else {
        return Vec::new();
    };

    let group = captures.get(1).map(|m| m.as_str()).unwrap_or_default();

    let mut tags: Vec<String> = Vec::new();
    for candidate in group
        .split(',')
        .map(str::trim)
        .filter_map(|entry| entry.strip_prefix(TAG_MARKER))
        .filter(|tag| is_semver_tag(tag))
    {
        if !tags.iter().any(|t| t == candidate) {
            tags.push(candidate.to_string());
        }
    }
    tags
}

/// Returns true when the tag is a valid semantic version, optionally prefixed with `v`
pub fn is_semver_tag(tag: &str) -> bool {
    let trimmed = tag.trim();
    let version = trimmed.strip_prefix('v').unwrap_or(trimmed);
    semver::Version::parse(version).is_ok()
}
