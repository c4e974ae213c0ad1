//! Retention policy for deployed versions.
//!
//! Old versions are kept around for a while so that visitors still running a
//! previous frontend do not hit missing assets. A version becomes removable
//! once it is both outside the `keep_count` most recent tagged versions and
//! older than `keep_delay`. The version being deployed is never removable.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::version::VersionRecord;

/// Number of most recent versions kept by default
pub const DEFAULT_KEEP_COUNT: usize = 4;

/// Minimum age before a version may be removed, by default one month
pub const DEFAULT_KEEP_DELAY: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Why a version is kept, or that it can go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    /// The version currently being deployed
    Current,
    /// Among the `keep_count` most recent versions
    WithinKeepCount,
    /// Not older than `keep_delay`
    WithinKeepDelay,
    /// Eligible for removal
    Remove,
}

impl Retention {
    pub fn is_removable(self) -> bool {
        self == Retention::Remove
    }
}

impl fmt::Display for Retention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Retention::Current => "current",
            Retention::WithinKeepCount => "recent",
            Retention::WithinKeepDelay => "too young",
            Retention::Remove => "remove",
        };
        f.write_str(label)
    }
}

/// How many prior versions to keep, and for how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub keep_count: usize,
    pub keep_delay: Duration,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        RetentionPolicy {
            keep_count: DEFAULT_KEEP_COUNT,
            keep_delay: DEFAULT_KEEP_DELAY,
        }
    }
}

impl RetentionPolicy {
    pub fn new(keep_count: usize, keep_delay: Duration) -> Self {
        RetentionPolicy {
            keep_count,
            keep_delay,
        }
    }

    /// Versions strictly older than the returned instant are old enough to remove.
    ///
    /// Returns `None` when `now - keep_delay` falls outside the representable
    /// time range, in which case nothing is old enough.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let delay = chrono::Duration::from_std(self.keep_delay).ok()?;
        now.checked_sub_signed(delay)
    }

    /// Decides the fate of the record at `index` in the newest-first history.
    ///
    /// The index counts every record, the current version included, so the
    /// current version still occupies one of the `keep_count` slots.
    pub fn decide(
        &self,
        index: usize,
        record: &VersionRecord,
        current_version: &str,
        now: DateTime<Utc>,
    ) -> Retention {
        if record.tag == current_version {
            return Retention::Current;
        }
        if index < self.keep_count {
            return Retention::WithinKeepCount;
        }
        match self.cutoff(now) {
            Some(cutoff) if record.timestamp < cutoff => Retention::Remove,
            _ => Retention::WithinKeepDelay,
        }
    }

    /// Decisions for the whole history, in the order received
    pub fn evaluate<'a>(
        &self,
        versions: &'a [VersionRecord],
        current_version: &str,
        now: DateTime<Utc>,
    ) -> Vec<(&'a VersionRecord, Retention)> {
        versions
            .iter()
            .enumerate()
            .map(|(i, record)| (record, self.decide(i, record, current_version, now)))
            .collect()
    }

    /// Selects the versions eligible for removal
    pub fn select_removable<'a>(
        &self,
        versions: &'a [VersionRecord],
        current_version: &str,
        now: DateTime<Utc>,
    ) -> Vec<&'a VersionRecord> {
        self.evaluate(versions, current_version, now)
            .into_iter()
            .filter(|(_, retention)| retention.is_removable())
            .map(|(record, _)| record)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2010, 3, 6, 0, 0, 0).unwrap()
    }

    fn record(tag: &str, age: Duration) -> VersionRecord {
        let ts = now() - chrono::Duration::from_std(age).unwrap();
        VersionRecord::new(tag, "1fb2cd74", ts, format!("{} (tag: {})", tag, tag))
    }

    #[test]
    fn test_defaults() {
        let policy = RetentionPolicy::default();
        assert_eq!(policy.keep_count, 4);
        assert_eq!(policy.keep_delay, 30 * DAY);
    }

    #[test]
    fn test_old_versions_beyond_keep_count_are_removed() {
        let versions = vec![
            record("v4.0.0", DAY),
            record("v3.0.0", 10 * DAY),
            record("v2.0.0", 20 * DAY),
            record("v1.0.0", 40 * DAY),
        ];
        let policy = RetentionPolicy::new(2, 15 * DAY);

        let removable = policy.select_removable(&versions, "v4.0.0", now());
        let tags: Vec<_> = removable.iter().map(|v| v.tag.as_str()).collect();
        assert_eq!(tags, vec!["v2.0.0", "v1.0.0"]);
    }

    #[test]
    fn test_young_versions_survive_keep_count() {
        let versions = vec![record("v2.0.0", DAY), record("v1.0.0", 2 * DAY)];
        let policy = RetentionPolicy::new(0, 7 * DAY);

        assert!(policy.select_removable(&versions, "v3.0.0", now()).is_empty());
    }

    #[test]
    fn test_current_version_still_consumes_a_slot() {
        let versions = vec![
            record("v3.0.0", 90 * DAY),
            record("v2.0.0", 90 * DAY),
            record("v1.0.0", 90 * DAY),
        ];
        let policy = RetentionPolicy::new(2, DAY);

        let decisions: Vec<_> = policy
            .evaluate(&versions, "v3.0.0", now())
            .into_iter()
            .map(|(_, r)| r)
            .collect();
        assert_eq!(
            decisions,
            vec![
                Retention::Current,
                Retention::WithinKeepCount,
                Retention::Remove
            ]
        );
    }

    #[test]
    fn test_current_version_is_kept_at_any_age() {
        let versions = vec![record("v2.0.0", DAY), record("v1.0.0", 400 * DAY)];
        let policy = RetentionPolicy::new(0, Duration::ZERO);

        let removable = policy.select_removable(&versions, "v1.0.0", now());
        assert_eq!(removable.len(), 1);
        assert_eq!(removable[0].tag, "v2.0.0");
    }

    #[test]
    fn test_zero_delay_keeps_records_at_now() {
        let versions = vec![
            VersionRecord::new("v2.0.0", "a", now(), ""),
            record("v1.0.0", Duration::from_secs(1)),
        ];
        let policy = RetentionPolicy::new(0, Duration::ZERO);

        let removable = policy.select_removable(&versions, "v9.9.9", now());
        let tags: Vec<_> = removable.iter().map(|v| v.tag.as_str()).collect();
        assert_eq!(tags, vec!["v1.0.0"]);
    }

    #[test]
    fn test_cutoff_underflow_keeps_everything() {
        let versions = vec![record("v1.0.0", 400 * DAY)];
        let policy = RetentionPolicy::new(0, Duration::from_secs(u64::MAX));

        assert_eq!(policy.cutoff(now()), None);
        assert!(policy.select_removable(&versions, "v2.0.0", now()).is_empty());
    }

    #[test]
    fn test_retention_display() {
        assert_eq!(Retention::Remove.to_string(), "remove");
        assert_eq!(Retention::Current.to_string(), "current");
    }
}
