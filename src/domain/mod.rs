//! Domain logic - pure rules over commit history, independent of git and storage

pub mod commit;
pub mod retention;
pub mod version;

pub use commit::{parse_version_tags, CommitRecord};
pub use retention::{Retention, RetentionPolicy, DEFAULT_KEEP_COUNT, DEFAULT_KEEP_DELAY};
pub use version::{expand_versions, VersionRecord};
