//! File discovery for the directory being deployed.
//!
//! Walks the directory and keeps regular files whose path relative to it
//! matches the include glob and not the ignore glob. Dot files are included,
//! directories are not, symlinks are followed. Object keys are UTF-8, so a
//! file whose name is not fails the scan rather than being skipped.

use std::io;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{CloudPagesError, Result};

/// Files deployed when no include pattern is given
pub const DEFAULT_FILES_PATTERN: &str = "**/*";

/// Version-control metadata is never deployed by default
pub const DEFAULT_IGNORE_PATTERN: &str = ".git/**/*";

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A file found under the deployed directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    /// Path on disk
    pub path: PathBuf,
    /// Path relative to the scanned directory, with `/` separators
    pub relative: String,
}

/// Pattern string reported in scan errors: the directory joined with the include glob
pub fn display_pattern(dir: &Path, files: &str) -> String {
    dir.join(files).display().to_string()
}

/// Lists the files of `dir` matching `files` and not matching `ignore`.
///
/// Results are sorted by relative path. An unreadable directory or an
/// invalid pattern is a [CloudPagesError::ScanFailure]; an empty result is
/// not an error here. A file name that is not UTF-8 is a scan failure too.
pub fn scan_files(dir: &Path, files: &str, ignore: &str) -> Result<Vec<ScannedFile>> {
    let pattern = display_pattern(dir, files);
    let scan_failure =
        |source: Box<dyn std::error::Error + Send + Sync>| CloudPagesError::ScanFailure {
            pattern: pattern.clone(),
            source,
        };

    let include = Pattern::new(files).map_err(|e| scan_failure(e.into()))?;
    let exclude = Pattern::new(ignore).map_err(|e| scan_failure(e.into()))?;

    let mut found = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry.map_err(|e| scan_failure(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = relative_key(dir, entry.path()).ok_or_else(|| {
            let message = format!("file name is not valid UTF-8: {}", entry.path().display());
            scan_failure(io::Error::new(io::ErrorKind::InvalidData, message).into())
        })?;
        let included = include.matches_with(&relative, MATCH_OPTIONS);
        if included && !exclude.matches_with(&relative, MATCH_OPTIONS) {
            found.push(ScannedFile {
                path: entry.into_path(),
                relative,
            });
        }
    }

    found.sort_by(|a, b| a.relative.cmp(&b.relative));
    debug!(pattern = %pattern, files = found.len(), "Scanned files");
    Ok(found)
}

/// Relative path of `path` under `dir`, joined with `/`; `None` for non UTF-8 names
fn relative_key(dir: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(dir).ok()?;
    let segments: Option<Vec<&str>> = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect();
    segments.map(|s| s.join("/"))
}
