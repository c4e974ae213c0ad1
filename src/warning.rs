use std::fmt;
use std::path::PathBuf;

/// Non-fatal conditions met during a deployment.
/// These are reported to the user but never fail the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployWarning {
    /// Pruning was requested but the repository has no semantic-version tags
    NoTaggedVersions { repository: PathBuf },
    /// The deployed version is not among the repository's tags, so it takes no retention slot
    CurrentVersionNotTagged { version: String },
    /// A version selected for removal had no objects left in the bucket
    NothingToRemove { tag: String },
}

impl fmt::Display for DeployWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeployWarning::NoTaggedVersions { repository } => write!(
                f,
                "No version tags found in '{}', nothing to prune",
                repository.display()
            ),
            DeployWarning::CurrentVersionNotTagged { version } => {
                write!(f, "Version '{}' is not tagged in the repository", version)
            }
            DeployWarning::NothingToRemove { tag } => {
                write!(f, "No objects found for version '{}'", tag)
            }
        }
    }
}
