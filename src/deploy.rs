//! Deployment orchestration
//!
//! A deployment walks through a fixed sequence of stages:
//!
//! ```text
//! Validating -> Scanning -> Uploading -> ConfiguringAcl -> ConfiguringWebsite -> [Pruning] -> Done
//! ```
//!
//! Any stage may fail, and the error is returned as is. Uploads run on the
//! rayon pool; bucket settings are only touched once every upload succeeded,
//! and pruning only runs after the site is live.
//!
//! Collaborators are passed in explicitly: an [ObjectStore], a [CommitLog]
//! and a [Clock]. The binary wires real ones, tests wire in-memory ones.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info, info_span, warn};

use crate::clock::Clock;
use crate::domain::{Retention, RetentionPolicy, VersionRecord};
use crate::error::{CloudPagesError, Result, StoreError};
use crate::git::{read_versions, CommitLog};
use crate::prune::{prune_versions, PruneOutcome};
use crate::scan::{
    display_pattern, scan_files, ScannedFile, DEFAULT_FILES_PATTERN, DEFAULT_IGNORE_PATTERN,
};
use crate::store::{Acl, ObjectStore, PutObject, WebsiteConfiguration, DEFAULT_PAGE_SIZE};
use crate::warning::DeployWarning;

/// Everything a deployment needs to know.
///
/// `version`, `dir` and `bucket` are optional here so that a missing value
/// is reported by [Deployer::deploy] with its own error rather than by
/// whatever assembled the options.
#[derive(Debug, Clone, PartialEq)]
pub struct DeployOptions {
    /// Version being deployed, used as key prefix
    pub version: Option<String>,
    /// Directory holding the built site
    pub dir: Option<PathBuf>,
    /// Target bucket; falls back to the deployer's default bucket
    pub bucket: Option<String>,
    /// Include glob, relative to `dir`
    pub files: String,
    /// Exclude glob, relative to `dir`
    pub ignore: String,
    /// Prune old versions after deploying
    pub remove: bool,
    /// Create the bucket before uploading
    pub create_bucket: bool,
    pub retention: RetentionPolicy,
    /// Repository the version history is read from; defaults to `dir`
    pub repository: Option<PathBuf>,
    /// Listing page size used while pruning
    pub page_size: usize,
}

impl Default for DeployOptions {
    fn default() -> Self {
        DeployOptions {
            version: None,
            dir: None,
            bucket: None,
            files: DEFAULT_FILES_PATTERN.to_string(),
            ignore: DEFAULT_IGNORE_PATTERN.to_string(),
            remove: false,
            create_bucket: false,
            retention: RetentionPolicy::default(),
            repository: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Stages of a deployment, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployStage {
    Validating,
    Scanning,
    Uploading,
    ConfiguringAcl,
    ConfiguringWebsite,
    Pruning,
    Done,
}

impl fmt::Display for DeployStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DeployStage::Validating => "validating",
            DeployStage::Scanning => "scanning",
            DeployStage::Uploading => "uploading",
            DeployStage::ConfiguringAcl => "configuring ACL",
            DeployStage::ConfiguringWebsite => "configuring website",
            DeployStage::Pruning => "pruning",
            DeployStage::Done => "done",
        };
        f.write_str(label)
    }
}

/// Outcome of a successful deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployReport {
    pub version: String,
    pub bucket: String,
    /// Keys written, sorted
    pub uploaded: Vec<String>,
    /// Versions pruned and how many objects each lost
    pub removed: Vec<PruneOutcome>,
    /// Stages traversed, ending with [DeployStage::Done]
    pub stages: Vec<DeployStage>,
    pub warnings: Vec<DeployWarning>,
}

impl DeployReport {
    /// Total number of objects deleted while pruning
    pub fn removed_objects(&self) -> usize {
        self.removed.iter().map(|outcome| outcome.removed).sum()
    }
}

/// Tagged versions of a repository with the retention decision for each
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPlan {
    pub current_version: String,
    pub entries: Vec<(VersionRecord, Retention)>,
}

impl RetentionPlan {
    /// Records that would be pruned
    pub fn removable(&self) -> impl Iterator<Item = &VersionRecord> {
        self.entries
            .iter()
            .filter(|(_, retention)| retention.is_removable())
            .map(|(record, _)| record)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Validated deployment target
struct Target<'a> {
    version: &'a str,
    dir: &'a Path,
    bucket: String,
}

/// Deploys static sites into an object store
pub struct Deployer<S, L, C> {
    store: S,
    log: L,
    clock: C,
    default_bucket: Option<String>,
}

impl<S, L, C> Deployer<S, L, C>
where
    S: ObjectStore,
    L: CommitLog,
    C: Clock,
{
    pub fn new(store: S, log: L, clock: C) -> Self {
        Deployer {
            store,
            log,
            clock,
            default_bucket: None,
        }
    }

    /// Bucket used when the options do not name one
    pub fn with_default_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.default_bucket = Some(bucket.into());
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    /// Runs a full deployment.
    ///
    /// # Errors
    ///
    /// - `MissingVersion`, `MissingDirectory`, `MissingBucket` when a required
    ///   value is absent or empty
    /// - `ScanFailure` / `NoFilesFound` from the file scan
    /// - `BucketCreationFailure` when `create_bucket` is set and creation fails
    /// - `UploadFailure` for the first file that could not be written
    /// - `BucketConfigurationFailure` for the ACL or website settings
    /// - `RepositoryReadFailure`, `ListingFailure`, `DeletionFailure` while pruning
    pub fn deploy(&self, options: &DeployOptions) -> Result<DeployReport> {
        let mut stages = vec![DeployStage::Validating];
        let target = self.validate(options)?;
        let version = target.version;
        let bucket = target.bucket.as_str();

        let span = info_span!("deploy", version = %version, bucket = %bucket);
        let _enter = span.enter();
        info!("Deploying {}", version);

        stages.push(DeployStage::Scanning);
        let files = scan_files(target.dir, &options.files, &options.ignore)?;
        if files.is_empty() {
            return Err(CloudPagesError::NoFilesFound {
                pattern: display_pattern(target.dir, &options.files),
            });
        }

        // Nothing is written to the store until there is something to deploy
        if options.create_bucket {
            debug!("Creating bucket");
            self.store
                .create_bucket(bucket)
                .map_err(|source| CloudPagesError::BucketCreationFailure {
                    bucket: bucket.to_string(),
                    source,
                })?;
        }

        stages.push(DeployStage::Uploading);
        let mut uploaded = files
            .par_iter()
            .map(|file| span.in_scope(|| self.upload(bucket, version, file)))
            .collect::<Result<Vec<_>>>()?;
        uploaded.sort();
        info!(files = uploaded.len(), "Files sent");

        stages.push(DeployStage::ConfiguringAcl);
        debug!("Setting up the bucket ACL");
        self.store
            .put_bucket_acl(bucket, Acl::PublicRead)
            .map_err(|source| configuration_failure(bucket, "ACL", source))?;

        stages.push(DeployStage::ConfiguringWebsite);
        debug!("Setting up the website rules");
        self.store
            .put_bucket_website(bucket, &WebsiteConfiguration::for_version(version))
            .map_err(|source| configuration_failure(bucket, "website", source))?;
        info!("Successfully deployed {}", version);

        let mut warnings = Vec::new();
        let mut removed = Vec::new();
        if options.remove {
            stages.push(DeployStage::Pruning);
            let repository = options.repository.as_deref().unwrap_or(target.dir);
            removed = self.prune(bucket, version, repository, options, &mut warnings)?;
        }

        stages.push(DeployStage::Done);
        Ok(DeployReport {
            version: version.to_string(),
            bucket: target.bucket.clone(),
            uploaded,
            removed,
            stages,
            warnings,
        })
    }

    /// Reads the repository history and decides the fate of every tagged version,
    /// without touching the store.
    pub fn retention_plan(
        &self,
        repository: &Path,
        current_version: &str,
        policy: &RetentionPolicy,
    ) -> Result<RetentionPlan> {
        let versions = read_versions(&self.log, repository)?;
        let now = self.clock.now();
        let entries = policy
            .evaluate(&versions, current_version, now)
            .into_iter()
            .map(|(record, retention)| (record.clone(), retention))
            .collect();

        Ok(RetentionPlan {
            current_version: current_version.to_string(),
            entries,
        })
    }

    fn validate<'a>(&self, options: &'a DeployOptions) -> Result<Target<'a>> {
        let version = options
            .version
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(CloudPagesError::MissingVersion)?;
        let dir = options
            .dir
            .as_deref()
            .filter(|d| !d.as_os_str().is_empty())
            .ok_or(CloudPagesError::MissingDirectory)?;
        let bucket = options
            .bucket
            .as_deref()
            .or(self.default_bucket.as_deref())
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .ok_or(CloudPagesError::MissingBucket)?;

        Ok(Target {
            version,
            dir,
            bucket: bucket.to_string(),
        })
    }

    fn upload(&self, bucket: &str, version: &str, file: &ScannedFile) -> Result<String> {
        let key = format!("{}/{}", version, file.relative);
        let upload_failure = |source: StoreError| CloudPagesError::UploadFailure {
            file: file.path.clone(),
            key: key.clone(),
            source,
        };

        let body = fs::read(&file.path).map_err(|e| upload_failure(StoreError::io(&file.path, e)))?;
        let content_type = mime_guess::from_path(&file.path)
            .first_or_octet_stream()
            .to_string();

        debug!(file = %file.path.display(), key = %key, "Sending file");
        self.store
            .put_object(
                bucket,
                PutObject {
                    key: key.clone(),
                    body,
                    acl: Acl::PublicRead,
                    content_type,
                },
            )
            .map_err(upload_failure)?;

        Ok(key)
    }

    fn prune(
        &self,
        bucket: &str,
        version: &str,
        repository: &Path,
        options: &DeployOptions,
        warnings: &mut Vec<DeployWarning>,
    ) -> Result<Vec<PruneOutcome>> {
        info!("Seeking old versions to remove");
        let plan = self.retention_plan(repository, version, &options.retention)?;

        if plan.is_empty() {
            warn!(repository = %repository.display(), "No tagged versions found");
            warnings.push(DeployWarning::NoTaggedVersions {
                repository: repository.to_path_buf(),
            });
            return Ok(Vec::new());
        }
        if !plan.entries.iter().any(|(record, _)| record.tag == version) {
            warnings.push(DeployWarning::CurrentVersionNotTagged {
                version: version.to_string(),
            });
        }

        let removable: Vec<&VersionRecord> = plan.removable().collect();
        debug!("Found {} versions to potentially remove", removable.len());

        let outcomes = prune_versions(&self.store, bucket, &removable, options.page_size)?;
        warnings.extend(
            outcomes
                .iter()
                .filter(|outcome| outcome.was_empty())
                .map(|outcome| DeployWarning::NothingToRemove {
                    tag: outcome.tag.clone(),
                }),
        );
        Ok(outcomes)
    }
}

fn configuration_failure(
    bucket: &str,
    setting: &'static str,
    source: StoreError,
) -> CloudPagesError {
    CloudPagesError::BucketConfigurationFailure {
        bucket: bucket.to_string(),
        setting,
        source,
    }
}
