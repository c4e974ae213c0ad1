//! Main workflow orchestration logic
//!
//! Merges command-line arguments with the configuration file and the
//! environment, builds the collaborators a [Deployer] needs, and runs it.
//! Kept apart from `main.rs` so the workflows can be called without clap.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::clock::SystemClock;
use crate::config::Config;
use crate::deploy::{DeployOptions, DeployReport, Deployer, RetentionPlan};
use crate::domain::RetentionPolicy;
use crate::error::{CloudPagesError, Result};
use crate::git::Git2Log;
use crate::store::LocalStore;

/// Environment variable naming the default bucket
pub const BUCKET_ENV_VAR: &str = "AWS_S3_BUCKET";

/// Arguments for the deploy and list workflows
///
/// Mirrors the CLI flags; `None` means "not given on the command line" so
/// that the configuration file can fill the gap.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeployWorkflowArgs {
    /// Version being deployed
    pub version: Option<String>,

    /// Directory holding the built site
    pub dir: Option<PathBuf>,

    /// Target bucket
    pub bucket: Option<String>,

    /// Repository the version history is read from
    pub repository: Option<PathBuf>,

    /// Include glob
    pub files: Option<String>,

    /// Exclude glob
    pub ignore: Option<String>,

    /// Prune old versions after deploying
    pub remove: bool,

    /// Create the bucket first
    pub create_bucket: bool,

    /// Minimum age before a version may be removed
    pub keep_delay: Option<Duration>,

    /// Number of recent versions always kept
    pub keep_count: Option<usize>,

    /// Listing page size used while pruning
    pub page_size: Option<usize>,

    /// Directory holding the local buckets
    pub store_root: Option<PathBuf>,
}

impl DeployWorkflowArgs {
    /// Resolves the deploy options: flags first, then the configuration file.
    ///
    /// The environment bucket is not applied here; it is the deployer's
    /// default and only used when neither flag nor file names a bucket.
    pub fn to_options(&self, config: &Config) -> DeployOptions {
        let retention = RetentionPolicy::new(
            self.keep_count.unwrap_or(config.retention.keep_count),
            self.keep_delay.unwrap_or(config.retention.keep_delay),
        );

        DeployOptions {
            version: self.version.clone(),
            dir: self.dir.clone(),
            bucket: self.bucket.clone().or_else(|| config.deploy.bucket.clone()),
            files: self.files.clone().unwrap_or_else(|| config.deploy.files.clone()),
            ignore: self.ignore.clone().unwrap_or_else(|| config.deploy.ignore.clone()),
            remove: self.remove,
            create_bucket: self.create_bucket,
            retention,
            repository: self
                .repository
                .clone()
                .or_else(|| config.deploy.repository.clone()),
            page_size: self.page_size.unwrap_or(config.retention.page_size),
        }
    }

    /// Directory of the local object store
    pub fn store_root(&self, config: &Config) -> PathBuf {
        self.store_root
            .clone()
            .unwrap_or_else(|| config.store.root.clone())
    }
}

/// Bucket named by `AWS_S3_BUCKET`, if set and non-empty
pub fn bucket_from_env() -> Option<String> {
    env::var(BUCKET_ENV_VAR)
        .ok()
        .map(|bucket| bucket.trim().to_string())
        .filter(|bucket| !bucket.is_empty())
}

fn build_deployer(
    args: &DeployWorkflowArgs,
    config: &Config,
) -> Deployer<LocalStore, Git2Log, SystemClock> {
    let store = LocalStore::new(args.store_root(config));
    let deployer = Deployer::new(store, Git2Log::new(), SystemClock);
    match bucket_from_env() {
        Some(bucket) => deployer.with_default_bucket(bucket),
        None => deployer,
    }
}

/// Main deploy workflow
///
/// Deploys into the directory-backed store, reading history with `git2`
/// when pruning is requested.
///
/// # Arguments
///
/// * `args` - Workflow arguments
/// * `config` - Loaded configuration
///
/// # Returns
///
/// The deployment report, or the first error met
pub fn run_deploy_workflow(args: &DeployWorkflowArgs, config: &Config) -> Result<DeployReport> {
    let options = args.to_options(config);
    build_deployer(args, config).deploy(&options)
}

/// Retention plan workflow
///
/// Reads the repository history and decides which versions a pruning pass
/// would remove, without touching any bucket. The repository defaults to
/// the deployed directory, as when pruning.
pub fn run_list_workflow(args: &DeployWorkflowArgs, config: &Config) -> Result<RetentionPlan> {
    let options = args.to_options(config);
    let version = options
        .version
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(CloudPagesError::MissingVersion)?;
    let repository = options
        .repository
        .clone()
        .or_else(|| options.dir.clone())
        .ok_or(CloudPagesError::MissingDirectory)?;

    build_deployer(args, config).retention_plan(&repository, version, &options.retention)
}
