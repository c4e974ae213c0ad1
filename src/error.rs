use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for cloud-pages operations
#[derive(Error, Debug)]
pub enum CloudPagesError {
    #[error("A version is required to deploy")]
    MissingVersion,

    #[error("A directory to deploy is required")]
    MissingDirectory,

    #[error("A target bucket is required (use --bucket or set AWS_S3_BUCKET)")]
    MissingBucket,

    #[error("Directory scan failed for '{pattern}': {source}")]
    ScanFailure {
        pattern: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("No files found matching '{pattern}'")]
    NoFilesFound { pattern: String },

    #[error("Failed to upload '{}' as '{key}': {source}", file.display())]
    UploadFailure {
        file: PathBuf,
        key: String,
        #[source]
        source: StoreError,
    },

    #[error("Failed to create bucket '{bucket}': {source}")]
    BucketCreationFailure {
        bucket: String,
        #[source]
        source: StoreError,
    },

    #[error("Failed to set {setting} on bucket '{bucket}': {source}")]
    BucketConfigurationFailure {
        bucket: String,
        setting: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("Cannot read repository history at '{}': {source}", path.display())]
    RepositoryReadFailure {
        path: PathBuf,
        #[source]
        source: git2::Error,
    },

    #[error("Failed to list objects under '{prefix}': {source}")]
    ListingFailure {
        prefix: String,
        #[source]
        source: StoreError,
    },

    #[error("Failed to delete objects under '{prefix}': {source}")]
    DeletionFailure {
        prefix: String,
        #[source]
        source: StoreError,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors reported by an object store backend
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("bucket '{0}' does not exist")]
    NoSuchBucket(String),

    #[error("invalid object key '{0}'")]
    InvalidKey(String),

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("metadata encoding error: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("{0}")]
    Backend(String),
}

/// Convenience type alias for Results in cloud-pages
pub type Result<T> = std::result::Result<T, CloudPagesError>;

impl CloudPagesError {
    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        CloudPagesError::Config(msg.into())
    }

    /// Wrap a repository access failure with the repository path
    pub fn repository(path: impl Into<PathBuf>, source: git2::Error) -> Self {
        CloudPagesError::RepositoryReadFailure {
            path: path.into(),
            source,
        }
    }
}

impl StoreError {
    /// Create a backend error with context
    pub fn backend(msg: impl Into<String>) -> Self {
        StoreError::Backend(msg.into())
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}
