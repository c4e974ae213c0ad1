//! Object storage abstraction
//!
//! [ObjectStore] is the bucket contract the deployer needs: object writes,
//! bucket ACL and website settings, prefix listing and bulk deletion. It
//! mirrors the S3 operations of the same names.
//!
//! Backends:
//! - [memory::MemoryStore]: in-process buckets with call recording, for tests
//! - [local::LocalStore]: buckets as directories on a local or mounted filesystem

pub mod local;
pub mod memory;

pub use local::{BucketSettings, LocalStore, ObjectMetadata};
pub use memory::{MemoryStore, StoreCall, StoreOperation, StoredObject};

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Maximum number of keys returned by one listing, as with S3 `ListObjectsV2`
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Result type for object store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Canned access control list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Acl {
    #[default]
    #[serde(rename = "private")]
    Private,
    #[serde(rename = "public-read")]
    PublicRead,
}

impl Acl {
    pub fn as_str(&self) -> &'static str {
        match self {
            Acl::Private => "private",
            Acl::PublicRead => "public-read",
        }
    }
}

impl fmt::Display for Acl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single object write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutObject {
    pub key: String,
    pub body: Vec<u8>,
    pub acl: Acl,
    pub content_type: String,
}

/// Static website hosting settings of a bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WebsiteConfiguration {
    pub index_document: IndexDocument,
    pub error_document: ErrorDocument,
    #[serde(default)]
    pub routing_rules: Vec<RoutingRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IndexDocument {
    pub suffix: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorDocument {
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RoutingRule {
    pub condition: RoutingCondition,
    pub redirect: Redirect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RoutingCondition {
    pub key_prefix_equals: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Redirect {
    pub replace_key_with: String,
}

impl WebsiteConfiguration {
    /// Website settings serving `version` as the live site.
    ///
    /// Requests for `/index.html` are redirected to the version's own index so
    /// visitors always land on the deployed version; errors are served by the
    /// same page.
    pub fn for_version(version: &str) -> Self {
        let version_index = format!("{}/index.html", version);

        WebsiteConfiguration {
            index_document: IndexDocument {
                suffix: "index.html".to_string(),
            },
            error_document: ErrorDocument {
                key: version_index.clone(),
            },
            routing_rules: vec![RoutingRule {
                condition: RoutingCondition {
                    key_prefix_equals: "/index.html".to_string(),
                },
                redirect: Redirect {
                    replace_key_with: version_index,
                },
            }],
        }
    }
}

/// One page of a prefix listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectListing {
    /// Keys found, in lexicographic order
    pub keys: Vec<String>,
    /// Page size the listing was requested with
    pub max_keys: usize,
}

impl ObjectListing {
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// A full page means more objects may remain under the prefix
    pub fn is_full_page(&self) -> bool {
        self.keys.len() >= self.max_keys
    }
}

/// Bucket operations used by the deployer
///
/// ## Thread Safety
///
/// Implementors must be `Send + Sync`: uploads and per-version deletions are
/// issued from a thread pool.
///
/// ## Semantics
///
/// - `list_objects` returns at most `max_keys` keys starting with `prefix`,
///   in lexicographic order.
/// - `delete_objects` succeeds for keys that no longer exist.
/// - Writing to a bucket that does not exist fails with
///   [StoreError::NoSuchBucket].
pub trait ObjectStore: Send + Sync {
    /// Create a bucket; succeeds if it already exists
    fn create_bucket(&self, bucket: &str) -> StoreResult<()>;

    /// Write an object
    fn put_object(&self, bucket: &str, object: PutObject) -> StoreResult<()>;

    /// Replace the bucket's canned ACL
    fn put_bucket_acl(&self, bucket: &str, acl: Acl) -> StoreResult<()>;

    /// Replace the bucket's website hosting settings
    fn put_bucket_website(&self, bucket: &str, config: &WebsiteConfiguration) -> StoreResult<()>;

    /// List one page of keys under a prefix
    fn list_objects(&self, bucket: &str, prefix: &str, max_keys: usize)
        -> StoreResult<ObjectListing>;

    /// Delete the given keys in one request
    fn delete_objects(&self, bucket: &str, keys: &[String]) -> StoreResult<()>;
}

/// Checks that a key maps onto a clean relative path: no empty, `.` or `..` segments
pub(crate) fn validate_key(key: &str) -> StoreResult<()> {
    let valid = !key.is_empty()
        && !key.contains('\\')
        && key
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..");

    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}
