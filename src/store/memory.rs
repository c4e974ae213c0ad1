use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, RwLock};

use crate::error::StoreError;
use crate::store::{
    validate_key, Acl, ObjectListing, ObjectStore, PutObject, StoreResult, WebsiteConfiguration,
};

/// Kinds of store operations, used to filter recorded calls and inject failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOperation {
    CreateBucket,
    PutObject,
    PutBucketAcl,
    PutBucketWebsite,
    ListObjects,
    DeleteObjects,
}

/// A call received by a [MemoryStore], recorded before it is applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    CreateBucket {
        bucket: String,
    },
    PutObject {
        bucket: String,
        key: String,
        acl: Acl,
        content_type: String,
    },
    PutBucketAcl {
        bucket: String,
        acl: Acl,
    },
    PutBucketWebsite {
        bucket: String,
        config: WebsiteConfiguration,
    },
    ListObjects {
        bucket: String,
        prefix: String,
        max_keys: usize,
    },
    DeleteObjects {
        bucket: String,
        keys: Vec<String>,
    },
}

impl StoreCall {
    pub fn operation(&self) -> StoreOperation {
        match self {
            StoreCall::CreateBucket { .. } => StoreOperation::CreateBucket,
            StoreCall::PutObject { .. } => StoreOperation::PutObject,
            StoreCall::PutBucketAcl { .. } => StoreOperation::PutBucketAcl,
            StoreCall::PutBucketWebsite { .. } => StoreOperation::PutBucketWebsite,
            StoreCall::ListObjects { .. } => StoreOperation::ListObjects,
            StoreCall::DeleteObjects { .. } => StoreOperation::DeleteObjects,
        }
    }

    /// The key, prefix or keys the call targets, for failure matching
    fn targets(&self, needle: &str) -> bool {
        match self {
            StoreCall::PutObject { key, .. } => key.starts_with(needle),
            StoreCall::ListObjects { prefix, .. } => prefix.starts_with(needle),
            StoreCall::DeleteObjects { keys, .. } => keys.iter().any(|k| k.starts_with(needle)),
            StoreCall::CreateBucket { bucket }
            | StoreCall::PutBucketAcl { bucket, .. }
            | StoreCall::PutBucketWebsite { bucket, .. } => bucket == needle,
        }
    }
}

/// An object held by a [MemoryStore]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub acl: Acl,
    pub content_type: String,
}

#[derive(Debug, Clone, Default)]
struct Bucket {
    objects: BTreeMap<String, StoredObject>,
    acl: Acl,
    website: Option<WebsiteConfiguration>,
}

#[derive(Debug, Clone)]
struct InjectedFailure {
    operation: StoreOperation,
    target: Option<String>,
}

/// In-memory object store for testing.
///
/// Thread-safe via `RwLock`. Every call is recorded, and failures can be
/// injected per operation, optionally restricted to a key prefix.
#[derive(Debug, Default)]
pub struct MemoryStore {
    buckets: RwLock<HashMap<String, Bucket>>,
    calls: Mutex<Vec<StoreCall>>,
    failures: Vec<InjectedFailure>,
}

fn poisoned() -> StoreError {
    StoreError::backend("lock poisoned")
}

impl MemoryStore {
    /// Create a store with no buckets
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an empty bucket
    pub fn with_bucket(self, bucket: impl Into<String>) -> Self {
        if let Ok(mut buckets) = self.buckets.write() {
            buckets.entry(bucket.into()).or_default();
        }
        self
    }

    /// Seed an object without recording a call
    pub fn with_object(
        self,
        bucket: &str,
        key: impl Into<String>,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        if let Ok(mut buckets) = self.buckets.write() {
            buckets.entry(bucket.to_string()).or_default().objects.insert(
                key.into(),
                StoredObject {
                    body: body.into(),
                    acl: Acl::PublicRead,
                    content_type: "application/octet-stream".to_string(),
                },
            );
        }
        self
    }

    /// Make every call of `operation` fail
    pub fn with_failure(mut self, operation: StoreOperation) -> Self {
        self.failures.push(InjectedFailure {
            operation,
            target: None,
        });
        self
    }

    /// Make calls of `operation` fail when they target keys under `prefix`
    /// (or, for bucket-level operations, the bucket named `prefix`)
    pub fn with_failure_on(mut self, operation: StoreOperation, prefix: impl Into<String>) -> Self {
        self.failures.push(InjectedFailure {
            operation,
            target: Some(prefix.into()),
        });
        self
    }

    /// All calls received so far, in arrival order
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Calls of one kind
    pub fn calls_of(&self, operation: StoreOperation) -> Vec<StoreCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.operation() == operation)
            .collect()
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        let buckets = self.buckets.read().ok()?;
        buckets.get(bucket)?.objects.get(key).cloned()
    }

    /// All keys of a bucket, sorted
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.buckets
            .read()
            .ok()
            .and_then(|buckets| buckets.get(bucket).map(|b| b.objects.keys().cloned().collect()))
            .unwrap_or_default()
    }

    pub fn bucket_acl(&self, bucket: &str) -> Option<Acl> {
        let buckets = self.buckets.read().ok()?;
        buckets.get(bucket).map(|b| b.acl)
    }

    pub fn website(&self, bucket: &str) -> Option<WebsiteConfiguration> {
        let buckets = self.buckets.read().ok()?;
        buckets.get(bucket)?.website.clone()
    }

    fn record(&self, call: StoreCall) -> StoreResult<()> {
        let injected = self.failures.iter().any(|failure| {
            failure.operation == call.operation()
                && failure
                    .target
                    .as_deref()
                    .map_or(true, |target| call.targets(target))
        });
        let operation = call.operation();

        self.calls.lock().map_err(|_| poisoned())?.push(call);

        if injected {
            return Err(StoreError::backend(format!(
                "injected {:?} failure",
                operation
            )));
        }
        Ok(())
    }

    fn with_existing_bucket<T>(
        &self,
        bucket: &str,
        f: impl FnOnce(&mut Bucket) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut buckets = self.buckets.write().map_err(|_| poisoned())?;
        let state = buckets
            .get_mut(bucket)
            .ok_or_else(|| StoreError::NoSuchBucket(bucket.to_string()))?;
        f(state)
    }
}

impl ObjectStore for MemoryStore {
    fn create_bucket(&self, bucket: &str) -> StoreResult<()> {
        self.record(StoreCall::CreateBucket {
            bucket: bucket.to_string(),
        })?;

        let mut buckets = self.buckets.write().map_err(|_| poisoned())?;
        buckets.entry(bucket.to_string()).or_default();
        Ok(())
    }

    fn put_object(&self, bucket: &str, object: PutObject) -> StoreResult<()> {
        self.record(StoreCall::PutObject {
            bucket: bucket.to_string(),
            key: object.key.clone(),
            acl: object.acl,
            content_type: object.content_type.clone(),
        })?;
        validate_key(&object.key)?;

        self.with_existing_bucket(bucket, |state| {
            state.objects.insert(
                object.key,
                StoredObject {
                    body: object.body,
                    acl: object.acl,
                    content_type: object.content_type,
                },
            );
            Ok(())
        })
    }

    fn put_bucket_acl(&self, bucket: &str, acl: Acl) -> StoreResult<()> {
        self.record(StoreCall::PutBucketAcl {
            bucket: bucket.to_string(),
            acl,
        })?;

        self.with_existing_bucket(bucket, |state| {
            state.acl = acl;
            Ok(())
        })
    }

    fn put_bucket_website(&self, bucket: &str, config: &WebsiteConfiguration) -> StoreResult<()> {
        self.record(StoreCall::PutBucketWebsite {
            bucket: bucket.to_string(),
            config: config.clone(),
        })?;

        self.with_existing_bucket(bucket, |state| {
            state.website = Some(config.clone());
            Ok(())
        })
    }

    fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        max_keys: usize,
    ) -> StoreResult<ObjectListing> {
        self.record(StoreCall::ListObjects {
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
            max_keys,
        })?;

        self.with_existing_bucket(bucket, |state| {
            let keys = state
                .objects
                .range(prefix.to_string()..)
                .map(|(key, _)| key)
                .take_while(|key| key.starts_with(prefix))
                .take(max_keys)
                .cloned()
                .collect();
            Ok(ObjectListing { keys, max_keys })
        })
    }

    fn delete_objects(&self, bucket: &str, keys: &[String]) -> StoreResult<()> {
        self.record(StoreCall::DeleteObjects {
            bucket: bucket.to_string(),
            keys: keys.to_vec(),
        })?;

        self.with_existing_bucket(bucket, |state| {
            for key in keys {
                state.objects.remove(key);
            }
            Ok(())
        })
    }
}
