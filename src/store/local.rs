use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::StoreError;
use crate::store::{
    validate_key, Acl, ObjectListing, ObjectStore, PutObject, StoreResult, WebsiteConfiguration,
};

const OBJECTS_DIR: &str = "objects";
const METADATA_DIR: &str = "metadata";
const BUCKET_FILE: &str = "bucket.json";

/// Per-object metadata stored beside the object body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    pub content_type: String,
    pub acl: Acl,
}

/// Bucket-level settings
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BucketSettings {
    #[serde(default)]
    pub acl: Acl,
    #[serde(default)]
    pub website: Option<WebsiteConfiguration>,
}

/// Object store keeping each bucket as a directory tree.
///
/// Layout under `root`:
///
/// ```text
/// <bucket>/bucket.json              ACL and website settings
/// <bucket>/objects/<key>            object bodies
/// <bucket>/metadata/<key>.json      content type and ACL per object
/// ```
///
/// Useful to stage a site locally or to write into a bucket mounted on the
/// filesystem.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path holding the body of `key`
    pub fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.root.join(bucket).join(OBJECTS_DIR).join(key)
    }

    fn metadata_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.root
            .join(bucket)
            .join(METADATA_DIR)
            .join(format!("{}.json", key))
    }

    fn bucket_dir(&self, bucket: &str) -> StoreResult<PathBuf> {
        if bucket.contains('/') {
            return Err(StoreError::NoSuchBucket(bucket.to_string()));
        }
        validate_key(bucket).map_err(|_| StoreError::NoSuchBucket(bucket.to_string()))?;
        Ok(self.root.join(bucket))
    }

    fn existing_bucket(&self, bucket: &str) -> StoreResult<PathBuf> {
        let dir = self.bucket_dir(bucket)?;
        if dir.is_dir() {
            Ok(dir)
        } else {
            Err(StoreError::NoSuchBucket(bucket.to_string()))
        }
    }

    /// Read the bucket settings; a bucket never configured has the defaults
    pub fn bucket_settings(&self, bucket: &str) -> StoreResult<BucketSettings> {
        let path = self.existing_bucket(bucket)?.join(BUCKET_FILE);
        match fs::read(&path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BucketSettings::default()),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    /// Read the metadata of an object, if present
    pub fn object_metadata(&self, bucket: &str, key: &str) -> StoreResult<Option<ObjectMetadata>> {
        validate_key(key)?;
        self.existing_bucket(bucket)?;

        let path = self.metadata_path(bucket, key);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    fn update_settings(
        &self,
        bucket: &str,
        update: impl FnOnce(&mut BucketSettings),
    ) -> StoreResult<()> {
        let mut settings = self.bucket_settings(bucket)?;
        update(&mut settings);

        let path = self.root.join(bucket).join(BUCKET_FILE);
        let json = serde_json::to_vec_pretty(&settings)?;
        fs::write(&path, json).map_err(|e| StoreError::io(path, e))
    }
}

fn write_file(path: &Path, contents: &[u8]) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }
    fs::write(path, contents).map_err(|e| StoreError::io(path, e))
}

fn remove_file_if_exists(path: &Path) -> StoreResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StoreError::io(path, e)),
    }
}

/// Remove directories left empty by a deletion, stopping at `stop`
fn remove_empty_parents(path: &Path, stop: &Path) {
    let mut current = path.parent();
    while let Some(dir) = current {
        if dir == stop || !dir.starts_with(stop) {
            break;
        }
        if fs::remove_dir(dir).is_err() {
            break;
        }
        current = dir.parent();
    }
}

impl ObjectStore for LocalStore {
    fn create_bucket(&self, bucket: &str) -> StoreResult<()> {
        let dir = self.bucket_dir(bucket)?;
        fs::create_dir_all(dir.join(OBJECTS_DIR)).map_err(|e| StoreError::io(&dir, e))
    }

    fn put_object(&self, bucket: &str, object: PutObject) -> StoreResult<()> {
        validate_key(&object.key)?;
        self.existing_bucket(bucket)?;

        write_file(&self.object_path(bucket, &object.key), &object.body)?;

        let metadata = ObjectMetadata {
            content_type: object.content_type,
            acl: object.acl,
        };
        write_file(
            &self.metadata_path(bucket, &object.key),
            &serde_json::to_vec(&metadata)?,
        )
    }

    fn put_bucket_acl(&self, bucket: &str, acl: Acl) -> StoreResult<()> {
        self.update_settings(bucket, |settings| settings.acl = acl)
    }

    fn put_bucket_website(&self, bucket: &str, config: &WebsiteConfiguration) -> StoreResult<()> {
        self.update_settings(bucket, |settings| settings.website = Some(config.clone()))
    }

    fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        max_keys: usize,
    ) -> StoreResult<ObjectListing> {
        let objects_dir = self.existing_bucket(bucket)?.join(OBJECTS_DIR);
        if !objects_dir.is_dir() {
            return Ok(ObjectListing {
                keys: Vec::new(),
                max_keys,
            });
        }

        let mut keys = Vec::new();
        for entry in WalkDir::new(&objects_dir) {
            let entry = entry.map_err(|e| {
                let path = e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| objects_dir.clone());
                StoreError::io(path, e.into())
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(&objects_dir) else {
                continue;
            };
            let segments: Option<Vec<&str>> = relative
                .components()
                .map(|c| c.as_os_str().to_str())
                .collect();
            // Keys are UTF-8; foreign files with other names are not objects
            let Some(segments) = segments else {
                continue;
            };

            let key = segments.join("/");
            if key.starts_with(prefix) {
                keys.push(key);
            }
        }

        keys.sort();
        keys.truncate(max_keys);
        Ok(ObjectListing { keys, max_keys })
    }

    fn delete_objects(&self, bucket: &str, keys: &[String]) -> StoreResult<()> {
        let bucket_dir = self.existing_bucket(bucket)?;
        let objects_dir = bucket_dir.join(OBJECTS_DIR);
        let metadata_dir = bucket_dir.join(METADATA_DIR);

        for key in keys {
            validate_key(key)?;

            let object_path = self.object_path(bucket, key);
            remove_file_if_exists(&object_path)?;
            remove_empty_parents(&object_path, &objects_dir);

            let metadata_path = self.metadata_path(bucket, key);
            remove_file_if_exists(&metadata_path)?;
            remove_empty_parents(&metadata_path, &metadata_dir);
        }
        Ok(())
    }
}
