//! Removal of old version prefixes from a bucket.
//!
//! Listings are paginated, so each prefix is emptied with a list-then-delete
//! loop that goes on while listings come back full. Prefixes of different
//! versions are disjoint and are pruned in parallel.

use rayon::prelude::*;
use tracing::{debug, info};

use crate::domain::VersionRecord;
use crate::error::{CloudPagesError, Result};
use crate::store::ObjectStore;

/// Objects removed for one version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruneOutcome {
    pub tag: String,
    pub removed: usize,
}

impl PruneOutcome {
    /// True when the version had no objects left in the bucket
    pub fn was_empty(&self) -> bool {
        self.removed == 0
    }
}

/// Deletes every object under `<tag>/`, one listing page at a time.
///
/// An empty first listing is a normal outcome (nothing to remove). A full
/// page triggers another listing of the same prefix; a short page ends the
/// loop. Each iteration deletes a non-empty set, so the loop terminates as
/// long as the store does not list deleted keys again.
pub fn delete_version_objects<S: ObjectStore + ?Sized>(
    store: &S,
    bucket: &str,
    tag: &str,
    page_size: usize,
) -> Result<PruneOutcome> {
    let prefix = format!("{}/", tag);
    let page_size = page_size.max(1);
    let mut removed = 0;

    loop {
        debug!(prefix = %prefix, "Listing objects");
        let listing = store
            .list_objects(bucket, &prefix, page_size)
            .map_err(|source| CloudPagesError::ListingFailure {
                prefix: prefix.clone(),
                source,
            })?;

        if listing.is_empty() {
            break;
        }

        info!(prefix = %prefix, count = listing.keys.len(), "Removing objects");
        store
            .delete_objects(bucket, &listing.keys)
            .map_err(|source| CloudPagesError::DeletionFailure {
                prefix: prefix.clone(),
                source,
            })?;
        removed += listing.keys.len();

        if !listing.is_full_page() {
            break;
        }
    }

    if removed == 0 {
        info!(tag = %tag, "No objects found for version");
    }

    Ok(PruneOutcome {
        tag: tag.to_string(),
        removed,
    })
}

/// Prunes every selected version concurrently.
///
/// Duplicate tags are pruned once. The first failure fails the whole pass;
/// outcomes are returned in selection order.
pub fn prune_versions<S: ObjectStore + ?Sized>(
    store: &S,
    bucket: &str,
    versions: &[&VersionRecord],
    page_size: usize,
) -> Result<Vec<PruneOutcome>> {
    let mut tags: Vec<&str> = Vec::with_capacity(versions.len());
    for version in versions {
        if !tags.contains(&version.tag.as_str()) {
            tags.push(version.tag.as_str());
        }
    }

    tags.par_iter()
        .map(|tag| delete_version_objects(store, bucket, tag, page_size))
        .collect()
}
