// tests/deploy_test.rs
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

use cloud_pages::clock::FixedClock;
use cloud_pages::deploy::{DeployOptions, DeployStage, Deployer};
use cloud_pages::domain::RetentionPolicy;
use cloud_pages::git::MockLog;
use cloud_pages::store::{Acl, MemoryStore, StoreCall, StoreOperation};
use cloud_pages::warning::DeployWarning;
use cloud_pages::CloudPagesError;

const DAY: i64 = 24 * 60 * 60;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2010, 3, 6, 0, 0, 0).unwrap()
}

fn ago(days: i64) -> DateTime<Utc> {
    now() - chrono::Duration::seconds(days * DAY)
}

/// A `dist` directory inside a temp dir, holding the given files
fn dist(files: &[(&str, &str)]) -> (TempDir, PathBuf) {
    let root = TempDir::new().unwrap();
    let dist = root.path().join("dist");
    fs::create_dir_all(&dist).unwrap();
    for (name, content) in files {
        let path = dist.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }
    (root, dist)
}

fn options(version: &str, dir: &Path) -> DeployOptions {
    DeployOptions {
        version: Some(version.to_string()),
        dir: Some(dir.to_path_buf()),
        bucket: Some("site".to_string()),
        ..DeployOptions::default()
    }
}

fn deployer(store: MemoryStore, log: MockLog) -> Deployer<MemoryStore, MockLog, FixedClock> {
    Deployer::new(store, log, FixedClock(now()))
}

#[test]
fn test_single_file_upload() {
    let (_root, dir) = dist(&[("index.html", "<html></html>")]);
    let deployer = deployer(MemoryStore::new().with_bucket("site"), MockLog::new());

    let report = deployer.deploy(&options("1.0.0", &dir)).unwrap();

    let puts = deployer.store().calls_of(StoreOperation::PutObject);
    assert_eq!(
        puts,
        vec![StoreCall::PutObject {
            bucket: "site".to_string(),
            key: "1.0.0/index.html".to_string(),
            acl: Acl::PublicRead,
            content_type: "text/html".to_string(),
        }]
    );
    assert_eq!(report.uploaded, vec!["1.0.0/index.html"]);

    let object = deployer.store().object("site", "1.0.0/index.html").unwrap();
    assert_eq!(object.body, b"<html></html>");
}

#[test]
fn test_nested_files_and_git_metadata() {
    let (_root, dir) = dist(&[
        ("index.html", "<html>"),
        ("css/site.css", "body {}"),
        ("img/logo.png", "png"),
        (".git/HEAD", "ref: refs/heads/master"),
    ]);
    let deployer = deployer(MemoryStore::new().with_bucket("site"), MockLog::new());

    let report = deployer.deploy(&options("2.1.0", &dir)).unwrap();

    assert_eq!(
        report.uploaded,
        vec!["2.1.0/css/site.css", "2.1.0/img/logo.png", "2.1.0/index.html"]
    );
    let css = deployer.store().object("site", "2.1.0/css/site.css").unwrap();
    assert_eq!(css.content_type, "text/css");
    let png = deployer.store().object("site", "2.1.0/img/logo.png").unwrap();
    assert_eq!(png.content_type, "image/png");
}

#[test]
fn test_no_files_found() {
    let (_root, dir) = dist(&[]);
    let deployer = deployer(MemoryStore::new().with_bucket("site"), MockLog::new());

    let err = deployer.deploy(&options("1.0.0", &dir)).unwrap_err();

    match err {
        CloudPagesError::NoFilesFound { pattern } => {
            assert_eq!(pattern, dir.join("**/*").display().to_string())
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(deployer.store().calls().is_empty());
}

#[test]
fn test_create_bucket_waits_for_files() {
    let (_root, dir) = dist(&[]);
    let deployer = deployer(MemoryStore::new(), MockLog::new());
    let opts = DeployOptions {
        create_bucket: true,
        ..options("1.0.0", &dir)
    };

    let err = deployer.deploy(&opts).unwrap_err();

    assert!(matches!(err, CloudPagesError::NoFilesFound { .. }));
    assert!(deployer.store().calls().is_empty());
    assert!(deployer.store().calls_of(StoreOperation::CreateBucket).is_empty());
}

#[test]
fn test_include_pattern_matching_nothing() {
    let (_root, dir) = dist(&[("index.html", "<html>")]);
    let deployer = deployer(MemoryStore::new().with_bucket("site"), MockLog::new());
    let opts = DeployOptions {
        files: "**/*.js".to_string(),
        ..options("1.0.0", &dir)
    };

    let err = deployer.deploy(&opts).unwrap_err();
    assert!(matches!(err, CloudPagesError::NoFilesFound { .. }));
}

#[test]
fn test_missing_directory_is_scan_failure() {
    let root = TempDir::new().unwrap();
    let deployer = deployer(MemoryStore::new().with_bucket("site"), MockLog::new());

    let err = deployer
        .deploy(&options("1.0.0", &root.path().join("dist")))
        .unwrap_err();
    assert!(matches!(err, CloudPagesError::ScanFailure { .. }));
    assert!(deployer.store().calls().is_empty());
}

#[test]
fn test_missing_fields_have_distinct_errors() {
    let (_root, dir) = dist(&[("index.html", "<html>")]);
    let deployer = deployer(MemoryStore::new().with_bucket("site"), MockLog::new());

    let no_version = DeployOptions {
        version: None,
        ..options("1.0.0", &dir)
    };
    let no_dir = DeployOptions {
        dir: None,
        ..options("1.0.0", &dir)
    };
    let no_bucket = DeployOptions {
        bucket: None,
        ..options("1.0.0", &dir)
    };

    assert!(matches!(deployer.deploy(&no_version), Err(CloudPagesError::MissingVersion)));
    assert!(matches!(deployer.deploy(&no_dir), Err(CloudPagesError::MissingDirectory)));
    assert!(matches!(deployer.deploy(&no_bucket), Err(CloudPagesError::MissingBucket)));
    assert!(deployer.store().calls().is_empty());
}

#[test]
fn test_website_configuration_points_at_version() {
    let (_root, dir) = dist(&[("index.html", "<html>")]);
    let deployer = deployer(MemoryStore::new().with_bucket("site"), MockLog::new());

    deployer.deploy(&options("1.0.0", &dir)).unwrap();

    assert_eq!(deployer.store().bucket_acl("site"), Some(Acl::PublicRead));
    let website = deployer.store().website("site").unwrap();
    assert_eq!(website.index_document.suffix, "index.html");
    assert_eq!(website.error_document.key, "1.0.0/index.html");
    assert_eq!(website.routing_rules[0].condition.key_prefix_equals, "/index.html");
    assert_eq!(website.routing_rules[0].redirect.replace_key_with, "1.0.0/index.html");
}

#[test]
fn test_bucket_settings_follow_uploads() {
    let (_root, dir) = dist(&[("a.html", "a"), ("b.html", "b"), ("c.html", "c")]);
    let deployer = deployer(MemoryStore::new().with_bucket("site"), MockLog::new());

    deployer.deploy(&options("1.0.0", &dir)).unwrap();

    let operations: Vec<_> = deployer
        .store()
        .calls()
        .iter()
        .map(|call| call.operation())
        .collect();
    assert_eq!(
        operations,
        vec![
            StoreOperation::PutObject,
            StoreOperation::PutObject,
            StoreOperation::PutObject,
            StoreOperation::PutBucketAcl,
            StoreOperation::PutBucketWebsite,
        ]
    );
}

#[test]
fn test_upload_failure_names_file_and_key() {
    let (_root, dir) = dist(&[("index.html", "<html>"), ("app.js", "app")]);
    let store = MemoryStore::new()
        .with_bucket("site")
        .with_failure_on(StoreOperation::PutObject, "1.0.0/app.js");
    let deployer = deployer(store, MockLog::new());

    let err = deployer.deploy(&options("1.0.0", &dir)).unwrap_err();

    match err {
        CloudPagesError::UploadFailure { file, key, .. } => {
            assert_eq!(file, dir.join("app.js"));
            assert_eq!(key, "1.0.0/app.js");
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(deployer.store().calls_of(StoreOperation::PutBucketAcl).is_empty());
    assert!(deployer.store().calls_of(StoreOperation::PutBucketWebsite).is_empty());
}

#[test]
fn test_website_failure_is_configuration_error() {
    let (_root, dir) = dist(&[("index.html", "<html>")]);
    let store = MemoryStore::new()
        .with_bucket("site")
        .with_failure(StoreOperation::PutBucketWebsite);
    let deployer = deployer(store, MockLog::new());

    let err = deployer.deploy(&options("1.0.0", &dir)).unwrap_err();
    match err {
        CloudPagesError::BucketConfigurationFailure { bucket, setting, .. } => {
            assert_eq!(bucket, "site");
            assert_eq!(setting, "website");
        }
        other => panic!("unexpected error: {}", other),
    }
}

fn tagged_log() -> MockLog {
    MockLog::new()
        .with_entry("c4", ago(1), "4.0.0 (HEAD -> master, tag: v4.0.0)")
        .with_entry("c3", ago(10), "3.0.0 (tag: v3.0.0)")
        .with_entry("c2", ago(40), "2.0.0 (tag: v2.0.0)")
        .with_entry("c1", ago(50), "1.0.0 (tag: v1.0.0)")
}

fn bucket_with_versions() -> MemoryStore {
    MemoryStore::new()
        .with_object("site", "v1.0.0/index.html", "1")
        .with_object("site", "v1.0.0/app.js", "1")
        .with_object("site", "v2.0.0/index.html", "2")
        .with_object("site", "v3.0.0/index.html", "3")
}

#[test]
fn test_prune_removes_old_versions() {
    let (_root, dir) = dist(&[("index.html", "<html>")]);
    let deployer = deployer(bucket_with_versions(), tagged_log());
    let opts = DeployOptions {
        remove: true,
        retention: RetentionPolicy::new(2, Duration::from_secs(30 * DAY as u64)),
        ..options("v4.0.0", &dir)
    };

    let report = deployer.deploy(&opts).unwrap();

    assert_eq!(
        deployer.store().keys("site"),
        vec!["v3.0.0/index.html", "v4.0.0/index.html"]
    );
    let pruned: Vec<_> = report.removed.iter().map(|o| o.tag.as_str()).collect();
    assert_eq!(pruned, vec!["v2.0.0", "v1.0.0"]);
    assert_eq!(report.removed_objects(), 3);
    assert!(report.warnings.is_empty());
    assert_eq!(report.stages[report.stages.len() - 2], DeployStage::Pruning);
}

#[test]
fn test_prune_reads_repository_or_dir() {
    let (_root, dir) = dist(&[("index.html", "<html>")]);
    let deployer = deployer(MemoryStore::new().with_bucket("site"), tagged_log());

    let opts = DeployOptions {
        remove: true,
        ..options("v4.0.0", &dir)
    };
    deployer.deploy(&opts).unwrap();

    let repo = PathBuf::from("/srv/repo");
    let opts = DeployOptions {
        remove: true,
        repository: Some(repo.clone()),
        ..options("v4.0.0", &dir)
    };
    deployer.deploy(&opts).unwrap();

    assert_eq!(deployer.log().requests(), vec![dir.clone(), repo]);
}

#[test]
fn test_no_history_read_without_remove() {
    let (_root, dir) = dist(&[("index.html", "<html>")]);
    let log = MockLog::failing("not a repository");
    let deployer = deployer(MemoryStore::new().with_bucket("site"), log);

    deployer.deploy(&options("1.0.0", &dir)).unwrap();
    assert!(deployer.log().requests().is_empty());
}

#[test]
fn test_repository_failure_after_deploy() {
    let (_root, dir) = dist(&[("index.html", "<html>")]);
    let log = MockLog::failing("not a repository");
    let deployer = deployer(MemoryStore::new().with_bucket("site"), log);
    let opts = DeployOptions {
        remove: true,
        ..options("1.0.0", &dir)
    };

    let err = deployer.deploy(&opts).unwrap_err();

    assert!(matches!(err, CloudPagesError::RepositoryReadFailure { .. }));
    // The site itself was deployed before pruning started
    assert!(deployer.store().website("site").is_some());
}

#[test]
fn test_prune_warnings() {
    let (_root, dir) = dist(&[("index.html", "<html>")]);
    let deployer = deployer(MemoryStore::new().with_bucket("site"), tagged_log());
    let opts = DeployOptions {
        remove: true,
        retention: RetentionPolicy::new(3, Duration::ZERO),
        ..options("5.0.0", &dir)
    };

    let report = deployer.deploy(&opts).unwrap();

    assert_eq!(
        report.warnings,
        vec![
            DeployWarning::CurrentVersionNotTagged {
                version: "5.0.0".to_string()
            },
            DeployWarning::NothingToRemove {
                tag: "v1.0.0".to_string()
            },
        ]
    );
}

#[test]
fn test_prune_without_tags_warns() {
    let (_root, dir) = dist(&[("index.html", "<html>")]);
    let log = MockLog::new().with_entry("c1", ago(100), "Initial commit");
    let deployer = deployer(MemoryStore::new().with_bucket("site"), log);
    let opts = DeployOptions {
        remove: true,
        ..options("1.0.0", &dir)
    };

    let report = deployer.deploy(&opts).unwrap();

    assert!(report.removed.is_empty());
    assert_eq!(
        report.warnings,
        vec![DeployWarning::NoTaggedVersions {
            repository: dir.clone()
        }]
    );
    assert!(deployer.store().calls_of(StoreOperation::ListObjects).is_empty());
}

#[test]
fn test_prune_paginates_full_pages() {
    let (_root, dir) = dist(&[("index.html", "<html>")]);
    let store = (0..5).fold(MemoryStore::new().with_bucket("site"), |store, i| {
        store.with_object("site", format!("v1.0.0/chunk-{}.js", i), "x")
    });
    let deployer = deployer(store, tagged_log());
    let opts = DeployOptions {
        remove: true,
        retention: RetentionPolicy::new(3, Duration::ZERO),
        page_size: 2,
        ..options("v4.0.0", &dir)
    };

    let report = deployer.deploy(&opts).unwrap();

    let listings = deployer.store().calls_of(StoreOperation::ListObjects);
    assert_eq!(listings.len(), 3);
    assert!(listings.iter().all(|call| matches!(
        call,
        StoreCall::ListObjects { prefix, max_keys: 2, .. } if prefix == "v1.0.0/"
    )));
    assert_eq!(report.removed_objects(), 5);
}

#[test]
fn test_prune_deletion_failure_fails_pass() {
    let (_root, dir) = dist(&[("index.html", "<html>")]);
    let store = bucket_with_versions().with_failure_on(StoreOperation::DeleteObjects, "v2.0.0/");
    let deployer = deployer(store, tagged_log());
    let opts = DeployOptions {
        remove: true,
        retention: RetentionPolicy::new(2, Duration::from_secs(30 * DAY as u64)),
        ..options("v4.0.0", &dir)
    };

    let err = deployer.deploy(&opts).unwrap_err();
    match err {
        CloudPagesError::DeletionFailure { prefix, .. } => assert_eq!(prefix, "v2.0.0/"),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_retention_plan_does_not_touch_store() {
    let deployer = deployer(bucket_with_versions(), tagged_log());
    let policy = RetentionPolicy::new(2, Duration::from_secs(30 * DAY as u64));

    let plan = deployer
        .retention_plan(Path::new("."), "v4.0.0", &policy)
        .unwrap();

    let removable: Vec<_> = plan.removable().map(|v| v.tag.as_str()).collect();
    assert_eq!(removable, vec!["v2.0.0", "v1.0.0"]);
    assert_eq!(plan.entries.len(), 4);
    assert!(deployer.store().calls().is_empty());
}
