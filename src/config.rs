use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::{DEFAULT_KEEP_COUNT, DEFAULT_KEEP_DELAY};
use crate::error::{CloudPagesError, Result};
use crate::scan::{DEFAULT_FILES_PATTERN, DEFAULT_IGNORE_PATTERN};
use crate::store::DEFAULT_PAGE_SIZE;

/// File name looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "cloudpages.toml";

/// Represents the complete configuration for cloudpages.
///
/// Contains deployment defaults, retention policy settings, and the local store location.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub deploy: DeployConfig,

    #[serde(default)]
    pub retention: RetentionConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

/// Returns the default include pattern.
fn default_files() -> String {
    DEFAULT_FILES_PATTERN.to_string()
}

/// Returns the default ignore pattern.
fn default_ignore() -> String {
    DEFAULT_IGNORE_PATTERN.to_string()
}

/// Deployment defaults.
///
/// The bucket set here takes precedence over the `AWS_S3_BUCKET` environment variable.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DeployConfig {
    #[serde(default)]
    pub bucket: Option<String>,

    #[serde(default = "default_files")]
    pub files: String,

    #[serde(default = "default_ignore")]
    pub ignore: String,

    #[serde(default)]
    pub repository: Option<PathBuf>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        DeployConfig {
            bucket: None,
            files: default_files(),
            ignore: default_ignore(),
            repository: None,
        }
    }
}

fn default_keep_count() -> usize {
    DEFAULT_KEEP_COUNT
}

fn default_keep_delay() -> Duration {
    DEFAULT_KEEP_DELAY
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

/// Retention policy settings.
///
/// `keep_delay` accepts human-readable durations such as `"30days"` or `"6d 12h"`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RetentionConfig {
    #[serde(default = "default_keep_count")]
    pub keep_count: usize,

    #[serde(default = "default_keep_delay", with = "humantime_serde")]
    pub keep_delay: Duration,

    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        RetentionConfig {
            keep_count: default_keep_count(),
            keep_delay: default_keep_delay(),
            page_size: default_page_size(),
        }
    }
}

/// Returns the default directory holding local buckets.
fn default_store_root() -> PathBuf {
    PathBuf::from("./buckets")
}

/// Location of the directory-backed object store.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StoreConfig {
    #[serde(default = "default_store_root")]
    pub root: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            root: default_store_root(),
        }
    }
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `cloudpages.toml` in current directory
/// 3. `~/.config/.cloudpages.toml` in user config directory
/// 4. Default configuration if no file found
///
/// # Arguments
/// * `config_path` - Optional path to custom configuration file
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err` - If file exists but cannot be read or parsed
pub fn load_config(config_path: Option<&str>) -> Result<Config> {
    let path = if let Some(path) = config_path {
        PathBuf::from(path)
    } else if Path::new(CONFIG_FILE_NAME).exists() {
        PathBuf::from(CONFIG_FILE_NAME)
    } else if let Some(config_dir) = dirs::config_dir() {
        let user_path = config_dir.join(format!(".{}", CONFIG_FILE_NAME));
        if user_path.exists() {
            user_path
        } else {
            return Ok(Config::default());
        }
    } else {
        return Ok(Config::default());
    };

    let config_str = fs::read_to_string(&path).map_err(|e| {
        CloudPagesError::config(format!("cannot read '{}': {}", path.display(), e))
    })?;
    parse_config(&config_str)
        .map_err(|e| CloudPagesError::config(format!("invalid '{}': {}", path.display(), e)))
}

/// Parses a TOML configuration string.
pub fn parse_config(content: &str) -> std::result::Result<Config, toml::de::Error> {
    toml::from_str(content)
}
