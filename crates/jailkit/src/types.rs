//! Core types for poudriere management.

use std::path::{Path, PathBuf};

/// FreeBSD release installed into a jail when none is given.
pub const DEFAULT_VERSION: &str = "9.0-RELEASE";
/// Default location of the main configuration file.
pub const DEFAULT_CONFIG_FILE: &str = "/usr/local/etc/poudriere.conf";
/// Default location of per-jail configuration.
pub const DEFAULT_CONFIG_DIR: &str = "/usr/local/etc/poudriere.d";

/// Where poudriere keeps its configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoudrierePaths {
    /// `poudriere.conf`
    pub config_file: PathBuf,
    /// `poudriere.d`, holding `<jail>-make.conf` files
    pub config_dir: PathBuf,
}

impl Default for PoudrierePaths {
    fn default() -> Self {
        Self {
            config_file: PathBuf::from(DEFAULT_CONFIG_FILE),
            config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
        }
    }
}

impl PoudrierePaths {
    /// Paths rooted somewhere else.
    pub fn new(config_file: impl Into<PathBuf>, config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_file: config_file.into(),
            config_dir: config_dir.into(),
        }
    }

    /// Per-jail make.conf path.
    pub fn make_conf(&self, jail: &str) -> PathBuf {
        self.config_dir.join(format!("{jail}-make.conf"))
    }

    /// Whether the main configuration file exists.
    pub fn config_exists(&self) -> bool {
        Path::new(&self.config_file).is_file()
    }
}

/// Desired build jail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JailSpec {
    pub name: String,
    pub arch: String,
    pub version: String,
}

impl JailSpec {
    /// A jail running the default release.
    pub fn new(name: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arch: arch.into(),
            version: DEFAULT_VERSION.to_string(),
        }
    }

    /// Set the release.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }
}
