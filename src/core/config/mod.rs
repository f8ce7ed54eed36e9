//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! Two configuration scopes:
//! - **Global**: where the git executable lives, credential helper, merge tool
//! - **Repo**: remote override, lock extensions, merge tool override
//!
//! Configuration is re-read for every operation so edits made while a host
//! is running take effect without a restart.
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `$VCBRIDGE_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/vcbridge/config.toml`
//! 3. `~/.vcbridge/config.toml` (canonical write location)
//!
//! # Repo Config Location
//!
//! `<git_dir>/vcbridge/config.toml`
//!
//! # Example
//!
//! ```no_run
//! use vcbridge::core::config::Config;
//! use vcbridge::core::paths::RepoPaths;
//! use std::path::Path;
//!
//! let paths = RepoPaths::for_work_dir(Path::new("/path/to/repo"));
//! let config = Config::load(Some(&paths)).unwrap();
//! println!("git: {}", config.git_path());
//! ```

pub mod schema;

pub use schema::{GlobalConfig, RepoConfig};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::core::paths::RepoPaths;

/// Environment variable naming an explicit global config file.
pub const CONFIG_ENV: &str = "VCBRIDGE_CONFIG";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("failed to write config file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("home directory not found")]
    NoHomeDir,
}

/// Merged configuration from all sources.
///
/// Accessors apply precedence: repo overrides global, global overrides
/// defaults.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub global: GlobalConfig,
    pub repo: Option<RepoConfig>,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// Missing files are not an error; defaults are used.
    pub fn load(paths: Option<&RepoPaths>) -> Result<Self, ConfigError> {
        let global_path = Self::find_global();
        Self::load_from(global_path.as_deref(), paths)
    }

    /// Load configuration from an explicit global file and repository.
    pub fn load_from(
        global_path: Option<&Path>,
        paths: Option<&RepoPaths>,
    ) -> Result<Self, ConfigError> {
        let global = match global_path {
            Some(path) if path.exists() => read_toml::<GlobalConfig>(path)?,
            _ => GlobalConfig::default(),
        };

        let repo = match paths {
            Some(paths) => {
                let path = paths.config_path();
                if path.exists() {
                    Some(read_toml::<RepoConfig>(&path)?)
                } else {
                    None
                }
            }
            None => None,
        };

        global.validate()?;
        if let Some(r) = &repo {
            r.validate()?;
        }

        Ok(Config { global, repo })
    }

    /// Locate the global config file, if any exists.
    fn find_global() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("vcbridge/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        dirs::home_dir()
            .map(|home| home.join(".vcbridge/config.toml"))
            .filter(|path| path.exists())
    }

    /// Canonical path for global config (`~/.vcbridge/config.toml`).
    pub fn global_config_path() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".vcbridge/config.toml"))
    }

    /// Write global config atomically.
    pub fn write_global(config: &GlobalConfig) -> Result<PathBuf, ConfigError> {
        let path = Self::global_config_path()?;
        write_toml_atomic(&path, config)?;
        Ok(path)
    }

    /// Write repo config atomically.
    pub fn write_repo(paths: &RepoPaths, config: &RepoConfig) -> Result<PathBuf, ConfigError> {
        let path = paths.config_path();
        write_toml_atomic(&path, config)?;
        Ok(path)
    }

    // =========================================================================
    // Accessor methods with precedence
    // =========================================================================

    /// The git executable. Defaults to `git` on PATH.
    pub fn git_path(&self) -> &str {
        self.global.git_path.as_deref().unwrap_or("git")
    }

    pub fn git_exec_path(&self) -> Option<&str> {
        self.global.git_exec_path.as_deref()
    }

    pub fn credential_helper(&self) -> Option<&str> {
        self.global.credential_helper.as_deref()
    }

    /// Remote used when the branch has none configured. Defaults to `origin`.
    pub fn remote(&self) -> &str {
        self.repo
            .as_ref()
            .and_then(|r| r.remote.as_deref())
            .unwrap_or("origin")
    }

    /// Merge tool, repo scope first.
    pub fn merge_tool(&self) -> Option<&str> {
        self.repo
            .as_ref()
            .and_then(|r| r.merge_tool.as_deref())
            .or(self.global.merge_tool.as_deref())
    }

    pub fn auto_prune_days(&self) -> Option<u32> {
        self.global.auto_prune_days
    }

    /// Extensions eligible for binary locks (lowercase, no dot).
    pub fn lock_extensions(&self) -> Vec<String> {
        self.repo
            .as_ref()
            .map(RepoConfig::normalized_lock_extensions)
            .unwrap_or_default()
    }
}

fn read_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    debug!(path = %path.display(), "reading config");
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn write_toml_atomic<T: serde::Serialize>(path: &Path, config: &T) -> Result<(), ConfigError> {
    let write_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| ConfigError::WriteError { path, source }
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err(path))?;
    }

    let contents =
        toml::to_string_pretty(config).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

    let temp_path = path.with_extension("toml.tmp");
    let mut file = fs::File::create(&temp_path).map_err(write_err(&temp_path))?;
    file.write_all(contents.as_bytes())
        .map_err(write_err(&temp_path))?;
    file.sync_all().map_err(write_err(&temp_path))?;

    fs::rename(&temp_path, path).map_err(write_err(path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn repo_paths(temp: &TempDir) -> RepoPaths {
        RepoPaths::for_work_dir(temp.path())
    }

    #[test]
    fn defaults_without_files() {
        let config = Config::load_from(None, None).unwrap();
        assert_eq!(config.git_path(), "git");
        assert_eq!(config.remote(), "origin");
        assert!(config.merge_tool().is_none());
        assert!(config.lock_extensions().is_empty());
    }

    #[test]
    fn load_global_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "git_path = \"/opt/git\"\nmerge_tool = \"vscode\"\n").unwrap();

        let config = Config::load_from(Some(&path), None).unwrap();
        assert_eq!(config.git_path(), "/opt/git");
        assert_eq!(config.merge_tool(), Some("vscode"));
    }

    #[test]
    fn load_repo_config() {
        let temp = TempDir::new().unwrap();
        let paths = repo_paths(&temp);
        fs::create_dir_all(paths.bridge_dir()).unwrap();
        fs::write(
            paths.config_path(),
            "remote = \"upstream\"\nlock_extensions = [\"uasset\"]\n",
        )
        .unwrap();

        let config = Config::load_from(None, Some(&paths)).unwrap();
        assert_eq!(config.remote(), "upstream");
        assert_eq!(config.lock_extensions(), vec!["uasset"]);
    }

    #[test]
    fn repo_merge_tool_overrides_global() {
        let config = Config {
            global: GlobalConfig {
                merge_tool: Some("meld".into()),
                ..Default::default()
            },
            repo: Some(RepoConfig {
                merge_tool: Some("vscode".into()),
                ..Default::default()
            }),
        };
        assert_eq!(config.merge_tool(), Some("vscode"));
    }

    #[test]
    fn write_repo_config_atomic() {
        let temp = TempDir::new().unwrap();
        let paths = repo_paths(&temp);

        let config = RepoConfig {
            lock_extensions: vec!["blend".into()],
            ..Default::default()
        };
        let path = Config::write_repo(&paths, &config).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("toml.tmp").exists());

        let loaded = Config::load_from(None, Some(&paths)).unwrap();
        assert_eq!(loaded.lock_extensions(), vec!["blend"]);
    }

    #[test]
    fn malformed_repo_config_is_error() {
        let temp = TempDir::new().unwrap();
        let paths = repo_paths(&temp);
        fs::create_dir_all(paths.bridge_dir()).unwrap();
        fs::write(paths.config_path(), "lock_extensions = 3").unwrap();

        assert!(matches!(
            Config::load_from(None, Some(&paths)),
            Err(ConfigError::ParseError { .. })
        ));
    }
}
