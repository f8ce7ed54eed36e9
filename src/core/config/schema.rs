//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Validation
//!
//! Config values are validated after parsing: the git executable path must
//! not be empty, and lock extensions must be bare extensions (no separators).

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Global configuration (user scope).
///
/// # Example
///
/// ```toml
/// git_path = "/opt/git/bin/git"
/// git_exec_path = "/opt/git/libexec/git-core"
/// credential_helper = "manager"
/// merge_tool = "vscode"
/// auto_prune_days = 14
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Path to the git executable (default: `git` on PATH)
    pub git_path: Option<String>,

    /// Exported as `GIT_EXEC_PATH` for every invocation
    pub git_exec_path: Option<String>,

    /// Credential helper passed through the environment
    pub credential_helper: Option<String>,

    /// External merge tool used for `External` conflict handling
    pub merge_tool: Option<String>,

    /// Prune the large-file cache after each push: unset disables, 0 prunes
    /// everything already pushed, N keeps the last N days
    pub auto_prune_days: Option<u32>,
}

impl GlobalConfig {
    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.git_path {
            if path.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "git_path must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Repository configuration.
///
/// # Example
///
/// ```toml
/// remote = "origin"
/// lock_extensions = ["uasset", "umap", "blend"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RepoConfig {
    /// Remote used when the current branch has none configured
    pub remote: Option<String>,

    /// Extensions eligible for binary locks regardless of LFS tracking
    pub lock_extensions: Vec<String>,

    /// Repository override for the external merge tool
    pub merge_tool: Option<String>,
}

impl RepoConfig {
    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(remote) = &self.remote {
            if remote.trim().is_empty() || remote.starts_with('-') {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid remote name '{}'",
                    remote
                )));
            }
        }
        for ext in &self.lock_extensions {
            if ext.is_empty() || ext.contains('/') || ext.contains('\\') {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid lock extension '{}'",
                    ext
                )));
            }
        }
        Ok(())
    }

    /// Lock extensions normalized to lowercase without a leading dot.
    pub fn normalized_lock_extensions(&self) -> Vec<String> {
        self.lock_extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .collect()
    }
}
