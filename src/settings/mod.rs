//! Layered settings: command-line flags, then environment variables, then
//! the optional `domain-patcher.toml`, then built-in defaults.
//!
//! Environment access is injected as a lookup function so resolution can be
//! tested without touching process state.

pub mod loader;
pub mod schema;

pub use loader::{discover, load_from_path, load_from_str, ConfigError, DEFAULT_SETTINGS_FILE};
pub use schema::{SettingsFile, ValidationError, ValidationIssue};

use crate::branch::{BranchError, BranchName};
use crate::pattern::{DomainPattern, PatternError, DEFAULT_DOMAIN, DEFAULT_KEY};
use std::path::PathBuf;

/// Config document patched when nothing else is specified.
pub const DEFAULT_FILE: &str = "config/prod.exs";

/// Environment variable the branch name is read from by default.
pub const DEFAULT_BRANCH_ENV: &str = "BRANCH_NAME";

pub const ENV_FILE: &str = "DOMAIN_PATCHER_FILE";
pub const ENV_KEY: &str = "DOMAIN_PATCHER_KEY";
pub const ENV_DOMAIN: &str = "DOMAIN_PATCHER_DOMAIN";

/// Values given explicitly on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub file: Option<PathBuf>,
    pub key: Option<String>,
    pub domain: Option<String>,
    pub branch: Option<String>,
    pub unchecked_branch: bool,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub file: PathBuf,
    pub key: String,
    pub domain: String,
    /// Variable the branch was looked up in
    pub branch_env: String,
    /// Raw branch value, if any source provided one
    pub branch: Option<String>,
    pub unchecked_branch: bool,
}

impl Settings {
    pub fn resolve<F>(overrides: Overrides, file: Option<&SettingsFile>, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let from_file = file.cloned().unwrap_or_default();

        let branch_env = from_file
            .branch_env
            .unwrap_or_else(|| DEFAULT_BRANCH_ENV.to_string());

        Self {
            file: overrides
                .file
                .or_else(|| env(ENV_FILE).map(PathBuf::from))
                .or(from_file.file)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_FILE)),
            key: overrides
                .key
                .or_else(|| env(ENV_KEY))
                .or(from_file.key)
                .unwrap_or_else(|| DEFAULT_KEY.to_string()),
            domain: overrides
                .domain
                .or_else(|| env(ENV_DOMAIN))
                .or(from_file.domain)
                .unwrap_or_else(|| DEFAULT_DOMAIN.to_string()),
            branch: overrides.branch.or_else(|| env(&branch_env)),
            unchecked_branch: overrides.unchecked_branch
                || from_file.unchecked_branch.unwrap_or(false),
            branch_env,
        }
    }

    /// The branch name, validated unless unchecked mode is on.
    ///
    /// In unchecked mode a missing branch becomes the empty string.
    pub fn branch(&self) -> Result<BranchName, BranchError> {
        if self.unchecked_branch {
            return Ok(BranchName::unchecked(
                self.branch.clone().unwrap_or_default(),
            ));
        }

        match &self.branch {
            Some(raw) => BranchName::parse(raw.as_str()),
            None => Err(BranchError::Missing {
                env_var: self.branch_env.clone(),
            }),
        }
    }

    pub fn pattern(&self) -> Result<DomainPattern, PatternError> {
        DomainPattern::new(self.key.as_str(), self.domain.as_str())
    }
}
