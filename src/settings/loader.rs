use crate::settings::schema::{SettingsFile, ValidationError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// File name picked up from the workspace root when `--config` is not given.
pub const DEFAULT_SETTINGS_FILE: &str = "domain-patcher.toml";

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },
    Validation {
        path: Option<PathBuf>,
        source: ValidationError,
    },
}

impl ConfigError {
    fn with_path(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            ConfigError::Toml { path: None, source } => ConfigError::Toml {
                path: Some(path),
                source,
            },
            ConfigError::Validation { path: None, source } => ConfigError::Validation {
                path: Some(path),
                source,
            },
            other => other,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read settings from {}: {}", path.display(), source)
            }
            ConfigError::Toml { path, source } => match path {
                Some(path) => write!(
                    f,
                    "failed to parse settings TOML ({}): {}",
                    path.display(),
                    source
                ),
                None => write!(f, "failed to parse settings TOML: {}", source),
            },
            ConfigError::Validation { path, source } => match path {
                Some(path) => write!(f, "invalid settings ({}): {}", path.display(), source),
                None => write!(f, "invalid settings: {}", source),
            },
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml { source, .. } => Some(source),
            ConfigError::Validation { source, .. } => Some(source),
        }
    }
}

pub fn load_from_str(input: &str) -> Result<SettingsFile, ConfigError> {
    let settings: SettingsFile = toml_edit::de::from_str(input)
        .map_err(|source| ConfigError::Toml { path: None, source })?;
    settings
        .validate()
        .map_err(|source| ConfigError::Validation { path: None, source })?;
    Ok(settings)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<SettingsFile, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents).map_err(|error| error.with_path(path))
}

/// Locate the default settings file in `workspace`, if one exists.
pub fn discover(workspace: &Path) -> Option<PathBuf> {
    let candidate = workspace.join(DEFAULT_SETTINGS_FILE);
    candidate.is_file().then_some(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::schema::ValidationIssue;

    #[test]
    fn test_load_full_settings() {
        let settings = load_from_str(
            r#"
file = "config/staging.exs"
key = "host"
domain = "api.example.com"
branch_env = "CI_COMMIT_REF_SLUG"
unchecked_branch = true
"#,
        )
        .unwrap();

        assert_eq!(settings.file, Some(PathBuf::from("config/staging.exs")));
        assert_eq!(settings.key.as_deref(), Some("host"));
        assert_eq!(settings.domain.as_deref(), Some("api.example.com"));
        assert_eq!(settings.branch_env.as_deref(), Some("CI_COMMIT_REF_SLUG"));
        assert_eq!(settings.unchecked_branch, Some(true));
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(load_from_str("").unwrap(), SettingsFile::default());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = load_from_str("domian = \"typo.example.com\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml { path: None, .. }));
    }

    #[test]
    fn test_validation_collects_issues() {
        let err = load_from_str("key = \"\"\nbranch_env = \"1BAD-NAME\"\n").unwrap_err();
        match err {
            ConfigError::Validation { source, .. } => {
                assert_eq!(
                    source.issues,
                    vec![
                        ValidationIssue::EmptyField { field: "key" },
                        ValidationIssue::InvalidEnvName {
                            name: "1BAD-NAME".to_string()
                        },
                    ]
                );
            }
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn test_load_from_path_adds_context() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_SETTINGS_FILE);
        fs::write(&path, "domain = [").unwrap();

        let err = load_from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Toml { path: Some(_), .. }));
        assert!(err.to_string().contains(DEFAULT_SETTINGS_FILE));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_from_path(dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_discover() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(discover(dir.path()), None);

        fs::write(dir.path().join(DEFAULT_SETTINGS_FILE), "").unwrap();
        assert_eq!(
            discover(dir.path()),
            Some(dir.path().join(DEFAULT_SETTINGS_FILE))
        );
    }
}
