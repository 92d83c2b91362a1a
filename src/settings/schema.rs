use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

/// Contents of a `domain-patcher.toml` settings file.
///
/// Every field is optional; unset fields fall through to environment
/// variables and then to built-in defaults.
#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SettingsFile {
    /// Config document to patch, relative to the workspace root
    pub file: Option<PathBuf>,
    /// Key the domain is assigned to
    pub key: Option<String>,
    /// Unqualified domain to namespace
    pub domain: Option<String>,
    /// Environment variable holding the branch name
    pub branch_env: Option<String>,
    /// Interpolate the branch without validation
    pub unchecked_branch: Option<bool>,
}

impl SettingsFile {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if let Some(file) = &self.file {
            if file.as_os_str().is_empty() {
                issues.push(ValidationIssue::EmptyField { field: "file" });
            }
        }

        for (field, value) in [
            ("key", &self.key),
            ("domain", &self.domain),
            ("branch_env", &self.branch_env),
        ] {
            if matches!(value, Some(v) if v.trim().is_empty()) {
                issues.push(ValidationIssue::EmptyField { field });
            }
        }

        if let Some(name) = &self.branch_env {
            let valid = !name.is_empty()
                && !name.starts_with(|c: char| c.is_ascii_digit())
                && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
            if !name.trim().is_empty() && !valid {
                issues.push(ValidationIssue::InvalidEnvName { name: name.clone() });
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptyField { field: &'static str },
    InvalidEnvName { name: String },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyField { field } => {
                write!(f, "field '{field}' must not be empty")
            }
            ValidationIssue::InvalidEnvName { name } => {
                write!(f, "'{name}' is not a valid environment variable name")
            }
        }
    }
}
