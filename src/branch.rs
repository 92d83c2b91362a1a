use std::fmt;
use thiserror::Error;

/// A source-control branch name used to namespace the deployed domain.
///
/// Constructed through [`BranchName::parse`], which only admits names that
/// form a usable DNS label prefix, or through [`BranchName::unchecked`], which
/// interpolates the raw value as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchName {
    value: String,
    checked: bool,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BranchError {
    #[error("branch name is not set (expected it in ${env_var} or --branch)")]
    Missing { env_var: String },

    #[error("branch name is empty")]
    Empty,

    #[error("branch name {name:?} contains {ch:?} at position {position}; only ASCII letters, digits and '-' are allowed")]
    InvalidCharacter {
        name: String,
        ch: char,
        position: usize,
    },

    #[error("branch name {name:?} must not start or end with '-'")]
    EdgeHyphen { name: String },
}

impl BranchName {
    /// Validate a branch name for use as a domain label prefix.
    pub fn parse(raw: impl Into<String>) -> Result<Self, BranchError> {
        let value = raw.into();

        if value.trim().is_empty() {
            return Err(BranchError::Empty);
        }

        if let Some((position, ch)) = value
            .char_indices()
            .find(|(_, ch)| !(ch.is_ascii_alphanumeric() || *ch == '-'))
        {
            return Err(BranchError::InvalidCharacter {
                name: value,
                ch,
                position,
            });
        }

        if value.starts_with('-') || value.ends_with('-') {
            return Err(BranchError::EdgeHyphen { name: value });
        }

        Ok(Self {
            value,
            checked: true,
        })
    }

    /// Accept any value, including an empty one.
    ///
    /// An empty branch yields a replacement such as `"-api.teamwalnut.com"`.
    pub fn unchecked(raw: impl Into<String>) -> Self {
        Self {
            value: raw.into(),
            checked: false,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Whether this name went through [`BranchName::parse`].
    pub fn is_checked(&self) -> bool {
        self.checked
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.value
    }
}
