//! The fixed domain assignment that gets namespaced per branch.

use crate::branch::BranchName;
use crate::edit::Edit;
use thiserror::Error;

/// Domain assigned in the stock production config.
pub const DEFAULT_DOMAIN: &str = "api.teamwalnut.com";

/// Key the domain is assigned to.
pub const DEFAULT_KEY: &str = "domain";

const MAX_DNS_LABEL_LEN: usize = 63;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("key must be non-empty and must not contain quotes or line breaks: {0:?}")]
    InvalidKey(String),

    #[error("domain must be non-empty dot-separated labels without quotes or whitespace: {0:?}")]
    InvalidDomain(String),

    #[error("qualified label {label:?} is {len} bytes, longer than the 63-byte DNS limit")]
    LabelTooLong { label: String, len: usize },
}

/// A literal `key: "domain"` assignment and its branch-qualified rewrite.
///
/// Matching is purely textual. The qualified form never contains the
/// unqualified literal, so rewriting is idempotent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainPattern {
    key: String,
    domain: String,
}

impl Default for DomainPattern {
    fn default() -> Self {
        Self {
            key: DEFAULT_KEY.to_string(),
            domain: DEFAULT_DOMAIN.to_string(),
        }
    }
}

impl DomainPattern {
    pub fn new(key: impl Into<String>, domain: impl Into<String>) -> Result<Self, PatternError> {
        let key = key.into();
        let domain = domain.into();

        if key.trim().is_empty() || key.contains(['"', '\n', '\r']) {
            return Err(PatternError::InvalidKey(key));
        }

        let bad_char = |c: char| c == '"' || c.is_whitespace();
        if domain.is_empty()
            || domain.contains(bad_char)
            || domain.split('.').any(str::is_empty)
        {
            return Err(PatternError::InvalidDomain(domain));
        }

        Ok(Self { key, domain })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// The text searched for, e.g. `domain: "api.teamwalnut.com"`.
    pub fn source_literal(&self) -> String {
        format!("{}: \"{}\"", self.key, self.domain)
    }

    /// The text written in place of each match.
    pub fn replacement_for(&self, branch: &BranchName) -> String {
        format!("{}: \"{}-{}\"", self.key, branch, self.domain)
    }

    /// Check that `branch` yields a usable host name.
    ///
    /// Unchecked branches pass through untouched.
    pub fn qualify(&self, branch: &BranchName) -> Result<(), PatternError> {
        if !branch.is_checked() {
            return Ok(());
        }

        let first_label = self.domain.split('.').next().unwrap_or_default();
        let label = format!("{}-{}", branch, first_label);
        if label.len() > MAX_DNS_LABEL_LEN {
            return Err(PatternError::LabelTooLong {
                len: label.len(),
                label,
            });
        }

        Ok(())
    }

    /// One edit per non-overlapping occurrence of the source literal.
    pub fn locate(&self, content: &str, branch: &BranchName) -> Vec<Edit> {
        let literal = self.source_literal();
        let replacement = self.replacement_for(branch);

        content
            .match_indices(&literal)
            .map(|(start, matched)| {
                Edit::new(start, start + matched.len(), replacement.clone(), matched)
            })
            .collect()
    }

    pub fn count_unqualified(&self, content: &str) -> usize {
        content.matches(&self.source_literal()).count()
    }

    pub fn count_qualified(&self, content: &str, branch: &BranchName) -> usize {
        content.matches(&self.replacement_for(branch)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::apply_edits;

    fn branch(name: &str) -> BranchName {
        BranchName::parse(name).unwrap()
    }

    #[test]
    fn test_default_literals() {
        let pattern = DomainPattern::default();
        assert_eq!(pattern.source_literal(), r#"domain: "api.teamwalnut.com""#);
        assert_eq!(
            pattern.replacement_for(&branch("feature-x")),
            r#"domain: "feature-x-api.teamwalnut.com""#
        );
    }

    #[test]
    fn test_locate_every_occurrence() {
        let pattern = DomainPattern::default();
        let content = "a\n  domain: \"api.teamwalnut.com\",\nb\n  domain: \"api.teamwalnut.com\"\n";
        let edits = pattern.locate(content, &branch("qa"));
        assert_eq!(edits.len(), 2);
        assert!(edits[0].byte_start < edits[1].byte_start);

        let patched = apply_edits(content, &edits).unwrap();
        assert_eq!(
            patched,
            "a\n  domain: \"qa-api.teamwalnut.com\",\nb\n  domain: \"qa-api.teamwalnut.com\"\n"
        );
    }

    #[test]
    fn test_qualified_text_does_not_rematch() {
        let pattern = DomainPattern::default();
        let content = r#"domain: "qa-api.teamwalnut.com""#;
        assert!(pattern.locate(content, &branch("qa")).is_empty());
        assert_eq!(pattern.count_unqualified(content), 0);
        assert_eq!(pattern.count_qualified(content, &branch("qa")), 1);
    }

    #[test]
    fn test_near_misses_are_ignored() {
        let pattern = DomainPattern::default();
        for content in [
            r#"domain:"api.teamwalnut.com""#,
            r#"domain: 'api.teamwalnut.com'"#,
            r#"domain: "api.teamwalnut.com.evil""#,
            r#"host: "api.teamwalnut.com""#,
        ] {
            assert_eq!(pattern.count_unqualified(content), 0, "{content}");
        }
    }

    #[test]
    fn test_prefixed_key_still_matches() {
        // Literal matching: `api_domain: "..."` contains the pattern.
        let pattern = DomainPattern::default();
        assert_eq!(
            pattern.count_unqualified(r#"api_domain: "api.teamwalnut.com""#),
            1
        );
    }

    #[test]
    fn test_unchecked_empty_branch() {
        let pattern = DomainPattern::default();
        assert_eq!(
            pattern.replacement_for(&BranchName::unchecked("")),
            r#"domain: "-api.teamwalnut.com""#
        );
    }

    #[test]
    fn test_custom_pattern() {
        let pattern = DomainPattern::new("host", "web.example.org").unwrap();
        assert_eq!(pattern.source_literal(), r#"host: "web.example.org""#);
        assert_eq!(
            pattern.replacement_for(&branch("pr-7")),
            r#"host: "pr-7-web.example.org""#
        );
    }

    #[test]
    fn test_invalid_patterns() {
        assert!(matches!(
            DomainPattern::new("", DEFAULT_DOMAIN),
            Err(PatternError::InvalidKey(_))
        ));
        assert!(matches!(
            DomainPattern::new("do\"main", DEFAULT_DOMAIN),
            Err(PatternError::InvalidKey(_))
        ));
        for domain in ["", "api..com", ".api.com", "api com", "api\".com"] {
            assert!(
                matches!(
                    DomainPattern::new(DEFAULT_KEY, domain),
                    Err(PatternError::InvalidDomain(_))
                ),
                "{domain:?}"
            );
        }
    }

    #[test]
    fn test_qualify_label_length() {
        let pattern = DomainPattern::default();
        // "<branch>-api" must fit in 63 bytes: 59 + 1 + 3 = 63.
        assert!(pattern.qualify(&branch(&"a".repeat(59))).is_ok());
        assert_eq!(
            pattern.qualify(&branch(&"a".repeat(60))),
            Err(PatternError::LabelTooLong {
                label: format!("{}-api", "a".repeat(60)),
                len: 64,
            })
        );
        assert!(pattern
            .qualify(&BranchName::unchecked("a".repeat(100)))
            .is_ok());
    }
}
