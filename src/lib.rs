//! Domain Patcher: namespace a deployment's API domain by git branch
//!
//! Rewrites every `domain: "api.teamwalnut.com"` assignment in a
//! configuration document to `domain: "<branch>-api.teamwalnut.com"`, so a
//! preview deployment for a branch talks to that branch's API.
//!
//! # Architecture
//!
//! The document is treated as opaque text. [`DomainPattern`] locates each
//! occurrence of the literal and turns it into a verified [`Edit`]; the edits
//! are spliced in memory and the result is persisted with an atomic
//! tempfile + rename. [`ConfigPatcher`] drives the sequence and echoes the
//! document before and after substitution.
//!
//! # Safety
//!
//! - Branch names are validated before interpolation ([`BranchName::parse`])
//! - Atomic file writes that keep the original permissions
//! - Target path confined to the workspace root
//! - Idempotent: qualified text never matches again
//!
//! # Example
//!
//! ```no_run
//! use domain_patcher::{BranchName, ConfigPatcher, DomainPattern, WorkspaceGuard};
//!
//! let guard = WorkspaceGuard::new(".")?;
//! let patcher = ConfigPatcher::new(DomainPattern::default(), guard);
//! let branch = BranchName::parse("feature-x")?;
//!
//! let report = patcher.patch("config/prod.exs", &branch, &mut std::io::stdout())?;
//! println!("{:?}", report.outcome);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod branch;
pub mod edit;
pub mod patcher;
pub mod pattern;
pub mod safety;
pub mod settings;

// Re-exports
pub use branch::{BranchError, BranchName};
pub use edit::{apply_edits, atomic_write, Edit, EditError};
pub use patcher::{Census, ConfigPatcher, PatchError, PatchOutcome, PatchReport};
pub use pattern::{DomainPattern, PatternError, DEFAULT_DOMAIN, DEFAULT_KEY};
pub use safety::{SafetyError, WorkspaceGuard};
pub use settings::{ConfigError, Overrides, Settings, SettingsFile};
