use crate::branch::BranchName;
use crate::edit::{apply_edits, atomic_write, EditError};
use crate::pattern::{DomainPattern, PatternError};
use crate::safety::{SafetyError, WorkspaceGuard};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum PatchError {
    #[error(transparent)]
    Safety(#[from] SafetyError),

    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{path} is not valid UTF-8 text")]
    NotUtf8 { path: PathBuf },

    #[error("{path} is read-only")]
    ReadOnly { path: PathBuf },

    #[error("failed to compute substitution for {path}: {source}")]
    Edit { path: PathBuf, source: EditError },

    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: EditError },

    #[error("failed to write diagnostics: {0}")]
    Output(#[source] std::io::Error),
}

/// What happened to the configuration document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "PatchOutcome reports whether anything was replaced"]
pub enum PatchOutcome {
    /// At least one occurrence was replaced
    Patched { replacements: usize },
    /// The source literal does not occur; the content is written back as read
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct PatchReport {
    /// Canonical path of the rewritten file
    pub path: PathBuf,
    pub outcome: PatchOutcome,
    pub before: String,
    pub after: String,
    /// Whether the file on disk was replaced (false only for dry runs)
    pub written: bool,
}

/// Read-only occurrence counts for a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Census {
    pub path: PathBuf,
    /// Occurrences of the unqualified literal
    pub unqualified: usize,
    /// Occurrences already qualified for the given branch
    pub qualified: Option<usize>,
}

/// Rewrites the domain assignment in a configuration file.
#[derive(Debug, Clone)]
pub struct ConfigPatcher {
    pattern: DomainPattern,
    guard: WorkspaceGuard,
    dry_run: bool,
    echo: bool,
}

impl ConfigPatcher {
    pub fn new(pattern: DomainPattern, guard: WorkspaceGuard) -> Self {
        Self {
            pattern,
            guard,
            dry_run: false,
            echo: true,
        }
    }

    /// Compute and print the result without touching the file.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Print the before/after document to the diagnostic stream.
    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn pattern(&self) -> &DomainPattern {
        &self.pattern
    }

    /// Replace every occurrence of the domain literal in `path` with its
    /// `branch`-qualified form and persist the result atomically.
    ///
    /// The full document is written to `out` before and after substitution.
    /// Nothing is written to `out` if the file cannot be read.
    pub fn patch(
        &self,
        path: impl AsRef<Path>,
        branch: &BranchName,
        out: &mut impl Write,
    ) -> Result<PatchReport, PatchError> {
        self.pattern.qualify(branch)?;

        let (target, before) = self.read_target(path.as_ref())?;

        if self.echo {
            writeln!(out, "config file before:\n{before}\n").map_err(PatchError::Output)?;
        }

        info!(path = %target.display(), branch = %branch, "altering config file");
        let edits = self.pattern.locate(&before, branch);
        let after = apply_edits(&before, &edits).map_err(|source| PatchError::Edit {
            path: target.clone(),
            source,
        })?;

        if self.echo {
            writeln!(out, "config file after:\n{after}\n").map_err(PatchError::Output)?;
        }

        let outcome = if edits.is_empty() {
            PatchOutcome::Unchanged
        } else {
            PatchOutcome::Patched {
                replacements: edits.len(),
            }
        };

        // Written back even without a match: an unwritable target always fails.
        let written = if self.dry_run {
            debug!(path = %target.display(), "dry run, skipping write");
            false
        } else {
            self.persist(&target, &after)?;
            match outcome {
                PatchOutcome::Patched { replacements } => {
                    info!(path = %target.display(), replacements, "config file written");
                }
                PatchOutcome::Unchanged => {
                    info!(path = %target.display(), literal = %self.pattern.source_literal(), "no occurrences, original content written back");
                }
            }
            true
        };

        Ok(PatchReport {
            path: target,
            outcome,
            before,
            after,
            written,
        })
    }

    /// Count unqualified and branch-qualified occurrences without writing.
    pub fn status(
        &self,
        path: impl AsRef<Path>,
        branch: Option<&BranchName>,
    ) -> Result<Census, PatchError> {
        let (target, content) = self.read_target(path.as_ref())?;

        Ok(Census {
            unqualified: self.pattern.count_unqualified(&content),
            qualified: branch.map(|branch| self.pattern.count_qualified(&content, branch)),
            path: target,
        })
    }

    fn read_target(&self, path: &Path) -> Result<(PathBuf, String), PatchError> {
        let target = self.guard.validate_path(path)?;
        debug!(requested = %path.display(), resolved = %target.display(), "resolved config file");

        let bytes = fs::read(&target).map_err(|source| PatchError::Read {
            path: target.clone(),
            source,
        })?;
        let content = String::from_utf8(bytes).map_err(|_| PatchError::NotUtf8 {
            path: target.clone(),
        })?;

        Ok((target, content))
    }

    fn persist(&self, target: &Path, content: &str) -> Result<(), PatchError> {
        // Renaming over the file would ignore its permission bits.
        let metadata = fs::metadata(target).map_err(|source| PatchError::Write {
            path: target.to_path_buf(),
            source: EditError::Io(source),
        })?;
        if metadata.permissions().readonly() {
            return Err(PatchError::ReadOnly {
                path: target.to_path_buf(),
            });
        }

        atomic_write(target, content.as_bytes()).map_err(|source| PatchError::Write {
            path: target.to_path_buf(),
            source,
        })
    }
}
