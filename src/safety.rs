use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Resolves the config document to the real file that will be rewritten.
///
/// Relative targets are taken from the workspace root and may not climb out
/// of it. Absolute targets are used as given. Either way the result is
/// canonical, so a symlinked config resolves to the file it points at.
#[derive(Debug, Clone)]
pub struct WorkspaceGuard {
    root: PathBuf,
    /// Never rewritten, wherever the target came from
    git_dir: Option<PathBuf>,
}

#[derive(Error, Debug)]
pub enum SafetyError {
    #[error("{requested} resolves to {resolved}, which is not under {root}")]
    Escapes {
        requested: PathBuf,
        resolved: PathBuf,
        root: PathBuf,
    },

    #[error("refusing to rewrite {path} inside the git directory")]
    GitDir { path: PathBuf },

    #[error("cannot resolve {path}: {source}")]
    Unresolvable {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl SafetyError {
    /// The underlying I/O error when the path could not be resolved.
    pub fn io_kind(&self) -> Option<std::io::ErrorKind> {
        match self {
            SafetyError::Unresolvable { source, .. } => Some(source.kind()),
            _ => None,
        }
    }
}

fn resolve_existing(path: &Path) -> Result<PathBuf, SafetyError> {
    path.canonicalize()
        .map_err(|source| SafetyError::Unresolvable {
            path: path.to_path_buf(),
            source,
        })
}

impl WorkspaceGuard {
    pub fn new(root: impl AsRef<Path>) -> Result<Self, SafetyError> {
        let root = resolve_existing(root.as_ref())?;
        let git_dir = root.join(".git").canonicalize().ok();
        Ok(Self { root, git_dir })
    }

    /// Resolve `path` to the canonical file to read and rewrite.
    pub fn validate_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let requested = path.as_ref();

        if requested.is_absolute() {
            let resolved = resolve_existing(requested)?;
            self.reject_git_dir(&resolved)?;
            return Ok(resolved);
        }

        let resolved = resolve_existing(&self.root.join(requested))?;

        // `../` or a symlink pointing out of the checkout
        if !resolved.starts_with(&self.root) {
            return Err(SafetyError::Escapes {
                requested: requested.to_path_buf(),
                resolved,
                root: self.root.clone(),
            });
        }
        self.reject_git_dir(&resolved)?;

        Ok(resolved)
    }

    fn reject_git_dir(&self, resolved: &Path) -> Result<(), SafetyError> {
        let inside_git = self
            .git_dir
            .as_ref()
            .is_some_and(|git_dir| resolved.starts_with(git_dir))
            || resolved
                .components()
                .any(|c| c == Component::Normal(".git".as_ref()));

        if inside_git {
            Err(SafetyError::GitDir {
                path: resolved.to_path_buf(),
            })
        } else {
            Ok(())
        }
    }

    pub fn workspace_root(&self) -> &Path {
        &self.root
    }
}
