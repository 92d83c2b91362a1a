use std::fs;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// Verified byte-span replacement within an in-memory document.
///
/// Every substitution the patcher performs compiles down to a list of these;
/// the span must still hold `expected_before` when the edit is spliced in.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Edit does nothing until passed to apply_edits()"]
pub struct Edit {
    /// Starting byte offset (inclusive)
    pub byte_start: usize,
    /// Ending byte offset (exclusive)
    pub byte_end: usize,
    /// New text to insert at [byte_start, byte_end)
    pub new_text: String,
    /// Text the span must contain before the edit applies
    pub expected_before: String,
}

#[derive(Error, Debug)]
pub enum EditError {
    #[error("Before-text verification failed at byte {byte_start}: expected {expected:?}, found {found:?}")]
    BeforeTextMismatch {
        byte_start: usize,
        byte_end: usize,
        expected: String,
        found: String,
    },

    #[error("Invalid byte range: [{byte_start}, {byte_end}) in document of length {len}")]
    InvalidByteRange {
        byte_start: usize,
        byte_end: usize,
        len: usize,
    },

    #[error("Overlapping edits at bytes {first_end} and {second_start}")]
    Overlap {
        first_end: usize,
        second_start: usize,
    },

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Edit {
    pub fn new(
        byte_start: usize,
        byte_end: usize,
        new_text: impl Into<String>,
        expected_before: impl Into<String>,
    ) -> Self {
        Self {
            byte_start,
            byte_end,
            new_text: new_text.into(),
            expected_before: expected_before.into(),
        }
    }

    /// Validate the edit against the current document.
    fn validate(&self, content: &str) -> Result<(), EditError> {
        if self.byte_start > self.byte_end
            || self.byte_end > content.len()
            || !content.is_char_boundary(self.byte_start)
            || !content.is_char_boundary(self.byte_end)
        {
            return Err(EditError::InvalidByteRange {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                len: content.len(),
            });
        }

        let current = &content[self.byte_start..self.byte_end];
        if current != self.expected_before {
            return Err(EditError::BeforeTextMismatch {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                expected: self.expected_before.clone(),
                found: current.to_string(),
            });
        }

        Ok(())
    }
}

/// Apply a set of edits to a document, returning the new text.
///
/// All edits are validated against the original content first; overlapping
/// spans are rejected. Splicing happens bottom-to-top so earlier offsets stay
/// valid.
pub fn apply_edits(content: &str, edits: &[Edit]) -> Result<String, EditError> {
    let mut ordered: Vec<&Edit> = edits.iter().collect();
    ordered.sort_by_key(|edit| edit.byte_start);

    // Every span is checked against the untouched original
    for edit in &ordered {
        edit.validate(content)?;
    }

    // Sorted by start, so only neighbours can overlap
    for window in ordered.windows(2) {
        let (first, second) = (window[0], window[1]);
        if first.byte_end > second.byte_start {
            return Err(EditError::Overlap {
                first_end: first.byte_end,
                second_start: second.byte_start,
            });
        }
    }

    // Last span first; earlier offsets stay valid
    let mut new_content = content.to_string();
    for edit in ordered.iter().rev() {
        new_content.replace_range(edit.byte_start..edit.byte_end, &edit.new_text);
    }

    Ok(new_content)
}

/// Replace `path` with `content` in one step.
///
/// A sibling temp file is written and synced, given the target's permission
/// bits, then renamed over the target. Readers see either the old document or
/// the new one.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<(), EditError> {
    // A bare file name has an empty parent; that means the current directory.
    let dir = match path.parent() {
        Some(dir) if dir.as_os_str().is_empty() => Path::new("."),
        Some(dir) => dir,
        None => {
            return Err(EditError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} has no parent directory", path.display()),
            )))
        }
    };

    let mode = fs::metadata(path).map(|meta| meta.permissions()).ok();

    // Same directory as the target, so the rename cannot cross filesystems
    let mut staged = tempfile::Builder::new()
        .prefix(".domain-patcher")
        .tempfile_in(dir)?;
    staged.write_all(content)?;
    staged.as_file().sync_all()?;

    // Temp files are created 0600
    if let Some(mode) = mode {
        staged.as_file().set_permissions(mode)?;
    }

    staged.persist(path).map_err(|err| EditError::Io(err.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_single_edit() {
        let content = "hello world";
        let edits = vec![Edit::new(0, 5, "HELLO", "hello")];
        assert_eq!(apply_edits(content, &edits).unwrap(), "HELLO world");
    }

    #[test]
    fn test_apply_edits_any_order() {
        let content = "line1\nline2\nline3\n";
        let edits = vec![
            Edit::new(12, 17, "LINE3", "line3"),
            Edit::new(0, 5, "LINE1", "line1"),
            Edit::new(6, 11, "LINE2-longer", "line2"),
        ];
        assert_eq!(
            apply_edits(content, &edits).unwrap(),
            "LINE1\nLINE2-longer\nLINE3\n"
        );
    }

    #[test]
    fn test_no_edits_is_identity() {
        assert_eq!(apply_edits("unchanged", &[]).unwrap(), "unchanged");
    }

    #[test]
    fn test_invalid_range() {
        let edits = vec![Edit::new(5, 20, "x", "")];
        assert!(matches!(
            apply_edits("hello world", &edits),
            Err(EditError::InvalidByteRange { .. })
        ));
    }

    #[test]
    fn test_inverted_range() {
        let edits = vec![Edit::new(10, 5, "x", "")];
        assert!(matches!(
            apply_edits("hello world", &edits),
            Err(EditError::InvalidByteRange { .. })
        ));
    }

    #[test]
    fn test_range_splitting_char_is_rejected() {
        let edits = vec![Edit::new(1, 2, "x", "")];
        assert!(matches!(
            apply_edits("é", &edits),
            Err(EditError::InvalidByteRange { .. })
        ));
    }

    #[test]
    fn test_before_text_mismatch() {
        let edits = vec![Edit::new(0, 5, "HELLO", "howdy")];
        assert!(matches!(
            apply_edits("hello world", &edits),
            Err(EditError::BeforeTextMismatch { .. })
        ));
    }

    #[test]
    fn test_overlap_rejected() {
        let edits = vec![
            Edit::new(0, 5, "a", "hello"),
            Edit::new(3, 8, "b", "lo wo"),
        ];
        assert!(matches!(
            apply_edits("hello world", &edits),
            Err(EditError::Overlap { .. })
        ));
    }

    #[test]
    fn test_atomic_write_replaces_content() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("prod.exs");
        fs::write(&file_path, b"original content").unwrap();

        atomic_write(&file_path, b"modified").unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "modified");
        let leftovers: Vec<_> = fs::read_dir(temp_dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn test_atomic_write_missing_directory_fails() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("gone/prod.exs");

        let err = atomic_write(&file_path, b"content").unwrap_err();

        assert!(matches!(err, EditError::Io(ref e) if e.kind() == std::io::ErrorKind::NotFound));
        assert!(!file_path.exists());
    }

    #[test]
    #[cfg(unix)]
    fn test_atomic_write_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("prod.exs");
        fs::write(&file_path, b"before").unwrap();
        fs::set_permissions(&file_path, fs::Permissions::from_mode(0o644)).unwrap();

        atomic_write(&file_path, b"after").unwrap();

        let mode = fs::metadata(&file_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }
}
