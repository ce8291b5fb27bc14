//! Local directory origin.
//!
//! Imports the current contents of a directory as a single synthetic
//! change. Useful for one-shot imports and for testing workflows without
//! a VCS on the read side.

use std::path::{Path, PathBuf};

use chrono::Local;

use super::{Origin, VisitResult};
use crate::authoring::Author;
use crate::console::Console;
use crate::error::{MigrationError, Result};
use crate::files;
use crate::revision::{Change, Revision};

/// Label stamped into destination commits for folder imports.
pub const FOLDER_ORIGIN_REV_ID: &str = "FolderOrigin-RevId";

// ---------------------------------------------------------------------------
// FolderOrigin
// ---------------------------------------------------------------------------

/// An origin reading from a plain directory.
#[derive(Debug)]
pub struct FolderOrigin {
    folder: PathBuf,
    author: Author,
}

impl FolderOrigin {
    /// Create an origin for `folder`. `author` is the author stamped on
    /// the synthetic change.
    #[must_use]
    pub const fn new(folder: PathBuf, author: Author) -> Self {
        Self { folder, author }
    }

    fn synthetic_change(&self, revision: &Revision) -> Change {
        Change::new(
            revision.clone(),
            self.author.clone(),
            format!("Import of {}\n", revision),
            Local::now().fixed_offset(),
            Vec::new(),
        )
    }
}

impl Origin for FolderOrigin {
    fn resolve(&self, reference: Option<&str>, console: &Console) -> Result<Revision> {
        let folder = match reference.filter(|r| !r.is_empty()) {
            Some(reference) => PathBuf::from(reference),
            None => self.folder.clone(),
        };
        console.progress(&format!("Folder Origin: Importing {}", folder.display()));
        let canonical = folder.canonicalize().map_err(|e| {
            MigrationError::vcs(format!(
                "cannot read origin folder '{}': {e}",
                folder.display()
            ))
        })?;
        if !canonical.is_dir() {
            return Err(MigrationError::vcs(format!(
                "origin folder '{}' is not a directory",
                canonical.display()
            )));
        }
        Ok(Revision::new(canonical.to_string_lossy().into_owned()))
    }

    fn checkout(&self, revision: &Revision, workdir: &Path) -> Result<()> {
        if workdir.exists() {
            files::clear_dir(workdir)?;
        } else {
            std::fs::create_dir_all(workdir)?;
        }
        files::copy_tree(Path::new(revision.as_str()), workdir)
    }

    fn changes(&self, from: Option<&Revision>, to: &Revision) -> Result<Vec<Change>> {
        if from == Some(to) {
            return Ok(Vec::new());
        }
        Ok(vec![self.synthetic_change(to)])
    }

    fn change(&self, revision: &Revision) -> Result<Change> {
        Ok(self.synthetic_change(revision))
    }

    fn visit_changes(
        &self,
        start: &Revision,
        visitor: &mut dyn FnMut(&Change) -> VisitResult,
    ) -> Result<()> {
        visitor(&self.synthetic_change(start));
        Ok(())
    }

    fn label_name(&self) -> &str {
        FOLDER_ORIGIN_REV_ID
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn origin(folder: &Path) -> FolderOrigin {
        FolderOrigin::new(
            folder.to_path_buf(),
            Author::new("Folder", "folder@example.com").unwrap(),
        )
    }

    #[test]
    fn resolve_canonicalizes_the_configured_folder() {
        let dir = TempDir::new().unwrap();
        let origin = origin(dir.path());
        let revision = origin.resolve(None, &Console::new(false)).unwrap();
        assert_eq!(
            revision.as_str(),
            dir.path().canonicalize().unwrap().to_string_lossy()
        );
    }

    #[test]
    fn resolve_missing_folder_fails() {
        let dir = TempDir::new().unwrap();
        let origin = origin(&dir.path().join("nope"));
        assert!(origin.resolve(None, &Console::new(false)).is_err());
    }

    #[test]
    fn checkout_copies_the_tree() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/file.txt"), "content").unwrap();

        let origin = origin(dir.path());
        let revision = origin.resolve(None, &Console::new(false)).unwrap();

        let workdir = TempDir::new().unwrap();
        // Pre-existing content must not survive the checkout.
        fs::write(workdir.path().join("stale.txt"), "old").unwrap();
        origin.checkout(&revision, workdir.path()).unwrap();

        assert_eq!(
            fs::read_to_string(workdir.path().join("sub/file.txt")).unwrap(),
            "content"
        );
        assert!(!workdir.path().join("stale.txt").exists());
    }

    #[test]
    fn changes_returns_one_synthetic_change() {
        let dir = TempDir::new().unwrap();
        let origin = origin(dir.path());
        let revision = origin.resolve(None, &Console::new(false)).unwrap();

        let changes = origin.changes(None, &revision).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].revision(), &revision);
        assert_eq!(changes[0].author().email(), "folder@example.com");
    }

    #[test]
    fn changes_from_same_revision_is_empty() {
        let dir = TempDir::new().unwrap();
        let origin = origin(dir.path());
        let revision = origin.resolve(None, &Console::new(false)).unwrap();
        assert!(origin.changes(Some(&revision), &revision).unwrap().is_empty());
    }
}
