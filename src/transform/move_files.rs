//! The Move transformation: rename files and relocate subtrees.

use std::fmt;
use std::fs;
use std::path::Path;

use crate::console::Console;
use crate::error::{MigrationError, Result};

// ---------------------------------------------------------------------------
// Move
// ---------------------------------------------------------------------------

/// Moves `before` to `after` inside the workdir.
///
/// Both are workdir-relative paths and either may be empty: an empty
/// `before` moves the entire workdir contents into the directory `after`,
/// and an empty `after` moves the contents of directory `before` up to the
/// workdir root. Reversing swaps the two; Move is always reversible.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Move {
    before: String,
    after: String,
}

impl Move {
    /// Create a move. Paths must be relative and free of `..` segments;
    /// at most one of the two may be empty.
    pub fn new(before: impl Into<String>, after: impl Into<String>) -> Result<Self> {
        let before = before.into();
        let after = after.into();
        validate_path("before", &before)?;
        validate_path("after", &after)?;
        if before.is_empty() && after.is_empty() {
            return Err(MigrationError::config(
                "move: 'before' and 'after' cannot both be empty",
            ));
        }
        Ok(Self { before, after })
    }

    /// The path before moving (possibly empty for the workdir root).
    #[must_use]
    pub fn before(&self) -> &str {
        &self.before
    }

    /// The path after moving (possibly empty for the workdir root).
    #[must_use]
    pub fn after(&self) -> &str {
        &self.after
    }

    /// The inverse move.
    #[must_use]
    pub fn reverse(&self) -> Self {
        Self {
            before: self.after.clone(),
            after: self.before.clone(),
        }
    }

    /// Apply the move inside `workdir`.
    pub fn apply(&self, workdir: &Path, console: &Console) -> Result<()> {
        if console.verbose() {
            console.progress(&format!("Moving '{}' to '{}'", self.before, self.after));
        }
        if self.before.is_empty() {
            return move_root_into(workdir, &self.after);
        }
        if self.after.is_empty() {
            return move_up_to_root(workdir, &self.before);
        }

        let src = workdir.join(&self.before);
        if !src.exists() {
            return Err(MigrationError::transform(format!(
                "move: '{}' does not exist in the workdir",
                self.before
            )));
        }

        let dest = workdir.join(&self.after);
        let target = if dest.is_dir() {
            // An existing directory receives the source inside it.
            dest.join(src.file_name().expect("validated relative path"))
        } else if dest.exists() {
            return Err(MigrationError::transform(format!(
                "move: '{}' already exists as a file",
                self.after
            )));
        } else {
            dest
        };

        if target.exists() {
            return Err(MigrationError::transform(format!(
                "move: destination '{}' already exists",
                target
                    .strip_prefix(workdir)
                    .unwrap_or(&target)
                    .display()
            )));
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(&src, &target)?;
        Ok(())
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "move('{}', '{}')", self.before, self.after)
    }
}

fn validate_path(field: &str, path: &str) -> Result<()> {
    if path.starts_with('/') {
        return Err(MigrationError::config(format!(
            "move: '{field}' must be a relative path, got '{path}'"
        )));
    }
    if path.split('/').any(|segment| segment == "..") {
        return Err(MigrationError::config(format!(
            "move: '{field}' must not contain '..' segments, got '{path}'"
        )));
    }
    Ok(())
}

/// Move every entry of the workdir root into the directory `after`,
/// keeping the tree structure. The top component of `after` itself is
/// left in place.
fn move_root_into(workdir: &Path, after: &str) -> Result<()> {
    let dest = workdir.join(after);
    if dest.exists() && !dest.is_dir() {
        return Err(MigrationError::transform(format!(
            "move: '{after}' already exists as a file"
        )));
    }
    fs::create_dir_all(&dest)?;

    let skip = after
        .split('/')
        .next()
        .expect("validated non-empty path")
        .to_owned();
    for entry in fs::read_dir(workdir)? {
        let entry = entry?;
        if entry.file_name().to_string_lossy() == skip.as_str() {
            continue;
        }
        let target = dest.join(entry.file_name());
        if target.exists() {
            return Err(MigrationError::transform(format!(
                "move: destination '{}' already exists",
                target.strip_prefix(workdir).unwrap_or(&target).display()
            )));
        }
        fs::rename(entry.path(), target)?;
    }
    Ok(())
}

/// Move every entry of directory `before` up to the workdir root, then
/// remove the emptied directory.
fn move_up_to_root(workdir: &Path, before: &str) -> Result<()> {
    let src = workdir.join(before);
    if !src.is_dir() {
        return Err(MigrationError::transform(format!(
            "move: '{before}' is not a directory in the workdir"
        )));
    }
    for entry in fs::read_dir(&src)? {
        let entry = entry?;
        let target = workdir.join(entry.file_name());
        if target.exists() {
            return Err(MigrationError::transform(format!(
                "move: destination '{}' already exists in the workdir root",
                entry.file_name().to_string_lossy()
            )));
        }
        fs::rename(entry.path(), target)?;
    }
    fs::remove_dir(&src)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
