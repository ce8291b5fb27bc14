//! Working-tree filesystem helpers.
//!
//! Recursive copy, matcher-driven deletion with empty-directory pruning,
//! and byte-wise tree comparison. All paths handed to matchers are
//! relative to the tree root with `/` separators.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::matcher::PathMatcher;

// ---------------------------------------------------------------------------
// Listing and copying
// ---------------------------------------------------------------------------

/// All regular files under `root`, as sorted root-relative paths.
pub fn list_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    walk(root, root, &mut files)?;
    files.sort();
    Ok(files)
}

fn walk(root: &Path, dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            walk(root, &path, files)?;
        } else {
            let relative = path
                .strip_prefix(root)
                .expect("walked path is under the root");
            files.push(relative.to_path_buf());
        }
    }
    Ok(())
}

/// Recursively copy the contents of `src` into `dest`, creating
/// directories as needed. Existing files in `dest` are overwritten.
pub fn copy_tree(src: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Remove everything under `root`, leaving `root` itself in place.
pub fn clear_dir(root: &Path) -> Result<()> {
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(entry.path())?;
        } else {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Matcher-driven deletion
// ---------------------------------------------------------------------------

/// Delete every file under `root` whose relative path matches `matcher`.
/// Directories left empty by the deletions are removed.
pub fn remove_matching_files(root: &Path, matcher: &PathMatcher) -> Result<()> {
    remove_files_where(root, &|relative| matcher.matches(relative))
}

/// Delete every file under `root` whose relative path does NOT match
/// `matcher`. Directories left empty by the deletions are removed. This is
/// the destination pre-clean: matching files are the ones preserved.
pub fn remove_files_except(root: &Path, matcher: &PathMatcher) -> Result<()> {
    remove_files_where(root, &|relative| !matcher.matches(relative))
}

fn remove_files_where(root: &Path, should_delete: &dyn Fn(&Path) -> bool) -> Result<()> {
    for relative in list_files(root)? {
        if should_delete(&relative) {
            fs::remove_file(root.join(&relative))?;
        }
    }
    prune_empty_dirs(root)?;
    Ok(())
}

/// Remove directories under `root` that contain no files, depth-first.
/// `root` itself is kept even when empty.
fn prune_empty_dirs(root: &Path) -> Result<()> {
    prune_below(root)?;
    Ok(())
}

fn prune_below(dir: &Path) -> Result<bool> {
    let mut has_content = false;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            let child_has_content = prune_below(&entry.path())?;
            if child_has_content {
                has_content = true;
            } else {
                fs::remove_dir(entry.path())?;
            }
        } else {
            has_content = true;
        }
    }
    Ok(has_content)
}

// ---------------------------------------------------------------------------
// Tree comparison
// ---------------------------------------------------------------------------

/// Compare two trees byte-for-byte. Returns the first relative path that
/// differs (missing on either side or different content), or `None` when
/// the trees are identical.
pub fn first_difference(a: &Path, b: &Path) -> Result<Option<PathBuf>> {
    let files_a = list_files(a)?;
    let files_b = list_files(b)?;

    let mut iter_a = files_a.iter().peekable();
    let mut iter_b = files_b.iter().peekable();
    loop {
        match (iter_a.peek(), iter_b.peek()) {
            (None, None) => return Ok(None),
            (Some(pa), None) => return Ok(Some(pa.to_path_buf())),
            (None, Some(pb)) => return Ok(Some(pb.to_path_buf())),
            (Some(pa), Some(pb)) => {
                if pa != pb {
                    return Ok(Some(pa.min(pb).to_path_buf()));
                }
                if fs::read(a.join(pa))? != fs::read(b.join(pb))? {
                    return Ok(Some(pa.to_path_buf()));
                }
                iter_a.next();
                iter_b.next();
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
