//! Git repository destination.
//!
//! Builds a commit whose tree equals the workdir, plus any
//! exclude-preserved files imported from the destination tip, and pushes
//! it. Imports are staged in a scratch copy; the handed-over workdir is
//! never modified. The last migrated origin revision is rediscovered by
//! scanning the destination's first-parent history for the origin's
//! stamp label.

use std::path::Path;

use tempfile::TempDir;

use super::{Destination, TransformResult, WriteResult};
use crate::console::Console;
use crate::error::Result;
use crate::files;
use crate::git::GitRepository;
use crate::origin::git::parse_log;
use crate::revision::Revision;

// ---------------------------------------------------------------------------
// GitDestination
// ---------------------------------------------------------------------------

/// A destination that commits to a git repository and pushes.
#[derive(Debug)]
pub struct GitDestination {
    repo: GitRepository,
    url: String,
    /// Reference read to find the current tip and the last migrated
    /// revision, e.g. `main`.
    fetch_ref: String,
    /// Fully qualified reference pushed to, e.g. `refs/heads/main`.
    push_ref: String,
}

impl GitDestination {
    /// Create a destination for `url`, caching under `storage_root`.
    /// `push_ref` may be a branch shorthand; it is qualified as
    /// `refs/heads/<name>`.
    #[must_use]
    pub fn new(storage_root: &Path, url: String, fetch_ref: String, push_ref: String) -> Self {
        let push_ref = if push_ref.starts_with("refs/") {
            push_ref
        } else {
            format!("refs/heads/{push_ref}")
        };
        Self {
            repo: GitRepository::bare_for_url(storage_root, &url),
            url,
            fetch_ref,
            push_ref,
        }
    }

    /// Fetch the destination tip, or `None` when the ref does not exist
    /// yet (first migration into an empty repository).
    fn fetch_tip(&self, console: &Console) -> Result<Option<String>> {
        self.repo.init()?;
        match self.repo.fetch(&self.url, Some(&self.fetch_ref)) {
            Ok(()) => Ok(Some(self.repo.rev_parse("FETCH_HEAD")?)),
            Err(err) => {
                console.warn(&format!(
                    "GitDestination: '{}' not found in {} ({err}); starting fresh history",
                    self.fetch_ref, self.url
                ));
                Ok(None)
            }
        }
    }
}

impl Destination for GitDestination {
    fn write(&self, result: &TransformResult, console: &Console) -> Result<WriteResult> {
        let parent = self.fetch_tip(console)?;

        // Files preserved by the excludes matcher are taken from the
        // destination tip unless the workdir already provides them. They
        // are staged into a scratch copy; the handed-over workdir stays
        // untouched.
        let staging;
        let tree_root = match &parent {
            Some(parent) if !result.destination_excludes.is_empty() => {
                staging = TempDir::with_prefix("copybara-staging-")?;
                files::copy_tree(&result.workdir, staging.path())?;
                for path in self.repo.ls_files(parent)? {
                    if !result.destination_excludes.matches(&path) {
                        continue;
                    }
                    let target = staging.path().join(&path);
                    if target.exists() {
                        continue;
                    }
                    if let Some(dir) = target.parent() {
                        std::fs::create_dir_all(dir)?;
                    }
                    std::fs::write(&target, self.repo.read_file(parent, &path)?)?;
                }
                staging.path()
            }
            _ => result.workdir.as_path(),
        };

        let tree = self.repo.write_tree(tree_root)?;
        let commit = self.repo.commit_tree(
            &tree,
            parent.as_deref(),
            &result.message,
            &result.author,
            &result.date.to_rfc3339(),
        )?;

        console.progress(&format!(
            "GitDestination: pushing {commit} to {} {}",
            self.url, self.push_ref
        ));
        self.repo.push(&self.url, &commit, &self.push_ref)?;

        Ok(WriteResult {
            destination_ref: commit,
        })
    }

    fn last_revision(&self, label: &str, console: &Console) -> Result<Option<Revision>> {
        let Some(tip) = self.fetch_tip(console)? else {
            return Ok(None);
        };
        let changes = parse_log(&self.repo.log(&tip, None)?)?;
        // Newest stamp wins.
        Ok(changes
            .iter()
            .rev()
            .find_map(|change| change.labels().get(label))
            .map(Revision::new))
    }
}
