//! Local directory destination.
//!
//! Syncs the transformed tree into a folder: pre-existing files are
//! deleted unless they match the destination excludes, then the workdir
//! is copied over. With no folder configured, output lands under
//! `<cwd>/copybara/out/<project>/<timestamp>` with non-alphanumerics
//! stripped from the project name.

use std::path::PathBuf;

use chrono::Local;

use super::{Destination, TransformResult, WriteResult};
use crate::console::Console;
use crate::error::Result;
use crate::files;
use crate::revision::Revision;

// ---------------------------------------------------------------------------
// FolderDestination
// ---------------------------------------------------------------------------

/// A destination that copies the migrated tree into a local folder.
#[derive(Debug)]
pub struct FolderDestination {
    local_folder: Option<PathBuf>,
    project: String,
    /// Root for the default output path; the process working directory in
    /// production, injected in tests.
    default_root: PathBuf,
}

impl FolderDestination {
    /// Create a folder destination. `local_folder` of `None` selects the
    /// timestamped default path under `default_root`.
    #[must_use]
    pub const fn new(local_folder: Option<PathBuf>, project: String, default_root: PathBuf) -> Self {
        Self {
            local_folder,
            project,
            default_root,
        }
    }

    fn output_folder(&self) -> PathBuf {
        match &self.local_folder {
            Some(folder) => folder.clone(),
            None => {
                let sanitized: String = self
                    .project
                    .chars()
                    .filter(char::is_ascii_alphanumeric)
                    .collect();
                self.default_root
                    .join("copybara/out")
                    .join(sanitized)
                    .join(Local::now().format("%Y%m%d%H%M%S%3f").to_string())
            }
        }
    }
}

impl Destination for FolderDestination {
    fn write(&self, result: &TransformResult, console: &Console) -> Result<WriteResult> {
        let folder = self.output_folder();
        console.progress(&format!(
            "FolderDestination: creating folder {}",
            folder.display()
        ));
        if folder.exists() {
            files::remove_files_except(&folder, &result.destination_excludes)?;
        } else {
            std::fs::create_dir_all(&folder)?;
        }

        console.progress(&format!(
            "FolderDestination: copying contents of the workdir to {}",
            folder.display()
        ));
        files::copy_tree(&result.workdir, &folder)?;

        Ok(WriteResult {
            destination_ref: folder.to_string_lossy().into_owned(),
        })
    }

    fn last_revision(&self, _label: &str, _console: &Console) -> Result<Option<Revision>> {
        // A plain folder keeps no history to scan.
        Ok(None)
    }
}
