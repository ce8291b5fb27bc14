//! Workflow definitions and the migration engine.
//!
//! A [`Workflow`] couples an origin, a destination, an authoring policy,
//! and a transformation pipeline. [`Workflow::run`] performs one
//! migration: resolve the requested revision, enumerate new changes,
//! materialize the tree, transform it, and hand it to the destination.
//! The destination write is the sole commit point; every failure before
//! it leaves the destination untouched.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::info;

use crate::authoring::Authoring;
use crate::console::Console;
use crate::destination::{AnyDestination, Destination, TransformResult};
use crate::error::{MigrationError, Result};
use crate::files;
use crate::matcher::PathMatcher;
use crate::origin::{AnyOrigin, Origin};
use crate::revision::{Change, Revision};
use crate::transform::Transform;

// ---------------------------------------------------------------------------
// WorkflowMode
// ---------------------------------------------------------------------------

/// How a range of origin changes maps to destination commits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkflowMode {
    /// All new changes collapse into one destination commit.
    #[default]
    Squash,
    /// Each origin change produces one destination commit, oldest first.
    Iterative,
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

/// A named, configured migration pipeline.
#[derive(Debug)]
pub struct Workflow {
    /// The project this workflow belongs to.
    pub project: String,
    /// The workflow's name in the configuration registry.
    pub name: String,
    /// Where revisions are read from.
    pub origin: AnyOrigin,
    /// Where the transformed tree is written.
    pub destination: AnyDestination,
    /// Authorship mapping from origin to destination.
    pub authoring: Authoring,
    /// The transformation pipeline, applied to each checked-out tree.
    pub transform: Transform,
    /// Start of the migrated range, overriding destination discovery.
    pub last_revision_override: Option<String>,
    /// Files deleted from the workdir right after checkout.
    pub exclude_in_origin: PathMatcher,
    /// Destination files preserved even when absent from the workdir.
    pub exclude_in_destination: PathMatcher,
    /// Squash or iterative migration.
    pub mode: WorkflowMode,
    /// Verify that the reversed pipeline restores the checked-out tree.
    pub reversible_check: bool,
    /// Prompt before the destination write.
    pub ask_for_confirmation: bool,
    /// Root for the run's working directory; a temp dir when unset.
    pub work_dir: Option<PathBuf>,
}

impl Workflow {
    /// Run one migration. `cli_reference` is the optional revision from
    /// the command line; `None` falls back to the origin's configured
    /// default reference.
    pub fn run(&self, cli_reference: Option<&str>, console: &Console) -> Result<()> {
        console.progress(&format!(
            "Running workflow '{}' for project '{}'",
            self.name, self.project
        ));

        let to_rev = self.origin.resolve(cli_reference, console)?;
        let from_rev = self.from_revision(console)?;
        info!(to = %to_rev, from = ?from_rev.as_ref().map(Revision::as_str), "resolved range");

        let changes = self.origin.changes(from_rev.as_ref(), &to_rev)?;
        if changes.is_empty() && self.mode == WorkflowMode::Squash {
            return Err(MigrationError::NoNewChanges {
                workflow: self.name.clone(),
            });
        }

        // Kept alive for the whole run; dropped (and removed) at the end
        // unless the caller pinned an explicit working directory.
        let _scratch;
        let workdir = match &self.work_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                dir.clone()
            }
            None => {
                let tmp = TempDir::with_prefix("copybara-")?;
                let path = tmp.path().to_path_buf();
                _scratch = tmp;
                path
            }
        };

        match self.mode {
            WorkflowMode::Squash => self.run_squash(&changes, &to_rev, &workdir, console),
            WorkflowMode::Iterative => self.run_iterative(&changes, &workdir, console),
        }
    }

    /// The start of the half-open change range: the override when set,
    /// otherwise whatever the destination last recorded for this origin.
    fn from_revision(&self, console: &Console) -> Result<Option<Revision>> {
        if let Some(reference) = &self.last_revision_override {
            return Ok(Some(Revision::new(reference.clone())));
        }
        self.destination
            .last_revision(self.origin.label_name(), console)
    }

    fn run_squash(
        &self,
        changes: &[Change],
        to_rev: &Revision,
        workdir: &Path,
        console: &Console,
    ) -> Result<()> {
        self.origin.checkout(to_rev, workdir)?;
        files::remove_matching_files(workdir, &self.exclude_in_origin)?;
        self.apply_transform(workdir, console)?;

        let newest = changes.last().expect("squash requires a non-empty range");
        let result = TransformResult {
            workdir: workdir.to_path_buf(),
            origin_revision: to_rev.clone(),
            author: self.authoring.resolve(newest.author()),
            date: newest.date(),
            message: self.squash_message(changes, to_rev),
            destination_excludes: self.exclude_in_destination.clone(),
        };
        self.confirm_and_write(&result, console)?;
        Ok(())
    }

    fn run_iterative(
        &self,
        changes: &[Change],
        workdir: &Path,
        console: &Console,
    ) -> Result<()> {
        // A failure stops the run; earlier writes stay committed.
        for change in changes {
            console.progress(&format!("Migrating change {change}"));
            self.origin.checkout(change.revision(), workdir)?;
            files::remove_matching_files(workdir, &self.exclude_in_origin)?;
            self.apply_transform(workdir, console)?;

            let result = TransformResult {
                workdir: workdir.to_path_buf(),
                origin_revision: change.revision().clone(),
                author: self.authoring.resolve(change.author()),
                date: change.date(),
                message: self.iterative_message(change),
                destination_excludes: self.exclude_in_destination.clone(),
            };
            self.confirm_and_write(&result, console)?;
        }
        Ok(())
    }

    /// Apply the pipeline, checking round-trip reversibility first when
    /// configured: the reversed pipeline applied to the transformed tree
    /// must reproduce the checked-out tree byte-for-byte.
    fn apply_transform(&self, workdir: &Path, console: &Console) -> Result<()> {
        if !self.reversible_check {
            return self.transform.transform(workdir, console);
        }

        let pristine = TempDir::with_prefix("pre-transform-")?;
        files::copy_tree(workdir, pristine.path())?;

        self.transform.transform(workdir, console)?;

        let reverse = self.transform.reverse()?;
        let round_trip = TempDir::with_prefix("round-trip-")?;
        files::copy_tree(workdir, round_trip.path())?;
        reverse.transform(round_trip.path(), console)?;

        if let Some(path) = files::first_difference(round_trip.path(), pristine.path())? {
            return Err(MigrationError::Reversibility { path: Some(path) });
        }
        Ok(())
    }

    fn confirm_and_write(&self, result: &TransformResult, console: &Console) -> Result<()> {
        if self.ask_for_confirmation {
            let proceed = console.ask_confirmation(&format!(
                "Write migration of {} to the destination?",
                result.origin_revision
            ))?;
            if !proceed {
                return Err(MigrationError::Canceled);
            }
        }
        let written = self.destination.write(result, console)?;
        console.progress(&format!("Wrote {}", written.destination_ref));
        Ok(())
    }

    /// One synthetic message for the whole squashed range: a digest line
    /// per change (oldest first), the collected labels, and the origin
    /// revision stamp last.
    fn squash_message(&self, changes: &[Change], to_rev: &Revision) -> String {
        let label_name = self.origin.label_name();

        let mut labels: BTreeMap<&str, &str> = BTreeMap::new();
        for change in changes {
            for (name, value) in change.labels() {
                if name.as_str() != label_name {
                    labels.insert(name.as_str(), value.as_str());
                }
            }
        }

        let mut message = format!("Imports '{}'.\n\nMigrated changes:\n", self.project);
        for change in changes {
            let _ = writeln!(message, "  - {} {}", change.revision().short(), change.first_line());
        }
        message.push('\n');
        for (name, value) in &labels {
            let _ = writeln!(message, "{name}={value}");
        }
        let _ = writeln!(message, "{label_name}={to_rev}");
        message
    }

    /// The origin message with the revision stamp appended as its own
    /// trailer paragraph.
    fn iterative_message(&self, change: &Change) -> String {
        format!(
            "{}\n\n{}={}\n",
            change.message().trim_end(),
            self.origin.label_name(),
            change.revision()
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
