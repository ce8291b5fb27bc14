//! The read side of a migration.
//!
//! An [`Origin`] resolves references, materializes revisions into a
//! workdir, and enumerates the first-parent chain of changes. The two
//! implementations are [`GitOrigin`] (a remote or local git repository,
//! cached in a bare repo) and [`FolderOrigin`] (a plain directory).

pub mod folder;
pub mod git;

use std::path::Path;

use crate::console::Console;
use crate::error::Result;
use crate::revision::{Change, Revision};

pub use folder::FolderOrigin;
pub use git::GitOrigin;

/// Whether a [`Origin::visit_changes`] walk keeps going.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VisitResult {
    /// Continue to the first parent.
    Continue,
    /// Stop the walk.
    Terminate,
}

// ---------------------------------------------------------------------------
// Origin trait
// ---------------------------------------------------------------------------

/// Capability set every origin implements.
pub trait Origin {
    /// Resolve a reference string into a [`Revision`] that stays
    /// checkout-able for the rest of the run. `None` or an empty string
    /// falls back to the configured default reference; with neither, this
    /// is a configuration error.
    fn resolve(&self, reference: Option<&str>, console: &Console) -> Result<Revision>;

    /// Populate `workdir` with the exact tree at `revision`. Pre-existing
    /// contents of `workdir` are removed.
    fn checkout(&self, revision: &Revision, workdir: &Path) -> Result<()>;

    /// The first-parent chain in the half-open range `(from, to]`, oldest
    /// first. A `None` start means the whole history ancestral to `to`.
    fn changes(&self, from: Option<&Revision>, to: &Revision) -> Result<Vec<Change>>;

    /// The single change at `revision`.
    fn change(&self, revision: &Revision) -> Result<Change>;

    /// Walk the first-parent chain from `start` toward the root, calling
    /// `visitor` for each change until it returns
    /// [`VisitResult::Terminate`] or no parent remains.
    fn visit_changes(
        &self,
        start: &Revision,
        visitor: &mut dyn FnMut(&Change) -> VisitResult,
    ) -> Result<()>;

    /// The label used to stamp migrated revision ids into destination
    /// commit messages, e.g. `GitOrigin-RevId`.
    fn label_name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// AnyOrigin
// ---------------------------------------------------------------------------

/// A concrete origin selected by configuration. An enum keeps dispatch
/// monomorphic.
#[derive(Debug)]
pub enum AnyOrigin {
    /// A git repository origin.
    Git(GitOrigin),
    /// A local directory origin.
    Folder(FolderOrigin),
}

impl Origin for AnyOrigin {
    fn resolve(&self, reference: Option<&str>, console: &Console) -> Result<Revision> {
        match self {
            Self::Git(origin) => origin.resolve(reference, console),
            Self::Folder(origin) => origin.resolve(reference, console),
        }
    }

    fn checkout(&self, revision: &Revision, workdir: &Path) -> Result<()> {
        match self {
            Self::Git(origin) => origin.checkout(revision, workdir),
            Self::Folder(origin) => origin.checkout(revision, workdir),
        }
    }

    fn changes(&self, from: Option<&Revision>, to: &Revision) -> Result<Vec<Change>> {
        match self {
            Self::Git(origin) => origin.changes(from, to),
            Self::Folder(origin) => origin.changes(from, to),
        }
    }

    fn change(&self, revision: &Revision) -> Result<Change> {
        match self {
            Self::Git(origin) => origin.change(revision),
            Self::Folder(origin) => origin.change(revision),
        }
    }

    fn visit_changes(
        &self,
        start: &Revision,
        visitor: &mut dyn FnMut(&Change) -> VisitResult,
    ) -> Result<()> {
        match self {
            Self::Git(origin) => origin.visit_changes(start, visitor),
            Self::Folder(origin) => origin.visit_changes(start, visitor),
        }
    }

    fn label_name(&self) -> &str {
        match self {
            Self::Git(origin) => origin.label_name(),
            Self::Folder(origin) => origin.label_name(),
        }
    }
}
