//! The write side of a migration.
//!
//! A [`Destination`] accepts a transformed tree plus commit metadata and
//! persists it. The two implementations are [`GitDestination`] (commit
//! and push) and [`FolderDestination`] (sync a local directory). The
//! destination also remembers the last migrated origin revision, found by
//! scanning its own history for the origin's stamp label.

pub mod folder;
pub mod git;

use std::path::PathBuf;

use chrono::{DateTime, FixedOffset};

use crate::authoring::Author;
use crate::console::Console;
use crate::error::Result;
use crate::matcher::PathMatcher;
use crate::revision::Revision;

pub use folder::FolderDestination;
pub use git::GitDestination;

// ---------------------------------------------------------------------------
// TransformResult / WriteResult
// ---------------------------------------------------------------------------

/// The engine's handoff to a destination: a fully transformed tree plus
/// the metadata for the commit that carries it.
pub struct TransformResult {
    /// The tree to persist.
    pub workdir: PathBuf,
    /// The origin revision this tree was produced from.
    pub origin_revision: Revision,
    /// The authoring-policy-resolved author for the destination commit.
    pub author: Author,
    /// The origin change's date; used as the author date.
    pub date: DateTime<FixedOffset>,
    /// The full commit message, including the origin revision stamp.
    pub message: String,
    /// Destination files matching this are preserved even when absent
    /// from the workdir.
    pub destination_excludes: PathMatcher,
}

/// What a write produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteResult {
    /// Destination-side identifier of the written tree: the output
    /// directory for folders, the pushed commit id for git.
    pub destination_ref: String,
}

// ---------------------------------------------------------------------------
// Destination trait
// ---------------------------------------------------------------------------

/// Capability set every destination implements.
pub trait Destination {
    /// Persist the staged tree, honoring `destination_excludes`. The
    /// write is the run's sole commit point; a failure leaves the
    /// destination untouched. The handed-over workdir is read-only to
    /// destinations: implementations stage any additions of their own in
    /// scratch space.
    fn write(&self, result: &TransformResult, console: &Console) -> Result<WriteResult>;

    /// The most recent origin revision this destination recorded under
    /// `label`, or `None` when no migration has happened yet.
    fn last_revision(&self, label: &str, console: &Console) -> Result<Option<Revision>>;
}

// ---------------------------------------------------------------------------
// AnyDestination
// ---------------------------------------------------------------------------

/// A concrete destination selected by configuration.
#[derive(Debug)]
pub enum AnyDestination {
    /// Commit and push to a git repository.
    Git(GitDestination),
    /// Sync a local directory.
    Folder(FolderDestination),
}

impl Destination for AnyDestination {
    fn write(&self, result: &TransformResult, console: &Console) -> Result<WriteResult> {
        match self {
            Self::Git(destination) => destination.write(result, console),
            Self::Folder(destination) => destination.write(result, console),
        }
    }

    fn last_revision(&self, label: &str, console: &Console) -> Result<Option<Revision>> {
        match self {
            Self::Git(destination) => destination.last_revision(label, console),
            Self::Folder(destination) => destination.last_revision(label, console),
        }
    }
}
