//! Revision references and change records.
//!
//! A [`Revision`] is an opaque, origin-specific identifier for one
//! revision: a full 40-hex commit id for git origins, a directory path
//! for folder origins. A [`Change`] is the immutable record of one origin
//! commit: author, date, message, extracted labels, and first-parent
//! links.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, FixedOffset};

use crate::authoring::Author;
use crate::labels::Label;

// ---------------------------------------------------------------------------
// Revision
// ---------------------------------------------------------------------------

/// An opaque revision identifier. Observable operations are rendering as a
/// stable string and equality.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Revision(String);

impl Revision {
    /// Wrap an origin-specific identifier. Origins validate the shape
    /// before constructing (e.g. 40-hex for git).
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a stable string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A shortened form for human-facing digests (12 characters for hex
    /// ids, the full string otherwise).
    #[must_use]
    pub fn short(&self) -> &str {
        if self.0.len() == 40 && self.0.bytes().all(|b| b.is_ascii_hexdigit()) {
            &self.0[..12]
        } else {
            &self.0
        }
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Change
// ---------------------------------------------------------------------------

/// One origin commit, as seen by the engine. Immutable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Change {
    revision: Revision,
    author: Author,
    message: String,
    date: DateTime<FixedOffset>,
    labels: BTreeMap<String, String>,
    parents: Vec<Revision>,
}

impl Change {
    /// Assemble a change record. `labels` are harvested from the message
    /// lines by the caller; duplicate names are last-wins.
    #[must_use]
    pub fn new(
        revision: Revision,
        author: Author,
        message: impl Into<String>,
        date: DateTime<FixedOffset>,
        parents: Vec<Revision>,
    ) -> Self {
        let message = message.into();
        let mut labels = BTreeMap::new();
        for line in message.lines() {
            if let Some(label) = Label::parse(line) {
                labels.insert(label.name, label.value);
            }
        }
        Self {
            revision,
            author,
            message,
            date,
            labels,
            parents,
        }
    }

    /// The revision this change describes.
    #[must_use]
    pub const fn revision(&self) -> &Revision {
        &self.revision
    }

    /// The origin author (before any authoring policy is applied).
    #[must_use]
    pub const fn author(&self) -> &Author {
        &self.author
    }

    /// The full commit message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The first line of the message, for one-line digests.
    #[must_use]
    pub fn first_line(&self) -> &str {
        self.message.lines().next().unwrap_or_default()
    }

    /// The commit date with its original timezone offset.
    #[must_use]
    pub const fn date(&self) -> DateTime<FixedOffset> {
        self.date
    }

    /// Labels extracted from the message, name → value, last occurrence
    /// winning on duplicates.
    #[must_use]
    pub const fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }

    /// Parent revisions, first parent first. Empty at the start of history.
    #[must_use]
    pub fn parents(&self) -> &[Revision] {
        &self.parents
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} by {}: {}", self.revision.short(), self.author, self.first_line())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
