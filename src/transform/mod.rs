//! Reversible working-tree transformations.
//!
//! A [`Transform`] mutates the workdir in place. The two built-ins are
//! [`Move`] (rename files or whole subtrees) and `Sequence` (ordered
//! composition). Every transform can produce its inverse via
//! [`Transform::reverse`]; the engine's reversibility check applies the
//! inverse to a scratch tree and compares byte-for-byte.

pub mod move_files;

use std::path::Path;

use crate::console::Console;
use crate::error::Result;

pub use move_files::Move;

// ---------------------------------------------------------------------------
// Transform
// ---------------------------------------------------------------------------

/// A tree mutation, either a single move or an ordered sequence.
///
/// An enum rather than trait objects: dispatch stays monomorphic and
/// `reverse` can return the concrete inverse by value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transform {
    /// Rename a file or move a subtree.
    Move(Move),
    /// Ordered composition; applies left to right, stops at the first
    /// failure.
    Sequence(Vec<Transform>),
}

impl Transform {
    /// A sequence over `transforms`, applied in order.
    #[must_use]
    pub const fn sequence(transforms: Vec<Transform>) -> Self {
        Self::Sequence(transforms)
    }

    /// Apply this transformation to `workdir` in place.
    pub fn transform(&self, workdir: &Path, console: &Console) -> Result<()> {
        match self {
            Self::Move(mv) => mv.apply(workdir, console),
            Self::Sequence(transforms) => {
                for transform in transforms {
                    transform.transform(workdir, console)?;
                }
                Ok(())
            }
        }
    }

    /// The inverse transformation.
    ///
    /// Fails with a configuration error for transformations that cannot be
    /// reversed; the engine's reversibility check surfaces that failure
    /// before anything is written.
    pub fn reverse(&self) -> Result<Transform> {
        match self {
            Self::Move(mv) => Ok(Self::Move(mv.reverse())),
            Self::Sequence(transforms) => {
                let mut reversed = Vec::with_capacity(transforms.len());
                for transform in transforms.iter().rev() {
                    reversed.push(transform.reverse()?);
                }
                Ok(Self::Sequence(reversed))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
