//! Unified error type for migration runs.
//!
//! Defines [`MigrationError`], covering every way a run can stop: bad
//! configuration, failed VCS subprocesses, transformation preconditions,
//! reversibility mismatches, user cancellation, and empty change ranges.
//! Each variant maps to a distinct process exit code so callers can script
//! against the CLI.

use std::fmt;
use std::path::PathBuf;

/// Convenience alias used throughout the engine.
pub type Result<T> = std::result::Result<T, MigrationError>;

// ---------------------------------------------------------------------------
// MigrationError
// ---------------------------------------------------------------------------

/// Unified error type for workflow execution.
///
/// The engine never retries: errors from origins, destinations, and
/// transformations bubble up unchanged to the CLI, which prints them and
/// sets the exit code from [`MigrationError::exit_code`].
#[derive(Debug)]
pub enum MigrationError {
    /// Invalid or missing configuration (empty project name, unknown
    /// workflow, unreversible transformation in a reversibility check).
    Config {
        /// Human-readable description of the problem.
        message: String,
    },

    /// A VCS subprocess failed or its output could not be understood.
    Vcs {
        /// What was being attempted (e.g. `git fetch <url>`).
        message: String,
        /// Captured stderr, verbatim. Empty when the failure was not a
        /// subprocess (e.g. a log parse error).
        stderr: String,
    },

    /// A transformation's precondition failed. The workdir may be in an
    /// intermediate state and is discarded by the caller.
    Transform {
        /// Human-readable description of the failed precondition.
        message: String,
    },

    /// Applying the reverse of a transformation did not reproduce the
    /// original tree. The destination is never written.
    Reversibility {
        /// First path that differed, when known.
        path: Option<PathBuf>,
    },

    /// The user declined the interactive confirmation prompt.
    Canceled,

    /// A squash run found no changes between the last migrated revision and
    /// the requested one.
    NoNewChanges {
        /// The workflow that had nothing to do.
        workflow: String,
    },

    /// An I/O error outside any subprocess.
    Io(std::io::Error),
}

impl MigrationError {
    /// Build a configuration error from anything displayable.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Build a VCS error with no captured stderr.
    pub fn vcs(message: impl Into<String>) -> Self {
        Self::Vcs {
            message: message.into(),
            stderr: String::new(),
        }
    }

    /// Build a transformation error.
    pub fn transform(message: impl Into<String>) -> Self {
        Self::Transform {
            message: message.into(),
        }
    }

    /// The process exit code for this error.
    ///
    /// `0` is success; `1` configuration, `2` VCS/external (including
    /// transformation and reversibility failures), `3` user cancellation,
    /// `4` nothing to migrate.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } => 1,
            Self::Vcs { .. } | Self::Transform { .. } | Self::Reversibility { .. } | Self::Io(_) => {
                2
            }
            Self::Canceled => 3,
            Self::NoNewChanges { .. } => 4,
        }
    }
}

impl fmt::Display for MigrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { message } => write!(f, "configuration error: {message}"),
            Self::Vcs { message, stderr } => {
                write!(f, "{message}")?;
                if !stderr.is_empty() {
                    write!(f, "\n  stderr: {stderr}")?;
                }
                Ok(())
            }
            Self::Transform { message } => write!(f, "transformation failed: {message}"),
            Self::Reversibility { path } => {
                write!(f, "reversed transformation did not restore the original tree")?;
                if let Some(path) = path {
                    write!(f, " (first difference at '{}')", path.display())?;
                }
                Ok(())
            }
            Self::Canceled => write!(f, "migration canceled by the user"),
            Self::NoNewChanges { workflow } => {
                write!(f, "no new changes to migrate for workflow '{workflow}'")
            }
            Self::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for MigrationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for MigrationError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_config() {
        let err = MigrationError::config("project name is empty");
        let msg = format!("{err}");
        assert!(msg.contains("configuration error"));
        assert!(msg.contains("project name is empty"));
    }

    #[test]
    fn display_vcs_with_stderr() {
        let err = MigrationError::Vcs {
            message: "`git fetch https://example.com/repo` failed".to_owned(),
            stderr: "fatal: repository not found".to_owned(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("git fetch"));
        assert!(msg.contains("fatal: repository not found"));
    }

    #[test]
    fn display_vcs_without_stderr() {
        let err = MigrationError::vcs("could not parse log output");
        let msg = format!("{err}");
        assert!(msg.contains("could not parse log output"));
        assert!(!msg.contains("stderr:"));
    }

    #[test]
    fn display_transform() {
        let err = MigrationError::transform("cannot move 'a' onto existing file 'b'");
        assert!(format!("{err}").contains("cannot move 'a' onto existing file 'b'"));
    }

    #[test]
    fn display_reversibility_with_path() {
        let err = MigrationError::Reversibility {
            path: Some(PathBuf::from("src/lib.rs")),
        };
        let msg = format!("{err}");
        assert!(msg.contains("did not restore"));
        assert!(msg.contains("src/lib.rs"));
    }

    #[test]
    fn display_no_new_changes() {
        let err = MigrationError::NoNewChanges {
            workflow: "default".to_owned(),
        };
        assert!(format!("{err}").contains("workflow 'default'"));
    }

    #[test]
    fn exit_codes_are_distinct_per_kind() {
        assert_eq!(MigrationError::config("x").exit_code(), 1);
        assert_eq!(MigrationError::vcs("x").exit_code(), 2);
        assert_eq!(MigrationError::transform("x").exit_code(), 2);
        assert_eq!(MigrationError::Reversibility { path: None }.exit_code(), 2);
        assert_eq!(MigrationError::Canceled.exit_code(), 3);
        assert_eq!(
            MigrationError::NoNewChanges {
                workflow: "w".to_owned()
            }
            .exit_code(),
            4
        );
    }

    #[test]
    fn io_error_has_source() {
        let err = MigrationError::Io(std::io::Error::other("disk full"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn non_io_errors_have_no_source() {
        assert!(std::error::Error::source(&MigrationError::Canceled).is_none());
    }
}
