//! User-facing console output and prompting.
//!
//! All human-directed lines go through [`Console`] rather than the tracing
//! logger, so scripted callers can separate diagnostics (`RUST_LOG`) from
//! the progress stream (stderr).

use std::io::{BufRead, Write};

use crate::error::Result;

/// Writes progress and warnings to stderr and reads confirmations from
/// stdin.
#[derive(Clone, Copy, Debug)]
pub struct Console {
    verbose: bool,
}

impl Console {
    /// Create a console. `verbose` enables extra progress detail.
    #[must_use]
    pub const fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Whether verbose output was requested.
    #[must_use]
    pub const fn verbose(&self) -> bool {
        self.verbose
    }

    /// A progress line, e.g. `Git Origin: Fetching from <url>`.
    pub fn progress(&self, message: &str) {
        eprintln!("Task: {message}");
    }

    /// A warning that does not stop the run.
    pub fn warn(&self, message: &str) {
        eprintln!("WARNING: {message}");
    }

    /// A fatal error, printed before the process exits non-zero.
    pub fn error(&self, message: &str) {
        eprintln!("ERROR: {message}");
    }

    /// Ask a yes/no question on stderr and read the answer from stdin.
    /// Returns `false` on EOF or anything that is not `y`/`yes`.
    pub fn ask_confirmation(&self, question: &str) -> Result<bool> {
        eprint!("{question} [y/N] ");
        std::io::stderr().flush()?;

        let mut answer = String::new();
        let read = std::io::stdin().lock().read_line(&mut answer)?;
        if read == 0 {
            return Ok(false);
        }
        let answer = answer.trim().to_ascii_lowercase();
        Ok(answer == "y" || answer == "yes")
    }
}
