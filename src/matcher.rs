//! Include/exclude glob matching over repository-relative paths.
//!
//! A [`PathMatcher`] is compiled from two ordered lists of glob patterns.
//! A path matches when it matches at least one include pattern and no
//! exclude pattern. Patterns are interpreted against POSIX-style relative
//! paths: `**` spans path segments, `*` and `?` stop at `/`, and `\`
//! escapes the next character. Matching is case-sensitive and free of
//! side effects.

use std::fmt;
use std::path::Path;

use regex::Regex;

use crate::error::{MigrationError, Result};

// ---------------------------------------------------------------------------
// PathMatcher
// ---------------------------------------------------------------------------

/// A compiled include/exclude glob set.
///
/// Two matchers are equal when their `(include, exclude)` pattern lists
/// compare element-wise equal; the compiled form never participates in
/// equality.
#[derive(Clone, Debug)]
pub struct PathMatcher {
    includes: Vec<String>,
    excludes: Vec<String>,
    compiled_includes: Vec<Regex>,
    compiled_excludes: Vec<Regex>,
}

impl PathMatcher {
    /// Compile a matcher from include and exclude pattern lists.
    ///
    /// Every pattern must be relative (no leading `/`), must not contain
    /// a `..` segment, and must be non-empty after trimming.
    pub fn new<S: AsRef<str>>(includes: &[S], excludes: &[S]) -> Result<Self> {
        let includes: Vec<String> = includes.iter().map(|p| p.as_ref().to_owned()).collect();
        let excludes: Vec<String> = excludes.iter().map(|p| p.as_ref().to_owned()).collect();

        let compiled_includes = compile_all(&includes)?;
        let compiled_excludes = compile_all(&excludes)?;

        Ok(Self {
            includes,
            excludes,
            compiled_includes,
            compiled_excludes,
        })
    }

    /// A matcher that matches nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            includes: Vec::new(),
            excludes: Vec::new(),
            compiled_includes: Vec::new(),
            compiled_excludes: Vec::new(),
        }
    }

    /// Whether this matcher has no include patterns (and so matches nothing).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.includes.is_empty()
    }

    /// Whether `path` (relative, any host separator) matches an include and
    /// no exclude. An empty include list matches nothing; an empty exclude
    /// list excludes nothing.
    #[must_use]
    pub fn matches(&self, path: &Path) -> bool {
        let normalized = normalize(path);
        self.compiled_includes.iter().any(|re| re.is_match(&normalized))
            && !self.compiled_excludes.iter().any(|re| re.is_match(&normalized))
    }

}

impl PartialEq for PathMatcher {
    fn eq(&self, other: &Self) -> bool {
        self.includes == other.includes && self.excludes == other.excludes
    }
}

impl Eq for PathMatcher {}

impl fmt::Display for PathMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "glob(include = [{}], exclude = [{}])",
            quote_join(&self.includes),
            quote_join(&self.excludes)
        )
    }
}

fn quote_join(patterns: &[String]) -> String {
    patterns
        .iter()
        .map(|p| format!("\"{p}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render a path with `/` separators regardless of host OS.
fn normalize(path: &Path) -> String {
    path.iter()
        .map(|c| c.to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

// ---------------------------------------------------------------------------
// Glob compilation
// ---------------------------------------------------------------------------

fn compile_all(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns.iter().map(|p| compile(p)).collect()
}

/// Validate one glob pattern and compile it to an anchored regex.
///
/// Translation: `**/` (at the start or after `/`) becomes zero-or-more
/// whole segments, a bare `**` spans everything, `*` and `?` stay within
/// one segment, `\c` is the literal `c`, and all other characters are
/// literal.
fn compile(pattern: &str) -> Result<Regex> {
    if pattern.trim().is_empty() {
        return Err(MigrationError::config("glob pattern is empty"));
    }
    if pattern.starts_with('/') {
        return Err(MigrationError::config(format!(
            "glob pattern '{pattern}' must be relative"
        )));
    }
    if pattern.split('/').any(|segment| segment == "..") {
        return Err(MigrationError::config(format!(
            "glob pattern '{pattern}' must not contain '..' segments"
        )));
    }

    let mut regex = String::with_capacity(pattern.len() + 8);
    regex.push('^');

    let mut chars = pattern.chars().peekable();
    let mut at_segment_start = true;
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                if at_segment_start && chars.peek() == Some(&'/') {
                    // `**/` consumes zero or more whole segments.
                    chars.next();
                    regex.push_str("(?:[^/]+/)*");
                } else {
                    regex.push_str(".*");
                }
                at_segment_start = false;
            }
            '*' => {
                regex.push_str("[^/]*");
                at_segment_start = false;
            }
            '?' => {
                regex.push_str("[^/]");
                at_segment_start = false;
            }
            '\\' => {
                let Some(escaped) = chars.next() else {
                    return Err(MigrationError::config(format!(
                        "glob pattern '{pattern}' ends with a dangling escape"
                    )));
                };
                regex.push_str(&regex::escape(&escaped.to_string()));
                at_segment_start = false;
            }
            '/' => {
                regex.push('/');
                at_segment_start = true;
            }
            other => {
                regex.push_str(&regex::escape(&other.to_string()));
                at_segment_start = false;
            }
        }
    }
    regex.push('$');

    Regex::new(&regex).map_err(|e| {
        MigrationError::config(format!("glob pattern '{pattern}' did not compile: {e}"))
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
