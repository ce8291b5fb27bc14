//! Git repository origin.
//!
//! Maintains a bare cache per origin URL and reads history with
//! `git log --no-color --date=iso-strict --parents --first-parent`,
//! parsed into [`Change`] records with labels harvested from the message
//! lines.

use std::iter::Peekable;
use std::path::{Path, PathBuf};

use chrono::DateTime;

use super::{Origin, VisitResult};
use crate::authoring::Author;
use crate::console::Console;
use crate::error::{MigrationError, Result};
use crate::files;
use crate::git::{GitRepository, is_complete_sha1};
use crate::revision::{Change, Revision};

/// Label stamped into destination commits with the migrated revision id.
pub const GIT_ORIGIN_REV_ID: &str = "GitOrigin-RevId";

/// Message lines in `git log` output carry this prefix.
const LOG_MESSAGE_PREFIX: &str = "    ";

// ---------------------------------------------------------------------------
// GitOrigin
// ---------------------------------------------------------------------------

/// An origin reading from a git repository, local or remote.
#[derive(Debug)]
pub struct GitOrigin {
    repo: GitRepository,
    repo_url: String,
    /// Default reference to track when none is given on the command line.
    config_ref: Option<String>,
}

impl GitOrigin {
    /// Create an origin for `repo_url`, caching under `storage_root`.
    #[must_use]
    pub fn new(storage_root: &Path, repo_url: String, config_ref: Option<String>) -> Self {
        Self {
            repo: GitRepository::bare_for_url(storage_root, &repo_url),
            repo_url,
            config_ref,
        }
    }

    /// The bare cache directory backing this origin.
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.repo.git_dir().to_path_buf()
    }

    fn query(&self, range: &str, limit: Option<usize>) -> Result<Vec<Change>> {
        let log = self.repo.log(range, limit)?;
        parse_log(&log)
    }
}

impl Origin for GitOrigin {
    fn resolve(&self, reference: Option<&str>, console: &Console) -> Result<Revision> {
        console.progress("Git Origin: Initializing local repo");
        self.repo.init()?;

        let reference = match reference.filter(|r| !r.is_empty()) {
            Some(reference) => reference,
            None => self.config_ref.as_deref().ok_or_else(|| {
                MigrationError::config(format!(
                    "no reference was passed for {} and no default reference was configured",
                    self.repo_url
                ))
            })?,
        };

        console.progress(&format!("Git Origin: Fetching from {}", self.repo_url));
        if is_complete_sha1(reference) {
            // Hosting providers commonly refuse fetch-by-sha, so fetch the
            // default refspec and resolve locally.
            self.repo.fetch(&self.repo_url, None)?;
            let sha = self.repo.rev_parse(reference)?;
            Ok(Revision::new(sha))
        } else {
            self.repo.fetch(&self.repo_url, Some(reference))?;
            let sha = self.repo.rev_parse("FETCH_HEAD")?;
            Ok(Revision::new(sha))
        }
    }

    fn checkout(&self, revision: &Revision, workdir: &Path) -> Result<()> {
        if workdir.exists() {
            files::clear_dir(workdir)?;
        } else {
            std::fs::create_dir_all(workdir)?;
        }
        self.repo.checkout(revision.as_str(), workdir)
    }

    fn changes(&self, from: Option<&Revision>, to: &Revision) -> Result<Vec<Change>> {
        let range = match from {
            Some(from) => format!("{from}..{to}"),
            None => to.as_str().to_owned(),
        };
        self.query(&range, None)
    }

    fn change(&self, revision: &Revision) -> Result<Change> {
        let changes = self.query(revision.as_str(), Some(1))?;
        changes.into_iter().next().ok_or_else(|| {
            MigrationError::vcs(format!("cannot find reference '{revision}'"))
        })
    }

    fn visit_changes(
        &self,
        start: &Revision,
        visitor: &mut dyn FnMut(&Change) -> VisitResult,
    ) -> Result<()> {
        let mut current = self.change(start)?;
        loop {
            if visitor(&current) == VisitResult::Terminate {
                return Ok(());
            }
            let Some(parent) = current.parents().first().cloned() else {
                return Ok(());
            };
            current = self.change(&parent)?;
        }
    }

    fn label_name(&self) -> &str {
        GIT_ORIGIN_REV_ID
    }
}

// ---------------------------------------------------------------------------
// Log parsing
// ---------------------------------------------------------------------------

/// Parse canonical `git log --parents --first-parent --date=iso-strict`
/// output. The returned list is oldest first.
pub fn parse_log(log: &str) -> Result<Vec<Change>> {
    let mut changes = Vec::new();
    let mut lines = log.lines().peekable();

    while let Some(line) = lines.next() {
        if line.is_empty() {
            continue;
        }
        let ids = line.strip_prefix("commit ").ok_or_else(|| {
            MigrationError::vcs(format!("expected a commit line in git log output, got '{line}'"))
        })?;
        let mut ids = ids.split_whitespace();
        let revision = Revision::new(ids.next().unwrap_or_default());
        let parents: Vec<Revision> = ids.map(Revision::new).collect();

        let (author, date) = parse_headers(&mut lines, &revision)?;
        let message = parse_message(&mut lines);

        changes.push(Change::new(revision, author, message, date, parents));
    }

    // git log is newest first; callers get oldest first.
    changes.reverse();
    Ok(changes)
}

fn parse_headers<'a, I>(
    lines: &mut I,
    revision: &Revision,
) -> Result<(Author, DateTime<chrono::FixedOffset>)>
where
    I: Iterator<Item = &'a str>,
{
    let mut author = None;
    let mut date = None;
    for line in lines.by_ref() {
        if line.is_empty() {
            break;
        }
        if let Some(raw) = line.strip_prefix("Author:") {
            author = Some(Author::parse(raw.trim()).map_err(|e| {
                MigrationError::vcs(format!("could not parse author for commit {revision}: {e}"))
            })?);
        } else if let Some(raw) = line.strip_prefix("Date:") {
            date = Some(DateTime::parse_from_rfc3339(raw.trim()).map_err(|e| {
                MigrationError::vcs(format!("could not parse date for commit {revision}: {e}"))
            })?);
        }
    }
    // A commit lacking both headers is malformed log output; one missing
    // side gets a placeholder, the way a commit object can omit it.
    if author.is_none() && date.is_none() {
        return Err(MigrationError::vcs(format!(
            "could not find author and date for commit {revision} in log output"
        )));
    }
    Ok((
        author.unwrap_or_else(Author::unknown),
        date.unwrap_or_else(missing_header_date),
    ))
}

/// Placeholder date for commits whose `Date:` header is absent.
fn missing_header_date() -> DateTime<chrono::FixedOffset> {
    DateTime::<chrono::Utc>::UNIX_EPOCH.fixed_offset()
}

fn parse_message<'a, I>(lines: &mut Peekable<I>) -> String
where
    I: Iterator<Item = &'a str>,
{
    let mut message = String::new();
    while let Some(line) = lines.peek() {
        let Some(stripped) = line.strip_prefix(LOG_MESSAGE_PREFIX) else {
            break;
        };
        message.push_str(stripped);
        message.push('\n');
        lines.next();
    }
    message
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
