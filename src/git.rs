//! Subprocess git plumbing shared by git origins and destinations.
//!
//! A [`GitRepository`] wraps one bare repository directory and runs git as
//! a child process, capturing stdout/stderr. Non-zero exits surface as
//! [`MigrationError::Vcs`] carrying stderr verbatim.
//!
//! Bare caches live under the repo-storage root, one per origin or
//! destination URL, named by percent-escaping the URL. The escape set is
//! part of the on-disk format: alphanumerics plus `-` and `_` stay as-is,
//! space becomes `+`, everything else becomes `%XX`.

use std::ffi::OsStr;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::authoring::Author;
use crate::error::{MigrationError, Result};

/// Whether `reference` is a complete lowercase 40-hex SHA-1.
#[must_use]
pub fn is_complete_sha1(reference: &str) -> bool {
    reference.len() == 40
        && reference
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Escape a repository URL into a single path component for the bare
/// cache directory name.
#[must_use]
pub fn escape_repo_url(url: &str) -> String {
    let mut escaped = String::with_capacity(url.len());
    for byte in url.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' => {
                escaped.push(byte as char);
            }
            b' ' => escaped.push('+'),
            other => {
                let _ = write!(escaped, "%{other:02X}");
            }
        }
    }
    escaped
}

// ---------------------------------------------------------------------------
// GitRepository
// ---------------------------------------------------------------------------

/// One bare git repository driven through subprocesses.
#[derive(Debug)]
pub struct GitRepository {
    git_dir: PathBuf,
}

impl GitRepository {
    /// A repository handle for the bare cache of `url` under `storage_root`.
    #[must_use]
    pub fn bare_for_url(storage_root: &Path, url: &str) -> Self {
        Self {
            git_dir: storage_root.join(escape_repo_url(url)),
        }
    }

    /// The bare repository directory.
    #[must_use]
    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// Create the directory and initialize repository metadata if absent.
    /// Safe to call on every run.
    pub fn init(&self) -> Result<()> {
        std::fs::create_dir_all(&self.git_dir)?;
        if self.git_dir.join("HEAD").exists() {
            return Ok(());
        }
        self.run(&["init", "--bare"], None, &[])?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Plumbing wrappers
    // -----------------------------------------------------------------------

    /// Fetch `refspec` (or the default refspec when `None`) from `url`.
    pub fn fetch(&self, url: &str, refspec: Option<&str>) -> Result<()> {
        let mut args = vec!["fetch", "-f", url];
        if let Some(refspec) = refspec {
            args.push(refspec);
        }
        self.run(&args, None, &[])?;
        Ok(())
    }

    /// Resolve a reference to a full commit id.
    pub fn rev_parse(&self, reference: &str) -> Result<String> {
        let spec = format!("{reference}^{{commit}}");
        let stdout = self.run(&["rev-parse", "--verify", &spec], None, &[])?;
        Ok(String::from_utf8_lossy(&stdout).trim().to_owned())
    }

    /// Populate `worktree` with the exact tree at `reference`, overwriting
    /// any previous contents.
    pub fn checkout(&self, reference: &str, worktree: &Path) -> Result<()> {
        self.run(&["checkout", "-q", "-f", reference], Some(worktree), &[])?;
        Ok(())
    }

    /// Raw first-parent log output for a revision range.
    pub fn log(&self, range: &str, limit: Option<usize>) -> Result<String> {
        let limit_arg = limit.map(|n| format!("-{n}"));
        let mut args = vec!["log", "--no-color", "--date=iso-strict"];
        if let Some(limit_arg) = &limit_arg {
            args.push(limit_arg);
        }
        args.extend(["--parents", "--first-parent", range]);
        let stdout = self.run(&args, None, &[])?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }

    /// All file paths in the tree at `reference`.
    pub fn ls_files(&self, reference: &str) -> Result<Vec<PathBuf>> {
        let stdout = self.run(&["ls-tree", "-r", "--name-only", reference], None, &[])?;
        Ok(String::from_utf8_lossy(&stdout)
            .lines()
            .map(PathBuf::from)
            .collect())
    }

    /// The content of one file in the tree at `reference`.
    pub fn read_file(&self, reference: &str, path: &Path) -> Result<Vec<u8>> {
        let spec = format!("{reference}:{}", path_as_git(path));
        self.run(&["show", &spec], None, &[])
    }

    /// Stage everything under `worktree` into a throwaway index and write
    /// the resulting tree object. Returns the tree id.
    pub fn write_tree(&self, worktree: &Path) -> Result<String> {
        let index = tempfile::Builder::new()
            .prefix("index-")
            .tempfile_in(&self.git_dir)
            .map_err(MigrationError::Io)?;
        let index_path = index.path().to_path_buf();
        // git refuses an existing zero-length index file
        std::fs::remove_file(&index_path)?;
        let env: &[(&str, &OsStr)] = &[("GIT_INDEX_FILE", index_path.as_os_str())];

        self.run(&["add", "-A", "."], Some(worktree), env)?;
        let stdout = self.run(&["write-tree"], None, env)?;
        Ok(String::from_utf8_lossy(&stdout).trim().to_owned())
    }

    /// Create a commit object for `tree`. The author date is the origin
    /// change's date; the committer date is the current time.
    pub fn commit_tree(
        &self,
        tree: &str,
        parent: Option<&str>,
        message: &str,
        author: &Author,
        author_date: &str,
    ) -> Result<String> {
        let mut args = vec!["commit-tree", tree];
        if let Some(parent) = parent {
            args.extend(["-p", parent]);
        }
        args.extend(["-m", message]);

        let author_name: &OsStr = author.name().as_ref();
        let author_email: &OsStr = author.email().as_ref();
        let env: &[(&str, &OsStr)] = &[
            ("GIT_AUTHOR_NAME", author_name),
            ("GIT_AUTHOR_EMAIL", author_email),
            ("GIT_AUTHOR_DATE", author_date.as_ref()),
            ("GIT_COMMITTER_NAME", author_name),
            ("GIT_COMMITTER_EMAIL", author_email),
        ];
        let stdout = self.run(&args, None, env)?;
        Ok(String::from_utf8_lossy(&stdout).trim().to_owned())
    }

    /// Push `commit` to `remote_ref` on `url`. Failures (including
    /// non-fast-forward rejections) surface with git's stderr.
    pub fn push(&self, url: &str, commit: &str, remote_ref: &str) -> Result<()> {
        let refspec = format!("{commit}:{remote_ref}");
        self.run(&["push", url, &refspec], None, &[])?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Process execution
    // -----------------------------------------------------------------------

    /// Run git against this repository and return raw stdout. A non-zero
    /// exit becomes a VCS error carrying stderr.
    fn run(
        &self,
        args: &[&str],
        worktree: Option<&Path>,
        env: &[(&str, &OsStr)],
    ) -> Result<Vec<u8>> {
        let mut command = Command::new("git");
        command.arg("--git-dir").arg(&self.git_dir);
        if let Some(worktree) = worktree {
            command.arg("--work-tree").arg(worktree);
            command.current_dir(worktree);
        }
        command.args(args);
        command.env("GIT_TERMINAL_PROMPT", "0");
        for (key, value) in env {
            command.env(key, value);
        }

        debug!(git_dir = %self.git_dir.display(), "git {}", args.join(" "));
        let output = command.output().map_err(MigrationError::Io)?;

        if output.status.success() {
            Ok(output.stdout)
        } else {
            Err(MigrationError::Vcs {
                message: format!(
                    "`git {}` failed (exit code {})",
                    args.join(" "),
                    output.status.code().unwrap_or(-1)
                ),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            })
        }
    }
}

/// Render a relative path with `/` separators for `<rev>:<path>` specs.
fn path_as_git(path: &Path) -> String {
    path.iter()
        .map(|c| c.to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
