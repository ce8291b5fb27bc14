//! Shared fixtures for copybara integration tests.
//!
//! All tests run against throwaway git repositories in temp directories.
//! Nothing touches the user's real cache under `~/.copybara`.

#![allow(dead_code)]

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

use copybara::config::GeneralOptions;
use copybara::console::Console;

/// Run git in `dir`, asserting success, and return trimmed stdout.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let out = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to run git");
    assert!(
        out.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8_lossy(&out.stdout).trim().to_owned()
}

/// Create a fresh non-bare repo with `main` checked out and a committer
/// identity configured.
pub fn init_repo() -> TempDir {
    let dir = TempDir::new().expect("failed to create temp dir");
    git(dir.path(), &["init", "-q", "-b", "main"]);
    git(dir.path(), &["config", "user.name", "Test Fixture"]);
    git(dir.path(), &["config", "user.email", "fixture@example.com"]);
    dir
}

/// Create a bare repo to act as a destination remote.
pub fn init_bare_repo() -> TempDir {
    let dir = TempDir::new().expect("failed to create temp dir");
    git(dir.path(), &["init", "-q", "--bare", "-b", "main"]);
    dir
}

/// Write `content` to `relative` and commit it. Returns the commit id.
pub fn commit_file(repo: &Path, relative: &str, content: &str, message: &str) -> String {
    commit_file_by(
        repo,
        relative,
        content,
        message,
        "Test Fixture <fixture@example.com>",
    )
}

/// Like [`commit_file`], with an explicit author.
pub fn commit_file_by(
    repo: &Path,
    relative: &str,
    content: &str,
    message: &str,
    author: &str,
) -> String {
    let path = repo.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
    git(repo, &["add", "-A"]);
    git(repo, &["commit", "-q", "--author", author, "-m", message]);
    git(repo, &["rev-parse", "HEAD"])
}

/// Options pointing the bare-repo cache at a per-test temp directory.
pub fn test_options(storage: &TempDir) -> GeneralOptions {
    GeneralOptions {
        git_repo_storage: storage.path().to_path_buf(),
        git_origin_url: None,
        last_revision: None,
        work_dir: None,
        verbose: false,
    }
}

/// A quiet console for tests.
pub fn console() -> Console {
    Console::new(false)
}
