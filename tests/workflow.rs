//! End-to-end workflow runs: squash and iterative modes, label-based
//! range discovery, authoring policies, origin exclusions, and the
//! reversibility check.

mod common;

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use copybara::config::MigrationConfig;
use copybara::error::MigrationError;
use copybara::files;

fn parse(config: &str, options: &copybara::config::GeneralOptions) -> MigrationConfig {
    MigrationConfig::parse(config, options, &common::console()).unwrap()
}

#[test]
fn squash_from_git_to_folder_applies_transformations() {
    let origin = common::init_repo();
    common::commit_file(origin.path(), "src/app.txt", "v1", "first");
    common::commit_file(origin.path(), "src/app.txt", "v2", "second");
    common::commit_file(origin.path(), "BUILD", "build file", "add build");

    let storage = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    let config_text = format!(
        r#"
        project = "endtoend"

        [workflows.default]

        [workflows.default.origin]
        type = "git"
        url = "{origin}"
        ref = "main"

        [workflows.default.destination]
        type = "folder"
        path = "{dest}"

        [workflows.default.exclude-in-origin]
        include = ["**/BUILD", "BUILD"]

        [[workflows.default.transformations]]
        type = "move"
        before = "src"
        after = "lib"
        "#,
        origin = origin.path().display(),
        dest = dest.path().display(),
    );

    let options = common::test_options(&storage);
    let config = parse(&config_text, &options);
    config
        .workflow("default")
        .unwrap()
        .run(None, &common::console())
        .unwrap();

    assert_eq!(
        files::list_files(dest.path()).unwrap(),
        vec![PathBuf::from("lib/app.txt")]
    );
    assert_eq!(
        fs::read_to_string(dest.path().join("lib/app.txt")).unwrap(),
        "v2"
    );
}

#[test]
fn squash_to_git_stamps_and_rediscovers_the_migrated_revision() {
    let origin = common::init_repo();
    common::commit_file(origin.path(), "a.txt", "a", "first change\n\nBUG=1");
    let tip = common::commit_file(origin.path(), "b.txt", "b", "second change\n\nBUG=2");

    let dest = common::init_bare_repo();
    let storage = TempDir::new().unwrap();
    let config_text = format!(
        r#"
        project = "endtoend"

        [workflows.default]

        [workflows.default.origin]
        type = "git"
        url = "{origin}"
        ref = "main"

        [workflows.default.destination]
        type = "git"
        url = "{dest}"
        fetch = "main"
        push = "main"
        "#,
        origin = origin.path().display(),
        dest = dest.path().display(),
    );

    let options = common::test_options(&storage);
    let config = parse(&config_text, &options);
    let workflow = config.workflow("default").unwrap();

    workflow.run(None, &common::console()).unwrap();

    let message = common::git(dest.path(), &["log", "-1", "--format=%B", "main"]);
    assert!(message.starts_with("Imports 'endtoend'."));
    assert!(message.contains("first change"));
    assert!(message.contains("second change"));
    assert!(message.contains("BUG=2"));
    assert!(message.contains(&format!("GitOrigin-RevId={tip}")));

    // Nothing new: the stamp is rediscovered and the range is empty.
    let err = workflow.run(None, &common::console()).unwrap_err();
    assert!(matches!(err, MigrationError::NoNewChanges { .. }));

    // A new origin change migrates incrementally on top.
    common::commit_file(origin.path(), "c.txt", "c", "third change");
    workflow.run(None, &common::console()).unwrap();

    let message = common::git(dest.path(), &["log", "-1", "--format=%B", "main"]);
    assert!(message.contains("third change"));
    assert!(!message.contains("first change"), "only the new range is digested");
    assert_eq!(
        common::git(dest.path(), &["rev-list", "--count", "main"]),
        "2"
    );
}

#[test]
fn iterative_writes_one_destination_commit_per_change() {
    let origin = common::init_repo();
    let first = common::commit_file(origin.path(), "a.txt", "1", "one");
    common::commit_file(origin.path(), "a.txt", "2", "two");
    let tip = common::commit_file(origin.path(), "a.txt", "3", "three");

    let dest = common::init_bare_repo();
    let storage = TempDir::new().unwrap();
    let config_text = format!(
        r#"
        project = "endtoend"

        [workflows.step]
        mode = "iterative"

        [workflows.step.origin]
        type = "git"
        url = "{origin}"
        ref = "main"

        [workflows.step.destination]
        type = "git"
        url = "{dest}"
        fetch = "main"
        push = "main"
        "#,
        origin = origin.path().display(),
        dest = dest.path().display(),
    );

    let options = common::test_options(&storage);
    let config = parse(&config_text, &options);
    let workflow = config.workflow("step").unwrap();

    workflow.run(None, &common::console()).unwrap();

    let subjects = common::git(dest.path(), &["log", "--format=%s", "main"]);
    assert_eq!(
        subjects.lines().collect::<Vec<_>>(),
        vec!["three", "two", "one"],
        "one commit per change, order preserved"
    );

    let oldest = common::git(
        dest.path(),
        &["log", "--format=%B", "--reverse", "main"],
    );
    assert!(oldest.contains(&format!("GitOrigin-RevId={first}")));
    assert!(oldest.contains(&format!("GitOrigin-RevId={tip}")));

    // Re-running finds nothing new and is a clean no-op in iterative mode.
    workflow.run(None, &common::console()).unwrap();
    assert_eq!(
        common::git(dest.path(), &["rev-list", "--count", "main"]),
        "3"
    );
}

#[test]
fn whitelist_authoring_maps_non_listed_authors_to_the_default() {
    let origin = common::init_repo();
    common::commit_file_by(
        origin.path(),
        "a.txt",
        "a",
        "by alice",
        "Alice <alice@example.com>",
    );
    common::commit_file_by(
        origin.path(),
        "b.txt",
        "b",
        "by eve",
        "Eve <eve@example.com>",
    );

    let dest = common::init_bare_repo();
    let storage = TempDir::new().unwrap();
    let config_text = format!(
        r#"
        project = "endtoend"

        [workflows.authored]
        mode = "iterative"

        [workflows.authored.origin]
        type = "git"
        url = "{origin}"
        ref = "main"

        [workflows.authored.destination]
        type = "git"
        url = "{dest}"
        fetch = "main"
        push = "main"

        [workflows.authored.authoring]
        mode = "whitelist"
        default-author = "Project Bot <bot@example.com>"
        whitelist = ["alice@example.com"]
        "#,
        origin = origin.path().display(),
        dest = dest.path().display(),
    );

    let options = common::test_options(&storage);
    let config = parse(&config_text, &options);
    config
        .workflow("authored")
        .unwrap()
        .run(None, &common::console())
        .unwrap();

    let authors = common::git(
        dest.path(),
        &["log", "--format=%an <%ae>", "--reverse", "main"],
    );
    assert_eq!(
        authors.lines().collect::<Vec<_>>(),
        vec!["Alice <alice@example.com>", "Project Bot <bot@example.com>"]
    );
}

#[test]
fn last_rev_override_limits_the_range() {
    let origin = common::init_repo();
    common::commit_file(origin.path(), "a.txt", "a", "first");
    let tip = common::commit_file(origin.path(), "b.txt", "b", "second");

    let dest = TempDir::new().unwrap();
    let storage = TempDir::new().unwrap();
    let config_text = format!(
        r#"
        project = "endtoend"

        [workflows.default]

        [workflows.default.origin]
        type = "git"
        url = "{origin}"
        ref = "main"

        [workflows.default.destination]
        type = "folder"
        path = "{dest}"
        "#,
        origin = origin.path().display(),
        dest = dest.path().display(),
    );

    // Overriding with the tip itself means there is nothing to migrate.
    let mut options = common::test_options(&storage);
    options.last_revision = Some(tip);
    let config = parse(&config_text, &options);
    let err = config
        .workflow("default")
        .unwrap()
        .run(None, &common::console())
        .unwrap_err();
    assert!(matches!(err, MigrationError::NoNewChanges { .. }));
    assert!(files::list_files(dest.path()).unwrap().is_empty());
}

#[test]
fn failed_reversibility_check_blocks_the_write() {
    let origin = common::init_repo();
    fs::create_dir_all(origin.path().join("docs")).unwrap();
    common::commit_file(origin.path(), "docs/guide.md", "g", "docs");
    common::commit_file(origin.path(), "notes.txt", "n", "notes");

    let dest = TempDir::new().unwrap();
    let storage = TempDir::new().unwrap();
    // Moving a file into an existing directory does not round-trip: the
    // reverse move drags the whole directory back.
    let config_text = format!(
        r#"
        project = "endtoend"

        [workflows.default]
        reversible-check = true

        [workflows.default.origin]
        type = "git"
        url = "{origin}"
        ref = "main"

        [workflows.default.destination]
        type = "folder"
        path = "{dest}"

        [[workflows.default.transformations]]
        type = "move"
        before = "notes.txt"
        after = "docs"
        "#,
        origin = origin.path().display(),
        dest = dest.path().display(),
    );

    let options = common::test_options(&storage);
    let config = parse(&config_text, &options);
    let err = config
        .workflow("default")
        .unwrap()
        .run(None, &common::console())
        .unwrap_err();
    assert!(matches!(err, MigrationError::Reversibility { .. }));
    // The destination was never written.
    assert!(files::list_files(dest.path()).unwrap().is_empty());
}

#[test]
fn reversible_pipeline_passes_the_check() {
    let origin = common::init_repo();
    common::commit_file(origin.path(), "src/a.txt", "a", "first");

    let dest = TempDir::new().unwrap();
    let storage = TempDir::new().unwrap();
    let config_text = format!(
        r#"
        project = "endtoend"

        [workflows.default]
        reversible-check = true

        [workflows.default.origin]
        type = "git"
        url = "{origin}"
        ref = "main"

        [workflows.default.destination]
        type = "folder"
        path = "{dest}"

        [[workflows.default.transformations]]
        type = "move"
        before = "src"
        after = "lib"
        "#,
        origin = origin.path().display(),
        dest = dest.path().display(),
    );

    let options = common::test_options(&storage);
    let config = parse(&config_text, &options);
    config
        .workflow("default")
        .unwrap()
        .run(None, &common::console())
        .unwrap();
    assert_eq!(
        files::list_files(dest.path()).unwrap(),
        vec![PathBuf::from("lib/a.txt")]
    );
}

#[test]
fn folder_origin_to_folder_destination_round_trip() {
    let source = TempDir::new().unwrap();
    fs::create_dir_all(source.path().join("pkg")).unwrap();
    fs::write(source.path().join("pkg/mod.rs"), "pub fn f() {}\n").unwrap();
    fs::write(source.path().join("README.md"), "readme\n").unwrap();

    let dest = TempDir::new().unwrap();
    let storage = TempDir::new().unwrap();
    let config_text = format!(
        r#"
        project = "local_sync"

        [workflows.sync]

        [workflows.sync.origin]
        type = "folder"
        path = "{source}"

        [workflows.sync.destination]
        type = "folder"
        path = "{dest}"
        "#,
        source = source.path().display(),
        dest = dest.path().display(),
    );

    let options = common::test_options(&storage);
    let config = parse(&config_text, &options);
    config
        .workflow("sync")
        .unwrap()
        .run(None, &common::console())
        .unwrap();

    assert_eq!(
        files::list_files(dest.path()).unwrap(),
        vec![PathBuf::from("README.md"), PathBuf::from("pkg/mod.rs")]
    );
}

#[test]
fn destination_excludes_survive_the_write() {
    let origin = common::init_repo();
    common::commit_file(origin.path(), "code.txt", "new code", "update");

    let dest = TempDir::new().unwrap();
    fs::write(dest.path().join("LOCAL_NOTES.md"), "keep me").unwrap();
    fs::write(dest.path().join("obsolete.txt"), "drop me").unwrap();

    let storage = TempDir::new().unwrap();
    let config_text = format!(
        r#"
        project = "endtoend"

        [workflows.default]

        [workflows.default.origin]
        type = "git"
        url = "{origin}"
        ref = "main"

        [workflows.default.destination]
        type = "folder"
        path = "{dest}"

        [workflows.default.exclude-in-destination]
        include = ["LOCAL_NOTES.md"]
        "#,
        origin = origin.path().display(),
        dest = dest.path().display(),
    );

    let options = common::test_options(&storage);
    let config = parse(&config_text, &options);
    config
        .workflow("default")
        .unwrap()
        .run(None, &common::console())
        .unwrap();

    assert_eq!(
        files::list_files(dest.path()).unwrap(),
        vec![PathBuf::from("LOCAL_NOTES.md"), PathBuf::from("code.txt")]
    );
    assert_eq!(
        fs::read_to_string(dest.path().join("LOCAL_NOTES.md")).unwrap(),
        "keep me"
    );
}
