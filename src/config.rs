//! Migration configuration (TOML).
//!
//! The declarative front-end that constructs the engine object graph: a
//! project name plus named workflows, each wiring an origin, a
//! destination, an authoring policy, and a transformation pipeline.
//! Unknown fields are rejected. The registry is built once at load time
//! and read-only afterwards.
//!
//! ```toml
//! project = "copybara_project"
//!
//! [workflows.default]
//! mode = "squash"
//!
//! [workflows.default.origin]
//! type = "git"
//! url = "https://github.com/example/project.git"
//! ref = "master"
//!
//! [workflows.default.destination]
//! type = "git"
//! url = "https://internal/project.git"
//! fetch = "master"
//! push = "master"
//!
//! [workflows.default.authoring]
//! mode = "whitelist"
//! default-author = "Project Copybara <copybara@example.com>"
//! whitelist = ["alice@example.com"]
//!
//! [[workflows.default.transformations]]
//! type = "move"
//! before = "src"
//! after = "java/com/example"
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::authoring::{Author, Authoring, AuthoringMode};
use crate::console::Console;
use crate::destination::{AnyDestination, FolderDestination, GitDestination};
use crate::error::{MigrationError, Result};
use crate::matcher::PathMatcher;
use crate::origin::{AnyOrigin, FolderOrigin, GitOrigin};
use crate::transform::{Move, Transform};
use crate::workflow::{Workflow, WorkflowMode};

// ---------------------------------------------------------------------------
// GeneralOptions
// ---------------------------------------------------------------------------

/// Command-line options the configuration build depends on.
#[derive(Clone, Debug)]
pub struct GeneralOptions {
    /// Root directory for bare repository caches.
    pub git_repo_storage: PathBuf,
    /// Overrides every git origin URL in the configuration (warned).
    pub git_origin_url: Option<String>,
    /// Overrides the last-migrated revision discovery.
    pub last_revision: Option<String>,
    /// Pins the run's working directory instead of a temp dir.
    pub work_dir: Option<PathBuf>,
    /// Verbose console output.
    pub verbose: bool,
}

impl GeneralOptions {
    /// The default cache root, `~/.copybara/repos`.
    #[must_use]
    pub fn default_repo_storage() -> PathBuf {
        std::env::var_os("HOME").map_or_else(
            || PathBuf::from(".copybara/repos"),
            |home| Path::new(&home).join(".copybara").join("repos"),
        )
    }
}

// ---------------------------------------------------------------------------
// Raw (serde) configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct RawConfig {
    project: String,
    #[serde(default)]
    workflows: HashMap<String, RawWorkflow>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct RawWorkflow {
    origin: RawOrigin,
    destination: RawDestination,
    #[serde(default)]
    authoring: RawAuthoring,
    #[serde(default)]
    transformations: Vec<RawTransformation>,
    exclude_in_origin: Option<RawGlob>,
    exclude_in_destination: Option<RawGlob>,
    #[serde(default)]
    mode: WorkflowMode,
    #[serde(default)]
    reversible_check: bool,
    #[serde(default)]
    ask_for_confirmation: bool,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum RawOrigin {
    Git {
        url: String,
        #[serde(rename = "ref")]
        reference: Option<String>,
    },
    Folder {
        path: PathBuf,
        author: Option<Author>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum RawDestination {
    Git {
        url: String,
        fetch: String,
        push: String,
    },
    Folder {
        path: Option<PathBuf>,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct RawAuthoring {
    #[serde(default)]
    mode: AuthoringMode,
    default_author: Option<Author>,
    #[serde(default)]
    whitelist: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum RawTransformation {
    Move {
        before: String,
        after: String,
    },
    Sequence {
        transformations: Vec<RawTransformation>,
    },
    /// The reverse of the given transformations, applied reversed; lets
    /// one workflow undo another workflow's pipeline.
    Reverse {
        transformations: Vec<RawTransformation>,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct RawGlob {
    #[serde(default)]
    include: Vec<String>,
    #[serde(default)]
    exclude: Vec<String>,
}

// ---------------------------------------------------------------------------
// MigrationConfig
// ---------------------------------------------------------------------------

/// The loaded configuration: a project name plus a read-only workflow
/// registry keyed by workflow name.
#[derive(Debug)]
pub struct MigrationConfig {
    /// The configured project name.
    pub project: String,
    workflows: HashMap<String, Workflow>,
}

impl MigrationConfig {
    /// Load and validate a configuration file, constructing the engine
    /// object graph.
    pub fn load(path: &Path, options: &GeneralOptions, console: &Console) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            MigrationError::config(format!("cannot read config file '{}': {e}", path.display()))
        })?;
        Self::parse(&text, options, console)
            .map_err(|e| match e {
                MigrationError::Config { message } => {
                    MigrationError::config(format!("{}: {message}", path.display()))
                }
                other => other,
            })
    }

    /// Parse configuration text. Separate from [`Self::load`] for tests.
    pub fn parse(text: &str, options: &GeneralOptions, console: &Console) -> Result<Self> {
        let raw: RawConfig =
            toml::from_str(text).map_err(|e| MigrationError::config(e.to_string()))?;

        if raw.project.trim().is_empty() {
            return Err(MigrationError::config(
                "empty name for the project is not allowed",
            ));
        }

        let mut workflows = HashMap::new();
        for (name, raw_workflow) in raw.workflows {
            if name.trim().is_empty() {
                return Err(MigrationError::config(
                    "empty name for a workflow is not allowed",
                ));
            }
            let workflow =
                build_workflow(&raw.project, &name, raw_workflow, options, console)?;
            workflows.insert(name, workflow);
        }

        Ok(Self {
            project: raw.project,
            workflows,
        })
    }

    /// Look up a workflow by name.
    pub fn workflow(&self, name: &str) -> Result<&Workflow> {
        self.workflows.get(name).ok_or_else(|| {
            let mut available: Vec<&str> = self.workflows.keys().map(String::as_str).collect();
            available.sort_unstable();
            MigrationError::config(format!(
                "workflow '{name}' not found in the configuration (available: {})",
                available.join(", ")
            ))
        })
    }
}

fn build_workflow(
    project: &str,
    name: &str,
    raw: RawWorkflow,
    options: &GeneralOptions,
    console: &Console,
) -> Result<Workflow> {
    Ok(Workflow {
        project: project.to_owned(),
        name: name.to_owned(),
        origin: build_origin(raw.origin, options, console)?,
        destination: build_destination(raw.destination, project, options)?,
        authoring: build_authoring(raw.authoring)?,
        transform: build_transforms(raw.transformations)?,
        last_revision_override: options.last_revision.clone(),
        exclude_in_origin: build_glob(raw.exclude_in_origin)?,
        exclude_in_destination: build_glob(raw.exclude_in_destination)?,
        mode: raw.mode,
        reversible_check: raw.reversible_check,
        ask_for_confirmation: raw.ask_for_confirmation,
        work_dir: options.work_dir.clone(),
    })
}

fn build_origin(
    raw: RawOrigin,
    options: &GeneralOptions,
    console: &Console,
) -> Result<AnyOrigin> {
    match raw {
        RawOrigin::Git { url, reference } => {
            if url.trim().is_empty() {
                return Err(MigrationError::config("git origin url is missing"));
            }
            let url = match &options.git_origin_url {
                Some(override_url) => {
                    console.warn(&format!(
                        "git origin URL overwritten in the command line as {override_url}"
                    ));
                    override_url.clone()
                }
                None => url,
            };
            Ok(AnyOrigin::Git(GitOrigin::new(
                &options.git_repo_storage,
                url,
                reference,
            )))
        }
        RawOrigin::Folder { path, author } => {
            let author = match author {
                Some(author) => author,
                None => Author::new("Folder Origin", "")?,
            };
            Ok(AnyOrigin::Folder(FolderOrigin::new(path, author)))
        }
    }
}

fn build_destination(
    raw: RawDestination,
    project: &str,
    options: &GeneralOptions,
) -> Result<AnyDestination> {
    match raw {
        RawDestination::Git { url, fetch, push } => {
            if url.trim().is_empty() {
                return Err(MigrationError::config("git destination url is missing"));
            }
            Ok(AnyDestination::Git(GitDestination::new(
                &options.git_repo_storage,
                url,
                fetch,
                push,
            )))
        }
        RawDestination::Folder { path } => Ok(AnyDestination::Folder(FolderDestination::new(
            path,
            project.to_owned(),
            std::env::current_dir()?,
        ))),
    }
}

fn build_authoring(raw: RawAuthoring) -> Result<Authoring> {
    match raw.mode {
        AuthoringMode::PassThrough => Ok(Authoring::pass_through()),
        AuthoringMode::UseDefault => {
            let author = raw.default_author.ok_or_else(|| {
                MigrationError::config("authoring mode 'use-default' requires default-author")
            })?;
            Ok(Authoring::use_default(author))
        }
        AuthoringMode::Whitelist => {
            let author = raw.default_author.ok_or_else(|| {
                MigrationError::config("authoring mode 'whitelist' requires default-author")
            })?;
            Authoring::whitelist(author, raw.whitelist)
        }
    }
}

fn build_transforms(raw: Vec<RawTransformation>) -> Result<Transform> {
    let mut transforms = Vec::with_capacity(raw.len());
    for item in raw {
        transforms.push(build_transform(item)?);
    }
    Ok(Transform::sequence(transforms))
}

fn build_transform(raw: RawTransformation) -> Result<Transform> {
    match raw {
        RawTransformation::Move { before, after } => Ok(Transform::Move(Move::new(before, after)?)),
        RawTransformation::Sequence { transformations } => build_transforms(transformations),
        RawTransformation::Reverse { transformations } => {
            build_transforms(transformations)?.reverse()
        }
    }
}

fn build_glob(raw: Option<RawGlob>) -> Result<PathMatcher> {
    match raw {
        Some(glob) => PathMatcher::new(&glob.include, &glob.exclude),
        None => Ok(PathMatcher::empty()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
