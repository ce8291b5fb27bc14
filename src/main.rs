use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use copybara::config::{GeneralOptions, MigrationConfig};
use copybara::console::Console;
use copybara::error::MigrationError;

/// One-way source code migrations between version control repositories
///
/// Reads revisions from an origin repository, applies the configured
/// transformations to the checked-out tree, and writes the result to a
/// destination repository or folder, mapping authorship along the way.
///
/// The migration is described by a TOML configuration file that names a
/// project and one or more workflows:
///
///   copybara migrations.toml default
///
/// Exit codes: 0 success, 1 configuration error, 2 VCS or external
/// error, 3 canceled by the user, 4 nothing new to migrate.
#[derive(Parser)]
#[command(name = "copybara")]
#[command(version, about)]
struct Cli {
    /// Path to the migration configuration file
    config: PathBuf,

    /// Name of the workflow to run
    workflow: String,

    /// Origin reference to migrate (defaults to the configured reference)
    source_ref: Option<String>,

    /// Root directory for bare repository caches
    #[arg(long, value_name = "DIR")]
    git_repo_storage: Option<PathBuf>,

    /// Override the git origin URL from the configuration
    #[arg(long, value_name = "URL")]
    git_origin_url: Option<String>,

    /// Treat this revision as the last one already migrated
    #[arg(long, value_name = "REF")]
    last_rev: Option<String>,

    /// Use this directory for the working tree instead of a temp dir
    #[arg(long, value_name = "DIR")]
    work_dir: Option<PathBuf>,

    /// Verbose console output
    #[arg(long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let console = Console::new(cli.verbose);
    match run(&cli, &console) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            console.error(&format!("{err:#}"));
            let code = err
                .downcast_ref::<MigrationError>()
                .map_or(2, MigrationError::exit_code);
            ExitCode::from(u8::try_from(code).unwrap_or(2))
        }
    }
}

fn run(cli: &Cli, console: &Console) -> anyhow::Result<()> {
    // Paths are handed to subprocesses running in other directories, so
    // relative inputs are anchored to the invocation cwd up front.
    let storage = cli
        .git_repo_storage
        .clone()
        .unwrap_or_else(GeneralOptions::default_repo_storage);
    let options = GeneralOptions {
        git_repo_storage: std::path::absolute(storage)?,
        git_origin_url: cli.git_origin_url.clone(),
        last_revision: cli.last_rev.clone(),
        work_dir: cli
            .work_dir
            .as_ref()
            .map(std::path::absolute)
            .transpose()?,
        verbose: cli.verbose,
    };

    let config = MigrationConfig::load(&cli.config, &options, console)?;
    let workflow = config.workflow(&cli.workflow)?;
    workflow.run(cli.source_ref.as_deref(), console)?;
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "copybara=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
