// src/main.rs

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use repose::commands::{self, Status};
use repose::config::{ColorMode, Config};
use repose::packages::ArchLoader;
use repose::repository::Repository;
use repose::signing::Gpg;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

/// Operation selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Update,
    Remove,
    Query,
    Verify,
}

#[derive(Parser)]
#[command(name = "repose")]
#[command(author, version, about = "Maintain a pacman repository database from a pool of package archives", long_about = None)]
#[command(disable_version_flag = true)]
#[command(group = clap::ArgGroup::new("operation").args(["update", "remove", "query", "verify"]))]
struct Cli {
    /// Print version
    #[arg(short = 'v', long, action = ArgAction::Version)]
    version: Option<bool>,
    /// Add or update packages from the pool
    #[arg(short = 'U', long)]
    update: bool,
    /// Remove packages from the database
    #[arg(short = 'R', long)]
    remove: bool,
    /// Print database entries
    #[arg(short = 'Q', long)]
    query: bool,
    /// Check archives against the database
    #[arg(short = 'V', long)]
    verify: bool,
    /// Show detailed package information when querying
    #[arg(short, long)]
    info: bool,
    /// Directory holding the package archives
    #[arg(short, long, value_name = "POOL")]
    pool: Option<PathBuf>,
    /// Delete superseded archives; repeat to also delete older ones
    #[arg(short, long, action = ArgAction::Count)]
    clean: u8,
    /// Also maintain the files database
    #[arg(short, long)]
    files: bool,
    /// Repository architecture
    #[arg(short, long, value_name = "ARCH")]
    arch: Option<String>,
    /// Sign the database with GnuPG
    #[arg(short, long)]
    sign: bool,
    /// GnuPG key to sign with
    #[arg(short, long, value_name = "KEY")]
    key: Option<String>,
    /// Colorize section headers
    #[arg(long, value_enum, value_name = "MODE", default_value_t = ColorMode::Auto)]
    color: ColorMode,
    /// Ignore the existing database and rebuild from the pool
    #[arg(long)]
    rebuild: bool,
    /// Path to the repository database
    database: Option<PathBuf>,
    /// Package names, globs or archive paths
    targets: Vec<String>,
}

/// Compatibility front end when invoked as `repo-add`
#[derive(Parser)]
#[command(name = "repo-add", version, about = "Add packages to a repository database", long_about = None)]
struct RepoAddCli {
    /// Also maintain the files database
    #[arg(short, long)]
    files: bool,
    /// Sign the database with GnuPG
    #[arg(short, long)]
    sign: bool,
    /// GnuPG key to sign with
    #[arg(short, long, value_name = "KEY")]
    key: Option<String>,
    /// Disable colored output
    #[arg(long)]
    nocolor: bool,
    /// Path to the repository database
    database: Option<PathBuf>,
    /// Package archives to add
    targets: Vec<String>,
}

/// Compatibility front end when invoked as `repo-remove`
#[derive(Parser)]
#[command(name = "repo-remove", version, about = "Remove packages from a repository database", long_about = None)]
struct RepoRemoveCli {
    /// Sign the database with GnuPG
    #[arg(short, long)]
    sign: bool,
    /// GnuPG key to sign with
    #[arg(short, long, value_name = "KEY")]
    key: Option<String>,
    /// Disable colored output
    #[arg(long)]
    nocolor: bool,
    /// Path to the repository database
    database: Option<PathBuf>,
    /// Package names or globs to remove
    targets: Vec<String>,
}

/// Everything `run` needs, whichever front end parsed it
struct Invocation {
    action: Action,
    cfg: Config,
    database: PathBuf,
    targets: Vec<String>,
}

impl Cli {
    fn into_invocation(self) -> Result<Invocation> {
        let action = if self.update {
            Action::Update
        } else if self.remove {
            Action::Remove
        } else if self.query {
            Action::Query
        } else if self.verify {
            Action::Verify
        } else {
            anyhow::bail!("no operation specified");
        };

        let cfg = Config {
            arch: self.arch.unwrap_or_else(|| Config::default().arch),
            pool: self.pool,
            key: self.key,
            sign: self.sign,
            files: self.files,
            rebuild: self.rebuild,
            clean: self.clean,
            info: self.info,
            color: self.color.enabled(),
        };

        Ok(Invocation {
            action,
            cfg,
            database: self.database.context("not enough arguments")?,
            targets: self.targets,
        })
    }
}

impl RepoAddCli {
    fn into_invocation(self) -> Result<Invocation> {
        let color = if self.nocolor { ColorMode::Never } else { ColorMode::Auto };
        Ok(Invocation {
            action: Action::Update,
            cfg: Config {
                files: self.files,
                sign: self.sign,
                key: self.key,
                color: color.enabled(),
                ..Config::default()
            },
            database: self.database.context("not enough arguments")?,
            targets: self.targets,
        })
    }
}

impl RepoRemoveCli {
    fn into_invocation(self) -> Result<Invocation> {
        let color = if self.nocolor { ColorMode::Never } else { ColorMode::Auto };
        Ok(Invocation {
            action: Action::Remove,
            cfg: Config {
                sign: self.sign,
                key: self.key,
                color: color.enabled(),
                ..Config::default()
            },
            database: self.database.context("not enough arguments")?,
            targets: self.targets,
        })
    }
}

/// Pick the front end from the name the binary was invoked under
fn parse_invocation() -> Result<Invocation> {
    let program = std::env::args_os()
        .next()
        .map(PathBuf::from)
        .and_then(|path| path.file_name().map(OsString::from))
        .unwrap_or_default();

    match program.to_str() {
        Some("repo-add") => RepoAddCli::parse().into_invocation(),
        Some("repo-remove") => RepoRemoveCli::parse().into_invocation(),
        _ => Cli::parse().into_invocation(),
    }
}

fn run(invocation: Invocation) -> Result<Status> {
    let Invocation {
        action,
        cfg,
        database,
        targets,
    } = invocation;

    info!("{:?} on {}", action, database.display());

    let mut repo = Repository::open(Path::new(&database), &cfg)
        .with_context(|| format!("failed to open repository {}", database.display()))?;
    let gpg = Gpg::new();

    let status = match action {
        Action::Update => {
            let loader = ArchLoader::new(cfg.files);
            commands::cmd_update(&mut repo, &cfg, &loader, &gpg, &targets)?
        }
        Action::Remove => commands::cmd_remove(&mut repo, &cfg, &gpg, &targets)?,
        Action::Query => {
            let stdout = std::io::stdout();
            commands::cmd_query(&repo, &cfg, &targets, &mut stdout.lock())?
        }
        Action::Verify => commands::cmd_verify(&repo, &gpg)?,
    };

    Ok(status)
}

fn main() -> Result<ExitCode> {
    // Diagnostics go to stderr, warnings and errors by default
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let invocation = parse_invocation()?;
    let status = run(invocation)?;
    Ok(status.into())
}
