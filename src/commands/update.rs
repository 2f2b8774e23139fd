// src/commands/update.rs

use super::Status;
use crate::config::Config;
use crate::error::Result;
use crate::packages::PackageLoader;
use crate::repository::scan;
use crate::repository::{RepoState, Repository};
use crate::signing::Signer;
use tracing::{info, warn};

/// Add or refresh records from the pool and write the database
///
/// With no arguments the whole pool is scanned and records whose archive
/// has vanished are dropped. Named targets are forced in, replacing any
/// existing record regardless of version.
pub fn cmd_update(
    repo: &mut Repository,
    cfg: &Config,
    loader: &dyn PackageLoader,
    signer: &dyn Signer,
    args: &[String],
) -> Result<Status> {
    let force = !args.is_empty();

    if repo.state() == RepoState::New {
        warn!("repo doesn't exist, creating...");
    } else if args.is_empty() {
        for pkg in repo.reduce() {
            println!("removing {} {}", pkg.name, pkg.version);
        }
    }

    let collected = scan::collect(repo, cfg, loader, args)?;
    info!("Found {} candidate packages", collected.packages.len());

    cfg.colon("Updating repo database...");
    for pkg in collected.packages.into_packages() {
        let name = pkg.name.clone();
        let outcome = repo.upsert(pkg, force);

        if let Some(action) = outcome.action() {
            println!("{}", action);
        }

        if let Some(doomed) = outcome.doomed(cfg.clean) {
            let survivor = repo.cache.find(&name).map(|p| p.filename.as_str());
            if survivor != Some(doomed.filename.as_str()) {
                repo.unlink_package(doomed)?;
            }
        }
    }

    if cfg.clean >= 2 {
        for loser in &collected.discarded {
            let survivor = repo.cache.find(&loser.name).map(|p| p.filename.as_str());
            if survivor != Some(loser.filename.as_str()) {
                repo.unlink_package(loser)?;
            }
        }
    }

    Ok(repo.write(cfg, signer)?.into())
}
