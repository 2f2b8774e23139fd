// src/commands/remove.rs

use super::Status;
use crate::config::Config;
use crate::error::Result;
use crate::matcher;
use crate::repository::{RepoState, Repository};
use crate::signing::Signer;
use tracing::warn;

/// Remove every record matching the given names or globs
///
/// Unmatched targets are reported and make the operation fail, but the
/// database is still written with whatever was removed.
pub fn cmd_remove(
    repo: &mut Repository,
    cfg: &Config,
    signer: &dyn Signer,
    args: &[String],
) -> Result<Status> {
    if repo.state() == RepoState::New {
        warn!("repo doesn't exist...");
        return Ok(Status::Failure);
    }

    if args.is_empty() {
        return Ok(Status::Success);
    }

    let mut unmatched = false;
    for target in args {
        let names = matcher::glob_cache(&repo.cache, target);
        if names.is_empty() {
            warn!("didn't find entry: {}", target);
            unmatched = true;
            continue;
        }

        for name in names {
            let Some(pkg) = repo.remove(&name) else {
                continue;
            };
            println!("removing {} {}", pkg.name, pkg.version);
            if cfg.clean >= 1 {
                repo.unlink_package(&pkg)?;
            }
        }
    }

    let status = Status::from(repo.write(cfg, signer)?);
    Ok(if unmatched { Status::Failure } else { status })
}
