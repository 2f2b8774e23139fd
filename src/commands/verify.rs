// src/commands/verify.rs

use super::Status;
use crate::db::models::Package;
use crate::error::Result;
use crate::hash;
use crate::repository::{RepoState, Repository};
use crate::signing::Verifier;
use tracing::{debug, warn};

/// Check every record against its archive in the pool
///
/// A record passes when its archive exists, its detached signature (if one
/// is present) verifies, and the archive's digests match the recorded ones.
pub fn cmd_verify(repo: &Repository, verifier: &dyn Verifier) -> Result<Status> {
    if repo.state() == RepoState::New {
        warn!("repo doesn't exist...");
        return Ok(Status::Failure);
    }

    let mut failures = 0;
    for pkg in repo.cache.iter() {
        if !verify_package(repo, verifier, pkg)? {
            failures += 1;
        }
    }

    if failures > 0 {
        debug!("{} of {} packages failed verification", failures, repo.cache.len());
        return Ok(Status::Failure);
    }

    println!("repo okay!");
    Ok(Status::Success)
}

fn verify_package(repo: &Repository, verifier: &dyn Verifier, pkg: &Package) -> Result<bool> {
    let archive = repo.pool_path(&pkg.filename);
    if !archive.exists() {
        warn!("couldn't find pkg {} at {}", pkg.name, archive.display());
        return Ok(false);
    }

    let signature = repo.pool_path(&pkg.signature_name());
    if signature.exists() {
        if let Err(e) = verifier.verify(&archive, &signature) {
            debug!("{}", e);
            warn!("package {}, signature is invalid or corrupt!", pkg.name);
            return Ok(false);
        }
    }

    let sums = match hash::checksum_file(&archive) {
        Ok(sums) => sums,
        Err(e) => {
            warn!("couldn't read pkg {} at {}: {}", pkg.name, archive.display(), e);
            return Ok(false);
        }
    };

    if pkg.md5sum.as_deref().is_some_and(|expected| expected != sums.md5) {
        warn!("md5 sum for pkg {} is different", pkg.name);
        return Ok(false);
    }

    if pkg.sha256sum.as_deref().is_some_and(|expected| expected != sums.sha256) {
        warn!("sha256 sum for pkg {} is different", pkg.name);
        return Ok(false);
    }

    Ok(true)
}
