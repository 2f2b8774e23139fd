// src/commands/query.rs

use super::Status;
use crate::config::Config;
use crate::db::models::Package;
use crate::error::Result;
use crate::repository::{RepoState, Repository};
use chrono::DateTime;
use std::io::Write;
use tracing::warn;

/// Print the named records, or every record when no names are given
///
/// Stops at the first name that is not in the database.
pub fn cmd_query<W: Write>(
    repo: &Repository,
    cfg: &Config,
    args: &[String],
    out: &mut W,
) -> Result<Status> {
    if repo.state() == RepoState::New {
        return Ok(Status::Success);
    }

    if args.is_empty() {
        for pkg in repo.cache.iter() {
            print_metadata(out, pkg, cfg.info)?;
        }
        return Ok(Status::Success);
    }

    for name in args {
        match repo.cache.find(name) {
            Some(pkg) => print_metadata(out, pkg, cfg.info)?,
            None => {
                warn!("pkg not found: {}", name);
                return Ok(Status::Failure);
            }
        }
    }

    Ok(Status::Success)
}

fn print_metadata<W: Write>(out: &mut W, pkg: &Package, info: bool) -> Result<()> {
    if !info {
        writeln!(out, "{} {}", pkg.name, pkg.version)?;
        return Ok(());
    }

    let build_date = DateTime::from_timestamp(pkg.build_date, 0)
        .map(|date| date.format("%a %d %b %Y %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| pkg.build_date.to_string());

    writeln!(out, "Filename     : {}", pkg.filename)?;
    writeln!(out, "Name         : {}", pkg.name)?;
    writeln!(out, "Version      : {}", pkg.version)?;
    writeln!(out, "Description  : {}", pkg.description.as_deref().unwrap_or("None"))?;
    writeln!(out, "Architecture : {}", pkg.architecture)?;
    writeln!(out, "URL          : {}", pkg.url.as_deref().unwrap_or("None"))?;
    writeln!(out, "Packager     : {}", pkg.packager.as_deref().unwrap_or("None"))?;
    writeln!(out, "Build Date   : {}", build_date)?;
    writeln!(out)?;
    Ok(())
}
