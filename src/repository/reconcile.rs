// src/repository/reconcile.rs

//! Upsert policy for package records
//!
//! Decides what happens when a record meets a cache that may already hold a
//! record of the same name. The decision is returned as an [`Outcome`] so the
//! caller can report it and, depending on the clean level, delete archives
//! that fell out of the cache.

use crate::cache::PackageCache;
use crate::db::models::Package;
use crate::version;
use std::cmp::Ordering;

/// Result of offering one record to a cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// No record of that name existed
    Added { name: String, version: String },
    /// Incoming version compared newer
    Updated { previous: Package, version: String },
    /// Same version, later build date
    NewerBuild { previous: Package },
    /// Same version and build, but only the incoming record is signed
    SignatureAdded { previous: Package },
    /// Forced replacement regardless of version
    Replaced {
        previous: Package,
        version: String,
        ordering: Ordering,
    },
    /// Incoming version compared older; the cache is untouched
    Rejected { incoming: Package },
    /// Nothing to gain from the incoming record
    Unchanged { incoming: Package },
}

impl Outcome {
    /// Whether the cache now holds the incoming record
    pub fn is_accepted(&self) -> bool {
        !matches!(self, Outcome::Rejected { .. } | Outcome::Unchanged { .. })
    }

    /// Progress line for an accepted record
    pub fn action(&self) -> Option<String> {
        match self {
            Outcome::Added { name, version } => Some(format!("adding {} {}", name, version)),
            Outcome::Updated { previous, version } => Some(format!(
                "updating {} {} => {}",
                previous.name, previous.version, version
            )),
            Outcome::NewerBuild { previous } => Some(format!(
                "updating {} {} [newer build]",
                previous.name, previous.version
            )),
            Outcome::SignatureAdded { previous } => {
                Some(format!("adding signature for {}", previous.name))
            }
            Outcome::Replaced {
                previous, version, ..
            } => Some(format!(
                "replacing {} {} => {}",
                previous.name, previous.version, version
            )),
            Outcome::Rejected { .. } | Outcome::Unchanged { .. } => None,
        }
    }

    /// The record whose archive should be deleted at `clean` level, if any
    ///
    /// Level 1 removes archives superseded by a newer version and archives
    /// displaced by a forced downgrade. Level 2 additionally removes incoming
    /// archives that lost a version comparison and archives displaced by a
    /// forced upgrade.
    pub fn doomed(&self, clean: u8) -> Option<&Package> {
        match self {
            Outcome::Updated { previous, .. } if clean >= 1 => Some(previous),
            Outcome::Replaced {
                previous,
                ordering: Ordering::Less,
                ..
            } if clean >= 1 => Some(previous),
            Outcome::Replaced {
                previous,
                ordering: Ordering::Greater,
                ..
            } if clean >= 2 => Some(previous),
            Outcome::Rejected { incoming } if clean >= 2 => Some(incoming),
            _ => None,
        }
    }

    /// The record that lost a version comparison, if any
    pub fn into_loser(self) -> Option<Package> {
        match self {
            Outcome::Updated { previous, .. } => Some(previous),
            Outcome::Rejected { incoming } => Some(incoming),
            _ => None,
        }
    }
}

/// Offer `incoming` to `cache`
///
/// With `force` an existing record is replaced unconditionally. Otherwise a
/// newer version replaces, an older one is rejected, and an equal version
/// only wins on a later build date or a newly acquired signature.
/// Replacement happens in place, so the entry keeps its position.
pub fn upsert(cache: &mut PackageCache, incoming: Package, force: bool) -> Outcome {
    let Some(slot) = cache.find_mut(&incoming.name) else {
        let name = incoming.name.clone();
        let version = incoming.version.clone();
        cache.insert(incoming);
        return Outcome::Added { name, version };
    };

    let ordering = version::compare(&incoming.version, &slot.version);

    if force {
        let version = incoming.version.clone();
        let previous = std::mem::replace(slot, incoming);
        return Outcome::Replaced {
            previous,
            version,
            ordering,
        };
    }

    match ordering {
        Ordering::Greater => {
            let version = incoming.version.clone();
            let previous = std::mem::replace(slot, incoming);
            Outcome::Updated { previous, version }
        }
        Ordering::Less => Outcome::Rejected { incoming },
        Ordering::Equal if incoming.build_date > slot.build_date => Outcome::NewerBuild {
            previous: std::mem::replace(slot, incoming),
        },
        Ordering::Equal if !slot.has_signature() && incoming.has_signature() => {
            Outcome::SignatureAdded {
                previous: std::mem::replace(slot, incoming),
            }
        }
        Ordering::Equal => Outcome::Unchanged { incoming },
    }
}
