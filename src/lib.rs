// src/lib.rs

//! Repose, a pacman repository database manager
//!
//! Maintains the `<name>.db.tar.*` (and optional `<name>.files.tar.*`)
//! database describing a directory of package archives, the pool.
//!
//! # Architecture
//!
//! - The database is loaded into an in-memory cache, changed, and written
//!   back only when something actually changed
//! - Pool archives are scanned through a `PackageLoader`
//! - Version conflicts are settled by pacman's version ordering
//! - Signing and signature checks go through the `Signer`/`Verifier` seams

pub mod cache;
pub mod commands;
pub mod compression;
pub mod config;
pub mod db;
mod error;
pub mod hash;
pub mod matcher;
pub mod packages;
pub mod repository;
pub mod signing;
pub mod version;

pub use error::{Error, Result};
