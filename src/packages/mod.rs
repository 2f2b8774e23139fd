// src/packages/mod.rs

//! Package archive support for Repose
//!
//! This module provides the metadata loader used while scanning the pool.
//! Loaders implement the `PackageLoader` trait.

pub mod arch;
pub mod traits;

pub use arch::ArchLoader;
pub use traits::PackageLoader;
