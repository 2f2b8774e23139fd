// src/packages/traits.rs

//! Common traits for package metadata loaders

use crate::db::models::Package;
use crate::error::Result;
use std::path::Path;

/// Reads one package archive's embedded metadata into a record
///
/// The returned record carries identity, checksums and sizes. File name and
/// signature are attached afterwards by the pool scanner.
pub trait PackageLoader {
    fn load(&self, path: &Path) -> Result<Package>;
}
