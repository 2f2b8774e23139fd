// src/packages/arch.rs

//! Arch Linux package metadata loader
//!
//! Reads .pkg.tar{,.gz,.bz2,.xz,.zst} packages, extracting metadata from .PKGINFO

use crate::compression::Compression;
use crate::db::models::Package;
use crate::error::{Error, Result};
use crate::hash;
use crate::packages::traits::PackageLoader;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use tar::Archive;
use tracing::debug;

/// Loader for pacman package archives
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchLoader {
    /// Also collect the archive's file list (needed for the files database)
    read_files: bool,
}

impl ArchLoader {
    pub fn new(read_files: bool) -> Self {
        Self { read_files }
    }

    /// Open and decompress the package archive
    fn open_archive(path: &Path) -> Result<Archive<Box<dyn Read>>> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let compression = Compression::detect(reader.fill_buf()?);
        let decoder: Box<dyn Read> = compression.decoder(reader)?;
        Ok(Archive::new(decoder))
    }

    /// Parse .PKGINFO content into a record
    fn parse_pkginfo(content: &str) -> Result<Package> {
        let mut pkg = Package::default();

        for line in content.lines() {
            let line = line.trim();

            // Skip comments and empty lines
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            // Parse key = value pairs
            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                let value = value.trim().to_string();

                match key {
                    "pkgname" => pkg.name = value,
                    "pkgbase" => pkg.base = Some(value),
                    "pkgver" => pkg.version = value,
                    "pkgdesc" => pkg.description = Some(value),
                    "url" => pkg.url = Some(value),
                    "builddate" => pkg.build_date = parse_number(&value, key)?,
                    "packager" => pkg.packager = Some(value),
                    "size" => pkg.installed_size = parse_number(&value, key)?,
                    "arch" => pkg.architecture = value,
                    "license" => pkg.licenses.push(value),
                    "group" => pkg.groups.push(value),
                    "replaces" => pkg.replaces.push(value),
                    "conflict" => pkg.conflicts.push(value),
                    "provides" => pkg.provides.push(value),
                    "depend" => pkg.depends.push(value),
                    "optdepend" => pkg.optdepends.push(value),
                    "makedepend" => pkg.makedepends.push(value),
                    "checkdepend" => pkg.checkdepends.push(value),
                    _ => {} // Ignore unknown keys
                }
            }
        }

        if pkg.name.is_empty() {
            return Err(Error::ParseError("Package name not found in .PKGINFO".to_string()));
        }
        if pkg.version.is_empty() {
            return Err(Error::ParseError("Package version not found in .PKGINFO".to_string()));
        }
        if pkg.architecture.is_empty() {
            return Err(Error::ParseError(
                "Package architecture not found in .PKGINFO".to_string(),
            ));
        }

        Ok(pkg)
    }

    /// Walk the archive once, returning .PKGINFO and (optionally) the file list
    fn read_archive(&self, path: &Path) -> Result<(String, Vec<String>)> {
        let mut archive = Self::open_archive(path)?;
        let mut pkginfo = None;
        let mut files = Vec::new();

        for entry in archive
            .entries()
            .map_err(|e| Error::ParseError(format!("Failed to read archive: {}", e)))?
        {
            let mut entry =
                entry.map_err(|e| Error::ParseError(format!("Failed to read entry: {}", e)))?;

            let mut entry_path = entry
                .path()
                .map_err(|e| Error::ParseError(format!("Failed to get entry path: {}", e)))?
                .to_string_lossy()
                .to_string();

            if entry_path == ".PKGINFO" {
                let mut content = String::new();
                entry
                    .read_to_string(&mut content)
                    .map_err(|e| Error::ParseError(format!("Failed to read .PKGINFO: {}", e)))?;
                pkginfo = Some(content);

                if !self.read_files {
                    break;
                }
                continue;
            }

            // Skip .MTREE, .BUILDINFO, .INSTALL and friends
            if !self.read_files || entry_path.starts_with('.') {
                continue;
            }

            if entry.header().entry_type().is_dir() && !entry_path.ends_with('/') {
                entry_path.push('/');
            }
            files.push(entry_path);
        }

        let pkginfo = pkginfo
            .ok_or_else(|| Error::ParseError("No .PKGINFO file found in package".to_string()))?;
        Ok((pkginfo, files))
    }
}

impl PackageLoader for ArchLoader {
    fn load(&self, path: &Path) -> Result<Package> {
        debug!("Loading package metadata: {}", path.display());

        let with_path = |e: Error| match e {
            Error::ParseError(msg) => Error::ParseError(format!("{}: {}", path.display(), msg)),
            other => other,
        };

        let (pkginfo, files) = self.read_archive(path).map_err(with_path)?;
        let mut pkg = Self::parse_pkginfo(&pkginfo).map_err(with_path)?;

        let sums = hash::checksum_file(path)?;
        pkg.md5sum = Some(sums.md5);
        pkg.sha256sum = Some(sums.sha256);
        pkg.compressed_size = fs::metadata(path)?.len();
        pkg.files = files;

        debug!(
            "Loaded package: {} version {} ({}, {} files)",
            pkg.name,
            pkg.version,
            pkg.architecture,
            pkg.files.len()
        );

        Ok(pkg)
    }
}

fn parse_number<T: std::str::FromStr>(value: &str, key: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::ParseError(format!("Invalid {} in .PKGINFO: {}", key, value)))
}
