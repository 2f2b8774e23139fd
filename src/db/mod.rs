// src/db/mod.rs

//! Repository database layer
//!
//! A repository database is a (compressed) tarball with one directory per
//! package, named `name-version/`, holding the descriptor files rendered by
//! [`desc`]. This module handles:
//! - Reading a database into package records
//! - Writing the package cache back out, atomically replacing the old file

pub mod desc;
pub mod models;

use crate::cache::PackageCache;
use crate::compression::{self, Compression};
use crate::error::{Error, Result};
use models::Package;
use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::Path;
use tar::{Archive, Builder, EntryType, Header};
use tracing::{debug, info};

/// Selects which descriptor files are written for every entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contents(u8);

impl Contents {
    pub const DESC: Contents = Contents(1);
    pub const DEPENDS: Contents = Contents(1 << 2);
    pub const FILES: Contents = Contents(1 << 3);

    pub fn contains(self, other: Contents) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for Contents {
    type Output = Contents;

    fn bitor(self, rhs: Contents) -> Contents {
        Contents(self.0 | rhs.0)
    }
}

/// Read every package entry from a database file
///
/// Entries are returned in archive order. An entry without `%NAME%` or
/// `%VERSION%` makes the whole database invalid.
pub fn load(db_path: &Path) -> Result<Vec<Package>> {
    debug!("Loading database: {}", db_path.display());

    let raw = fs::read(db_path)?;
    let data = compression::decompress(&raw)
        .map_err(|e| Error::DatabaseError(format!("Failed to decompress {}: {}", db_path.display(), e)))?;

    let mut archive = Archive::new(data.as_slice());
    let mut order: Vec<String> = Vec::new();
    let mut entries: HashMap<String, Package> = HashMap::new();

    for entry in archive
        .entries()
        .map_err(|e| Error::DatabaseError(format!("Failed to read database: {}", e)))?
    {
        let mut entry = entry
            .map_err(|e| Error::DatabaseError(format!("Failed to read database entry: {}", e)))?;

        if entry.header().entry_type().is_dir() {
            continue;
        }

        let path = entry
            .path()
            .map_err(|e| Error::DatabaseError(format!("Invalid path in database: {}", e)))?
            .to_string_lossy()
            .to_string();

        // Each package has a directory with desc, depends and files
        let Some((dir, file)) = path.trim_end_matches('/').rsplit_once('/') else {
            continue;
        };
        if !matches!(file, "desc" | "depends" | "files") {
            continue;
        }

        let mut content = String::new();
        entry
            .read_to_string(&mut content)
            .map_err(|e| Error::DatabaseError(format!("Failed to read {}: {}", path, e)))?;

        let pkg = entries.entry(dir.to_string()).or_insert_with(|| {
            order.push(dir.to_string());
            Package::default()
        });
        desc::apply_fields(pkg, desc::parse_fields(&content))?;
    }

    let mut packages = Vec::with_capacity(order.len());
    for dir in order {
        let pkg = entries.remove(&dir).unwrap_or_default();
        if pkg.name.is_empty() || pkg.version.is_empty() {
            return Err(Error::DatabaseError(format!(
                "Entry {} is missing %NAME% or %VERSION%",
                dir
            )));
        }
        packages.push(pkg);
    }

    info!("Loaded {} entries from {}", packages.len(), db_path.display());
    Ok(packages)
}

/// Write the cache to `db_path`
///
/// The archive is assembled in memory and compressed into a temporary file
/// beside the target, which is then renamed over it.
pub fn save(
    db_path: &Path,
    cache: &PackageCache,
    contents: Contents,
    compression: Compression,
) -> Result<()> {
    debug!("Writing {} entries to {}", cache.len(), db_path.display());

    let tarball = build_archive(cache, contents)?;

    let dir = db_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    compression.encode(&tarball, temp.as_file_mut())?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp.as_file()
            .set_permissions(fs::Permissions::from_mode(0o644))?;
    }
    temp.persist(db_path).map_err(|e| {
        Error::DatabaseError(format!("Failed to replace {}: {}", db_path.display(), e))
    })?;

    Ok(())
}

fn build_archive(cache: &PackageCache, contents: Contents) -> Result<Vec<u8>> {
    let mut builder = Builder::new(Vec::new());

    for pkg in cache.iter() {
        let dir = pkg.full_name();
        append_dir(&mut builder, &dir, pkg.build_date)?;

        if contents.contains(Contents::DESC) {
            append_file(&mut builder, &dir, "desc", &desc::render_desc(pkg), pkg.build_date)?;
        }
        if contents.contains(Contents::DEPENDS) {
            append_file(&mut builder, &dir, "depends", &desc::render_depends(pkg), pkg.build_date)?;
        }
        if contents.contains(Contents::FILES) {
            append_file(&mut builder, &dir, "files", &desc::render_files(pkg), pkg.build_date)?;
        }
    }

    Ok(builder.into_inner()?)
}

fn append_dir(builder: &mut Builder<Vec<u8>>, dir: &str, mtime: i64) -> Result<()> {
    let mut header = Header::new_gnu();
    header.set_entry_type(EntryType::Directory);
    header.set_mode(0o755);
    header.set_size(0);
    header.set_mtime(mtime.max(0) as u64);
    builder.append_data(&mut header, format!("{}/", dir), std::io::empty())?;
    Ok(())
}

fn append_file(
    builder: &mut Builder<Vec<u8>>,
    dir: &str,
    name: &str,
    content: &str,
    mtime: i64,
) -> Result<()> {
    let mut header = Header::new_gnu();
    header.set_entry_type(EntryType::Regular);
    header.set_mode(0o644);
    header.set_size(content.len() as u64);
    header.set_mtime(mtime.max(0) as u64);
    builder.append_data(&mut header, format!("{}/{}", dir, name), content.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package(name: &str, version: &str) -> Package {
        let mut pkg = Package::new(name.to_string(), version.to_string(), "x86_64".to_string());
        pkg.filename = format!("{}-{}-x86_64.pkg.tar.zst", name, version);
        pkg.build_date = 1_700_000_000;
        pkg.files = vec![format!("usr/bin/{}", name)];
        pkg
    }

    #[test]
    fn test_contents_mask() {
        let mask = Contents::DESC | Contents::DEPENDS;
        assert!(mask.contains(Contents::DESC));
        assert!(mask.contains(Contents::DEPENDS));
        assert!(!mask.contains(Contents::FILES));
    }

    #[test]
    fn test_save_then_load_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db.tar.gz");

        let mut cache = PackageCache::with_capacity(3);
        cache.insert(package("zlib", "1.3-1"));
        cache.insert(package("bash", "5.2-1"));
        cache.insert(package("coreutils", "9.4-2"));

        save(&db_path, &cache, Contents::DESC | Contents::DEPENDS, Compression::Gzip).unwrap();

        let loaded = load(&db_path).unwrap();
        let names: Vec<&str> = loaded.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["zlib", "bash", "coreutils"]);
        assert_eq!(loaded[1].version, "5.2-1");
        assert_eq!(loaded[1].filename, "bash-5.2-1-x86_64.pkg.tar.zst");
        // File lists are only written when requested
        assert!(loaded[0].files.is_empty());
    }

    #[test]
    fn test_files_database_carries_file_lists() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.files.tar.xz");

        let mut cache = PackageCache::with_capacity(1);
        cache.insert(package("zlib", "1.3-1"));
        save(&db_path, &cache, Contents::DESC | Contents::FILES, Compression::Xz).unwrap();

        let loaded = load(&db_path).unwrap();
        assert_eq!(loaded[0].files, vec!["usr/bin/zlib".to_string()]);
    }

    #[test]
    fn test_entry_without_name_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("broken.db.tar");

        let mut builder = Builder::new(Vec::new());
        append_file(&mut builder, "foo-1.0-1", "desc", "%VERSION%\n1.0-1\n\n", 0).unwrap();
        fs::write(&db_path, builder.into_inner().unwrap()).unwrap();

        assert!(matches!(load(&db_path), Err(Error::DatabaseError(_))));
    }

    #[test]
    fn test_load_missing_database() {
        let result = load(Path::new("/nonexistent/repo.db.tar.gz"));
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
