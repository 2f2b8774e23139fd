// src/repository/scan.rs

//! Pool scanning
//!
//! Turns the pool directory (or an explicit list of archives) into a fresh
//! cache of candidate records, ready to be reconciled into the repository.

use super::reconcile;
use super::Repository;
use crate::cache::PackageCache;
use crate::config::Config;
use crate::db::models::Package;
use crate::error::{Error, Result};
use crate::matcher::{self, Target};
use crate::packages::PackageLoader;
use crate::signing;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Whether `filename` looks like a package archive
///
/// Matches `*.pkg.tar*` case-insensitively, excluding detached signatures.
pub fn is_package_filename(filename: &str) -> bool {
    let lower = filename.to_ascii_lowercase();
    lower.contains(".pkg.tar") && !lower.ends_with(".sig")
}

/// Candidates found by a scan
#[derive(Debug, Default)]
pub struct Collected {
    /// Winning record per package name
    pub packages: PackageCache,
    /// Records that lost a version comparison against another archive
    pub discarded: Vec<Package>,
}

impl Collected {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            packages: PackageCache::with_capacity(capacity),
            discarded: Vec::new(),
        }
    }

    fn offer(&mut self, pkg: Package) {
        if let Some(loser) = reconcile::upsert(&mut self.packages, pkg, false).into_loser() {
            debug!("Discarding {} {}", loser.name, loser.version);
            self.discarded.push(loser);
        }
    }
}

/// Build the candidate cache for an update
///
/// Without arguments every archive in the pool is considered. Arguments
/// starting with `/` or `.` name archives directly and must live in the
/// pool; any other argument is a name or glob filtering the pool scan.
/// Duplicates within the scan are settled with the regular (unforced) policy
/// and the losers are kept in [`Collected::discarded`].
pub fn collect(
    repo: &Repository,
    cfg: &Config,
    loader: &dyn PackageLoader,
    args: &[String],
) -> Result<Collected> {
    if args.is_empty() {
        let mut collected = Collected::with_capacity(repo.pool_estimate());
        scan_pool(repo, cfg, loader, None, &mut collected)?;
        return Ok(collected);
    }

    let mut collected = Collected::with_capacity(args.len());
    let mut targets = Vec::new();

    for arg in args {
        if arg.starts_with('/') || arg.starts_with('.') {
            if let Some(pkg) = load_explicit(repo, cfg, loader, arg)? {
                collected.offer(pkg);
            }
        } else {
            targets.push(Target::new(arg.as_str()));
        }
    }

    if !targets.is_empty() {
        scan_pool(repo, cfg, loader, Some(&targets), &mut collected)?;
    }

    Ok(collected)
}

/// Load every package archive in the pool, optionally filtered by `targets`
///
/// Archives that fail to load are skipped.
fn scan_pool(
    repo: &Repository,
    cfg: &Config,
    loader: &dyn PackageLoader,
    targets: Option<&[Target]>,
    collected: &mut Collected,
) -> Result<()> {
    let entries = fs::read_dir(&repo.pool).map_err(|e| {
        Error::PoolError(format!("Failed to open pool {}: {}", repo.pool.display(), e))
    })?;

    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }

        let Ok(filename) = entry.file_name().into_string() else {
            debug!("Skipping non UTF-8 file name {:?}", entry.file_name());
            continue;
        };
        if !is_package_filename(&filename) {
            continue;
        }

        let mut pkg = match loader.load(&entry.path()) {
            Ok(pkg) => pkg,
            Err(e) => {
                warn!("skipping {}: {}", filename, e);
                continue;
            }
        };
        pkg.filename = filename;

        if let Some(targets) = targets {
            if !matcher::match_targets(&pkg, targets) {
                continue;
            }
        }

        if let Some(pkg) = admit(repo, cfg, pkg)? {
            collected.offer(pkg);
        }
    }

    Ok(())
}

/// Load an archive named by path on the command line
///
/// Returns `Ok(None)` when the archive lives outside the pool or targets a
/// foreign architecture. An archive that cannot be read is an error.
fn load_explicit(
    repo: &Repository,
    cfg: &Config,
    loader: &dyn PackageLoader,
    arg: &str,
) -> Result<Option<Package>> {
    let path = Path::new(arg);

    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| Error::NotFound(format!("{}: not a package file", arg)))?
        .to_string();

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let parent = fs::canonicalize(parent)
        .map_err(|e| Error::NotFound(format!("{}: {}", arg, e)))?;

    if parent != repo.pool {
        warn!("{} is not in the same path as the database", arg);
        return Ok(None);
    }

    let mut pkg = loader.load(&repo.pool.join(&filename)).map_err(|e| match e {
        Error::Io(io) => Error::NotFound(format!("failed to open {}: {}", arg, io)),
        other => other,
    })?;
    pkg.filename = filename;

    admit(repo, cfg, pkg)
}

/// Apply the architecture filter and attach the signature
fn admit(repo: &Repository, cfg: &Config, mut pkg: Package) -> Result<Option<Package>> {
    if !pkg.is_compatible(&cfg.arch) {
        debug!(
            "Skipping {} ({}), repository architecture is {}",
            pkg.filename, pkg.architecture, cfg.arch
        );
        return Ok(None);
    }

    pkg.pgp_signature = signing::read_signature(&repo.pool.join(pkg.signature_name()))?;
    Ok(Some(pkg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::path::PathBuf;

    /// Loader serving records keyed by file name
    struct FakeLoader {
        packages: HashMap<String, Package>,
        loaded: RefCell<Vec<PathBuf>>,
    }

    impl FakeLoader {
        fn new(entries: &[(&str, &str, &str, &str)]) -> Self {
            let packages = entries
                .iter()
                .map(|(file, name, version, arch)| {
                    (
                        file.to_string(),
                        Package::new(name.to_string(), version.to_string(), arch.to_string()),
                    )
                })
                .collect();
            Self {
                packages,
                loaded: RefCell::new(Vec::new()),
            }
        }
    }

    impl PackageLoader for FakeLoader {
        fn load(&self, path: &Path) -> Result<Package> {
            self.loaded.borrow_mut().push(path.to_path_buf());
            let name = path.file_name().unwrap().to_string_lossy().to_string();
            if !path.exists() {
                return Err(Error::Io(std::io::Error::from(std::io::ErrorKind::NotFound)));
            }
            self.packages
                .get(&name)
                .cloned()
                .ok_or_else(|| Error::ParseError(format!("{}: no .PKGINFO", name)))
        }
    }

    fn setup(files: &[&str]) -> (tempfile::TempDir, Repository, Config) {
        let dir = tempfile::tempdir().unwrap();
        for file in files {
            fs::write(dir.path().join(file), b"archive").unwrap();
        }
        let cfg = Config {
            arch: "x86_64".to_string(),
            ..Config::default()
        };
        let repo = Repository::open(&dir.path().join("test.db.tar.gz"), &cfg).unwrap();
        (dir, repo, cfg)
    }

    #[test]
    fn test_package_filename_pattern() {
        assert!(is_package_filename("foo-1.0-1-x86_64.pkg.tar.zst"));
        assert!(is_package_filename("FOO-1.0-1-any.PKG.TAR.XZ"));
        assert!(is_package_filename("foo-1.0-1-any.pkg.tar"));
        assert!(!is_package_filename("foo-1.0-1-any.pkg.tar.zst.sig"));
        assert!(!is_package_filename("foo-1.0-1-any.pkg.tar.zst.SIG"));
        assert!(!is_package_filename("test.db.tar.gz"));
        assert!(!is_package_filename("README"));
    }

    #[test]
    fn test_full_scan_filters_by_arch() {
        let (_dir, repo, cfg) = setup(&[
            "foo-1.0-1-x86_64.pkg.tar.zst",
            "bar-1.0-1-any.pkg.tar.zst",
            "baz-1.0-1-aarch64.pkg.tar.zst",
            "notes.txt",
        ]);
        let loader = FakeLoader::new(&[
            ("foo-1.0-1-x86_64.pkg.tar.zst", "foo", "1.0-1", "x86_64"),
            ("bar-1.0-1-any.pkg.tar.zst", "bar", "1.0-1", "any"),
            ("baz-1.0-1-aarch64.pkg.tar.zst", "baz", "1.0-1", "aarch64"),
        ]);

        let cache = collect(&repo, &cfg, &loader, &[]).unwrap().packages;
        assert_eq!(cache.len(), 2);
        assert!(cache.contains("foo"));
        assert!(cache.contains("bar"));
        assert_eq!(
            cache.find("foo").unwrap().filename,
            "foo-1.0-1-x86_64.pkg.tar.zst"
        );
        // notes.txt never reaches the loader
        assert_eq!(loader.loaded.borrow().len(), 3);
    }

    #[test]
    fn test_full_scan_skips_broken_archives() {
        let (_dir, repo, cfg) = setup(&["foo-1.0-1-x86_64.pkg.tar.zst", "junk.pkg.tar.zst"]);
        let loader = FakeLoader::new(&[("foo-1.0-1-x86_64.pkg.tar.zst", "foo", "1.0-1", "x86_64")]);

        let cache = collect(&repo, &cfg, &loader, &[]).unwrap().packages;
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_scan_keeps_newest_duplicate() {
        let (_dir, repo, cfg) = setup(&["foo-1.0-1-x86_64.pkg.tar.zst", "foo-1.1-1-x86_64.pkg.tar.zst"]);
        let loader = FakeLoader::new(&[
            ("foo-1.0-1-x86_64.pkg.tar.zst", "foo", "1.0-1", "x86_64"),
            ("foo-1.1-1-x86_64.pkg.tar.zst", "foo", "1.1-1", "x86_64"),
        ]);

        let collected = collect(&repo, &cfg, &loader, &[]).unwrap();
        assert_eq!(collected.packages.len(), 1);
        assert_eq!(collected.packages.find("foo").unwrap().version, "1.1-1");
        assert_eq!(collected.discarded.len(), 1);
        assert_eq!(collected.discarded[0].filename, "foo-1.0-1-x86_64.pkg.tar.zst");
    }

    #[test]
    fn test_name_arguments_filter_scan() {
        let (_dir, repo, cfg) = setup(&["foo-1.0-1-x86_64.pkg.tar.zst", "bar-1.0-1-x86_64.pkg.tar.zst"]);
        let loader = FakeLoader::new(&[
            ("foo-1.0-1-x86_64.pkg.tar.zst", "foo", "1.0-1", "x86_64"),
            ("bar-1.0-1-x86_64.pkg.tar.zst", "bar", "1.0-1", "x86_64"),
        ]);

        let cache = collect(&repo, &cfg, &loader, &["b*".to_string()]).unwrap().packages;
        assert_eq!(cache.len(), 1);
        assert!(cache.contains("bar"));

        let by_file = vec!["foo-1.0-1-x86_64.pkg.tar.zst".to_string()];
        let cache = collect(&repo, &cfg, &loader, &by_file).unwrap().packages;
        assert_eq!(cache.len(), 1);
        assert!(cache.contains("foo"));
    }

    #[test]
    fn test_explicit_path_in_pool() {
        let (dir, repo, cfg) = setup(&["foo-1.0-1-x86_64.pkg.tar.zst", "bar-1.0-1-x86_64.pkg.tar.zst"]);
        let loader = FakeLoader::new(&[
            ("foo-1.0-1-x86_64.pkg.tar.zst", "foo", "1.0-1", "x86_64"),
            ("bar-1.0-1-x86_64.pkg.tar.zst", "bar", "1.0-1", "x86_64"),
        ]);

        let arg = dir
            .path()
            .join("foo-1.0-1-x86_64.pkg.tar.zst")
            .to_string_lossy()
            .to_string();
        let cache = collect(&repo, &cfg, &loader, &[arg]).unwrap().packages;
        assert_eq!(cache.len(), 1);
        assert!(cache.contains("foo"));
    }

    #[test]
    fn test_explicit_path_outside_pool_is_skipped() {
        let (_dir, repo, cfg) = setup(&[]);
        let elsewhere = tempfile::tempdir().unwrap();
        let path = elsewhere.path().join("foo-1.0-1-x86_64.pkg.tar.zst");
        fs::write(&path, b"archive").unwrap();
        let loader = FakeLoader::new(&[("foo-1.0-1-x86_64.pkg.tar.zst", "foo", "1.0-1", "x86_64")]);

        let cache = collect(&repo, &cfg, &loader, &[path.to_string_lossy().to_string()])
            .unwrap()
            .packages;
        assert!(cache.is_empty());
        assert!(loader.loaded.borrow().is_empty());
    }

    #[test]
    fn test_explicit_missing_file_is_fatal() {
        let (dir, repo, cfg) = setup(&[]);
        let loader = FakeLoader::new(&[]);

        let arg = dir
            .path()
            .join("ghost-1.0-1-x86_64.pkg.tar.zst")
            .to_string_lossy()
            .to_string();
        assert!(matches!(
            collect(&repo, &cfg, &loader, &[arg]),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_malformed_signature_is_fatal() {
        let (dir, repo, cfg) = setup(&["foo-1.0-1-x86_64.pkg.tar.zst"]);
        fs::write(dir.path().join("foo-1.0-1-x86_64.pkg.tar.zst.sig"), b"garbage").unwrap();
        let loader = FakeLoader::new(&[("foo-1.0-1-x86_64.pkg.tar.zst", "foo", "1.0-1", "x86_64")]);

        assert!(matches!(
            collect(&repo, &cfg, &loader, &[]),
            Err(Error::SignatureError(_))
        ));
    }
}
