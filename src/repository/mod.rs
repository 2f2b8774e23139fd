// src/repository/mod.rs

//! Repository aggregate
//!
//! A repository is a database file (plus optional files database and
//! signatures), the pool directory holding the package archives, and the
//! in-memory cache of records read from the database. This module resolves
//! the paths from the database path given on the command line, tracks
//! whether the cache has diverged from disk, and writes it back out.

pub mod reconcile;
pub mod scan;

pub use reconcile::Outcome;

use crate::cache::PackageCache;
use crate::compression::Compression;
use crate::config::Config;
use crate::db::models::Package;
use crate::db::{self, Contents};
use crate::error::{Error, Result};
use crate::signing::Signer;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Lifecycle of the in-memory cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoState {
    /// No database on disk, or a rebuild was requested
    New,
    /// Cache matches the database on disk
    Clean,
    /// Cache has changes not yet written
    Dirty,
}

/// What `Repository::write` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Nothing was ever loaded or added
    Empty,
    /// Database on disk is already current
    Unchanged,
    Written,
}

/// File names (relative to the repository root) of one database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbFiles {
    /// `<name>.<kind><ext>`
    pub file: String,
    /// `<file>.sig`
    pub sig: String,
    /// `<name>.<kind>`, a symlink to `file`
    pub link_file: String,
    /// `<name>.<kind>.sig`, a symlink to `sig`
    pub link_sig: String,
}

impl DbFiles {
    fn new(name: &str, kind: &str, ext: &str) -> Self {
        let file = format!("{}.{}{}", name, kind, ext);
        let link_file = format!("{}.{}", name, kind);
        Self {
            sig: format!("{}.sig", file),
            link_sig: format!("{}.sig", link_file),
            file,
            link_file,
        }
    }
}

/// An opened repository
#[derive(Debug)]
pub struct Repository {
    /// Repository name, the database file name up to its first dot
    pub name: String,
    /// Directory holding the database files
    pub root: PathBuf,
    /// Canonical directory holding the package archives
    pub pool: PathBuf,
    pub compression: Compression,
    pub db: DbFiles,
    pub files: DbFiles,
    pub cache: PackageCache,
    state: RepoState,
    pool_estimate: usize,
}

impl Repository {
    /// Resolve paths from `db_path` and load any existing database
    pub fn open(db_path: &Path, cfg: &Config) -> Result<Self> {
        let db_path = match fs::canonicalize(db_path) {
            Ok(path) => path,
            Err(e) if e.kind() == io::ErrorKind::NotFound => db_path.to_path_buf(),
            Err(e) => {
                return Err(Error::InvalidRepoPath(format!(
                    "{}: {}",
                    db_path.display(),
                    e
                )));
            }
        };

        let file_name = db_path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                Error::InvalidRepoPath(format!("{}: invalid database name", db_path.display()))
            })?;

        let (name, extension) = file_name.split_once('.').ok_or_else(|| {
            Error::InvalidRepoPath(format!("{}: no file extension", file_name))
        })?;
        let suffix = extension.strip_prefix("db").ok_or_else(|| {
            Error::InvalidRepoPath(format!("{}: invalid repo type", file_name))
        })?;
        let compression = Compression::from_db_suffix(suffix)?;
        let ext = if suffix.is_empty() { ".tar.gz" } else { suffix };

        let root = match db_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => std::env::current_dir()?,
        };
        if !root.is_dir() {
            return Err(Error::PoolError(format!(
                "{}: repository root is not an accessible directory",
                root.display()
            )));
        }

        let pool = cfg.pool.clone().unwrap_or_else(|| root.clone());
        let pool = fs::canonicalize(&pool)
            .map_err(|e| Error::PoolError(format!("{}: {}", pool.display(), e)))?;
        let pool_estimate = count_regular_files(&pool)?;

        let mut repo = Self {
            name: name.to_string(),
            db: DbFiles::new(name, "db", ext),
            files: DbFiles::new(name, "files", ext),
            root,
            pool,
            compression,
            cache: PackageCache::with_capacity(pool_estimate),
            state: RepoState::New,
            pool_estimate,
        };

        debug!(
            "Repository {}: root {}, pool {}, {:?}",
            repo.name,
            repo.root.display(),
            repo.pool.display(),
            repo.compression
        );

        if cfg.rebuild {
            info!("Rebuild requested, ignoring existing database");
        } else if repo.root_path(&repo.db.file).try_exists()? {
            cfg.colon("Reading existing database into memory...");
            repo.load(cfg)?;
            repo.state = RepoState::Clean;
        }

        Ok(repo)
    }

    fn load(&mut self, cfg: &Config) -> Result<()> {
        for pkg in db::load(&self.root_path(&self.db.file))? {
            self.cache.insert(pkg);
        }

        let files_path = self.root_path(&self.files.file);
        if cfg.files && files_path.try_exists()? {
            for listed in db::load(&files_path)? {
                if let Some(pkg) = self.cache.find_mut(&listed.name) {
                    pkg.files = listed.files;
                }
            }
        }

        debug!("Cache holds {} records from {}", self.cache.len(), self.db.file);
        Ok(())
    }

    pub fn state(&self) -> RepoState {
        self.state
    }

    /// Number of regular files seen in the pool when the repository was opened
    pub fn pool_estimate(&self) -> usize {
        self.pool_estimate
    }

    /// Path of a database file in the repository root
    pub fn root_path(&self, file: &str) -> PathBuf {
        self.root.join(file)
    }

    /// Path of an archive (or its signature) in the pool
    pub fn pool_path(&self, file: &str) -> PathBuf {
        self.pool.join(file)
    }

    /// Reconcile one record into the cache, marking the repository dirty
    /// when the record was accepted
    pub fn upsert(&mut self, pkg: Package, force: bool) -> Outcome {
        let outcome = reconcile::upsert(&mut self.cache, pkg, force);
        if outcome.is_accepted() {
            self.state = RepoState::Dirty;
        }
        outcome
    }

    /// Remove a record from the cache, marking the repository dirty
    pub fn remove(&mut self, name: &str) -> Option<Package> {
        let removed = self.cache.remove(name);
        if removed.is_some() {
            self.state = RepoState::Dirty;
        }
        removed
    }

    /// Drop records whose archive has disappeared from the pool
    pub fn reduce(&mut self) -> Vec<Package> {
        let missing: Vec<String> = self
            .cache
            .iter()
            .filter(|pkg| !self.pool_path(&pkg.filename).exists())
            .map(|pkg| pkg.name.clone())
            .collect();

        missing.iter().filter_map(|name| self.remove(name)).collect()
    }

    /// Delete a record's archive and signature from the pool
    ///
    /// Returns `false` without touching anything when the archive is
    /// already gone.
    pub fn unlink_package(&self, pkg: &Package) -> Result<bool> {
        let archive = self.pool_path(&pkg.filename);
        if !archive.try_exists()? {
            return Ok(false);
        }

        println!("deleting {} {}", pkg.name, pkg.version);
        remove_if_present(&archive)?;
        remove_if_present(&self.pool_path(&pkg.signature_name()))?;
        Ok(true)
    }

    /// Persist the cache if it changed
    pub fn write(&self, cfg: &Config, signer: &dyn Signer) -> Result<WriteOutcome> {
        match self.state {
            RepoState::New => {
                println!("repo empty!");
                return Ok(WriteOutcome::Empty);
            }
            RepoState::Clean => {
                println!("repo does not need updating");
                return Ok(WriteOutcome::Unchanged);
            }
            RepoState::Dirty => {}
        }

        cfg.colon("Writing databases to disk...");
        self.write_db(cfg, signer, &self.db, Contents::DESC | Contents::DEPENDS)?;
        if cfg.files {
            self.write_db(cfg, signer, &self.files, Contents::DESC | Contents::FILES)?;
        }
        println!("repo updated successfully");

        Ok(WriteOutcome::Written)
    }

    fn write_db(
        &self,
        cfg: &Config,
        signer: &dyn Signer,
        files: &DbFiles,
        contents: Contents,
    ) -> Result<()> {
        println!("writing {}...", files.file);

        let path = self.root_path(&files.file);
        db::save(&path, &self.cache, contents, self.compression)?;
        self.replace_link(&files.file, &files.link_file)?;

        if cfg.sign {
            let signature = signer.sign(&path, cfg.key.as_deref())?;
            debug!("Signed {} into {}", files.file, signature.display());
            self.replace_link(&files.sig, &files.link_sig)?;
        }
        Ok(())
    }

    /// Point `link` at `target`, both relative to the root
    fn replace_link(&self, target: &str, link: &str) -> Result<()> {
        let link_path = self.root_path(link);
        remove_if_present(&link_path)?;
        symlink(Path::new(target), &link_path).map_err(|e| {
            Error::DatabaseError(format!("Failed to link {} to {}: {}", link, target, e))
        })
    }
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(not(unix))]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    let dir = link.parent().unwrap_or_else(|| Path::new("."));
    fs::copy(dir.join(target), link).map(|_| ())
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn count_regular_files(dir: &Path) -> Result<usize> {
    let entries = fs::read_dir(dir)
        .map_err(|e| Error::PoolError(format!("Failed to open pool {}: {}", dir.display(), e)))?;

    let mut count = 0;
    for entry in entries {
        if entry?.file_type()?.is_file() {
            count += 1;
        }
    }
    Ok(count)
}

/// Signer used where signing must not happen
#[cfg(test)]
pub(crate) struct NoSigner;

#[cfg(test)]
impl Signer for NoSigner {
    fn sign(&self, file: &Path, _key: Option<&str>) -> Result<PathBuf> {
        Err(Error::SignatureError(format!(
            "unexpected signing of {}",
            file.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing;

    fn config() -> Config {
        Config {
            arch: "x86_64".to_string(),
            ..Config::default()
        }
    }

    fn pkg(name: &str, version: &str) -> Package {
        let mut pkg = Package::new(name.to_string(), version.to_string(), "x86_64".to_string());
        pkg.filename = format!("{}-{}-x86_64.pkg.tar.zst", name, version);
        pkg
    }

    /// Signer writing a placeholder signature next to the file
    struct FakeSigner;

    impl Signer for FakeSigner {
        fn sign(&self, file: &Path, _key: Option<&str>) -> Result<PathBuf> {
            let sig = signing::signature_path(file);
            fs::write(&sig, b"sig")?;
            Ok(sig)
        }
    }

    #[test]
    fn test_path_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::open(&dir.path().join("custom.db.tar.xz"), &config()).unwrap();

        assert_eq!(repo.name, "custom");
        assert_eq!(repo.compression, Compression::Xz);
        assert_eq!(repo.db.file, "custom.db.tar.xz");
        assert_eq!(repo.db.sig, "custom.db.tar.xz.sig");
        assert_eq!(repo.db.link_file, "custom.db");
        assert_eq!(repo.db.link_sig, "custom.db.sig");
        assert_eq!(repo.files.file, "custom.files.tar.xz");
        assert_eq!(repo.files.link_file, "custom.files");
        assert_eq!(repo.pool, fs::canonicalize(dir.path()).unwrap());
        assert_eq!(repo.state(), RepoState::New);
    }

    #[test]
    fn test_bare_db_suffix_defaults_to_gzip() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::open(&dir.path().join("core.db"), &config()).unwrap();

        assert_eq!(repo.compression, Compression::Gzip);
        assert_eq!(repo.db.file, "core.db.tar.gz");
        assert_eq!(repo.db.link_file, "core.db");
    }

    #[test]
    fn test_invalid_database_names() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config();

        assert!(matches!(
            Repository::open(&dir.path().join("noextension"), &cfg),
            Err(Error::InvalidRepoPath(_))
        ));
        assert!(matches!(
            Repository::open(&dir.path().join("repo.files.tar.gz"), &cfg),
            Err(Error::InvalidRepoPath(_))
        ));
        assert!(matches!(
            Repository::open(&dir.path().join("repo.db.tar.rar"), &cfg),
            Err(Error::InvalidRepoPath(_))
        ));
        assert!(matches!(
            Repository::open(&dir.path().join("repo.db.tar.Z"), &cfg),
            Err(Error::UnsupportedCompression(_))
        ));
    }

    #[test]
    fn test_missing_pool_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config {
            pool: Some(dir.path().join("nowhere")),
            ..config()
        };
        assert!(matches!(
            Repository::open(&dir.path().join("test.db"), &cfg),
            Err(Error::PoolError(_))
        ));
    }

    #[test]
    fn test_pool_estimate_counts_regular_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.pkg.tar.zst"), b"").unwrap();
        fs::write(dir.path().join("b.pkg.tar.zst"), b"").unwrap();
        fs::create_dir(dir.path().join("subdir")).unwrap();

        let repo = Repository::open(&dir.path().join("test.db"), &config()).unwrap();
        assert_eq!(repo.pool_estimate(), 2);
    }

    #[test]
    fn test_write_states() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config();
        let path = dir.path().join("test.db.tar.gz");

        let mut repo = Repository::open(&path, &cfg).unwrap();
        assert_eq!(repo.write(&cfg, &NoSigner).unwrap(), WriteOutcome::Empty);
        assert!(!path.exists());

        repo.upsert(pkg("foo", "1.0-1"), false);
        assert_eq!(repo.state(), RepoState::Dirty);
        assert_eq!(repo.write(&cfg, &NoSigner).unwrap(), WriteOutcome::Written);
        assert!(path.exists());

        let link = dir.path().join("test.db");
        assert_eq!(fs::read_link(&link).unwrap(), PathBuf::from("test.db.tar.gz"));
        assert!(!dir.path().join("test.files.tar.gz").exists());

        let reopened = Repository::open(&path, &cfg).unwrap();
        assert_eq!(reopened.state(), RepoState::Clean);
        assert_eq!(reopened.cache.find("foo").unwrap().version, "1.0-1");
        assert_eq!(reopened.write(&cfg, &NoSigner).unwrap(), WriteOutcome::Unchanged);
    }

    #[test]
    fn test_rejected_upsert_leaves_repo_clean() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config();
        let path = dir.path().join("test.db.tar.gz");

        let mut repo = Repository::open(&path, &cfg).unwrap();
        repo.upsert(pkg("foo", "2.0-1"), false);
        repo.write(&cfg, &NoSigner).unwrap();

        let mut repo = Repository::open(&path, &cfg).unwrap();
        let outcome = repo.upsert(pkg("foo", "1.0-1"), false);
        assert!(!outcome.is_accepted());
        assert_eq!(repo.state(), RepoState::Clean);
    }

    #[test]
    fn test_rebuild_ignores_existing_database() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config();
        let path = dir.path().join("test.db.tar.gz");

        let mut repo = Repository::open(&path, &cfg).unwrap();
        repo.upsert(pkg("foo", "1.0-1"), false);
        repo.write(&cfg, &NoSigner).unwrap();

        let rebuild = Config {
            rebuild: true,
            ..config()
        };
        let repo = Repository::open(&path, &rebuild).unwrap();
        assert_eq!(repo.state(), RepoState::New);
        assert!(repo.cache.is_empty());
    }

    #[test]
    fn test_files_database_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config {
            files: true,
            ..config()
        };
        let path = dir.path().join("test.db.tar.gz");

        let mut repo = Repository::open(&path, &cfg).unwrap();
        let mut foo = pkg("foo", "1.0-1");
        foo.files = vec!["usr/".to_string(), "usr/bin/foo".to_string()];
        repo.upsert(foo, false);
        repo.write(&cfg, &NoSigner).unwrap();

        assert!(dir.path().join("test.files.tar.gz").exists());
        assert!(dir.path().join("test.files").exists());

        let reopened = Repository::open(&path, &cfg).unwrap();
        assert_eq!(reopened.cache.find("foo").unwrap().files.len(), 2);

        // Without the files flag the lists are not merged in
        let plain = Repository::open(&path, &config()).unwrap();
        assert!(plain.cache.find("foo").unwrap().files.is_empty());
    }

    #[test]
    fn test_signed_write_links_signature() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config {
            sign: true,
            ..config()
        };
        let path = dir.path().join("test.db.tar.gz");

        let mut repo = Repository::open(&path, &cfg).unwrap();
        repo.upsert(pkg("foo", "1.0-1"), false);
        repo.write(&cfg, &FakeSigner).unwrap();

        assert!(dir.path().join("test.db.tar.gz.sig").exists());
        assert_eq!(
            fs::read_link(dir.path().join("test.db.sig")).unwrap(),
            PathBuf::from("test.db.tar.gz.sig")
        );
    }

    #[test]
    fn test_reduce_drops_missing_archives() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config();
        let path = dir.path().join("test.db.tar.gz");

        let present = pkg("foo", "1.0-1");
        fs::write(dir.path().join(&present.filename), b"archive").unwrap();

        let mut repo = Repository::open(&path, &cfg).unwrap();
        repo.upsert(present, false);
        repo.upsert(pkg("gone", "1.0-1"), false);
        repo.write(&cfg, &NoSigner).unwrap();

        let mut repo = Repository::open(&path, &cfg).unwrap();
        let dropped = repo.reduce();
        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped[0].name, "gone");
        assert_eq!(repo.state(), RepoState::Dirty);
        assert!(repo.cache.contains("foo"));
    }

    #[test]
    fn test_unlink_removes_archive_and_signature() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::open(&dir.path().join("test.db"), &config()).unwrap();

        let foo = pkg("foo", "1.0-1");
        fs::write(dir.path().join(&foo.filename), b"archive").unwrap();
        fs::write(dir.path().join(foo.signature_name()), b"sig").unwrap();

        assert!(repo.unlink_package(&foo).unwrap());
        assert!(!dir.path().join(&foo.filename).exists());
        assert!(!dir.path().join(foo.signature_name()).exists());
    }

    #[test]
    fn test_unlink_missing_archive_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::open(&dir.path().join("test.db"), &config()).unwrap();

        let foo = pkg("foo", "1.0-1");
        fs::write(dir.path().join(foo.signature_name()), b"sig").unwrap();

        assert!(!repo.unlink_package(&foo).unwrap());
        // The signature is left alone as well
        assert!(dir.path().join(foo.signature_name()).exists());
    }
}
