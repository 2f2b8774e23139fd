// src/db/models.rs

//! Data model for repository database entries

/// Suffix of a detached package signature
pub const SIGNATURE_SUFFIX: &str = ".sig";

/// One package archive's identity and provenance
///
/// Records are produced by the metadata loader (or read back from the
/// database) and owned by exactly one cache slot at a time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Package {
    /// Archive file name inside the pool
    pub filename: String,
    pub name: String,
    pub base: Option<String>,
    pub version: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub packager: Option<String>,
    pub architecture: String,
    /// Seconds since the epoch
    pub build_date: i64,
    pub compressed_size: u64,
    pub installed_size: u64,
    pub md5sum: Option<String>,
    pub sha256sum: Option<String>,
    /// Base64 encoded detached signature
    pub pgp_signature: Option<String>,
    pub licenses: Vec<String>,
    pub groups: Vec<String>,
    pub replaces: Vec<String>,
    pub depends: Vec<String>,
    pub conflicts: Vec<String>,
    pub provides: Vec<String>,
    pub optdepends: Vec<String>,
    pub makedepends: Vec<String>,
    pub checkdepends: Vec<String>,
    pub files: Vec<String>,
}

impl Package {
    /// Create a record with the identifying fields set
    pub fn new(name: String, version: String, architecture: String) -> Self {
        Self {
            name,
            version,
            architecture,
            ..Default::default()
        }
    }

    /// Name of the detached signature companion file
    pub fn signature_name(&self) -> String {
        format!("{}{}", self.filename, SIGNATURE_SUFFIX)
    }

    /// True once a signature payload is attached
    pub fn has_signature(&self) -> bool {
        self.pgp_signature.is_some()
    }

    /// `name-version`, the form globs are matched against and the
    /// database entry directory name
    pub fn full_name(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }

    /// Whether this record may enter a cache for `target_arch`
    pub fn is_compatible(&self, target_arch: &str) -> bool {
        self.architecture == target_arch || self.architecture == "any"
    }
}
