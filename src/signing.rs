// src/signing.rs

//! Detached OpenPGP signatures
//!
//! Package signatures are read from `<archive>.sig`, checked to be a
//! well-formed OpenPGP signature and embedded (base64) into the database.
//! Creating and checking signatures against a keyring is delegated to GnuPG.

use crate::error::{Error, Result};
use base64::Engine as _;
use sequoia_openpgp::parse::Parse;
use sequoia_openpgp::{Packet, PacketPile};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Produces detached signatures for written databases
pub trait Signer {
    /// Sign `file`, returning the path of the created signature
    fn sign(&self, file: &Path, key: Option<&str>) -> Result<PathBuf>;
}

/// Checks a package archive against its detached signature
pub trait Verifier {
    fn verify(&self, archive: &Path, signature: &Path) -> Result<()>;
}

/// GnuPG command line backend
#[derive(Debug, Clone)]
pub struct Gpg {
    program: OsString,
}

impl Gpg {
    pub fn new() -> Self {
        Self {
            program: OsString::from("gpg"),
        }
    }

    /// Use a specific gpg binary
    pub fn with_program(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run(&self, command: &mut Command, what: &str) -> Result<()> {
        let output = command.output().map_err(|e| {
            Error::SignatureError(format!("Failed to run {:?}: {}", self.program, e))
        })?;

        if !output.status.success() {
            return Err(Error::SignatureError(format!(
                "{} failed: {}",
                what,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

impl Default for Gpg {
    fn default() -> Self {
        Self::new()
    }
}

impl Signer for Gpg {
    fn sign(&self, file: &Path, key: Option<&str>) -> Result<PathBuf> {
        let signature = signature_path(file);
        debug!("Signing {} into {}", file.display(), signature.display());

        let mut command = Command::new(&self.program);
        command.args(["--batch", "--yes", "--detach-sign", "--use-agent", "--no-armor"]);
        if let Some(key) = key {
            command.args(["--local-user", key]);
        }
        command.arg("--output").arg(&signature).arg(file);

        self.run(&mut command, &format!("Signing {}", file.display()))?;
        Ok(signature)
    }
}

impl Verifier for Gpg {
    fn verify(&self, archive: &Path, signature: &Path) -> Result<()> {
        debug!("Verifying {} against {}", archive.display(), signature.display());

        let mut command = Command::new(&self.program);
        command
            .args(["--batch", "--verify"])
            .arg(signature)
            .arg(archive);

        self.run(&mut command, &format!("Verifying {}", archive.display()))
    }
}

/// `<file>.sig`
pub fn signature_path(file: &Path) -> PathBuf {
    let mut name = file.as_os_str().to_owned();
    name.push(".sig");
    PathBuf::from(name)
}

/// Read a detached signature file for embedding into the database
///
/// Returns `Ok(None)` when the file does not exist. Any other read failure,
/// or content that is not an OpenPGP signature, is an error.
pub fn read_signature(path: &Path) -> Result<Option<String>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(Error::SignatureError(format!(
                "Failed to open {}: {}",
                path.display(),
                e
            )));
        }
    };

    validate_signature(&bytes)
        .map_err(|e| Error::SignatureError(format!("{}: {}", path.display(), e)))?;

    Ok(Some(base64::engine::general_purpose::STANDARD.encode(&bytes)))
}

/// Check that `bytes` parse as OpenPGP data holding a signature packet
fn validate_signature(bytes: &[u8]) -> std::result::Result<(), String> {
    let pile = PacketPile::from_bytes(bytes).map_err(|e| format!("not OpenPGP data ({})", e))?;

    if pile
        .descendants()
        .any(|packet| matches!(packet, Packet::Signature(_)))
    {
        Ok(())
    } else {
        Err("no signature packet found".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_path() {
        assert_eq!(
            signature_path(Path::new("/srv/repo/foo.db.tar.gz")),
            PathBuf::from("/srv/repo/foo.db.tar.gz.sig")
        );
    }

    #[test]
    fn test_missing_signature_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_signature(&dir.path().join("foo.pkg.tar.zst.sig")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_garbage_signature_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foo.pkg.tar.zst.sig");
        fs::write(&path, b"definitely not a signature").unwrap();

        assert!(matches!(read_signature(&path), Err(Error::SignatureError(_))));
    }

    #[test]
    fn test_missing_gpg_binary_is_a_signature_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("repo.db.tar.gz");
        fs::write(&file, b"data").unwrap();

        let gpg = Gpg::with_program("/nonexistent/gpg");
        assert!(matches!(gpg.sign(&file, None), Err(Error::SignatureError(_))));
    }
}
