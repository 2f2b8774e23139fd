// src/hash.rs

//! Checksum utilities for package archives

use crate::error::Result;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const BUFFER_SIZE: usize = 64 * 1024;

/// Both checksums of one file, computed in a single pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checksums {
    pub md5: String,
    pub sha256: String,
}

/// Compute MD5 and SHA-256 of a file
pub fn checksum_file(path: &Path) -> Result<Checksums> {
    let file = File::open(path)?;
    checksum_reader(file)
}

/// Compute MD5 and SHA-256 of everything readable from `reader`
pub fn checksum_reader<R: Read>(mut reader: R) -> Result<Checksums> {
    let mut md5 = md5::Context::new();
    let mut sha256 = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        md5.consume(&buffer[..bytes_read]);
        sha256.update(&buffer[..bytes_read]);
    }

    Ok(Checksums {
        md5: format!("{:x}", md5.compute()),
        sha256: format!("{:x}", sha256.finalize()),
    })
}
