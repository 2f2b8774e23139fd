// src/compression.rs

//! Compression detection and stream codecs
//!
//! Both package archives and repository databases are tarballs wrapped in one
//! of several compressors. Reading detects the format from magic bytes;
//! writing uses the format chosen from the database file extension.

use crate::error::{Error, Result};
use bzip2::read::BzDecoder;
use bzip2::write::BzEncoder;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::io::{Read, Write};
use xz2::read::XzDecoder;
use xz2::write::XzEncoder;

const XZ_LEVEL: u32 = 6;
const ZSTD_LEVEL: i32 = 0;

/// Compression wrapping a tarball
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Bzip2,
    Xz,
    Zstd,
}

impl Compression {
    /// Map a database suffix (the part after `.db`) to a compression
    ///
    /// An empty suffix means the bare `.db` form, which pacman treats as gzip.
    pub fn from_db_suffix(suffix: &str) -> Result<Self> {
        match suffix {
            "" | ".tar.gz" => Ok(Compression::Gzip),
            ".tar" => Ok(Compression::None),
            ".tar.bz2" => Ok(Compression::Bzip2),
            ".tar.xz" => Ok(Compression::Xz),
            ".tar.zst" => Ok(Compression::Zstd),
            ".tar.Z" => Err(Error::UnsupportedCompression(
                "compress(1) .Z databases cannot be written".to_string(),
            )),
            other => Err(Error::InvalidRepoPath(format!(
                ".db{} invalid repo type",
                other
            ))),
        }
    }

    /// Detect compression from the leading bytes of a stream
    pub fn detect(magic: &[u8]) -> Self {
        if magic.starts_with(&[0x1F, 0x8B]) {
            Compression::Gzip
        } else if magic.starts_with(b"BZh") {
            Compression::Bzip2
        } else if magic.starts_with(&[0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00]) {
            Compression::Xz
        } else if magic.starts_with(&[0x28, 0xB5, 0x2F, 0xFD]) {
            Compression::Zstd
        } else {
            Compression::None
        }
    }

    /// Wrap a reader in the matching decoder
    pub fn decoder<'a, R: Read + 'a>(self, reader: R) -> Result<Box<dyn Read + 'a>> {
        Ok(match self {
            Compression::None => Box::new(reader),
            Compression::Gzip => Box::new(GzDecoder::new(reader)),
            Compression::Bzip2 => Box::new(BzDecoder::new(reader)),
            Compression::Xz => Box::new(XzDecoder::new(reader)),
            Compression::Zstd => Box::new(zstd::Decoder::new(reader)?),
        })
    }

    /// Compress `data` into `writer`, finishing the stream
    pub fn encode<W: Write>(self, data: &[u8], mut writer: W) -> Result<()> {
        match self {
            Compression::None => writer.write_all(data)?,
            Compression::Gzip => {
                let mut encoder = GzEncoder::new(writer, flate2::Compression::default());
                encoder.write_all(data)?;
                encoder.finish()?;
            }
            Compression::Bzip2 => {
                let mut encoder = BzEncoder::new(writer, bzip2::Compression::default());
                encoder.write_all(data)?;
                encoder.finish()?;
            }
            Compression::Xz => {
                let mut encoder = XzEncoder::new(writer, XZ_LEVEL);
                encoder.write_all(data)?;
                encoder.finish()?;
            }
            Compression::Zstd => {
                let mut encoder = zstd::Encoder::new(writer, ZSTD_LEVEL)?;
                encoder.write_all(data)?;
                encoder.finish()?;
            }
        }
        Ok(())
    }
}

/// Decompress a whole in-memory buffer, detecting its format
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = Compression::detect(data).decoder(data)?;
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_suffixes() {
        assert_eq!(Compression::from_db_suffix("").unwrap(), Compression::Gzip);
        assert_eq!(Compression::from_db_suffix(".tar").unwrap(), Compression::None);
        assert_eq!(Compression::from_db_suffix(".tar.gz").unwrap(), Compression::Gzip);
        assert_eq!(Compression::from_db_suffix(".tar.bz2").unwrap(), Compression::Bzip2);
        assert_eq!(Compression::from_db_suffix(".tar.xz").unwrap(), Compression::Xz);
        assert_eq!(Compression::from_db_suffix(".tar.zst").unwrap(), Compression::Zstd);
        assert!(matches!(
            Compression::from_db_suffix(".tar.Z"),
            Err(Error::UnsupportedCompression(_))
        ));
        assert!(matches!(
            Compression::from_db_suffix(".zip"),
            Err(Error::InvalidRepoPath(_))
        ));
    }

    #[test]
    fn test_every_codec_detects_its_own_output() {
        let payload = b"%NAME%\nfoo\n\n".repeat(32);
        for compression in [
            Compression::None,
            Compression::Gzip,
            Compression::Bzip2,
            Compression::Xz,
            Compression::Zstd,
        ] {
            let mut encoded = Vec::new();
            compression.encode(&payload, &mut encoded).unwrap();
            if compression != Compression::None {
                assert_eq!(Compression::detect(&encoded), compression);
            }
            assert_eq!(decompress(&encoded).unwrap(), payload);
        }
    }
}
