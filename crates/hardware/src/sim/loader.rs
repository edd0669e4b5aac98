//! Binary Loader.
//!
//! This module places raw images into memory slaves before a run. It performs:
//! 1. **Parsing:** Reads `slave:offset:path` image arguments (`offset` in decimal or `0x` hex).
//! 2. **Reading:** Loads the file into a byte buffer.
//! 3. **Placing:** Copies the bytes into the named SRAM or ROM slave through `Soc::load_image`.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::common::error::LoadError;
use crate::soc::Soc;

/// One image to place into a slave.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageSpec {
    /// Target slave name.
    pub slave: String,
    /// Byte offset inside the slave window.
    pub offset: u64,
    /// Image file.
    pub path: PathBuf,
}

impl FromStr for ImageSpec {
    type Err = LoadError;

    /// Parses `slave:offset:path`. The path may itself contain colons.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || LoadError::InvalidSpec(s.to_string());
        let mut parts = s.splitn(3, ':');
        let (Some(slave), Some(offset), Some(path)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        if slave.is_empty() || path.is_empty() {
            return Err(invalid());
        }
        let offset = parse_offset(offset).ok_or_else(invalid)?;
        Ok(Self {
            slave: slave.to_string(),
            offset,
            path: PathBuf::from(path),
        })
    }
}

fn parse_offset(s: &str) -> Option<u64> {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .map_or_else(|| s.parse().ok(), |hex| u64::from_str_radix(hex, 16).ok())
}

/// Loads a binary file from disk into a byte vector.
///
/// # Arguments
///
/// * `path` - Path to the binary file.
///
/// # Returns
///
/// The raw bytes of the file.
///
/// # Errors
///
/// `LoadError::Io` when the file cannot be read.
pub fn load_binary(path: impl AsRef<Path>) -> Result<Vec<u8>, LoadError> {
    let path = path.as_ref();
    fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads the image named by `spec` and places it into its slave.
///
/// # Returns
///
/// The number of bytes loaded.
///
/// # Errors
///
/// File errors from [`load_binary`] and placement errors from [`Soc::load_image`].
pub fn load_image(soc: &mut Soc, spec: &ImageSpec) -> Result<usize, LoadError> {
    let data = load_binary(&spec.path)?;
    soc.load_image(&spec.slave, spec.offset, &data)?;
    Ok(data.len())
}
