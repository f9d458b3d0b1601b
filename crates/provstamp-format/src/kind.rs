//! Container format identification
//!
//! Formats are identified by content signature or by an explicit hint,
//! never by file extension.

use crate::error::FormatError;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

/// PNG file signature
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Bytes read from the head of a file for sniffing
const SNIFF_LEN: usize = 16;

/// Bytes named in an unknown-signature error
const SIGNATURE_NAME_LEN: usize = 8;

/// Metadata container formats known to the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatKind {
    /// PNG (text chunks)
    Png,
    /// JPEG (EXIF/XMP segments)
    Jpeg,
    /// TIFF (IFD entries)
    Tiff,
    /// PDF (document info / XMP)
    Pdf,
    /// Encapsulated PostScript (DSC comments)
    Eps,
}

impl FormatKind {
    /// Every known kind
    pub const ALL: [Self; 5] = [Self::Png, Self::Jpeg, Self::Tiff, Self::Pdf, Self::Eps];

    /// Canonical lowercase identifier
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Tiff => "tiff",
            Self::Pdf => "pdf",
            Self::Eps => "eps",
        }
    }

    /// Identify a format from leading bytes
    ///
    /// # Errors
    /// [`FormatError::UnsupportedFormat`] naming the signature as hex
    pub fn sniff(head: &[u8]) -> Result<Self, FormatError> {
        if head.starts_with(&PNG_SIGNATURE) {
            Ok(Self::Png)
        } else if head.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Ok(Self::Jpeg)
        } else if head.starts_with(b"II*\0") || head.starts_with(b"MM\0*") {
            Ok(Self::Tiff)
        } else if head.starts_with(b"%PDF-") {
            Ok(Self::Pdf)
        } else if head.starts_with(b"%!PS-Adobe") || head.starts_with(&[0xC5, 0xD0, 0xD3, 0xC6]) {
            Ok(Self::Eps)
        } else {
            Err(FormatError::unsupported(signature_name(head)))
        }
    }

    /// Identify the format of a file on disk
    ///
    /// # Errors
    /// I/O failure or unsupported signature
    pub fn sniff_file(path: &Path) -> Result<Self, FormatError> {
        let file = File::open(path).map_err(|e| FormatError::io(path, e))?;
        let mut head = Vec::with_capacity(SNIFF_LEN);
        file.take(SNIFF_LEN as u64)
            .read_to_end(&mut head)
            .map_err(|e| FormatError::io(path, e))?;
        Self::sniff(&head)
    }
}

impl Display for FormatKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormatKind {
    type Err = FormatError;

    /// Parse an explicit format hint
    fn from_str(hint: &str) -> Result<Self, Self::Err> {
        match hint.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "tiff" | "tif" => Ok(Self::Tiff),
            "pdf" => Ok(Self::Pdf),
            "eps" | "ps" => Ok(Self::Eps),
            _ => Err(FormatError::unsupported(hint.trim())),
        }
    }
}

/// Name an unrecognised signature: leading bytes as lowercase hex
fn signature_name(head: &[u8]) -> String {
    if head.is_empty() {
        "empty".to_string()
    } else {
        hex::encode(&head[..head.len().min(SIGNATURE_NAME_LEN)])
    }
}
