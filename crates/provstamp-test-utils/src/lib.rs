//! Testing utilities for the provstamp workspace
//!
//! Artifact fixtures and deterministic record collaborators.

#![allow(missing_docs)]

use chrono::{DateTime, FixedOffset};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use provstamp_record::{
    FixedContext, RecordAssembler, RecordContext, RepoInfo, RevisionError, RevisionSource,
};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

// ============================================================================
// Artifact fixtures
// ============================================================================

/// One serialized PNG chunk (length, type, data, CRC)
pub fn png_chunk(kind: &[u8; 4], data: &[u8]) -> Vec<u8> {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(kind);
    hasher.update(data);

    let mut out = Vec::with_capacity(12 + data.len());
    out.extend_from_slice(&u32::try_from(data.len()).unwrap().to_be_bytes());
    out.extend_from_slice(kind);
    out.extend_from_slice(data);
    out.extend_from_slice(&hasher.finalize().to_be_bytes());
    out
}

fn ihdr() -> Vec<u8> {
    // 1x1, 8-bit greyscale, no interlace
    let mut data = Vec::with_capacity(13);
    data.extend_from_slice(&1u32.to_be_bytes());
    data.extend_from_slice(&1u32.to_be_bytes());
    data.extend_from_slice(&[8, 0, 0, 0, 0]);
    png_chunk(b"IHDR", &data)
}

fn idat() -> Vec<u8> {
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    enc.write_all(&[0, 0x7F]).unwrap();
    png_chunk(b"IDAT", &enc.finish().unwrap())
}

/// Smallest valid PNG: signature, IHDR, IDAT, IEND
pub fn minimal_png() -> Vec<u8> {
    let mut out = PNG_SIGNATURE.to_vec();
    out.extend(ihdr());
    out.extend(idat());
    out.extend(png_chunk(b"IEND", &[]));
    out
}

/// [`minimal_png`] with Latin-1 `tEXt` chunks right after IHDR
pub fn png_with_text(pairs: &[(&str, &str)]) -> Vec<u8> {
    let mut out = PNG_SIGNATURE.to_vec();
    out.extend(ihdr());
    for (keyword, value) in pairs {
        let mut data = keyword.as_bytes().to_vec();
        data.push(0);
        data.extend_from_slice(value.as_bytes());
        out.extend(png_chunk(b"tEXt", &data));
    }
    out.extend(idat());
    out.extend(png_chunk(b"IEND", &[]));
    out
}

/// Little-endian TIFF header with an empty IFD
pub fn tiff_bytes() -> Vec<u8> {
    let mut out = b"II*\0".to_vec();
    out.extend_from_slice(&8u32.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out
}

/// JFIF header followed by EOI
pub fn jpeg_bytes() -> Vec<u8> {
    let mut out = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
    out.extend_from_slice(b"JFIF\0");
    out.extend_from_slice(&[1, 1, 0, 0, 1, 0, 1, 0, 0]);
    out.extend_from_slice(&[0xFF, 0xD9]);
    out
}

/// One-line PDF
pub fn pdf_bytes() -> Vec<u8> {
    b"%PDF-1.4\n1 0 obj << >> endobj\ntrailer << /Root 1 0 R >>\n%%EOF\n".to_vec()
}

/// DSC-conforming EPS header
pub fn eps_bytes() -> Vec<u8> {
    b"%!PS-Adobe-3.0 EPSF-3.0\n%%BoundingBox: 0 0 1 1\n%%EOF\n".to_vec()
}

/// Write `bytes` to `dir/name` and return the path
pub fn write_artifact(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, bytes).unwrap();
    path
}

// ============================================================================
// Record collaborators
// ============================================================================

pub fn ts(text: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(text).unwrap()
}

/// Context pinned to 2024-05-01T12:00:00Z, user `alice`, host `testhost linux x86_64`
pub fn fixed_context() -> RecordContext {
    RecordContext {
        now: ts("2024-05-01T12:00:00+00:00"),
        user: Some("alice".to_string()),
        host: "testhost linux x86_64".to_string(),
        caller: Some(PathBuf::from("/work/make_figure.py")),
        working_dir: PathBuf::from("/work"),
    }
}

/// `/repo` at commit `abc123` by `a`, committed 2024-01-01T00:00:00Z
pub fn example_repo() -> RepoInfo {
    RepoInfo {
        root: PathBuf::from("/repo"),
        commit_id: "abc123".to_string(),
        author: "a".to_string(),
        commit_time: ts("2024-01-01T00:00:00+00:00"),
    }
}

/// Revision source that always finds the same repository
#[derive(Debug, Clone)]
pub struct FixedRevision(pub RepoInfo);

impl RevisionSource for FixedRevision {
    fn locate(&self, _path: &Path, _search_ancestors: bool) -> Result<RepoInfo, RevisionError> {
        Ok(self.0.clone())
    }
}

/// Revision source that never finds a repository
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRepository;

impl RevisionSource for NoRepository {
    fn locate(&self, path: &Path, _search_ancestors: bool) -> Result<RepoInfo, RevisionError> {
        Err(RevisionError::NotFound {
            path: path.to_path_buf(),
        })
    }
}

/// Assembler over [`fixed_context`] and `revision`
pub fn fixed_assembler(revision: impl RevisionSource + 'static) -> RecordAssembler {
    RecordAssembler::new(Arc::new(revision), Arc::new(FixedContext(fixed_context())))
}

/// Assembler over [`fixed_context`] and [`example_repo`]
pub fn example_assembler() -> RecordAssembler {
    fixed_assembler(FixedRevision(example_repo()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_png_layout() {
        let png = minimal_png();
        assert!(png.starts_with(&PNG_SIGNATURE));
        assert_eq!(&png[12..16], b"IHDR");
        assert_eq!(&png[8 + 25 + 4..8 + 25 + 8], b"IDAT");
        assert!(png.ends_with(&png_chunk(b"IEND", &[])));
    }

    #[test]
    fn text_goes_after_ihdr() {
        let png = png_with_text(&[("k", "v")]);
        assert_eq!(&png[8 + 25 + 4..8 + 25 + 8], b"tEXt");
    }

    #[test]
    fn example_assembler_records_repo() {
        let record = example_assembler().assemble(None, true);
        assert_eq!(record.get("commit_id"), Some("abc123"));
        assert_eq!(record.get("user"), Some("alice"));
    }
}
