//! Native PNG text-chunk tool
//!
//! Edits `tEXt`, `zTXt` and `iTXt` chunks in place without an external
//! program. Every other chunk, and any bytes after `IEND`, are carried over
//! untouched and in order.

use crate::error::FormatError;
use crate::kind::PNG_SIGNATURE;
use crate::tool::{ContentDigest, RawTag, TagTool};
use flate2::read::ZlibDecoder;
use std::fs;
use std::io::{self, Read};
use std::path::Path;

const TEXT: [u8; 4] = *b"tEXt";
const ZTXT: [u8; 4] = *b"zTXt";
const ITXT: [u8; 4] = *b"iTXt";
const IHDR: [u8; 4] = *b"IHDR";
const IEND: [u8; 4] = *b"IEND";

const MAX_KEYWORD_LEN: usize = 79;

/// Upper bound on decompressed zTXt/iTXt text
const MAX_INFLATED_LEN: u64 = 16 * 1024 * 1024;

/// Tag name used in errors about the stream itself
const STREAM: &str = "png";

#[derive(Debug, Clone, PartialEq, Eq)]
struct Chunk {
    kind: [u8; 4],
    data: Vec<u8>,
}

impl Chunk {
    fn new(kind: [u8; 4], data: Vec<u8>) -> Self {
        Self { kind, data }
    }

    fn is_text(&self) -> bool {
        matches!(self.kind, TEXT | ZTXT | ITXT)
    }

    fn kind_name(&self) -> String {
        String::from_utf8_lossy(&self.kind).into_owned()
    }

    fn crc(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&self.kind);
        hasher.update(&self.data);
        hasher.finalize()
    }

    /// Keyword of a text chunk, without decoding the value
    fn keyword(&self) -> Option<String> {
        if !self.is_text() {
            return None;
        }
        let end = self.data.iter().position(|b| *b == 0)?;
        Some(latin1(&self.data[..end]))
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        // Chunk data is bounded by the u32 length field on parse and by
        // keyword/value sizes on encode.
        let len = u32::try_from(self.data.len()).unwrap_or(u32::MAX);
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(&self.kind);
        out.extend_from_slice(&self.data);
        out.extend_from_slice(&self.crc().to_be_bytes());
    }
}

/// Parsed PNG stream
#[derive(Debug, Clone)]
struct PngFile {
    chunks: Vec<Chunk>,
    trailer: Vec<u8>,
}

impl PngFile {
    fn parse(bytes: &[u8]) -> Result<Self, FormatError> {
        if !bytes.starts_with(&PNG_SIGNATURE) {
            return Err(FormatError::malformed(STREAM, "missing PNG signature"));
        }

        let mut pos = PNG_SIGNATURE.len();
        let mut chunks = Vec::new();

        loop {
            if bytes.len().saturating_sub(pos) < 12 {
                return Err(FormatError::malformed(STREAM, "truncated stream: no IEND chunk"));
            }

            let len = u32::from_be_bytes([bytes[pos], bytes[pos + 1], bytes[pos + 2], bytes[pos + 3]])
                as usize;
            let kind = [bytes[pos + 4], bytes[pos + 5], bytes[pos + 6], bytes[pos + 7]];
            let data_start = pos + 8;
            let data_end = data_start
                .checked_add(len)
                .filter(|end| end.saturating_add(4) <= bytes.len())
                .ok_or_else(|| {
                    FormatError::malformed(
                        String::from_utf8_lossy(&kind),
                        format!("chunk length {len} runs past end of file"),
                    )
                })?;

            let chunk = Chunk::new(kind, bytes[data_start..data_end].to_vec());
            let stored = u32::from_be_bytes([
                bytes[data_end],
                bytes[data_end + 1],
                bytes[data_end + 2],
                bytes[data_end + 3],
            ]);
            if chunk.crc() != stored {
                return Err(FormatError::malformed(chunk.kind_name(), "CRC mismatch"));
            }

            pos = data_end + 4;
            let done = chunk.kind == IEND;
            chunks.push(chunk);
            if done {
                break;
            }
        }

        if chunks.first().map(|c| c.kind) != Some(IHDR) {
            return Err(FormatError::malformed(STREAM, "first chunk is not IHDR"));
        }

        Ok(Self {
            chunks,
            trailer: bytes[pos..].to_vec(),
        })
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            PNG_SIGNATURE.len()
                + self.chunks.iter().map(|c| c.data.len() + 12).sum::<usize>()
                + self.trailer.len(),
        );
        out.extend_from_slice(&PNG_SIGNATURE);
        for chunk in &self.chunks {
            chunk.write_to(&mut out);
        }
        out.extend_from_slice(&self.trailer);
        out
    }

    fn text_tags(&self) -> Result<Vec<RawTag>, FormatError> {
        self.chunks
            .iter()
            .filter(|c| c.is_text())
            .map(decode_text_chunk)
            .collect()
    }

    fn text_keywords(&self) -> Vec<String> {
        self.chunks.iter().filter_map(Chunk::keyword).collect()
    }

    /// Decode only the text chunks whose keyword is in `names`
    fn text_tags_named(&self, names: &[String]) -> Result<Vec<RawTag>, FormatError> {
        self.chunks
            .iter()
            .filter(|c| c.keyword().is_some_and(|keyword| names.contains(&keyword)))
            .map(decode_text_chunk)
            .collect()
    }

    fn remove_text_where(&mut self, mut remove: impl FnMut(&str) -> bool) -> usize {
        let before = self.chunks.len();
        self.chunks
            .retain(|c| !c.keyword().is_some_and(|keyword| remove(&keyword)));
        before - self.chunks.len()
    }

    fn insert_before_iend(&mut self, new: Vec<Chunk>) {
        let at = self
            .chunks
            .iter()
            .position(|c| c.kind == IEND)
            .unwrap_or(self.chunks.len());
        let tail = self.chunks.split_off(at);
        self.chunks.extend(new);
        self.chunks.extend(tail);
    }

    fn primary_digest(&self) -> ContentDigest {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&PNG_SIGNATURE);
        for chunk in self.chunks.iter().filter(|c| !c.is_text()) {
            hasher.update(&chunk.kind);
            hasher.update(&(chunk.data.len() as u64).to_be_bytes());
            hasher.update(&chunk.data);
        }
        hasher.update(&self.trailer);
        hasher.finalize().into()
    }
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

fn split_at_nul(bytes: &[u8]) -> Option<(&[u8], &[u8])> {
    let at = bytes.iter().position(|b| *b == 0)?;
    Some((&bytes[..at], &bytes[at + 1..]))
}

fn inflate(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut out = Vec::new();
    ZlibDecoder::new(data)
        .take(MAX_INFLATED_LEN + 1)
        .read_to_end(&mut out)?;
    if out.len() as u64 > MAX_INFLATED_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("decompressed text exceeds {MAX_INFLATED_LEN} bytes"),
        ));
    }
    Ok(out)
}

fn decode_text_chunk(chunk: &Chunk) -> Result<RawTag, FormatError> {
    let (keyword_bytes, rest) = split_at_nul(&chunk.data)
        .ok_or_else(|| FormatError::malformed(chunk.kind_name(), "missing keyword terminator"))?;
    let keyword = latin1(keyword_bytes);

    if keyword_bytes.is_empty() || keyword_bytes.len() > MAX_KEYWORD_LEN {
        return Err(FormatError::malformed(keyword, "keyword must be 1-79 bytes"));
    }

    let value = match chunk.kind {
        TEXT => latin1(rest),
        ZTXT => {
            let Some((&method, compressed)) = rest.split_first() else {
                return Err(FormatError::malformed(keyword, "missing compression method"));
            };
            if method != 0 {
                return Err(FormatError::malformed(
                    keyword,
                    format!("unknown compression method {method}"),
                ));
            }
            let raw = inflate(compressed)
                .map_err(|e| FormatError::malformed(keyword.clone(), format!("bad zTXt data: {e}")))?;
            latin1(&raw)
        }
        _ => {
            let [flag, method, tail @ ..] = rest else {
                return Err(FormatError::malformed(keyword, "truncated iTXt header"));
            };
            let (_language, tail) = split_at_nul(tail)
                .ok_or_else(|| FormatError::malformed(keyword.clone(), "missing language tag"))?;
            let (_translated, text) = split_at_nul(tail)
                .ok_or_else(|| FormatError::malformed(keyword.clone(), "missing translated keyword"))?;

            let text = match (*flag, *method) {
                (0, _) => text.to_vec(),
                (1, 0) => inflate(text).map_err(|e| {
                    FormatError::malformed(keyword.clone(), format!("bad iTXt data: {e}"))
                })?,
                (flag, method) => {
                    return Err(FormatError::malformed(
                        keyword,
                        format!("unsupported iTXt compression flag {flag} method {method}"),
                    ))
                }
            };

            String::from_utf8(text)
                .map_err(|e| FormatError::malformed(keyword.clone(), format!("invalid UTF-8: {e}")))?
        }
    };

    Ok(RawTag::new(keyword, value))
}

fn is_plain_latin1(c: char) -> bool {
    c == '\n' || (' '..='~').contains(&c) || ('\u{A1}'..='\u{FF}').contains(&c)
}

fn encode_text_chunk(tag: &RawTag) -> Result<Chunk, FormatError> {
    let name = &tag.name;
    let valid_keyword = !name.is_empty()
        && name.chars().count() <= MAX_KEYWORD_LEN
        && name.chars().all(|c| (' '..='~').contains(&c) || ('\u{A1}'..='\u{FF}').contains(&c))
        && !name.starts_with(' ')
        && !name.ends_with(' ')
        && !name.contains("  ");
    if !valid_keyword {
        return Err(FormatError::malformed(name.clone(), "not a valid PNG keyword"));
    }
    if tag.value.contains('\0') {
        return Err(FormatError::malformed(name.clone(), "value contains NUL"));
    }

    // Keyword chars are all <= U+00FF, so the cast is lossless.
    let mut data: Vec<u8> = name.chars().map(|c| c as u8).collect();
    data.push(0);

    if tag.value.chars().all(is_plain_latin1) {
        data.extend(tag.value.chars().map(|c| c as u8));
        Ok(Chunk::new(TEXT, data))
    } else {
        // Uncompressed, no language tag, no translated keyword.
        data.extend_from_slice(&[0, 0, 0, 0]);
        data.extend_from_slice(tag.value.as_bytes());
        Ok(Chunk::new(ITXT, data))
    }
}

/// Digest of a PNG stream's primary content (all non-text chunks)
///
/// # Errors
/// Returns error if the stream cannot be parsed
pub fn png_content_digest(bytes: &[u8]) -> Result<ContentDigest, FormatError> {
    Ok(PngFile::parse(bytes)?.primary_digest())
}

/// In-process [`TagTool`] for PNG text chunks
#[derive(Debug, Clone, Copy, Default)]
pub struct PngTextTool;

impl PngTextTool {
    /// Create the tool
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn load(path: &Path) -> Result<PngFile, FormatError> {
        let bytes = fs::read(path).map_err(|e| FormatError::io(path, e))?;
        PngFile::parse(&bytes)
    }

    fn store(path: &Path, png: &PngFile) -> Result<(), FormatError> {
        fs::write(path, png.to_bytes()).map_err(|e| FormatError::io(path, e))
    }
}

impl TagTool for PngTextTool {
    fn name(&self) -> &'static str {
        "png-text"
    }

    fn read_tags(&self, path: &Path) -> Result<Vec<RawTag>, FormatError> {
        Self::load(path)?.text_tags()
    }

    fn tag_names(&self, path: &Path) -> Result<Vec<String>, FormatError> {
        Ok(Self::load(path)?.text_keywords())
    }

    fn read_named(&self, path: &Path, names: &[String]) -> Result<Vec<RawTag>, FormatError> {
        Self::load(path)?.text_tags_named(names)
    }

    fn write_tags(&self, path: &Path, tags: &[RawTag]) -> Result<(), FormatError> {
        let mut png = Self::load(path)?;

        // Last occurrence of a repeated name wins.
        let mut unique: Vec<&RawTag> = Vec::with_capacity(tags.len());
        for tag in tags {
            unique.retain(|t| t.name != tag.name);
            unique.push(tag);
        }

        let encoded = unique
            .iter()
            .map(|t| encode_text_chunk(t))
            .collect::<Result<Vec<_>, _>>()?;

        png.remove_text_where(|keyword| unique.iter().any(|t| t.name == keyword));
        png.insert_before_iend(encoded);
        Self::store(path, &png)
    }

    fn delete_tags(&self, path: &Path, names: &[String]) -> Result<usize, FormatError> {
        let mut png = Self::load(path)?;
        let removed = png.remove_text_where(|keyword| names.iter().any(|n| n == keyword));
        if removed > 0 {
            Self::store(path, &png)?;
        }
        Ok(removed)
    }

    fn delete_all(&self, path: &Path) -> Result<usize, FormatError> {
        let mut png = Self::load(path)?;
        let removed = png.remove_text_where(|_| true);
        if removed > 0 {
            Self::store(path, &png)?;
        }
        Ok(removed)
    }
}
