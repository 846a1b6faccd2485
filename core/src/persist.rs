//! Binary layout of a rail file, little-endian:
//!
//! `[u64 version][u32 max_doc][max_doc × u32 len][max_doc × (len × u32 term id, u32 terminator)]`
//!
//! The header is 3 words, so the whole file can be read as a `[u32]`.

use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::config::{RAIL_EXTENSION, RAIL_TERMINATOR};
use crate::errors::{Error, Result};
use crate::index::TermId;

/// Size of the header in u32 words: version (2 words) + document count.
pub const HEADER_WORDS: usize = 3;

#[derive(Debug, Clone)]
pub struct RailPaths {
    pub root: PathBuf,
}

impl RailPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn rail(&self, field: &str) -> PathBuf { self.root.join(format!("{field}.{RAIL_EXTENSION}")) }
}

/// Streams a rail file in a temp file next to the target, published by rename on `finish()`.
pub struct RailWriter {
    out: BufWriter<NamedTempFile>,
    path: PathBuf,
    lens: Vec<u32>,
    doc: usize,
}

impl RailWriter {
    /// Write the header and the length table, documents are expected in order.
    pub fn create(path: &Path, version: u64, lens: Vec<u32>) -> Result<Self> {
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        create_dir_all(&dir)?;
        let mut out = BufWriter::new(NamedTempFile::new_in(&dir)?);
        out.write_all(&version.to_le_bytes())?;
        out.write_all(&(lens.len() as u32).to_le_bytes())?;
        for len in &lens {
            out.write_all(&len.to_le_bytes())?;
        }
        Ok(Self { out, path: path.to_path_buf(), lens, doc: 0 })
    }

    /// Append the next document, `ids.len()` must equal its announced length.
    pub fn write_doc(&mut self, ids: &[TermId]) -> Result<()> {
        let expected = self.lens.get(self.doc).copied();
        if expected != Some(ids.len() as u32) {
            return Err(Error::corrupt(
                &self.path,
                format!("doc {} written with {} ids, announced {:?}", self.doc, ids.len(), expected),
            ));
        }
        for id in ids {
            self.out.write_all(&id.to_le_bytes())?;
        }
        self.out.write_all(&RAIL_TERMINATOR.to_le_bytes())?;
        self.doc += 1;
        Ok(())
    }

    /// Flush, sync and atomically replace the target file.
    pub fn finish(self) -> Result<()> {
        if self.doc != self.lens.len() {
            return Err(Error::corrupt(
                &self.path,
                format!("{} docs written, {} announced", self.doc, self.lens.len()),
            ));
        }
        let tmp = self.out.into_inner().map_err(|e| e.into_error())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)?;
        Ok(())
    }
}

/// Version stored in a rail file, `None` if the file does not exist.
pub fn read_version(path: &Path) -> Result<Option<u64>> {
    let mut f = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut buf = [0u8; 8];
    if f.read_exact(&mut buf).is_err() {
        return Err(Error::corrupt(path, "file shorter than its header"));
    }
    Ok(Some(u64::from_le_bytes(buf)))
}

/// Decode a whole rail file as little-endian words.
pub fn read_words(path: &Path) -> Result<Vec<u32>> {
    let mut f = File::open(path)?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    if buf.len() % 4 != 0 {
        return Err(Error::corrupt(path, "size is not a multiple of 4"));
    }
    Ok(buf.chunks_exact(4).map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]])).collect())
}

/// Index of a rail file, `offsets[doc]` in words from the start of the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RailLayout {
    pub version: u64,
    pub offsets: Vec<usize>,
    pub lens: Vec<u32>,
}

impl RailLayout {
    /// Walk the length table once and check every document against the size of the file.
    pub fn parse(words: &[u32], path: &Path) -> Result<Self> {
        if words.len() < HEADER_WORDS {
            return Err(Error::corrupt(path, "file shorter than its header"));
        }
        let version = u64::from_le_bytes(word_pair(words[0], words[1]));
        let max_doc = words[2] as usize;
        let table_end = HEADER_WORDS + max_doc;
        if words.len() < table_end {
            return Err(Error::corrupt(path, format!("length table of {max_doc} docs truncated")));
        }
        let lens = words[HEADER_WORDS..table_end].to_vec();
        let mut offsets = Vec::with_capacity(max_doc);
        let mut offset = table_end;
        for (doc, &len) in lens.iter().enumerate() {
            offsets.push(offset);
            let end = offset + len as usize;
            if end >= words.len() {
                return Err(Error::corrupt(path, format!("doc {doc} overflows the file")));
            }
            if words[end] != RAIL_TERMINATOR {
                return Err(Error::corrupt(path, format!("doc {doc} has no terminator")));
            }
            offset = end + 1;
        }
        if offset != words.len() {
            return Err(Error::corrupt(path, format!("{} trailing words", words.len() - offset)));
        }
        Ok(Self { version, offsets, lens })
    }
}

/// Little-endian bytes of a u64 stored as two consecutive u32 words.
fn word_pair(lo: u32, hi: u32) -> [u8; 8] {
    let mut bytes = [0u8; 8];
    bytes[..4].copy_from_slice(&lo.to_le_bytes());
    bytes[4..].copy_from_slice(&hi.to_le_bytes());
    bytes
}
