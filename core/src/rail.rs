//! Persistent sequence of term ids for every document of a field.
//!
//! A [`Rail`] is an immutable view of one generation of the rail file.
//! The [`RailStore`] owns the file, rebuilds it when the corpus version
//! changes, and swaps the new view in while readers keep their snapshot.

use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use memmap2::Mmap;
use parking_lot::{Mutex, RwLock};
use roaring::RoaringBitmap;

use crate::config::{LoadMode, RailConfig};
use crate::corpus::Corpus;
use crate::errors::{Error, Result};
use crate::form_enum::FormEnum;
use crate::index::{DocId, PositionalPostings, TermId, HOLE};
use crate::persist::{read_version, read_words, RailLayout, RailPaths, RailWriter};
use crate::tags::{TagFilter, PUN, PUN_PARA, PUN_SECTION};

/// One writer at a time for every rail file of the process. Rail directories
/// are not shared between processes.
static BUILD_LOCK: Mutex<()> = parking_lot::const_mutex(());

enum Buffer {
    Mmap(Mmap),
    Owned(Vec<u32>),
}

impl Buffer {
    fn words(&self) -> &[u32] {
        match self {
            // checked by try_words() at open
            Buffer::Mmap(m) => bytemuck::try_cast_slice(&m[..]).unwrap_or(&[]),
            Buffer::Owned(v) => v.as_slice(),
        }
    }

    fn try_words(&self, path: &Path) -> Result<&[u32]> {
        match self {
            Buffer::Mmap(m) => bytemuck::try_cast_slice(&m[..])
                .map_err(|e| Error::corrupt(path, format!("mapped file is not a u32 array: {e}"))),
            Buffer::Owned(v) => Ok(v.as_slice()),
        }
    }
}

pub struct Rail {
    path: PathBuf,
    buffer: Buffer,
    layout: RailLayout,
}

impl Rail {
    /// Open an existing rail file, validating its layout.
    pub fn open(path: &Path, mode: LoadMode) -> Result<Self> {
        let buffer = match mode {
            LoadMode::Mmap if cfg!(target_endian = "little") => {
                let file = File::open(path)?;
                // SAFETY: the mapping is read-only and rail files are only ever
                // replaced by rename, never rewritten in place.
                let mmap = unsafe { Mmap::map(&file)? };
                Buffer::Mmap(mmap)
            }
            _ => Buffer::Owned(read_words(path)?),
        };
        let layout = RailLayout::parse(buffer.try_words(path)?, path)?;
        tracing::debug!(path = %path.display(), max_doc = layout.lens.len(), ?mode, "rail opened");
        Ok(Self { path: path.to_path_buf(), buffer, layout })
    }

    pub fn path(&self) -> &Path { &self.path }

    /// Version of the corpus this rail was built from.
    pub fn version(&self) -> u64 { self.layout.version }

    pub fn max_doc(&self) -> u32 { self.layout.lens.len() as u32 }

    /// Count of positions of a document, holes included, `0` for a document without data.
    pub fn len(&self, doc_id: DocId) -> Result<u32> {
        self.layout.lens.get(doc_id as usize).copied().ok_or(Error::DocOutOfRange {
            doc_id,
            max_doc: self.max_doc(),
        })
    }

    /// Term ids of a document, by position.
    pub fn doc(&self, doc_id: DocId) -> Result<&[TermId]> {
        self.len(doc_id)?;
        Ok(self.slice(doc_id as usize))
    }

    /// Sum of document lengths, for a subset of documents if a filter is given.
    pub fn doc_lens(&self, doc_filter: Option<&RoaringBitmap>) -> u64 {
        self.docs(doc_filter).map(|(_, ids)| ids.len() as u64).sum()
    }

    /// Non-empty documents accepted by the filter, `None` accepts all.
    pub fn docs<'a>(
        &'a self,
        doc_filter: Option<&'a RoaringBitmap>,
    ) -> impl Iterator<Item = (DocId, &'a [TermId])> + 'a {
        (0..self.max_doc())
            .filter(move |doc_id| doc_filter.map_or(true, |f| f.contains(*doc_id)))
            .filter_map(move |doc_id| {
                let ids = self.slice(doc_id as usize);
                (!ids.is_empty()).then_some((doc_id, ids))
            })
    }

    pub(crate) fn slice(&self, doc: usize) -> &[TermId] {
        let (Some(&offset), Some(&len)) = (self.layout.offsets.get(doc), self.layout.lens.get(doc)) else {
            return &[];
        };
        self.buffer.words().get(offset..offset + len as usize).unwrap_or(&[])
    }

    /// A document as a line of forms, truncated after `limit` tokens.
    pub fn render(&self, doc_id: DocId, corpus: &Corpus, limit: usize) -> Result<String> {
        let ids = self.doc(doc_id)?;
        let mut line = String::new();
        for (i, &id) in ids.iter().enumerate() {
            if i >= limit {
                line.push_str("[…]");
                break;
            }
            if id == HOLE {
                continue;
            }
            line.push_str(corpus.form(id));
            line.push(' ');
        }
        Ok(line)
    }

    /// Write the filtered documents as plain text, a line by document.
    /// Paragraph and section punctuation give blank lines, other punctuation
    /// and holes are dropped, locutions are joined by `_`.
    pub fn export<W: Write>(
        &self,
        out: &mut W,
        corpus: &Corpus,
        doc_filter: Option<&RoaringBitmap>,
        tag_filter: Option<&TagFilter>,
    ) -> Result<()> {
        let dic = corpus.dic();
        let forms = tag_filter.map(|t| t.forms(dic));
        for (_, ids) in self.docs(doc_filter) {
            for &id in ids {
                if id == HOLE {
                    continue;
                }
                let tag = dic.tag(id);
                if dic.is_punctuation(id) || tag & 0xF0 == PUN {
                    if tag == PUN_SECTION || tag == PUN_PARA {
                        out.write_all(b"\n\n")?;
                    }
                    continue;
                }
                if forms.as_ref().map_or(false, |f| !f.contains(id)) {
                    continue;
                }
                let form = corpus.form(id);
                if dic.is_locution(id) {
                    out.write_all(form.replace(' ', "_").as_bytes())?;
                } else {
                    out.write_all(form.as_bytes())?;
                }
                out.write_all(b" ")?;
            }
            out.write_all(b"\n")?;
        }
        out.flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for Rail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rail")
            .field("path", &self.path)
            .field("version", &self.version())
            .field("max_doc", &self.max_doc())
            .finish()
    }
}

/// Write the rail file of a field from the positional postings.
pub fn build_rail(path: &Path, corpus: &Corpus, provider: &dyn PositionalPostings) -> Result<()> {
    let field = corpus.field();
    if !provider.has_positions(field) {
        return Err(Error::NoPositions(field.to_string()));
    }
    let max_doc = provider.max_doc();
    let max_form = corpus.max_form();
    let mut lens = Vec::with_capacity(max_doc as usize);
    for doc_id in 0..max_doc {
        let len = match provider.max_position(doc_id, field)? {
            Some(max_pos) => max_pos.saturating_add(1),
            None => {
                tracing::debug!(doc_id, field, "no positions, zero-length document");
                0
            }
        };
        lens.push(len);
    }
    let mut writer = RailWriter::create(path, corpus.version(), lens.clone())?;
    let mut ids: Vec<TermId> = Vec::new();
    let mut skipped = 0u32;
    for (doc_id, &len) in lens.iter().enumerate() {
        ids.clear();
        ids.resize(len as usize, HOLE);
        if len > 0 {
            let positions = provider.positions(doc_id as DocId, field)?.unwrap_or_default();
            if let Err(reason) = scatter(&positions, max_form, &mut ids) {
                tracing::error!(doc_id, field, %reason, "inconsistent document, contribution dropped");
                ids.fill(HOLE);
                skipped += 1;
            }
        }
        writer.write_doc(&ids)?;
    }
    writer.finish()?;
    tracing::info!(field, max_doc, skipped, version = corpus.version(), path = %path.display(), "rail built");
    Ok(())
}

/// Put each id at its position, unfilled positions stay holes.
fn scatter(positions: &[(u32, TermId)], max_form: usize, ids: &mut [TermId]) -> std::result::Result<(), String> {
    for &(pos, id) in positions {
        if id as usize >= max_form {
            return Err(format!("term id {id} unknown to a dictionary of {max_form} forms"));
        }
        let Some(cell) = ids.get_mut(pos as usize) else {
            return Err(format!("position {pos} beyond announced length {}", ids.len()));
        };
        *cell = id;
    }
    Ok(())
}

/// Open the rail of the corpus, (re)building it when missing, stale or corrupted.
fn load(path: &Path, mode: LoadMode, corpus: &Corpus, provider: &dyn PositionalPostings) -> Result<Rail> {
    let _guard = BUILD_LOCK.lock();
    match read_version(path) {
        Ok(Some(version)) if version == corpus.version() => {}
        Ok(Some(version)) => {
            tracing::info!(field = corpus.field(), stored = version, current = corpus.version(), "stale rail, rebuild");
            build_rail(path, corpus, provider)?;
            return Rail::open(path, mode);
        }
        Ok(None) => {
            tracing::info!(field = corpus.field(), path = %path.display(), "no rail, build");
            build_rail(path, corpus, provider)?;
            return Rail::open(path, mode);
        }
        Err(Error::Corrupt { reason, .. }) => {
            tracing::warn!(field = corpus.field(), path = %path.display(), %reason, "corrupted rail, rebuild");
            build_rail(path, corpus, provider)?;
            return Rail::open(path, mode);
        }
        Err(e) => return Err(e),
    }
    match Rail::open(path, mode) {
        Err(Error::Corrupt { reason, .. }) => {
            tracing::warn!(field = corpus.field(), path = %path.display(), %reason, "corrupted rail, rebuild");
            build_rail(path, corpus, provider)?;
            Rail::open(path, mode)
        }
        opened => opened,
    }
}

/// Owner of the rail file of a field.
pub struct RailStore {
    path: PathBuf,
    mode: LoadMode,
    /// (left, right) context of [`RailStore::coocs`]
    window: (usize, usize),
    current: RwLock<Arc<Rail>>,
}

impl RailStore {
    pub fn open(config: &RailConfig, corpus: &Corpus, provider: &dyn PositionalPostings) -> Result<Self> {
        let path = RailPaths::new(&config.dir).rail(corpus.field());
        let rail = load(&path, config.load_mode, corpus, provider)?;
        Ok(Self {
            path,
            mode: config.load_mode,
            window: (config.default_left, config.default_right),
            current: RwLock::new(Arc::new(rail)),
        })
    }

    pub fn path(&self) -> &Path { &self.path }

    /// Configured context, `(default_left, default_right)`.
    pub fn window(&self) -> (usize, usize) { self.window }

    /// [`Rail::coocs`] on the current snapshot, with the configured context.
    pub fn coocs(&self, corpus: &Corpus, pivots: &[TermId], doc_filter: Option<&RoaringBitmap>) -> Result<FormEnum> {
        let (left, right) = self.window;
        self.rail().coocs(corpus, pivots, left, right, doc_filter)
    }

    /// Snapshot of the current rail, valid even if the store is refreshed meanwhile.
    pub fn rail(&self) -> Arc<Rail> { self.current.read().clone() }

    /// Swap in a rail matching the corpus version, rebuilding the file if needed.
    pub fn refresh(&self, corpus: &Corpus, provider: &dyn PositionalPostings) -> Result<Arc<Rail>> {
        let current = self.rail();
        if current.version() == corpus.version() {
            return Ok(current);
        }
        let rail = Arc::new(load(&self.path, self.mode, corpus, provider)?);
        *self.current.write() = rail.clone();
        Ok(rail)
    }

    /// Rebuild the file whatever its version, then swap.
    pub fn rebuild(&self, corpus: &Corpus, provider: &dyn PositionalPostings) -> Result<Arc<Rail>> {
        let rail = {
            let _guard = BUILD_LOCK.lock();
            build_rail(&self.path, corpus, provider)?;
            Arc::new(Rail::open(&self.path, self.mode)?)
        };
        *self.current.write() = rail.clone();
        Ok(rail)
    }
}

/// Rails by file and version, dropped when no query holds them anymore.
#[derive(Default)]
pub struct RailCache {
    rails: Mutex<HashMap<(PathBuf, u64), Weak<Rail>>>,
}

impl RailCache {
    pub fn new() -> Self { Self::default() }

    pub fn get_or_open(
        &self,
        config: &RailConfig,
        corpus: &Corpus,
        provider: &dyn PositionalPostings,
    ) -> Result<Arc<Rail>> {
        let path = RailPaths::new(&config.dir).rail(corpus.field());
        let key = (path, corpus.version());
        if let Some(rail) = self.rails.lock().get(&key).and_then(Weak::upgrade) {
            tracing::debug!(field = corpus.field(), version = key.1, "rail cache hit");
            return Ok(rail);
        }
        let rail = Arc::new(load(&key.0, config.load_mode, corpus, provider)?);
        let mut rails = self.rails.lock();
        rails.retain(|_, weak| weak.strong_count() > 0);
        rails.insert(key, Arc::downgrade(&rail));
        Ok(rail)
    }

    /// Count of rails still alive.
    pub fn len(&self) -> usize { self.rails.lock().values().filter(|w| w.strong_count() > 0).count() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}
