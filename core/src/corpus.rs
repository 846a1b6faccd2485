use std::fmt;
use std::sync::Arc;

use crate::index::{PositionalPostings, TermDictionary, TermId};

/// Everything a query needs to know about one generation of a field:
/// its name, the version of the index, and the frozen dictionary.
/// Built once per generation, shared by reference with every call.
#[derive(Clone)]
pub struct Corpus {
    field: String,
    version: u64,
    dic: Arc<dyn TermDictionary + Send + Sync>,
}

impl Corpus {
    pub fn new(field: &str, version: u64, dic: Arc<dyn TermDictionary + Send + Sync>) -> Self {
        Self { field: field.to_string(), version, dic }
    }

    /// Context for an index which is both the dictionary and the postings provider.
    pub fn from_index<I>(field: &str, index: Arc<I>) -> Self
    where
        I: TermDictionary + PositionalPostings + Send + Sync + 'static,
    {
        let version = index.version();
        Self::new(field, version, index)
    }

    pub fn field(&self) -> &str { &self.field }
    pub fn version(&self) -> u64 { self.version }
    pub fn dic(&self) -> &dyn TermDictionary { self.dic.as_ref() }

    /// Size of vectors indexed by term id.
    pub fn max_form(&self) -> usize { self.dic.size() }

    pub fn occs(&self, id: TermId) -> u64 { self.dic.occs(id) }

    /// Form of an id, `""` for the hole or an unknown id.
    pub fn form(&self, id: TermId) -> &str { self.dic.form(id).unwrap_or("") }
}

impl fmt::Debug for Corpus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Corpus")
            .field("field", &self.field)
            .field("version", &self.version)
            .field("forms", &self.dic.size())
            .finish()
    }
}
