use std::path::PathBuf;

use crate::{DocId, TermId};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("left={left} right={right} not enough context to extract co-occurrences")]
    Window { left: usize, right: usize },

    #[error("pivot term(s) missing, a set of form ids is required")]
    NoPivots,

    #[error("{id} is not an accepted value as a {axis} id")]
    NotInRankSpace { id: TermId, axis: &'static str },

    #[error("doc id {doc_id} is outside [0, {max_doc})")]
    DocOutOfRange { doc_id: DocId, max_doc: u32 },

    #[error("field {0:?} has no stored positions, rail cannot be built")]
    NoPositions(String),

    #[error("corrupted rail file {}: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("could not publish rail file: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("invalid config: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Provider(#[from] anyhow::Error),
}

impl Error {
    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::Corrupt { path: path.into(), reason: reason.into() }
    }
}

/// Shared argument check for every windowed scan. Any width is accepted,
/// `usize::MAX` reaches the bound of the document.
pub(crate) fn check_window(left: usize, right: usize) -> Result<()> {
    if left == 0 && right == 0 {
        return Err(Error::Window { left, right });
    }
    Ok(())
}
