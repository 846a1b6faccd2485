//! Lexical statistics over the token stream of an indexed field.
//!
//! The rail is the sequence of term ids of every document, derived once per
//! corpus version from positional postings and read through a memory map.
//! Queries scan it with a window to count co-occurrences, fill matrices and
//! graphs, or mine expressions, then score forms with distribution laws.

pub mod bits;
pub mod config;
pub mod cooc;
pub mod corpus;
pub mod distrib;
pub mod errors;
pub mod form_enum;
pub mod graph;
pub mod index;
pub mod matrix;
pub mod mi;
pub mod persist;
pub mod rail;
pub mod tags;

pub use bits::FormSet;
pub use config::{LoadMode, RailConfig};
pub use corpus::Corpus;
pub use distrib::{Distrib, Law};
pub use errors::{Error, Result};
pub use form_enum::FormEnum;
pub use graph::{Edge, EdgeMatrix};
pub use index::{DocId, MemoryIndex, PositionalPostings, TermDictionary, TermId, HOLE};
pub use matrix::CoocMat;
pub use mi::Mi;
pub use rail::{build_rail, Rail, RailCache, RailStore};
pub use tags::TagFilter;
