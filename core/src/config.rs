//! Tuning constants and the on-disk configuration of a rail directory.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::errors::Result;

/// BM25 term frequency saturation.
pub const BM25_K1: f64 = 1.2;

/// BM25 document length normalization.
pub const BM25_B: f64 = 0.75;

/// Floor of the tf part in the tf-idf law, `idf * (k + (1 - k) * tf)`.
pub const TFIDF_K: f64 = 0.2;

/// Below this count, ppmi considers an event as noise.
pub const PPMI_K: f64 = 4.0;

/// File extension of a persisted rail, `{field}.rail`.
pub const RAIL_EXTENSION: &str = "rail";

/// Written after each document in the flat buffer, never a valid term id.
pub const RAIL_TERMINATOR: u32 = u32::MAX;

/// How the rail file is brought in memory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadMode {
    /// Read-only memory map of the file.
    #[default]
    Mmap,
    /// Whole file copied on the heap, for targets where mapping is not wanted.
    Owned,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RailConfig {
    /// Directory holding the `{field}.rail` files.
    pub dir: PathBuf,
    #[serde(default)]
    pub load_mode: LoadMode,
    #[serde(default = "default_context")]
    pub default_left: usize,
    #[serde(default = "default_context")]
    pub default_right: usize,
}

fn default_context() -> usize { 5 }

impl RailConfig {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            load_mode: LoadMode::default(),
            default_left: default_context(),
            default_right: default_context(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut f = File::open(path)?;
        let mut buf = String::new();
        f.read_to_string(&mut buf)?;
        Self::from_json_str(&buf)
    }
}
