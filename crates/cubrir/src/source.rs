//! Template source access: explicit decoding and the offset-to-line index.
//!
//! Offsets recorded by the engine's parser and line numbers reported by the
//! coverage host only agree if both sides read the file through the same
//! decoding. The encoding is therefore explicit session configuration, never
//! a locale default, and every offset in this crate is a byte offset into
//! the decoded text.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::result::{CubrirError, CubrirResult};

/// Character encoding used to read template sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceEncoding {
    /// UTF-8, the default template charset
    #[default]
    Utf8,
    /// ISO-8859-1 (Latin-1)
    Latin1,
}

impl SourceEncoding {
    /// Decode raw file bytes, or `None` if they are invalid in this encoding.
    #[must_use]
    pub fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            Self::Utf8 => String::from_utf8(bytes.to_vec()).ok(),
            // Latin-1 maps each byte to the code point of the same value,
            // so it cannot fail.
            Self::Latin1 => Some(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }
}

impl fmt::Display for SourceEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Utf8 => f.write_str("utf-8"),
            Self::Latin1 => f.write_str("latin-1"),
        }
    }
}

/// Read the source of a template, returning the decoded text.
pub fn read_template_source(path: &Path, encoding: SourceEncoding) -> CubrirResult<String> {
    let bytes = fs::read(path)?;
    encoding
        .decode(&bytes)
        .ok_or_else(|| CubrirError::SourceDecode {
            path: path.to_path_buf(),
            encoding,
        })
}

/// Offset-to-line-number index for one file's text.
///
/// Holds one entry per physical line: the cumulative length of the text
/// through the end of that line, terminator included. A line map of
/// `[13, 19, 30]` means line 1 spans offsets `0..13`, line 2 spans
/// `13..19`, and line 3 spans `19..30`. Line 1 always starts at offset 0.
/// Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineMap {
    cumulative: Vec<usize>,
}

impl LineMap {
    /// Build the index from decoded template text.
    #[must_use]
    pub fn new(text: &str) -> Self {
        let mut cumulative = Vec::new();
        let mut total = 0;
        for line in text.split_inclusive('\n') {
            total += line.len();
            cumulative.push(total);
        }
        Self { cumulative }
    }

    /// The 1-based line number whose span contains `offset`.
    ///
    /// Returns `None` when `offset` is at or past the end of the text. The
    /// caller must treat that as "no line", never as a reportable line.
    #[must_use]
    pub fn line_for_offset(&self, offset: usize) -> Option<u32> {
        // cumulative is strictly increasing, so the first entry greater
        // than `offset` names the containing line.
        let idx = self.cumulative.partition_point(|&end| end <= offset);
        (idx < self.cumulative.len()).then(|| idx as u32 + 1)
    }

    /// Number of physical lines indexed.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.cumulative.len()
    }
}

/// Shared cache of [`LineMap`]s, keyed by template path.
///
/// One map per file per measurement session. Renders may run on several
/// threads; a race that builds the same file's map twice is benign (the
/// rebuild is idempotent and both results are value-equal), so the lock is
/// only held around map access, never across file I/O.
#[derive(Debug)]
pub struct LineMapCache {
    encoding: SourceEncoding,
    maps: RwLock<HashMap<PathBuf, Arc<LineMap>>>,
}

impl LineMapCache {
    /// Create an empty cache that reads files with `encoding`.
    #[must_use]
    pub fn new(encoding: SourceEncoding) -> Self {
        Self {
            encoding,
            maps: RwLock::new(HashMap::new()),
        }
    }

    /// The encoding this cache decodes template files with.
    #[must_use]
    pub fn encoding(&self) -> SourceEncoding {
        self.encoding
    }

    /// The line map for `path`, building and caching it on first use.
    pub fn line_map(&self, path: &Path) -> CubrirResult<Arc<LineMap>> {
        if let Some(map) = self.maps.read().expect("line map lock").get(path) {
            return Ok(Arc::clone(map));
        }
        let text = read_template_source(path, self.encoding)?;
        let map = Arc::new(LineMap::new(&text));
        let mut maps = self.maps.write().expect("line map lock");
        Ok(Arc::clone(maps.entry(path.to_path_buf()).or_insert(map)))
    }
}
