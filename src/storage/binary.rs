//! Binary hypergraph file format (`HGR1`)
//!
//! Little-endian, byte-exact:
//!
//! ```text
//! u32  magic = 0x31475248            // the bytes 'H' 'G' 'R' '1'
//! u32  version = 1
//! u64  num_vertices (> 0)
//! u64  num_edges
//! repeat num_edges times:
//!     u64  edge_size (> 0)
//!     edge_size x u64 vertex ids
//! u8   has_labels (0 | 1)
//! if has_labels: num_vertices x i32 labels
//! ```
//!
//! [`Hypergraph::load_from_file`] auto-detects JSON input by the first
//! non-whitespace byte `{`; everything else is parsed as `HGR1`.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::hypergraph::{Hypergraph, Label, VertexId};
use super::json;

/// `'H' 'G' 'R' '1'` read as a little-endian u32
pub const HGR_MAGIC: u32 = 0x3147_5248;

/// Supported format version
pub const HGR_VERSION: u32 = 1;

/// Hypergraph file I/O errors
#[derive(Debug, Error)]
pub enum LoadError {
    /// Underlying file system failure
    #[error("failed to access {path}: {source}")]
    Io {
        /// Path of the file being read or written
        path: PathBuf,
        /// The originating I/O error
        #[source]
        source: std::io::Error,
    },

    /// The file violates the `HGR1` layout or the JSON schema
    #[error("invalid hypergraph file ({reason}): {path}")]
    InvalidFile {
        /// Path of the offending file
        path: PathBuf,
        /// What was wrong
        reason: String,
    },
}

impl LoadError {
    pub(crate) fn invalid(path: &Path, reason: impl Into<String>) -> Self {
        Self::InvalidFile {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

/// Byte cursor with truncation-aware reads
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
    path: &'a Path,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8], LoadError> {
        let end = self.pos.checked_add(n).filter(|&e| e <= self.bytes.len());
        match end {
            Some(end) => {
                let slice = &self.bytes[self.pos..end];
                self.pos = end;
                Ok(slice)
            }
            None => Err(LoadError::invalid(self.path, format!("truncated {what}"))),
        }
    }

    fn read_u32(&mut self, what: &str) -> Result<u32, LoadError> {
        let b = self.take(4, what)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_u64(&mut self, what: &str) -> Result<u64, LoadError> {
        let b = self.take(8, what)?;
        Ok(u64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    fn read_i32(&mut self, what: &str) -> Result<i32, LoadError> {
        let b = self.take(4, what)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }
}

impl Hypergraph {
    /// Save the hypergraph (structure and labels) in `HGR1` format.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Io`] on any file system failure.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), LoadError> {
        let path = path.as_ref();
        let io_err = |source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        };

        let file = fs::File::create(path).map_err(io_err)?;
        let mut out = BufWriter::new(file);

        let mut write = |bytes: &[u8]| out.write_all(bytes).map_err(io_err);

        write(&HGR_MAGIC.to_le_bytes())?;
        write(&HGR_VERSION.to_le_bytes())?;
        write(&(self.num_vertices() as u64).to_le_bytes())?;
        write(&(self.num_edges() as u64).to_le_bytes())?;

        for members in self.iter_hyperedges() {
            write(&(members.len() as u64).to_le_bytes())?;
            for &v in members {
                write(&u64::from(v).to_le_bytes())?;
            }
        }

        // Labels are always present on save
        write(&[1u8])?;
        for &label in self.labels() {
            write(&label.to_le_bytes())?;
        }

        out.flush().map_err(io_err)
    }

    /// Load a hypergraph from `path`.
    ///
    /// The format is auto-detected: a first non-whitespace byte of `{` is
    /// parsed as JSON (see [`crate::storage`] JSON schemas), anything else as
    /// binary `HGR1`.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] on I/O failure or any format violation (bad
    /// magic or version, zero vertex count, empty edge, truncated stream).
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        // Binary files start with 'H' from the magic, so this is unambiguous
        let first = bytes.iter().find(|b| !b.is_ascii_whitespace());
        if first == Some(&b'{') {
            return json::load_from_json_bytes(&bytes, path);
        }
        load_from_binary_bytes(&bytes, path)
    }
}

fn load_from_binary_bytes(bytes: &[u8], path: &Path) -> Result<Hypergraph, LoadError> {
    let mut cur = Cursor {
        bytes,
        pos: 0,
        path,
    };

    let magic = cur.read_u32("header")?;
    let version = cur.read_u32("header")?;
    if magic != HGR_MAGIC {
        return Err(LoadError::invalid(path, "bad magic"));
    }
    if version != HGR_VERSION {
        return Err(LoadError::invalid(path, format!("unsupported version {version}")));
    }

    let num_vertices = cur.read_u64("header")?;
    let num_edges = cur.read_u64("header")?;
    if num_vertices == 0 {
        return Err(LoadError::invalid(path, "num_vertices must be > 0"));
    }
    let num_vertices = usize::try_from(num_vertices)
        .map_err(|_| LoadError::invalid(path, "num_vertices exceeds platform limits"))?;

    let mut hg = Hypergraph::new(num_vertices);
    let mut members: Vec<VertexId> = Vec::new();

    for _ in 0..num_edges {
        let size = cur.read_u64("edge size")?;
        if size == 0 {
            return Err(LoadError::invalid(path, "zero edge size"));
        }
        members.clear();
        for _ in 0..size {
            let v = cur.read_u64("edge vertices")?;
            let v = VertexId::try_from(v)
                .map_err(|_| LoadError::invalid(path, format!("vertex id {v} out of range")))?;
            members.push(v);
        }
        hg.add_hyperedge(&members)
            .map_err(|e| LoadError::invalid(path, e.to_string()))?;
    }

    // The labels block is optional for forward compatibility
    if !cur.at_end() {
        let has_labels = cur.take(1, "labels flag")?[0];
        if has_labels == 1 {
            let mut labels: Vec<Label> = Vec::with_capacity(num_vertices);
            for _ in 0..num_vertices {
                labels.push(cur.read_i32("labels")?);
            }
            hg.set_labels(labels)
                .map_err(|e| LoadError::invalid(path, e.to_string()))?;
        }
    }

    Ok(hg)
}
