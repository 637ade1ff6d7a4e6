//! Contig dictionary: stable contig name <-> integer index mapping.
//!
//! Every coordinate comparison in the core uses the dense integer index
//! assigned here, so a single dictionary must be shared by all streams that
//! are ever merged or windowed together.

use std::path::Path;

use ahash::AHashMap;
use fgoxide::io::Io;

use crate::errors::{Result, SvasmError};

/// Bidirectional contig name <-> index dictionary.
///
/// Indices are dense and assigned in insertion order, which is the sort
/// order of the contigs in every output stream.
#[derive(Debug, Default, Clone)]
pub struct ContigDictionary {
    names: Vec<String>,
    index: AHashMap<String, u32>,
}

impl ContigDictionary {
    /// Create an empty dictionary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a dictionary from an ordered list of contig names.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let mut dict = Self::new();
        for name in names {
            dict.push(name.as_ref())?;
        }
        Ok(dict)
    }

    /// Load a dictionary file: one contig per line, `name` or `name<TAB>length`.
    ///
    /// Blank lines and `#` comments are skipped. The optional length column
    /// is accepted for compatibility with sequence-dictionary exports but is
    /// not retained.
    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        use std::io::BufRead;

        let reader = Io::default().new_reader(path.as_ref())?;
        let mut dict = Self::new();
        for line in reader.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let name = line.split('\t').next().unwrap_or(line);
            dict.push(name)?;
        }
        Ok(dict)
    }

    /// Append a contig, assigning it the next index.
    pub fn push(&mut self, name: &str) -> Result<u32> {
        if self.index.contains_key(name) {
            return Err(SvasmError::InvalidParameter {
                parameter: "dictionary".to_string(),
                reason: format!("duplicate contig name '{name}'"),
            });
        }
        let tid = self.names.len() as u32;
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), tid);
        Ok(tid)
    }

    /// Resolve a contig name to its index.
    pub fn tid(&self, name: &str) -> Result<u32> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| SvasmError::ContigNotFound { name: name.to_string() })
    }

    /// Resolve an index back to the contig name.
    #[must_use]
    pub fn name(&self, tid: u32) -> Option<&str> {
        self.names.get(tid as usize).map(String::as_str)
    }

    /// Number of contigs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True if no contigs have been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
