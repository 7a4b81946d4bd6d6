//! Collaborator seams: where grids and ledger values come from.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::ReconError;
use crate::model::{Extraction, LedgerCoord};

/// A scanned document handed to an [`Extractor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub name: String,
    pub path: Option<PathBuf>,
}

impl Document {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
        }
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { name, path: Some(path) }
    }
}

/// Turns a document into grids. Called once per reconciliation.
pub trait Extractor: Send + Sync {
    fn extract(&self, document: &Document) -> Result<Extraction, ReconError>;
}

/// Read access to the authoritative ledger.
pub trait LedgerReader: Send + Sync {
    /// Human-readable name of the ledger (usually its file name).
    fn source_name(&self) -> &str;

    /// Raw value at `coord`; `Ok(None)` for an empty or absent cell.
    fn read(&self, coord: &LedgerCoord) -> Result<Option<String>, ReconError>;

    /// Rectangular block `rows x cols` (half-open, zero-based).
    fn read_range(
        &self,
        sheet: Option<&str>,
        rows: std::ops::Range<usize>,
        cols: std::ops::Range<usize>,
    ) -> Result<Vec<Vec<Option<String>>>, ReconError> {
        rows.map(|row| {
            cols.clone()
                .map(|col| self.read(&LedgerCoord::new(sheet, row, col)))
                .collect::<Result<Vec<_>, _>>()
        })
        .collect()
    }
}

// ---------------------------------------------------------------------------
// In-memory collaborators
// ---------------------------------------------------------------------------

/// A ledger held in memory. The sheet is part of the key, so `None` and
/// `Some("EMEI")` are distinct cells.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    name: String,
    cells: BTreeMap<LedgerCoord, String>,
}

impl MemoryLedger {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cells: BTreeMap::new(),
        }
    }

    pub fn set(&mut self, coord: LedgerCoord, value: impl Into<String>) {
        self.cells.insert(coord, value.into());
    }

    /// Set a cell by A1 reference. Returns `false` for a malformed reference.
    pub fn set_a1(&mut self, sheet: Option<&str>, reference: &str, value: impl Into<String>) -> bool {
        match LedgerCoord::parse_a1(sheet, reference) {
            Some(coord) => {
                self.set(coord, value);
                true
            }
            None => false,
        }
    }

    pub fn with(mut self, sheet: Option<&str>, reference: &str, value: &str) -> Self {
        self.set_a1(sheet, reference, value);
        self
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl LedgerReader for MemoryLedger {
    fn source_name(&self) -> &str {
        &self.name
    }

    fn read(&self, coord: &LedgerCoord) -> Result<Option<String>, ReconError> {
        Ok(self.cells.get(coord).cloned())
    }
}

/// Returns a fixed extraction for every document.
#[derive(Debug, Clone)]
pub struct MemoryExtractor {
    extraction: Extraction,
}

impl MemoryExtractor {
    pub fn new(extraction: Extraction) -> Self {
        Self { extraction }
    }
}

impl Extractor for MemoryExtractor {
    fn extract(&self, _document: &Document) -> Result<Extraction, ReconError> {
        Ok(self.extraction.clone())
    }
}
