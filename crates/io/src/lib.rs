// File-backed collaborators for the reconciliation engine

pub mod csv;
pub mod layout;
pub mod table;
pub mod workbook;

pub use self::csv::CsvLedger;
pub use layout::LayoutExtractor;
pub use workbook::WorkbookLedger;

use std::path::Path;

use gridrecon::{LedgerReader, ReconError};

/// Open a ledger by extension: `.csv`/`.tsv`/`.txt` as delimited text,
/// anything else as a workbook. `sheet` picks the default workbook sheet.
pub fn open_ledger(path: &Path, sheet: Option<&str>) -> Result<Box<dyn LedgerReader>, ReconError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "csv" | "tsv" | "txt" => Ok(Box::new(CsvLedger::open(path)?)),
        _ => Ok(Box::new(WorkbookLedger::open(path, sheet)?)),
    }
}

/// File name for display, falling back to the full path.
pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
