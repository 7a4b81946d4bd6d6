// Spreadsheet ledger (xlsx, xls, xlsb, ods) read through calamine

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use gridrecon::model::LedgerCoord;
use gridrecon::{LedgerReader, ReconError};

use crate::table::CellTable;

/// A workbook loaded eagerly into memory, one [`CellTable`] per sheet.
///
/// A coordinate's sheet is resolved by exact name first, then by
/// case-insensitive substring (`"emei"` finds `"EMEI Março"`). Coordinates
/// without a sheet read the default sheet.
#[derive(Debug, Clone)]
pub struct WorkbookLedger {
    name: String,
    sheets: Vec<(String, CellTable)>,
    default_sheet: usize,
}

fn ledger_err(ledger: &str, message: String) -> ReconError {
    ReconError::Ledger {
        ledger: ledger.to_string(),
        message,
    }
}

impl WorkbookLedger {
    /// Open a workbook. `default_sheet` is matched like coordinate sheets;
    /// `None` means the first sheet.
    pub fn open(path: &Path, default_sheet: Option<&str>) -> Result<Self, ReconError> {
        let name = crate::display_name(path);

        let mut workbook: Sheets<_> =
            open_workbook_auto(path).map_err(|e| ledger_err(&name, format!("cannot open workbook: {e}")))?;

        let mut sheets = Vec::new();
        for sheet_name in workbook.sheet_names().to_vec() {
            let range = workbook
                .worksheet_range(&sheet_name)
                .map_err(|e| ledger_err(&name, format!("cannot read sheet '{sheet_name}': {e}")))?;

            // Data may not begin at A1.
            let (start_row, start_col) = range.start().unwrap_or((0, 0));
            let mut table = CellTable::new();
            for (r, row) in range.rows().enumerate() {
                for (c, cell) in row.iter().enumerate() {
                    if let Some(text) = cell_text(cell) {
                        table.set(start_row as usize + r, start_col as usize + c, &text);
                    }
                }
            }
            log::debug!("ledger '{name}': sheet '{sheet_name}' {} rows", table.row_count());
            sheets.push((sheet_name, table));
        }

        Self::from_sheets(&name, sheets, default_sheet)
    }

    pub fn from_sheets(
        name: &str,
        sheets: Vec<(String, CellTable)>,
        default_sheet: Option<&str>,
    ) -> Result<Self, ReconError> {
        if sheets.is_empty() {
            return Err(ledger_err(name, "workbook contains no sheets".into()));
        }
        let mut ledger = Self {
            name: name.to_string(),
            sheets,
            default_sheet: 0,
        };
        if let Some(wanted) = default_sheet {
            ledger.default_sheet = ledger
                .find_sheet(wanted)
                .ok_or_else(|| ledger_err(name, format!("no sheet matching '{wanted}'")))?;
        }
        Ok(ledger)
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|(n, _)| n.as_str()).collect()
    }

    fn find_sheet(&self, wanted: &str) -> Option<usize> {
        let lower = wanted.to_lowercase();
        self.sheets
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(wanted))
            .or_else(|| self.sheets.iter().position(|(n, _)| n.to_lowercase().contains(&lower)))
    }
}

impl LedgerReader for WorkbookLedger {
    fn source_name(&self) -> &str {
        &self.name
    }

    fn read(&self, coord: &LedgerCoord) -> Result<Option<String>, ReconError> {
        let index = match &coord.sheet {
            Some(wanted) => self
                .find_sheet(wanted)
                .ok_or_else(|| ledger_err(&self.name, format!("no sheet matching '{wanted}'")))?,
            None => self.default_sheet,
        };
        let (_, table) = &self.sheets[index];
        Ok(table.get(coord.row, coord.col).map(str::to_string))
    }
}

/// Display text of a calamine cell; `None` for empty cells.
fn cell_text(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::Empty => return None,
        Data::String(s) => s.trim().to_string(),
        // Integers without decimals, so 1665.0 reads as "1665".
        Data::Float(n) => format_float(*n),
        Data::Int(n) => n.to_string(),
        Data::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        Data::Error(e) => format!("#{e:?}"),
        Data::DateTime(dt) => format_float(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    };
    (!text.is_empty()).then_some(text)
}

fn format_float(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}
