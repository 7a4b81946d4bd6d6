// Delimited-text ledger

use std::io::Read;
use std::path::Path;

use gridrecon::model::LedgerCoord;
use gridrecon::{LedgerReader, ReconError};

use crate::table::CellTable;

/// A CSV/TSV ledger. Every row is data (no header); the sheet part of a
/// coordinate is ignored.
#[derive(Debug, Clone)]
pub struct CsvLedger {
    name: String,
    table: CellTable,
}

impl CsvLedger {
    pub fn open(path: &Path) -> Result<Self, ReconError> {
        let name = crate::display_name(path);
        let content = read_file_as_utf8(path).map_err(|message| ReconError::Ledger {
            ledger: name.clone(),
            message,
        })?;
        Self::parse(&name, &content)
    }

    pub fn parse(name: &str, content: &str) -> Result<Self, ReconError> {
        let delimiter = sniff_delimiter(content);
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(content.as_bytes());

        let mut table = CellTable::new();
        for (row_idx, result) in reader.records().enumerate() {
            let record = result.map_err(|e| ReconError::Ledger {
                ledger: name.to_string(),
                message: e.to_string(),
            })?;
            for (col_idx, field) in record.iter().enumerate() {
                table.set(row_idx, col_idx, field.trim());
            }
        }

        log::debug!(
            "ledger '{name}': {} rows, delimiter {:?}",
            table.row_count(),
            delimiter as char
        );
        Ok(Self {
            name: name.to_string(),
            table,
        })
    }
}

impl LedgerReader for CsvLedger {
    fn source_name(&self) -> &str {
        &self.name
    }

    fn read(&self, coord: &LedgerCoord) -> Result<Option<String>, ReconError> {
        Ok(self.table.get(coord.row, coord.col).map(str::to_string))
    }
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
pub(crate) fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read a file as UTF-8, falling back to Windows-1252 (common for Excel-exported CSVs).
pub fn read_file_as_utf8(path: &Path) -> Result<String, String> {
    let mut file = std::fs::File::open(path).map_err(|e| format!("{}: {e}", path.display()))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| e.to_string())?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(e.as_bytes());
            Ok(decoded.into_owned())
        }
    }
}
