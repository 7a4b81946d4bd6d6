// In-memory cell store shared by the CSV and workbook ledgers

/// Cell text addressed from A1 (row 0, column 0). Empty strings are stored
/// as absent so a blank ledger cell reads as `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellTable {
    rows: Vec<Vec<Option<String>>>,
}

impl CellTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, row: usize, col: usize, value: &str) {
        if value.is_empty() {
            return;
        }
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= col {
            cells.resize(col + 1, None);
        }
        cells[col] = Some(value.to_string());
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col)?.as_deref()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn col_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sparse_set_and_get() {
        let mut t = CellTable::new();
        t.set(2, 3, "x");
        t.set(0, 0, "");
        assert_eq!(t.get(2, 3), Some("x"));
        assert_eq!(t.get(0, 0), None);
        assert_eq!(t.get(9, 9), None);
        assert_eq!((t.row_count(), t.col_count()), (3, 4));
    }
}
