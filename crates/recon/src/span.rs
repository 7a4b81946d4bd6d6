use crate::model::Grid;

/// Physical columns consumed at `boundary` on `sample_row`.
///
/// Reads the cell covering `(sample_row, boundary)`. When that cell started
/// left of the boundary only the part from the boundary onward counts. No
/// cell means a width of 1.
pub fn resolve_span(grid: &Grid, boundary: usize, sample_row: usize) -> usize {
    grid.covering(sample_row, boundary)
        .map(|c| c.col_span - (boundary - c.col))
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Cell;

    #[test]
    fn span_at_origin() {
        let grid = Grid::new(1, 2, 6, vec![Cell::spanning(1, 2, 1, 3, Some("10"))]).unwrap();
        assert_eq!(resolve_span(&grid, 2, 1), 3);
    }

    #[test]
    fn span_entered_midway() {
        let grid = Grid::new(1, 2, 6, vec![Cell::spanning(1, 1, 1, 3, Some("10"))]).unwrap();
        assert_eq!(resolve_span(&grid, 2, 1), 2);
    }

    #[test]
    fn missing_cell_defaults_to_one() {
        let grid = Grid::new(1, 2, 6, vec![Cell::spanning(0, 2, 1, 3, Some("hdr"))]).unwrap();
        assert_eq!(resolve_span(&grid, 2, 1), 1);
    }
}
