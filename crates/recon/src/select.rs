use crate::config::ShapeEnvelope;
use crate::error::SelectError;
use crate::model::Grid;

/// True if `grid` lies on the envelope's page, within both shape ranges and
/// carries every required token.
pub fn fits(grid: &Grid, envelope: &ShapeEnvelope) -> bool {
    let [rmin, rmax] = envelope.rows;
    let [cmin, cmax] = envelope.cols;
    grid.page() == envelope.page
        && (rmin..=rmax).contains(&grid.row_count())
        && (cmin..=cmax).contains(&grid.col_count())
        && envelope.contains.iter().all(|t| grid.text_contains(t))
}

/// Pick the grid that best fits `envelope`.
///
/// Among fitting grids the one nearest the envelope midpoint wins, ties go to
/// the lowest index. A grid outside the envelope is never returned, even when
/// it is the only one.
pub fn select<'a>(grids: &'a [Grid], envelope: &ShapeEnvelope) -> Result<(usize, &'a Grid), SelectError> {
    let [rmin, rmax] = envelope.rows;
    let [cmin, cmax] = envelope.cols;

    grids
        .iter()
        .enumerate()
        .filter(|(_, g)| fits(g, envelope))
        .min_by_key(|(i, g)| {
            // Doubled to stay in integers.
            let dr = (2 * g.row_count()).abs_diff(rmin + rmax);
            let dc = (2 * g.col_count()).abs_diff(cmin + cmax);
            (dr + dc, *i)
        })
        .ok_or(SelectError::NotFound {
            page: envelope.page,
            rows: envelope.rows,
            cols: envelope.cols,
            candidates: grids.len(),
        })
}
