//! Reconciles one configured section against one extraction.
//!
//! A section moves `SelectingTable -> BuildingMaps -> Comparing -> Done`.
//! Table and alignment problems end it in `Failed`, which is recorded in the
//! result and never retried. Ledger errors are not section failures: they
//! abort the whole run.

use crate::anchor::locate;
use crate::compare::compare;
use crate::config::{NormalizerConfig, SectionSpec};
use crate::error::{AlignmentError, ReconError};
use crate::mapping::{build_column_map, build_row_map, ColumnMap, RowMap};
use crate::model::{
    ratio, Alignment, CellComparison, Extraction, FailureReason, Grid, GridCoord, LedgerCoord,
    SectionResult, SectionStatus,
};
use crate::normalize::normalize_detailed;
use crate::select::select;
use crate::source::LedgerReader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionState {
    SelectingTable,
    BuildingMaps,
    Comparing,
    Done,
    Failed,
}

pub struct SectionReconciler<'a> {
    spec: &'a SectionSpec,
    rules: &'a NormalizerConfig,
    state: SectionState,
}

struct Maps {
    anchor_row: usize,
    columns: ColumnMap,
    rows: RowMap,
}

impl<'a> SectionReconciler<'a> {
    pub fn new(spec: &'a SectionSpec, rules: &'a NormalizerConfig) -> Self {
        Self {
            spec,
            rules,
            state: SectionState::SelectingTable,
        }
    }

    pub fn state(&self) -> SectionState {
        self.state
    }

    fn transition(&mut self, next: SectionState) {
        log::debug!("section '{}': {:?} -> {:?}", self.spec.name, self.state, next);
        self.state = next;
    }

    fn fail(&mut self, reason: FailureReason, detail: String) -> SectionResult {
        log::warn!("section '{}' failed ({reason}): {detail}", self.spec.name);
        self.transition(SectionState::Failed);
        SectionResult::failed(&self.spec.name, reason, detail)
    }

    pub fn run(&mut self, extraction: &Extraction, ledger: &dyn LedgerReader) -> Result<SectionResult, ReconError> {
        let (grid_index, grid) = match select(&extraction.grids, &self.spec.envelope) {
            Ok(found) => found,
            Err(e) => return Ok(self.fail(FailureReason::TableNotFound, e.to_string())),
        };
        log::debug!(
            "section '{}': grid {grid_index} ({}x{}, page {})",
            self.spec.name,
            grid.row_count(),
            grid.col_count(),
            grid.page()
        );

        self.transition(SectionState::BuildingMaps);
        let maps = match self.build_maps(grid) {
            Ok(maps) => maps,
            Err(e) => return Ok(self.fail(FailureReason::AlignmentFailed, e.to_string())),
        };

        self.transition(SectionState::Comparing);
        let mut result = self.compare_cells(grid_index, grid, &maps, ledger)?;
        result.alignment = Some(Alignment {
            grid_index,
            page: grid.page(),
            anchor_row: maps.anchor_row,
            columns: maps.columns.as_slice().to_vec(),
            rows: maps.rows.as_slice().to_vec(),
        });

        self.transition(SectionState::Done);
        Ok(result)
    }

    fn build_maps(&self, grid: &Grid) -> Result<Maps, AlignmentError> {
        let (anchor_row, _) = locate(grid, &self.spec.anchor, self.rules)?;
        let columns = build_column_map(grid, self.spec, anchor_row, self.rules)?;
        let rows = build_row_map(grid, self.spec, anchor_row, self.rules)?;
        Ok(Maps {
            anchor_row,
            columns,
            rows,
        })
    }

    fn compare_cells(
        &self,
        grid_index: usize,
        grid: &Grid,
        maps: &Maps,
        ledger: &dyn LedgerReader,
    ) -> Result<SectionResult, ReconError> {
        let spec = self.spec;
        let columns = spec.logical_columns();
        let mut comparisons = Vec::new();
        let mut compared = 0;
        let mut mismatches = 0;

        for (k, label) in spec.row_labels().iter().enumerate() {
            let ledger_row = spec.ledger_row(k);
            let physical_row = maps.rows.physical(k);

            for (j, column) in columns.iter().enumerate() {
                let coord = LedgerCoord::new(spec.sheet.as_deref(), ledger_row, column.ledger_col);
                let raw_auth = ledger.read(&coord)?;

                let position = physical_row.zip(maps.columns.physical(j));
                let raw_ext = position
                    .and_then(|(r, c)| grid.cell_at(r, c))
                    .and_then(|cell| cell.content.as_deref());

                let auth = normalize_detailed(raw_auth.as_deref(), column.kind, self.rules);
                let ext = normalize_detailed(raw_ext, column.kind, self.rules);
                let outcome = compare(&auth.value, &ext.value);

                compared += 1;
                if !outcome.is_match() {
                    mismatches += 1;
                }
                if outcome.is_match() && !spec.keep_matches {
                    continue;
                }

                comparisons.push(CellComparison {
                    section: spec.name.clone(),
                    logical_row: k,
                    row_label: label.clone(),
                    logical_column: j,
                    column_label: column.label.clone(),
                    authoritative_value: auth.value,
                    extracted_value: ext.value,
                    authoritative_ref: coord.a1(),
                    authoritative_coordinate: coord,
                    extracted_coordinate: position.map(|(row, col)| GridCoord {
                        page: grid.page(),
                        grid_index,
                        row,
                        col,
                    }),
                    authoritative_ambiguity: auth.ambiguity,
                    extracted_ambiguity: ext.ambiguity,
                    outcome,
                });
            }
        }

        log::debug!(
            "section '{}': {compared} cells compared, {mismatches} mismatches",
            spec.name
        );

        Ok(SectionResult {
            section_name: spec.name.clone(),
            status: SectionStatus::Done,
            alignment: None,
            comparisons,
            total_compared: compared,
            total_mismatches: mismatches,
            match_ratio: ratio(compared, mismatches),
        })
    }
}
