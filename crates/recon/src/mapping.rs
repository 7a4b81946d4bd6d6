//! Logical-to-physical column and row maps for one section of one grid.
//!
//! Positions are derived by counting forward from the anchor and from block
//! boundaries, never by matching header text. Both maps are built once per
//! (document, section) and are read-only afterwards.

use crate::anchor::locate;
use crate::config::{BlockStart, NormalizerConfig, RowStrategy, SectionSpec};
use crate::error::AlignmentError;
use crate::model::{Grid, ValueKind};
use crate::normalize::normalize;
use crate::span::resolve_span;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    physical: Vec<usize>,
}

impl ColumnMap {
    pub fn physical(&self, logical: usize) -> Option<usize> {
        self.physical.get(logical).copied()
    }

    pub fn len(&self) -> usize {
        self.physical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.physical.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.physical
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowMap {
    entries: Vec<Option<usize>>,
}

impl RowMap {
    /// Physical row for `logical`; `None` when a keyed label was not found.
    pub fn physical(&self, logical: usize) -> Option<usize> {
        self.entries.get(logical).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn as_slice(&self) -> &[Option<usize>] {
        &self.entries
    }
}

pub fn build_column_map(
    grid: &Grid,
    section: &SectionSpec,
    anchor_row: usize,
    rules: &NormalizerConfig,
) -> Result<ColumnMap, AlignmentError> {
    let mut physical: Vec<usize> = Vec::new();

    for block in &section.blocks {
        let start = match &block.start {
            BlockStart::Fixed(col) => *col,
            BlockStart::AfterPrevious(after) => {
                let boundary = physical.last().copied().unwrap_or(0);
                let sample_row = match &after.probe {
                    Some(probe) => match locate(grid, probe, rules) {
                        Ok((row, _)) => row,
                        Err(AlignmentError::AnchorNotFound { .. }) => {
                            return Err(AlignmentError::ProbeNotFound {
                                block: block.name.clone(),
                            })
                        }
                        Err(e) => return Err(e),
                    },
                    None => anchor_row,
                };
                boundary + resolve_span(grid, boundary, sample_row)
            }
        };

        for offset in 0..block.columns.len() {
            let col = start + offset;
            if col >= grid.col_count() {
                return Err(AlignmentError::ColumnOutOfRange {
                    logical: physical.len(),
                    physical: col,
                    col_count: grid.col_count(),
                });
            }
            physical.push(col);
        }
    }

    Ok(ColumnMap { physical })
}

pub fn build_row_map(
    grid: &Grid,
    section: &SectionSpec,
    anchor_row: usize,
    rules: &NormalizerConfig,
) -> Result<RowMap, AlignmentError> {
    let entries = match section.rows.strategy {
        RowStrategy::Sequential => {
            let mut entries = Vec::with_capacity(section.row_count());
            for k in 0..section.row_count() {
                let row = anchor_row + k + section.extracted_shift(k);
                if row >= grid.row_count() {
                    return Err(AlignmentError::RowOutOfRange {
                        logical: k,
                        physical: row,
                        row_count: grid.row_count(),
                    });
                }
                entries.push(Some(row));
            }
            entries
        }
        RowStrategy::Keyed => {
            let key_column = section.rows.key_column.unwrap_or(section.anchor.column);
            section
                .row_labels()
                .iter()
                .map(|label| {
                    let want = label.trim().to_lowercase();
                    grid.cells_in_column(key_column)
                        .filter(|c| c.row >= anchor_row)
                        .find(|c| {
                            normalize(c.content.as_deref(), ValueKind::Text, rules)
                                .key_text()
                                .to_lowercase()
                                == want
                        })
                        .map(|c| c.row)
                })
                .collect()
        }
    };

    Ok(RowMap { entries })
}
