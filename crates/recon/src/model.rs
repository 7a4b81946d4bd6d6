use std::fmt;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::error::{GridError, ReconError};

// ---------------------------------------------------------------------------
// Extracted grids
// ---------------------------------------------------------------------------

/// One cell of an extracted grid. A spanning cell is recorded once, at its origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
    pub row_span: usize,
    pub col_span: usize,
    pub content: Option<String>,
}

impl Cell {
    pub fn new(row: usize, col: usize, content: &str) -> Self {
        Self {
            row,
            col,
            row_span: 1,
            col_span: 1,
            content: Some(content.to_string()),
        }
    }

    pub fn spanning(row: usize, col: usize, row_span: usize, col_span: usize, content: Option<&str>) -> Self {
        Self {
            row,
            col,
            row_span,
            col_span,
            content: content.map(str::to_string),
        }
    }

    /// True if this cell occupies the physical position `(row, col)`.
    pub fn covers(&self, row: usize, col: usize) -> bool {
        row >= self.row && row - self.row < self.row_span && col >= self.col && col - self.col < self.col_span
    }
}

/// One detected table: cells plus the shape the extractor reported for it.
///
/// Cells are kept sorted by origin so lookups can binary-search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Grid {
    page: usize,
    row_count: usize,
    col_count: usize,
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new(page: usize, row_count: usize, col_count: usize, mut cells: Vec<Cell>) -> Result<Self, GridError> {
        for c in &cells {
            if c.row_span == 0 || c.col_span == 0 {
                return Err(GridError::ZeroSpan { row: c.row, col: c.col });
            }
            if c.row >= row_count || c.col >= col_count {
                return Err(GridError::OutOfShape {
                    row: c.row,
                    col: c.col,
                    row_count,
                    col_count,
                });
            }
            let row_end = c.row.checked_add(c.row_span);
            let col_end = c.col.checked_add(c.col_span);
            if !matches!((row_end, col_end), (Some(r), Some(k)) if r <= row_count && k <= col_count) {
                return Err(GridError::SpanOutOfShape {
                    row: c.row,
                    col: c.col,
                    row_span: c.row_span,
                    col_span: c.col_span,
                    row_count,
                    col_count,
                });
            }
        }

        cells.sort_by_key(|c| (c.row, c.col));
        if let Some(dup) = cells.windows(2).find(|w| (w[0].row, w[0].col) == (w[1].row, w[1].col)) {
            return Err(GridError::DuplicateOrigin {
                row: dup[0].row,
                col: dup[0].col,
            });
        }

        Ok(Self {
            page,
            row_count,
            col_count,
            cells,
        })
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn col_count(&self) -> usize {
        self.col_count
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// The cell whose origin is exactly `(row, col)`.
    pub fn cell_at(&self, row: usize, col: usize) -> Option<&Cell> {
        self.cells
            .binary_search_by_key(&(row, col), |c| (c.row, c.col))
            .ok()
            .map(|i| &self.cells[i])
    }

    /// The cell occupying `(row, col)`, either as its origin or through a span.
    pub fn covering(&self, row: usize, col: usize) -> Option<&Cell> {
        self.cell_at(row, col)
            .or_else(|| self.cells.iter().find(|c| c.covers(row, col)))
    }

    /// Cells whose origin lies in `col`, in row order.
    pub fn cells_in_column(&self, col: usize) -> impl Iterator<Item = &Cell> {
        self.cells.iter().filter(move |c| c.col == col)
    }

    /// Case-insensitive substring search over every cell's content.
    pub fn text_contains(&self, token: &str) -> bool {
        let needle = token.to_lowercase();
        self.cells.iter().any(|c| {
            c.content
                .as_deref()
                .map(|s| s.to_lowercase().contains(&needle))
                .unwrap_or(false)
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageConfidence {
    pub page: usize,
    pub confidence: f64,
}

/// Everything the extractor produced for one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Extraction {
    pub grids: Vec<Grid>,
    pub confidence: Option<f64>,
    pub page_confidence: Vec<PageConfidence>,
    pub document_id: Option<String>,
}

impl Extraction {
    pub fn new(grids: Vec<Grid>) -> Self {
        Self {
            grids,
            ..Default::default()
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_document_id(mut self, id: impl Into<String>) -> Self {
        self.document_id = Some(id.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Coordinates
// ---------------------------------------------------------------------------

/// A zero-based ledger position. Displays as an A1 reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LedgerCoord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,
    pub row: usize,
    pub col: usize,
}

impl LedgerCoord {
    pub fn new(sheet: Option<&str>, row: usize, col: usize) -> Self {
        Self {
            sheet: sheet.map(str::to_string),
            row,
            col,
        }
    }

    /// Parse an A1 reference such as `C5` (row and column become zero-based).
    pub fn parse_a1(sheet: Option<&str>, reference: &str) -> Option<Self> {
        let reference = reference.trim();
        let split = reference.find(|c: char| c.is_ascii_digit())?;
        let (letters, digits) = reference.split_at(split);
        let col = column_index(letters)?;
        let row: usize = digits.parse().ok()?;
        if row == 0 {
            return None;
        }
        Some(Self::new(sheet, row - 1, col))
    }

    /// The A1 reference without the sheet prefix.
    pub fn a1(&self) -> String {
        format!("{}{}", column_letter(self.col), self.row + 1)
    }
}

impl fmt::Display for LedgerCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sheet {
            Some(sheet) => write!(f, "{sheet}!{}", self.a1()),
            None => write!(f, "{}", self.a1()),
        }
    }
}

/// Convert column index to spreadsheet column letters (0 = A, 25 = Z, 26 = AA).
pub fn column_letter(col: usize) -> String {
    let mut result = String::new();
    let mut n = col;
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}

/// Inverse of [`column_letter`]. Case-insensitive; `None` for anything but letters.
pub fn column_index(letters: &str) -> Option<usize> {
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let mut n: usize = 0;
    for c in letters.chars() {
        let digit = (c.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        n = n.checked_mul(26)?.checked_add(digit)?;
    }
    Some(n - 1)
}

/// Where an extracted value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridCoord {
    pub page: usize,
    pub grid_index: usize,
    pub row: usize,
    pub col: usize,
}

// ---------------------------------------------------------------------------
// Normalized values
// ---------------------------------------------------------------------------

/// How a raw token should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Number,
    Checkbox,
    #[default]
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum NormalizedValue {
    Empty,
    Selected,
    Unselected,
    Number(OrderedFloat<f64>),
    Text(String),
}

impl NormalizedValue {
    pub fn number(n: f64) -> Self {
        Self::Number(OrderedFloat(n))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Self::Number(n) if n.0 == 0.0)
    }

    /// Plain text used for predicate matching: numbers without a trailing `.0`,
    /// empty as the empty string.
    pub fn key_text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Selected => "selected".into(),
            Self::Unselected => "unselected".into(),
            Self::Number(n) => format_number(n.0),
            Self::Text(s) => s.clone(),
        }
    }
}

impl fmt::Display for NormalizedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "(empty)"),
            Self::Selected => write!(f, "[x]"),
            Self::Unselected => write!(f, "[ ]"),
            Self::Number(n) => write!(f, "{}", format_number(n.0)),
            Self::Text(s) => write!(f, "{s:?}"),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// Why a token degraded to `Text`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Ambiguity {
    UnrecognizedCheckbox,
    UnparseableNumber,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalization {
    pub value: NormalizedValue,
    pub ambiguity: Option<Ambiguity>,
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Match,
    Mismatch,
    MissingInExtracted,
    MissingInAuthoritative,
}

impl Outcome {
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Match => write!(f, "match"),
            Self::Mismatch => write!(f, "mismatch"),
            Self::MissingInExtracted => write!(f, "missing_in_extracted"),
            Self::MissingInAuthoritative => write!(f, "missing_in_authoritative"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellComparison {
    pub section: String,
    pub logical_row: usize,
    pub row_label: String,
    pub logical_column: usize,
    pub column_label: String,
    pub authoritative_value: NormalizedValue,
    pub extracted_value: NormalizedValue,
    pub authoritative_coordinate: LedgerCoord,
    /// A1 form of `authoritative_coordinate`, for humans.
    pub authoritative_ref: String,
    pub extracted_coordinate: Option<GridCoord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authoritative_ambiguity: Option<Ambiguity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_ambiguity: Option<Ambiguity>,
    pub outcome: Outcome,
}

// ---------------------------------------------------------------------------
// Section results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    TableNotFound,
    AlignmentFailed,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TableNotFound => write!(f, "table_not_found"),
            Self::AlignmentFailed => write!(f, "alignment_failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SectionStatus {
    Done,
    Failed { reason: FailureReason, detail: String },
}

/// How a section's grid was aligned; enough to re-derive every extracted coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alignment {
    pub grid_index: usize,
    pub page: usize,
    pub anchor_row: usize,
    /// Physical column per logical column.
    pub columns: Vec<usize>,
    /// Physical row per logical row; `None` for keyed rows not present in the grid.
    pub rows: Vec<Option<usize>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionResult {
    pub section_name: String,
    pub status: SectionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alignment: Option<Alignment>,
    pub comparisons: Vec<CellComparison>,
    pub total_compared: usize,
    pub total_mismatches: usize,
    pub match_ratio: f64,
}

impl SectionResult {
    pub fn failed(section_name: &str, reason: FailureReason, detail: impl Into<String>) -> Self {
        Self {
            section_name: section_name.to_string(),
            status: SectionStatus::Failed {
                reason,
                detail: detail.into(),
            },
            alignment: None,
            comparisons: Vec::new(),
            total_compared: 0,
            total_mismatches: 0,
            match_ratio: 0.0,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, SectionStatus::Failed { .. })
    }

    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self.status {
            SectionStatus::Failed { reason, .. } => Some(reason),
            SectionStatus::Done => None,
        }
    }
}

/// `matched / compared`, or 0 when nothing was compared.
pub fn ratio(compared: usize, mismatches: usize) -> f64 {
    if compared == 0 {
        0.0
    } else {
        (compared - mismatches) as f64 / compared as f64
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportMeta {
    pub config_name: String,
    pub engine_version: String,
    pub document: String,
    pub ledger: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdentifierCheck {
    pub ledger: Option<String>,
    pub extracted: Option<String>,
    pub matched: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfidenceVerdict {
    pub threshold: f64,
    pub observed: Option<f64>,
    pub low: bool,
    pub low_pages: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Reconciled,
    Mismatched,
    NeedsReview,
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reconciled => write!(f, "reconciled"),
            Self::Mismatched => write!(f, "mismatched"),
            Self::NeedsReview => write!(f, "needs_review"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciliationReport {
    pub meta: ReportMeta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<IdentifierCheck>,
    pub confidence: ConfidenceVerdict,
    pub sections: Vec<SectionResult>,
    pub total_compared: usize,
    pub total_mismatches: usize,
    pub failed_sections: usize,
    pub overall_match_ratio: f64,
    pub status: ReportStatus,
    pub warnings: Vec<String>,
}

impl ReconciliationReport {
    /// Pretty JSON. Field order is fixed, so identical reports give identical bytes.
    pub fn to_json(&self) -> Result<String, ReconError> {
        serde_json::to_string_pretty(self).map_err(|e| ReconError::Serialize(e.to_string()))
    }

    pub fn section(&self, name: &str) -> Option<&SectionResult> {
        self.sections.iter().find(|s| s.section_name == name)
    }

    /// Every non-matching comparison across all sections, in section order.
    pub fn mismatches(&self) -> impl Iterator<Item = &CellComparison> {
        self.sections
            .iter()
            .flat_map(|s| s.comparisons.iter())
            .filter(|c| !c.outcome.is_match())
    }
}
