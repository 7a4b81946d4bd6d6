use thiserror::Error;

/// Fatal errors. Anything here aborts the run and no partial report is produced.
///
/// Section-level problems (missing tables, anchors, out-of-range columns) are
/// not errors at this level; they are recorded in the report as failed
/// sections. See [`AlignmentError`] and [`SelectError`].
#[derive(Debug, Error)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (empty section list, bad column letter, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// The Extractor collaborator failed or returned malformed grids.
    #[error("extraction failed for '{document}': {message}")]
    Extraction { document: String, message: String },
    /// The Ledger Reader collaborator failed.
    #[error("ledger '{ledger}': {message}")]
    Ledger { ledger: String, message: String },
    /// The report could not be rendered as JSON.
    #[error("report serialization failed: {0}")]
    Serialize(String),
    /// The batch worker pool could not be started.
    #[error("worker pool: {0}")]
    Pool(String),
    /// The run was cancelled at a section checkpoint.
    #[error("reconciliation cancelled")]
    Cancelled,
}

/// Why a grid could not be aligned with its section spec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlignmentError {
    #[error("anchor not found in column {column}")]
    AnchorNotFound { column: usize },
    #[error("anchor pattern '{pattern}' does not compile: {message}")]
    InvalidPattern { pattern: String, message: String },
    #[error("span probe for block '{block}' found no matching row")]
    ProbeNotFound { block: String },
    #[error("logical column {logical} maps to physical column {physical}, grid has {col_count}")]
    ColumnOutOfRange { logical: usize, physical: usize, col_count: usize },
    #[error("logical row {logical} maps to physical row {physical}, grid has {row_count}")]
    RowOutOfRange { logical: usize, physical: usize, row_count: usize },
}

/// The table selector found nothing inside the section's envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectError {
    #[error("no grid on page {page} with {rows:?} rows and {cols:?} columns ({candidates} grid(s) inspected)")]
    NotFound {
        page: usize,
        rows: [usize; 2],
        cols: [usize; 2],
        candidates: usize,
    },
}

/// A grid handed over by an extractor violates the cell invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("cell ({row}, {col}) has a zero span")]
    ZeroSpan { row: usize, col: usize },
    #[error("two cells share origin ({row}, {col})")]
    DuplicateOrigin { row: usize, col: usize },
    #[error("cell ({row}, {col}) lies outside a {row_count}x{col_count} grid")]
    OutOfShape {
        row: usize,
        col: usize,
        row_count: usize,
        col_count: usize,
    },
    #[error("cell ({row}, {col}) spans {row_span}x{col_span}, past the edge of a {row_count}x{col_count} grid")]
    SpanOutOfShape {
        row: usize,
        col: usize,
        row_span: usize,
        col_span: usize,
        row_count: usize,
        col_count: usize,
    },
}
