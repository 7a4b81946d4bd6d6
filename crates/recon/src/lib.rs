//! `gridrecon`: structural alignment and cell-level reconciliation of
//! OCR-extracted tables against an authoritative ledger.
//!
//! Pure engine crate: receives grids through [`Extractor`] and ledger values
//! through [`LedgerReader`], returns a [`ReconciliationReport`].
//! File formats live in `gridrecon-io`, the command line in `gridrecon-cli`.

pub mod anchor;
pub mod compare;
pub mod config;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod mapping;
pub mod model;
pub mod normalize;
pub mod pool;
pub mod section;
pub mod select;
pub mod source;
pub mod span;

pub use config::ReconConfig;
pub use engine::{reconcile, reconcile_extraction, reconcile_with};
pub use error::{AlignmentError, GridError, ReconError, SelectError};
pub use model::{Cell, Extraction, Grid, LedgerCoord, NormalizedValue, Outcome, ReconciliationReport, ReportStatus};
pub use pool::{CancelToken, ReconJob, ReconPool};
pub use source::{Document, Extractor, LedgerReader, MemoryExtractor, MemoryLedger};
