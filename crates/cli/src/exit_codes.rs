//! CLI Exit Code Registry
//!
//! Single source of truth for `gridrecon` exit codes. Scripts branch on them,
//! so they are part of the shell contract.
//!
//! | Code | Meaning                                                   |
//! |------|-----------------------------------------------------------|
//! | 0    | Reconciled: every compared cell matched                   |
//! | 1    | Mismatches found                                          |
//! | 2    | Usage error (bad arguments, unreadable manifest)          |
//! | 3    | Needs review (failed section, low confidence, wrong id)   |
//! | 4    | Invalid config (TOML parse or validation failure)         |
//! | 5    | Runtime failure (extractor, ledger, IO, worker pool)      |
//!
//! `batch` exits with the most severe code across its rows, ranked
//! runtime > needs review > mismatches > reconciled.

use gridrecon::{ReconError, ReportStatus};

/// Every compared cell matched and nothing needs review.
pub const EXIT_SUCCESS: u8 = 0;

/// At least one cell disagreed with the ledger.
/// Like `diff(1)`, exit 1 means "sources differ."
pub const EXIT_RECON_MISMATCH: u8 = 1;

/// Bad arguments, missing required options, malformed manifest.
pub const EXIT_USAGE: u8 = 2;

/// The report cannot be trusted without a human: a section failed to align,
/// OCR confidence is low, or the document identifier disagrees.
pub const EXIT_RECON_NEEDS_REVIEW: u8 = 3;

/// Config failed to parse or validate.
pub const EXIT_RECON_INVALID_CONFIG: u8 = 4;

/// A collaborator (extractor, ledger) or the runtime failed.
pub const EXIT_RECON_RUNTIME: u8 = 5;

pub fn status_exit_code(status: ReportStatus) -> u8 {
    match status {
        ReportStatus::Reconciled => EXIT_SUCCESS,
        ReportStatus::Mismatched => EXIT_RECON_MISMATCH,
        ReportStatus::NeedsReview => EXIT_RECON_NEEDS_REVIEW,
    }
}

pub fn error_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_RECON_INVALID_CONFIG,
        _ => EXIT_RECON_RUNTIME,
    }
}

/// Rank for combining batch rows; higher wins.
pub fn severity(code: u8) -> u8 {
    match code {
        EXIT_SUCCESS => 0,
        EXIT_RECON_MISMATCH => 1,
        EXIT_RECON_NEEDS_REVIEW => 2,
        _ => 3,
    }
}
