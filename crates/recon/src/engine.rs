use rayon::prelude::*;

use crate::config::ReconConfig;
use crate::error::ReconError;
use crate::evidence::{check_identifier, compute_totals, confidence_gate, decide_status};
use crate::model::{Extraction, ReconciliationReport, ReportMeta, SectionResult};
use crate::pool::CancelToken;
use crate::section::SectionReconciler;
use crate::source::{Document, Extractor, LedgerReader};

/// Reconcile one document against one ledger.
pub fn reconcile(
    extractor: &dyn Extractor,
    document: &Document,
    ledger: &dyn LedgerReader,
    config: &ReconConfig,
) -> Result<ReconciliationReport, ReconError> {
    reconcile_with(extractor, document, ledger, config, &CancelToken::new())
}

/// [`reconcile`] with a cancellation token.
pub fn reconcile_with(
    extractor: &dyn Extractor,
    document: &Document,
    ledger: &dyn LedgerReader,
    config: &ReconConfig,
    cancel: &CancelToken,
) -> Result<ReconciliationReport, ReconError> {
    cancel.checkpoint()?;
    let extraction = extractor.extract(document)?;
    log::debug!(
        "'{}': {} grid(s) extracted, confidence {:?}",
        document.name,
        extraction.grids.len(),
        extraction.confidence
    );
    reconcile_extraction(&extraction, &document.name, ledger, config, cancel)
}

/// Everything after the extractor call: sections, totals, gates, status.
///
/// The config is validated here as well, since one built in code never went
/// through [`ReconConfig::from_toml`].
pub fn reconcile_extraction(
    extraction: &Extraction,
    document_name: &str,
    ledger: &dyn LedgerReader,
    config: &ReconConfig,
    cancel: &CancelToken,
) -> Result<ReconciliationReport, ReconError> {
    config.validate()?;
    let sections: Vec<SectionResult> = config
        .sections
        .par_iter()
        .map(|spec| {
            cancel.checkpoint()?;
            let result = SectionReconciler::new(spec, &config.normalizer).run(extraction, ledger)?;
            cancel.checkpoint()?;
            Ok(result)
        })
        .collect::<Result<_, ReconError>>()?;

    let totals = compute_totals(&sections);
    let confidence = confidence_gate(extraction, &config.confidence);
    if confidence.low {
        log::warn!(
            "'{document_name}': low extraction confidence {:?} (pages {:?})",
            confidence.observed,
            confidence.low_pages
        );
    }

    let identifier = match config.identifier.as_ref().and_then(|id| id.coord()) {
        Some(coord) => {
            let ledger_id = ledger.read(&coord)?;
            Some(check_identifier(
                ledger_id.as_deref(),
                extraction.document_id.as_deref(),
                ledger.source_name(),
            ))
        }
        None => None,
    };

    let (status, warnings) = decide_status(&sections, &totals, &confidence, identifier.as_ref());

    log::info!(
        "'{document_name}' vs '{}': {status}, {} compared, {} mismatches, {} failed section(s)",
        ledger.source_name(),
        totals.compared,
        totals.mismatches,
        totals.failed_sections
    );

    Ok(ReconciliationReport {
        meta: ReportMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            document: document_name.to_string(),
            ledger: ledger.source_name().to_string(),
        },
        identifier,
        confidence,
        sections,
        total_compared: totals.compared,
        total_mismatches: totals.mismatches,
        failed_sections: totals.failed_sections,
        overall_match_ratio: totals.ratio,
        status,
        warnings,
    })
}
