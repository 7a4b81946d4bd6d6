use crate::config::ConfidenceConfig;
use crate::model::{
    ratio, ConfidenceVerdict, Extraction, IdentifierCheck, ReportStatus, SectionResult, SectionStatus,
};

/// Cell counts across sections. Failed sections contribute nothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Totals {
    pub compared: usize,
    pub mismatches: usize,
    pub failed_sections: usize,
    pub ratio: f64,
}

pub fn compute_totals(sections: &[SectionResult]) -> Totals {
    let mut compared = 0;
    let mut mismatches = 0;
    let mut failed_sections = 0;

    for s in sections {
        if s.is_failed() {
            failed_sections += 1;
            continue;
        }
        compared += s.total_compared;
        mismatches += s.total_mismatches;
    }

    Totals {
        compared,
        mismatches,
        failed_sections,
        ratio: ratio(compared, mismatches),
    }
}

/// Flag the extraction when its overall or any per-page confidence is below
/// the threshold. An extraction with no reported confidence is not flagged.
pub fn confidence_gate(extraction: &Extraction, config: &ConfidenceConfig) -> ConfidenceVerdict {
    let threshold = config.min_confidence;
    let low_pages: Vec<usize> = extraction
        .page_confidence
        .iter()
        .filter(|p| p.confidence < threshold)
        .map(|p| p.page)
        .collect();
    let overall_low = extraction.confidence.map(|c| c < threshold).unwrap_or(false);

    ConfidenceVerdict {
        threshold,
        observed: extraction.confidence,
        low: overall_low || !low_pages.is_empty(),
        low_pages,
    }
}

/// Cross-check the ledger's identifier cell against the extractor's.
///
/// Equal after trimming (ignoring case) is a match. So is an extracted
/// identifier that appears in the ledger's source name, since ledgers are
/// commonly filed under the document number.
pub fn check_identifier(ledger: Option<&str>, extracted: Option<&str>, ledger_source: &str) -> IdentifierCheck {
    let clean = |s: Option<&str>| s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
    let ledger = clean(ledger);
    let extracted = clean(extracted);

    let matched = match (&ledger, &extracted) {
        (_, Some(ext)) if ledger_source.to_lowercase().contains(&ext.to_lowercase()) => true,
        (Some(l), Some(ext)) => l.to_lowercase() == ext.to_lowercase(),
        _ => false,
    };

    IdentifierCheck {
        ledger,
        extracted,
        matched,
    }
}

/// Overall status plus one human-readable warning per review reason.
pub fn decide_status(
    sections: &[SectionResult],
    totals: &Totals,
    confidence: &ConfidenceVerdict,
    identifier: Option<&IdentifierCheck>,
) -> (ReportStatus, Vec<String>) {
    let mut warnings = Vec::new();

    for s in sections {
        if let SectionStatus::Failed { reason, detail } = &s.status {
            warnings.push(format!("section '{}' failed ({reason}): {detail}", s.section_name));
        }
    }

    if confidence.low {
        match confidence.observed {
            Some(c) if c < confidence.threshold => warnings.push(format!(
                "extraction confidence {c:.2} is below {:.2}",
                confidence.threshold
            )),
            _ => {}
        }
        if !confidence.low_pages.is_empty() {
            let pages: Vec<String> = confidence.low_pages.iter().map(|p| p.to_string()).collect();
            warnings.push(format!(
                "page(s) {} below confidence {:.2}",
                pages.join(", "),
                confidence.threshold
            ));
        }
    }

    if let Some(id) = identifier.filter(|id| !id.matched) {
        warnings.push(format!(
            "document identifier mismatch: ledger {}, extracted {}",
            id.ledger.as_deref().unwrap_or("(none)"),
            id.extracted.as_deref().unwrap_or("(none)")
        ));
    }

    let status = if !warnings.is_empty() {
        ReportStatus::NeedsReview
    } else if totals.mismatches > 0 {
        ReportStatus::Mismatched
    } else {
        ReportStatus::Reconciled
    };

    (status, warnings)
}
