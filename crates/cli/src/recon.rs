//! `gridrecon run|validate|batch`: config-driven reconciliation.

use std::path::{Path, PathBuf};

use gridrecon::model::{ReconciliationReport, SectionStatus};
use gridrecon::{reconcile, CancelToken, Document, ReconConfig, ReconJob, ReconPool};
use gridrecon_io::{open_ledger, LayoutExtractor};

use crate::exit_codes::{
    error_exit_code, severity, status_exit_code, EXIT_RECON_INVALID_CONFIG, EXIT_RECON_MISMATCH,
    EXIT_RECON_NEEDS_REVIEW, EXIT_RECON_RUNTIME, EXIT_SUCCESS,
};
use crate::CliError;

/// Mismatch lines printed in the human summary before eliding the rest.
const MAX_LISTED: usize = 20;

fn load_config(path: &Path) -> Result<ReconConfig, CliError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        CliError::new(EXIT_RECON_INVALID_CONFIG, format!("cannot read config {}: {e}", path.display()))
    })?;
    Ok(ReconConfig::from_toml(&text)?)
}

fn to_json(report: &ReconciliationReport) -> Result<String, CliError> {
    Ok(report.to_json()?)
}

fn write_report(path: &Path, json: &str) -> Result<(), CliError> {
    std::fs::write(path, json)
        .map_err(|e| CliError::new(EXIT_RECON_RUNTIME, format!("cannot write {}: {e}", path.display())))
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

pub fn cmd_run(
    config_path: PathBuf,
    layout: PathBuf,
    ledger_path: PathBuf,
    sheet: Option<String>,
    json_output: bool,
    output_file: Option<PathBuf>,
) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    let ledger = open_ledger(&ledger_path, sheet.as_deref())?;
    let report = reconcile(&LayoutExtractor::new(), &Document::from_path(layout), ledger.as_ref(), &config)?;

    let json_str = to_json(&report)?;
    if let Some(ref path) = output_file {
        write_report(path, &json_str)?;
        eprintln!("wrote {}", path.display());
    }
    if json_output {
        println!("{json_str}");
    }

    print_summary(&report);

    match status_exit_code(report.status) {
        EXIT_SUCCESS => Ok(()),
        code => Err(CliError::silent(code)),
    }
}

/// Human summary to stderr.
fn print_summary(report: &ReconciliationReport) {
    eprintln!(
        "{} vs {}: {} ({} compared, {} mismatches, ratio {:.4})",
        report.meta.document,
        report.meta.ledger,
        report.status,
        report.total_compared,
        report.total_mismatches,
        report.overall_match_ratio,
    );

    for section in &report.sections {
        match &section.status {
            SectionStatus::Done => eprintln!(
                "  {}: {} compared, {} mismatches",
                section.section_name, section.total_compared, section.total_mismatches
            ),
            SectionStatus::Failed { reason, detail } => {
                eprintln!("  {}: FAILED ({reason}) {detail}", section.section_name)
            }
        }
    }

    let mismatches: Vec<_> = report.mismatches().collect();
    for c in mismatches.iter().take(MAX_LISTED) {
        eprintln!(
            "  {} {} [{} / {}]: ledger {} vs extracted {} ({})",
            c.section, c.authoritative_ref, c.row_label, c.column_label, c.authoritative_value, c.extracted_value, c.outcome,
        );
    }
    if mismatches.len() > MAX_LISTED {
        eprintln!("  ... {} more (see JSON report)", mismatches.len() - MAX_LISTED);
    }

    for warning in &report.warnings {
        eprintln!("warning: {warning}");
    }
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    let columns: usize = config.sections.iter().map(|s| s.logical_columns().len()).sum();
    eprintln!(
        "{}: ok ({} section(s), {} logical column(s))",
        config.name,
        config.sections.len(),
        columns
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// batch
// ---------------------------------------------------------------------------

#[derive(Debug, serde::Deserialize)]
struct ManifestRow {
    layout: PathBuf,
    ledger: PathBuf,
}

fn read_manifest(path: &Path) -> Result<Vec<ManifestRow>, CliError> {
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| CliError::args(format!("cannot read manifest {}: {e}", path.display())))?;

    let mut rows = Vec::new();
    for (i, record) in reader.deserialize::<ManifestRow>().enumerate() {
        let row = record.map_err(|e| {
            CliError::args(format!("manifest row {}: {e}", i + 1))
                .with_hint("manifest needs a header row with `layout,ledger` columns")
        })?;
        rows.push(ManifestRow {
            layout: base_dir.join(row.layout),
            ledger: base_dir.join(row.ledger),
        });
    }
    if rows.is_empty() {
        return Err(CliError::args(format!("manifest {} lists no documents", path.display())));
    }
    Ok(rows)
}

fn report_file_name(layout: &Path) -> String {
    let stem = layout
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    format!("{stem}.report.json")
}

pub fn cmd_batch(
    config_path: PathBuf,
    manifest: PathBuf,
    workers: Option<usize>,
    sheet: Option<String>,
    output_dir: Option<PathBuf>,
) -> Result<(), CliError> {
    if workers == Some(0) {
        return Err(CliError::args("--workers must be at least 1"));
    }
    let config = load_config(&config_path)?;
    let rows = read_manifest(&manifest)?;

    if let Some(ref dir) = output_dir {
        std::fs::create_dir_all(dir)
            .map_err(|e| CliError::new(EXIT_RECON_RUNTIME, format!("cannot create {}: {e}", dir.display())))?;
    }

    // Ledger open failures are per-row results, not batch aborts.
    let mut jobs = Vec::with_capacity(rows.len());
    let mut worst = EXIT_SUCCESS;
    let mut slots = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        log::debug!("manifest row {}: {} vs {}", i + 1, row.layout.display(), row.ledger.display());
        match open_ledger(&row.ledger, sheet.as_deref()) {
            Ok(ledger) => {
                slots.push(Some(jobs.len()));
                jobs.push(ReconJob {
                    document: Document::from_path(row.layout.clone()),
                    extractor: Box::new(LayoutExtractor::new()),
                    ledger,
                });
            }
            Err(e) => {
                log::warn!("manifest row {}: ledger not opened, row skipped", i + 1);
                eprintln!("{}: error: {e}", row.layout.display());
                worst = EXIT_RECON_RUNTIME;
                slots.push(None);
            }
        }
    }

    let pool = ReconPool::new(workers.or(config.workers))?;
    let results = pool.run_batch(&jobs, &config, &CancelToken::new());

    let (mut reconciled, mut mismatched, mut review, mut errors) = (0usize, 0usize, 0usize, 0usize);
    for (row, slot) in rows.iter().zip(&slots) {
        let Some(index) = slot else {
            errors += 1;
            continue;
        };
        let code = match &results[*index] {
            Ok(report) => {
                eprintln!(
                    "{}: {} ({} compared, {} mismatches)",
                    row.layout.display(),
                    report.status,
                    report.total_compared,
                    report.total_mismatches
                );
                if let Some(ref dir) = output_dir {
                    write_report(&dir.join(report_file_name(&row.layout)), &to_json(report)?)?;
                }
                status_exit_code(report.status)
            }
            Err(e) => {
                eprintln!("{}: error: {e}", row.layout.display());
                error_exit_code(e)
            }
        };
        match code {
            EXIT_SUCCESS => reconciled += 1,
            EXIT_RECON_MISMATCH => mismatched += 1,
            EXIT_RECON_NEEDS_REVIEW => review += 1,
            _ => errors += 1,
        }
        if severity(code) > severity(worst) {
            worst = code;
        }
    }

    eprintln!(
        "batch: {} document(s) on {} worker(s): {reconciled} reconciled, {mismatched} mismatched, {review} need review, {errors} failed",
        rows.len(),
        pool.workers(),
    );

    match worst {
        EXIT_SUCCESS => Ok(()),
        code => Err(CliError::silent(code)),
    }
}
