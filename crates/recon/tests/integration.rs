use std::path::PathBuf;

use gridrecon::model::{Ambiguity, FailureReason, PageConfidence, ReportStatus, SectionStatus, ValueKind};
use gridrecon::{
    reconcile, reconcile_with, CancelToken, Cell, Document, Extraction, Grid, MemoryExtractor, MemoryLedger,
    NormalizedValue, Outcome, ReconConfig, ReconError, ReconJob, ReconPool, ReconciliationReport,
};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_config() -> ReconConfig {
    let toml = std::fs::read_to_string(fixtures_dir().join("emei.recon.toml")).unwrap();
    ReconConfig::from_toml(&toml).unwrap()
}

// -------------------------------------------------------------------------
// Fixture builders
// -------------------------------------------------------------------------

/// Daily grid with the Lanche cell at column 2 spanning `w` physical columns.
fn daily_grid(w: usize) -> Grid {
    let check = 2 + w;
    let mut cells = vec![
        Cell::new(0, 0, "Dia"),
        Cell::new(0, 1, "Integral"),
        Cell::spanning(0, 2, 1, w, Some("Lanche")),
        Cell::new(0, check, "Freq"),
    ];
    let rows = [("1", "1665", "0", ":selected:"), ("2", "Б", "3", ":unselected:"), ("3", "4667", "2", "X")];
    for (i, (day, integral, lanche, freq)) in rows.iter().enumerate() {
        let r = i + 1;
        cells.push(Cell::new(r, 0, day));
        cells.push(Cell::new(r, 1, integral));
        cells.push(Cell::spanning(r, 2, 1, w, Some(*lanche)));
        cells.push(Cell::new(r, check, freq));
    }
    cells.push(Cell::new(4, 0, "Total"));
    cells.push(Cell::new(4, 1, "12"));
    cells.push(Cell::spanning(4, 2, 1, w, Some("5")));
    Grid::new(1, 5, 3 + w, cells).unwrap()
}

fn diet_grid() -> Grid {
    Grid::new(
        2,
        3,
        2,
        vec![
            Cell::new(0, 0, "Nome"),
            Cell::new(1, 0, "Dieta especial"),
            Cell::new(1, 1, "2"),
        ],
    )
    .unwrap()
}

fn extraction(w: usize) -> Extraction {
    Extraction::new(vec![diet_grid(), daily_grid(w)])
        .with_confidence(0.91)
        .with_document_id("019283")
}

fn ledger() -> MemoryLedger {
    let s = Some("EMEI");
    MemoryLedger::new("emei_marco.xlsx")
        .with(s, "C5", "019283")
        .with(s, "E28", "1.665")
        .with(s, "BR28", "X")
        .with(s, "E29", "6")
        .with(s, "G29", "3")
        .with(s, "E30", "4,667")
        .with(s, "G30", "2")
        .with(s, "BR30", "x")
        .with(s, "E32", "12")
        .with(s, "G32", "5")
        .with(s, "D70", "2")
}

fn run(extraction: Extraction, config: &ReconConfig) -> ReconciliationReport {
    reconcile(&MemoryExtractor::new(extraction), &Document::named("scan_0417"), &ledger(), config).unwrap()
}

// -------------------------------------------------------------------------
// Scenarios
// -------------------------------------------------------------------------

#[test]
fn full_report() {
    let report = run(extraction(1), &load_config());

    assert_eq!(report.meta.config_name, "EMEI monthly");
    assert_eq!(report.meta.ledger, "emei_marco.xlsx");
    assert_eq!(report.sections.len(), 2);
    assert_eq!(report.total_compared, 13);
    assert_eq!(report.total_mismatches, 1);
    assert_eq!(report.failed_sections, 0);
    assert_eq!(report.overall_match_ratio, 12.0 / 13.0);
    assert_eq!(report.status, ReportStatus::Mismatched);
    assert!(report.warnings.is_empty());
    assert!(report.identifier.as_ref().unwrap().matched);
    assert!(!report.confidence.low);

    // Sections come back in configuration order even though they run in parallel.
    assert_eq!(report.sections[0].section_name, "daily_meals");
    assert_eq!(report.sections[1].section_name, "special_diet");
    assert_eq!(report.sections[1].alignment.as_ref().unwrap().grid_index, 0);
}

#[test]
fn scenario_grouped_thousands_match() {
    let mut config = load_config();
    config.sections[0].keep_matches = true;
    let report = run(extraction(1), &config);
    let daily = report.section("daily_meals").unwrap();

    let e28 = daily.comparisons.iter().find(|c| c.authoritative_ref == "E28").unwrap();
    assert_eq!(e28.authoritative_value, NormalizedValue::number(1665.0));
    assert_eq!(e28.extracted_value, NormalizedValue::number(1665.0));
    assert_eq!(e28.outcome, Outcome::Match);
}

#[test]
fn scenario_explicit_zero_matches_empty() {
    let mut config = load_config();
    config.sections[0].keep_matches = true;
    let report = run(extraction(1), &config);
    let daily = report.section("daily_meals").unwrap();

    let g28 = daily.comparisons.iter().find(|c| c.authoritative_ref == "G28").unwrap();
    assert_eq!(g28.authoritative_value, NormalizedValue::Empty);
    assert_eq!(g28.extracted_value, NormalizedValue::number(0.0));
    assert_eq!(g28.outcome, Outcome::Match);
    assert_eq!(g28.column_label, "Lanche");

    let br29 = daily.comparisons.iter().find(|c| c.authoritative_ref == "BR29").unwrap();
    assert_eq!(br29.extracted_value, NormalizedValue::Unselected);
    assert_eq!(br29.outcome, Outcome::Match);
}

#[test]
fn scenario_ocr_garbage_is_a_text_mismatch() {
    let report = run(extraction(1), &load_config());
    let mismatches: Vec<_> = report.mismatches().collect();
    assert_eq!(mismatches.len(), 1);

    let c = mismatches[0];
    assert_eq!(c.section, "daily_meals");
    assert_eq!(c.authoritative_coordinate.to_string(), "EMEI!E29");
    assert_eq!(c.authoritative_value, NormalizedValue::number(6.0));
    assert_eq!(c.extracted_value, NormalizedValue::Text("Б".into()));
    assert_eq!(c.extracted_ambiguity, Some(Ambiguity::UnparseableNumber));
    assert_eq!(c.outcome, Outcome::Mismatch);
    assert_eq!(c.row_label, "2");
    let at = c.extracted_coordinate.unwrap();
    assert_eq!((at.page, at.grid_index, at.row, at.col), (1, 1, 2, 1));
}

#[test]
fn scenario_missing_anchor_fails_only_its_section() {
    let mut config = load_config();
    let toml = std::fs::read_to_string(fixtures_dir().join("emei.recon.toml"))
        .unwrap()
        .replace("contains = \"dieta\"", "contains = \"gluten\"");
    config.sections = ReconConfig::from_toml(&toml).unwrap().sections;

    let report = run(extraction(1), &config);
    let diet = report.section("special_diet").unwrap();
    assert!(matches!(
        diet.status,
        SectionStatus::Failed {
            reason: FailureReason::AlignmentFailed,
            ..
        }
    ));
    assert_eq!(report.failed_sections, 1);
    assert_eq!(report.total_compared, 12);
    assert_eq!(report.status, ReportStatus::NeedsReview);
    assert!(report.warnings[0].contains("special_diet"));

    let daily = report.section("daily_meals").unwrap();
    assert_eq!(daily.status, SectionStatus::Done);
    assert_eq!(daily.total_mismatches, 1);
}

#[test]
fn total_row_reads_after_the_ledger_gap() {
    let mut config = load_config();
    config.sections[0].keep_matches = true;
    let report = run(extraction(1), &config);
    let daily = report.section("daily_meals").unwrap();

    let total: Vec<_> = daily.comparisons.iter().filter(|c| c.row_label == "Total").collect();
    assert_eq!(total.len(), 3);
    assert_eq!(total[0].authoritative_ref, "E32");
    assert!(total.iter().all(|c| c.outcome.is_match()));
}

// -------------------------------------------------------------------------
// Shape, span and determinism
// -------------------------------------------------------------------------

#[test]
fn out_of_envelope_grid_is_never_selected() {
    let narrow = Grid::new(1, 5, 3, vec![Cell::new(0, 0, "Dia"), Cell::new(1, 0, "1")]).unwrap();
    let report = run(Extraction::new(vec![narrow, diet_grid()]), &load_config());
    let daily = report.section("daily_meals").unwrap();
    assert_eq!(daily.failure_reason(), Some(FailureReason::TableNotFound));
    assert!(daily.alignment.is_none());
}

#[test]
fn boundary_span_does_not_change_pairings() {
    let config = load_config();
    let one = run(extraction(1), &config);
    let three = run(extraction(3), &config);

    let pairs = |r: &ReconciliationReport| -> Vec<_> {
        r.mismatches()
            .map(|c| (c.logical_row, c.logical_column, c.extracted_value.clone()))
            .collect()
    };
    assert_eq!(pairs(&one), pairs(&three));
    assert_eq!(one.total_compared, three.total_compared);

    let cols = |r: &ReconciliationReport| r.sections[0].alignment.as_ref().unwrap().columns.clone();
    assert_eq!(cols(&one), vec![1, 2, 3]);
    assert_eq!(cols(&three), vec![1, 2, 5]);
}

#[test]
fn reports_are_byte_identical_across_runs() {
    let config = load_config();
    let a = run(extraction(2), &config).to_json().unwrap();
    let b = run(extraction(2), &config).to_json().unwrap();
    assert_eq!(a, b);
    assert!(a.contains("\"status\": \"mismatched\""));
}

// -------------------------------------------------------------------------
// Gates
// -------------------------------------------------------------------------

#[test]
fn low_page_confidence_needs_review() {
    let mut ex = extraction(1);
    ex.page_confidence = vec![
        PageConfidence { page: 1, confidence: 0.93 },
        PageConfidence { page: 2, confidence: 0.41 },
    ];
    let report = run(ex, &load_config());
    assert!(report.confidence.low);
    assert_eq!(report.confidence.low_pages, vec![2]);
    assert_eq!(report.status, ReportStatus::NeedsReview);
    // Comparison still ran.
    assert_eq!(report.total_compared, 13);
}

#[test]
fn identifier_found_in_ledger_name() {
    let ex = extraction(1).with_document_id("marco");
    let report = run(ex, &load_config());
    let id = report.identifier.unwrap();
    assert_eq!(id.ledger.as_deref(), Some("019283"));
    assert!(id.matched);
}

#[test]
fn checkbox_columns_use_checkbox_kind() {
    let config = load_config();
    let cols = config.sections[0].logical_columns();
    assert_eq!(cols[2].kind, ValueKind::Checkbox);
    assert_eq!(cols[2].label, "BR");
}

// -------------------------------------------------------------------------
// Pool + cancellation
// -------------------------------------------------------------------------

fn job(name: &str, w: usize) -> ReconJob {
    ReconJob {
        document: Document::named(name),
        extractor: Box::new(MemoryExtractor::new(extraction(w))),
        ledger: Box::new(ledger()),
    }
}

#[test]
fn batch_keeps_submission_order() {
    let config = load_config();
    let pool = ReconPool::new(config.workers).unwrap();
    let jobs: Vec<_> = (1..=4).map(|w| job(&format!("doc{w}"), w)).collect();

    let results = pool.run_batch(&jobs, &config, &CancelToken::new());
    let names: Vec<_> = results.iter().map(|r| r.as_ref().unwrap().meta.document.clone()).collect();
    assert_eq!(names, vec!["doc1", "doc2", "doc3", "doc4"]);
}

#[test]
fn cancelled_batch_produces_no_reports() {
    let config = load_config();
    let pool = ReconPool::new(Some(2)).unwrap();
    let cancel = CancelToken::new();
    cancel.cancel();

    let results = pool.run_batch(&[job("a", 1), job("b", 2)], &config, &cancel);
    assert!(results.iter().all(|r| matches!(r, Err(ReconError::Cancelled))));

    let err = reconcile_with(
        &MemoryExtractor::new(extraction(1)),
        &Document::named("c"),
        &ledger(),
        &config,
        &cancel,
    )
    .unwrap_err();
    assert!(matches!(err, ReconError::Cancelled));
}
