// Property-based tests for sequential column/row mapping.
// CI: 128 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use proptest::prelude::*;

use gridrecon::model::{NormalizedValue, Outcome};
use gridrecon::{reconcile, Cell, Document, Extraction, Grid, MemoryExtractor, MemoryLedger, ReconConfig};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_128() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(128),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

const SECTIONS: &str = r#"
name = "property"

[[sections]]
name = "grid"
first_row = 2
keep_matches = true

[sections.envelope]
page = 1
rows = [1, 20]
cols = [1, 40]

[sections.anchor]
column = 0
equals = "1"
kind = "number"

[sections.rows]
count = 4

[[sections.blocks]]
name = "prefix"
start = { fixed = 1 }
columns = ["B", "C"]

[[sections.blocks]]
name = "middle"
start = { after_previous = {} }
columns = ["D", "E"]

[[sections.blocks]]
name = "tail"
start = { after_previous = {} }
columns = ["F"]
"#;

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Cell text: mostly small integers, sometimes empty or garbage.
fn arb_value() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => (0u32..5000).prop_map(|n| n.to_string()),
        1 => Just(String::new()),
        1 => r"[A-Za-z]{1,4}",
    ]
}

/// 4 data rows x 5 logical columns.
fn arb_values() -> impl Strategy<Value = Vec<Vec<String>>> {
    prop::collection::vec(prop::collection::vec(arb_value(), 5), 4)
}

/// Widths of the two boundary cells (logical columns 1 and 3).
fn arb_widths() -> impl Strategy<Value = (usize, usize)> {
    (1usize..=3, 1usize..=3)
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Header row 0 then one row per day. Logical columns 1 and 3 close a block
/// and span `widths.0` / `widths.1` physical columns.
fn build_grid(values: &[Vec<String>], widths: (usize, usize)) -> Grid {
    let spans = [1, widths.0, 1, widths.1, 1];
    let col_count = 1 + spans.iter().sum::<usize>();

    let mut cells = vec![Cell::new(0, 0, "Dia")];
    for (r, row) in values.iter().enumerate() {
        let physical_row = r + 1;
        cells.push(Cell::new(physical_row, 0, &(r + 1).to_string()));
        let mut col = 1;
        for (j, value) in row.iter().enumerate() {
            let content = (!value.is_empty()).then_some(value.as_str());
            cells.push(Cell::spanning(physical_row, col, 1, spans[j], content));
            col += spans[j];
        }
    }
    Grid::new(1, values.len() + 1, col_count, cells).unwrap()
}

fn build_ledger(values: &[Vec<String>]) -> MemoryLedger {
    let mut ledger = MemoryLedger::new("ledger");
    for (r, row) in values.iter().enumerate() {
        for (j, value) in row.iter().enumerate() {
            if !value.is_empty() {
                let letter = (b'B' + j as u8) as char;
                ledger.set_a1(None, &format!("{letter}{}", r + 2), value.as_str());
            }
        }
    }
    ledger
}

fn pairings(values: &[Vec<String>], widths: (usize, usize)) -> Vec<(usize, usize, NormalizedValue, Outcome)> {
    let config = ReconConfig::from_toml(SECTIONS).unwrap();
    let extractor = MemoryExtractor::new(Extraction::new(vec![build_grid(values, widths)]));
    let report = reconcile(&extractor, &Document::named("p"), &build_ledger(values), &config).unwrap();
    report.sections[0]
        .comparisons
        .iter()
        .map(|c| (c.logical_row, c.logical_column, c.extracted_value.clone(), c.outcome))
        .collect()
}

// ===========================================================================
// Properties
// ===========================================================================

// Boundary width never changes which content a logical cell is paired with.
proptest! {
    #![proptest_config(config_128())]
    #[test]
    fn boundary_width_is_invisible(values in arb_values(), widths in arb_widths()) {
        let baseline = pairings(&values, (1, 1));
        let shifted = pairings(&values, widths);
        prop_assert_eq!(baseline.len(), 20);
        prop_assert_eq!(baseline, shifted);
    }
}

// Ledger and grid built from the same values always agree cell for cell.
proptest! {
    #![proptest_config(config_128())]
    #[test]
    fn identical_sources_reconcile(values in arb_values(), widths in arb_widths()) {
        let pairs = pairings(&values, widths);
        for (row, col, _, outcome) in &pairs {
            prop_assert_eq!(*outcome, Outcome::Match, "cell ({}, {}) did not match", row, col);
        }
    }
}
