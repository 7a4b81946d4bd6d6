use std::collections::{BTreeMap, HashSet};

use regex::Regex;
use serde::Deserialize;

use crate::error::ReconError;
use crate::model::{column_index, LedgerCoord, ValueKind};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ReconConfig {
    pub name: String,
    /// Batch pool size. `None` lets rayon decide.
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default)]
    pub normalizer: NormalizerConfig,
    #[serde(default)]
    pub confidence: ConfidenceConfig,
    #[serde(default)]
    pub identifier: Option<IdentifierConfig>,
    #[serde(default)]
    pub sections: Vec<SectionSpec>,
}

// ---------------------------------------------------------------------------
// Normalizer
// ---------------------------------------------------------------------------

/// Token tables for the value normalizer.
///
/// Every field has a default matching the scanned attendance forms the engine
/// was calibrated on, so `[normalizer]` can be omitted entirely.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    pub thousands_separators: Vec<char>,
    pub checked: Vec<String>,
    pub unchecked: Vec<String>,
    pub empty_tokens: Vec<String>,
    /// Layout markers stripped from numeric tokens.
    pub markers: Vec<String>,
    /// Longest raw token the OCR substitution table is applied to.
    pub ocr_max_len: usize,
    pub substitutions: BTreeMap<char, char>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        let substitutions = [
            ('I', '1'),
            ('l', '1'),
            ('O', '0'),
            ('D', '0'),
            ('S', '5'),
            ('G', '6'),
            ('b', '6'),
            ('Z', '2'),
        ]
        .into_iter()
        .collect();

        Self {
            thousands_separators: vec!['.', ','],
            checked: vec!["X".into(), "x".into(), ":selected:".into()],
            unchecked: vec![":unselected:".into()],
            empty_tokens: vec!["-".into()],
            markers: vec![":selected:".into(), ":unselected:".into()],
            ocr_max_len: 3,
            substitutions,
        }
    }
}

// ---------------------------------------------------------------------------
// Confidence + Identifier
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConfidenceConfig {
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
}

fn default_min_confidence() -> f64 {
    0.75
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
        }
    }
}

/// Ledger cell holding the document identifier, cross-checked against the
/// identifier the extractor reports.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IdentifierConfig {
    pub ledger_cell: String,
    #[serde(default)]
    pub sheet: Option<String>,
}

impl IdentifierConfig {
    pub fn coord(&self) -> Option<LedgerCoord> {
        LedgerCoord::parse_a1(self.sheet.as_deref(), &self.ledger_cell)
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct SectionSpec {
    pub name: String,
    #[serde(default)]
    pub sheet: Option<String>,
    /// 1-based ledger row of logical row 0.
    pub first_row: usize,
    #[serde(default)]
    pub keep_matches: bool,
    pub envelope: ShapeEnvelope,
    pub anchor: AnchorSpec,
    pub rows: RowSpec,
    #[serde(default)]
    pub blocks: Vec<ColumnBlock>,
}

/// Acceptable shape of the table a section reads from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ShapeEnvelope {
    pub page: usize,
    pub rows: [usize; 2],
    pub cols: [usize; 2],
    #[serde(default)]
    pub contains: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AnchorSpec {
    pub column: usize,
    #[serde(flatten)]
    pub predicate: AnchorPredicate,
    #[serde(default)]
    pub kind: ValueKind,
    #[serde(default)]
    pub case_insensitive: bool,
    #[serde(default)]
    pub min_row: Option<usize>,
    #[serde(default)]
    pub max_row: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorPredicate {
    Equals(String),
    Contains(String),
    Pattern(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowStrategy {
    #[default]
    Sequential,
    Keyed,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RowSpec {
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub strategy: RowStrategy,
    /// Physical column searched for labels under the `keyed` strategy.
    #[serde(default)]
    pub key_column: Option<usize>,
    #[serde(default)]
    pub skips: Vec<RowSkip>,
}

/// Extra rows inserted in one source from logical row `at` onward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RowSkip {
    pub at: usize,
    #[serde(default)]
    pub ledger: usize,
    #[serde(default)]
    pub extracted: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ColumnBlock {
    pub name: String,
    pub start: BlockStart,
    #[serde(default = "default_block_kind")]
    pub kind: ValueKind,
    pub columns: Vec<ColumnEntry>,
}

fn default_block_kind() -> ValueKind {
    ValueKind::Number
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockStart {
    /// Absolute physical column.
    Fixed(usize),
    /// One past the span of the cell at the previous block's last column.
    AfterPrevious(AfterPrevious),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AfterPrevious {
    /// Row used to read the boundary span. Defaults to the anchor row.
    #[serde(default)]
    pub probe: Option<AnchorSpec>,
}

/// A ledger column, written either as a bare letter or as a table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawColumnEntry")]
pub struct ColumnEntry {
    pub letter: String,
    pub ledger_col: usize,
    pub label: Option<String>,
    pub kind: Option<ValueKind>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawColumnEntry {
    Letter(String),
    Detailed {
        ledger: String,
        #[serde(default)]
        label: Option<String>,
        #[serde(default)]
        kind: Option<ValueKind>,
    },
}

impl TryFrom<RawColumnEntry> for ColumnEntry {
    type Error = String;

    fn try_from(raw: RawColumnEntry) -> Result<Self, Self::Error> {
        let (letter, label, kind) = match raw {
            RawColumnEntry::Letter(l) => (l, None, None),
            RawColumnEntry::Detailed { ledger, label, kind } => (ledger, label, kind),
        };
        let letter = letter.trim().to_ascii_uppercase();
        let ledger_col =
            column_index(&letter).ok_or_else(|| format!("invalid column letter '{letter}'"))?;
        Ok(Self {
            letter,
            ledger_col,
            label,
            kind,
        })
    }
}

/// One logical column with its block and kind resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalColumn {
    pub block: usize,
    pub ledger_col: usize,
    pub label: String,
    pub kind: ValueKind,
}

impl SectionSpec {
    /// Logical columns across all blocks, in declaration order.
    pub fn logical_columns(&self) -> Vec<LogicalColumn> {
        self.blocks
            .iter()
            .enumerate()
            .flat_map(|(b, block)| {
                block.columns.iter().map(move |c| LogicalColumn {
                    block: b,
                    ledger_col: c.ledger_col,
                    label: c.label.clone().unwrap_or_else(|| c.letter.clone()),
                    kind: c.kind.unwrap_or(block.kind),
                })
            })
            .collect()
    }

    pub fn row_count(&self) -> usize {
        if self.rows.labels.is_empty() {
            self.rows.count
        } else {
            self.rows.labels.len()
        }
    }

    /// Configured labels, else the day of month `1..=count`.
    pub fn row_labels(&self) -> Vec<String> {
        if self.rows.labels.is_empty() {
            (1..=self.rows.count).map(|d| d.to_string()).collect()
        } else {
            self.rows.labels.clone()
        }
    }

    /// Zero-based ledger row of logical row `k`.
    pub fn ledger_row(&self, k: usize) -> usize {
        let shift: usize = self.rows.skips.iter().filter(|s| k >= s.at).map(|s| s.ledger).sum();
        self.first_row - 1 + k + shift
    }

    /// Physical rows inserted in the extracted grid before logical row `k`.
    pub fn extracted_shift(&self, k: usize) -> usize {
        self.rows.skips.iter().filter(|s| k >= s.at).map(|s| s.extracted).sum()
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        let invalid = |msg: String| Err(ReconError::ConfigValidation(msg));

        if self.name.trim().is_empty() {
            return invalid("name must not be empty".into());
        }
        if self.sections.is_empty() {
            return invalid("at least one section is required".into());
        }
        if self.workers == Some(0) {
            return invalid("workers must be at least 1".into());
        }
        let min = self.confidence.min_confidence;
        if !(0.0..=1.0).contains(&min) {
            return invalid(format!("min_confidence must be within [0, 1], got {min}"));
        }
        if let Some(id) = &self.identifier {
            if id.coord().is_none() {
                return invalid(format!("identifier: invalid cell reference '{}'", id.ledger_cell));
            }
        }

        let mut seen = HashSet::new();
        for section in &self.sections {
            if !seen.insert(section.name.as_str()) {
                return invalid(format!("duplicate section name '{}'", section.name));
            }
            section.validate()?;
        }

        Ok(())
    }
}

impl SectionSpec {
    fn validate(&self) -> Result<(), ReconError> {
        let name = &self.name;
        let invalid = |msg: String| Err(ReconError::ConfigValidation(format!("section '{name}': {msg}")));

        if name.trim().is_empty() {
            return Err(ReconError::ConfigValidation("section name must not be empty".into()));
        }
        if self.first_row == 0 {
            return invalid("first_row is 1-based and must be at least 1".into());
        }

        let env = &self.envelope;
        if env.rows[0] > env.rows[1] || env.cols[0] > env.cols[1] {
            return invalid(format!(
                "envelope ranges must be ordered, got rows {:?} cols {:?}",
                env.rows, env.cols
            ));
        }

        check_anchor(&self.anchor).or_else(|m| invalid(format!("anchor: {m}")))?;

        if self.row_count() == 0 {
            return invalid("rows.count must be at least 1".into());
        }
        if !self.rows.labels.is_empty() && self.rows.count != 0 && self.rows.count != self.rows.labels.len() {
            return invalid(format!(
                "rows.count is {} but {} labels are given",
                self.rows.count,
                self.rows.labels.len()
            ));
        }
        if self.rows.strategy == RowStrategy::Keyed {
            if self.rows.labels.is_empty() {
                return invalid("keyed rows require labels".into());
            }
            if self.rows.key_column.is_none() {
                return invalid("keyed rows require key_column".into());
            }
        }

        if self.blocks.is_empty() {
            return invalid("at least one column block is required".into());
        }
        for (i, block) in self.blocks.iter().enumerate() {
            if block.columns.is_empty() {
                return invalid(format!("block '{}' has no columns", block.name));
            }
            match &block.start {
                BlockStart::AfterPrevious(_) if i == 0 => {
                    return invalid(format!("first block '{}' must have a fixed start", block.name));
                }
                BlockStart::AfterPrevious(AfterPrevious { probe: Some(probe) }) => {
                    check_anchor(probe).or_else(|m| invalid(format!("block '{}' probe: {m}", block.name)))?;
                }
                _ => {}
            }
        }

        Ok(())
    }
}

fn check_anchor(anchor: &AnchorSpec) -> Result<(), String> {
    if let (Some(lo), Some(hi)) = (anchor.min_row, anchor.max_row) {
        if lo > hi {
            return Err(format!("min_row {lo} is after max_row {hi}"));
        }
    }
    if let AnchorPredicate::Pattern(p) = &anchor.predicate {
        Regex::new(p).map_err(|e| format!("pattern '{p}' does not compile: {e}"))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
