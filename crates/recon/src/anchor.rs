use regex::{Regex, RegexBuilder};

use crate::config::{AnchorPredicate, AnchorSpec, NormalizerConfig};
use crate::error::AlignmentError;
use crate::model::Grid;
use crate::normalize::normalize;

/// Compiled form of an [`AnchorPredicate`].
enum Matcher<'a> {
    Equals(&'a str),
    Contains(&'a str),
    Pattern(Regex),
}

impl Matcher<'_> {
    fn test(&self, text: &str, case_insensitive: bool) -> bool {
        match self {
            Self::Pattern(re) => re.is_match(text),
            Self::Equals(want) if case_insensitive => text.to_lowercase() == want.to_lowercase(),
            Self::Equals(want) => text == *want,
            Self::Contains(want) if case_insensitive => text.to_lowercase().contains(&want.to_lowercase()),
            Self::Contains(want) => text.contains(want),
        }
    }
}

fn compile(anchor: &AnchorSpec) -> Result<Matcher<'_>, AlignmentError> {
    Ok(match &anchor.predicate {
        AnchorPredicate::Equals(s) => Matcher::Equals(s),
        AnchorPredicate::Contains(s) => Matcher::Contains(s),
        AnchorPredicate::Pattern(p) => Matcher::Pattern(
            RegexBuilder::new(p)
                .case_insensitive(anchor.case_insensitive)
                .build()
                .map_err(|e| AlignmentError::InvalidPattern {
                    pattern: p.clone(),
                    message: e.to_string(),
                })?,
        ),
    })
}

/// Find the first cell in `anchor.column` (by origin, top to bottom, within
/// the row window) whose normalized content satisfies the predicate.
pub fn locate(grid: &Grid, anchor: &AnchorSpec, rules: &NormalizerConfig) -> Result<(usize, usize), AlignmentError> {
    let matcher = compile(anchor)?;
    let min_row = anchor.min_row.unwrap_or(0);
    let max_row = anchor.max_row.unwrap_or(usize::MAX);

    grid.cells_in_column(anchor.column)
        .filter(|c| c.row >= min_row && c.row <= max_row)
        .find(|c| {
            let value = normalize(c.content.as_deref(), anchor.kind, rules);
            !value.is_empty() && matcher.test(&value.key_text(), anchor.case_insensitive)
        })
        .map(|c| (c.row, c.col))
        .ok_or(AlignmentError::AnchorNotFound { column: anchor.column })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Cell, ValueKind};

    fn anchor(predicate: AnchorPredicate, kind: ValueKind) -> AnchorSpec {
        AnchorSpec {
            column: 0,
            predicate,
            kind,
            case_insensitive: false,
            min_row: None,
            max_row: None,
        }
    }

    fn day_column() -> Grid {
        Grid::new(
            1,
            6,
            2,
            vec![
                Cell::new(0, 0, "Dia"),
                Cell::new(1, 0, "Total 1"),
                Cell::new(2, 0, "1.0"),
                Cell::new(3, 0, "2"),
                Cell::new(4, 0, "1"),
                Cell::new(2, 1, "1"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn numeric_anchor_matches_normalized_value() {
        let rules = NormalizerConfig::default();
        let a = anchor(AnchorPredicate::Equals("1".into()), ValueKind::Number);
        // "Total 1" is unparseable; "1.0" normalizes to 1.
        assert_eq!(locate(&day_column(), &a, &rules), Ok((2, 0)));
    }

    #[test]
    fn row_window_bounds_the_scan() {
        let rules = NormalizerConfig::default();
        let mut a = anchor(AnchorPredicate::Equals("1".into()), ValueKind::Number);
        a.min_row = Some(3);
        assert_eq!(locate(&day_column(), &a, &rules), Ok((4, 0)));
        a.max_row = Some(3);
        assert_eq!(
            locate(&day_column(), &a, &rules),
            Err(AlignmentError::AnchorNotFound { column: 0 })
        );
    }

    #[test]
    fn contains_and_case() {
        let rules = NormalizerConfig::default();
        let mut a = anchor(AnchorPredicate::Contains("total".into()), ValueKind::Text);
        assert!(locate(&day_column(), &a, &rules).is_err());
        a.case_insensitive = true;
        assert_eq!(locate(&day_column(), &a, &rules), Ok((1, 0)));
    }

    #[test]
    fn pattern_anchor() {
        let rules = NormalizerConfig::default();
        let a = anchor(AnchorPredicate::Pattern(r"^dia$".into()), ValueKind::Text);
        assert!(locate(&day_column(), &a, &rules).is_err());

        let a = AnchorSpec {
            case_insensitive: true,
            ..a
        };
        assert_eq!(locate(&day_column(), &a, &rules), Ok((0, 0)));
    }

    #[test]
    fn bad_pattern_is_an_alignment_error() {
        let rules = NormalizerConfig::default();
        let a = anchor(AnchorPredicate::Pattern("(".into()), ValueKind::Text);
        assert!(matches!(
            locate(&day_column(), &a, &rules),
            Err(AlignmentError::InvalidPattern { .. })
        ));
    }
}
