use crate::model::{NormalizedValue, Outcome};

/// Decide whether two normalized values agree.
///
/// An explicit zero or an unchecked box counts as agreeing with an empty cell.
pub fn compare(authoritative: &NormalizedValue, extracted: &NormalizedValue) -> Outcome {
    use crate::model::NormalizedValue::*;

    let absent_like = |v: &NormalizedValue| v.is_zero() || matches!(v, Unselected);

    match (authoritative, extracted) {
        (Empty, Empty) => Outcome::Match,
        (Empty, v) | (v, Empty) if absent_like(v) => Outcome::Match,
        (Number(a), Number(b)) => same(a == b),
        (Selected | Unselected, Selected | Unselected) => same(authoritative == extracted),
        (Text(a), Text(b)) => same(a == b),
        (Empty, _) => Outcome::MissingInAuthoritative,
        (_, Empty) => Outcome::MissingInExtracted,
        _ => Outcome::Mismatch,
    }
}

fn same(equal: bool) -> Outcome {
    if equal {
        Outcome::Match
    } else {
        Outcome::Mismatch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NormalizedValue::*;

    #[test]
    fn absence_rules() {
        assert_eq!(compare(&Empty, &Empty), Outcome::Match);
        assert_eq!(compare(&Empty, &NormalizedValue::number(0.0)), Outcome::Match);
        assert_eq!(compare(&NormalizedValue::number(0.0), &Empty), Outcome::Match);
        assert_eq!(compare(&Empty, &Unselected), Outcome::Match);
        assert_eq!(compare(&Unselected, &Empty), Outcome::Match);
    }

    #[test]
    fn missing_sides() {
        assert_eq!(compare(&Empty, &NormalizedValue::number(3.0)), Outcome::MissingInAuthoritative);
        assert_eq!(compare(&Selected, &Empty), Outcome::MissingInExtracted);
        assert_eq!(compare(&Text("a".into()), &Empty), Outcome::MissingInExtracted);
    }

    #[test]
    fn like_for_like() {
        let n = NormalizedValue::number;
        assert_eq!(compare(&n(1665.0), &n(1665.0)), Outcome::Match);
        assert_eq!(compare(&n(6.0), &n(8.0)), Outcome::Mismatch);
        assert_eq!(compare(&Selected, &Selected), Outcome::Match);
        assert_eq!(compare(&Selected, &Unselected), Outcome::Mismatch);
        assert_eq!(compare(&Text("a".into()), &Text("a".into())), Outcome::Match);
        assert_eq!(compare(&Text("a".into()), &Text("A".into())), Outcome::Mismatch);
    }

    #[test]
    fn cross_kind_is_mismatch() {
        assert_eq!(compare(&NormalizedValue::number(6.0), &Text("Б".into())), Outcome::Mismatch);
        assert_eq!(compare(&Selected, &NormalizedValue::number(1.0)), Outcome::Mismatch);
        assert_eq!(compare(&Unselected, &NormalizedValue::number(0.0)), Outcome::Mismatch);
    }
}
