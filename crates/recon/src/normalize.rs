//! Canonical form for raw cell tokens from either source.
//!
//! Normalization is total: a token that cannot be read as its expected kind
//! comes back as `Text` with an [`Ambiguity`] tag rather than an error, and an
//! unparseable number is never coerced to zero.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::NormalizerConfig;
use crate::model::{Ambiguity, Normalization, NormalizedValue, ValueKind};

/// An integer written with group separators: `1.665`, `4,667`, `1.234.567`.
/// The leading group never starts with 0, so `0.125` stays a decimal.
static GROUPED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?[1-9][0-9]{0,2}(?:[^0-9\s][0-9]{3})+$").expect("valid grouped-number regex"));

static PLAIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?[0-9]+(?:\.[0-9]+)?$").expect("valid decimal regex"));

pub fn normalize(raw: Option<&str>, kind: ValueKind, rules: &NormalizerConfig) -> NormalizedValue {
    normalize_detailed(raw, kind, rules).value
}

pub fn normalize_detailed(raw: Option<&str>, kind: ValueKind, rules: &NormalizerConfig) -> Normalization {
    let token = match raw.map(clean) {
        Some(t) if !t.is_empty() && !rules.empty_tokens.iter().any(|e| *e == t) => t,
        _ => return plain(NormalizedValue::Empty),
    };

    match kind {
        ValueKind::Text => plain(NormalizedValue::Text(token)),
        ValueKind::Checkbox => checkbox(token, rules),
        ValueKind::Number => number(token, rules),
    }
}

fn plain(value: NormalizedValue) -> Normalization {
    Normalization { value, ambiguity: None }
}

fn ambiguous(token: String, ambiguity: Ambiguity) -> Normalization {
    Normalization {
        value: NormalizedValue::Text(token),
        ambiguity: Some(ambiguity),
    }
}

/// Newlines become spaces, outer whitespace goes.
fn clean(raw: &str) -> String {
    raw.replace(['\r', '\n'], " ").trim().to_string()
}

/// Layout markers removed, inner whitespace collapsed.
fn strip_markers(token: &str, rules: &NormalizerConfig) -> String {
    let mut stripped = token.to_string();
    for marker in &rules.markers {
        stripped = stripped.replace(marker.as_str(), " ");
    }
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn checkbox_state(token: &str, rules: &NormalizerConfig) -> Option<NormalizedValue> {
    if rules.checked.iter().any(|c| c == token) {
        Some(NormalizedValue::Selected)
    } else if rules.unchecked.iter().any(|c| c == token) {
        Some(NormalizedValue::Unselected)
    } else {
        None
    }
}

/// A bare marker is a vocabulary word in its own right; otherwise the marker
/// is noise around the hand-written mark.
fn checkbox(token: String, rules: &NormalizerConfig) -> Normalization {
    let state = checkbox_state(&token, rules).or_else(|| {
        let stripped = strip_markers(&token, rules);
        if stripped.is_empty() {
            None
        } else {
            checkbox_state(&stripped, rules)
        }
    });
    match state {
        Some(value) => plain(value),
        None => ambiguous(token, Ambiguity::UnrecognizedCheckbox),
    }
}

fn number(token: String, rules: &NormalizerConfig) -> Normalization {
    let stripped = strip_markers(&token, rules);
    if stripped.is_empty() || rules.empty_tokens.iter().any(|e| *e == stripped) {
        return plain(NormalizedValue::Empty);
    }

    if let Some(n) = parse_number(&stripped, &rules.thousands_separators) {
        return plain(NormalizedValue::number(n));
    }

    // OCR confusions are only plausible in short tokens.
    if stripped.chars().count() <= rules.ocr_max_len {
        let substituted: String = stripped
            .chars()
            .map(|c| rules.substitutions.get(&c).copied().unwrap_or(c))
            .collect();
        if let Some(n) = parse_number(&substituted, &rules.thousands_separators) {
            return plain(NormalizedValue::number(n));
        }
    }

    ambiguous(token, Ambiguity::UnparseableNumber)
}

fn parse_number(token: &str, separators: &[char]) -> Option<f64> {
    if GROUPED.is_match(token) {
        let digits = token.strip_prefix('-').unwrap_or(token);
        let mut seps = digits.chars().filter(|c| !c.is_ascii_digit());
        let first = seps.next()?;
        if separators.contains(&first) && seps.all(|c| c == first) {
            let joined: String = token.chars().filter(|c| *c != first).collect();
            return joined.parse::<i64>().ok().map(|n| n as f64);
        }
    }
    if PLAIN.is_match(token) {
        return token.parse::<f64>().ok();
    }
    None
}
