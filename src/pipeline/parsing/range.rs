use std::sync::LazyLock;

use regex::Regex;

use crate::models::lab::ReferenceRange;

use super::value::{parse_number, NUMBER};

/// `70-100`, `4.0 - 11.0`, `12 to 16`, `-2 - 2`
static CLOSED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)^(?P<low>-?{NUMBER})\s*(?:-|–|to)\s*(?P<high>{NUMBER})$"
    ))
    .unwrap()
});

/// `< 200`, `up to 40`, `less than 5`
static UPPER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)^(?:<=?|≤|up\s*to|less\s+than|below)\s*(?P<high>{NUMBER})$"
    ))
    .unwrap()
});

/// `> 40`, `more than 60`
static LOWER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)^(?:>=?|≥|more\s+than|greater\s+than|above)\s*(?P<low>{NUMBER})$"
    ))
    .unwrap()
});

/// Label lists: `Negative`, `Non Reactive`, `Negative/Trace`, `Clear or Slightly Hazy`.
static LABELS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z\s\-/,+]*$").unwrap());

static LABEL_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*(?:/|,|\bor\b)\s*").unwrap());

/// Parse the trailing range text of a result line.
///
/// Anything that is not recognisably an interval or a label list comes
/// back as `Opaque` so the printed text is never lost. Empty text has no
/// range at all.
pub fn parse_reference_range(text: &str) -> Option<ReferenceRange> {
    let trimmed = text
        .trim()
        .trim_start_matches(['(', '['])
        .trim_end_matches([')', ']'])
        .trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(caps) = CLOSED.captures(trimmed) {
        let low = parse_signed(&caps["low"]);
        let high = parse_number(&caps["high"]);
        if let (Some(low), Some(high)) = (low, high) {
            if low <= high {
                return Some(ReferenceRange::closed(low, high));
            }
        }
    }

    if let Some(high) = UPPER.captures(trimmed).and_then(|c| parse_number(&c["high"])) {
        return Some(ReferenceRange::Interval {
            low: None,
            high: Some(high),
        });
    }

    if let Some(low) = LOWER.captures(trimmed).and_then(|c| parse_number(&c["low"])) {
        return Some(ReferenceRange::Interval {
            low: Some(low),
            high: None,
        });
    }

    if LABELS.is_match(trimmed) {
        let normal: Vec<String> = LABEL_SEPARATOR
            .split(trimmed)
            .map(|label| label.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|label| !label.is_empty())
            .collect();
        if !normal.is_empty() {
            return Some(ReferenceRange::Categorical { normal });
        }
    }

    Some(ReferenceRange::Opaque {
        text: trimmed.to_string(),
    })
}

fn parse_signed(raw: &str) -> Option<f64> {
    match raw.strip_prefix('-') {
        Some(rest) => parse_number(rest).map(|v| -v),
        None => parse_number(raw),
    }
}
