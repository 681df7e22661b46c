use std::sync::LazyLock;

use regex::Regex;

use crate::models::lab::{Comparator, TestValue};

/// Decimal number as OCR prints it: thousands groups (`1,200`), comma or
/// point decimals (`5,4`, `5.4`), bare fractions (`.5`).
pub(crate) const NUMBER: &str = r"(?:[1-9]\d{0,2}(?:,\d{3})+(?:\.\d+)?|\d+(?:[.,]\d+)?|[.,]\d+)";

/// Whole-token numeric value with optional comparator and glued unit.
static NUMERIC_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^(?P<cmp><=?|>=?|≤|≥)?(?P<num>{NUMBER})(?P<unit>[A-Za-zµμ%°][A-Za-z0-9µμ%/^°.*²³]*)?$"
    ))
    .unwrap()
});

static THOUSANDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[1-9]\d{0,2}(?:,\d{3})+(?:\.\d+)?$").unwrap());

/// Unit tokens: `mg/dL`, `%`, `x`, `10^3/µL`, `103/uL` (caret lost by OCR).
static UNIT_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:x?10(?:\^\d+/?[A-Za-zµμ]*|\d*/[A-Za-zµμ]+)|[A-Za-zµμ%°][A-Za-z0-9µμ%/^°.*²³]*)$")
        .unwrap()
});

/// Urine dipstick grades: `+`, `++`, `2+`.
static PLUS_GRADE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(?:\d\+|\+{1,4})$").unwrap());

/// Single-word qualitative results.
const QUALITATIVE: &[&str] = &[
    "absent",
    "abnormal",
    "clear",
    "detected",
    "negative",
    "nil",
    "nonreactive",
    "non-reactive",
    "normal",
    "occasional",
    "positive",
    "present",
    "reactive",
    "seen",
    "trace",
    "turbid",
];

/// Words that negate the qualitative word following them (`Not Detected`).
const NEGATIONS: &[&str] = &["not", "non", "no"];

/// Words that belong to a range, never to a unit.
const RANGE_WORDS: &[&str] = &[
    "up", "to", "upto", "less", "more", "than", "below", "above", "greater", "or",
];

/// A value token read from a result line.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueToken {
    pub value: TestValue,
    pub comparator: Option<Comparator>,
    pub glued_unit: Option<String>,
}

/// Parse a number printed with comma decimals or thousands separators.
pub fn parse_number(raw: &str) -> Option<f64> {
    let normalized = if THOUSANDS.is_match(raw) {
        raw.replace(',', "")
    } else {
        raw.replace(',', ".")
    };
    normalized.parse().ok()
}

/// Numeric value token (`110`, `<0.5`, `5,4`, `5.4mg/dL`).
pub fn parse_numeric_token(token: &str) -> Option<ValueToken> {
    let caps = NUMERIC_TOKEN.captures(token)?;
    let value = parse_number(&caps["num"])?;
    let comparator = caps.name("cmp").map(|m| match m.as_str() {
        "<" | "<=" | "≤" => Comparator::LessThan,
        _ => Comparator::GreaterThan,
    });

    Some(ValueToken {
        value: TestValue::Numeric(value),
        comparator,
        glued_unit: caps.name("unit").map(|m| m.as_str().to_string()),
    })
}

pub fn is_qualitative(token: &str) -> bool {
    let lower = token.to_lowercase();
    QUALITATIVE.contains(&lower.as_str()) || PLUS_GRADE.is_match(token)
}

pub fn is_negation(token: &str) -> bool {
    NEGATIONS.contains(&token.to_lowercase().as_str())
}

/// A lone comparator printed apart from its number (`< 0.5`).
pub fn parse_comparator(token: &str) -> Option<Comparator> {
    match token {
        "<" | "<=" | "≤" => Some(Comparator::LessThan),
        ">" | ">=" | "≥" => Some(Comparator::GreaterThan),
        _ => None,
    }
}

/// High/low markers printed next to out-of-range values.
pub fn is_flag(token: &str) -> bool {
    let bare = token.trim_matches(|c| matches!(c, '(' | ')' | '[' | ']'));
    matches!(
        bare.to_uppercase().as_str(),
        "H" | "L" | "HH" | "LL" | "HIGH" | "LOW" | "*"
    )
}

pub fn is_unit(token: &str) -> bool {
    let bare = token.trim_matches(|c| matches!(c, '(' | ')' | '[' | ']'));
    !bare.is_empty()
        && UNIT_TOKEN.is_match(bare)
        && !RANGE_WORDS.contains(&bare.to_lowercase().as_str())
        && !is_qualitative(bare)
        && !is_flag(bare)
}

/// Strip wrapping brackets from a unit token.
pub fn clean_unit(token: &str) -> String {
    token
        .trim_matches(|c| matches!(c, '(' | ')' | '[' | ']'))
        .to_string()
}
