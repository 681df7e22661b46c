//! Line grammar. Each sanitized line is matched against these rules in
//! order; the first that applies decides what the line is:
//!
//! 1. blank line: block boundary
//! 2. column heading (`Test Name  Result  Unit  Reference Range`): skipped
//! 3. patient header (`Name: ...`, `Age/Sex: ...`): header pairs
//! 4. known panel name with no numeric value on the line: section header
//! 5. `<name> <value> [flag] [unit] [range]`: result line, with OCR
//!    misreads in the name corrected against the lab vocabulary
//! 6. `Title:` with nothing after it, an ALL CAPS line without digits, or
//!    the short first line of a blank-delimited block: section header
//! 7. anything else: discarded

use std::sync::LazyLock;

use regex::Regex;

use crate::models::lab::{Comparator, ReferenceRange, TestValue};
use crate::pipeline::extraction::lab_correction::correct_lab_terms;

use super::patient::parse_header_pairs;
use super::range::parse_reference_range;
use super::value::{
    clean_unit, is_flag, is_negation, is_qualitative, is_unit, parse_comparator,
    parse_numeric_token,
};

static KNOWN_PANEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(complete\s+blood\s+count|haematology|hematology|biochemistry|kidney\s+function(?:\s+tests?)?|renal\s+function(?:\s+tests?)?|liver\s+function(?:\s+tests?)?|lipid\s+(?:profile|panel)|thyroid\s+(?:profile|function(?:\s+tests?)?)|diabetes\s+screening|serum\s+electrolytes|electrolytes|urinalysis|urine\s+(?:routine|analysis)|iron\s+studies|vitamin\s+profile)\b",
    )
    .unwrap()
});

static COLUMN_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:test(?:\s*name)?|investigation|parameter|test\s+description)\b.*\b(?:result|value)s?\b")
        .unwrap()
});

/// A section title written as `Title:` with nothing after the colon.
static BARE_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<title>[A-Za-z][A-Za-z &/()\-]{1,60}):$").unwrap());

const MAX_HEADER_WORDS: usize = 6;
const MAX_UNITS: usize = 2;

/// What one line of report text turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum LineKind {
    Blank,
    Skipped,
    Patient(Vec<(String, String)>),
    Section(String),
    Result(ResultLine),
    Unrecognized,
}

/// The fields of a result line, before classification.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultLine {
    pub name: String,
    pub value: TestValue,
    pub comparator: Option<Comparator>,
    pub unit: Option<String>,
    pub range: Option<ReferenceRange>,
    pub range_text: Option<String>,
}

/// Classify one sanitized line. `block_start` is true for the first
/// non-blank line of a page or after a blank line.
pub fn classify_line(line: &str, block_start: bool) -> LineKind {
    let line = line.trim();
    if line.is_empty() {
        return LineKind::Blank;
    }
    if COLUMN_HEADING.is_match(line) {
        return LineKind::Skipped;
    }
    if let Some(pairs) = parse_header_pairs(line) {
        return LineKind::Patient(pairs);
    }

    let tokens: Vec<&str> = line
        .split_whitespace()
        .map(|t| t.trim_end_matches([',', ';']))
        .filter(|t| !t.is_empty())
        .collect();

    if let Some(panel) = KNOWN_PANEL.captures(line).and_then(|c| c.get(1)) {
        if !tokens.iter().any(|t| parse_numeric_token(t).is_some()) {
            return LineKind::Section(title_case(panel.as_str()));
        }
    }

    if let Some(result) = parse_result_tokens(&tokens) {
        return LineKind::Result(result);
    }

    match section_title(line, &tokens, block_start) {
        Some(title) => LineKind::Section(title),
        None => LineKind::Unrecognized,
    }
}

/// `<name> <value> [flag] [unit...] [range]`, read token by token.
fn parse_result_tokens(tokens: &[&str]) -> Option<ResultLine> {
    // The name needs at least one token, so the value search starts at 1
    let value_at = (1..tokens.len()).find(|&i| is_value_start(tokens, i))?;

    let name = normalize_name(&tokens[..value_at])?;
    let mut rest = value_at;

    let mut comparator = None;
    let mut glued_unit = None;
    let value = if let Some(cmp) = parse_comparator(tokens[rest]) {
        let number = parse_numeric_token(tokens[rest + 1])?;
        comparator = Some(cmp);
        glued_unit = number.glued_unit;
        rest += 2;
        number.value
    } else if let Some(number) = parse_numeric_token(tokens[rest]) {
        comparator = number.comparator;
        glued_unit = number.glued_unit;
        rest += 1;
        number.value
    } else if is_negation(tokens[rest]) {
        rest += 2;
        TestValue::Text(format!("{} {}", tokens[value_at], tokens[value_at + 1]))
    } else {
        rest += 1;
        TestValue::Text(tokens[value_at].to_string())
    };

    let mut tail: Vec<&str> = tokens[rest..].iter().copied().filter(|t| !is_flag(t)).collect();

    let unit = match (&value, glued_unit) {
        (_, Some(unit)) => Some(unit),
        (TestValue::Numeric(_), None) => {
            let count = tail
                .iter()
                .take(MAX_UNITS)
                .take_while(|t| is_unit(t))
                .count();
            let unit = (count > 0).then(|| {
                tail[..count]
                    .iter()
                    .map(|t| clean_unit(t))
                    .collect::<Vec<_>>()
                    .join(" ")
            });
            tail.drain(..count);
            unit
        }
        (TestValue::Text(_), None) => None,
    };

    let range_text = (!tail.is_empty()).then(|| tail.join(" "));
    let range = range_text.as_deref().and_then(parse_reference_range);

    Some(ResultLine {
        name,
        value,
        comparator,
        unit,
        range_text: range.as_ref().and(range_text),
        range,
    })
}

fn is_value_start(tokens: &[&str], i: usize) -> bool {
    let token = tokens[i];
    if parse_numeric_token(token).is_some() || is_qualitative(token) {
        return true;
    }
    let next = tokens.get(i + 1);
    if parse_comparator(token).is_some() {
        return next.is_some_and(|n| parse_numeric_token(n).is_some());
    }
    is_negation(token) && next.is_some_and(|n| is_qualitative(n))
}

/// Correct and collapse the name tokens; ALL CAPS words longer than an
/// acronym are title-cased (`HEMOGLOBIN` → `Hemoglobin`, `HDL` stays).
fn normalize_name(tokens: &[&str]) -> Option<String> {
    let name = tokens
        .iter()
        .map(|token| {
            let word = correct_lab_terms(token);
            let letters = word.chars().filter(|c| c.is_alphabetic()).count();
            let all_caps = word.chars().all(|c| !c.is_lowercase());
            if all_caps && letters > 4 {
                title_case(&word)
            } else {
                word
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    let name = name.trim_end_matches([':', '.', '-', '=']).trim().to_string();

    let letters = name.chars().filter(|c| c.is_alphabetic()).count();
    (letters >= 2).then_some(name)
}

fn section_title(line: &str, tokens: &[&str], block_start: bool) -> Option<String> {
    if let Some(caps) = BARE_TITLE.captures(line) {
        return Some(caps["title"].trim().to_string());
    }
    if tokens.len() > MAX_HEADER_WORDS || line.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let letters: Vec<char> = line.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.len() < 3 {
        return None;
    }
    if letters.iter().all(|c| c.is_uppercase()) {
        return Some(title_case(line.trim_end_matches(':')));
    }

    // First line of a block, every word capitalised: `Kidney Panel`
    let capitalised = tokens
        .iter()
        .all(|t| t.chars().next().is_some_and(|c| !c.is_lowercase()));
    (block_start && capitalised).then(|| line.trim_end_matches(':').trim().to_string())
}

pub fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
