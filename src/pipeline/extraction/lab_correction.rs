//! Post-OCR correction of lab vocabulary.
//!
//! Fuzzy-matches the words of a test name against a small dictionary of
//! terms that appear on lab reports. A word is only replaced when it is
//! long enough (>= 5 chars), contains no digits, and has exactly one
//! closest term within edit distance 2. Common report words are in the dictionary as well so they
//! are never pulled towards a similar test name.

/// Sorted for binary search. Lowercase for case-insensitive matching.
const LAB_TERMS: &[&str] = &[
    "albumin", "alkaline", "amylase", "basophil", "basophils", "bicarbonate",
    "bilirubin", "biochemistry", "calcium", "chloride", "cholesterol",
    "complete", "concentration", "corpuscular", "count", "creatine",
    "creatinine", "detected", "diabetes", "differential", "direct",
    "electrolytes", "eosinophil", "eosinophils", "erythrocytes", "fasting",
    "female", "ferritin", "folate", "function", "gamma", "globulin", "glucose",
    "glutamyl", "gravity", "haematocrit", "haematology", "haemoglobin",
    "hematocrit", "hematology", "hemoglobin", "indirect", "interval", "ketone",
    "ketones", "kidney", "leucocytes", "leukocytes", "lipase", "lipid", "liver",
    "lymphocyte", "lymphocytes", "magnesium", "method", "microalbumin",
    "monocyte", "monocytes", "negative", "neutrophil", "neutrophils", "nitrite",
    "normal", "patient", "phosphatase", "phosphorus", "plasma", "platelet",
    "platelets", "positive", "potassium", "present", "profile", "protein",
    "range", "reactive", "reference", "remarks", "report", "result", "results",
    "sample", "screening", "serum", "sodium", "specific", "specimen", "thyroid",
    "thyrotropin", "thyroxine", "total", "transaminase", "transferase",
    "triglyceride", "triglycerides", "triiodothyronine", "units", "urine",
    "value", "values", "vitamin", "volume",
];

const MIN_WORD_LEN: usize = 5;
const MAX_DISTANCE: u32 = 2;

/// Correct near-miss lab terms in OCR text, leaving everything else intact.
pub fn correct_lab_terms(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut word = String::new();

    for ch in text.chars() {
        if ch.is_alphanumeric() {
            word.push(ch);
            continue;
        }
        if !word.is_empty() {
            result.push_str(&correct_word(&word));
            word.clear();
        }
        result.push(ch);
    }
    if !word.is_empty() {
        result.push_str(&correct_word(&word));
    }

    result
}

fn correct_word(word: &str) -> String {
    let len = word.chars().count();
    if len < MIN_WORD_LEN || word.chars().any(|c| c.is_ascii_digit()) {
        return word.to_string();
    }

    let lower = word.to_lowercase();
    if LAB_TERMS.binary_search(&lower.as_str()).is_ok() {
        return word.to_string();
    }

    let mut best: Option<&str> = None;
    let mut best_distance = MAX_DISTANCE + 1;
    let mut ambiguous = false;

    for &term in LAB_TERMS {
        if len.abs_diff(term.len()) > MAX_DISTANCE as usize {
            continue;
        }
        let distance = edit_distance(&lower, term);
        if distance < best_distance {
            best_distance = distance;
            best = Some(term);
            ambiguous = false;
        } else if distance == best_distance && best.is_some() {
            ambiguous = true;
        }
    }

    match best {
        Some(term) if !ambiguous => {
            tracing::trace!(from = word, to = term, "Lab term corrected");
            match_case(word, term)
        }
        _ => word.to_string(),
    }
}

/// Apply the original word's casing (ALL CAPS, Capitalized, lower) to `term`.
fn match_case(original: &str, term: &str) -> String {
    if original.chars().filter(|c| c.is_alphabetic()).all(char::is_uppercase) {
        return term.to_uppercase();
    }
    if original.chars().next().is_some_and(char::is_uppercase) {
        let mut chars = term.chars();
        return match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
    }
    term.to_string()
}

/// Levenshtein distance.
fn edit_distance(a: &str, b: &str) -> u32 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len() as u32;
    }
    if b.is_empty() {
        return a.len() as u32;
    }

    let mut prev: Vec<u32> = (0..=b.len() as u32).collect();
    let mut curr = vec![0u32; b.len() + 1];

    for (i, &ca) in a.iter().enumerate() {
        curr[0] = i as u32 + 1;
        for (j, &cb) in b.iter().enumerate() {
            let cost = u32::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}
