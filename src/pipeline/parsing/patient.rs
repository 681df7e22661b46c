use std::sync::LazyLock;

use regex::Regex;

/// Header keys followed by a colon. Longer keys come first so
/// `Patient Name` wins over `Name` and `Collection Date` over `Date`.
static HEADER_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?P<key>patient\s*name|patient\s*id|age\s*/\s*(?:sex|gender)|collection\s*date|collected\s*on|report\s*date|reported\s*on|referred\s*by|ref\.?\s*by|sample\s*id|lab\s*no|uhid|name|age|sex|gender|date|doctor|lab)\s*:\s*",
    )
    .unwrap()
});

static LEADING_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{1,3}").unwrap());

/// Read `key: value` pairs from a header line.
///
/// The line only counts as a header when it opens with a known key.
/// Several pairs on one line are split at each following key. Keys come
/// back canonical (`name`, `age`, `gender`, `date`, `collection_date`,
/// `report_date`, `patient_id`, `referred_by`, `sample_id`, `lab`).
pub fn parse_header_pairs(line: &str) -> Option<Vec<(String, String)>> {
    let keys: Vec<_> = HEADER_KEY.captures_iter(line).collect();
    let first = keys.first()?.get(0)?;
    if !line[..first.start()].trim().is_empty() {
        return None;
    }

    let mut pairs = Vec::new();
    for (i, caps) in keys.iter().enumerate() {
        let (Some(whole), Some(key)) = (caps.get(0), caps.name("key")) else {
            continue;
        };
        let end = keys
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map_or(line.len(), |m| m.start());
        let value = line[whole.end()..end].trim().trim_end_matches([',', ';']).trim();
        if value.is_empty() {
            continue;
        }
        push_pair(&mut pairs, key.as_str(), value);
    }

    Some(pairs)
}

fn push_pair(pairs: &mut Vec<(String, String)>, raw_key: &str, value: &str) {
    let key = canonical_key(raw_key);
    match key {
        "age_gender" => {
            let mut parts = value.splitn(2, '/');
            if let Some(age) = parts.next().map(str::trim).filter(|s| !s.is_empty()) {
                pairs.push(("age".into(), normalize_age(age)));
            }
            if let Some(gender) = parts.next().map(str::trim).filter(|s| !s.is_empty()) {
                pairs.push(("gender".into(), normalize_gender(gender)));
            }
        }
        "age" => pairs.push((key.into(), normalize_age(value))),
        "gender" => pairs.push((key.into(), normalize_gender(value))),
        _ => pairs.push((key.into(), value.to_string())),
    }
}

fn canonical_key(raw: &str) -> &'static str {
    let squashed: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphabetic() || *c == '/')
        .collect::<String>()
        .to_lowercase();
    match squashed.as_str() {
        "patientname" | "name" => "name",
        "patientid" | "uhid" => "patient_id",
        "age" => "age",
        "sex" | "gender" => "gender",
        "collectiondate" | "collectedon" => "collection_date",
        "reportdate" | "reportedon" => "report_date",
        "date" => "date",
        "referredby" | "refby" | "doctor" => "referred_by",
        "sampleid" => "sample_id",
        "labno" | "lab" => "lab",
        _ => "age_gender",
    }
}

/// `45 Years` → `45`; anything without a leading number is kept as printed.
fn normalize_age(value: &str) -> String {
    LEADING_NUMBER
        .find(value)
        .map_or_else(|| value.to_string(), |m| m.as_str().to_string())
}

pub fn normalize_gender(value: &str) -> String {
    match value.trim().to_lowercase().as_str() {
        "m" | "male" => "Male".into(),
        "f" | "female" => "Female".into(),
        "o" | "other" => "Other".into(),
        _ => value.trim().to_string(),
    }
}
