use std::sync::LazyLock;

use regex::Regex;

/// `Page 1 of 3`, `Page 2/3`, `- 1 -`
static PAGE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:page\s*\d+\s*(?:of|/)\s*\d+|-\s*\d+\s*-)$").unwrap()
});

/// `--- PAGE END ---`, `*** End of Report ***`
static END_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[-*=_~\s]*(?:page\s*end|end\s*of\s*(?:the\s*)?report)[-*=_~\s]*$").unwrap()
});

/// Table rules and separators: nothing but punctuation.
static RULE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-=_*~.|+#:\s]+$").unwrap());

/// Sanitize raw OCR text before parsing.
///
/// Strips control characters, turns stray symbols into spaces, collapses
/// whitespace within lines and drops page furniture. Runs of blank lines
/// collapse to one blank line, which the parser treats as a block boundary.
pub fn sanitize_extracted_text(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| match c {
            '\n' => '\n',
            '\t' | '|' => ' ',
            c if c.is_control() => '\0',
            c if c.is_alphanumeric() || c.is_whitespace() || is_kept_punctuation(c) => c,
            _ => ' ',
        })
        .filter(|&c| c != '\0')
        .collect();

    let mut lines: Vec<String> = Vec::new();
    for line in cleaned.lines() {
        let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if is_noise_line(&line) {
            continue;
        }
        if line.is_empty() && lines.last().map_or(true, |prev| prev.is_empty()) {
            continue;
        }
        lines.push(line);
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }

    lines.join("\n")
}

fn is_kept_punctuation(c: char) -> bool {
    matches!(
        c,
        '.' | ','
            | ';'
            | ':'
            | '-'
            | '/'
            | '('
            | ')'
            | '['
            | ']'
            | '+'
            | '='
            | '%'
            | '#'
            | '&'
            | '\''
            | '<'
            | '>'
            | '*'
            | '^'
            | '_'
            | '°'
            | '²'
            | '³'
            | 'µ'
            | 'μ'
            | '≤'
            | '≥'
            | '\u{2013}'
    )
}

fn is_noise_line(line: &str) -> bool {
    !line.is_empty()
        && (PAGE_MARKER.is_match(line) || END_MARKER.is_match(line) || RULE_LINE.is_match(line))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_control_characters() {
        let clean = sanitize_extracted_text("Glucose\x00 110\x01 mg/dL");
        assert_eq!(clean, "Glucose 110 mg/dL");
    }

    #[test]
    fn table_pipes_become_spaces() {
        let clean = sanitize_extracted_text("Glucose|110|mg/dL|70-100");
        assert_eq!(clean, "Glucose 110 mg/dL 70-100");
    }

    #[test]
    fn keeps_single_blank_lines() {
        let raw = "  Name: Jane  \n\n\n\nLIPID PROFILE\nCholesterol 180 mg/dL\n\n";
        assert_eq!(
            sanitize_extracted_text(raw),
            "Name: Jane\n\nLIPID PROFILE\nCholesterol 180 mg/dL"
        );
    }

    #[test]
    fn drops_page_furniture() {
        let raw = "Urea 30 mg/dL\nPage 1 of 2\n--- PAGE END ---\n-----------\n*** End of Report ***\nSodium 140";
        assert_eq!(sanitize_extracted_text(raw), "Urea 30 mg/dL\nSodium 140");
    }

    #[test]
    fn preserves_lab_punctuation() {
        let raw = "TSH 2.5 µIU/mL (0.4-4.0)\nHBsAg <0.5 >=1.0 10^3/µL";
        assert_eq!(sanitize_extracted_text(raw), raw);
    }

    #[test]
    fn header_and_section_lines_pass_unchanged() {
        let raw = "Name: Livia Rangel\nHEMATOLOGY\nBasophil 1 % 0-2";
        assert_eq!(sanitize_extracted_text(raw), raw);
    }

    #[test]
    fn empty_input_returns_empty() {
        assert_eq!(sanitize_extracted_text(""), "");
        assert_eq!(sanitize_extracted_text("\x00\x01\n\n"), "");
    }
}
