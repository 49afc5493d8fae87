//! Sanitisation for scraped text. Applied to every inbound title,
//! description, and company name before anything downstream sees it.
//! Sanitising already-sanitised text is a no-op.

use std::sync::OnceLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").unwrap())
}

fn spaces_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t]+").unwrap())
}

fn newlines_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").unwrap())
}

fn line_edges_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r" *\n *").unwrap())
}

/// Smart punctuation and symbol folding to ASCII equivalents.
const REPLACEMENTS: &[(char, &str)] = &[
    ('\u{2018}', "'"),
    ('\u{2019}', "'"),
    ('\u{201c}', "\""),
    ('\u{201d}', "\""),
    ('\u{2013}', "-"),
    ('\u{2014}', "-"),
    ('\u{2015}', "-"),
    ('\u{2026}', "..."),
    ('\u{2022}', "*"),
    ('\u{2023}', "*"),
    ('\u{a0}', " "),
    ('\u{200b}', ""),
    ('\u{200c}', ""),
    ('\u{200d}', ""),
    ('\u{feff}', ""),
    ('\u{a9}', "(c)"),
    ('\u{ae}', "(R)"),
    ('\u{2122}', "(TM)"),
];

/// Full sanitisation pass: entity decoding, tag stripping, NFC
/// normalisation, smart-punctuation folding, control-character removal,
/// whitespace normalisation.
pub fn sanitize_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut text = htmlize::unescape(text).into_owned();
    text = tag_re().replace_all(&text, "").into_owned();
    text = text.nfc().collect();

    for (from, to) in REPLACEMENTS {
        if text.contains(*from) {
            text = text.replace(*from, to);
        }
    }

    // Keep newlines and tabs; drop every other control character.
    text = text
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect();

    text = spaces_re().replace_all(&text, " ").into_owned();
    text = newlines_re().replace_all(&text, "\n\n").into_owned();
    text = line_edges_re().replace_all(&text, "\n").into_owned();

    text.trim().to_string()
}

/// Sanitise with a length cap; truncation breaks at a word boundary.
pub fn sanitize_text_truncated(text: &str, max_length: usize) -> String {
    let clean = sanitize_text(text);
    if clean.len() <= max_length {
        return clean;
    }
    let mut cut = &clean[..max_length];
    if let Some(idx) = cut.rfind(' ') {
        cut = &cut[..idx];
    }
    format!("{cut}...")
}

/// Convert an HTML job description to plain text while preserving paragraph
/// breaks, list bullets, and heading separation.
pub fn sanitize_html_description(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }

    static BR: OnceLock<Regex> = OnceLock::new();
    static P_CLOSE: OnceLock<Regex> = OnceLock::new();
    static P_OPEN: OnceLock<Regex> = OnceLock::new();
    static LI_OPEN: OnceLock<Regex> = OnceLock::new();
    static LI_CLOSE: OnceLock<Regex> = OnceLock::new();
    static H_OPEN: OnceLock<Regex> = OnceLock::new();
    static H_CLOSE: OnceLock<Regex> = OnceLock::new();

    let mut text = BR
        .get_or_init(|| Regex::new(r"(?i)<br\s*/?>").unwrap())
        .replace_all(html, "\n")
        .into_owned();
    text = P_CLOSE
        .get_or_init(|| Regex::new(r"(?i)</p>").unwrap())
        .replace_all(&text, "\n\n")
        .into_owned();
    text = P_OPEN
        .get_or_init(|| Regex::new(r"(?i)<p[^>]*>").unwrap())
        .replace_all(&text, "")
        .into_owned();
    text = LI_OPEN
        .get_or_init(|| Regex::new(r"(?i)<li[^>]*>").unwrap())
        .replace_all(&text, "\n* ")
        .into_owned();
    text = LI_CLOSE
        .get_or_init(|| Regex::new(r"(?i)</li>").unwrap())
        .replace_all(&text, "")
        .into_owned();
    text = H_OPEN
        .get_or_init(|| Regex::new(r"(?i)<h[1-6][^>]*>").unwrap())
        .replace_all(&text, "\n\n")
        .into_owned();
    text = H_CLOSE
        .get_or_init(|| Regex::new(r"(?i)</h[1-6]>").unwrap())
        .replace_all(&text, "\n")
        .into_owned();

    sanitize_text(&text)
}

/// Sanitise a job title and drop trailing punctuation.
pub fn sanitize_title(title: &str) -> String {
    static TRAILING: OnceLock<Regex> = OnceLock::new();
    let clean = sanitize_text(title);
    TRAILING
        .get_or_init(|| Regex::new(r"[,;:\-\s]+$").unwrap())
        .replace(&clean, "")
        .trim()
        .to_string()
}

/// Sanitise a company name and collapse duplicated legal suffixes
/// ("Acme Inc. Inc." becomes "Acme Inc.").
pub fn sanitize_company_name(company: &str) -> String {
    let mut clean = sanitize_text(company);
    const SUFFIXES: &[&str] = &["Inc.", "LLC", "Ltd.", "Corp.", "Corporation", "Company", "Co."];
    for suffix in SUFFIXES {
        let pattern = format!(r"(?i)(\b{})\s+{}\b", regex::escape(suffix), regex::escape(suffix));
        if let Ok(re) = Regex::new(&pattern) {
            clean = re.replace_all(&clean, "$1").into_owned();
        }
    }
    clean.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_entities_and_strips_tags() {
        assert_eq!(
            sanitize_text("<b>Fish &amp; Chips</b> &#8217;n more"),
            "Fish & Chips 'n more"
        );
    }

    #[test]
    fn folds_smart_punctuation() {
        assert_eq!(sanitize_text("\u{201c}hi\u{201d} \u{2014} there\u{2026}"), "\"hi\" - there...");
    }

    #[test]
    fn removes_control_and_invisible_characters() {
        assert_eq!(sanitize_text("a\u{200b}b\u{7}c"), "abc");
        assert_eq!(sanitize_text("keep\nnewline\tand tab"), "keep\nnewline\tand tab");
    }

    #[test]
    fn sanitize_is_idempotent() {
        let raw = "<p>Senior&nbsp;Engineer \u{2013} Remote</p><ul><li>Rust</li><li>SQL</li></ul>";
        let once = sanitize_html_description(raw);
        assert_eq!(sanitize_html_description(&once), once);
        assert_eq!(sanitize_text(&once), once);
    }

    #[test]
    fn html_description_preserves_structure() {
        let html = "<p>Intro</p><ul><li>First</li><li>Second</li></ul><h2>Heading</h2>More";
        let text = sanitize_html_description(html);
        assert!(text.contains("* First"));
        assert!(text.contains("* Second"));
        assert!(text.contains("Intro\n"));
        assert!(text.contains("Heading\nMore"));
    }

    #[test]
    fn title_drops_trailing_punctuation() {
        assert_eq!(sanitize_title("Staff Engineer - "), "Staff Engineer");
    }

    #[test]
    fn company_collapses_duplicate_suffix() {
        assert_eq!(sanitize_company_name("Acme Inc. Inc."), "Acme Inc.");
        assert_eq!(sanitize_company_name("Acme Inc."), "Acme Inc.");
    }

    #[test]
    fn truncation_breaks_on_word_boundary() {
        let out = sanitize_text_truncated("one two three four", 9);
        assert_eq!(out, "one two...");
    }
}
