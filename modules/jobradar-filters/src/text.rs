//! Small text helpers shared by the filter stages: lenient date parsing,
//! salary-range parsing, word-boundary matching.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;

/// Parse a posted date from the shapes sources actually emit: RFC 3339,
/// bare ISO dates, RFC 2822, and epoch seconds/milliseconds.
pub fn parse_posted_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    // Epoch: treat 13-digit values as milliseconds.
    if raw.chars().all(|c| c.is_ascii_digit()) {
        let n: i64 = raw.parse().ok()?;
        let secs = if raw.len() >= 13 { n / 1000 } else { n };
        return DateTime::from_timestamp(secs, 0);
    }
    None
}

pub fn age_days(posted: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - posted).num_days()
}

/// Parse "$160,000 - $180,000", "160k-180k", "$95k+" style salary strings
/// into (min, max) yearly figures. Single figures yield min == max.
pub fn parse_salary_range(raw: &str) -> Option<(u32, u32)> {
    static AMOUNT: OnceLock<Regex> = OnceLock::new();
    let re = AMOUNT.get_or_init(|| Regex::new(r"\$?(\d{1,3}(?:,\d{3})+|\d+(?:\.\d+)?)\s*([kK])?").unwrap());

    let mut amounts: Vec<u32> = Vec::new();
    for caps in re.captures_iter(raw) {
        let digits = caps[1].replace(',', "");
        let Ok(mut value) = digits.parse::<f64>() else {
            continue;
        };
        if caps.get(2).is_some() {
            value *= 1000.0;
        }
        // Hourly rates and misc small numbers are not yearly salaries.
        if value < 10_000.0 {
            continue;
        }
        amounts.push(value as u32);
    }

    match amounts.as_slice() {
        [] => None,
        [single] => Some((*single, *single)),
        rest => {
            let min = *rest.iter().min().unwrap();
            let max = *rest.iter().max().unwrap();
            Some((min, max))
        }
    }
}

/// Case-insensitive word-boundary containment.
pub fn contains_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    let pattern = format!(r"(?i)\b{}\b", regex::escape(needle));
    Regex::new(&pattern)
        .map(|re| re.is_match(haystack))
        .unwrap_or(false)
}

/// Case-insensitive substring containment, the match mode for stop lists
/// and keyword checks.
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    !needle.is_empty() && haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_date_shapes() {
        assert!(parse_posted_date("2026-06-15T09:00:00Z").is_some());
        assert!(parse_posted_date("2026-06-15").is_some());
        assert!(parse_posted_date("Mon, 15 Jun 2026 09:00:00 GMT").is_some());
        assert!(parse_posted_date("1750000000").is_some());
        assert!(parse_posted_date("1750000000000").is_some());
        assert!(parse_posted_date("soon").is_none());
        assert!(parse_posted_date("").is_none());
    }

    #[test]
    fn epoch_millis_and_secs_agree() {
        let secs = parse_posted_date("1750000000").unwrap();
        let millis = parse_posted_date("1750000000000").unwrap();
        assert_eq!(secs, millis);
    }

    #[test]
    fn parses_salary_ranges() {
        assert_eq!(parse_salary_range("$160,000 - $180,000"), Some((160_000, 180_000)));
        assert_eq!(parse_salary_range("160k-180k"), Some((160_000, 180_000)));
        assert_eq!(parse_salary_range("$95k+"), Some((95_000, 95_000)));
        assert_eq!(parse_salary_range("competitive"), None);
        // Hourly rates are ignored rather than read as yearly figures.
        assert_eq!(parse_salary_range("$45/hour"), None);
    }

    #[test]
    fn word_boundaries() {
        assert!(contains_word("We use Java and Go", "java"));
        assert!(!contains_word("We use JavaScript", "java"));
        assert!(contains_word("C++ and Go daily", "go"));
    }
}
