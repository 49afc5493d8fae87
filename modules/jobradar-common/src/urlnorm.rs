//! URL normalisation. Every comparison against the published store and
//! every dedup key goes through `normalize_url`, which is idempotent.

use url::Url;

/// Query parameters that never change which posting a URL identifies.
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "gclid",
    "fbclid",
    "ref",
    "src",
    "gh_src",
    "lever-source",
];

/// Canonical form of a job URL: lowercased scheme and host, default port and
/// fragment removed, tracking parameters stripped, trailing slash trimmed
/// (except at the root). Inputs that do not parse are returned trimmed.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let Ok(mut url) = Url::parse(trimmed) else {
        return trimmed.to_string();
    };

    url.set_fragment(None);

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !TRACKING_PARAMS.contains(&k.to_lowercase().as_str()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if kept.is_empty() {
        url.set_query(None);
    } else {
        let query = kept
            .iter()
            .map(|(k, v)| {
                if v.is_empty() {
                    k.clone()
                } else {
                    format!("{k}={v}")
                }
            })
            .collect::<Vec<_>>()
            .join("&");
        url.set_query(Some(&query));
    }

    let mut out = url.to_string();
    if out.ends_with('/') && url.path() != "/" {
        out.pop();
    } else if url.path() == "/" && url.query().is_none() && out.ends_with('/') {
        // Root path: Url serialises "https://x.com" as "https://x.com/".
        out.pop();
    }
    out
}

/// Lowercased host of a URL, or the input when it does not parse.
pub fn extract_domain(raw: &str) -> String {
    match Url::parse(raw.trim()) {
        Ok(url) => url.host_str().unwrap_or_default().to_lowercase(),
        Err(_) => raw
            .split("://")
            .nth(1)
            .unwrap_or(raw)
            .split('/')
            .next()
            .unwrap_or("")
            .to_lowercase(),
    }
}

/// True when both URLs resolve to the same registrable-ish domain
/// (ignoring a leading "www.").
pub fn same_domain(a: &str, b: &str) -> bool {
    let strip = |d: String| d.trim_start_matches("www.").to_string();
    let da = strip(extract_domain(a));
    let db = strip(extract_domain(b));
    !da.is_empty() && da == db
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tracking_params_and_fragment() {
        assert_eq!(
            normalize_url("https://boards.greenhouse.io/x/jobs/1?gh_src=abc&utm_source=li#top"),
            "https://boards.greenhouse.io/x/jobs/1"
        );
    }

    #[test]
    fn keeps_meaningful_params() {
        assert_eq!(
            normalize_url("https://example.com/jobs?id=42&utm_medium=feed"),
            "https://example.com/jobs?id=42"
        );
    }

    #[test]
    fn trims_trailing_slash_except_root() {
        assert_eq!(normalize_url("https://example.com/jobs/"), "https://example.com/jobs");
        assert_eq!(normalize_url("https://example.com/"), "https://example.com");
    }

    #[test]
    fn normalization_is_idempotent() {
        let inputs = [
            "https://Example.com/Jobs/1?utm_source=x&id=9#frag",
            "https://boards.greenhouse.io/x/jobs/1",
            "not a url at all",
            "https://example.com/",
        ];
        for raw in inputs {
            let once = normalize_url(raw);
            assert_eq!(normalize_url(&once), once, "not idempotent for {raw}");
        }
    }

    #[test]
    fn domain_extraction() {
        assert_eq!(extract_domain("https://WWW.Example.com/path"), "www.example.com");
        assert!(same_domain("https://www.example.com/a", "https://example.com/b"));
        assert!(!same_domain("https://example.com", "https://other.com"));
    }
}
