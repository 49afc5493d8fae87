//! Systematic ATS prober. Given a company name and/or URL, generate
//! candidate board slugs and probe every known provider's API, so source
//! discovery never has to guess which ATS a company uses.
//!
//! Slug collisions are real: two unrelated companies can share a slug on
//! different providers. Hits whose sample job URL matches the input domain
//! are preferred, and the detailed variant surfaces every hit plus a
//! collision flag for operator review.

use std::sync::OnceLock;

use regex::Regex;
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info};

use jobradar_common::{same_domain, SourceConfig, WorkdaySourceConfig};

use crate::ats::{AtsProvider, ATS_PROVIDERS};
use crate::fetch::HttpFetcher;
use crate::json_path::{lookup, lookup_string};

const WORKDAY_SUBDOMAINS: &[&str] = &["wd1", "wd3", "wd5"];
const WORKDAY_BOARDS: &[&str] = &["jobs", "careers", "External", "Careers"];

#[derive(Debug, Clone)]
pub struct ProbeHit {
    pub provider: String,
    pub slug: String,
    pub aggregator_domain: String,
    pub api_url: String,
    pub job_count: usize,
    pub sample_job_url: Option<String>,
    /// Sample job URL domain matches the input company URL's domain.
    pub domain_matches: bool,
    /// Ready-to-use source config for the hit.
    pub config: SourceConfig,
}

#[derive(Debug, Clone, Default)]
pub struct DetailedProbeResult {
    pub hits: Vec<ProbeHit>,
    /// More than one provider/slug responded and they cannot all be the
    /// same company.
    pub collision: bool,
}

// --- Slug generation ---

const NAME_SUFFIXES: &[&str] = &[
    " inc", " inc.", " corp", " corp.", " llc", " ltd", " ltd.", " co", " co.", " company",
    " corporation", " group", " holdings", " technologies", " technology", " tech", " software",
    " solutions",
];

fn strip_suffix(name: &str) -> String {
    let lower = name.to_lowercase();
    for suffix in NAME_SUFFIXES {
        if let Some(stripped) = lower.strip_suffix(suffix) {
            return stripped.to_string();
        }
    }
    lower
}

/// Candidate slugs for a company name: alphanumeric join, hyphenated words,
/// first word, camel-case split.
pub fn generate_slug_variations(name: &str) -> Vec<String> {
    static NON_ALNUM: OnceLock<Regex> = OnceLock::new();
    static SPLIT: OnceLock<Regex> = OnceLock::new();
    static CAMEL: OnceLock<Regex> = OnceLock::new();

    let mut variations: Vec<String> = Vec::new();
    let mut push = |slug: String| {
        if !slug.is_empty() && !variations.contains(&slug) {
            variations.push(slug);
        }
    };

    let base = strip_suffix(name.trim());

    let joined = NON_ALNUM
        .get_or_init(|| Regex::new(r"[^a-z0-9]").unwrap())
        .replace_all(&base, "")
        .into_owned();
    push(joined);

    let words: Vec<&str> = SPLIT
        .get_or_init(|| Regex::new(r"[^a-z0-9]+").unwrap())
        .split(&base)
        .filter(|w| !w.is_empty())
        .collect();
    if words.len() > 1 {
        push(words.join("-"));
    }
    if let Some(first) = words.first() {
        if first.len() > 2 {
            push(first.to_string());
        }
    }

    let camel_split = CAMEL
        .get_or_init(|| Regex::new(r"([a-z])([A-Z])").unwrap())
        .replace_all(name, "$1-$2")
        .to_lowercase();
    let camel_slug: String = camel_split
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    push(camel_slug);

    variations
}

/// Extract a slug from a known ATS URL shape, e.g.
/// `boards.greenhouse.io/acme` or `acme.wd5.myworkdayjobs.com`.
pub fn extract_slug_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(&url.to_lowercase()).ok()?;
    let host = parsed.host_str()?;
    let mut path_segments = parsed.path_segments()?.filter(|s| !s.is_empty());
    let first_segment = path_segments.next().map(String::from);

    let path_slug = |segment: Option<String>| segment.filter(|s| !s.is_empty());

    if host.ends_with("greenhouse.io")
        || host.ends_with("lever.co")
        || host.ends_with("ashbyhq.com")
        || host.ends_with("smartrecruiters.com")
    {
        return path_slug(first_segment);
    }
    if host.ends_with("myworkdayjobs.com") {
        let sub = host.split('.').next()?;
        return (!sub.is_empty()).then(|| sub.to_string());
    }
    if host.ends_with("recruitee.com") || host.ends_with("breezy.hr") {
        let sub = host.split('.').next()?;
        return (sub != "www").then(|| sub.to_string());
    }
    if host.ends_with("workable.com") {
        if host.starts_with("apply.") {
            return path_slug(first_segment);
        }
        let sub = host.split('.').next()?;
        return (sub != "www" && sub != "apply").then(|| sub.to_string());
    }
    None
}

// --- Prober ---

pub struct AtsProber {
    fetcher: HttpFetcher,
}

impl AtsProber {
    pub fn new(fetcher: HttpFetcher) -> Self {
        Self { fetcher }
    }

    fn shorthand_config(provider: &str, slug: &str) -> SourceConfig {
        match provider {
            "greenhouse" => SourceConfig::Greenhouse {
                board_token: slug.to_string(),
            },
            "lever" => SourceConfig::Lever { slug: slug.to_string() },
            "ashby" => SourceConfig::Ashby { slug: slug.to_string() },
            "smartrecruiters" => SourceConfig::Smartrecruiters { slug: slug.to_string() },
            "recruitee" => SourceConfig::Recruitee { slug: slug.to_string() },
            "breezy" => SourceConfig::Breezy { slug: slug.to_string() },
            _ => SourceConfig::Workable { slug: slug.to_string() },
        }
    }

    async fn probe_provider(
        &self,
        provider: &'static AtsProvider,
        slug: &str,
        company_url: Option<&str>,
    ) -> Option<ProbeHit> {
        let api_url = provider.api_url.replace("{slug}", slug);
        let response = self.fetcher.get_json(&api_url).await.ok()?;
        let records = lookup(&response, provider.response_path)?.as_array()?;
        if records.is_empty() {
            return None;
        }

        let sample_job_url = records.first().and_then(|r| lookup_string(r, provider.url));
        let domain_matches = match (company_url, &sample_job_url) {
            (Some(input), Some(sample)) => same_domain(input, sample),
            _ => false,
        };

        debug!(
            category = "scrape",
            provider = provider.name,
            slug,
            jobs = records.len(),
            domain_matches,
            "ATS probe hit"
        );

        Some(ProbeHit {
            provider: provider.name.to_string(),
            slug: slug.to_string(),
            aggregator_domain: provider.aggregator_domain.to_string(),
            api_url,
            job_count: records.len(),
            sample_job_url,
            domain_matches,
            config: Self::shorthand_config(provider.name, slug),
        })
    }

    async fn probe_workday(&self, slug: &str) -> Option<ProbeHit> {
        for subdomain in WORKDAY_SUBDOMAINS {
            for board in WORKDAY_BOARDS {
                let api_url = format!(
                    "https://{slug}.{subdomain}.myworkdayjobs.com/wday/cxs/{slug}/{board}/jobs"
                );
                let body = json!({"limit": 1, "offset": 0, "searchText": "", "appliedFacets": {}});
                let Ok(response) = self
                    .fetcher
                    .request_json(Method::POST, &api_url, Some(&body), &[])
                    .await
                else {
                    continue;
                };
                let total = response.get("total").and_then(|v| v.as_u64()).unwrap_or(0);
                if total == 0 {
                    continue;
                }

                return Some(ProbeHit {
                    provider: "workday".to_string(),
                    slug: slug.to_string(),
                    aggregator_domain: "myworkdayjobs.com".to_string(),
                    api_url,
                    job_count: total as usize,
                    sample_job_url: None,
                    domain_matches: false,
                    config: SourceConfig::Workday(WorkdaySourceConfig {
                        tenant: slug.to_string(),
                        subdomain: subdomain.to_string(),
                        board: board.to_string(),
                    }),
                });
            }
        }
        None
    }

    fn candidate_slugs(company_name: &str, company_url: Option<&str>) -> Vec<String> {
        let mut slugs = Vec::new();
        if let Some(url_slug) = company_url.and_then(extract_slug_from_url) {
            slugs.push(url_slug);
        }
        for slug in generate_slug_variations(company_name) {
            if !slugs.contains(&slug) {
                slugs.push(slug);
            }
        }
        slugs
    }

    /// Probe every provider for every candidate slug, returning all hits
    /// and a collision flag.
    pub async fn probe_detailed(
        &self,
        company_name: &str,
        company_url: Option<&str>,
    ) -> DetailedProbeResult {
        let slugs = Self::candidate_slugs(company_name, company_url);
        let mut hits: Vec<ProbeHit> = Vec::new();

        for slug in &slugs {
            for provider in ATS_PROVIDERS {
                if let Some(hit) = self.probe_provider(provider, slug, company_url).await {
                    hits.push(hit);
                }
            }
        }
        // Workday probing is expensive (POST fan-out); only try the two
        // strongest slug candidates.
        for slug in slugs.iter().take(2) {
            if let Some(hit) = self.probe_workday(slug).await {
                hits.push(hit);
            }
        }

        let distinct_boards = hits
            .iter()
            .map(|h| (h.provider.clone(), h.slug.clone()))
            .collect::<std::collections::BTreeSet<_>>()
            .len();
        let collision = distinct_boards > 1 && !hits.iter().all(|h| h.domain_matches);

        info!(
            category = "scrape",
            company = company_name,
            hits = hits.len(),
            collision,
            "ATS probe complete"
        );
        DetailedProbeResult { hits, collision }
    }

    /// Best single probe result: a domain-matching hit wins; otherwise the
    /// hit with the most jobs.
    pub async fn probe(&self, company_name: &str, company_url: Option<&str>) -> Option<ProbeHit> {
        let detailed = self.probe_detailed(company_name, company_url).await;
        let mut hits = detailed.hits;
        if hits.is_empty() {
            return None;
        }
        hits.sort_by_key(|h| (std::cmp::Reverse(h.domain_matches), std::cmp::Reverse(h.job_count)));
        hits.into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_variations_cover_known_shapes() {
        let v = generate_slug_variations("3Pillar Global");
        assert!(v.contains(&"3pillarglobal".to_string()));
        assert!(v.contains(&"3pillar-global".to_string()));

        let v = generate_slug_variations("Full Script Inc.");
        assert!(v.contains(&"fullscript".to_string()));
        assert!(v.contains(&"full-script".to_string()));
        assert!(v.contains(&"full".to_string()));

        let v = generate_slug_variations("PostHog");
        assert!(v.contains(&"post-hog".to_string()));
    }

    #[test]
    fn suffixes_are_stripped() {
        let v = generate_slug_variations("Acme Corp");
        assert_eq!(v.first().map(String::as_str), Some("acme"));
    }

    #[test]
    fn extracts_slugs_from_ats_urls() {
        assert_eq!(
            extract_slug_from_url("https://boards.greenhouse.io/acmecorp").as_deref(),
            Some("acmecorp")
        );
        assert_eq!(
            extract_slug_from_url("https://jobs.lever.co/fullscript/123").as_deref(),
            Some("fullscript")
        );
        assert_eq!(
            extract_slug_from_url("https://acme.wd5.myworkdayjobs.com/External").as_deref(),
            Some("acme")
        );
        assert_eq!(
            extract_slug_from_url("https://apply.workable.com/acme/").as_deref(),
            Some("acme")
        );
        assert_eq!(
            extract_slug_from_url("https://acme.recruitee.com/").as_deref(),
            Some("acme")
        );
        assert_eq!(extract_slug_from_url("https://acme.example/careers"), None);
    }
}
