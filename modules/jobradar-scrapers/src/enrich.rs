//! Detail-page enrichment for thin listing rows (RSS items, HTML cards
//! that only carry a title and link). JSON-LD `JobPosting` blocks are the
//! primary signal on detail pages.

use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;

use jobradar_common::{
    sanitize_company_name, sanitize_html_description, sanitize_title, JobPosting,
};

use crate::fetch::HttpFetcher;

/// Fields pulled from a detail page. Only fills gaps; scraped values win.
#[derive(Debug, Default, PartialEq)]
pub struct DetailFields {
    pub company: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub posted_date: Option<String>,
}

/// Find a JSON-LD `JobPosting` object in a detail page, including inside
/// `@graph` arrays, and extract the fields we care about.
pub fn extract_jsonld_job_posting(html: &str) -> Option<DetailFields> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(r#"script[type="application/ld+json"]"#).ok()?;

    for script in document.select(&selector) {
        let raw = script.text().collect::<String>();
        let Ok(value) = serde_json::from_str::<Value>(&raw) else {
            debug!(category = "scrape", "Skipping malformed JSON-LD block");
            continue;
        };
        if let Some(posting) = find_job_posting(&value) {
            return Some(fields_from_posting(posting));
        }
    }
    None
}

fn find_job_posting(value: &Value) -> Option<&Value> {
    let mut postings = Vec::new();
    collect_job_postings(value, &mut postings);
    postings.into_iter().next()
}

/// Collect every `JobPosting` object in a JSON-LD value, descending into
/// arrays and `@graph` containers.
fn collect_job_postings<'a>(value: &'a Value, out: &mut Vec<&'a Value>) {
    match value {
        Value::Object(map) => {
            if map.get("@type").and_then(|v| v.as_str()) == Some("JobPosting") {
                out.push(value);
                return;
            }
            if let Some(graph) = map.get("@graph") {
                collect_job_postings(graph, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_job_postings(item, out);
            }
        }
        _ => {}
    }
}

/// Listing-level fallback: pull every JSON-LD `JobPosting` on a page as a
/// full job record. Used when a configured selector matched nothing but the
/// page still carries structured postings. Entries without both a title and
/// a URL are skipped.
pub fn extract_jsonld_listing(
    html: &str,
    company_name: &str,
    company_website: &str,
) -> Vec<JobPosting> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse(r#"script[type="application/ld+json"]"#) else {
        return Vec::new();
    };

    let mut jobs = Vec::new();
    for script in document.select(&selector) {
        let raw = script.text().collect::<String>();
        let Ok(value) = serde_json::from_str::<Value>(&raw) else {
            debug!(category = "scrape", "Skipping malformed JSON-LD block");
            continue;
        };

        let mut postings = Vec::new();
        collect_job_postings(&value, &mut postings);
        for posting in postings {
            let Some(title) = posting.get("title").and_then(|v| v.as_str()) else {
                continue;
            };
            let Some(url) = posting.get("url").and_then(|v| v.as_str()) else {
                continue;
            };

            let fields = fields_from_posting(posting);
            jobs.push(JobPosting {
                title: sanitize_title(title),
                company: fields
                    .company
                    .map(|c| sanitize_company_name(&c))
                    .filter(|c| !c.is_empty())
                    .unwrap_or_else(|| sanitize_company_name(company_name)),
                company_website: company_website.to_string(),
                location: fields.location.unwrap_or_default(),
                description: fields
                    .description
                    .map(|d| sanitize_html_description(&d))
                    .unwrap_or_default(),
                url: url.to_string(),
                posted_date: fields.posted_date,
                salary: None,
            });
        }
    }
    jobs
}

fn fields_from_posting(posting: &Value) -> DetailFields {
    let company = posting
        .get("hiringOrganization")
        .and_then(|org| org.get("name"))
        .and_then(|v| v.as_str())
        .map(String::from);

    let description = posting
        .get("description")
        .and_then(|v| v.as_str())
        .map(String::from);

    let location = posting.get("jobLocation").and_then(extract_location);

    let posted_date = posting
        .get("datePosted")
        .and_then(|v| v.as_str())
        .map(String::from);

    DetailFields {
        company,
        description,
        location,
        posted_date,
    }
}

fn extract_location(job_location: &Value) -> Option<String> {
    // jobLocation may be a Place or an array of Places.
    let place = match job_location {
        Value::Array(items) => items.first()?,
        other => other,
    };
    let address = place.get("address")?;

    let parts: Vec<&str> = ["addressLocality", "addressRegion", "addressCountry"]
        .iter()
        .filter_map(|key| address.get(*key).and_then(|v| v.as_str()))
        .filter(|s| !s.is_empty())
        .collect();

    if parts.is_empty() {
        address.as_str().map(String::from)
    } else {
        Some(parts.join(", "))
    }
}

/// Fetch a job's detail page and fill missing fields from its JSON-LD
/// block. Fetch failures leave the job untouched; a thin row is still a
/// valid row.
pub async fn enrich_from_detail(fetcher: &HttpFetcher, job: &mut JobPosting) {
    let Ok(html) = fetcher.get_text(&job.url).await else {
        debug!(category = "scrape", url = %job.url, "Detail fetch failed, keeping listing fields");
        return;
    };

    apply_detail_html(&html, job);
}

/// Fill a job's gaps from already-fetched detail HTML.
pub fn apply_detail_html(html: &str, job: &mut JobPosting) {
    let Some(fields) = extract_jsonld_job_posting(html) else {
        return;
    };

    if job.company.is_empty() {
        if let Some(company) = fields.company {
            job.company = sanitize_company_name(&company);
        }
    }
    if job.description.is_empty() {
        if let Some(description) = fields.description {
            job.description = sanitize_html_description(&description);
        }
    }
    if job.location.is_empty() || job.location == "Unknown" {
        if let Some(location) = fields.location {
            job.location = location;
        }
    }
    if job.posted_date.is_none() {
        job.posted_date = fields.posted_date;
    }
}
