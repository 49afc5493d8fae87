//! Stage A: fast schema-based rejection before any model call. Every check
//! is skipped when the data it needs is absent; missing data passes.

use chrono::Utc;

use jobradar_common::JobPosting;

use crate::outcome::FilterOutcome;
use crate::policy::PrefilterPolicy;
use crate::text::{age_days, contains_ci, contains_word, parse_posted_date, parse_salary_range};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Arrangement {
    Remote,
    Hybrid,
    Onsite,
    Unknown,
}

/// Infer the work arrangement from the location and description text.
/// Shared with the strike engine, which applies its own remote policy.
pub(crate) fn infer_arrangement(job: &JobPosting) -> Arrangement {
    let location = job.location.to_lowercase();
    let description = job.description.to_lowercase();

    if location.contains("remote") || description.contains("fully remote") {
        return Arrangement::Remote;
    }
    if location.contains("hybrid") || description.contains("hybrid") {
        return Arrangement::Hybrid;
    }
    if location.trim().is_empty() || location == "unknown" {
        return Arrangement::Unknown;
    }
    Arrangement::Onsite
}

/// Cheap title gate reused by the scrape runner before intake.
pub fn title_allowed(title: &str, policy: &PrefilterPolicy) -> bool {
    if !policy.required_title_keywords.is_empty()
        && !policy
            .required_title_keywords
            .iter()
            .any(|k| contains_ci(title, k))
    {
        return false;
    }
    !policy
        .excluded_title_keywords
        .iter()
        .any(|k| contains_ci(title, k))
}

/// Run every Stage A check against a scraped job record.
pub fn prefilter(job: &JobPosting, policy: &PrefilterPolicy) -> FilterOutcome {
    let mut outcome = FilterOutcome::pass();

    // Title keywords.
    if !policy.required_title_keywords.is_empty()
        && !policy
            .required_title_keywords
            .iter()
            .any(|k| contains_ci(&job.title, k))
    {
        outcome.add_hard_reject(
            "title_keywords",
            "prefilter",
            format!("title '{}' matches no required keyword", job.title),
        );
    }
    for keyword in &policy.excluded_title_keywords {
        if contains_ci(&job.title, keyword) {
            outcome.add_hard_reject(
                "title_keywords",
                "prefilter",
                format!("excluded title keyword '{keyword}'"),
            );
        }
    }

    // Freshness. maxAgeDays = 0 disables the check entirely.
    if policy.max_age_days > 0 {
        if let Some(posted) = job.posted_date.as_deref().and_then(parse_posted_date) {
            let age = age_days(posted, Utc::now());
            if age > policy.max_age_days as i64 {
                outcome.add_hard_reject(
                    "freshness",
                    "prefilter",
                    format!("posted {age} days ago (max {})", policy.max_age_days),
                );
            }
        }
    }

    // Work arrangement.
    match infer_arrangement(job) {
        Arrangement::Remote if !policy.remote_policy.allow_remote => {
            outcome.add_hard_reject("work_arrangement", "prefilter", "remote not allowed");
        }
        Arrangement::Hybrid => {
            let allowed = policy.remote_policy.allow_hybrid
                && location_allowed(&job.location, &policy.remote_policy.allowed_hybrid_locations);
            if !allowed {
                outcome.add_hard_reject(
                    "work_arrangement",
                    "prefilter",
                    format!("hybrid in '{}' not allowed", job.location),
                );
            }
        }
        Arrangement::Onsite => {
            let allowed = policy.remote_policy.allow_onsite
                && location_allowed(&job.location, &policy.remote_policy.allowed_onsite_locations);
            if !allowed {
                outcome.add_hard_reject(
                    "work_arrangement",
                    "prefilter",
                    format!("onsite in '{}' not allowed", job.location),
                );
            }
        }
        _ => {}
    }

    // Employment type, from explicit wording only.
    let text = format!("{} {}", job.title.to_lowercase(), job.description.to_lowercase());
    if !policy.employment.allow_full_time
        && (text.contains("full-time") || text.contains("full time"))
    {
        outcome.add_hard_reject("employment_type", "prefilter", "full-time not allowed");
    }
    if !policy.employment.allow_part_time && text.contains("part-time") {
        outcome.add_hard_reject("employment_type", "prefilter", "part-time not allowed");
    }
    if !policy.employment.allow_contract
        && (contains_ci(&job.title, "contract") || text.contains("contract position"))
    {
        outcome.add_hard_reject("employment_type", "prefilter", "contract not allowed");
    }

    // Salary floor.
    if let (Some(floor), Some(salary)) = (policy.min_salary_floor, job.salary.as_deref()) {
        if let Some((_, max)) = parse_salary_range(salary) {
            if max < floor {
                outcome.add_hard_reject(
                    "salary_floor",
                    "prefilter",
                    format!("salary max {max} below floor {floor}"),
                );
            }
        }
    }

    // Rejected technologies, word-boundary matched.
    let haystack = format!("{} {}", job.title, job.description);
    for tech in &policy.rejected_tech {
        if contains_word(&haystack, tech) {
            outcome.add_hard_reject(
                "rejected_tech",
                "prefilter",
                format!("rejected technology '{tech}'"),
            );
        }
    }

    outcome
}

/// An empty allow-list means the arrangement flag alone decides.
pub(crate) fn location_allowed(location: &str, allowed: &[String]) -> bool {
    allowed.is_empty() || allowed.iter().any(|city| contains_ci(location, city))
}
