//! Stage B: the strike engine. Runs after the pre-filter passes. Hard
//! rejections short-circuit; optional rules accumulate points and the sum
//! is compared against the threshold.

use chrono::Utc;

use jobradar_common::JobPosting;

use crate::outcome::FilterOutcome;
use crate::policy::{StrikePolicy, TechnologyRanks};
use crate::prefilter::{infer_arrangement, location_allowed, Arrangement};
use crate::text::{age_days, contains_ci, contains_word, parse_posted_date, parse_salary_range};

pub struct StrikeEngine {
    policy: StrikePolicy,
    tech_ranks: TechnologyRanks,
}

impl StrikeEngine {
    pub fn new(policy: StrikePolicy, tech_ranks: TechnologyRanks) -> Self {
        Self { policy, tech_ranks }
    }

    pub fn evaluate(&self, job: &JobPosting) -> FilterOutcome {
        let mut outcome = FilterOutcome::pass();
        if !self.policy.enabled {
            return outcome;
        }

        self.check_hard_rejections(job, &mut outcome);
        if !outcome.passed {
            return outcome;
        }

        self.accumulate_strikes(job, &mut outcome);

        if self.policy.strike_threshold > 0 && outcome.total_strikes >= self.policy.strike_threshold
        {
            outcome.passed = false;
        }
        outcome
    }

    fn check_hard_rejections(&self, job: &JobPosting, outcome: &mut FilterOutcome) {
        let hard = &self.policy.hard_rejections;
        let haystack = format!("{} {}", job.title, job.description);

        for company in &hard.excluded_companies {
            if contains_ci(&job.company, company) {
                outcome.add_hard_reject(
                    "excluded_companies",
                    "hard_rejection",
                    format!("excluded company '{company}'"),
                );
                return;
            }
        }

        for seniority in &hard.excluded_seniority {
            if contains_ci(&job.title, seniority) {
                outcome.add_hard_reject(
                    "excluded_seniority",
                    "hard_rejection",
                    format!("disallowed seniority '{seniority}'"),
                );
                return;
            }
        }

        for keyword in &hard.excluded_keywords {
            if contains_ci(&haystack, keyword) {
                outcome.add_hard_reject(
                    "excluded_keywords",
                    "hard_rejection",
                    format!("excluded keyword '{keyword}'"),
                );
                return;
            }
        }

        if !hard.required_title_keywords.is_empty()
            && !hard
                .required_title_keywords
                .iter()
                .any(|k| contains_ci(&job.title, k))
        {
            outcome.add_hard_reject(
                "required_title_keywords",
                "hard_rejection",
                format!("title '{}' matches no required keyword", job.title),
            );
            return;
        }

        // Remote policy, applied here with the engine's own settings so the
        // check fires regardless of what the pre-filter was configured with.
        let remote = &self.policy.remote_policy;
        match infer_arrangement(job) {
            Arrangement::Remote if !remote.allow_remote => {
                outcome.add_hard_reject("remote_policy", "hard_rejection", "remote not allowed");
                return;
            }
            Arrangement::Hybrid => {
                let allowed = remote.allow_hybrid
                    && location_allowed(&job.location, &remote.allowed_hybrid_locations);
                if !allowed {
                    outcome.add_hard_reject(
                        "remote_policy",
                        "hard_rejection",
                        format!("hybrid in '{}' not allowed", job.location),
                    );
                    return;
                }
            }
            Arrangement::Onsite => {
                let allowed = remote.allow_onsite
                    && location_allowed(&job.location, &remote.allowed_onsite_locations);
                if !allowed {
                    outcome.add_hard_reject(
                        "remote_policy",
                        "hard_rejection",
                        format!("onsite in '{}' not allowed", job.location),
                    );
                    return;
                }
            }
            _ => {}
        }

        if let (Some(floor), Some(salary)) = (hard.min_salary_floor, job.salary.as_deref()) {
            if let Some((_, max)) = parse_salary_range(salary) {
                if max < floor {
                    outcome.add_hard_reject(
                        "salary_floor",
                        "hard_rejection",
                        format!("salary max {max} below floor {floor}"),
                    );
                    return;
                }
            }
        }

        if hard.reject_commission_only && contains_ci(&job.description, "commission only") {
            outcome.add_hard_reject(
                "commission_only",
                "hard_rejection",
                "commission-only compensation",
            );
            return;
        }

        // Age hard-reject boundary.
        if self.policy.age_strike.enabled && self.policy.age_strike.reject_days > 0 {
            if let Some(posted) = job.posted_date.as_deref().and_then(parse_posted_date) {
                let age = age_days(posted, Utc::now());
                if age > self.policy.age_strike.reject_days as i64 {
                    outcome.add_hard_reject(
                        "age",
                        "hard_rejection",
                        format!("posted {age} days ago (reject after {})", self.policy.age_strike.reject_days),
                    );
                    return;
                }
            }
        }

        // Technology ranked "fail".
        for (tech, rank) in &self.tech_ranks.technologies {
            if rank.rank == "fail" && contains_word(&haystack, tech) {
                outcome.add_hard_reject(
                    "technology",
                    "hard_rejection",
                    format!("disqualifying technology '{tech}'"),
                );
                return;
            }
        }
    }

    fn accumulate_strikes(&self, job: &JobPosting, outcome: &mut FilterOutcome) {
        let haystack = format!("{} {}", job.title, job.description);

        // Salary below the comfortable threshold.
        let salary_strike = &self.policy.salary_strike;
        if salary_strike.enabled {
            if let Some((_, max)) = job.salary.as_deref().and_then(parse_salary_range) {
                if max < salary_strike.threshold {
                    outcome.add_strike(
                        "salary",
                        "strike",
                        format!("salary max {max} below {}", salary_strike.threshold),
                        salary_strike.points,
                    );
                }
            }
        }

        // Title seniority signals.
        for (token, points) in &self.policy.seniority_strikes {
            if contains_ci(&job.title, token) {
                outcome.add_strike(
                    "seniority",
                    "strike",
                    format!("seniority signal '{token}'"),
                    *points,
                );
            }
        }

        // Description quality.
        let quality = &self.policy.quality_strikes;
        if quality.min_description_length > 0
            && !job.description.is_empty()
            && job.description.len() < quality.min_description_length
        {
            outcome.add_strike(
                "short_description",
                "strike",
                format!(
                    "description {} chars (min {})",
                    job.description.len(),
                    quality.min_description_length
                ),
                quality.short_description_points,
            );
        }
        for buzzword in &quality.buzzwords {
            if contains_ci(&haystack, buzzword) {
                outcome.add_strike(
                    "buzzword",
                    "strike",
                    format!("buzzword '{buzzword}'"),
                    quality.buzzword_points,
                );
            }
        }

        // Stale but not yet reject-old.
        let age_strike = &self.policy.age_strike;
        if age_strike.enabled {
            if let Some(posted) = job.posted_date.as_deref().and_then(parse_posted_date) {
                let age = age_days(posted, Utc::now());
                if age > age_strike.strike_days as i64 {
                    outcome.add_strike(
                        "age",
                        "strike",
                        format!("posted {age} days ago"),
                        age_strike.points,
                    );
                }
            }
        }

        // Undesired technologies.
        for (tech, rank) in &self.tech_ranks.technologies {
            if rank.rank == "strike" && contains_word(&haystack, tech) {
                outcome.add_strike(
                    "technology",
                    "strike",
                    format!("undesired technology '{tech}'"),
                    rank.points,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::Severity;
    use crate::policy::{AgeStrike, HardRejections, QualityStrikes, SalaryStrike, TechRank};
    use std::collections::HashMap;

    fn policy() -> StrikePolicy {
        StrikePolicy {
            enabled: true,
            strike_threshold: 3,
            hard_rejections: HardRejections {
                excluded_seniority: vec!["junior".into(), "intern".into()],
                excluded_companies: vec!["bad-company-inc".into()],
                excluded_keywords: vec!["clearance required".into()],
                required_title_keywords: vec!["engineer".into(), "developer".into()],
                min_salary_floor: Some(100_000),
                reject_commission_only: true,
            },
            salary_strike: SalaryStrike {
                enabled: true,
                threshold: 150_000,
                points: 2,
            },
            seniority_strikes: HashMap::from([("principal".to_string(), 1)]),
            quality_strikes: QualityStrikes {
                min_description_length: 200,
                short_description_points: 1,
                buzzwords: vec!["rockstar".into(), "ninja".into()],
                buzzword_points: 1,
            },
            age_strike: AgeStrike {
                enabled: true,
                strike_days: 1,
                reject_days: 7,
                points: 1,
            },
            ..Default::default()
        }
    }

    fn ranks() -> TechnologyRanks {
        TechnologyRanks {
            technologies: HashMap::from([
                (
                    "cobol".to_string(),
                    TechRank {
                        rank: "strike".into(),
                        weight: 1.0,
                        points: 2,
                    },
                ),
                (
                    "php".to_string(),
                    TechRank {
                        rank: "fail".into(),
                        weight: 1.0,
                        points: 0,
                    },
                ),
            ]),
        }
    }

    fn engine() -> StrikeEngine {
        StrikeEngine::new(policy(), ranks())
    }

    fn valid_job() -> JobPosting {
        JobPosting {
            title: "Senior Software Engineer".into(),
            company: "Great Tech Company".into(),
            description: "We are looking for a senior software engineer with Rust and React experience. ".repeat(5),
            location: "Remote - USA".into(),
            salary: Some("$160,000 - $180,000".into()),
            posted_date: Some(Utc::now().to_rfc3339()),
            url: "https://example.com/jobs/1".into(),
            ..Default::default()
        }
    }

    #[test]
    fn valid_job_passes_with_zero_strikes() {
        let outcome = engine().evaluate(&valid_job());
        assert!(outcome.passed, "{:?}", outcome.rejections);
        assert_eq!(outcome.total_strikes, 0);
    }

    #[test]
    fn excluded_company_short_circuits() {
        let mut job = valid_job();
        job.company = "Bad-Company-Inc Holdings".into();
        let outcome = engine().evaluate(&job);
        assert!(!outcome.passed);
        assert_eq!(outcome.rejections.len(), 1);
        assert_eq!(outcome.rejections[0].severity, Severity::HardReject);
    }

    #[test]
    fn excluded_seniority_rejects() {
        let mut job = valid_job();
        job.title = "Junior Software Engineer".into();
        assert!(!engine().evaluate(&job).passed);
    }

    #[test]
    fn onsite_rejected_by_engine_remote_policy() {
        // The engine's own remote policy fires without any pre-filter run.
        let mut job = valid_job();
        job.location = "New York, NY".into();
        let outcome = engine().evaluate(&job);
        assert!(!outcome.passed);
        assert_eq!(outcome.rejections.len(), 1);
        assert_eq!(outcome.rejections[0].filter_name, "remote_policy");
        assert_eq!(outcome.rejections[0].severity, Severity::HardReject);
    }

    #[test]
    fn hybrid_allowed_only_in_listed_locations() {
        let mut p = policy();
        p.remote_policy = crate::policy::RemotePolicy {
            allow_remote: true,
            allow_hybrid: true,
            allow_onsite: false,
            allowed_hybrid_locations: vec!["portland".into()],
            allowed_onsite_locations: vec![],
        };
        let engine = StrikeEngine::new(p, ranks());

        let mut job = valid_job();
        job.location = "Hybrid - Portland, OR".into();
        assert!(engine.evaluate(&job).passed);

        let mut job = valid_job();
        job.location = "Hybrid - Austin, TX".into();
        let outcome = engine.evaluate(&job);
        assert!(!outcome.passed);
        assert_eq!(outcome.rejections[0].filter_name, "remote_policy");
    }

    #[test]
    fn salary_below_floor_hard_rejects() {
        let mut job = valid_job();
        job.salary = Some("$80,000".into());
        let outcome = engine().evaluate(&job);
        assert!(!outcome.passed);
        assert_eq!(outcome.rejections[0].filter_name, "salary_floor");
    }

    #[test]
    fn missing_salary_passes_both_salary_rules() {
        let mut job = valid_job();
        job.salary = None;
        let outcome = engine().evaluate(&job);
        assert!(outcome.passed);
        assert_eq!(outcome.total_strikes, 0);
    }

    #[test]
    fn strikes_accumulate_and_threshold_is_exact() {
        // Salary below strike threshold (2 points) + buzzword (1 point) = 3.
        let mut job = valid_job();
        job.salary = Some("$120,000 - $140,000".into());
        job.description = format!("{} We want a rockstar.", job.description);

        let outcome = engine().evaluate(&job);
        assert_eq!(outcome.total_strikes, 3);
        assert!(!outcome.passed);

        // One point less passes.
        let mut job = valid_job();
        job.salary = Some("$120,000 - $140,000".into());
        let outcome = engine().evaluate(&job);
        assert_eq!(outcome.total_strikes, 2);
        assert!(outcome.passed);
    }

    #[test]
    fn old_posting_hard_rejects_past_reject_days() {
        let mut job = valid_job();
        job.posted_date = Some((Utc::now() - chrono::Duration::days(10)).to_rfc3339());
        let outcome = engine().evaluate(&job);
        assert!(!outcome.passed);
        assert_eq!(outcome.rejections[0].filter_name, "age");
    }

    #[test]
    fn stale_posting_strikes_between_thresholds() {
        let mut job = valid_job();
        job.posted_date = Some((Utc::now() - chrono::Duration::days(3)).to_rfc3339());
        let outcome = engine().evaluate(&job);
        assert!(outcome.passed);
        assert_eq!(outcome.total_strikes, 1);
    }

    #[test]
    fn fail_ranked_technology_hard_rejects() {
        let mut job = valid_job();
        job.description = format!("{} Our stack is PHP.", job.description);
        let outcome = engine().evaluate(&job);
        assert!(!outcome.passed);
        assert_eq!(outcome.rejections[0].filter_name, "technology");
    }

    #[test]
    fn strike_ranked_technology_adds_points() {
        let mut job = valid_job();
        job.description = format!("{} Some COBOL maintenance.", job.description);
        let outcome = engine().evaluate(&job);
        assert!(outcome.passed);
        assert_eq!(outcome.total_strikes, 2);
    }

    #[test]
    fn disabled_engine_passes_everything() {
        let mut p = policy();
        p.enabled = false;
        let engine = StrikeEngine::new(p, ranks());
        let mut job = valid_job();
        job.company = "bad-company-inc".into();
        assert!(engine.evaluate(&job).passed);
    }
}
