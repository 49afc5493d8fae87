//! Deterministic score calculation. The score is computed entirely from
//! extracted data, the profile, and company attributes; the match analyser
//! never re-scores. The result is the sole gate for the analysis stage.

use jobradar_common::{Company, CompanySize, JobExtraction, Profile, Seniority, WorkArrangement};

use crate::policy::ScoringPolicy;

const BASE_SCORE: f64 = 50.0;

pub struct ScoringEngine {
    policy: ScoringPolicy,
}

impl ScoringEngine {
    pub fn new(policy: ScoringPolicy) -> Self {
        Self { policy }
    }

    pub fn score(
        &self,
        extraction: &JobExtraction,
        profile: &Profile,
        company: Option<&Company>,
    ) -> u8 {
        let mut score = BASE_SCORE;

        score += self.seniority_component(extraction, profile);
        score += self.location_component(extraction, profile);
        score += self.skill_component(extraction, profile);
        score += self.salary_component(extraction, profile);
        score += self.experience_component(extraction, profile);
        score += self.freshness_component(extraction);
        score += self.role_fit_component(extraction);
        if let Some(company) = company {
            score += self.company_component(company);
        }

        score.round().clamp(0.0, 100.0) as u8
    }

    /// Expected seniority band for the profile's years of experience.
    fn expected_seniority(years: u32) -> &'static [Seniority] {
        match years {
            0..=2 => &[Seniority::Junior, Seniority::Mid],
            3..=5 => &[Seniority::Mid, Seniority::Senior],
            6..=9 => &[Seniority::Senior, Seniority::Staff, Seniority::Lead],
            _ => &[
                Seniority::Senior,
                Seniority::Staff,
                Seniority::Lead,
                Seniority::Principal,
            ],
        }
    }

    fn seniority_component(&self, extraction: &JobExtraction, profile: &Profile) -> f64 {
        if extraction.seniority == Seniority::Unknown {
            return 0.0;
        }
        if Self::expected_seniority(profile.years_experience).contains(&extraction.seniority) {
            10.0
        } else {
            -10.0
        }
    }

    fn location_component(&self, extraction: &JobExtraction, profile: &Profile) -> f64 {
        let mut component = 0.0;

        match extraction.work_arrangement {
            WorkArrangement::Remote => component += 10.0,
            WorkArrangement::Onsite => component -= 10.0,
            _ => {}
        }

        // Timezone distance costs beyond the free allowance, unless the
        // posting is explicitly timezone-flexible.
        if let Some(job_tz) = extraction.timezone {
            if !extraction.timezone_flexible {
                let diff = (job_tz - profile.timezone).abs();
                let over = (diff - self.policy.timezone_free_hours).max(0.0);
                component -= over * self.policy.timezone_penalty_per_hour;
            }
        }

        if let (Some(city), Some(preferred)) = (&extraction.city, &profile.preferred_city) {
            if city.to_lowercase().contains(&preferred.to_lowercase()) {
                component += self.policy.preferred_city_bonus as f64;
            }
        }

        if extraction.relocation_required {
            component -= 15.0;
        }
        component
    }

    fn skill_component(&self, extraction: &JobExtraction, profile: &Profile) -> f64 {
        if extraction.technologies.is_empty() {
            return 0.0;
        }
        let matched = extraction
            .technologies
            .iter()
            .filter(|t| profile.has_skill(t))
            .count();
        15.0 * matched as f64 / extraction.technologies.len() as f64
    }

    fn salary_component(&self, extraction: &JobExtraction, profile: &Profile) -> f64 {
        let (Some(target), Some(max)) = (profile.target_salary, extraction.salary_max) else {
            return 0.0;
        };
        let target = target as f64;
        let max = max as f64;
        if max >= target {
            10.0
        } else if max < target * 0.8 {
            -10.0
        } else {
            0.0
        }
    }

    fn experience_component(&self, extraction: &JobExtraction, profile: &Profile) -> f64 {
        let years = profile.years_experience;
        match (extraction.experience_min, extraction.experience_max) {
            (Some(min), _) if years < min => -10.0,
            (Some(min), Some(max)) if years >= min && years <= max => 5.0,
            (Some(_), None) => 5.0,
            _ => 0.0,
        }
    }

    fn freshness_component(&self, extraction: &JobExtraction) -> f64 {
        let mut component = 0.0;
        if let Some(days) = extraction.days_old {
            if days <= 7 {
                component += 5.0;
            } else if days > 30 {
                component -= 5.0;
            }
        }
        if extraction.is_repost {
            component -= 3.0;
        }
        component
    }

    fn role_fit_component(&self, extraction: &JobExtraction) -> f64 {
        let mut component = 0.0;
        if extraction
            .role_types
            .iter()
            .any(|r| self.policy.preferred_roles.contains(r))
        {
            component += 8.0;
        }
        if extraction
            .role_types
            .iter()
            .any(|r| self.policy.disliked_roles.contains(r))
        {
            component -= 8.0;
        }
        component
    }

    fn company_component(&self, company: &Company) -> f64 {
        let mut component = 0.0;
        if company.has_portland_office {
            component += self.policy.portland_office_bonus as f64;
        }
        let ml_focused = company
            .tech_stack
            .iter()
            .any(|t| matches!(t.to_lowercase().as_str(), "pytorch" | "tensorflow" | "ml" | "machine learning"));
        if ml_focused {
            component += 4.0;
        }
        if self.policy.prefer_large_companies {
            match company.size {
                Some(CompanySize::Large) | Some(CompanySize::Enterprise) => component += 4.0,
                Some(CompanySize::Startup) => component -= 4.0,
                _ => {}
            }
        }
        component
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> Profile {
        Profile {
            name: "Test User".into(),
            skills: vec!["rust".into(), "postgres".into(), "react".into()],
            years_experience: 8,
            timezone: -8.0,
            target_salary: Some(160_000),
            preferred_city: Some("Portland".into()),
            ..Default::default()
        }
    }

    fn engine() -> ScoringEngine {
        ScoringEngine::new(ScoringPolicy::default())
    }

    fn strong_extraction() -> JobExtraction {
        JobExtraction {
            seniority: Seniority::Senior,
            work_arrangement: WorkArrangement::Remote,
            timezone: Some(-8.0),
            salary_max: Some(180_000),
            experience_min: Some(5),
            experience_max: Some(10),
            technologies: vec!["rust".into(), "postgres".into()],
            days_old: Some(2),
            ..Default::default()
        }
    }

    #[test]
    fn strong_match_scores_high() {
        let score = engine().score(&strong_extraction(), &profile(), None);
        assert!(score >= 85, "expected high score, got {score}");
    }

    #[test]
    fn weak_match_scores_low() {
        let extraction = JobExtraction {
            seniority: Seniority::Junior,
            work_arrangement: WorkArrangement::Onsite,
            salary_max: Some(90_000),
            experience_min: Some(12),
            technologies: vec!["php".into(), "wordpress".into()],
            days_old: Some(45),
            relocation_required: true,
            ..Default::default()
        };
        let score = engine().score(&extraction, &profile(), None);
        assert!(score < 40, "expected low score, got {score}");
    }

    #[test]
    fn timezone_penalty_applies_beyond_free_hours() {
        let mut near = strong_extraction();
        near.timezone = Some(-6.0);
        let mut far = strong_extraction();
        far.timezone = Some(3.0);

        let near_score = engine().score(&near, &profile(), None);
        let far_score = engine().score(&far, &profile(), None);
        assert!(near_score > far_score);

        // Flexible-timezone postings skip the penalty.
        let mut flexible = far.clone();
        flexible.timezone_flexible = true;
        assert!(engine().score(&flexible, &profile(), None) > far_score);
    }

    #[test]
    fn portland_office_bonus_applies() {
        // A mid-strength extraction so the bonus is visible below the cap.
        let extraction = JobExtraction {
            salary_max: None,
            days_old: None,
            ..strong_extraction()
        };
        let mut company = Company::new("Acme");
        company.has_portland_office = true;
        let with = engine().score(&extraction, &profile(), Some(&company));
        let without = engine().score(&extraction, &profile(), None);
        assert!(with > without, "with {with}, without {without}");
    }

    #[test]
    fn score_is_deterministic_and_bounded() {
        let extraction = strong_extraction();
        let a = engine().score(&extraction, &profile(), None);
        let b = engine().score(&extraction, &profile(), None);
        assert_eq!(a, b);
        assert!(a <= 100);
    }

    #[test]
    fn unknown_fields_contribute_nothing() {
        let score = engine().score(&JobExtraction::default(), &profile(), None);
        assert_eq!(score, 50);
    }
}
