//! Prompt builders for the model-backed agents. Prompts ask for data only;
//! scoring stays deterministic and happens outside the model.

use jobradar_common::{JobPosting, Profile, SourceConfig};

use super::extraction::ExtractionInput;

pub fn extraction_system() -> String {
    "You extract structured facts from job postings. Respond with a single JSON object and \
     nothing else. Extract data only; never score or judge fit. Use null for fields the \
     posting does not state and \"unknown\" for enumerated fields you cannot determine."
        .to_string()
}

pub fn extraction_prompt(input: &ExtractionInput) -> String {
    let mut prompt = String::from(
        "Extract the following fields from this job posting as JSON with keys: \
         seniority (junior|mid|senior|staff|lead|principal|unknown), \
         workArrangement (remote|hybrid|onsite|unknown), \
         timezone (UTC offset number or null), city, \
         salaryMin, salaryMax, experienceMin, experienceMax, \
         technologies (array of lowercase strings), \
         employmentType (full-time|part-time|contract|unknown), \
         daysOld, isRepost, relocationRequired, includesEquity, isContract, \
         isManagement, isLead, roleTypes (array, e.g. [\"backend\", \"ml-ai\"]), \
         timezoneFlexible.\n\n",
    );
    prompt.push_str(&format!("Title: {}\n", input.title));
    if let Some(location) = &input.location {
        prompt.push_str(&format!("Location: {location}\n"));
    }
    if let Some(posted) = &input.posted_date {
        prompt.push_str(&format!("Posted: {posted}\n"));
    }
    if let Some(salary) = &input.salary {
        prompt.push_str(&format!("Listed salary: {salary}\n"));
    }
    if let Some(url) = &input.url {
        prompt.push_str(&format!("URL: {url}\n"));
    }
    prompt.push_str(&format!("\nDescription:\n{}\n", input.description));
    prompt
}

/// Repair prompt: re-ask only for the fields the first pass left empty.
pub fn repair_prompt(input: &ExtractionInput, missing: &[&str]) -> String {
    format!(
        "A previous extraction of this job posting left these fields empty: {}.\n\
         Re-read the posting carefully and return a JSON object with ONLY those fields, \
         using the same key names and value types as before. If the posting genuinely \
         does not state a field, return null (or \"unknown\" for enumerated fields).\n\n\
         Title: {}\n\nDescription:\n{}\n",
        missing.join(", "),
        input.title,
        input.description,
    )
}

pub fn match_system(profile: &Profile) -> String {
    format!(
        "You analyse how well a job posting fits this candidate. Respond with a single JSON \
         object with keys: matchedSkills, missingSkills (arrays of strings), experienceMatch \
         (one sentence), keyStrengths, potentialConcerns (arrays of strings), \
         customizationRecommendations (object with freeform guidance). Do NOT include a score; \
         scoring happens elsewhere.\n\nCandidate: {} - {}\nSkills: {}\nYears of experience: {}",
        profile.name,
        profile.headline,
        profile.skills.join(", "),
        profile.years_experience,
    )
}

pub fn match_prompt(job: &JobPosting, company_info: &str) -> String {
    let mut prompt = format!(
        "Job: {} at {}\nLocation: {}\n",
        job.title, job.company, job.location
    );
    if let Some(salary) = &job.salary {
        prompt.push_str(&format!("Salary: {salary}\n"));
    }
    if !company_info.is_empty() {
        prompt.push_str(&format!("\nCompany context:\n{company_info}\n"));
    }
    prompt.push_str(&format!("\nDescription:\n{}\n", job.description));
    prompt
}

pub fn company_system() -> String {
    "You extract company facts from careers/about page text. Respond with a single JSON \
     object with keys: about (2-4 sentences), culture (2-4 sentences), mission (one \
     sentence or null), techStack (array of lowercase technology names), size \
     (startup|small|medium|large|enterprise or null), hasPortlandOffice (boolean)."
        .to_string()
}

pub fn company_prompt(name: &str, page_text: &str) -> String {
    format!("Company: {name}\n\nPage text:\n{page_text}\n")
}

pub fn source_classify_system() -> String {
    "You classify a careers URL from a page sample. Respond with a single JSON object: \
     {\"kind\": \"company_site\"|\"aggregator\"|\"single_job\"|\"ats_vendor\"|\"invalid\", \
     \"reason\": string, \"aggregatorDomain\": string or null}."
        .to_string()
}

pub fn source_classify_prompt(url: &str, page_sample: &str) -> String {
    format!("URL: {url}\n\nPage sample:\n{page_sample}\n")
}

pub fn source_repair_system() -> String {
    "You repair broken scraper configurations. Given a page or API sample, the current \
     (broken) config, and operator notes, propose a working config as a single JSON object \
     tagged with \"type\": one of html, api, rss. You may change the type when the sample \
     shows a better path (for example an embedded JSON API behind an HTML page). html configs \
     need url, job_selector and fields.title/fields.url selectors (selector@attr form for \
     attributes). api configs need url, response_path and dotted fields.title/fields.url \
     paths. Return only the JSON object."
        .to_string()
}

pub fn source_repair_prompt(
    current: &SourceConfig,
    sample: &str,
    notes: Option<&str>,
) -> String {
    let current_json =
        serde_json::to_string_pretty(current).unwrap_or_else(|_| "unserializable".to_string());
    let mut prompt = format!("Current config (broken):\n{current_json}\n");
    if let Some(notes) = notes {
        prompt.push_str(&format!("\nOperator notes: {notes}\n"));
    }
    prompt.push_str(&format!("\nContent sample:\n{sample}\n"));
    prompt
}
