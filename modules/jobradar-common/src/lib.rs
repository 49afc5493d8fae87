pub mod company;
pub mod config;
pub mod extraction;
pub mod listing;
pub mod logging;
pub mod profile;
pub mod sanitize;
pub mod source;
pub mod types;
pub mod urlnorm;

pub use company::{Company, CompanySize, CompanyTier};
pub use config::Config;
pub use extraction::{EmploymentType, JobExtraction, Seniority, WorkArrangement};
pub use listing::{
    extract_role_from_title, ApplicationPriority, JobListing, JobMatch, JobPosting, MatchAnalysis,
};
pub use profile::{ExperienceEntry, Profile};
pub use sanitize::{
    sanitize_company_name, sanitize_html_description, sanitize_text, sanitize_title,
};
pub use source::{
    ApiFieldPaths, ApiSourceConfig, HtmlFieldSelectors, HtmlSourceConfig, Pagination,
    PaginationKind, RssSourceConfig, Source, SourceConfig, SourceStatus, WorkdaySourceConfig,
};
pub use types::{
    CompanyStage, JobStage, PipelineState, QueueItem, QueueItemKind, QueueStatus, ScrapeRunConfig,
};
pub use urlnorm::{extract_domain, normalize_url, same_domain};
