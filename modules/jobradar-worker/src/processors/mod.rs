pub mod company;
pub mod job;
pub mod source;

pub use company::CompanyProcessor;
pub use job::{unwrap_job_data, JobProcessor, MAX_COMPANY_WAITS};
pub use source::SourceProcessor;
