//! Model-backed agents used by the pipeline stages. Each agent is a narrow
//! trait so processors can be exercised with scripted implementations; the
//! real ones route through the shared inference client.

pub mod company_info;
pub mod extraction;
pub mod matcher;
pub mod prompts;
pub mod source_analysis;

pub use company_info::{AiCompanyInfoAgent, CompanyExtraction, CompanyInfoAgent};
pub use extraction::{extract_with_repair, AiExtractor, ExtractionInput, Extractor};
pub use matcher::{AiMatcher, Matcher};
pub use source_analysis::{
    validate_proposed_config, AiSourceAnalyst, SourceAnalyst, SourceClassification,
    UrlClassification,
};
