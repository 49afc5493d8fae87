pub mod anthropic;
pub mod client;
pub mod error;
pub mod openai;
pub mod provider;
pub mod types;
pub mod util;

pub use anthropic::AnthropicProvider;
pub use client::InferenceClient;
pub use error::{AiError, Result};
pub use openai::OpenAiProvider;
pub use provider::InferenceProvider;
pub use types::{Completion, CompletionRequest, TaskKind};
pub use util::extract_json_from_response;
