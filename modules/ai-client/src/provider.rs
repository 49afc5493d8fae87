use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Completion, CompletionRequest};

/// A single inference backend. Implementations are stateless per call and
/// safe to share behind an `Arc`.
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    fn name(&self) -> &'static str;
    fn model(&self) -> &str;
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion>;
}
