use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{AiError, Result};
use crate::provider::InferenceProvider;
use crate::types::{Completion, CompletionRequest, TaskKind};

/// Routes completion requests to a per-task fallback chain of providers.
/// The first provider that succeeds wins; failures are logged and the next
/// provider in the chain is tried.
#[derive(Clone, Default)]
pub struct InferenceClient {
    chains: HashMap<TaskKind, Vec<Arc<dyn InferenceProvider>>>,
}

impl InferenceClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a provider to the chain for one task kind.
    pub fn with_provider(mut self, task: TaskKind, provider: Arc<dyn InferenceProvider>) -> Self {
        self.chains.entry(task).or_default().push(provider);
        self
    }

    /// Use the same chain for every task kind.
    pub fn with_default_chain(mut self, providers: Vec<Arc<dyn InferenceProvider>>) -> Self {
        for task in [
            TaskKind::Extraction,
            TaskKind::Analysis,
            TaskKind::CompanyExtraction,
            TaskKind::SourceAnalysis,
        ] {
            self.chains.entry(task).or_default().extend(providers.iter().cloned());
        }
        self
    }

    /// Replace the chain for one task kind. Used by config reload.
    pub fn set_chain(&mut self, task: TaskKind, providers: Vec<Arc<dyn InferenceProvider>>) {
        self.chains.insert(task, providers);
    }

    pub async fn execute(&self, task: TaskKind, request: &CompletionRequest) -> Result<Completion> {
        let chain = self.chains.get(&task).filter(|c| !c.is_empty()).ok_or_else(|| {
            AiError::AllProvidersFailed {
                task: task.to_string(),
                last_error: "no providers configured".to_string(),
            }
        })?;

        let mut last_error = String::new();
        for provider in chain {
            match provider.complete(request).await {
                Ok(completion) => {
                    info!(
                        category = "ai",
                        task = %task,
                        provider = provider.name(),
                        model = provider.model(),
                        chars = completion.text.len(),
                        "Completion succeeded"
                    );
                    return Ok(completion);
                }
                Err(e) => {
                    warn!(
                        category = "ai",
                        task = %task,
                        provider = provider.name(),
                        error = %e,
                        "Provider failed, trying next in chain"
                    );
                    last_error = e.to_string();
                }
            }
        }

        Err(AiError::AllProvidersFailed {
            task: task.to_string(),
            last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedProvider {
        name: &'static str,
        fail: bool,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(name: &'static str, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                fail,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl InferenceProvider for ScriptedProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        fn model(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, _request: &CompletionRequest) -> Result<Completion> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(AiError::EmptyResponse { provider: self.name })
            } else {
                Ok(Completion {
                    text: format!("{{\"from\": \"{}\"}}", self.name),
                    provider: self.name,
                    model: "scripted".to_string(),
                })
            }
        }
    }

    #[tokio::test]
    async fn falls_through_to_next_provider() {
        let first = ScriptedProvider::new("first", true);
        let second = ScriptedProvider::new("second", false);
        let client = InferenceClient::new()
            .with_provider(TaskKind::Extraction, first.clone())
            .with_provider(TaskKind::Extraction, second.clone());

        let completion = client
            .execute(TaskKind::Extraction, &CompletionRequest::new("hi"))
            .await
            .unwrap();

        assert_eq!(completion.provider, "second");
        assert_eq!(first.calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn all_failures_surface_last_error() {
        let only = ScriptedProvider::new("only", true);
        let client = InferenceClient::new().with_provider(TaskKind::Analysis, only);

        let err = client
            .execute(TaskKind::Analysis, &CompletionRequest::new("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::AllProvidersFailed { .. }));
    }

    #[tokio::test]
    async fn unconfigured_task_errors() {
        let client = InferenceClient::new();
        let err = client
            .execute(TaskKind::SourceAnalysis, &CompletionRequest::new("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::AllProvidersFailed { .. }));
    }
}
