use async_trait::async_trait;

use crate::error::Result;

/// One non-streaming completion: a system instruction plus a single user turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

/// A provider backend. Implementations translate the request into their own
/// wire format and return the reply text untouched; decoding happens in the
/// service.
#[async_trait]
pub trait LlmClient: Send + Sync {
    fn provider(&self) -> &'static str;

    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

pub struct MockLlmClient;

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn provider(&self) -> &'static str {
        "mock"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        // Options template asks for exactly two additive phrases
        if request.system.contains("implementation options") {
            Ok(r#"{
  "options": [
    "with 0.5s staggered fade-in animation for each card",
    "displaying 3 cards per row with 24px gap between items"
  ]
}"#
            .to_string())
        } else {
            Ok(r#"{
  "suggestion": "Create a clean card grid layout with consistent spacing and rounded corners. Add a subtle lift effect on hover so cards feel interactive, and make sure the grid adapts to both mobile and desktop screens."
}"#
            .to_string())
        }
    }
}
