//! The suggestion service: one outbound completion per call, decoded into the
//! canonical result shape.

pub mod decode;
pub mod message;
pub mod worker;

use tracing::{debug, info, warn};

use crate::error::{RefineError, Result};
use crate::llm::client::{CompletionRequest, LlmClient};
use crate::llm::prompts;
use crate::model::{OptionsResult, RefinementRequest, RefinementResult};
use crate::util::preview;

pub use message::{ServiceReply, ServiceRequest};
pub use worker::{spawn_worker, ServiceHandle};

pub struct SuggestionService {
    client: Box<dyn LlmClient>,
}

impl SuggestionService {
    pub fn new(client: Box<dyn LlmClient>) -> Self {
        Self { client }
    }

    pub fn provider(&self) -> &'static str {
        self.client.provider()
    }

    /// Rewrite a raw prompt into one more specific suggestion.
    ///
    /// Fails only for an empty prompt, a missing key, or a transport failure.
    /// Reply content that does not match the expected shape is recovered.
    pub async fn refine(&self, raw_prompt: &str) -> Result<RefinementResult> {
        let request = RefinementRequest::new(raw_prompt.trim());
        if request.raw_prompt.is_empty() {
            return Err(RefineError::EmptyPrompt);
        }

        info!(
            "Refining prompt via {}: {}",
            self.provider(),
            preview(&request.raw_prompt, 60)
        );

        let completion = CompletionRequest::new(
            prompts::refine_system_instruction(),
            prompts::refine_user_message(&request.raw_prompt),
        );

        let text = match self.client.complete(&completion).await {
            Ok(text) => text,
            Err(RefineError::MalformedResponse(reason)) => {
                warn!("Provider reply had no text payload: {}", reason);
                String::new()
            }
            Err(err) => {
                warn!("Refinement failed: {}", err);
                return Err(err);
            }
        };

        let result = decode::decode_refinement(&text);
        debug!(
            "Decoded suggestion ({} options): {}",
            result.options.len(),
            preview(&result.suggestion, 80)
        );
        Ok(result)
    }

    /// Ask for short phrases that can be appended to the raw prompt.
    pub async fn refine_options(&self, raw_prompt: &str) -> Result<OptionsResult> {
        let raw_prompt = raw_prompt.trim();
        if raw_prompt.is_empty() {
            return Err(RefineError::EmptyPrompt);
        }

        debug!("Requesting options via {}", self.provider());

        let completion = CompletionRequest::new(
            prompts::options_system_instruction(),
            prompts::options_user_message(raw_prompt),
        );

        match self.client.complete(&completion).await {
            Ok(text) => Ok(decode::decode_options(&text)),
            Err(RefineError::MalformedResponse(reason)) => {
                warn!("Provider reply had no text payload: {}", reason);
                Ok(OptionsResult::default())
            }
            Err(err) => {
                warn!("Options request failed: {}", err);
                Err(err)
            }
        }
    }
}
