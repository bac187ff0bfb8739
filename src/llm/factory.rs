use anyhow::{bail, Result};

use super::client::{LlmClient, MockLlmClient};
use super::client_impl::{AnthropicClient, GeminiClient, OpenAIClient};
use crate::config::Config;

/// Create the provider backend selected by `llm.provider`.
///
/// A missing API key is not an error here: the backend reports it as a
/// configuration error on the first call, before anything goes on the wire.
pub fn create_client(config: &Config, dry_run: bool) -> Result<Box<dyn LlmClient>> {
    if dry_run || config.llm.provider == "mock" {
        return Ok(Box::new(MockLlmClient::new()));
    }

    let llm = &config.llm;
    let api_key = config.get_api_key();
    let max_tokens = llm.get_max_tokens();

    match llm.provider.as_str() {
        "gemini" => {
            let mut client =
                GeminiClient::new(api_key, llm.model.clone(), max_tokens, llm.timeout_secs)?
                    .with_temperature(llm.temperature);
            if let Some(base_url) = &llm.base_url {
                client = client.with_base_url(base_url.clone());
            }
            Ok(Box::new(client))
        }

        "anthropic" => {
            let mut client =
                AnthropicClient::new(api_key, llm.model.clone(), max_tokens, llm.timeout_secs)?
                    .with_temperature(llm.temperature);
            if let Some(base_url) = &llm.base_url {
                client = client.with_base_url(base_url.clone());
            }
            Ok(Box::new(client))
        }

        "openai" => {
            let client = match &llm.base_url {
                Some(base_url) => OpenAIClient::with_base_url(
                    api_key,
                    llm.model.clone(),
                    base_url.clone(),
                    max_tokens,
                    llm.timeout_secs,
                )?,
                None => OpenAIClient::new(api_key, llm.model.clone(), max_tokens, llm.timeout_secs)?,
            };
            Ok(Box::new(client.with_temperature(llm.temperature)))
        }

        "openai-compatible" => {
            let base_url = llm
                .base_url
                .clone()
                .unwrap_or_else(|| "http://localhost:11434/v1".to_string());

            Ok(Box::new(
                OpenAIClient::with_base_url(
                    api_key,
                    llm.model.clone(),
                    base_url,
                    max_tokens,
                    llm.timeout_secs,
                )?
                .with_temperature(llm.temperature)
                .without_required_key(),
            ))
        }

        unknown => bail!("Unknown LLM provider: {}", unknown),
    }
}
