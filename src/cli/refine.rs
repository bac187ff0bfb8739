use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::llm::factory;
use crate::service::worker::handle_request;
use crate::service::{ServiceReply, ServiceRequest, SuggestionService};

/// Run one refinement and return the reply message as pretty JSON.
pub async fn run(
    prompt: String,
    options: bool,
    config_path: Option<String>,
    provider_override: Option<String>,
    model_override: Option<String>,
    dry_run: bool,
) -> Result<String> {
    if let Some(ref cfg) = config_path {
        info!("Config: {}", cfg);
    }
    info!("Dry run: {}", dry_run);

    let mut config = Config::load_with_path(config_path)?;

    if let Some(ref provider) = provider_override {
        info!("CLI override: provider = {}", provider);
        config.llm.provider = provider.clone();
    }
    if let Some(ref model) = model_override {
        info!("CLI override: model = {}", model);
        config.llm.model = model.clone();
    }

    let client = factory::create_client(&config, dry_run)?;
    let service = SuggestionService::new(client);

    let request = if options {
        ServiceRequest::RefineOptions { prompt }
    } else {
        ServiceRequest::RefinePrompt { prompt }
    };

    let reply = handle_request(&service, request).await;
    if let ServiceReply::Error(ref err) = reply {
        tracing::warn!("Service replied with {:?} error", err.kind);
    }

    serde_json::to_string_pretty(&reply).context("Failed to serialize reply")
}
