use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};

use crew_core::api::{
    AppConfig, ContextSource, CritiqueService, GenerationService, OutputRendererPlugin,
    RetryConfig, RetryStrategyPlugin, Role,
};

use crate::context::FileContextSource;
use crate::executor::{
    ExponentialBackoffPlugin, JsonlRendererPlugin, LinearRetryPlugin, TextRendererPlugin,
};
use crate::service::{
    ChatClient, MockCritiqueService, MockGenerationService, OpenAiCritiqueService,
    OpenAiGenerationService,
};

pub fn build_generation(cfg: &AppConfig) -> Result<Arc<dyn GenerationService>> {
    let g = &cfg.generation;
    if g.api_key.trim().is_empty() {
        bail!("no API key for generation: set OPENAI_API_KEY or [generation].api_key");
    }
    let client = ChatClient::new(&g.base_url, g.api_key.clone(), g.model.clone(), g.timeout_ms)?;
    Ok(Arc::new(OpenAiGenerationService::new(client, g.temperature)))
}

pub fn build_critique(cfg: &AppConfig) -> Result<Arc<dyn CritiqueService>> {
    let c = &cfg.critique;
    if c.api_key.trim().is_empty() {
        bail!("no API key for critique: set OPENAI_API_KEY or [critique].api_key");
    }
    let client = ChatClient::new(&c.base_url, c.api_key.clone(), c.model.clone(), c.timeout_ms)?;
    Ok(Arc::new(OpenAiCritiqueService::new(client)))
}

/// Offline pair used by `--mock`. The manager sends the quantitative
/// analyst back once so a demo run shows a full revision cycle.
pub fn build_mock_services(
    latency: Option<Duration>,
) -> (Arc<dyn GenerationService>, Arc<dyn CritiqueService>) {
    let mut generator = MockGenerationService::new();
    if let Some(latency) = latency {
        generator = generator.with_latency(latency);
    }
    let critic = MockCritiqueService::new().reject_first_attempt(Role::Quant);
    (Arc::new(generator), Arc::new(critic))
}

pub fn build_retry_strategy(cfg: &RetryConfig) -> Arc<dyn RetryStrategyPlugin> {
    match cfg.strategy.as_str() {
        "linear" => Arc::new(LinearRetryPlugin::new(cfg.clone())),
        // Anything else falls back to exponential backoff.
        _ => Arc::new(ExponentialBackoffPlugin::new(cfg.clone())),
    }
}

pub fn build_renderer(cfg: &AppConfig) -> Arc<dyn OutputRendererPlugin> {
    match cfg.output.format.as_str() {
        "jsonl" => Arc::new(JsonlRendererPlugin::new(cfg.output.pretty_print)),
        _ => Arc::new(TextRendererPlugin::new(cfg.output.ascii_only)),
    }
}

pub fn build_context_source(cfg: &AppConfig) -> Option<Arc<dyn ContextSource>> {
    cfg.context
        .directory
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(|d| Arc::new(FileContextSource::new(d)) as Arc<dyn ContextSource>)
}
