mod generic_provider;
pub mod registry;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

pub use generic_provider::{GenericProvider, ProviderError};
pub use registry::{ProviderDef, ProviderRegistry};

use crate::core::config::ProviderConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Per-call knobs. The token budget is fixed per generation step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            temperature: 0.7,
        }
    }
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn provider_id(&self) -> &str;

    fn default_model(&self) -> &str;

    // One chat-completion round trip; returns the raw assistant text.
    async fn complete(
        &self,
        model_id: &str,
        messages: &[ChatMessage],
        options: CompletionOptions,
    ) -> Result<String, ProviderError>;
}

/// Build the configured provider. `Ok(None)` means no API key is set; the
/// generation endpoints report that as a configuration error at request time.
pub fn provider_from_config(config: &ProviderConfig) -> Result<Option<Arc<dyn LlmProvider>>> {
    let Some(api_key) = config.api_key.clone() else {
        return Ok(None);
    };

    let registry = ProviderRegistry::load()?;
    let mut def = registry
        .get_provider(&config.id)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("Unknown LLM provider: {}", config.id))?;

    if let Some(url) = &config.base_url {
        def.base_url = url.clone();
    }
    if let Some(model) = &config.model {
        def.default_model = model.clone();
    }

    info!(
        "Registered LLM provider: {} ({}, model {})",
        def.name, def.base_url, def.default_model
    );
    Ok(Some(Arc::new(GenericProvider::new(def, api_key))))
}
