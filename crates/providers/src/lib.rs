//! Model endpoint clients for codewright.
//!
//! All providers implement the `codewright_core::Provider` trait.
//! [`build_from_config`] picks the endpoint named in `[llm]`.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;

use codewright_config::AppConfig;
use codewright_core::error::ProviderError;
use codewright_core::provider::Provider;
use std::sync::Arc;
use std::time::Duration;

const OPENAI_URL: &str = "https://api.openai.com/v1";
const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1";
const OLLAMA_URL: &str = "http://localhost:11434/v1";

/// Build the provider selected by configuration.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let llm = &config.llm;
    let timeout = Duration::from_secs(llm.timeout_secs);
    let api_key = config.effective_api_key().map(str::to_string);

    let (default_url, key) = match llm.provider.as_str() {
        "openai" | "openrouter" => {
            let url = if llm.provider == "openai" {
                OPENAI_URL
            } else {
                OPENROUTER_URL
            };
            let key = api_key.ok_or_else(|| {
                ProviderError::NotConfigured(format!(
                    "no API key for '{}'; set api_key in config.toml or OPENAI_API_KEY",
                    llm.provider
                ))
            })?;
            (url, key)
        }
        "ollama" => (OLLAMA_URL, api_key.unwrap_or_else(|| "ollama".into())),
        "custom" => ("", api_key.unwrap_or_default()),
        other => {
            return Err(ProviderError::NotConfigured(format!(
                "unknown provider '{other}' (expected openai, openrouter, ollama or custom)"
            )));
        }
    };

    let base_url = match llm.base_url.as_deref() {
        Some(url) => url,
        None if default_url.is_empty() => {
            return Err(ProviderError::NotConfigured(
                "custom provider requires llm.base_url".into(),
            ));
        }
        None => default_url,
    };

    tracing::debug!(provider = %llm.provider, base_url, "Building model client");

    Ok(Arc::new(OpenAiCompatProvider::with_timeout(
        llm.provider.clone(),
        base_url,
        key,
        timeout,
    )))
}
