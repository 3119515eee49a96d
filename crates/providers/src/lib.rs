//! Inference backend clients for Parlance.
//!
//! The gateway talks to exactly one backend at a time, selected from
//! configuration. `openai_compat` covers the vast majority of hosted and
//! local endpoints; `scripted` is a deterministic in-process provider used
//! by tests.

pub mod openai_compat;
pub mod scripted;

pub use openai_compat::OpenAiCompatProvider;
pub use scripted::ScriptedProvider;

use parlance_config::AppConfig;
use parlance_core::error::ProviderError;
use parlance_core::provider::Provider;
use std::sync::Arc;

/// Build the configured provider.
///
/// Fails with `NotConfigured` when no API key is available — the gateway
/// surfaces that as a configuration fault with a remediation hint.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let api_key = config
        .api_key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or_else(|| {
            ProviderError::NotConfigured(
                "No API key configured — set PARLANCE_API_KEY or add api_key to config.toml"
                    .into(),
            )
        })?;

    Ok(Arc::new(OpenAiCompatProvider::new(
        "openai",
        &config.api_url,
        api_key,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_fails_without_api_key() {
        let config = AppConfig::default();
        let err = build_from_config(&config).err().unwrap();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
        assert!(err.to_string().contains("PARLANCE_API_KEY"));
    }

    #[test]
    fn build_rejects_blank_api_key() {
        let config = AppConfig {
            api_key: Some("  ".into()),
            ..AppConfig::default()
        };
        assert!(build_from_config(&config).is_err());
    }

    #[test]
    fn build_succeeds_with_api_key() {
        let config = AppConfig {
            api_key: Some("sk-test".into()),
            ..AppConfig::default()
        };
        let provider = build_from_config(&config).unwrap();
        assert_eq!(provider.name(), "openai");
    }
}
