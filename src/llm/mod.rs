//! LLM provider abstraction.
//!
//! `LlmProvider` is an enum over concrete provider implementations.
//! Add a new variant + module in `providers/` for each additional backend.
//!
//! Provider instances are shared immutable capabilities — clone them freely.
//! Async is delegated to the underlying provider; the `complete` method is
//! `async fn` on the enum so callers need no trait-object machinery.

pub mod providers;

use thiserror::Error;

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("provider request failed: {0}")]
    Request(String),
}

// ── Requests ──────────────────────────────────────────────────────────────────

/// A single completion request: system persona, user content, and the
/// sampling temperature for this call.
///
/// The ritual uses a different temperature per utterance kind (reflection,
/// close sentence, transition, artifact), so temperature travels with the
/// request instead of living in provider config.
#[derive(Debug, Clone)]
pub struct ChatRequest<'a> {
    pub system: &'a str,
    pub user: &'a str,
    pub temperature: f32,
}

// ── Provider enum ─────────────────────────────────────────────────────────────

/// All available provider backends.
///
/// Enum dispatch avoids `dyn` trait objects and the `async-trait` dependency.
/// Adding a backend = new module + new variant + new `complete` arm.
#[derive(Debug, Clone)]
pub enum LlmProvider {
    Dummy(providers::dummy::DummyProvider),
    OpenAiCompatible(providers::openai_compatible::OpenAiCompatibleProvider),
}

impl LlmProvider {
    /// Send one chat round-trip and return the provider's text reply,
    /// trimmed. History is the caller's concern — the ritual rebuilds its
    /// context bundle for every call.
    pub async fn complete(&self, req: ChatRequest<'_>) -> Result<String, ProviderError> {
        match self {
            LlmProvider::Dummy(p) => p.complete(req).await,
            LlmProvider::OpenAiCompatible(p) => p.complete(req).await,
        }
    }
}

/// Build the provider named by `config.llm.default`.
pub fn build(
    config: &crate::config::LlmConfig,
    api_key: Option<String>,
) -> Result<LlmProvider, ProviderError> {
    match config.provider.as_str() {
        "dummy" => Ok(LlmProvider::Dummy(providers::dummy::DummyProvider)),
        "openai" => Ok(LlmProvider::OpenAiCompatible(
            providers::openai_compatible::OpenAiCompatibleProvider::new(
                config.openai.api_base_url.clone(),
                config.openai.model.clone(),
                config.openai.timeout_seconds,
                api_key,
            )?,
        )),
        other => Err(ProviderError::UnknownProvider(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LlmConfig, OpenAiConfig};

    fn llm_config(provider: &str) -> LlmConfig {
        LlmConfig {
            provider: provider.into(),
            openai: OpenAiConfig {
                api_base_url: "http://localhost:0/v1/chat/completions".into(),
                model: "test-model".into(),
                timeout_seconds: 1,
            },
        }
    }

    #[test]
    fn build_dummy() {
        assert!(matches!(build(&llm_config("dummy"), None), Ok(LlmProvider::Dummy(_))));
    }

    #[test]
    fn build_openai() {
        assert!(matches!(
            build(&llm_config("openai"), Some("key".into())),
            Ok(LlmProvider::OpenAiCompatible(_))
        ));
    }

    #[test]
    fn build_unknown_errors() {
        let err = build(&llm_config("quantum"), None).unwrap_err();
        assert!(err.to_string().contains("quantum"));
    }
}
