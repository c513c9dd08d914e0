//! Dummy LLM provider — echoes input back prefixed with `[echo]`.
//! Used for testing the full ritual round-trip without a model server.

use crate::llm::{ChatRequest, ProviderError};

#[derive(Debug, Clone)]
pub struct DummyProvider;

impl DummyProvider {
    pub async fn complete(&self, req: ChatRequest<'_>) -> Result<String, ProviderError> {
        Ok(format!("[echo] {}", req.user))
    }
}
