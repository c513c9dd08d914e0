//! Application-wide error types.

use thiserror::Error;

use crate::llm::ProviderError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("session error: {0}")]
    Session(String),

    #[error("archive error: {0}")]
    Archive(String),

    #[error("llm error: {0}")]
    Llm(#[from] ProviderError),

    #[error("http error: {0}")]
    Http(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn config_error_display() {
        let e = AppError::Config("missing field".into());
        assert!(e.to_string().contains("missing field"));
    }

    #[test]
    fn session_error_display() {
        let e = AppError::Session("unknown session".into());
        assert!(e.to_string().contains("unknown session"));
    }

    #[test]
    fn provider_error_converts() {
        let e: AppError = ProviderError::Request("boom".into()).into();
        assert!(e.to_string().contains("boom"));
    }

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let e: AppError = io_err.into();
        assert!(e.to_string().contains("io error"));
        let _: &dyn Error = &e;
    }
}
