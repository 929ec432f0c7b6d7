use std::error::Error as StdError;

use axum::{http::StatusCode, response::Response};
use thiserror::Error;

use crate::{config::LoadError, infra::error::InfraError};

/// Diagnostic payload attached to failed responses so the logging
/// middleware can emit the full error chain without leaking it to clients.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// Top-level application error. Provider errors pass through untranslated;
/// the bootstrap orchestrator never rewords what a provider reported.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("outer failure")]
    struct Outer {
        #[source]
        inner: std::io::Error,
    }

    #[test]
    fn report_collects_the_full_error_chain() {
        let error = Outer {
            inner: std::io::Error::other("inner failure"),
        };

        let report =
            ErrorReport::from_error("test::source", StatusCode::INTERNAL_SERVER_ERROR, &error);

        assert_eq!(report.source, "test::source");
        assert_eq!(report.messages.len(), 2);
        assert_eq!(report.messages[0], "outer failure");
        assert_eq!(report.messages[1], "inner failure");
    }

    #[test]
    fn provider_errors_pass_through_untranslated() {
        let infra = InfraError::database("postgres unreachable after 4 attempts");
        let app = AppError::from(infra);
        assert_eq!(
            app.to_string(),
            "database error: postgres unreachable after 4 attempts"
        );
    }
}
