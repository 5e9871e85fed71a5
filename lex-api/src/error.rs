//! Maps [`LexError`] onto HTTP responses (§7 "User-visible behaviour").
//!
//! One error body shape for every failure, whether it comes back from
//! the unary endpoint or is serialized into an SSE `error` event — the
//! same `{kind, message}` pair either way (§6, §7).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use lex_core::{LexError, PipelineError, ProviderError};
use serde::Serialize;

/// Wire shape of every error response body (§7 taxonomy).
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
    /// Populated only for `not_found`, from the resolver's fuzzy top-k
    /// (§7 "404 with a human message and an optional suggestion array").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
}

/// Newtype so this crate can impl `IntoResponse` for a foreign error type,
/// optionally carrying resolver suggestions for the `not_found` case.
pub struct ApiError {
    pub error: LexError,
    pub suggestions: Vec<String>,
}

impl ApiError {
    pub fn new(error: LexError) -> Self {
        Self { error, suggestions: Vec::new() }
    }

    pub fn with_suggestions(error: LexError, suggestions: Vec<String>) -> Self {
        Self { error, suggestions }
    }

    fn status_code(&self) -> StatusCode {
        match &self.error {
            LexError::NotFound => StatusCode::NOT_FOUND,
            LexError::Pipeline(PipelineError::NoCandidate { .. }) => StatusCode::NOT_FOUND,
            LexError::Pipeline(PipelineError::ShuttingDown) => StatusCode::SERVICE_UNAVAILABLE,
            LexError::Pipeline(PipelineError::UpstreamUnavailable) => StatusCode::BAD_GATEWAY,
            LexError::UpstreamUnavailable => StatusCode::BAD_GATEWAY,
            LexError::Provider(ProviderError::RateLimited { .. }) => StatusCode::TOO_MANY_REQUESTS,
            LexError::Provider(_) => StatusCode::BAD_GATEWAY,
            LexError::Llm(lex_core::LlmError::RateLimited { .. }) => StatusCode::TOO_MANY_REQUESTS,
            LexError::Llm(_) => StatusCode::BAD_GATEWAY,
            LexError::Synthesis(_) => StatusCode::BAD_GATEWAY,
            LexError::Timeout(_) | LexError::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
            LexError::Cancelled => StatusCode::from_u16(499).unwrap_or(StatusCode::BAD_REQUEST),
            LexError::Cache(_) | LexError::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            LexError::Resolver(_) | LexError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<LexError> for ApiError {
    fn from(error: LexError) -> Self {
        ApiError::new(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            kind: self.error.kind().to_string(),
            message: self.error.to_string(),
            suggestions: if self.suggestions.is_empty() { None } else { Some(self.suggestions) },
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
