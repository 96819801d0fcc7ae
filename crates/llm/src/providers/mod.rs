//! LLM provider implementations.

pub mod gemini;
pub mod ollama;

pub use gemini::GeminiClient;
pub use ollama::OllamaClient;

use crate::retry::MAX_SUGGESTED_DELAY;
use reqwest::StatusCode;
use std::time::Duration;
use triage_core::AppError;

/// Map a non-success HTTP response to an `AppError`.
///
/// 429 becomes `RateLimited` (carrying the `Retry-After` header when present),
/// 401 and 403 become `Auth`; everything else stays an untyped `Llm` error.
pub(crate) fn status_error(
    provider: &str,
    status: StatusCode,
    body: &str,
    retry_after: Option<Duration>,
) -> AppError {
    let message = format!("{} API error ({}): {}", provider, status, body);

    match status {
        StatusCode::TOO_MANY_REQUESTS => AppError::RateLimited {
            message,
            retry_after,
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::Auth(message),
        _ => AppError::Llm(message),
    }
}

/// Parse a `Retry-After` header expressed in whole seconds, capped at
/// [`MAX_SUGGESTED_DELAY`].
pub(crate) fn retry_after_header(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(|secs| Duration::from_secs(secs).min(MAX_SUGGESTED_DELAY))
}
