//! Bounded retry with backoff for upstream LLM calls.
//!
//! A call runs through an explicit state machine:
//!
//! ```text
//! Attempting ──ok──────────────────────────────▶ Succeeded
//!     │ err, rate limited, retries left
//!     ▼
//! BackingOff ──slept──▶ Attempting (attempt + 1)
//!     │ cancelled
//!     ▼
//! Cancelled
//! Attempting ──err, not retryable or no retries left──▶ Exhausted
//! ```
//!
//! The `BackingOff` sleep goes through the [`Sleeper`] trait, so tests can
//! record delays instead of waiting and callers can cancel mid-sleep.
//!
//! Failure classification is pluggable via [`FailureClassifier`]. The default
//! classifier trusts typed `AppError::RateLimited` / `AppError::Auth` first and
//! falls back to matching markers in the error text when the upstream error is
//! untyped. The text fallback is best-effort: a provider that rewords its
//! quota message will be classified as a generic failure.

use regex::Regex;
use std::future::Future;
use std::sync::LazyLock;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use triage_core::config::RetrySettings;
use triage_core::AppError;

/// Markers that identify a rate-limit or quota failure in lowercased error text.
const RATE_LIMIT_MARKERS: &[&str] = &[
    "429",
    "quota",
    "rate limit",
    "resource_exhausted",
    "too many requests",
];

/// Markers that identify a credential failure in lowercased error text.
const AUTH_MARKERS: &[&str] = &["authentication", "api key", "api_key", "unauthorized"];

static SECONDS_FIELD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)seconds:\s*(\d+)").unwrap());

/// Longest upstream-suggested delay honoured before retrying.
pub const MAX_SUGGESTED_DELAY: Duration = Duration::from_secs(3600);

static RETRY_DELAY_JSON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)"retryDelay"\s*:\s*"(\d+(?:\.\d+)?)s""#).unwrap()
});

/// Retry policy for rate-limited calls.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Additional attempts allowed after the first one
    pub max_retries: u32,

    /// Base delay for exponential backoff
    pub base_delay: Duration,

    /// Upper bound (exclusive) of the random jitter added to computed delays
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(2),
            max_jitter: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Build a policy from configuration.
    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            base_delay: Duration::try_from_secs_f64(settings.base_delay_secs)
                .unwrap_or(Self::default().base_delay),
            ..Self::default()
        }
    }

    /// Exponential part of the delay before retry number `attempt + 1`.
    ///
    /// `attempt` is zero-based: the first backoff is `base_delay`.
    pub fn exponential_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(16);
        self.base_delay.saturating_mul(factor)
    }

    /// Delay to wait before the next attempt.
    ///
    /// A delay suggested by the upstream is used as-is; otherwise the
    /// exponential delay plus jitter in `[0, max_jitter)`.
    pub fn backoff_delay(&self, attempt: u32, suggested: Option<Duration>) -> Duration {
        match suggested {
            Some(delay) => delay,
            None => self.exponential_delay(attempt) + self.jitter(),
        }
    }

    fn jitter(&self) -> Duration {
        self.max_jitter.mul_f64(rand::random::<f64>())
    }
}

/// Classification of a failed upstream call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Rate limit or exhausted quota; the only retryable kind
    RateLimited { retry_after: Option<Duration> },

    /// Rejected or missing credentials
    Auth,

    /// Anything else
    Other,
}

impl FailureKind {
    /// Whether a failure of this kind may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FailureKind::RateLimited { .. })
    }

    /// Delay suggested by the upstream, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            FailureKind::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Decides how a failed call should be treated.
pub trait FailureClassifier: Send + Sync {
    fn classify(&self, error: &AppError) -> FailureKind;
}

/// Typed variants first, text markers as fallback.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultFailureClassifier;

impl FailureClassifier for DefaultFailureClassifier {
    fn classify(&self, error: &AppError) -> FailureKind {
        match error {
            AppError::RateLimited {
                message,
                retry_after,
            } => FailureKind::RateLimited {
                retry_after: retry_after.or_else(|| extract_retry_delay(message)),
            },
            AppError::Auth(_) => FailureKind::Auth,
            other => classify_text(&other.to_string()),
        }
    }
}

/// Classify an untyped error by the markers in its text.
pub fn classify_text(text: &str) -> FailureKind {
    let lower = text.to_lowercase();

    if RATE_LIMIT_MARKERS.iter().any(|m| lower.contains(m)) {
        return FailureKind::RateLimited {
            retry_after: extract_retry_delay(&lower),
        };
    }

    if AUTH_MARKERS.iter().any(|m| lower.contains(m)) {
        return FailureKind::Auth;
    }

    FailureKind::Other
}

/// Extract an explicit retry delay embedded in error text.
///
/// Understands the protobuf text form (`retry_delay { seconds: 43 }`) and the
/// JSON form (`"retryDelay": "43s"`).
pub fn extract_retry_delay(text: &str) -> Option<Duration> {
    if let Some(caps) = SECONDS_FIELD_RE.captures(text) {
        if let Ok(secs) = caps[1].parse::<u64>() {
            return Some(Duration::from_secs(secs).min(MAX_SUGGESTED_DELAY));
        }
    }

    RETRY_DELAY_JSON_RE
        .captures(text)
        .and_then(|caps| caps[1].parse::<f64>().ok())
        .and_then(suggested_delay_from_secs)
}

/// Convert an upstream delay hint in seconds, capped at [`MAX_SUGGESTED_DELAY`].
///
/// Negative and non-finite hints are dropped.
pub fn suggested_delay_from_secs(secs: f64) -> Option<Duration> {
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    Some(
        Duration::try_from_secs_f64(secs)
            .map_or(MAX_SUGGESTED_DELAY, |delay| delay.min(MAX_SUGGESTED_DELAY)),
    )
}

/// Waits out a backoff delay.
#[async_trait::async_trait]
pub trait Sleeper: Send + Sync {
    /// Sleep for `delay`. Returns `false` if `cancel` fired first.
    async fn sleep(&self, delay: Duration, cancel: &CancellationToken) -> bool;
}

/// Tokio timer sleep, interruptible by the cancellation token.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait::async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration, cancel: &CancellationToken) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(delay) => true,
            _ = cancel.cancelled() => false,
        }
    }
}

/// Non-terminal states of the retry machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// About to make attempt number `attempt` (zero-based)
    Attempting { attempt: u32 },

    /// Waiting `delay` after the failure of attempt number `attempt`
    BackingOff { attempt: u32, delay: Duration },
}

/// Terminal result of a retried call.
#[derive(Debug)]
pub enum RetryOutcome<T> {
    Succeeded { value: T, attempts: u32 },
    Exhausted {
        error: AppError,
        kind: FailureKind,
        attempts: u32,
    },
    Cancelled { attempts: u32 },
}

impl<T> RetryOutcome<T> {
    /// Number of upstream calls that were made.
    pub fn attempts(&self) -> u32 {
        match self {
            RetryOutcome::Succeeded { attempts, .. }
            | RetryOutcome::Exhausted { attempts, .. }
            | RetryOutcome::Cancelled { attempts } => *attempts,
        }
    }
}

/// Run `operation` under `policy`, retrying rate-limited failures.
///
/// `operation` receives the zero-based attempt number. At most
/// `policy.max_retries + 1` calls are made.
pub async fn run_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    classifier: &dyn FailureClassifier,
    sleeper: &dyn Sleeper,
    cancel: &CancellationToken,
    mut operation: F,
) -> RetryOutcome<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let mut state = RetryState::Attempting { attempt: 0 };

    loop {
        tracing::trace!(?state, "retry transition");

        state = match state {
            RetryState::Attempting { attempt } => {
                if cancel.is_cancelled() {
                    return RetryOutcome::Cancelled { attempts: attempt };
                }

                tracing::info!(
                    "Attempt {}/{} to call LLM API",
                    attempt.saturating_add(1),
                    policy.max_retries.saturating_add(1)
                );

                match operation(attempt).await {
                    Ok(value) => {
                        return RetryOutcome::Succeeded {
                            value,
                            attempts: attempt.saturating_add(1),
                        }
                    }
                    Err(error) => {
                        let kind = classifier.classify(&error);

                        if !kind.is_retryable() || attempt >= policy.max_retries {
                            tracing::error!(
                                "Failed to generate response after {} retries: {}",
                                attempt,
                                error
                            );
                            return RetryOutcome::Exhausted {
                                error,
                                kind,
                                attempts: attempt.saturating_add(1),
                            };
                        }

                        let delay = policy.backoff_delay(attempt, kind.retry_after());
                        tracing::warn!(
                            "Rate limit exceeded. Retrying in {:.2} seconds...",
                            delay.as_secs_f64()
                        );
                        RetryState::BackingOff { attempt, delay }
                    }
                }
            }
            RetryState::BackingOff { attempt, delay } => {
                if !sleeper.sleep(delay, cancel).await {
                    tracing::info!("Retry cancelled during backoff");
                    return RetryOutcome::Cancelled {
                        attempts: attempt.saturating_add(1),
                    };
                }
                RetryState::Attempting {
                    attempt: attempt.saturating_add(1),
                }
            }
        };
    }
}
