//! Retry policy for remote requests.
//!
//! Every failure is mapped by [`classify`] to either a retry with exponential
//! backoff or an immediate failure. The request loop in
//! [`super::yougile::YougileClient`] drives the attempts.

use std::time::Duration;

use super::ApiError;
use crate::config::RetryConfig;

/// What to do with a failed attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Transient failure: back off and try again.
    Retry,
    /// Permanent failure: abort the fetch.
    Fail,
}

/// Map a request failure to a retry decision.
///
/// Rate limiting, 5xx responses and transport errors (timeouts, refused
/// connections) are transient. Authentication failures, other 4xx responses,
/// requests that cannot even be built and undecodable bodies are not.
pub fn classify(err: &ApiError) -> RetryDecision {
    match err {
        ApiError::Network(e) if e.is_builder() || e.is_decode() => RetryDecision::Fail,
        ApiError::RateLimited { .. } | ApiError::Server { .. } | ApiError::Network(_) => RetryDecision::Retry,
        ApiError::Unauthorized
        | ApiError::BadRequest { .. }
        | ApiError::InvalidData(_)
        | ApiError::Exhausted { .. } => RetryDecision::Fail,
    }
}

/// Exponential backoff parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub backoff_factor: f64,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            backoff_factor: config.backoff_factor.max(1.0),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the given failed attempt (1-based).
    ///
    /// `initial * factor^(attempt-1)`, capped at `max_backoff`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.initial_backoff.as_secs_f64() * self.backoff_factor.powi(exponent);
        if !secs.is_finite() || secs >= self.max_backoff.as_secs_f64() {
            self.max_backoff
        } else {
            Duration::from_secs_f64(secs.max(0.0))
        }
    }

    /// Delay after a failed attempt, honouring a server-provided hint.
    ///
    /// The larger of the hint and the computed backoff is used, still capped
    /// at `max_backoff`.
    pub fn delay_for(&self, attempt: u32, err: &ApiError) -> Duration {
        let computed = self.backoff_for(attempt);
        match err {
            ApiError::RateLimited {
                retry_after: Some(hint),
            } => computed.max(*hint).min(self.max_backoff),
            _ => computed,
        }
    }
}
