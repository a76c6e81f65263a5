//! Retry policy: attempt budget, fixed inter-attempt delay and retryable status codes.

use std::collections::HashSet;
use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;

use crate::{HttpClientError, Result};

/// Default values used by [`RetryOptions::default`].
pub mod defaults {
    /// Total attempts per logical call, first attempt included.
    pub const MAX_ATTEMPTS: u32 = 3;

    /// Fixed pause between two attempts.
    pub const RETRY_DELAY_MS: u64 = 250;

    /// Statuses that usually signal a transient server-side condition.
    pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];
}

/// Immutable retry configuration validated at construction.
///
/// `max_attempts` is the total number of attempts, not the number of retries
/// on top of the first one.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use layered_http::RetryPolicy;
///
/// let policy = RetryPolicy::new(3, Duration::from_millis(100), [502, 503, 503]).unwrap();
/// assert_eq!(policy.max_attempts(), 3);
/// assert_eq!(policy.retryable_statuses().len(), 2);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RetryOptions")]
pub struct RetryPolicy {
    max_attempts: u32,
    retry_delay: Duration,
    retryable_statuses: HashSet<StatusCode>,
}

impl RetryPolicy {
    /// Builds a policy, deduplicating `status_codes`.
    ///
    /// Fails with [`HttpClientError::InvalidPolicy`] when `max_attempts` is zero
    /// or a code is not a valid HTTP status.
    pub fn new<I>(max_attempts: u32, retry_delay: Duration, status_codes: I) -> Result<Self>
    where
        I: IntoIterator<Item = u16>,
    {
        if max_attempts < 1 {
            return Err(HttpClientError::InvalidPolicy(
                "max_attempts must be at least 1".to_owned(),
            ));
        }

        let retryable_statuses = status_codes
            .into_iter()
            .map(|code| {
                StatusCode::from_u16(code).map_err(|_| {
                    HttpClientError::InvalidPolicy(format!("{code} is not an HTTP status code"))
                })
            })
            .collect::<Result<HashSet<_>>>()?;

        Ok(Self {
            max_attempts,
            retry_delay,
            retryable_statuses,
        })
    }

    /// A policy that performs exactly one attempt.
    pub fn single_attempt() -> Self {
        Self {
            max_attempts: 1,
            retry_delay: Duration::ZERO,
            retryable_statuses: HashSet::new(),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    pub fn retryable_statuses(&self) -> &HashSet<StatusCode> {
        &self.retryable_statuses
    }

    /// Whether a response with `status` should be retried.
    pub fn is_retryable(&self, status: StatusCode) -> bool {
        self.retryable_statuses.contains(&status)
    }
}

/// Serializable shape of a [`RetryPolicy`], as found in configuration documents.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryOptions {
    /// Total attempts per call, first attempt included.
    pub max_attempts: u32,
    /// Fixed delay between attempts in milliseconds.
    pub retry_delay_ms: u64,
    /// Status codes that trigger another attempt.
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_attempts: defaults::MAX_ATTEMPTS,
            retry_delay_ms: defaults::RETRY_DELAY_MS,
            retryable_statuses: defaults::RETRYABLE_STATUSES.to_vec(),
        }
    }
}

impl RetryOptions {
    /// Validates these options into a [`RetryPolicy`].
    pub fn to_policy(&self) -> Result<RetryPolicy> {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.retry_delay_ms),
            self.retryable_statuses.iter().copied(),
        )
    }
}

impl TryFrom<RetryOptions> for RetryPolicy {
    type Error = HttpClientError;

    fn try_from(options: RetryOptions) -> Result<Self> {
        options.to_policy()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: defaults::MAX_ATTEMPTS,
            retry_delay: Duration::from_millis(defaults::RETRY_DELAY_MS),
            retryable_statuses: defaults::RETRYABLE_STATUSES
                .iter()
                .filter_map(|code| StatusCode::from_u16(*code).ok())
                .collect(),
        }
    }
}
