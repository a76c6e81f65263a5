//! Retry-decorating transport.
//!
//! [`RetryTransport`] re-issues a request against its inner transport until a
//! response with a non-retryable status arrives or the attempt budget of its
//! [`RetryPolicy`] is spent. Attempts are strictly sequential and separated by
//! the policy's fixed delay; the caller only ever sees the outcome of the
//! final attempt.
//!
//! # Replayable bodies
//!
//! Every attempt except the last sends a clone of the request
//! ([`reqwest::Request::try_clone`]). Requests with a streaming body cannot be
//! cloned; when the policy allows more than one attempt such requests fail
//! with [`HttpClientError::BodyNotReplayable`] before anything is sent.
//! Idempotency of the request stays the caller's responsibility.

use reqwest::{Request, Response};

use crate::transport::{BoxFuture, CallContext, Transport};
use crate::{HttpClientError, Result, RetryPolicy};

/// How one attempt ended, as far as retrying is concerned.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AttemptOutcome {
    /// Final answer: a non-retryable response, or an error that must not be retried.
    Complete,
    /// A response whose status is in the policy's retryable set.
    RetryableStatus,
    /// No response was received.
    TransportFailure,
}

/// Classifies the result of one attempt against `policy`.
///
/// Cancellation, deadline and configuration errors are [`AttemptOutcome::Complete`]
/// so they reach the caller immediately.
pub fn classify(policy: &RetryPolicy, result: &Result<Response>) -> AttemptOutcome {
    match result {
        Ok(response) if policy.is_retryable(response.status()) => AttemptOutcome::RetryableStatus,
        Ok(_) => AttemptOutcome::Complete,
        Err(err) if err.is_transport() => AttemptOutcome::TransportFailure,
        Err(_) => AttemptOutcome::Complete,
    }
}

/// Transport decorator that retries transport failures and retryable statuses.
#[derive(Clone, Debug)]
pub struct RetryTransport<T> {
    inner: T,
    policy: RetryPolicy,
}

impl<T: Transport> RetryTransport<T> {
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    async fn run(&self, request: Request, cx: &CallContext) -> Result<Response> {
        let max_attempts = self.policy.max_attempts();
        let mut pending = Some(request);
        let mut attempt = 1;

        loop {
            cx.ensure_active()?;

            let last = attempt >= max_attempts;
            let outgoing = if last {
                pending.take()
            } else {
                pending.as_ref().and_then(Request::try_clone)
            };
            let outgoing = outgoing.ok_or(HttpClientError::BodyNotReplayable)?;

            let result = self.inner.execute(outgoing, cx).await;
            if last {
                return result;
            }

            match classify(&self.policy, &result) {
                AttemptOutcome::Complete => return result,
                AttemptOutcome::RetryableStatus => {
                    if let Ok(response) = result {
                        release(response, cx).await?;
                    }
                }
                AttemptOutcome::TransportFailure => {}
            }

            cx.pause(self.policy.retry_delay()).await?;
            attempt += 1;
        }
    }
}

/// Drains a discarded response so its connection can return to the pool.
async fn release(response: Response, cx: &CallContext) -> Result<()> {
    // Read errors are irrelevant here, the attempt is discarded either way.
    let _ = cx.guard(response.bytes()).await?;
    Ok(())
}

impl<T: Transport> Transport for RetryTransport<T> {
    fn execute<'a>(
        &'a self,
        request: Request,
        cx: &'a CallContext,
    ) -> BoxFuture<'a, Result<Response>> {
        Box::pin(self.run(request, cx))
    }
}
