//! Telemetry transport recording one `tracing` span per logical call.
//!
//! Enabled with the `tracing` feature (on by default).

use std::time::{Duration, Instant};

use reqwest::{Request, Response};
use tracing::Instrument;

use crate::transport::{BoxFuture, CallContext, Transport};
use crate::Result;

/// Wraps a transport and records method, host, path, status and latency.
///
/// Placed outside [`RetryTransport`](crate::RetryTransport) by the client, so
/// all attempts of a call fold into a single span.
#[derive(Clone, Debug)]
pub struct TracingTransport<T> {
    inner: T,
}

impl<T: Transport> TracingTransport<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

impl<T: Transport> Transport for TracingTransport<T> {
    fn execute<'a>(
        &'a self,
        request: Request,
        cx: &'a CallContext,
    ) -> BoxFuture<'a, Result<Response>> {
        let span = tracing::info_span!(
            "http.client.request",
            method = %request.method(),
            host = request.url().host_str().unwrap_or_default(),
            path = request.url().path(),
            status = tracing::field::Empty,
        );

        Box::pin(
            async move {
                let started = Instant::now();
                let result = self.inner.execute(request, cx).await;
                let elapsed_ms = elapsed_millis(started.elapsed());

                match &result {
                    Ok(response) => {
                        tracing::Span::current().record("status", response.status().as_u16());
                        tracing::debug!(elapsed_ms, "request completed");
                    }
                    Err(err) => tracing::warn!(error = %err, elapsed_ms, "request failed"),
                }
                result
            }
            .instrument(span),
        )
    }
}

fn elapsed_millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
