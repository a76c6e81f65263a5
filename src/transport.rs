//! The transport capability and the `reqwest`-backed base transport.
//!
//! Every layer of the client implements [`Transport`]: the base
//! [`ReqwestTransport`] performs network I/O, decorators such as
//! [`RetryTransport`](crate::RetryTransport) wrap another transport and add
//! behavior around it.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Request, Response};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::{HttpClientError, Result, TlsTrustStore};

/// Boxed future returned by [`Transport::execute`].
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Executes one request and produces one response or one error.
pub trait Transport: Send + Sync {
    fn execute<'a>(
        &'a self,
        request: Request,
        cx: &'a CallContext,
    ) -> BoxFuture<'a, Result<Response>>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn execute<'a>(
        &'a self,
        request: Request,
        cx: &'a CallContext,
    ) -> BoxFuture<'a, Result<Response>> {
        (**self).execute(request, cx)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn execute<'a>(
        &'a self,
        request: Request,
        cx: &'a CallContext,
    ) -> BoxFuture<'a, Result<Response>> {
        (**self).execute(request, cx)
    }
}

/// Per-call state carried through every layer.
///
/// Holds the caller's cancellation signal. A default context can never be
/// cancelled.
#[derive(Clone, Debug, Default)]
pub struct CallContext {
    cancel: Option<CancellationToken>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context that is cancelled together with `token`.
    pub fn with_cancellation(token: CancellationToken) -> Self {
        Self {
            cancel: Some(token),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    /// Fails with [`HttpClientError::Cancelled`] once cancellation was requested.
    pub fn ensure_active(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(HttpClientError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Drives `fut` to completion unless the call is cancelled first.
    pub async fn guard<F: Future>(&self, fut: F) -> Result<F::Output> {
        match &self.cancel {
            None => Ok(fut.await),
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(HttpClientError::Cancelled),
                output = fut => Ok(output),
            },
        }
    }

    /// Sleeps for `delay`, returning early with an error on cancellation.
    pub async fn pause(&self, delay: Duration) -> Result<()> {
        self.ensure_active()?;
        if delay.is_zero() {
            return Ok(());
        }
        self.guard(tokio::time::sleep(delay)).await
    }
}

/// Connection defaults of the base transport.
pub mod defaults {
    /// TCP connect timeout.
    pub const CONNECT_TIMEOUT_MS: u64 = 30_000;
    /// Interval between TCP keep-alive packets.
    pub const TCP_KEEPALIVE_MS: u64 = 30_000;
    /// Idle pooled connections are closed after this long.
    pub const POOL_IDLE_TIMEOUT_MS: u64 = 90_000;
    /// Maximum idle pooled connections kept per host.
    pub const POOL_MAX_IDLE_PER_HOST: usize = 100;
}

/// Settings of the `reqwest` base transport.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransportOptions {
    /// TCP connect timeout in milliseconds, 0 disables it.
    pub connect_timeout_ms: u64,
    /// TCP keep-alive interval in milliseconds, 0 disables it.
    pub tcp_keepalive_ms: u64,
    /// Idle pooled connection lifetime in milliseconds, 0 keeps them forever.
    pub pool_idle_timeout_ms: u64,
    pub pool_max_idle_per_host: usize,
    /// Timeout of a single attempt in milliseconds, 0 disables it.
    ///
    /// An attempt that hits this limit fails as a transport error and may be
    /// retried. The overall call is bounded by
    /// [`ClientOptions::timeout_ms`](crate::ClientOptions::timeout_ms).
    pub attempt_timeout_ms: u64,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            connect_timeout_ms: defaults::CONNECT_TIMEOUT_MS,
            tcp_keepalive_ms: defaults::TCP_KEEPALIVE_MS,
            pool_idle_timeout_ms: defaults::POOL_IDLE_TIMEOUT_MS,
            pool_max_idle_per_host: defaults::POOL_MAX_IDLE_PER_HOST,
            attempt_timeout_ms: 0,
        }
    }
}

fn millis(value: u64) -> Option<Duration> {
    (value > 0).then(|| Duration::from_millis(value))
}

/// Base transport performing network I/O through a pooled `reqwest::Client`.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds the base client from `options`, trusting only `tls` roots when given.
    pub fn new(options: &TransportOptions, tls: Option<&TlsTrustStore>) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .tcp_keepalive(millis(options.tcp_keepalive_ms))
            .pool_idle_timeout(millis(options.pool_idle_timeout_ms))
            .pool_max_idle_per_host(options.pool_max_idle_per_host);

        if let Some(timeout) = millis(options.connect_timeout_ms) {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(timeout) = millis(options.attempt_timeout_ms) {
            builder = builder.timeout(timeout);
        }
        if let Some(store) = tls {
            builder = store.apply(builder);
        }

        let http = builder.build().map_err(HttpClientError::Build)?;
        Ok(Self { http })
    }

    /// Wraps an already configured client.
    pub fn from_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.http
    }
}

impl Transport for ReqwestTransport {
    fn execute<'a>(
        &'a self,
        request: Request,
        cx: &'a CallContext,
    ) -> BoxFuture<'a, Result<Response>> {
        Box::pin(async move {
            cx.guard(self.http.execute(request))
                .await?
                .map_err(HttpClientError::Transport)
        })
    }
}
