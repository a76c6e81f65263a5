use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{IntoUrl, Method, Request, RequestBuilder, Response};

use crate::transport::{CallContext, ReqwestTransport, Transport};
use crate::{ClientOptions, HttpClientError, Result, RetryTransport};

#[cfg(feature = "tracing")]
use crate::TracingTransport;

/// Outbound HTTP client executing requests through a fixed stack of transports.
///
/// The stack, outermost first:
///
/// 1. per-call timeout and cancellation (this type)
/// 2. [`TracingTransport`](crate::TracingTransport) when telemetry is on
/// 3. [`RetryTransport`] when a retry policy is configured
/// 4. the base transport, [`ReqwestTransport`] unless supplied explicitly
///
/// Telemetry therefore records one span per logical call, whatever the number
/// of attempts behind it.
#[derive(Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    transport: Arc<dyn Transport>,
    layers: Vec<&'static str>,
    timeout: Option<Duration>,
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("layers", &self.layers)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Creates a client with [`ClientOptions::default`].
    pub fn new() -> Result<Self> {
        Self::from_options(ClientOptions::default())
    }

    /// Assembles a client on top of the `reqwest` base transport.
    pub fn from_options(options: ClientOptions) -> Result<Self> {
        let base = ReqwestTransport::new(&options.transport, options.tls.as_ref())?;
        let http = base.client().clone();
        Ok(Self::assemble(http, base, "reqwest", &options))
    }

    /// Assembles a client from `LAYERED_HTTP_*` environment variables.
    ///
    /// **Reads the process environment** — see [`ClientOptions::from_env`].
    pub fn from_env() -> Result<Self> {
        Self::from_options(ClientOptions::from_env()?)
    }

    /// Assembles the decorators from `options` around a caller-supplied base
    /// transport.
    ///
    /// `options.transport` and `options.tls` configure the built-in base
    /// transport only and are ignored here.
    pub fn with_base_transport<T>(base: T, options: &ClientOptions) -> Result<Self>
    where
        T: Transport + 'static,
    {
        let http = reqwest::Client::builder()
            .build()
            .map_err(HttpClientError::Build)?;
        Ok(Self::assemble(http, base, "custom", options))
    }

    fn assemble<T>(
        http: reqwest::Client,
        base: T,
        base_name: &'static str,
        options: &ClientOptions,
    ) -> Self
    where
        T: Transport + 'static,
    {
        let mut transport: Arc<dyn Transport> = Arc::new(base);
        let mut layers = vec![base_name];

        if let Some(policy) = &options.retry {
            transport = Arc::new(RetryTransport::new(transport, policy.clone()));
            layers.push("retry");
        }

        #[cfg(feature = "tracing")]
        if options.telemetry {
            transport = Arc::new(TracingTransport::new(transport));
            layers.push("tracing");
        }

        layers.reverse();
        let timeout = options.timeout();

        #[cfg(feature = "tracing")]
        tracing::debug!(?layers, ?timeout, "assembled http client");

        Self {
            http,
            transport,
            layers,
            timeout,
        }
    }

    /// Starts building a request. Send it with [`HttpClient::execute`].
    pub fn request<U: IntoUrl>(&self, method: Method, url: U) -> RequestBuilder {
        self.http.request(method, url)
    }

    pub fn get<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.request(Method::GET, url)
    }

    pub fn post<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.request(Method::POST, url)
    }

    pub fn put<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.request(Method::PUT, url)
    }

    pub fn delete<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.request(Method::DELETE, url)
    }

    /// Executes one logical call.
    pub async fn execute(&self, request: Request) -> Result<Response> {
        self.execute_with(request, &CallContext::new()).await
    }

    /// Executes one logical call that stops as soon as `cx` is cancelled.
    ///
    /// The configured timeout bounds every attempt and delay; when it elapses
    /// the in-flight attempt is dropped and [`HttpClientError::TimedOut`] is
    /// returned.
    pub async fn execute_with(&self, request: Request, cx: &CallContext) -> Result<Response> {
        cx.ensure_active()?;
        let call = cx.guard(self.transport.execute(request, cx));

        let outcome = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, call)
                .await
                .map_err(|_| HttpClientError::TimedOut { timeout })?,
            None => call.await,
        };
        outcome?
    }

    /// Builds `builder` and executes it.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let request = builder.build().map_err(HttpClientError::InvalidRequest)?;
        self.execute(request).await
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Layer names, outermost first.
    pub fn layers(&self) -> &[&'static str] {
        &self.layers
    }
}
