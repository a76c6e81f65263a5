//! `layered-http` is an outbound HTTP client assembled from stackable transports.
//!
//! A call flows through a fixed chain of layers:
//! - [`HttpClient`] — per-call timeout and cancellation
//! - [`TracingTransport`] — one `tracing` span per logical call (`tracing` feature)
//! - [`RetryTransport`] — fixed-delay retry driven by a [`RetryPolicy`]
//! - [`ReqwestTransport`] — pooled network I/O, optionally with a custom [`TlsTrustStore`]
//!
//! Every layer implements [`Transport`], so custom layers and base transports
//! plug into the same chain.
//!
//! ```no_run
//! use std::time::Duration;
//! use layered_http::{ClientOptions, HttpClient, RetryPolicy};
//!
//! # async fn run() -> layered_http::Result<()> {
//! let options = ClientOptions::default()
//!     .with_timeout(Duration::from_secs(10))
//!     .with_retry(RetryPolicy::new(3, Duration::from_millis(200), [502, 503, 504])?);
//! let client = HttpClient::from_options(options)?;
//!
//! let response = client.send(client.get("https://example.com/health")).await?;
//! println!("{}", response.status());
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod options;
mod policy;
mod retry;
mod tls;
#[cfg(feature = "tracing")]
mod trace;
pub mod transport;

pub use client::HttpClient;
pub use error::HttpClientError;
pub use options::{env, ClientOptions};
pub use policy::{defaults as retry_defaults, RetryOptions, RetryPolicy};
pub use retry::{classify, AttemptOutcome, RetryTransport};
pub use tls::TlsTrustStore;
#[cfg(feature = "tracing")]
pub use trace::TracingTransport;
pub use transport::{CallContext, ReqwestTransport, Transport, TransportOptions};

pub use tokio_util::sync::CancellationToken;

pub type Result<T> = std::result::Result<T, HttpClientError>;
