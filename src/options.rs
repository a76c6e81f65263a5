use std::time::Duration;

use serde::Deserialize;

use crate::{HttpClientError, Result, RetryOptions, RetryPolicy, TlsTrustStore, TransportOptions};

/// Environment variables read by [`ClientOptions::from_env`].
pub mod env {
    pub const TIMEOUT_MS: &str = "LAYERED_HTTP_TIMEOUT_MS";
    pub const RETRY_MAX_ATTEMPTS: &str = "LAYERED_HTTP_RETRY_MAX_ATTEMPTS";
    pub const RETRY_DELAY_MS: &str = "LAYERED_HTTP_RETRY_DELAY_MS";
    pub const RETRY_STATUSES: &str = "LAYERED_HTTP_RETRY_STATUSES";
    pub const CA_CERT_FILE: &str = "LAYERED_HTTP_CA_CERT_FILE";
}

/// Everything the client assembly needs, applied in one step.
///
/// Deserializable from JSON; the trust store is not part of the document and
/// is set in code or through [`ClientOptions::from_env`].
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientOptions {
    /// Overall per-call timeout in milliseconds covering all attempts and delays.
    /// `0` disables it.
    pub timeout_ms: u64,
    /// Retry behavior, `None` sends every request exactly once.
    pub retry: Option<RetryPolicy>,
    /// Wrap the stack in a tracing transport (needs the `tracing` feature).
    pub telemetry: bool,
    /// Base transport settings.
    pub transport: TransportOptions,
    /// Custom CA roots replacing the built-in store.
    #[serde(skip)]
    pub tls: Option<TlsTrustStore>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 0,
            retry: None,
            telemetry: true,
            transport: TransportOptions::default(),
            tls: None,
        }
    }
}

impl ClientOptions {
    /// Parses options from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|err| HttpClientError::Config(format!("invalid client options: {err}")))
    }

    /// Builds options from `LAYERED_HTTP_*` environment variables on top of the defaults.
    ///
    /// Retry is enabled when `LAYERED_HTTP_RETRY_MAX_ATTEMPTS` is set; missing
    /// retry fields fall back to [`RetryOptions::default`]. Setting the delay or
    /// status list without the attempt count is a [`HttpClientError::Config`] error.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };
        let mut options = Self::default();

        if let Some(value) = var(env::TIMEOUT_MS) {
            options.timeout_ms = parse_number(env::TIMEOUT_MS, &value)?;
        }

        if let Some(value) = var(env::RETRY_MAX_ATTEMPTS) {
            let mut retry = RetryOptions {
                max_attempts: parse_number(env::RETRY_MAX_ATTEMPTS, &value)?,
                ..RetryOptions::default()
            };
            if let Some(value) = var(env::RETRY_DELAY_MS) {
                retry.retry_delay_ms = parse_number(env::RETRY_DELAY_MS, &value)?;
            }
            if let Some(value) = var(env::RETRY_STATUSES) {
                retry.retryable_statuses = value
                    .split(',')
                    .map(str::trim)
                    .filter(|code| !code.is_empty())
                    .map(|code| parse_number(env::RETRY_STATUSES, code))
                    .collect::<Result<_>>()?;
            }
            options.retry = Some(retry.to_policy()?);
        } else if let Some(key) = [env::RETRY_DELAY_MS, env::RETRY_STATUSES]
            .into_iter()
            .find(|key| var(*key).is_some())
        {
            return Err(HttpClientError::Config(format!(
                "{key} is set but {} is not",
                env::RETRY_MAX_ATTEMPTS
            )));
        }

        if let Some(path) = var(env::CA_CERT_FILE) {
            options.tls = Some(TlsTrustStore::from_pem_file(path)?);
        }

        Ok(options)
    }

    /// Sets the overall per-call timeout. Sub-millisecond remainders round up,
    /// so a non-zero `timeout` never turns into "no timeout".
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let mut millis = timeout.as_millis();
        if Duration::from_millis(u64::try_from(millis).unwrap_or(u64::MAX)) < timeout {
            millis += 1;
        }
        self.timeout_ms = u64::try_from(millis).unwrap_or(u64::MAX);
        self
    }

    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    pub fn with_tls(mut self, store: TlsTrustStore) -> Self {
        self.tls = Some(store);
        self
    }

    pub fn with_telemetry(mut self, enabled: bool) -> Self {
        self.telemetry = enabled;
        self
    }

    /// The overall per-call timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}

fn parse_number<N: std::str::FromStr>(key: &str, value: &str) -> Result<N>
where
    N::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|err| HttpClientError::Config(format!("{key}={value:?}: {err}")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use reqwest::StatusCode;

    use super::{env, ClientOptions};
    use crate::HttpClientError;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_send_once_with_telemetry() {
        let options = ClientOptions::default();
        assert_eq!(options.timeout(), None);
        assert!(options.retry.is_none());
        assert!(options.telemetry);
        assert!(options.tls.is_none());
    }

    #[test]
    fn parses_json_document() {
        let options = ClientOptions::from_json_str(
            r#"{
                "timeout_ms": 2500,
                "telemetry": false,
                "retry": { "max_attempts": 4, "retry_delay_ms": 50, "retryable_statuses": [502, 503, 502] },
                "transport": { "attempt_timeout_ms": 800 }
            }"#,
        )
        .expect("valid document");

        assert_eq!(options.timeout(), Some(Duration::from_millis(2_500)));
        assert!(!options.telemetry);
        assert_eq!(options.transport.attempt_timeout_ms, 800);
        assert_eq!(options.transport.pool_max_idle_per_host, 100);

        let retry = options.retry.expect("retry configured");
        assert_eq!(retry.max_attempts(), 4);
        assert_eq!(retry.retry_delay(), Duration::from_millis(50));
        assert_eq!(retry.retryable_statuses().len(), 2);
    }

    #[test]
    fn json_with_invalid_policy_is_config_error() {
        let err = ClientOptions::from_json_str(r#"{ "retry": { "max_attempts": 0 } }"#)
            .expect_err("zero attempts must be rejected");
        match err {
            HttpClientError::Config(message) => assert!(message.contains("max_attempts")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn json_with_unknown_field_is_rejected() {
        assert!(ClientOptions::from_json_str(r#"{ "timeout": 5 }"#).is_err());
    }

    #[test]
    fn env_without_variables_yields_defaults() {
        let options = ClientOptions::from_lookup(lookup(&[])).expect("defaults");
        assert_eq!(options.timeout_ms, 0);
        assert!(options.retry.is_none());
    }

    #[test]
    fn env_enables_retry() {
        let options = ClientOptions::from_lookup(lookup(&[
            (env::TIMEOUT_MS, "10000"),
            (env::RETRY_MAX_ATTEMPTS, "5"),
            (env::RETRY_DELAY_MS, "20"),
            (env::RETRY_STATUSES, "503, 429,503"),
        ]))
        .expect("valid env");

        assert_eq!(options.timeout(), Some(Duration::from_secs(10)));
        let retry = options.retry.expect("retry configured");
        assert_eq!(retry.max_attempts(), 5);
        assert_eq!(retry.retry_delay(), Duration::from_millis(20));
        assert_eq!(retry.retryable_statuses().len(), 2);
        assert!(retry.is_retryable(StatusCode::TOO_MANY_REQUESTS));
    }

    #[test]
    fn env_retry_falls_back_to_default_statuses() {
        let options = ClientOptions::from_lookup(lookup(&[(env::RETRY_MAX_ATTEMPTS, "2")]))
            .expect("valid env");
        let retry = options.retry.expect("retry configured");
        assert!(retry.is_retryable(StatusCode::BAD_GATEWAY));
        assert_eq!(retry.retry_delay(), Duration::from_millis(250));
    }

    #[test]
    fn env_rejects_garbage() {
        let err = ClientOptions::from_lookup(lookup(&[(env::TIMEOUT_MS, "soon")]))
            .expect_err("must fail");
        assert!(matches!(err, HttpClientError::Config(_)));

        let err = ClientOptions::from_lookup(lookup(&[(env::RETRY_MAX_ATTEMPTS, "0")]))
            .expect_err("must fail");
        assert!(matches!(err, HttpClientError::InvalidPolicy(_)));

        let err = ClientOptions::from_lookup(lookup(&[(env::RETRY_MAX_ATTEMPTS, "-3")]))
            .expect_err("must fail");
        assert!(matches!(err, HttpClientError::Config(_)));
    }

    #[test]
    fn env_retry_fields_without_attempts_are_rejected() {
        for key in [env::RETRY_DELAY_MS, env::RETRY_STATUSES] {
            let err = ClientOptions::from_lookup(lookup(&[(key, "503")]))
                .expect_err("orphan retry field must fail");
            match err {
                HttpClientError::Config(message) => {
                    assert!(message.contains(key));
                    assert!(message.contains(env::RETRY_MAX_ATTEMPTS));
                }
                other => panic!("expected config error, got {other:?}"),
            }
        }
    }

    #[test]
    fn sub_millisecond_timeout_rounds_up() {
        let options = ClientOptions::default().with_timeout(Duration::from_micros(500));
        assert_eq!(options.timeout_ms, 1);
        assert_eq!(options.timeout(), Some(Duration::from_millis(1)));

        let options = ClientOptions::default().with_timeout(Duration::from_micros(1_500));
        assert_eq!(options.timeout_ms, 2);

        let options = ClientOptions::default().with_timeout(Duration::ZERO);
        assert_eq!(options.timeout(), None);
    }

    #[test]
    fn builder_helpers_set_fields() {
        let options = ClientOptions::default()
            .with_timeout(Duration::from_millis(1_500))
            .with_telemetry(false);
        assert_eq!(options.timeout_ms, 1_500);
        assert!(!options.telemetry);
    }
}
