use std::time::Duration;

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum HttpClientError {
    /// Retry policy failed validation while the client was being assembled.
    #[error("invalid retry policy: {0}")]
    InvalidPolicy(String),
    /// The transport produced no response (connect, I/O or per-attempt timeout failure).
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// A request builder produced no request (bad URL, header or body). Never retried.
    #[error("invalid request: {0}")]
    InvalidRequest(reqwest::Error),
    /// The base `reqwest` client could not be built.
    #[error("failed to build base transport: {0}")]
    Build(reqwest::Error),
    /// Trust store could not be loaded.
    #[error("tls error: {0}")]
    Tls(String),
    /// Options could not be parsed or read from the environment.
    #[error("config error: {0}")]
    Config(String),
    /// The request body is a one-shot stream and cannot be sent more than once.
    #[error("request body cannot be replayed for another attempt")]
    BodyNotReplayable,
    /// The caller cancelled the call.
    #[error("request cancelled")]
    Cancelled,
    /// The client-level deadline elapsed before the call finished.
    #[error("request timed out after {} ms", .timeout.as_millis())]
    TimedOut { timeout: Duration },
}

impl HttpClientError {
    /// Returns `true` when no response could be obtained from the network layer.
    pub fn is_transport(&self) -> bool {
        matches!(self, HttpClientError::Transport(_))
    }

    /// Returns `true` for caller-driven aborts: explicit cancellation or an elapsed deadline.
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            HttpClientError::Cancelled | HttpClientError::TimedOut { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::HttpClientError;

    #[test]
    fn timed_out_message_reports_millis() {
        let err = HttpClientError::TimedOut {
            timeout: Duration::from_millis(1_500),
        };
        assert_eq!(err.to_string(), "request timed out after 1500 ms");
        assert!(err.is_cancellation());
        assert!(!err.is_transport());
    }

    #[test]
    fn cancellation_is_not_transport() {
        assert!(HttpClientError::Cancelled.is_cancellation());
        assert!(!HttpClientError::Cancelled.is_transport());
        assert!(!HttpClientError::BodyNotReplayable.is_cancellation());
    }
}
