/// Errors from an upstream image provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider returned a non-2xx status code.
    #[error("Provider API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The response body did not have the expected shape.
    #[error("Unexpected provider response: {0}")]
    Decode(String),

    /// The provider answered successfully but returned no image.
    #[error("No image found: {0}")]
    NoImage(String),

    /// The provider is not configured well enough to be called.
    #[error("Provider configuration error: {0}")]
    Config(String),
}

impl ProviderError {
    /// Whether a poll failure means the task is gone for good.
    ///
    /// Only an HTTP 4xx other than 429 is terminal. Network errors, 5xx,
    /// rate limiting and malformed bodies leave the job pending so the
    /// next poll can try again.
    pub fn is_terminal_poll_failure(&self) -> bool {
        match self {
            ProviderError::Api { status, .. } => (400..500).contains(status) && *status != 429,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16) -> ProviderError {
        ProviderError::Api {
            status,
            body: String::new(),
        }
    }

    #[test]
    fn client_errors_are_terminal() {
        assert!(api(400).is_terminal_poll_failure());
        assert!(api(404).is_terminal_poll_failure());
    }

    #[test]
    fn rate_limit_and_server_errors_are_transient() {
        assert!(!api(429).is_terminal_poll_failure());
        assert!(!api(500).is_terminal_poll_failure());
        assert!(!api(503).is_terminal_poll_failure());
        assert!(!ProviderError::Decode("bad json".into()).is_terminal_poll_failure());
    }
}
