//! Response helpers shared by the provider clients.

use std::time::Duration;

use crate::error::ProviderError;

/// Timeout for a submit call that only returns a task id.
pub(crate) const SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for a call that returns the finished image.
pub(crate) const GENERATE_TIMEOUT: Duration = Duration::from_secs(300);

/// Timeout for a single status poll.
pub(crate) const POLL_TIMEOUT: Duration = Duration::from_secs(20);

/// Ensure the response has a success status code. Returns the response
/// unchanged on success, or a [`ProviderError::Api`] containing the
/// status and body text on failure.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        return Err(ProviderError::Api {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

/// Parse a successful JSON response body into the expected type.
pub(crate) async fn parse_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ProviderError> {
    let response = ensure_success(response).await?;
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ProviderError::Decode(e.to_string()))
}

/// Join a base URL and an absolute path without doubling the slash.
pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

/// Wrap a raw base64 payload as a PNG data URI.
pub(crate) fn png_data_uri(b64: &str) -> String {
    format!("data:image/png;base64,{}", b64.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_strips_trailing_slash() {
        assert_eq!(
            endpoint("https://api.example.com/", "/v1/images/generations"),
            "https://api.example.com/v1/images/generations"
        );
    }
}
