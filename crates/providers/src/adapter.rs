//! Selection of the active provider from live settings.

use async_trait::async_trait;

use crate::chat_image::ChatImageClient;
use crate::error::ProviderError;
use crate::submit_poll::{SubmitFlavor, SubmitPollClient};
use crate::sync_image::SyncImageClient;
use crate::types::{DispatchOutcome, GenerationRequest, ImageProvider, PollOutcome};

/// Wire protocol spoken by the configured provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderProtocol {
    SyncImage,
    ChatImage,
    TaskPoll,
    DrawPoll,
}

impl ProviderProtocol {
    /// Parse the `provider_protocol` setting value.
    pub fn parse(value: &str) -> Result<Self, ProviderError> {
        match value.trim() {
            "sync_image" => Ok(Self::SyncImage),
            "chat_image" => Ok(Self::ChatImage),
            "task_poll" => Ok(Self::TaskPoll),
            "draw_poll" => Ok(Self::DrawPoll),
            other => Err(ProviderError::Config(format!(
                "unknown provider protocol '{other}'"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SyncImage => "sync_image",
            Self::ChatImage => "chat_image",
            Self::TaskPoll => "task_poll",
            Self::DrawPoll => "draw_poll",
        }
    }
}

/// Provider connection settings as read for one request.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub protocol: Option<String>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

/// The closed set of supported providers.
pub enum ProviderAdapter {
    SyncImage(SyncImageClient),
    ChatImage(ChatImageClient),
    SubmitPoll(SubmitPollClient),
}

impl ProviderAdapter {
    /// Build the adapter named by `settings`, sharing `client`'s
    /// connection pool.
    ///
    /// Fails with [`ProviderError::Config`] if the protocol or base URL
    /// is missing or the protocol is unknown.
    pub fn from_settings(
        client: reqwest::Client,
        settings: &ProviderSettings,
    ) -> Result<Self, ProviderError> {
        let protocol = settings
            .protocol
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| ProviderError::Config("provider_protocol is not set".into()))
            .and_then(ProviderProtocol::parse)?;
        let base_url = settings
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ProviderError::Config("provider_base_url is not set".into()))?
            .to_string();
        let api_key = settings
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string);

        Ok(match protocol {
            ProviderProtocol::SyncImage => {
                Self::SyncImage(SyncImageClient::with_client(client, base_url, api_key))
            }
            ProviderProtocol::ChatImage => {
                Self::ChatImage(ChatImageClient::with_client(client, base_url, api_key))
            }
            ProviderProtocol::TaskPoll => Self::SubmitPoll(SubmitPollClient::with_client(
                client,
                base_url,
                api_key,
                SubmitFlavor::Tasks,
            )),
            ProviderProtocol::DrawPoll => Self::SubmitPoll(SubmitPollClient::with_client(
                client,
                base_url,
                api_key,
                SubmitFlavor::Draw,
            )),
        })
    }

    fn inner(&self) -> &dyn ImageProvider {
        match self {
            Self::SyncImage(c) => c,
            Self::ChatImage(c) => c,
            Self::SubmitPoll(c) => c,
        }
    }
}

#[async_trait]
impl ImageProvider for ProviderAdapter {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    async fn dispatch(&self, request: &GenerationRequest) -> Result<DispatchOutcome, ProviderError> {
        self.inner().dispatch(request).await
    }

    async fn poll(&self, task_id: &str) -> Result<PollOutcome, ProviderError> {
        self.inner().poll(task_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(protocol: Option<&str>, base_url: Option<&str>) -> ProviderSettings {
        ProviderSettings {
            protocol: protocol.map(str::to_string),
            base_url: base_url.map(str::to_string),
            api_key: None,
        }
    }

    #[test]
    fn builds_each_protocol() {
        let client = reqwest::Client::new();
        for (label, name) in [
            ("sync_image", "sync_image"),
            ("chat_image", "chat_image"),
            ("task_poll", "task_poll"),
            ("draw_poll", "draw_poll"),
        ] {
            let adapter =
                ProviderAdapter::from_settings(client.clone(), &settings(Some(label), Some("http://p")))
                    .unwrap();
            assert_eq!(adapter.name(), name);
        }
    }

    #[test]
    fn missing_protocol_or_url_is_config_error() {
        let client = reqwest::Client::new();
        assert!(matches!(
            ProviderAdapter::from_settings(client.clone(), &settings(None, Some("http://p"))),
            Err(ProviderError::Config(_))
        ));
        assert!(matches!(
            ProviderAdapter::from_settings(client.clone(), &settings(Some("sync_image"), Some(" "))),
            Err(ProviderError::Config(_))
        ));
        assert!(matches!(
            ProviderAdapter::from_settings(client, &settings(Some("fax"), Some("http://p"))),
            Err(ProviderError::Config(_))
        ));
    }
}
