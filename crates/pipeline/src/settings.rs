//! Read-through accessor for runtime settings.
//!
//! Settings are read from `system_settings` once per request or poll and
//! never cached, so an admin change applies to the next call.

use std::collections::HashMap;

use pixora_core::pricing::TierPrices;
use pixora_core::settings as keys;
use pixora_db::repositories::SettingRepo;
use pixora_providers::ProviderSettings;
use sqlx::PgPool;

/// Settings snapshot used for one request.
#[derive(Debug, Clone)]
pub struct LiveSettings {
    pub provider: ProviderSettings,
    pub prices: TierPrices,
}

impl LiveSettings {
    /// Read every engine setting in one query.
    pub async fn load(pool: &PgPool) -> Result<Self, sqlx::Error> {
        let values = SettingRepo::get_many(pool, keys::ENGINE_KEYS).await?;
        Ok(Self::from_map(&values))
    }

    /// Build from raw key/value pairs. Missing keys are `None` for the
    /// provider and the default for prices.
    pub fn from_map(values: &HashMap<String, String>) -> Self {
        let get = |key: &str| values.get(key).map(String::as_str);
        Self {
            provider: ProviderSettings {
                protocol: get(keys::PROVIDER_PROTOCOL).map(str::to_string),
                base_url: get(keys::PROVIDER_BASE_URL).map(str::to_string),
                api_key: get(keys::PROVIDER_API_KEY).map(str::to_string),
            },
            prices: TierPrices::from_settings(
                get(keys::PRICE_1K),
                get(keys::PRICE_2K),
                get(keys::PRICE_4K),
            ),
        }
    }
}
