//! Keys of the `system_settings` table read by the engine.

/// Active provider protocol (`sync_image`, `chat_image`, `task_poll`, `draw_poll`).
pub const PROVIDER_PROTOCOL: &str = "provider_protocol";
/// Provider base URL, without a trailing slash.
pub const PROVIDER_BASE_URL: &str = "provider_base_url";
/// Provider credential, sent as a bearer token.
pub const PROVIDER_API_KEY: &str = "provider_api_key";
/// Unit price of a 1K image.
pub const PRICE_1K: &str = "price_1k";
/// Unit price of a 2K image.
pub const PRICE_2K: &str = "price_2k";
/// Unit price of a 4K image.
pub const PRICE_4K: &str = "price_4k";

/// Every key the engine reads, fetched together in one query.
pub const ENGINE_KEYS: &[&str] = &[
    PROVIDER_PROTOCOL,
    PROVIDER_BASE_URL,
    PROVIDER_API_KEY,
    PRICE_1K,
    PRICE_2K,
    PRICE_4K,
];
