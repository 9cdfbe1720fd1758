//! Repository for the `system_settings` key/value table.

use std::collections::HashMap;

use sqlx::PgPool;

use crate::models::setting::Setting;

/// Provides read and upsert access to named settings.
pub struct SettingRepo;

impl SettingRepo {
    /// Fetch several keys in one query. Absent keys are simply missing
    /// from the returned map.
    pub async fn get_many(pool: &PgPool, keys: &[&str]) -> Result<HashMap<String, String>, sqlx::Error> {
        let keys: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT key, value FROM system_settings WHERE key = ANY($1)",
        )
        .bind(&keys)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().collect())
    }

    /// Fetch a single setting value.
    pub async fn get(pool: &PgPool, key: &str) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>("SELECT value FROM system_settings WHERE key = $1")
            .bind(key)
            .fetch_optional(pool)
            .await
    }

    /// Insert or replace a setting.
    pub async fn upsert(pool: &PgPool, key: &str, value: &str) -> Result<Setting, sqlx::Error> {
        sqlx::query_as::<_, Setting>(
            "INSERT INTO system_settings (key, value) VALUES ($1, $2) \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW() \
             RETURNING key, value, updated_at",
        )
        .bind(key)
        .bind(value)
        .fetch_one(pool)
        .await
    }
}
