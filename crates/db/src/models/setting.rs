//! Named string settings.

use pixora_core::types::Timestamp;
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `system_settings` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Setting {
    pub key: String,
    pub value: String,
    pub updated_at: Timestamp,
}
