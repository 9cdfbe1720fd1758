//! Point-holding users.

use pixora_core::roles::{ROLE_ADMIN, ROLE_USER};
use pixora_core::types::{DbId, Points, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `users` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub username: String,
    pub is_admin: bool,
    pub points_balance: Points,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    /// Role name issued in this user's access tokens.
    pub fn role(&self) -> &'static str {
        if self.is_admin {
            ROLE_ADMIN
        } else {
            ROLE_USER
        }
    }
}

/// DTO for provisioning a user row.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub is_admin: bool,
}
