//! User entity model (accounts collaborator surface).

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tradepost_core::types::{DbId, Timestamp};

/// A row from the `users` table.
///
/// Account management (registration, auth, sessions) lives outside this
/// system; the engine only resolves users by id.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub display_name: String,
    pub email: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a user (test fixtures and seeding).
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub display_name: String,
    pub email: String,
}
