//! Accounts collaborator seam.
//!
//! Account management (registration, auth, sessions) is not this system's
//! concern; the engines only need to resolve a user by id. That contract
//! is a trait so tests and alternative account backends can stand in.

use async_trait::async_trait;
use tradepost_core::error::CoreError;
use tradepost_core::types::DbId;
use tradepost_db::models::user::User;
use tradepost_db::repositories::UserRepo;
use tradepost_db::DbPool;

use crate::error::{EngineError, EngineResult};

/// Resolves user accounts for the engines.
#[async_trait]
pub trait AccountResolver: Send + Sync {
    /// Look up a user by id. Fails with `NotFound` for unknown ids.
    async fn get_user(&self, id: DbId) -> EngineResult<User>;
}

/// [`AccountResolver`] backed by the local `users` table.
pub struct PgAccountResolver {
    pool: DbPool,
}

impl PgAccountResolver {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountResolver for PgAccountResolver {
    async fn get_user(&self, id: DbId) -> EngineResult<User> {
        UserRepo::find_by_id(&self.pool, id)
            .await?
            .ok_or(EngineError::Core(CoreError::NotFound { entity: "User", id }))
    }
}
