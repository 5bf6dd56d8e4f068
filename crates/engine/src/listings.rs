//! Listing store operations.
//!
//! Creation and deletion are owner-driven; locking and unlocking are
//! driven exclusively by the proposal and swap engines through
//! [`ListingRepo`]'s compare-and-set methods.

use std::sync::Arc;

use tradepost_core::clock::{Clock, SystemClock};
use tradepost_core::error::CoreError;
use tradepost_core::listing::validate_condition;
use tradepost_core::types::DbId;
use tradepost_db::models::listing::{CreateListing, Listing, ListingListQuery};
use tradepost_db::repositories::ListingRepo;
use tradepost_db::DbPool;

use crate::accounts::AccountResolver;
use crate::error::{EngineError, EngineResult};

/// Owner-facing listing operations.
pub struct ListingService {
    pool: DbPool,
    accounts: Arc<dyn AccountResolver>,
    clock: Arc<dyn Clock>,
}

impl ListingService {
    pub fn new(pool: DbPool, accounts: Arc<dyn AccountResolver>) -> Self {
        Self {
            pool,
            accounts,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock (deterministic tests).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Create a new Active listing owned by `owner_id`.
    pub async fn create(&self, owner_id: DbId, input: &CreateListing) -> EngineResult<Listing> {
        self.accounts.get_user(owner_id).await?;
        validate_condition(&input.condition).map_err(CoreError::Validation)?;

        let listing = ListingRepo::create(&self.pool, owner_id, input).await?;
        tracing::info!(
            listing_id = listing.id,
            owner_id,
            condition = %listing.condition,
            "Listing created"
        );
        Ok(listing)
    }

    /// Fetch a listing by id.
    pub async fn get(&self, listing_id: DbId) -> EngineResult<Listing> {
        ListingRepo::find_by_id(&self.pool, listing_id)
            .await?
            .ok_or_else(|| {
                EngineError::Core(CoreError::NotFound {
                    entity: "Listing",
                    id: listing_id,
                })
            })
    }

    /// True iff the listing is Active with no lock holder.
    pub async fn is_available(&self, listing_id: DbId) -> EngineResult<bool> {
        Ok(ListingRepo::is_available(&self.pool, listing_id).await?)
    }

    /// Soft-delete a listing. Owner only; permitted only while the listing
    /// is Active and unlocked.
    pub async fn delete(&self, listing_id: DbId, caller_id: DbId) -> EngineResult<Listing> {
        let listing = self.get(listing_id).await?;
        if listing.owner_id != caller_id {
            return Err(CoreError::Unauthorized(
                "only the owner can delete a listing".into(),
            )
            .into());
        }

        let deleted = ListingRepo::mark_deleted(&self.pool, listing_id, self.clock.now()).await?;
        if !deleted {
            return Err(CoreError::Conflict(format!(
                "listing {listing_id} is committed to a trade and cannot be deleted"
            ))
            .into());
        }

        tracing::info!(listing_id, caller_id, "Listing deleted");
        self.get(listing_id).await
    }

    /// List a user's listings, newest first.
    pub async fn list_for_owner(
        &self,
        owner_id: DbId,
        params: &ListingListQuery,
    ) -> EngineResult<Vec<Listing>> {
        Ok(ListingRepo::list_by_owner(&self.pool, owner_id, params).await?)
    }

    /// Browse Active listings across all owners, newest first.
    pub async fn browse(&self, params: &ListingListQuery) -> EngineResult<Vec<Listing>> {
        Ok(ListingRepo::browse(&self.pool, params).await?)
    }
}
