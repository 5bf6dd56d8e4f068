//! Repository for the `listings` table.
//!
//! The lock column is the single point of mutual exclusion between
//! competing proposals. Every lock acquisition is a compare-and-set: the
//! UPDATE only matches when the listing is Active with no holder, so two
//! concurrent lock attempts on the same listing cannot both succeed.

use sqlx::PgPool;
use tradepost_core::types::{DbId, Timestamp};

use crate::models::listing::{CreateListing, Listing, ListingListQuery};
use crate::models::status::ListingStatus;

/// Column list for `listings` queries.
const COLUMNS: &str = "\
    id, owner_id, title, description, idol_group, member_name, condition, \
    photos, status_id, locked_by_proposal_id, created_at, updated_at";

/// Maximum page size for listing queries.
const MAX_LIMIT: i64 = 100;

/// Default page size for listing queries.
const DEFAULT_LIMIT: i64 = 50;

/// Provides CRUD and lock operations for listings.
pub struct ListingRepo;

impl ListingRepo {
    /// Insert a new Active listing, returning the created row.
    pub async fn create(
        pool: &PgPool,
        owner_id: DbId,
        input: &CreateListing,
    ) -> Result<Listing, sqlx::Error> {
        let photos = input
            .photos
            .clone()
            .unwrap_or_else(|| serde_json::Value::Array(Vec::new()));
        let query = format!(
            "INSERT INTO listings \
                (owner_id, title, description, idol_group, member_name, condition, photos, status_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Listing>(&query)
            .bind(owner_id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(&input.idol_group)
            .bind(&input.member_name)
            .bind(&input.condition)
            .bind(photos)
            .bind(ListingStatus::Active.id())
            .fetch_one(pool)
            .await
    }

    /// Find a listing by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Listing>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM listings WHERE id = $1");
        sqlx::query_as::<_, Listing>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// True iff the listing exists, is Active, and no proposal holds it.
    pub async fn is_available(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS( \
                SELECT 1 FROM listings \
                WHERE id = $1 AND status_id = $2 AND locked_by_proposal_id IS NULL \
             )",
        )
        .bind(id)
        .bind(ListingStatus::Active.id())
        .fetch_one(pool)
        .await
    }

    /// Atomically lock a listing to a proposal.
    ///
    /// Returns `false` if the listing was not available (already locked,
    /// traded, deleted, or missing) — the caller lost the race.
    pub async fn lock(
        pool: &PgPool,
        listing_id: DbId,
        proposal_id: DbId,
        now: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE listings \
             SET status_id = $2, locked_by_proposal_id = $3, updated_at = $4 \
             WHERE id = $1 AND status_id = $5 AND locked_by_proposal_id IS NULL",
        )
        .bind(listing_id)
        .bind(ListingStatus::Locked.id())
        .bind(proposal_id)
        .bind(now)
        .bind(ListingStatus::Active.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Release a listing back to Active and clear its lock holder.
    ///
    /// No-op (not an error) if the listing is not currently locked.
    pub async fn unlock(pool: &PgPool, listing_id: DbId, now: Timestamp) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE listings \
             SET status_id = $2, locked_by_proposal_id = NULL, updated_at = $3 \
             WHERE id = $1 AND status_id = $4",
        )
        .bind(listing_id)
        .bind(ListingStatus::Active.id())
        .bind(now)
        .bind(ListingStatus::Locked.id())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Release every listing locked by the given proposal.
    ///
    /// Returns the number of listings unlocked.
    pub async fn unlock_all_for_proposal(
        pool: &PgPool,
        proposal_id: DbId,
        now: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE listings \
             SET status_id = $2, locked_by_proposal_id = NULL, updated_at = $3 \
             WHERE locked_by_proposal_id = $1",
        )
        .bind(proposal_id)
        .bind(ListingStatus::Active.id())
        .bind(now)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Mark a listing Traded. Only valid from Locked.
    ///
    /// Returns `false` if the listing was not in Locked state.
    pub async fn mark_traded(
        pool: &PgPool,
        listing_id: DbId,
        now: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE listings \
             SET status_id = $2, locked_by_proposal_id = NULL, updated_at = $3 \
             WHERE id = $1 AND status_id = $4",
        )
        .bind(listing_id)
        .bind(ListingStatus::Traded.id())
        .bind(now)
        .bind(ListingStatus::Locked.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Soft-delete a listing. Only valid while Active and unlocked.
    ///
    /// Returns `false` if the listing was locked, traded, or already
    /// deleted.
    pub async fn mark_deleted(
        pool: &PgPool,
        listing_id: DbId,
        now: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE listings \
             SET status_id = $2, updated_at = $3 \
             WHERE id = $1 AND status_id = $4 AND locked_by_proposal_id IS NULL",
        )
        .bind(listing_id)
        .bind(ListingStatus::Deleted.id())
        .bind(now)
        .bind(ListingStatus::Active.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List a user's listings (all statuses except Deleted), newest first.
    pub async fn list_by_owner(
        pool: &PgPool,
        owner_id: DbId,
        params: &ListingListQuery,
    ) -> Result<Vec<Listing>, sqlx::Error> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let offset = params.offset.unwrap_or(0);
        let query = format!(
            "SELECT {COLUMNS} FROM listings \
             WHERE owner_id = $1 AND status_id <> $2 \
             ORDER BY created_at DESC \
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, Listing>(&query)
            .bind(owner_id)
            .bind(ListingStatus::Deleted.id())
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Browse Active listings across all owners, newest first.
    pub async fn browse(
        pool: &PgPool,
        params: &ListingListQuery,
    ) -> Result<Vec<Listing>, sqlx::Error> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let offset = params.offset.unwrap_or(0);
        let query = format!(
            "SELECT {COLUMNS} FROM listings \
             WHERE status_id = $1 \
             ORDER BY created_at DESC \
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Listing>(&query)
            .bind(ListingStatus::Active.id())
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }
}
