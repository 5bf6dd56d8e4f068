//! Repository for the `swaps` table.
//!
//! Confirmation writes are conditional on the timestamp still being null,
//! so repeated confirmations by the same party change nothing. Completion
//! is a compare-and-set from InProgress guarded on both timestamps being
//! present; the winner of that CAS also marks the traded listings in the
//! same transaction.

use sqlx::PgPool;
use tradepost_core::swap::SwapParty;
use tradepost_core::types::{DbId, Timestamp};

use crate::models::status::{ListingStatus, SwapStatus};
use crate::models::swap::{SetMeetup, Swap, SwapListQuery};

/// Column list for `swaps` queries.
const COLUMNS: &str = "\
    id, proposal_id, party_a_id, party_b_id, status_id, \
    a_confirmed_at, b_confirmed_at, completed_at, \
    meetup_location, meetup_time, meetup_notes, \
    a_meetup_confirmed, b_meetup_confirmed, created_at, updated_at";

/// Maximum page size for swap listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for swap listing.
const DEFAULT_LIMIT: i64 = 50;

/// Provides settlement operations for swaps.
pub struct SwapRepo;

impl SwapRepo {
    /// Find a swap by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Swap>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM swaps WHERE id = $1");
        sqlx::query_as::<_, Swap>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find the swap created from a proposal, if any.
    pub async fn find_by_proposal(
        pool: &PgPool,
        proposal_id: DbId,
    ) -> Result<Option<Swap>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM swaps WHERE proposal_id = $1");
        sqlx::query_as::<_, Swap>(&query)
            .bind(proposal_id)
            .fetch_optional(pool)
            .await
    }

    /// List swaps where the user is either party, newest first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        params: &SwapListQuery,
    ) -> Result<Vec<Swap>, sqlx::Error> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let offset = params.offset.unwrap_or(0);
        let query = format!(
            "SELECT {COLUMNS} FROM swaps \
             WHERE party_a_id = $1 OR party_b_id = $1 \
             ORDER BY created_at DESC \
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Swap>(&query)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Record one party's receipt confirmation.
    ///
    /// Conditional on the party's timestamp still being null and the swap
    /// still being InProgress; returns `false` when nothing was written
    /// (already confirmed, or the swap left InProgress first).
    pub async fn confirm(
        pool: &PgPool,
        swap_id: DbId,
        party: SwapParty,
        now: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let column = match party {
            SwapParty::A => "a_confirmed_at",
            SwapParty::B => "b_confirmed_at",
        };
        let query = format!(
            "UPDATE swaps SET {column} = $2, updated_at = $2 \
             WHERE id = $1 AND {column} IS NULL AND status_id = $3"
        );
        let result = sqlx::query(&query)
            .bind(swap_id)
            .bind(now)
            .bind(SwapStatus::InProgress.id())
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Complete a swap whose parties have both confirmed, marking every
    /// listing bound to the originating proposal as Traded, in one
    /// transaction.
    ///
    /// Returns `false` when the CAS found the swap already completed (a
    /// concurrent confirmation won) or not yet doubly confirmed.
    pub async fn complete(
        pool: &PgPool,
        swap_id: DbId,
        proposal_id: DbId,
        now: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE swaps \
             SET status_id = $2, completed_at = $3, updated_at = $3 \
             WHERE id = $1 AND status_id = $4 \
               AND a_confirmed_at IS NOT NULL AND b_confirmed_at IS NOT NULL",
        )
        .bind(swap_id)
        .bind(SwapStatus::Completed.id())
        .bind(now)
        .bind(SwapStatus::InProgress.id())
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            "UPDATE listings \
             SET status_id = $2, locked_by_proposal_id = NULL, updated_at = $3 \
             WHERE status_id = $4 AND id IN ( \
                 SELECT listing_id FROM proposal_items WHERE proposal_id = $1 \
             )",
        )
        .bind(proposal_id)
        .bind(ListingStatus::Traded.id())
        .bind(now)
        .bind(ListingStatus::Locked.id())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Set or replace the meetup details, resetting both parties' meetup
    /// confirmations (changed info must be re-confirmed).
    pub async fn set_meetup(
        pool: &PgPool,
        swap_id: DbId,
        input: &SetMeetup,
        now: Timestamp,
    ) -> Result<Option<Swap>, sqlx::Error> {
        let query = format!(
            "UPDATE swaps \
             SET meetup_location = $2, meetup_time = $3, meetup_notes = $4, \
                 a_meetup_confirmed = FALSE, b_meetup_confirmed = FALSE, \
                 updated_at = $5 \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Swap>(&query)
            .bind(swap_id)
            .bind(&input.location)
            .bind(input.time)
            .bind(&input.notes)
            .bind(now)
            .fetch_optional(pool)
            .await
    }

    /// Record one party's meetup confirmation. Idempotent.
    pub async fn confirm_meetup(
        pool: &PgPool,
        swap_id: DbId,
        party: SwapParty,
        now: Timestamp,
    ) -> Result<Option<Swap>, sqlx::Error> {
        let column = match party {
            SwapParty::A => "a_meetup_confirmed",
            SwapParty::B => "b_meetup_confirmed",
        };
        let query = format!(
            "UPDATE swaps SET {column} = TRUE, updated_at = $2 \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Swap>(&query)
            .bind(swap_id)
            .bind(now)
            .fetch_optional(pool)
            .await
    }
}
