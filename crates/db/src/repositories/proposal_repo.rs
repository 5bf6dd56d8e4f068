//! Repository for the `proposals` and `proposal_items` tables.
//!
//! Creation, acceptance, and finalization each run as one transaction so
//! that proposal status, listing locks, and swap creation commit as a unit
//! or not at all. Status transitions are compare-and-set on the current
//! status; losing the race is reported through the outcome enums, never as
//! a silent overwrite.

use sqlx::PgPool;
use tradepost_core::types::{DbId, Timestamp};

use crate::models::proposal::{
    NewProposal, Proposal, ProposalItem, ProposalListQuery, ProposalWithItems,
};
use crate::models::status::{ItemSide, ListingStatus, ProposalStatus, SwapStatus};
use crate::models::swap::Swap;

/// Column list for `proposals` queries.
const COLUMNS: &str =
    "id, proposer_id, receiver_id, status_id, message, expires_at, created_at, updated_at";

/// Column list for `proposal_items` queries.
const ITEM_COLUMNS: &str = "id, proposal_id, listing_id, side_id, created_at";

/// Column list for `swaps` queries (the accept path returns the new swap).
const SWAP_COLUMNS: &str = "\
    id, proposal_id, party_a_id, party_b_id, status_id, \
    a_confirmed_at, b_confirmed_at, completed_at, \
    meetup_location, meetup_time, meetup_notes, \
    a_meetup_confirmed, b_meetup_confirmed, created_at, updated_at";

/// Maximum page size for proposal listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for proposal listing.
const DEFAULT_LIMIT: i64 = 50;

/// Result of [`ProposalRepo::create`].
#[derive(Debug)]
pub enum CreateOutcome {
    /// The proposal and its items were persisted and every offered listing
    /// is now locked to it.
    Created(ProposalWithItems),
    /// An offered listing was grabbed between the caller's availability
    /// check and the lock attempt; nothing was persisted.
    ListingUnavailable(DbId),
}

/// Result of [`ProposalRepo::accept`].
#[derive(Debug)]
pub enum AcceptOutcome {
    /// The proposal is now Accepted and this swap was created.
    Accepted(Swap),
    /// A requested listing was no longer available — a competing proposal
    /// won its lock first. Nothing was changed.
    ListingUnavailable(DbId),
    /// The proposal had already left Pending. Nothing was changed.
    NotPending,
}

/// Provides lifecycle operations for proposals.
pub struct ProposalRepo;

impl ProposalRepo {
    /// Persist a new Pending proposal with its item set, locking every
    /// offered listing to it, all in one transaction.
    pub async fn create(pool: &PgPool, input: &NewProposal) -> Result<CreateOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let insert = format!(
            "INSERT INTO proposals (proposer_id, receiver_id, status_id, message, expires_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        let proposal = sqlx::query_as::<_, Proposal>(&insert)
            .bind(input.proposer_id)
            .bind(input.receiver_id)
            .bind(ProposalStatus::Pending.id())
            .bind(&input.message)
            .bind(input.expires_at)
            .fetch_one(&mut *tx)
            .await?;

        let mut items = Vec::new();
        for &listing_id in &input.offered_listing_ids {
            items.push(Self::insert_item(&mut tx, proposal.id, listing_id, ItemSide::Offered).await?);
        }
        for &listing_id in &input.requested_listing_ids {
            items.push(
                Self::insert_item(&mut tx, proposal.id, listing_id, ItemSide::Requested).await?,
            );
        }

        // Only the proposer's own items are committed up front; requested
        // listings stay free until the receiver consents by accepting.
        // Locks are taken in listing-id order so concurrent transactions
        // over overlapping sets cannot deadlock.
        let mut to_lock = input.offered_listing_ids.clone();
        to_lock.sort_unstable();
        for listing_id in to_lock {
            if !Self::lock_listing(&mut tx, listing_id, proposal.id, proposal.created_at).await? {
                tx.rollback().await?;
                return Ok(CreateOutcome::ListingUnavailable(listing_id));
            }
        }

        tx.commit().await?;
        Ok(CreateOutcome::Created(ProposalWithItems { proposal, items }))
    }

    /// Accept a Pending proposal: lock every requested listing, transition
    /// the status, and create the swap — all or nothing.
    ///
    /// Party A of the swap is the receiver, party B the proposer.
    pub async fn accept(
        pool: &PgPool,
        proposal_id: DbId,
        now: Timestamp,
    ) -> Result<AcceptOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE proposals SET status_id = $2, updated_at = $3 \
             WHERE id = $1 AND status_id = $4",
        )
        .bind(proposal_id)
        .bind(ProposalStatus::Accepted.id())
        .bind(now)
        .bind(ProposalStatus::Pending.id())
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(AcceptOutcome::NotPending);
        }

        // Listing-id order, matching the creation path's lock order.
        let requested: Vec<(DbId,)> = sqlx::query_as(
            "SELECT listing_id FROM proposal_items \
             WHERE proposal_id = $1 AND side_id = $2 \
             ORDER BY listing_id",
        )
        .bind(proposal_id)
        .bind(ItemSide::Requested.id())
        .fetch_all(&mut *tx)
        .await?;

        for (listing_id,) in requested {
            if !Self::lock_listing(&mut tx, listing_id, proposal_id, now).await? {
                tx.rollback().await?;
                return Ok(AcceptOutcome::ListingUnavailable(listing_id));
            }
        }

        let proposal: Proposal = {
            let query = format!("SELECT {COLUMNS} FROM proposals WHERE id = $1");
            sqlx::query_as(&query)
                .bind(proposal_id)
                .fetch_one(&mut *tx)
                .await?
        };

        let insert_swap = format!(
            "INSERT INTO swaps (proposal_id, party_a_id, party_b_id, status_id) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {SWAP_COLUMNS}"
        );
        let swap = sqlx::query_as::<_, Swap>(&insert_swap)
            .bind(proposal_id)
            .bind(proposal.receiver_id)
            .bind(proposal.proposer_id)
            .bind(SwapStatus::InProgress.id())
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(AcceptOutcome::Accepted(swap))
    }

    /// Move a Pending proposal into a terminal state (Rejected, Cancelled,
    /// or Expired) and release every listing it holds, in one transaction.
    ///
    /// Returns `false` (and changes nothing) if the proposal had already
    /// left Pending.
    pub async fn finalize(
        pool: &PgPool,
        proposal_id: DbId,
        to_status: ProposalStatus,
        now: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE proposals SET status_id = $2, updated_at = $3 \
             WHERE id = $1 AND status_id = $4",
        )
        .bind(proposal_id)
        .bind(to_status.id())
        .bind(now)
        .bind(ProposalStatus::Pending.id())
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        // While Pending only offered-side listings carry this lock holder,
        // so this releases exactly the proposer's committed items.
        sqlx::query(
            "UPDATE listings \
             SET status_id = $2, locked_by_proposal_id = NULL, updated_at = $3 \
             WHERE locked_by_proposal_id = $1",
        )
        .bind(proposal_id)
        .bind(ListingStatus::Active.id())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Find a proposal by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Proposal>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM proposals WHERE id = $1");
        sqlx::query_as::<_, Proposal>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a proposal with its items.
    pub async fn find_with_items(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<ProposalWithItems>, sqlx::Error> {
        let Some(proposal) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };
        let items = Self::list_items(pool, id).await?;
        Ok(Some(ProposalWithItems { proposal, items }))
    }

    /// List a proposal's items in insertion order.
    pub async fn list_items(
        pool: &PgPool,
        proposal_id: DbId,
    ) -> Result<Vec<ProposalItem>, sqlx::Error> {
        let query = format!(
            "SELECT {ITEM_COLUMNS} FROM proposal_items \
             WHERE proposal_id = $1 \
             ORDER BY id"
        );
        sqlx::query_as::<_, ProposalItem>(&query)
            .bind(proposal_id)
            .fetch_all(pool)
            .await
    }

    /// True iff the proposer already has a Pending proposal requesting any
    /// of the given listings.
    pub async fn exists_pending_requesting(
        pool: &PgPool,
        proposer_id: DbId,
        listing_ids: &[DbId],
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS( \
                SELECT 1 FROM proposals p \
                JOIN proposal_items pi ON pi.proposal_id = p.id \
                WHERE p.proposer_id = $1 \
                  AND p.status_id = $2 \
                  AND pi.side_id = $3 \
                  AND pi.listing_id = ANY($4) \
             )",
        )
        .bind(proposer_id)
        .bind(ProposalStatus::Pending.id())
        .bind(ItemSide::Requested.id())
        .bind(listing_ids)
        .fetch_one(pool)
        .await
    }

    /// List proposals sent by a user, newest first.
    pub async fn list_by_proposer(
        pool: &PgPool,
        proposer_id: DbId,
        params: &ProposalListQuery,
    ) -> Result<Vec<Proposal>, sqlx::Error> {
        Self::list_for_column(pool, "proposer_id", proposer_id, params).await
    }

    /// List proposals received by a user, newest first.
    pub async fn list_by_receiver(
        pool: &PgPool,
        receiver_id: DbId,
        params: &ProposalListQuery,
    ) -> Result<Vec<Proposal>, sqlx::Error> {
        Self::list_for_column(pool, "receiver_id", receiver_id, params).await
    }

    /// Pending proposals whose `expires_at` has passed, oldest first.
    pub async fn list_expired_pending(
        pool: &PgPool,
        now: Timestamp,
    ) -> Result<Vec<Proposal>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM proposals \
             WHERE status_id = $1 AND expires_at < $2 \
             ORDER BY expires_at ASC"
        );
        sqlx::query_as::<_, Proposal>(&query)
            .bind(ProposalStatus::Pending.id())
            .bind(now)
            .fetch_all(pool)
            .await
    }

    /// Shared listing query over a user-reference column.
    async fn list_for_column(
        pool: &PgPool,
        column: &str,
        user_id: DbId,
        params: &ProposalListQuery,
    ) -> Result<Vec<Proposal>, sqlx::Error> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let offset = params.offset.unwrap_or(0);
        let query = format!(
            "SELECT {COLUMNS} FROM proposals \
             WHERE {column} = $1 \
             ORDER BY created_at DESC \
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Proposal>(&query)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Insert one proposal item inside the creation transaction.
    async fn insert_item(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        proposal_id: DbId,
        listing_id: DbId,
        side: ItemSide,
    ) -> Result<ProposalItem, sqlx::Error> {
        let query = format!(
            "INSERT INTO proposal_items (proposal_id, listing_id, side_id) \
             VALUES ($1, $2, $3) \
             RETURNING {ITEM_COLUMNS}"
        );
        sqlx::query_as::<_, ProposalItem>(&query)
            .bind(proposal_id)
            .bind(listing_id)
            .bind(side.id())
            .fetch_one(&mut **tx)
            .await
    }

    /// Compare-and-set lock acquisition inside a transaction. Succeeds only
    /// if the listing is Active with no current holder.
    async fn lock_listing(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
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
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
