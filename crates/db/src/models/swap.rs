//! Swap entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tradepost_core::types::{DbId, Timestamp};

use super::status::StatusId;

/// A row from the `swaps` table.
///
/// Party A is the proposal receiver (listing owner), party B the proposer.
/// Completion is derived from the two confirmation timestamps: the swap is
/// Completed exactly when both are non-null, and `completed_at` is set once
/// at that transition and never updated again.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Swap {
    pub id: DbId,
    pub proposal_id: DbId,
    pub party_a_id: DbId,
    pub party_b_id: DbId,
    pub status_id: StatusId,
    pub a_confirmed_at: Option<Timestamp>,
    pub b_confirmed_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub meetup_location: Option<String>,
    pub meetup_time: Option<Timestamp>,
    pub meetup_notes: Option<String>,
    pub a_meetup_confirmed: bool,
    pub b_meetup_confirmed: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for setting or replacing a swap's meetup details.
#[derive(Debug, Clone, Deserialize)]
pub struct SetMeetup {
    pub location: String,
    pub time: Timestamp,
    pub notes: Option<String>,
}

/// Pagination parameters for swap queries.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SwapListQuery {
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}
