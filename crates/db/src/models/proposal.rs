//! Proposal and proposal-item entity models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tradepost_core::types::{DbId, Timestamp};

use super::status::StatusId;

/// A row from the `proposals` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Proposal {
    pub id: DbId,
    pub proposer_id: DbId,
    pub receiver_id: DbId,
    pub status_id: StatusId,
    pub message: Option<String>,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `proposal_items` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProposalItem {
    pub id: DbId,
    pub proposal_id: DbId,
    pub listing_id: DbId,
    pub side_id: StatusId,
    pub created_at: Timestamp,
}

/// A proposal together with its ordered item set.
#[derive(Debug, Clone, Serialize)]
pub struct ProposalWithItems {
    #[serde(flatten)]
    pub proposal: Proposal,
    pub items: Vec<ProposalItem>,
}

/// DTO for creating a proposal.
///
/// `requested_listing_ids` must be non-empty; the receiver is derived from
/// the owner of the first requested listing. `offered_listing_ids` may be
/// empty (a pure request).
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProposal {
    pub offered_listing_ids: Vec<DbId>,
    pub requested_listing_ids: Vec<DbId>,
    pub message: Option<String>,
}

/// Fully-resolved insert input for [`ProposalRepo::create`].
///
/// [`ProposalRepo::create`]: crate::repositories::ProposalRepo::create
#[derive(Debug, Clone)]
pub struct NewProposal {
    pub proposer_id: DbId,
    pub receiver_id: DbId,
    pub message: Option<String>,
    pub expires_at: Timestamp,
    pub offered_listing_ids: Vec<DbId>,
    pub requested_listing_ids: Vec<DbId>,
}

/// Pagination parameters for proposal queries.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProposalListQuery {
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}
