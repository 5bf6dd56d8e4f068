//! Listing entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tradepost_core::types::{DbId, Timestamp};

use super::status::StatusId;

/// A row from the `listings` table.
///
/// Invariant: `status_id == ListingStatus::Locked` iff
/// `locked_by_proposal_id` is non-null (also enforced by a table CHECK).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Listing {
    pub id: DbId,
    pub owner_id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub idol_group: String,
    pub member_name: String,
    pub condition: String,
    /// JSON array of photo paths.
    pub photos: serde_json::Value,
    pub status_id: StatusId,
    pub locked_by_proposal_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new listing.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateListing {
    pub title: String,
    pub description: Option<String>,
    pub idol_group: String,
    pub member_name: String,
    /// Condition grade, one of `S`/`A`/`B`/`C`.
    pub condition: String,
    pub photos: Option<serde_json::Value>,
}

/// Pagination parameters for listing queries.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingListQuery {
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}
