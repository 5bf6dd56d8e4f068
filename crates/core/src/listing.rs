//! Listing availability rules and condition-grade validation.

use crate::types::DbId;

/// Listing status IDs matching `listing_statuses` seed data (1-based).
pub const STATUS_ACTIVE: i16 = 1;
pub const STATUS_LOCKED: i16 = 2;
pub const STATUS_TRADED: i16 = 3;
pub const STATUS_DELETED: i16 = 4;

/// A listing is available iff it is Active and no proposal holds its lock.
///
/// Invariant everywhere else in the system: `status == Locked` iff
/// `locked_by_proposal_id` is non-null.
pub fn is_available(status_id: i16, locked_by_proposal_id: Option<DbId>) -> bool {
    status_id == STATUS_ACTIVE && locked_by_proposal_id.is_none()
}

/// A listing may be deleted by its owner only while it is Active (an item
/// committed to a live proposal or already traded cannot be withdrawn).
pub fn can_delete(status_id: i16, locked_by_proposal_id: Option<DbId>) -> bool {
    is_available(status_id, locked_by_proposal_id)
}

// ---------------------------------------------------------------------------
// Condition grades
// ---------------------------------------------------------------------------

/// Mint / like-new.
pub const CONDITION_S: &str = "S";

/// Light wear.
pub const CONDITION_A: &str = "A";

/// Visible wear.
pub const CONDITION_B: &str = "B";

/// Heavy wear.
pub const CONDITION_C: &str = "C";

/// All valid condition grades, best first.
pub const VALID_CONDITIONS: &[&str] = &[CONDITION_S, CONDITION_A, CONDITION_B, CONDITION_C];

/// Validate that a condition grade is one of the accepted values.
pub fn validate_condition(condition: &str) -> Result<(), String> {
    if VALID_CONDITIONS.contains(&condition) {
        Ok(())
    } else {
        Err(format!(
            "Invalid condition '{condition}'. Must be one of: {}",
            VALID_CONDITIONS.join(", ")
        ))
    }
}
