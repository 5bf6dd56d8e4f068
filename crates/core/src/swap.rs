//! Swap party resolution and completion derivation.
//!
//! Completion is structural: a swap is complete exactly when both
//! confirmation timestamps are set. No counter or boolean pair to keep in
//! sync — idempotency falls out of the nullable-timestamp model.

use crate::types::{DbId, Timestamp};

/// Which side of a swap a user is on.
///
/// By convention party A is the proposal receiver (the listing owner) and
/// party B is the proposer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapParty {
    A,
    B,
}

/// Resolve which party `user_id` is in a swap, or `None` for outsiders.
pub fn party_of(party_a_id: DbId, party_b_id: DbId, user_id: DbId) -> Option<SwapParty> {
    if user_id == party_a_id {
        Some(SwapParty::A)
    } else if user_id == party_b_id {
        Some(SwapParty::B)
    } else {
        None
    }
}

/// A swap is complete iff both parties have confirmed receipt.
pub fn is_complete(a_confirmed_at: Option<Timestamp>, b_confirmed_at: Option<Timestamp>) -> bool {
    a_confirmed_at.is_some() && b_confirmed_at.is_some()
}

/// Human-readable name for a swap status ID (for error messages).
///
/// IDs match the `swap_statuses` seed data (1-based).
pub fn status_name(id: i16) -> &'static str {
    match id {
        1 => "InProgress",
        2 => "Completed",
        3 => "Canceled",
        _ => "Unknown",
    }
}
