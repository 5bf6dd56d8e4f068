//! Event kind names published by the exchange engine.
//!
//! Dot-separated `entity.transition` names; one constant per state change
//! so subscribers never match on string literals.

pub const PROPOSAL_CREATED: &str = "proposal.created";
pub const PROPOSAL_ACCEPTED: &str = "proposal.accepted";
pub const PROPOSAL_REJECTED: &str = "proposal.rejected";
pub const PROPOSAL_CANCELLED: &str = "proposal.cancelled";
pub const PROPOSAL_EXPIRED: &str = "proposal.expired";

pub const SWAP_CREATED: &str = "swap.created";
pub const SWAP_COMPLETED: &str = "swap.completed";
pub const SWAP_MEETUP_SET: &str = "swap.meetup_set";
pub const SWAP_MEETUP_CONFIRMED: &str = "swap.meetup_confirmed";
