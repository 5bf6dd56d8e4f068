//! Proposal lifecycle constants and state machine.
//!
//! This module lives in `core` (zero internal deps) so it can be used by
//! both the repository layer and the background sweeper without pulling in
//! the database crate.

/// Default proposal time-to-live, applied at creation: `expires_at =
/// created_at + PROPOSAL_TTL_DAYS` unless overridden by configuration.
pub const DEFAULT_TTL_DAYS: i64 = 7;

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Proposal status IDs matching `proposal_statuses` seed data (1-based
/// SMALLSERIAL).
///
/// PENDING is the only non-terminal state. Every other state is terminal
/// and immutable once reached.
pub mod state_machine {
    /// Returns the set of valid target status IDs reachable from `from_status`.
    ///
    /// Terminal states (Accepted=2, Rejected=3, Cancelled=4, Expired=5)
    /// return an empty slice because no further transitions are allowed.
    pub fn valid_transitions(from_status: i16) -> &'static [i16] {
        match from_status {
            // Pending -> Accepted, Rejected, Cancelled, Expired
            1 => &[2, 3, 4, 5],
            // Terminal states
            2 | 3 | 4 | 5 => &[],
            // Unknown status: no transitions allowed
            _ => &[],
        }
    }

    /// Check whether a transition from `from` to `to` is valid.
    pub fn can_transition(from: i16, to: i16) -> bool {
        valid_transitions(from).contains(&to)
    }

    /// Validate a state transition, returning an error message for invalid ones.
    pub fn validate_transition(from: i16, to: i16) -> Result<(), String> {
        if can_transition(from, to) {
            Ok(())
        } else {
            let from_name = status_name(from);
            let to_name = status_name(to);
            Err(format!(
                "Invalid transition: {from_name} ({from}) -> {to_name} ({to})"
            ))
        }
    }

    /// Human-readable name for a status ID (for error messages).
    pub fn status_name(id: i16) -> &'static str {
        match id {
            1 => "Pending",
            2 => "Accepted",
            3 => "Rejected",
            4 => "Cancelled",
            5 => "Expired",
            _ => "Unknown",
        }
    }
}
