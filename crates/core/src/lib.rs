//! Pure domain layer for the tradepost exchange engine.
//!
//! Zero internal deps by design: the DB, events, and engine crates all
//! build on the types, error taxonomy, and transition tables defined here.

pub mod clock;
pub mod error;
pub mod listing;
pub mod proposal;
pub mod swap;
pub mod types;
