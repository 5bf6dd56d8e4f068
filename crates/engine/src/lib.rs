//! The tradepost exchange lifecycle engine.
//!
//! Owns listing availability and locking, proposal state transitions, and
//! swap dual-confirmation, plus the background sweep that expires overdue
//! proposals. Consumed by a presentation layer through the public methods
//! on [`ListingService`], [`ProposalEngine`], and [`SwapEngine`]; state
//! changes are announced on the [`tradepost_events::EventBus`].

pub mod accounts;
pub mod background;
pub mod config;
pub mod error;
pub mod listings;
pub mod proposals;
pub mod swaps;

pub use accounts::{AccountResolver, PgAccountResolver};
pub use background::ExpirySweeper;
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use listings::ListingService;
pub use proposals::{ProposalEngine, ProposalRole};
pub use swaps::SwapEngine;
