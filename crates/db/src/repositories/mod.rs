//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument. Conditional status updates
//! return `bool` from `rows_affected()`; operations that must commit as a
//! unit (proposal creation, acceptance, finalization, swap completion) own
//! a single transaction internally.

pub mod listing_repo;
pub mod proposal_repo;
pub mod swap_repo;
pub mod user_repo;

pub use listing_repo::ListingRepo;
pub use proposal_repo::{AcceptOutcome, CreateOutcome, ProposalRepo};
pub use swap_repo::SwapRepo;
pub use user_repo::UserRepo;
