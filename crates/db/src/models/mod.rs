//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts
//! - Query DTOs for list operations where applicable

pub mod listing;
pub mod proposal;
pub mod status;
pub mod swap;
pub mod user;
