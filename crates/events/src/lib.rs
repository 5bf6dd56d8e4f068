//! Tradepost event bus.
//!
//! State-change events are the engine's outward collaborator surface: a
//! notification or chat system subscribes here. The engine publishes each
//! event synchronously at the point its state transition commits, so the
//! stream never diverges from the persisted state. Delivery beyond the
//! in-process broadcast channel is out of scope.

pub mod bus;
pub mod kinds;

pub use bus::{EventBus, TradeEvent};
