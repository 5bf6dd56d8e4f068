//! Background tasks.
//!
//! Each submodule provides a long-running async loop intended to be
//! spawned via `tokio::spawn`, accepting a [`CancellationToken`] for
//! graceful shutdown.
//!
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

pub mod expiry;

pub use expiry::ExpirySweeper;
