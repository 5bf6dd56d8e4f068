//! Periodic expiry sweep for overdue proposals.
//!
//! Runs independently of request traffic: every tick finds Pending
//! proposals past their `expires_at` and pushes each through the same
//! terminal path a user-initiated cancel takes (status transition plus
//! lock release). Safe to run concurrently with requests — the transition
//! is compare-and-set on Pending, so a proposal settled by a user between
//! the query and the sweep is simply skipped.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tradepost_core::clock::{Clock, SystemClock};

use crate::proposals::ProposalEngine;

/// Background service that expires overdue proposals on a fixed interval.
///
/// Constructed once at startup; holds only the proposal engine and a
/// clock. No global state.
pub struct ExpirySweeper {
    engine: Arc<ProposalEngine>,
    clock: Arc<dyn Clock>,
    interval: std::time::Duration,
}

impl ExpirySweeper {
    pub fn new(engine: Arc<ProposalEngine>, interval: std::time::Duration) -> Self {
        Self {
            engine,
            clock: Arc::new(SystemClock),
            interval,
        }
    }

    /// Replace the clock (deterministic tests).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Run the sweep loop until `cancel` is triggered.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "Expiry sweeper started"
        );

        let mut interval = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Expiry sweeper stopping");
                    break;
                }
                _ = interval.tick() => {
                    match self.engine.sweep_expired(self.clock.now()).await {
                        Ok(expired) => {
                            if expired > 0 {
                                tracing::info!(expired, "Expiry sweep: proposals expired");
                            } else {
                                tracing::debug!("Expiry sweep: nothing overdue");
                            }
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Expiry sweep failed");
                        }
                    }
                }
            }
        }
    }
}
