//! Swap settlement engine.
//!
//! A swap exists from the moment its proposal is accepted. Each party
//! independently confirms receipt; the second confirmation completes the
//! swap and marks every involved listing Traded. Confirmation is
//! idempotent per party, and completion is irreversible.

use std::sync::Arc;

use tradepost_core::clock::{Clock, SystemClock};
use tradepost_core::error::CoreError;
use tradepost_core::swap::{self, SwapParty};
use tradepost_core::types::DbId;
use tradepost_db::models::status::SwapStatus;
use tradepost_db::models::swap::{SetMeetup, Swap, SwapListQuery};
use tradepost_db::repositories::SwapRepo;
use tradepost_db::DbPool;
use tradepost_events::{kinds, EventBus, TradeEvent};

use crate::error::{EngineError, EngineResult};

/// The swap settlement engine.
pub struct SwapEngine {
    pool: DbPool,
    bus: Arc<EventBus>,
    clock: Arc<dyn Clock>,
}

impl SwapEngine {
    pub fn new(pool: DbPool, bus: Arc<EventBus>) -> Self {
        Self {
            pool,
            bus,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock (deterministic tests).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Record that the caller has received their items.
    ///
    /// Re-confirming by the same party is a no-op returning the current
    /// state. When this call supplies the second confirmation, the swap
    /// transitions to Completed, `completed_at` is stamped once, and all
    /// listings bound to the originating proposal become Traded.
    pub async fn confirm_received(&self, swap_id: DbId, caller_id: DbId) -> EngineResult<Swap> {
        let swap = self.fetch(swap_id).await?;
        let party = Self::party_for(&swap, caller_id)?;
        Self::ensure_in_progress(&swap)?;

        let already_confirmed = match party {
            SwapParty::A => swap.a_confirmed_at.is_some(),
            SwapParty::B => swap.b_confirmed_at.is_some(),
        };
        if already_confirmed {
            return Ok(swap);
        }

        let now = self.clock.now();
        // A false result means a concurrent call got there first; the
        // re-read below reflects whatever state won.
        SwapRepo::confirm(&self.pool, swap_id, party, now).await?;

        let swap = self.fetch(swap_id).await?;
        if swap.status_id == SwapStatus::InProgress.id()
            && swap::is_complete(swap.a_confirmed_at, swap.b_confirmed_at)
        {
            let completed =
                SwapRepo::complete(&self.pool, swap_id, swap.proposal_id, now).await?;
            if completed {
                tracing::info!(swap_id, caller_id, "Swap completed");
                self.bus.publish(
                    TradeEvent::new(kinds::SWAP_COMPLETED)
                        .with_entity("swap", swap_id)
                        .with_actor(caller_id),
                );
            }
            return self.fetch(swap_id).await;
        }

        tracing::info!(swap_id, caller_id, "Receipt confirmed");
        Ok(swap)
    }

    /// Fetch a swap. Parties only.
    pub async fn get_by_id(&self, swap_id: DbId, caller_id: DbId) -> EngineResult<Swap> {
        let swap = self.fetch(swap_id).await?;
        Self::party_for(&swap, caller_id)?;
        Ok(swap)
    }

    /// List swaps the user participates in, newest first.
    pub async fn list_for_user(
        &self,
        user_id: DbId,
        params: &SwapListQuery,
    ) -> EngineResult<Vec<Swap>> {
        Ok(SwapRepo::list_for_user(&self.pool, user_id, params).await?)
    }

    /// Set or replace the meetup details. Parties only; not permitted once
    /// the swap has settled.
    ///
    /// Changing the details resets both parties' meetup confirmations so
    /// the new plan must be re-confirmed.
    pub async fn set_meetup(
        &self,
        swap_id: DbId,
        caller_id: DbId,
        input: &SetMeetup,
    ) -> EngineResult<Swap> {
        let swap = self.fetch(swap_id).await?;
        Self::party_for(&swap, caller_id)?;
        Self::ensure_in_progress(&swap)?;

        let updated = SwapRepo::set_meetup(&self.pool, swap_id, input, self.clock.now())
            .await?
            .ok_or(EngineError::Core(CoreError::NotFound {
                entity: "Swap",
                id: swap_id,
            }))?;

        tracing::info!(swap_id, caller_id, location = %input.location, "Meetup set");
        self.bus.publish(
            TradeEvent::new(kinds::SWAP_MEETUP_SET)
                .with_entity("swap", swap_id)
                .with_actor(caller_id),
        );
        Ok(updated)
    }

    /// Confirm the current meetup plan. Parties only; idempotent.
    pub async fn confirm_meetup(&self, swap_id: DbId, caller_id: DbId) -> EngineResult<Swap> {
        let swap = self.fetch(swap_id).await?;
        let party = Self::party_for(&swap, caller_id)?;
        Self::ensure_in_progress(&swap)?;

        let already_confirmed = match party {
            SwapParty::A => swap.a_meetup_confirmed,
            SwapParty::B => swap.b_meetup_confirmed,
        };
        if already_confirmed {
            return Ok(swap);
        }

        let updated = SwapRepo::confirm_meetup(&self.pool, swap_id, party, self.clock.now())
            .await?
            .ok_or(EngineError::Core(CoreError::NotFound {
                entity: "Swap",
                id: swap_id,
            }))?;

        self.bus.publish(
            TradeEvent::new(kinds::SWAP_MEETUP_CONFIRMED)
                .with_entity("swap", swap_id)
                .with_actor(caller_id),
        );
        Ok(updated)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    async fn fetch(&self, swap_id: DbId) -> EngineResult<Swap> {
        SwapRepo::find_by_id(&self.pool, swap_id)
            .await?
            .ok_or(EngineError::Core(CoreError::NotFound {
                entity: "Swap",
                id: swap_id,
            }))
    }

    fn party_for(swap: &Swap, caller_id: DbId) -> EngineResult<SwapParty> {
        swap::party_of(swap.party_a_id, swap.party_b_id, caller_id).ok_or_else(|| {
            EngineError::Core(CoreError::Unauthorized(
                "caller is not a party to this swap".into(),
            ))
        })
    }

    fn ensure_in_progress(swap: &Swap) -> EngineResult<()> {
        if swap.status_id != SwapStatus::InProgress.id() {
            return Err(CoreError::InvalidTransition {
                entity: "Swap",
                status: swap::status_name(swap.status_id).to_string(),
            }
            .into());
        }
        Ok(())
    }
}
