//! Proposal lifecycle engine.
//!
//! Owns the PENDING -> {ACCEPTED, REJECTED, CANCELLED, EXPIRED} state
//! machine and drives listing locking around it. Asymmetric permissions:
//! only the receiver may accept or reject, only the proposer may cancel,
//! and only the sweeper expires.

use std::sync::Arc;

use tradepost_core::clock::{Clock, SystemClock};
use tradepost_core::error::CoreError;
use tradepost_core::proposal::state_machine;
use tradepost_core::types::{DbId, Timestamp};
use tradepost_db::models::listing::Listing;
use tradepost_db::models::proposal::{
    CreateProposal, NewProposal, Proposal, ProposalListQuery, ProposalWithItems,
};
use tradepost_db::models::status::ProposalStatus;
use tradepost_db::models::swap::Swap;
use tradepost_db::repositories::{AcceptOutcome, CreateOutcome, ListingRepo, ProposalRepo};
use tradepost_db::DbPool;
use tradepost_events::{kinds, EventBus, TradeEvent};

use crate::accounts::AccountResolver;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};

/// Which end of a proposal a user sits on, for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalRole {
    Sent,
    Received,
}

/// The proposal lifecycle engine.
pub struct ProposalEngine {
    pool: DbPool,
    bus: Arc<EventBus>,
    accounts: Arc<dyn AccountResolver>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl ProposalEngine {
    pub fn new(
        pool: DbPool,
        bus: Arc<EventBus>,
        accounts: Arc<dyn AccountResolver>,
        config: EngineConfig,
    ) -> Self {
        Self {
            pool,
            bus,
            accounts,
            clock: Arc::new(SystemClock),
            config,
        }
    }

    /// Replace the clock (deterministic tests).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Create a Pending proposal.
    ///
    /// The receiver is derived from the owner of the first requested
    /// listing. Every involved listing must be available; offered listings
    /// must belong to the proposer and are locked to the proposal at
    /// creation. Requested listings stay free until acceptance — the
    /// moment the receiver consents.
    pub async fn create(
        &self,
        proposer_id: DbId,
        input: &CreateProposal,
    ) -> EngineResult<ProposalWithItems> {
        if input.requested_listing_ids.is_empty() {
            return Err(
                CoreError::Validation("at least one requested listing is required".into()).into(),
            );
        }

        self.accounts.get_user(proposer_id).await?;

        let first_requested = self.fetch_listing(input.requested_listing_ids[0]).await?;
        let receiver_id = first_requested.owner_id;
        if proposer_id == receiver_id {
            return Err(CoreError::BusinessRule("cannot trade with yourself".into()).into());
        }

        if ProposalRepo::exists_pending_requesting(
            &self.pool,
            proposer_id,
            &input.requested_listing_ids,
        )
        .await?
        {
            return Err(CoreError::Conflict(
                "a pending proposal for one of these listings already exists".into(),
            )
            .into());
        }

        for &listing_id in &input.offered_listing_ids {
            let listing = self.fetch_listing(listing_id).await?;
            if listing.owner_id != proposer_id {
                return Err(CoreError::BusinessRule(format!(
                    "offered listing {listing_id} is not owned by the proposer"
                ))
                .into());
            }
            Self::ensure_available(&listing)?;
        }
        for &listing_id in &input.requested_listing_ids {
            let listing = self.fetch_listing(listing_id).await?;
            Self::ensure_available(&listing)?;
        }

        let now = self.clock.now();
        let new = NewProposal {
            proposer_id,
            receiver_id,
            message: input.message.clone(),
            expires_at: now + self.config.proposal_ttl(),
            offered_listing_ids: input.offered_listing_ids.clone(),
            requested_listing_ids: input.requested_listing_ids.clone(),
        };

        match ProposalRepo::create(&self.pool, &new).await? {
            CreateOutcome::Created(proposal) => {
                tracing::info!(
                    proposal_id = proposal.proposal.id,
                    proposer_id,
                    receiver_id,
                    item_count = proposal.items.len(),
                    "Proposal created"
                );
                self.bus.publish(
                    TradeEvent::new(kinds::PROPOSAL_CREATED)
                        .with_entity("proposal", proposal.proposal.id)
                        .with_actor(proposer_id),
                );
                Ok(proposal)
            }
            CreateOutcome::ListingUnavailable(listing_id) => Err(CoreError::Conflict(format!(
                "listing {listing_id} was locked by another proposal"
            ))
            .into()),
        }
    }

    /// Accept a Pending proposal. Receiver only.
    ///
    /// Locks the requested listings, transitions the proposal, and creates
    /// the swap as one transactional unit. When two proposals compete for
    /// the same requested listing, whichever accept wins the listing lock
    /// wins; the other fails with a conflict.
    pub async fn accept(
        &self,
        proposal_id: DbId,
        caller_id: DbId,
    ) -> EngineResult<(ProposalWithItems, Swap)> {
        let proposal = self.fetch_proposal(proposal_id).await?;
        if proposal.receiver_id != caller_id {
            return Err(
                CoreError::Unauthorized("only the receiver can accept a proposal".into()).into(),
            );
        }
        Self::ensure_pending(proposal.status_id)?;

        let swap = match ProposalRepo::accept(&self.pool, proposal_id, self.clock.now()).await? {
            AcceptOutcome::Accepted(swap) => swap,
            AcceptOutcome::ListingUnavailable(listing_id) => {
                return Err(CoreError::Conflict(format!(
                    "listing {listing_id} is no longer available"
                ))
                .into());
            }
            AcceptOutcome::NotPending => {
                // The pre-check above saw Pending; the caller's view went
                // stale between read and write.
                return Err(CoreError::Conflict(
                    "proposal was concurrently transitioned".into(),
                )
                .into());
            }
        };

        tracing::info!(
            proposal_id,
            swap_id = swap.id,
            caller_id,
            "Proposal accepted"
        );
        self.bus.publish(
            TradeEvent::new(kinds::PROPOSAL_ACCEPTED)
                .with_entity("proposal", proposal_id)
                .with_actor(caller_id)
                .with_payload(serde_json::json!({ "swap_id": swap.id })),
        );
        self.bus.publish(
            TradeEvent::new(kinds::SWAP_CREATED)
                .with_entity("swap", swap.id)
                .with_actor(caller_id),
        );

        let accepted = self.get(proposal_id).await?;
        Ok((accepted, swap))
    }

    /// Reject a Pending proposal. Receiver only.
    pub async fn reject(
        &self,
        proposal_id: DbId,
        caller_id: DbId,
    ) -> EngineResult<ProposalWithItems> {
        let proposal = self.fetch_proposal(proposal_id).await?;
        if proposal.receiver_id != caller_id {
            return Err(
                CoreError::Unauthorized("only the receiver can reject a proposal".into()).into(),
            );
        }
        Self::ensure_pending(proposal.status_id)?;
        self.finalize(proposal_id, ProposalStatus::Rejected, Some(caller_id))
            .await?;
        self.get(proposal_id).await
    }

    /// Cancel a Pending proposal. Proposer only.
    pub async fn cancel(
        &self,
        proposal_id: DbId,
        caller_id: DbId,
    ) -> EngineResult<ProposalWithItems> {
        let proposal = self.fetch_proposal(proposal_id).await?;
        if proposal.proposer_id != caller_id {
            return Err(
                CoreError::Unauthorized("only the proposer can cancel a proposal".into()).into(),
            );
        }
        Self::ensure_pending(proposal.status_id)?;
        self.finalize(proposal_id, ProposalStatus::Cancelled, Some(caller_id))
            .await?;
        self.get(proposal_id).await
    }

    /// Expire every Pending proposal whose deadline has passed.
    ///
    /// Shares the terminal path with cancel: transition plus lock release.
    /// One failing proposal is logged and skipped; the sweep continues.
    /// Returns the number of proposals expired.
    pub async fn sweep_expired(&self, now: Timestamp) -> EngineResult<u64> {
        let overdue = ProposalRepo::list_expired_pending(&self.pool, now).await?;
        let mut expired = 0u64;

        for proposal in &overdue {
            match ProposalRepo::finalize(&self.pool, proposal.id, ProposalStatus::Expired, now)
                .await
            {
                Ok(true) => {
                    expired += 1;
                    self.bus.publish(
                        TradeEvent::new(kinds::PROPOSAL_EXPIRED)
                            .with_entity("proposal", proposal.id),
                    );
                    tracing::info!(proposal_id = proposal.id, "Proposal expired");
                }
                Ok(false) => {
                    // Left Pending between the query and the transition;
                    // the user-initiated path already settled it.
                    tracing::debug!(proposal_id = proposal.id, "Proposal no longer pending");
                }
                Err(e) => {
                    tracing::error!(
                        proposal_id = proposal.id,
                        error = %e,
                        "Failed to expire proposal"
                    );
                }
            }
        }

        Ok(expired)
    }

    /// Fetch a proposal with its items.
    pub async fn get(&self, proposal_id: DbId) -> EngineResult<ProposalWithItems> {
        ProposalRepo::find_with_items(&self.pool, proposal_id)
            .await?
            .ok_or_else(|| {
                EngineError::Core(CoreError::NotFound {
                    entity: "Proposal",
                    id: proposal_id,
                })
            })
    }

    /// List proposals a user has sent or received, newest first.
    pub async fn list_for_user(
        &self,
        user_id: DbId,
        role: ProposalRole,
        params: &ProposalListQuery,
    ) -> EngineResult<Vec<Proposal>> {
        let proposals = match role {
            ProposalRole::Sent => ProposalRepo::list_by_proposer(&self.pool, user_id, params).await?,
            ProposalRole::Received => {
                ProposalRepo::list_by_receiver(&self.pool, user_id, params).await?
            }
        };
        Ok(proposals)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Shared terminal transition used by reject, cancel, and expiry.
    async fn finalize(
        &self,
        proposal_id: DbId,
        to_status: ProposalStatus,
        actor: Option<DbId>,
    ) -> EngineResult<()> {
        let finalized =
            ProposalRepo::finalize(&self.pool, proposal_id, to_status, self.clock.now()).await?;
        if !finalized {
            return Err(CoreError::Conflict(
                "proposal was concurrently transitioned".into(),
            )
            .into());
        }

        let kind = match to_status {
            ProposalStatus::Rejected => kinds::PROPOSAL_REJECTED,
            ProposalStatus::Cancelled => kinds::PROPOSAL_CANCELLED,
            _ => kinds::PROPOSAL_EXPIRED,
        };
        let mut event = TradeEvent::new(kind).with_entity("proposal", proposal_id);
        if let Some(actor_id) = actor {
            event = event.with_actor(actor_id);
        }
        self.bus.publish(event);

        tracing::info!(
            proposal_id,
            status = state_machine::status_name(to_status.id()),
            "Proposal finalized"
        );
        Ok(())
    }

    async fn fetch_proposal(&self, proposal_id: DbId) -> EngineResult<Proposal> {
        ProposalRepo::find_by_id(&self.pool, proposal_id)
            .await?
            .ok_or_else(|| {
                EngineError::Core(CoreError::NotFound {
                    entity: "Proposal",
                    id: proposal_id,
                })
            })
    }

    async fn fetch_listing(&self, listing_id: DbId) -> EngineResult<Listing> {
        ListingRepo::find_by_id(&self.pool, listing_id)
            .await?
            .ok_or_else(|| {
                EngineError::Core(CoreError::NotFound {
                    entity: "Listing",
                    id: listing_id,
                })
            })
    }

    fn ensure_available(listing: &Listing) -> EngineResult<()> {
        if !tradepost_core::listing::is_available(listing.status_id, listing.locked_by_proposal_id)
        {
            return Err(CoreError::BusinessRule(format!(
                "listing {} is not available",
                listing.id
            ))
            .into());
        }
        Ok(())
    }

    fn ensure_pending(status_id: i16) -> EngineResult<()> {
        if status_id != ProposalStatus::Pending.id() {
            return Err(CoreError::InvalidTransition {
                entity: "Proposal",
                status: state_machine::status_name(status_id).to_string(),
            }
            .into());
        }
        Ok(())
    }
}
