//! Integration tests for the proposal lifecycle engine.

use std::sync::Arc;

use assert_matches::assert_matches;
use sqlx::PgPool;
use tradepost_core::error::CoreError;
use tradepost_core::types::DbId;
use tradepost_db::models::listing::{CreateListing, Listing};
use tradepost_db::models::proposal::{CreateProposal, ProposalListQuery};
use tradepost_db::models::status::{ItemSide, ListingStatus, ProposalStatus, SwapStatus};
use tradepost_db::models::user::CreateUser;
use tradepost_db::repositories::{ListingRepo, UserRepo};
use tradepost_engine::{
    EngineConfig, EngineError, PgAccountResolver, ProposalEngine, ProposalRole, SwapEngine,
};
use tradepost_events::{kinds, EventBus};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn engines(pool: &PgPool) -> (Arc<EventBus>, ProposalEngine, SwapEngine) {
    let bus = Arc::new(EventBus::default());
    let accounts = Arc::new(PgAccountResolver::new(pool.clone()));
    let proposals = ProposalEngine::new(
        pool.clone(),
        Arc::clone(&bus),
        accounts,
        EngineConfig::default(),
    );
    let swaps = SwapEngine::new(pool.clone(), Arc::clone(&bus));
    (bus, proposals, swaps)
}

async fn seed_user(pool: &PgPool, name: &str) -> DbId {
    UserRepo::create(
        pool,
        &CreateUser {
            display_name: name.to_string(),
            email: format!("{name}@example.com"),
        },
    )
    .await
    .expect("user insert should succeed")
    .id
}

async fn seed_listing(pool: &PgPool, owner_id: DbId, title: &str) -> Listing {
    ListingRepo::create(
        pool,
        owner_id,
        &CreateListing {
            title: title.to_string(),
            description: None,
            idol_group: "Moonrise".to_string(),
            member_name: "Sua".to_string(),
            condition: "A".to_string(),
            photos: None,
        },
    )
    .await
    .expect("listing insert should succeed")
}

fn propose(offered: Vec<DbId>, requested: Vec<DbId>) -> CreateProposal {
    CreateProposal {
        offered_listing_ids: offered,
        requested_listing_ids: requested,
        message: Some("hi".to_string()),
    }
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn create_derives_receiver_and_ttl(pool: PgPool) {
    let (_, proposals, _) = engines(&pool);
    let owner = seed_user(&pool, "owner").await;
    let proposer = seed_user(&pool, "proposer").await;
    let wanted = seed_listing(&pool, owner, "wanted card").await;

    let before = chrono::Utc::now();
    let created = proposals
        .create(proposer, &propose(vec![], vec![wanted.id]))
        .await
        .unwrap();

    assert_eq!(created.proposal.receiver_id, owner);
    assert_eq!(created.proposal.proposer_id, proposer);
    assert_eq!(created.proposal.status_id, ProposalStatus::Pending.id());
    assert_eq!(created.items.len(), 1);
    assert_eq!(created.items[0].side_id, ItemSide::Requested.id());

    // expires_at sits seven days out, give or take the test's runtime.
    let ttl = created.proposal.expires_at - before;
    assert!(ttl >= chrono::Duration::days(7) - chrono::Duration::seconds(5));
    assert!(ttl <= chrono::Duration::days(7) + chrono::Duration::seconds(5));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn create_requires_requested_items(pool: PgPool) {
    let (_, proposals, _) = engines(&pool);
    let proposer = seed_user(&pool, "proposer").await;
    let own = seed_listing(&pool, proposer, "own card").await;

    let err = proposals
        .create(proposer, &propose(vec![own.id], vec![]))
        .await
        .unwrap_err();
    assert_matches!(err, EngineError::Core(CoreError::Validation(_)));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn create_rejects_self_trade(pool: PgPool) {
    let (_, proposals, _) = engines(&pool);
    let proposer = seed_user(&pool, "proposer").await;
    let own = seed_listing(&pool, proposer, "own card").await;

    let err = proposals
        .create(proposer, &propose(vec![], vec![own.id]))
        .await
        .unwrap_err();
    assert_matches!(err, EngineError::Core(CoreError::BusinessRule(_)));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn create_rejects_unavailable_listing(pool: PgPool) {
    let (_, proposals, _) = engines(&pool);
    let owner = seed_user(&pool, "owner").await;
    let proposer = seed_user(&pool, "proposer").await;
    let other = seed_user(&pool, "other").await;
    let wanted = seed_listing(&pool, owner, "wanted card").await;

    // Someone else's accepted proposal already locked the listing.
    let competing = proposals
        .create(other, &propose(vec![], vec![wanted.id]))
        .await
        .unwrap();
    proposals.accept(competing.proposal.id, owner).await.unwrap();

    let err = proposals
        .create(proposer, &propose(vec![], vec![wanted.id]))
        .await
        .unwrap_err();
    assert_matches!(err, EngineError::Core(CoreError::BusinessRule(_)));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn create_rejects_foreign_offered_listing(pool: PgPool) {
    let (_, proposals, _) = engines(&pool);
    let owner = seed_user(&pool, "owner").await;
    let proposer = seed_user(&pool, "proposer").await;
    let wanted = seed_listing(&pool, owner, "wanted card").await;
    let not_mine = seed_listing(&pool, owner, "not my card").await;

    let err = proposals
        .create(proposer, &propose(vec![not_mine.id], vec![wanted.id]))
        .await
        .unwrap_err();
    assert_matches!(err, EngineError::Core(CoreError::BusinessRule(_)));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn create_rejects_unknown_proposer(pool: PgPool) {
    let (_, proposals, _) = engines(&pool);
    let owner = seed_user(&pool, "owner").await;
    let wanted = seed_listing(&pool, owner, "wanted card").await;

    let err = proposals
        .create(9999, &propose(vec![], vec![wanted.id]))
        .await
        .unwrap_err();
    assert_matches!(
        err,
        EngineError::Core(CoreError::NotFound { entity: "User", .. })
    );
}

#[sqlx::test(migrations = "../db/migrations")]
async fn duplicate_pending_proposal_conflicts(pool: PgPool) {
    let (_, proposals, _) = engines(&pool);
    let owner = seed_user(&pool, "owner").await;
    let proposer = seed_user(&pool, "proposer").await;
    let wanted = seed_listing(&pool, owner, "wanted card").await;

    proposals
        .create(proposer, &propose(vec![], vec![wanted.id]))
        .await
        .unwrap();

    let err = proposals
        .create(proposer, &propose(vec![], vec![wanted.id]))
        .await
        .unwrap_err();
    assert_matches!(err, EngineError::Core(CoreError::Conflict(_)));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn create_locks_only_the_offered_side(pool: PgPool) {
    let (_, proposals, _) = engines(&pool);
    let owner = seed_user(&pool, "owner").await;
    let proposer = seed_user(&pool, "proposer").await;
    let offered = seed_listing(&pool, proposer, "offered card").await;
    let wanted = seed_listing(&pool, owner, "wanted card").await;

    let created = proposals
        .create(proposer, &propose(vec![offered.id], vec![wanted.id]))
        .await
        .unwrap();

    let offered = ListingRepo::find_by_id(&pool, offered.id).await.unwrap().unwrap();
    assert_eq!(offered.status_id, ListingStatus::Locked.id());
    assert_eq!(offered.locked_by_proposal_id, Some(created.proposal.id));

    let wanted = ListingRepo::find_by_id(&pool, wanted.id).await.unwrap().unwrap();
    assert_eq!(wanted.status_id, ListingStatus::Active.id());
}

// ---------------------------------------------------------------------------
// Accept / reject / cancel
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn accept_transitions_and_creates_swap(pool: PgPool) {
    let (bus, proposals, _) = engines(&pool);
    let mut rx = bus.subscribe();
    let owner = seed_user(&pool, "owner").await;
    let proposer = seed_user(&pool, "proposer").await;
    let wanted = seed_listing(&pool, owner, "wanted card").await;

    let created = proposals
        .create(proposer, &propose(vec![], vec![wanted.id]))
        .await
        .unwrap();
    let (accepted, swap) = proposals.accept(created.proposal.id, owner).await.unwrap();

    assert_eq!(accepted.proposal.status_id, ProposalStatus::Accepted.id());
    assert_eq!(swap.status_id, SwapStatus::InProgress.id());
    assert_eq!(swap.party_a_id, owner);
    assert_eq!(swap.party_b_id, proposer);
    assert!(swap.a_confirmed_at.is_none());
    assert!(swap.b_confirmed_at.is_none());

    // Created, accepted, and swap-created events, in order.
    assert_eq!(rx.recv().await.unwrap().kind, kinds::PROPOSAL_CREATED);
    let accepted_event = rx.recv().await.unwrap();
    assert_eq!(accepted_event.kind, kinds::PROPOSAL_ACCEPTED);
    assert_eq!(accepted_event.entity_id, Some(created.proposal.id));
    assert_eq!(rx.recv().await.unwrap().kind, kinds::SWAP_CREATED);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn accept_requires_receiver(pool: PgPool) {
    let (_, proposals, _) = engines(&pool);
    let owner = seed_user(&pool, "owner").await;
    let proposer = seed_user(&pool, "proposer").await;
    let outsider = seed_user(&pool, "outsider").await;
    let wanted = seed_listing(&pool, owner, "wanted card").await;

    let created = proposals
        .create(proposer, &propose(vec![], vec![wanted.id]))
        .await
        .unwrap();

    for caller in [proposer, outsider] {
        let err = proposals.accept(created.proposal.id, caller).await.unwrap_err();
        assert_matches!(err, EngineError::Core(CoreError::Unauthorized(_)));
    }
}

#[sqlx::test(migrations = "../db/migrations")]
async fn accept_non_pending_is_invalid_transition(pool: PgPool) {
    let (_, proposals, _) = engines(&pool);
    let owner = seed_user(&pool, "owner").await;
    let proposer = seed_user(&pool, "proposer").await;
    let wanted = seed_listing(&pool, owner, "wanted card").await;

    let created = proposals
        .create(proposer, &propose(vec![], vec![wanted.id]))
        .await
        .unwrap();
    proposals.accept(created.proposal.id, owner).await.unwrap();

    let err = proposals.accept(created.proposal.id, owner).await.unwrap_err();
    assert_matches!(err, EngineError::Core(CoreError::InvalidTransition { .. }));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn competing_accepts_conflict_on_the_shared_listing(pool: PgPool) {
    let (_, proposals, _) = engines(&pool);
    let owner = seed_user(&pool, "owner").await;
    let first = seed_user(&pool, "first").await;
    let second = seed_user(&pool, "second").await;
    let contested = seed_listing(&pool, owner, "contested card").await;

    let p1 = proposals
        .create(first, &propose(vec![], vec![contested.id]))
        .await
        .unwrap();
    let p2 = proposals
        .create(second, &propose(vec![], vec![contested.id]))
        .await
        .unwrap();

    proposals.accept(p1.proposal.id, owner).await.unwrap();

    let err = proposals.accept(p2.proposal.id, owner).await.unwrap_err();
    assert_matches!(err, EngineError::Core(CoreError::Conflict(_)));

    // The listing belongs to exactly the winner.
    let listing = ListingRepo::find_by_id(&pool, contested.id).await.unwrap().unwrap();
    assert_eq!(listing.locked_by_proposal_id, Some(p1.proposal.id));

    // The loser is untouched and can still be rejected normally.
    let loser = proposals.get(p2.proposal.id).await.unwrap();
    assert_eq!(loser.proposal.status_id, ProposalStatus::Pending.id());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn cancel_releases_offered_listing(pool: PgPool) {
    let (_, proposals, _) = engines(&pool);
    let owner = seed_user(&pool, "owner").await;
    let proposer = seed_user(&pool, "proposer").await;
    let offered = seed_listing(&pool, proposer, "offered card").await;
    let wanted = seed_listing(&pool, owner, "wanted card").await;

    let created = proposals
        .create(proposer, &propose(vec![offered.id], vec![wanted.id]))
        .await
        .unwrap();
    let cancelled = proposals.cancel(created.proposal.id, proposer).await.unwrap();
    assert_eq!(cancelled.proposal.status_id, ProposalStatus::Cancelled.id());

    // The offered card is free again; the wanted card was never locked.
    let offered = ListingRepo::find_by_id(&pool, offered.id).await.unwrap().unwrap();
    assert_eq!(offered.status_id, ListingStatus::Active.id());
    assert!(offered.locked_by_proposal_id.is_none());

    let wanted = ListingRepo::find_by_id(&pool, wanted.id).await.unwrap().unwrap();
    assert_eq!(wanted.status_id, ListingStatus::Active.id());
    assert!(wanted.locked_by_proposal_id.is_none());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn reject_requires_receiver_and_cancel_requires_proposer(pool: PgPool) {
    let (_, proposals, _) = engines(&pool);
    let owner = seed_user(&pool, "owner").await;
    let proposer = seed_user(&pool, "proposer").await;
    let wanted = seed_listing(&pool, owner, "wanted card").await;

    let created = proposals
        .create(proposer, &propose(vec![], vec![wanted.id]))
        .await
        .unwrap();

    let err = proposals.reject(created.proposal.id, proposer).await.unwrap_err();
    assert_matches!(err, EngineError::Core(CoreError::Unauthorized(_)));

    let err = proposals.cancel(created.proposal.id, owner).await.unwrap_err();
    assert_matches!(err, EngineError::Core(CoreError::Unauthorized(_)));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn terminal_proposal_refuses_further_transitions(pool: PgPool) {
    let (_, proposals, _) = engines(&pool);
    let owner = seed_user(&pool, "owner").await;
    let proposer = seed_user(&pool, "proposer").await;
    let wanted = seed_listing(&pool, owner, "wanted card").await;

    let created = proposals
        .create(proposer, &propose(vec![], vec![wanted.id]))
        .await
        .unwrap();
    proposals.reject(created.proposal.id, owner).await.unwrap();

    let err = proposals.cancel(created.proposal.id, proposer).await.unwrap_err();
    assert_matches!(err, EngineError::Core(CoreError::InvalidTransition { .. }));

    let err = proposals.reject(created.proposal.id, owner).await.unwrap_err();
    assert_matches!(err, EngineError::Core(CoreError::InvalidTransition { .. }));
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn list_for_user_separates_roles(pool: PgPool) {
    let (_, proposals, _) = engines(&pool);
    let owner = seed_user(&pool, "owner").await;
    let proposer = seed_user(&pool, "proposer").await;
    let first = seed_listing(&pool, owner, "first card").await;
    let second = seed_listing(&pool, owner, "second card").await;

    proposals
        .create(proposer, &propose(vec![], vec![first.id]))
        .await
        .unwrap();
    proposals
        .create(proposer, &propose(vec![], vec![second.id]))
        .await
        .unwrap();

    let query = ProposalListQuery::default();
    let sent = proposals
        .list_for_user(proposer, ProposalRole::Sent, &query)
        .await
        .unwrap();
    assert_eq!(sent.len(), 2);

    let received = proposals
        .list_for_user(owner, ProposalRole::Received, &query)
        .await
        .unwrap();
    assert_eq!(received.len(), 2);

    let none = proposals
        .list_for_user(proposer, ProposalRole::Received, &query)
        .await
        .unwrap();
    assert!(none.is_empty());
}
