//! Integration tests for the review pipeline:
//! - full jargon scenario: queue, approve into the live store, revert back
//! - batch decisions with independent per-item outcomes
//! - concurrent decisions racing on one proposal
//! - pagination snapshot consistency under concurrent inserts

use std::sync::Arc;

use persona_review::review::{
    BatchCoordinator, PaginationGateway, ProposalStore, ReviewAction, ReviewEngine,
};
use persona_review::targets::{ApplyRegistry, JargonStore, PersonaStore};
use persona_review::types::{NewProposal, ProposalStatus, ReviewError, ReviewSource};

struct Pipeline {
    _dir: tempfile::TempDir,
    store: Arc<ProposalStore>,
    engine: Arc<ReviewEngine>,
    targets_root: std::path::PathBuf,
}

async fn pipeline() -> Pipeline {
    let dir = tempfile::tempdir().unwrap();
    let targets_root = dir.path().join("live");
    let store = Arc::new(
        ProposalStore::open(dir.path().join("proposals.db"))
            .await
            .unwrap(),
    );
    let targets = Arc::new(ApplyRegistry::open(&targets_root).unwrap());
    let engine = Arc::new(ReviewEngine::new(Arc::clone(&store), targets));
    Pipeline {
        _dir: dir,
        store,
        engine,
        targets_root,
    }
}

fn jargon_proposal(group: &str, proposed: &str) -> NewProposal {
    let mut p = NewProposal::new(ReviewSource::Jargon, group, "", proposed);
    p.confidence_score = Some(0.82);
    p.reason = "recurring group slang".into();
    p
}

#[tokio::test]
async fn jargon_approve_then_revert_round_trips_the_live_store() {
    let pipeline = pipeline().await;

    let p = pipeline
        .store
        .create(jargon_proposal("g1", "forbidden word: yyds"))
        .await
        .unwrap();
    assert_eq!(p.status, ProposalStatus::Pending);

    // approve: the vocabulary goes live
    let approved = pipeline
        .engine
        .approve(&p.id, "reviewer", None, None)
        .await
        .unwrap();
    assert_eq!(approved.proposal.status, ProposalStatus::Approved);
    assert!(approved.fully_applied());

    let jargon = JargonStore::new(pipeline.targets_root.join("jargon")).unwrap();
    assert!(jargon.contains("g1", "forbidden word: yyds").unwrap());

    // revert: back to pending, vocabulary restored to the empty snapshot
    let reverted = pipeline.engine.revert(&p.id, "reviewer").await.unwrap();
    assert_eq!(reverted.proposal.status, ProposalStatus::Pending);
    assert!(reverted.fully_applied());
    assert!(jargon.entries("g1").unwrap().is_empty());

    // contents never changed along the way
    let final_state = pipeline.store.get(&p.id).await.unwrap();
    assert_eq!(final_state.original_content, "");
    assert_eq!(final_state.proposed_content, "forbidden word: yyds");
    assert!(final_state.review_time.is_none());

    // one audit record per transition, decision history intact
    let history = pipeline.store.audit_trail().history(&p.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].to_status, "approved");
    assert_eq!(history[0].applied, Some(true));
    assert_eq!(history[1].from_status, "approved");
    assert_eq!(history[1].to_status, "pending");
}

#[tokio::test]
async fn persona_approval_with_reviewer_edit_applies_the_edit() {
    let pipeline = pipeline().await;

    let mut new = NewProposal::new(
        ReviewSource::PersonaLearning,
        "g2",
        "You are a helpful assistant.",
        "You are a helpful assistant. You enjoy puns.",
    );
    new.reason = "group responds well to wordplay".into();
    let p = pipeline.store.create(new).await.unwrap();

    let edited = "You are a helpful assistant. You enjoy the occasional pun.";
    pipeline
        .engine
        .approve(&p.id, "reviewer", Some("toned down"), Some(edited))
        .await
        .unwrap();

    // the live store got the edit, the proposal keeps the suggestion
    let persona = PersonaStore::new(pipeline.targets_root.join("persona")).unwrap();
    assert_eq!(persona.current_prompt("g2").unwrap().as_deref(), Some(edited));

    let stored = pipeline.store.get(&p.id).await.unwrap();
    assert_eq!(
        stored.proposed_content,
        "You are a helpful assistant. You enjoy puns."
    );

    let history = pipeline.store.audit_trail().history(&p.id).await.unwrap();
    assert_eq!(history[0].applied_content.as_deref(), Some(edited));

    // revert restores the original prompt snapshot
    pipeline.engine.revert(&p.id, "reviewer").await.unwrap();
    assert_eq!(
        persona.current_prompt("g2").unwrap().as_deref(),
        Some("You are a helpful assistant.")
    );
}

#[tokio::test]
async fn batch_reject_reports_partial_success() {
    let pipeline = pipeline().await;
    let coordinator = BatchCoordinator::new(
        Arc::clone(&pipeline.engine),
        Arc::clone(&pipeline.store),
    );

    let a = pipeline
        .store
        .create(jargon_proposal("g1", "a"))
        .await
        .unwrap();
    let b = pipeline
        .store
        .create(jargon_proposal("g1", "b"))
        .await
        .unwrap();
    let c = pipeline
        .store
        .create(jargon_proposal("g1", "c"))
        .await
        .unwrap();

    // B is already approved before the batch runs
    pipeline
        .engine
        .approve(&b.id, "reviewer", None, None)
        .await
        .unwrap();

    let ids = vec![a.id.clone(), b.id.clone(), c.id.clone()];
    let outcome = coordinator
        .review(&ids, ReviewAction::Reject, "reviewer", None)
        .await;

    assert_eq!(outcome.succeeded, vec![a.id.clone(), c.id.clone()]);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].id, b.id);

    assert_eq!(
        pipeline.store.get(&a.id).await.unwrap().status,
        ProposalStatus::Rejected
    );
    assert_eq!(
        pipeline.store.get(&b.id).await.unwrap().status,
        ProposalStatus::Approved
    );
    assert_eq!(
        pipeline.store.get(&c.id).await.unwrap().status,
        ProposalStatus::Rejected
    );
}

#[tokio::test]
async fn concurrent_decisions_have_exactly_one_winner() {
    let pipeline = pipeline().await;
    let p = pipeline
        .store
        .create(jargon_proposal("g1", "raced"))
        .await
        .unwrap();

    let approve = {
        let engine = Arc::clone(&pipeline.engine);
        let id = p.id.clone();
        tokio::spawn(async move { engine.approve(&id, "reviewer-a", None, None).await })
    };
    let reject = {
        let engine = Arc::clone(&pipeline.engine);
        let id = p.id.clone();
        tokio::spawn(async move { engine.reject(&id, "reviewer-b", None).await })
    };

    let approve = approve.await.unwrap();
    let reject = reject.await.unwrap();

    // exactly one side commits; the loser sees InvalidTransition
    assert_eq!(approve.is_ok() as u8 + reject.is_ok() as u8, 1);
    let loser = if approve.is_ok() {
        reject.unwrap_err()
    } else {
        approve.unwrap_err()
    };
    assert!(matches!(loser, ReviewError::InvalidTransition { .. }));

    let history = pipeline.store.audit_trail().history(&p.id).await.unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn page_one_is_stable_under_inserts() {
    let pipeline = pipeline().await;
    let gateway = PaginationGateway::new(Arc::clone(&pipeline.store));

    for i in 0..3 {
        pipeline
            .store
            .create(jargon_proposal("g1", &format!("word {}", i)))
            .await
            .unwrap();
    }

    let first = gateway.list_page(None, 3, 1).await.unwrap();
    let first_ids: Vec<_> = first.items.iter().map(|p| p.id.clone()).collect();
    assert_eq!(first.total, 3);

    // a later insert lands after the existing page in oldest-first order
    pipeline
        .store
        .create(jargon_proposal("g1", "late arrival"))
        .await
        .unwrap();

    let again = gateway.list_page(None, 3, 1).await.unwrap();
    let again_ids: Vec<_> = again.items.iter().map(|p| p.id.clone()).collect();
    assert_eq!(first_ids, again_ids);
    // and the total reflects the page's own snapshot
    assert_eq!(again.total, 4);
}

#[tokio::test]
async fn delete_is_not_a_rejection() {
    let pipeline = pipeline().await;
    let keep = pipeline
        .store
        .create(jargon_proposal("g1", "keep"))
        .await
        .unwrap();
    let discard = pipeline
        .store
        .create(jargon_proposal("g1", "drop"))
        .await
        .unwrap();

    pipeline
        .engine
        .reject(&keep.id, "reviewer", None)
        .await
        .unwrap();
    pipeline
        .store
        .delete(&discard.id, "reviewer")
        .await
        .unwrap();

    let stats = pipeline.store.stats(None).await.unwrap();
    assert_eq!(stats.rejected, 1);
    assert_eq!(stats.pending, 0);

    // the deleted proposal is gone, not rejected
    assert!(matches!(
        pipeline.store.get(&discard.id).await,
        Err(ReviewError::NotFound(_))
    ));
}

#[tokio::test]
async fn revert_of_rejection_allows_a_second_look() {
    let pipeline = pipeline().await;
    let p = pipeline
        .store
        .create(jargon_proposal("g1", "second chance"))
        .await
        .unwrap();

    pipeline
        .engine
        .reject(&p.id, "reviewer", Some("too noisy"))
        .await
        .unwrap();
    pipeline.engine.revert(&p.id, "reviewer").await.unwrap();

    // now approvable like any fresh proposal
    let outcome = pipeline
        .engine
        .approve(&p.id, "reviewer", None, None)
        .await
        .unwrap();
    assert_eq!(outcome.proposal.status, ProposalStatus::Approved);

    let history = pipeline.store.audit_trail().history(&p.id).await.unwrap();
    let transitions: Vec<_> = history
        .iter()
        .map(|r| (r.from_status.as_str(), r.to_status.as_str()))
        .collect();
    assert_eq!(
        transitions,
        vec![
            ("pending", "rejected"),
            ("rejected", "pending"),
            ("pending", "approved"),
        ]
    );
}
