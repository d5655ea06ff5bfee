//! Postgres adapter tests
//!
//! These start a PostgreSQL container and are ignored by default:
//! `cargo test -p infra_store -- --ignored`

use std::sync::Arc;

use rust_decimal_macros::dec;

use core_kernel::{HealthCheckable, PortError, ReviewId};
use domain_claims::{
    actions, AgentName, AuditEvent, AuditSink, PolicyLedger, Resolution, ReviewDecision,
    ReviewRecord, ReviewStatus, ReviewStore, UpdatedValues,
};
use infra_store::{PgAuditSink, PgPolicyLedger, PgReviewRepository, StoreError};
use test_utils::{analysis_with_confidence, db_test, ClaimFactsBuilder};

fn pending_record(policy: &str) -> ReviewRecord {
    ReviewRecord::new(
        ClaimFactsBuilder::new()
            .with_policy_number(policy)
            .with_amount(dec!(4200.00))
            .build(),
        analysis_with_confidence(100.0 * 0.3819660112501051),
        "Low confidence",
    )
}

fn resolution(decision: ReviewDecision) -> Resolution {
    Resolution {
        decision,
        reviewer_name: "Sam".to_string(),
        reviewer_notes: String::new(),
        resolved_at: chrono::Utc::now(),
    }
}

db_test!(test_pending_reviews_keep_insertion_order, |pool| {
    let repo = PgReviewRepository::new(pool);
    let records: Vec<_> = ["POL-1", "POL-2", "POL-3"].iter().map(|p| pending_record(p)).collect();
    for record in &records {
        repo.append(record).await.unwrap();
    }

    let pending = repo.pending().await.unwrap();
    let ids: Vec<_> = pending.iter().map(|r| r.review_id).collect();
    assert_eq!(ids, records.iter().map(|r| r.review_id).collect::<Vec<_>>());
    assert_eq!(pending[0].claim_data, records[0].claim_data);
    assert_eq!(pending[0].analysis_result, records[0].analysis_result);
    assert_eq!(
        pending[0].confidence_score.to_bits(),
        records[0].confidence_score.to_bits()
    );
});

db_test!(test_duplicate_review_id_is_rejected, |pool| {
    let repo = PgReviewRepository::new(pool);
    let record = pending_record("POL-1");
    repo.insert(&record).await.unwrap();

    let again = repo.insert(&record).await;
    assert!(matches!(again, Err(StoreError::DuplicateEntry(_))));
});

db_test!(test_resolution_moves_record_to_history, |pool| {
    let repo = PgReviewRepository::new(pool);
    let record = pending_record("POL-1");
    repo.append(&record).await.unwrap();

    let resolved = repo
        .resolve(record.review_id, &resolution(ReviewDecision::Reject))
        .await
        .unwrap();
    assert_eq!(resolved.status, ReviewStatus::Reviewed);

    assert!(repo.pending().await.unwrap().is_empty());
    let history = repo.history().await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].final_decision, Some(ReviewDecision::Reject));
    assert_eq!(history[0].reviewer_name.as_deref(), Some("Sam"));
});

db_test!(test_concurrent_resolutions_have_one_winner, |pool| {
    let repo = Arc::new(PgReviewRepository::new(pool));
    let record = pending_record("POL-1");
    repo.append(&record).await.unwrap();
    let review_id = record.review_id;

    let handles: Vec<_> = (0..6)
        .map(|i| {
            let repo = repo.clone();
            let decision = if i % 2 == 0 { ReviewDecision::Approve } else { ReviewDecision::Reject };
            tokio::spawn(async move { repo.resolve(review_id, &resolution(decision)).await })
        })
        .collect();

    let mut wins = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => wins += 1,
            Err(PortError::Conflict { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(wins, 1);
    assert_eq!(repo.history().await.unwrap().len(), 1);
});

db_test!(test_unknown_review_is_not_found, |pool| {
    let repo = PgReviewRepository::new(pool);
    let result = repo.get(ReviewId::new()).await;
    assert!(matches!(result, Err(PortError::NotFound { .. })));
});

db_test!(test_audit_events_are_idempotent_by_id, |pool| {
    let sink = PgAuditSink::new(pool);
    let event = AuditEvent::new(AgentName::Orchestrator, Some("POL-5"), actions::WORKFLOW_INITIATION);

    sink.record(&event).await.unwrap();
    sink.record(&event).await.unwrap();
    sink.record(
        &AuditEvent::new(AgentName::Eligibility, Some("POL-5"), actions::ELIGIBILITY_CHECK)
            .with_decision("ELIGIBLE"),
    )
    .await
    .unwrap();

    let trail = sink.trail(Some("POL-5")).await.unwrap();
    assert_eq!(trail.len(), 2);
    assert_eq!(trail[0].event_id, event.event_id);

    let report = sink.report(Some("POL-5")).await.unwrap();
    assert_eq!(report.by_decision["ELIGIBLE"], 1);
});

db_test!(test_ledger_upsert_overwrites_usage, |pool| {
    let ledger = PgPolicyLedger::new(pool);
    for (amount, count) in [(dec!(500), 1), (dec!(1700.50), 2)] {
        ledger
            .apply_claim_usage(
                "POL-8",
                &UpdatedValues {
                    new_past_claims_amount: amount,
                    new_claim_history_count: count,
                },
            )
            .await
            .unwrap();
    }

    let current = ledger.current("POL-8").await.unwrap().unwrap();
    assert_eq!(current.new_past_claims_amount, dec!(1700.50));
    assert_eq!(current.new_claim_history_count, 2);
});

db_test!(test_health_check_reports_healthy, |pool| {
    let repo = PgReviewRepository::new(pool);
    let health = repo.health_check().await;
    assert!(health.is_healthy());
});
