//! Tests for the file-backed adapters

use std::io::Write;
use std::sync::Arc;

use rust_decimal_macros::dec;

use core_kernel::PortError;
use domain_claims::{
    actions, AgentName, AuditEvent, AuditSink, PolicyLedger, Resolution, ReviewDecision,
    ReviewRecord, ReviewStore, UpdatedValues,
};
use infra_store::file::review_log::{HISTORY_FILE, QUEUE_LOG_FILE};
use infra_store::{JsonFileAuditSink, JsonlPolicyLedger, JsonlReviewStore, StoreError};
use tempfile::tempdir;
use test_utils::{analysis_with_confidence, ClaimFactsBuilder};

fn pending_record(confidence: f64) -> ReviewRecord {
    ReviewRecord::new(
        ClaimFactsBuilder::new().with_amount(dec!(980.10)).build(),
        analysis_with_confidence(confidence),
        "Low confidence",
    )
}

fn resolution(decision: ReviewDecision) -> Resolution {
    Resolution {
        decision,
        reviewer_name: "Alex".to_string(),
        reviewer_notes: "Checked the repair invoice".to_string(),
        resolved_at: chrono::Utc::now(),
    }
}

mod review_log_tests {
    use super::*;

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = tempdir().unwrap();
        let first = pending_record(30.0);
        let second = pending_record(45.0);
        {
            let store = JsonlReviewStore::open(dir.path()).await.unwrap();
            store.append(&first).await.unwrap();
            store.append(&second).await.unwrap();
            store
                .resolve(first.review_id, &resolution(ReviewDecision::Approve))
                .await
                .unwrap();
        }

        let reopened = JsonlReviewStore::open(dir.path()).await.unwrap();
        let pending = reopened.pending().await.unwrap();
        assert_eq!(pending, vec![second.clone()]);

        let history = reopened.history().await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].review_id, first.review_id);
        assert_eq!(history[0].final_decision, Some(ReviewDecision::Approve));
    }

    #[tokio::test]
    async fn test_torn_final_line_is_dropped() {
        let dir = tempdir().unwrap();
        let record = pending_record(30.0);
        {
            let store = JsonlReviewStore::open(dir.path()).await.unwrap();
            store.append(&record).await.unwrap();
        }
        let mut log = std::fs::OpenOptions::new()
            .append(true)
            .open(dir.path().join(QUEUE_LOG_FILE))
            .unwrap();
        log.write_all(br#"{"entry":"enqueued","record":{"review_id":"#).unwrap();
        drop(log);

        let reopened = JsonlReviewStore::open(dir.path()).await.unwrap();
        assert_eq!(reopened.pending().await.unwrap(), vec![record]);

        // the torn bytes are gone, so later appends land on a clean line
        let next = pending_record(20.0);
        reopened.append(&next).await.unwrap();
        drop(reopened);
        let again = JsonlReviewStore::open(dir.path()).await.unwrap();
        assert_eq!(again.pending().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_corrupt_middle_line_is_an_error() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(QUEUE_LOG_FILE), "not json\n{}\n").unwrap();

        let result = JsonlReviewStore::open(dir.path()).await;
        assert!(matches!(result, Err(StoreError::Corrupt { line: 1, .. })));
    }

    #[tokio::test]
    async fn test_missing_history_is_repaired_from_log() {
        let dir = tempdir().unwrap();
        let record = pending_record(30.0);
        {
            let store = JsonlReviewStore::open(dir.path()).await.unwrap();
            store.append(&record).await.unwrap();
            store
                .resolve(record.review_id, &resolution(ReviewDecision::Reject))
                .await
                .unwrap();
        }
        std::fs::remove_file(dir.path().join(HISTORY_FILE)).unwrap();

        let reopened = JsonlReviewStore::open(dir.path()).await.unwrap();
        assert_eq!(reopened.history().await.unwrap().len(), 1);
        let repaired = std::fs::read_to_string(dir.path().join(HISTORY_FILE)).unwrap();
        assert_eq!(repaired.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_resolving_twice_conflicts() {
        let dir = tempdir().unwrap();
        let store = JsonlReviewStore::open(dir.path()).await.unwrap();
        let record = pending_record(30.0);
        store.append(&record).await.unwrap();

        store
            .resolve(record.review_id, &resolution(ReviewDecision::Approve))
            .await
            .unwrap();
        let second = store
            .resolve(record.review_id, &resolution(ReviewDecision::Reject))
            .await;

        assert!(matches!(second, Err(PortError::Conflict { .. })));
        let stored = store.get(record.review_id).await.unwrap();
        assert_eq!(stored.final_decision, Some(ReviewDecision::Approve));
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_all_kept() {
        let dir = tempdir().unwrap();
        let store = Arc::new(JsonlReviewStore::open(dir.path()).await.unwrap());

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.append(&pending_record(i as f64)).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        drop(store);

        let reopened = JsonlReviewStore::open(dir.path()).await.unwrap();
        assert_eq!(reopened.all().await.unwrap().len(), 16);
    }

    #[tokio::test]
    async fn test_unknown_review_is_not_found() {
        let dir = tempdir().unwrap();
        let store = JsonlReviewStore::open(dir.path()).await.unwrap();
        let result = store.get(core_kernel::ReviewId::new()).await;
        assert!(matches!(result, Err(PortError::NotFound { .. })));
    }
}

mod audit_file_tests {
    use super::*;

    #[tokio::test]
    async fn test_event_lands_in_dated_policy_folder() {
        let dir = tempdir().unwrap();
        let sink = JsonFileAuditSink::new(dir.path());
        let event = AuditEvent::new(AgentName::Eligibility, Some("POL-77"), actions::ELIGIBILITY_CHECK);

        sink.record(&event).await.unwrap();

        let path = sink.event_path(&event);
        assert!(path.exists());
        let relative = path.strip_prefix(dir.path()).unwrap();
        let parts: Vec<_> = relative.iter().map(|p| p.to_string_lossy().to_string()).collect();
        assert_eq!(parts[0], event.timestamp.format("%Y-%m-%d").to_string());
        assert_eq!(parts[1], "POL-77");
        assert!(parts[2].starts_with("EligibilityAgent_"));
        assert!(parts[2].ends_with("_eligibility_check.json"));
    }

    #[tokio::test]
    async fn test_trail_reads_back_in_time_order() {
        let dir = tempdir().unwrap();
        let sink = JsonFileAuditSink::new(dir.path());
        let events = vec![
            AuditEvent::new(AgentName::Orchestrator, Some("POL-1"), actions::WORKFLOW_INITIATION),
            AuditEvent::new(AgentName::Eligibility, Some("POL-1"), actions::ELIGIBILITY_CHECK)
                .with_decision("ELIGIBLE"),
            AuditEvent::new(AgentName::Orchestrator, Some("POL-2"), actions::WORKFLOW_INITIATION),
        ];
        for event in &events {
            sink.record(event).await.unwrap();
        }

        let trail = sink.read_trail(Some("POL-1")).await.unwrap();
        assert_eq!(trail, events[..2].to_vec());

        let report = sink.report(None).await.unwrap();
        assert_eq!(report.total_events, 3);
        assert_eq!(report.by_action[actions::WORKFLOW_INITIATION], 2);
        assert_eq!(report.by_decision["ELIGIBLE"], 1);
    }

    #[tokio::test]
    async fn test_same_instant_events_are_not_overwritten() {
        let dir = tempdir().unwrap();
        let sink = JsonFileAuditSink::new(dir.path());
        let first = AuditEvent::new(AgentName::HumanReview, Some("POL-3"), actions::FLAGGED_FOR_REVIEW);
        let mut second = AuditEvent::new(AgentName::HumanReview, Some("POL-3"), actions::FLAGGED_FOR_REVIEW);
        second.timestamp = first.timestamp;

        sink.record(&first).await.unwrap();
        sink.record(&second).await.unwrap();

        assert_eq!(sink.read_trail(Some("POL-3")).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_policies_sharing_a_folder_keep_separate_trails() {
        let dir = tempdir().unwrap();
        let sink = JsonFileAuditSink::new(dir.path());
        let slashed = AuditEvent::new(AgentName::Eligibility, Some("POL/1"), actions::ELIGIBILITY_CHECK);
        let underscored = AuditEvent::new(AgentName::Eligibility, Some("POL_1"), actions::ELIGIBILITY_CHECK);
        sink.record(&slashed).await.unwrap();
        sink.record(&underscored).await.unwrap();
        assert_eq!(sink.event_path(&slashed).parent(), sink.event_path(&underscored).parent());

        assert_eq!(sink.read_trail(Some("POL/1")).await.unwrap(), vec![slashed]);
        assert_eq!(sink.read_trail(Some("POL_1")).await.unwrap(), vec![underscored]);
        assert_eq!(sink.read_trail(None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_root_reads_as_empty_trail() {
        let dir = tempdir().unwrap();
        let sink = JsonFileAuditSink::new(dir.path().join("never-written"));
        assert!(sink.read_trail(None).await.unwrap().is_empty());
    }
}

mod ledger_tests {
    use super::*;

    #[tokio::test]
    async fn test_latest_usage_wins_after_reopen() {
        let dir = tempdir().unwrap();
        {
            let ledger = JsonlPolicyLedger::open(dir.path()).await.unwrap();
            for (amount, count) in [(dec!(1000), 1), (dec!(3500.25), 2)] {
                ledger
                    .apply_claim_usage(
                        "POL-9",
                        &UpdatedValues {
                            new_past_claims_amount: amount,
                            new_claim_history_count: count,
                        },
                    )
                    .await
                    .unwrap();
            }
        }

        let reopened = JsonlPolicyLedger::open(dir.path()).await.unwrap();
        let current = reopened.current("POL-9").await.unwrap();
        assert_eq!(current.new_past_claims_amount, dec!(3500.25));
        assert_eq!(current.new_claim_history_count, 2);
        assert!(reopened.current("POL-unknown").await.is_none());
    }
}

mod float_persistence_tests {
    use super::*;
    use domain_claims::fraud;
    use proptest::prelude::*;

    fn scored_record(probability: f64, confidence: f64, ambiguity: f64) -> ReviewRecord {
        let mut analysis = analysis_with_confidence(confidence);
        analysis.eligibility.ambiguity_score = ambiguity;
        analysis.fraud = Some(fraud::classify(probability, 0.65));
        ReviewRecord::new(ClaimFactsBuilder::new().build(), analysis, "Low confidence")
    }

    fn reopened_pending(records: &[ReviewRecord]) -> Vec<ReviewRecord> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async {
            let dir = tempdir().unwrap();
            {
                let store = JsonlReviewStore::open(dir.path()).await.unwrap();
                for record in records {
                    store.append(record).await.unwrap();
                }
            }
            JsonlReviewStore::open(dir.path())
                .await
                .unwrap()
                .pending()
                .await
                .unwrap()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn scores_read_back_byte_equal(
            scores in prop::collection::vec((0.0f64..=1.0, 0.0f64..=100.0, 0.0f64..=100.0), 1..24)
        ) {
            let records: Vec<_> = scores
                .iter()
                .map(|(p, c, a)| scored_record(*p, *c, *a))
                .collect();
            let reloaded = reopened_pending(&records);

            prop_assert_eq!(reloaded.len(), records.len());
            for (before, after) in records.iter().zip(&reloaded) {
                prop_assert_eq!(after.confidence_score.to_bits(), before.confidence_score.to_bits());
                prop_assert_eq!(
                    serde_json::to_vec(&after.claim_data).unwrap(),
                    serde_json::to_vec(&before.claim_data).unwrap()
                );
                prop_assert_eq!(
                    serde_json::to_vec(&after.analysis_result).unwrap(),
                    serde_json::to_vec(&before.analysis_result).unwrap()
                );
            }
        }
    }
}
