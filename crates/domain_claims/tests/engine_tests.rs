//! End-to-end tests for the decision engine over the in-memory adapters

use std::sync::Arc;

use rust_decimal_macros::dec;

use domain_claims::ports::mock::{InMemoryAuditSink, InMemoryReviewStore};
use domain_claims::{
    actions, AuditDispatcher, ClaimError, DecisionRequest, Disposition, EligibilityDecision,
    EligibilityEvaluator, EscalationTrigger, ExclusionLookup, FraudSignal, ReviewDecision,
    ReviewQueue, ReviewStatus, RiskLevel, ScoringConfig,
};
use test_utils::{
    analysis_with_confidence, assert_audit_actions, assert_eligibility, assert_escalated,
    assert_finalized, ClaimFactsBuilder, ExclusionFixtures, PolicySnapshotBuilder, Scenarios,
    StringFixtures, TestEngine,
};

// ============================================================================
// Reference scenarios
// ============================================================================

mod scenario_tests {
    use super::*;

    #[tokio::test]
    async fn test_scenario_a_is_rejected_without_review() {
        let engine = TestEngine::new();
        let outcome = engine
            .orchestrator
            .process(Scenarios::a_limit_exceeded().request())
            .await
            .unwrap();

        let decision = assert_finalized(outcome);
        assert_eq!(decision.disposition, Disposition::Rejected);
        assert_eligibility(&decision.eligibility, EligibilityDecision::NotEligible, 95.0);
        assert!(decision.fraud.is_none());
        assert!(!decision.ledger_updated);
        assert!(engine.ledger.applied().await.is_empty());
    }

    #[tokio::test]
    async fn test_scenario_b_is_approved_and_applied() {
        let engine = TestEngine::new();
        let outcome = engine
            .orchestrator
            .process(Scenarios::b_eligible().request())
            .await
            .unwrap();

        let decision = assert_finalized(outcome);
        assert_eq!(decision.disposition, Disposition::Approved);
        assert_eligibility(&decision.eligibility, EligibilityDecision::Eligible, 95.0);
        assert_eq!(decision.fraud.unwrap().risk_level, RiskLevel::VeryLow);

        let applied = engine.ledger.applied().await;
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].0, StringFixtures::policy_number());
        assert_eq!(applied[0].1.new_past_claims_amount, dec!(7000));
        assert_eq!(applied[0].1.new_claim_history_count, 2);

        assert_audit_actions(
            &engine.audit.actions().await,
            &[
                actions::WORKFLOW_INITIATION,
                actions::ELIGIBILITY_CHECK,
                actions::FRAUD_DETECTION,
                actions::ESCALATION_ASSESSMENT,
                actions::CLAIM_FINALIZED,
            ],
        );
    }

    #[tokio::test]
    async fn test_scenario_c_expired_policy_scores_100() {
        let engine = TestEngine::new();
        let outcome = engine
            .orchestrator
            .process(Scenarios::c_expired().request())
            .await
            .unwrap();

        let decision = assert_finalized(outcome);
        assert_eligibility(&decision.eligibility, EligibilityDecision::NotEligible, 100.0);
    }

    #[tokio::test]
    async fn test_scenario_d_fraud_overrides_high_confidence() {
        let engine = TestEngine::new();
        let outcome = engine
            .orchestrator
            .process(Scenarios::d_fraud_flagged().request())
            .await
            .unwrap();

        let record = assert_escalated(outcome);
        assert_eq!(record.confidence_score, 95.0);
        let fraud = record.analysis_result.fraud.unwrap();
        assert_eq!(fraud.fraud_prediction, 1);
        assert_eq!(fraud.risk_level.label(), "High Risk (Fraud Detected)");
        assert_eq!(record.analysis_result.triggers, vec![EscalationTrigger::FraudFlagged]);
        assert!(engine.ledger.applied().await.is_empty());

        let recorded = engine.audit.actions().await;
        assert_eq!(recorded.last().map(String::as_str), Some(actions::FLAGGED_FOR_REVIEW));
    }

    #[tokio::test]
    async fn test_scenario_e_date_mismatch_adds_ambiguity_only() {
        let engine = TestEngine::new();
        let outcome = engine
            .orchestrator
            .process(Scenarios::e_mismatched_dates().request())
            .await
            .unwrap();

        let decision = assert_finalized(outcome);
        assert_eligibility(&decision.eligibility, EligibilityDecision::Eligible, 75.0);
        assert!(decision.eligibility.checks_failed.is_empty());
        assert_eq!(decision.eligibility.ambiguity_factors.len(), 1);
    }
}

// ============================================================================
// Degraded collaborators and missing inputs
// ============================================================================

mod degradation_tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_policy_escalates_as_error() {
        let engine = TestEngine::new();
        let outcome = engine
            .orchestrator
            .process(DecisionRequest {
                claim: Some(ClaimFactsBuilder::new().build()),
                policy: None,
                fraud: FraudSignal::Scored {
                    probability: 0.1,
                    threshold: None,
                },
                exclusion: None,
            })
            .await
            .unwrap();

        let record = assert_escalated(outcome);
        assert_eq!(record.ai_recommendation(), EligibilityDecision::Error);
        assert!(record
            .analysis_result
            .triggers
            .contains(&EscalationTrigger::EvaluationError));
    }

    #[tokio::test]
    async fn test_unreachable_fraud_source_forces_review() {
        let engine = TestEngine::new();
        let mut request = Scenarios::b_eligible().request();
        request.fraud = FraudSignal::Unavailable {
            reason: "model endpoint returned 503".to_string(),
        };

        let record = assert_escalated(engine.orchestrator.process(request).await.unwrap());
        assert!(record.flag_reason.contains("model endpoint returned 503"));
        assert!(record.analysis_result.fraud.is_none());
    }

    #[tokio::test]
    async fn test_unavailable_classifier_lowers_confidence() {
        let engine = TestEngine::with_unavailable_classifier();
        let decision = assert_finalized(
            engine
                .orchestrator
                .process(Scenarios::b_eligible().request())
                .await
                .unwrap(),
        );

        assert_eligibility(&decision.eligibility, EligibilityDecision::Eligible, 85.0);
    }

    #[tokio::test]
    async fn test_excluded_reason_is_rejected() {
        let engine = TestEngine::with_exclusion_verdict(ExclusionFixtures::racing_excluded());
        let decision = assert_finalized(
            engine
                .orchestrator
                .process(Scenarios::b_eligible().request())
                .await
                .unwrap(),
        );

        assert_eq!(decision.disposition, Disposition::Rejected);
        assert!(decision
            .eligibility
            .exclusion_summary
            .unwrap()
            .contains("Racing"));
    }

    #[tokio::test]
    async fn test_audit_outage_is_absorbed_and_retried() {
        let engine = TestEngine::new();
        engine.audit.set_failing(true).await;

        engine
            .orchestrator
            .process(Scenarios::a_limit_exceeded().request())
            .await
            .unwrap();
        let dispatcher = engine.orchestrator.audit();
        assert_eq!(dispatcher.backlog_len().await, 4);

        engine.audit.set_failing(false).await;
        assert_eq!(dispatcher.retry_pending().await.unwrap(), 4);
        assert_eq!(engine.audit.events().await.len(), 4);
    }
}

// ============================================================================
// Review queue
// ============================================================================

mod review_tests {
    use super::*;

    fn queue() -> (ReviewQueue, Arc<InMemoryAuditSink>) {
        let sink = Arc::new(InMemoryAuditSink::new());
        let queue = ReviewQueue::new(
            Arc::new(InMemoryReviewStore::new()),
            Arc::new(AuditDispatcher::new(sink.clone())),
        );
        (queue, sink)
    }

    #[tokio::test]
    async fn test_enqueue_round_trips_payload_byte_equal() {
        let (queue, _) = queue();
        let claim = ClaimFactsBuilder::new().with_amount(dec!(1234.50)).build();
        let analysis = analysis_with_confidence(42.5);

        let record = queue
            .enqueue(claim.clone(), analysis.clone(), "Low confidence")
            .await
            .unwrap();
        let pending = queue.list_pending().await.unwrap();

        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].review_id, record.review_id);
        assert_eq!(
            serde_json::to_vec(&pending[0].claim_data).unwrap(),
            serde_json::to_vec(&claim).unwrap()
        );
        assert_eq!(
            serde_json::to_vec(&pending[0].analysis_result).unwrap(),
            serde_json::to_vec(&analysis).unwrap()
        );
    }

    #[tokio::test]
    async fn test_pending_keeps_insertion_order() {
        let (queue, _) = queue();
        let mut ids = Vec::new();
        for confidence in [10.0, 20.0, 30.0] {
            let record = queue
                .enqueue(ClaimFactsBuilder::new().build(), analysis_with_confidence(confidence), "test")
                .await
                .unwrap();
            ids.push(record.review_id);
        }

        let pending: Vec<_> = queue
            .list_pending()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.review_id)
            .collect();
        assert_eq!(pending, ids);
    }

    #[tokio::test]
    async fn test_second_resolution_is_rejected_and_first_stands() {
        let (queue, _) = queue();
        let record = queue
            .enqueue(ClaimFactsBuilder::new().build(), analysis_with_confidence(40.0), "test")
            .await
            .unwrap();

        queue
            .resolve(record.review_id, ReviewDecision::Approve, "Alex", "Documents verified")
            .await
            .unwrap();
        let second = queue
            .resolve(record.review_id, ReviewDecision::Reject, "Sam", "Changed my mind")
            .await;

        assert!(matches!(second, Err(ClaimError::AlreadyResolved(id)) if id == record.review_id));
        let stored = queue.get(record.review_id).await.unwrap();
        assert_eq!(stored.status, ReviewStatus::Reviewed);
        assert_eq!(stored.final_decision, Some(ReviewDecision::Approve));
        assert_eq!(stored.reviewer_name.as_deref(), Some("Alex"));
    }

    #[tokio::test]
    async fn test_concurrent_resolutions_have_one_winner() {
        let (queue, _) = queue();
        let record = queue
            .enqueue(ClaimFactsBuilder::new().build(), analysis_with_confidence(40.0), "test")
            .await
            .unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let queue = queue.clone();
                let id = record.review_id;
                tokio::spawn(async move {
                    let decision = if i % 2 == 0 {
                        ReviewDecision::Approve
                    } else {
                        ReviewDecision::Reject
                    };
                    queue
                        .resolve(id, decision, &format!("reviewer-{}", i), "concurrent")
                        .await
                })
            })
            .collect();

        let mut successes = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(ClaimError::AlreadyResolved(_)) => conflicts += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(conflicts, 7);
        assert_eq!(queue.history().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_review_is_not_found() {
        let (queue, _) = queue();
        let result = queue
            .resolve(core_kernel::ReviewId::new(), ReviewDecision::Approve, "Alex", "n/a")
            .await;
        assert!(matches!(result, Err(ClaimError::ReviewNotFound(_))));
    }

    #[tokio::test]
    async fn test_statistics_count_each_record_once() {
        let (queue, _) = queue();
        for confidence in [20.0, 40.0, 60.0] {
            queue
                .enqueue(ClaimFactsBuilder::new().build(), analysis_with_confidence(confidence), "test")
                .await
                .unwrap();
        }
        let first = queue.list_pending().await.unwrap()[0].review_id;
        queue
            .resolve(first, ReviewDecision::Reject, "Alex", "Insufficient evidence")
            .await
            .unwrap();

        let stats = queue.statistics().await.unwrap();
        assert_eq!(stats.total_reviews, 3);
        assert_eq!(stats.pending, 2);
        assert_eq!(stats.reviewed, 1);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.approved, 0);
    }
}

// ============================================================================
// Terminal approval and the policy ledger
// ============================================================================

mod ledger_tests {
    use super::*;

    #[tokio::test]
    async fn test_ledger_untouched_until_human_approval() {
        let engine = TestEngine::new();
        let record = assert_escalated(
            engine
                .orchestrator
                .process(Scenarios::d_fraud_flagged().request())
                .await
                .unwrap(),
        );
        assert!(engine.ledger.applied().await.is_empty());

        engine
            .orchestrator
            .resolve_review(record.review_id, ReviewDecision::Approve, "Alex", "Fraud cleared by SIU")
            .await
            .unwrap();

        let applied = engine.ledger.applied().await;
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].1.new_past_claims_amount, dec!(7000));
    }

    #[tokio::test]
    async fn test_approving_an_error_analysis_does_not_touch_ledger() {
        let engine = TestEngine::new();
        let record = assert_escalated(
            engine
                .orchestrator
                .process(DecisionRequest {
                    claim: None,
                    policy: Some(PolicySnapshotBuilder::new().build()),
                    fraud: FraudSignal::Scored {
                        probability: 0.1,
                        threshold: None,
                    },
                    exclusion: None,
                })
                .await
                .unwrap(),
        );

        engine
            .orchestrator
            .resolve_review(record.review_id, ReviewDecision::Approve, "Alex", "Paper claim reviewed")
            .await
            .unwrap();
        assert!(engine.ledger.applied().await.is_empty());
    }
}

// ============================================================================
// Properties
// ============================================================================

mod property_tests {
    use super::*;
    use proptest::prelude::*;
    use test_utils::{limit_exceeded_case, terminal_within_limit_case};

    fn evaluator() -> EligibilityEvaluator {
        EligibilityEvaluator::new(ScoringConfig::default())
    }

    proptest! {
        #[test]
        fn over_limit_claims_are_rejected_at_95((claim, policy) in limit_exceeded_case()) {
            let result = evaluator().evaluate(Some(&claim), Some(&policy), &ExclusionLookup::NotApplicable);
            prop_assert_eq!(result.decision, EligibilityDecision::NotEligible);
            prop_assert_eq!(result.confidence_score, 95.0);
        }

        #[test]
        fn terminal_policies_are_rejected_at_100((claim, policy) in terminal_within_limit_case()) {
            let result = evaluator().evaluate(Some(&claim), Some(&policy), &ExclusionLookup::NotApplicable);
            prop_assert_eq!(result.decision, EligibilityDecision::NotEligible);
            prop_assert_eq!(result.confidence_score, 100.0);
        }

        #[test]
        fn confidence_stays_within_bounds(amount in test_utils::amount_strategy(), history in 0u32..8) {
            let claim = ClaimFactsBuilder::new().with_amount(amount).build();
            let policy = PolicySnapshotBuilder::new().with_history_count(history).build();
            let result = evaluator().evaluate(Some(&claim), Some(&policy), &ExclusionLookup::NotApplicable);
            prop_assert!((0.0..=100.0).contains(&result.confidence_score));
        }
    }
}
