// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the dispatch pipeline over a real SQLite store.
//!
//! Each test creates an isolated TestHarness with a temp database and a mock
//! transport. Tests are independent and order-insensitive.

use std::time::Duration;

use campaigner_core::{CampaignStatus, DeliveryState, RecipientStore, TagId};
use campaigner_dispatch::RunOutcome;
use campaigner_storage::queries::{campaigns, services, tags};
use campaigner_test_utils::{MockTransport, TestHarness};

async fn tag_id(harness: &TestHarness, name: &str) -> TagId {
    tags::get_tag_by_name(&harness.db, name).await.unwrap().unwrap().id
}

// ---- Empty tag set ----

#[tokio::test]
async fn test_campaign_without_tags_fails_and_sends_nothing() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.subscribe("a@example.org", &["spring"]).await.unwrap();
    let campaign = harness.create_campaign("spring", &["spring"]).await.unwrap();

    // Deleting the only tag leaves the campaign with an empty tag set.
    assert!(tags::delete_tag(&harness.db, "spring").await.unwrap());

    let outcome = harness.run_dispatch().await.unwrap();
    assert_eq!(outcome, RunOutcome::Failed { campaign_id: campaign.id });
    assert_eq!(harness.campaign(campaign.id).await.unwrap().status, CampaignStatus::Failed);
    assert!(harness.messages_for(campaign.id).await.unwrap().is_empty());
    assert_eq!(harness.transport.sent_count().await, 0);

    // Failed is terminal.
    assert_eq!(harness.run_dispatch().await.unwrap(), RunOutcome::Idle);
}

// ---- Happy path ----

#[tokio::test]
async fn test_one_message_per_eligible_recipient() {
    let harness = TestHarness::builder().build().await.unwrap();
    for email in ["a@example.org", "b@example.org", "c@example.org"] {
        harness.subscribe(email, &[]).await.unwrap();
    }
    let campaign = harness.create_campaign("launch", &["all"]).await.unwrap();

    let outcome = harness.run_dispatch().await.unwrap();
    let RunOutcome::Sent { campaign_id, report } = outcome else {
        panic!("expected Sent, got {outcome:?}");
    };
    assert_eq!(campaign_id, campaign.id);
    assert_eq!(report.accepted, 3);
    assert_eq!(report.delivered, 3);

    let stored = harness.campaign(campaign.id).await.unwrap();
    assert_eq!(stored.status, CampaignStatus::Sent);

    let messages = harness.messages_for(campaign.id).await.unwrap();
    assert_eq!(messages.len(), 3);
    assert!(messages.iter().all(|m| m.state() == DeliveryState::Sent));

    let sent = harness.transport.sent_messages().await;
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[0].subject, "launch update");
    assert_eq!(sent[0].from_address, "news@example.com");
    assert_eq!(sent[0].body, harness.template.content);
}

#[tokio::test]
async fn test_nothing_due_is_idle() {
    let harness = TestHarness::builder().build().await.unwrap();
    assert_eq!(harness.run_dispatch().await.unwrap(), RunOutcome::Idle);
}

// ---- Idempotence ----

#[tokio::test]
async fn test_second_run_for_same_campaign_sends_nothing() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.subscribe("a@example.org", &[]).await.unwrap();
    harness.subscribe("b@example.org", &[]).await.unwrap();
    let campaign = harness.create_campaign("again", &["all"]).await.unwrap();

    harness.run_dispatch().await.unwrap();
    assert_eq!(harness.transport.sent_count().await, 2);

    // Put the campaign back in line as if a retried tick picked it up again.
    campaigns::update_status(&harness.db, campaign.id, CampaignStatus::Draft)
        .await
        .unwrap();
    let outcome = harness.run_dispatch().await.unwrap();
    let RunOutcome::Sent { report, .. } = outcome else {
        panic!("expected Sent, got {outcome:?}");
    };
    assert_eq!(report.skipped_duplicate, 2);
    assert_eq!(report.delivered, 0);

    assert_eq!(harness.transport.sent_count().await, 2);
    assert_eq!(harness.messages_for(campaign.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_overlapping_runs_claim_the_campaign_once() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.subscribe("a@example.org", &[]).await.unwrap();
    harness.subscribe("b@example.org", &[]).await.unwrap();
    let campaign = harness.create_campaign("race", &["all"]).await.unwrap();

    let (first, second) = tokio::join!(harness.run_dispatch(), harness.run_dispatch());
    let outcomes = [first.unwrap(), second.unwrap()];
    let sent = outcomes
        .iter()
        .filter(|o| matches!(o, RunOutcome::Sent { .. }))
        .count();
    assert_eq!(sent, 1, "{outcomes:?}");
    assert!(outcomes.iter().all(|o| match o {
        RunOutcome::Sent { campaign_id, .. } | RunOutcome::LostRace { campaign_id } =>
            *campaign_id == campaign.id,
        RunOutcome::Idle => true,
        RunOutcome::Failed { .. } => false,
    }));

    assert_eq!(harness.transport.sent_count().await, 2);
    assert_eq!(harness.messages_for(campaign.id).await.unwrap().len(), 2);
}

// ---- Recipient deduplication ----

#[tokio::test]
async fn test_recipient_in_two_tags_gets_one_message() {
    let harness = TestHarness::builder().build().await.unwrap();
    let both = harness.subscribe("both@example.org", &["news", "offers"]).await.unwrap();
    harness.subscribe("news@example.org", &["news"]).await.unwrap();
    let campaign = harness.create_campaign("digest", &["news", "offers"]).await.unwrap();

    harness.run_dispatch().await.unwrap();

    let messages = harness.messages_for(campaign.id).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(
        messages.iter().filter(|m| m.subscriber_id == both.id).count(),
        1
    );
    assert_eq!(
        harness
            .transport
            .attempted()
            .await
            .iter()
            .filter(|to| *to == "both@example.org")
            .count(),
        1
    );
}

// ---- Unsubscribed exclusion ----

#[tokio::test]
async fn test_unsubscribed_recipient_is_never_found() {
    let harness = TestHarness::builder().build().await.unwrap();
    let gone = harness.subscribe("gone@example.org", &["news"]).await.unwrap();
    let kept = harness.subscribe("kept@example.org", &["news"]).await.unwrap();
    harness.unsubscribe(&gone).await.unwrap();

    let news = tag_id(&harness, "news").await;
    let all = tag_id(&harness, "all").await;
    let found = harness.store.find_by_tags(&[news, all], true).await.unwrap();
    let ids: Vec<_> = found.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![kept.id]);
}

// ---- Continue-on-error ----

#[tokio::test]
async fn test_transport_failure_does_not_stop_the_campaign() {
    let transport = MockTransport::new();
    transport.fail_for("r1@example.org").await;
    let harness = TestHarness::builder()
        .with_transport(transport)
        .build()
        .await
        .unwrap();
    let r1 = harness.subscribe("r1@example.org", &[]).await.unwrap();
    let r2 = harness.subscribe("r2@example.org", &[]).await.unwrap();
    let campaign = harness.create_campaign("mixed", &["all"]).await.unwrap();

    let outcome = harness.run_dispatch().await.unwrap();
    let RunOutcome::Sent { report, .. } = outcome else {
        panic!("expected Sent, got {outcome:?}");
    };
    assert_eq!(report.failed, 1);
    assert_eq!(report.delivered, 1);
    assert_eq!(harness.campaign(campaign.id).await.unwrap().status, CampaignStatus::Sent);

    let messages = harness.messages_for(campaign.id).await.unwrap();
    let m1 = messages.iter().find(|m| m.subscriber_id == r1.id).unwrap();
    let m2 = messages.iter().find(|m| m.subscriber_id == r2.id).unwrap();
    assert!(m1.failed_at.is_some());
    assert!(m1.sent_at.is_none());
    assert!(m2.sent_at.is_some());
    assert!(m2.failed_at.is_none());
}

#[tokio::test]
async fn test_deleted_service_fails_each_message() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.subscribe("a@example.org", &[]).await.unwrap();
    let campaign = harness.create_campaign("orphan", &["all"]).await.unwrap();
    assert!(services::delete_service(&harness.db, harness.service.id).await.unwrap());

    let outcome = harness.run_dispatch().await.unwrap();
    let RunOutcome::Sent { report, .. } = outcome else {
        panic!("expected Sent, got {outcome:?}");
    };
    assert_eq!(report.failed, 1);
    let messages = harness.messages_for(campaign.id).await.unwrap();
    assert_eq!(messages[0].state(), DeliveryState::Failed);
    assert_eq!(harness.transport.sent_count().await, 0);
}

#[tokio::test]
async fn test_hung_transport_times_out() {
    let harness = TestHarness::builder()
        .with_transport(MockTransport::new().with_delay(Duration::from_secs(30)))
        .with_send_timeout(Duration::from_millis(50))
        .build()
        .await
        .unwrap();
    harness.subscribe("slow@example.org", &[]).await.unwrap();
    let campaign = harness.create_campaign("slow", &["all"]).await.unwrap();

    harness.run_dispatch().await.unwrap();
    let messages = harness.messages_for(campaign.id).await.unwrap();
    assert_eq!(messages[0].state(), DeliveryState::Failed);
    assert_eq!(harness.campaign(campaign.id).await.unwrap().status, CampaignStatus::Sent);
}

// ---- Scenario: one of two "all" subscribers previously unsubscribed ----

#[tokio::test]
async fn test_scenario_all_tag_with_one_unsubscribed() {
    let harness = TestHarness::builder().build().await.unwrap();
    let active = harness.subscribe("active@example.org", &["all"]).await.unwrap();
    let gone = harness.subscribe("gone@example.org", &["all"]).await.unwrap();
    harness.unsubscribe(&gone).await.unwrap();
    let campaign = harness.create_campaign("scenario", &["all"]).await.unwrap();

    let outcome = harness.run_dispatch().await.unwrap();
    assert!(matches!(outcome, RunOutcome::Sent { .. }));
    assert_eq!(harness.campaign(campaign.id).await.unwrap().status, CampaignStatus::Sent);

    let messages = harness.messages_for(campaign.id).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].subscriber_id, active.id);
    assert_eq!(harness.transport.attempted().await, vec!["active@example.org"]);
}

// ---- Ordering across campaigns ----

#[tokio::test]
async fn test_campaigns_are_dispatched_oldest_first() {
    let harness = TestHarness::builder().with_queue_depth(4).build().await.unwrap();
    harness.subscribe("a@example.org", &[]).await.unwrap();
    let first = harness.create_campaign("first", &["all"]).await.unwrap();
    let second = harness.create_campaign("second", &["all"]).await.unwrap();

    let a = harness.run_dispatch().await.unwrap();
    let b = harness.run_dispatch().await.unwrap();
    assert!(matches!(a, RunOutcome::Sent { campaign_id, .. } if campaign_id == first.id));
    assert!(matches!(b, RunOutcome::Sent { campaign_id, .. } if campaign_id == second.id));
    assert_eq!(harness.run_dispatch().await.unwrap(), RunOutcome::Idle);
}
