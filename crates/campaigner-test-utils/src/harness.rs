// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end dispatch testing.
//!
//! `TestHarness` assembles the full dispatch stack over a temp SQLite
//! database: store, transport registry with a [`MockTransport`], delivery
//! handler, and dispatcher. One email service and one template are seeded
//! so campaigns can be created straight away.

use std::sync::Arc;
use std::time::Duration;

use campaigner_core::{
    Campaign, CampaignId, CampaignerError, DeliveryMessage, EmailTemplate, Recipient,
    ServiceConfig, SourceType,
};
use campaigner_dispatch::{CampaignDispatcher, DeliveryHandler, DispatchStep, RunOutcome};
use campaigner_storage::queries::{campaigns, events, messages, recipients, services, tags, templates};
use campaigner_storage::{CampaignDraft, Database, NewSubscriber, SqliteStore};
use campaigner_transport::TransportRegistry;

use crate::mock_transport::{MOCK_SERVICE_TYPE, MockTransport, MockTransportFactory};

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    transport: MockTransport,
    queue_depth: usize,
    send_timeout: Option<Duration>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            transport: MockTransport::new(),
            queue_depth: 1,
            send_timeout: None,
        }
    }

    /// Use a preconfigured mock transport (failing recipients, delay).
    pub fn with_transport(mut self, transport: MockTransport) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_queue_depth(mut self, depth: usize) -> Self {
        self.queue_depth = depth;
        self
    }

    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = Some(timeout);
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, CampaignerError> {
        let temp_dir = tempfile::TempDir::new().map_err(CampaignerError::storage)?;
        let db_path = temp_dir.path().join("test.db");
        let db = Database::open(&db_path.to_string_lossy()).await?;
        let store = Arc::new(SqliteStore::new(db.clone()));

        let mut registry = TransportRegistry::with_builtin();
        registry.register(Arc::new(MockTransportFactory::new(self.transport.clone())));
        let registry = Arc::new(registry);

        let service = services::create_service(&db, "mock service", MOCK_SERVICE_TYPE, "{}").await?;
        let template =
            templates::create_template(&db, "welcome", "<p>Hello from the test harness</p>").await?;

        let handler = DeliveryHandler::new(store.clone(), store.clone(), Arc::clone(&registry))
            .with_send_timeout(self.send_timeout);
        let dispatcher = CampaignDispatcher::new(store.clone(), store.clone(), Arc::new(handler))
            .with_queue_depth(self.queue_depth);

        Ok(TestHarness {
            db,
            store,
            registry,
            transport: self.transport,
            dispatcher: Arc::new(dispatcher),
            service,
            template,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete dispatch environment with a mock transport and temp storage.
pub struct TestHarness {
    pub db: Database,
    /// SQLite store (temp DB, cleaned up on drop).
    pub store: Arc<SqliteStore>,
    pub registry: Arc<TransportRegistry>,
    /// Captures every send the dispatcher makes.
    pub transport: MockTransport,
    pub dispatcher: Arc<CampaignDispatcher>,
    /// The seeded mock email service.
    pub service: ServiceConfig,
    /// The seeded template campaigns copy their content from.
    pub template: EmailTemplate,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Subscribe `email` to `tag_names`, creating tags as needed. An empty
    /// list subscribes to `"all"`.
    pub async fn subscribe(
        &self,
        email: &str,
        tag_names: &[&str],
    ) -> Result<Recipient, CampaignerError> {
        let subscriber = NewSubscriber {
            email: email.to_string(),
            first_name: "Test".into(),
            last_name: "Reader".into(),
        };
        recipients::subscribe(&self.db, &subscriber, &owned(tag_names), true).await
    }

    /// Unsubscribe a recipient through a fresh unsubscribe event.
    pub async fn unsubscribe(&self, recipient: &Recipient) -> Result<(), CampaignerError> {
        let event = events::create_unsubscribe_event(&self.db, 1, "test unsubscribe").await?;
        recipients::unsubscribe(&self.db, recipient.id, event.id).await?;
        Ok(())
    }

    /// Create a due draft campaign on the seeded service and template.
    pub async fn create_campaign(
        &self,
        name: &str,
        tag_names: &[&str],
    ) -> Result<Campaign, CampaignerError> {
        let tag_ids = tags::resolve_tag_ids(&self.db, &owned(tag_names), true).await?;
        let draft = CampaignDraft {
            name: name.to_string(),
            email_service_id: self.service.id,
            template_id: self.template.id,
            scheduled_at: None,
            from_email: "news@example.com".into(),
            from_name: "Newsroom".into(),
            subject: format!("{name} update"),
        };
        campaigns::create_campaign(&self.db, &draft, &tag_ids).await
    }

    /// Current state of a campaign.
    pub async fn campaign(&self, id: CampaignId) -> Result<Campaign, CampaignerError> {
        campaigns::get_campaign(&self.db, id)
            .await?
            .ok_or_else(|| CampaignerError::Internal(format!("campaign {id} not found")))
    }

    /// Ledger rows written for a campaign, in insert order.
    pub async fn messages_for(
        &self,
        id: CampaignId,
    ) -> Result<Vec<DeliveryMessage>, CampaignerError> {
        messages::list_for_source(&self.db, id.0, SourceType::Campaign).await
    }

    /// One dispatch step, as a scheduler tick would run it.
    pub async fn run_dispatch(&self) -> Result<RunOutcome, CampaignerError> {
        self.dispatcher.run().await
    }
}

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}
