// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory collaborators for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use campaigner_core::{
    Campaign, CampaignId, CampaignStatus, CampaignStore, CampaignerError, DeliveryMessage,
    Envelope, MessageLedger, Recipient, RecipientStore, ServiceConfig, ServiceDirectory, ServiceId,
    SourceType, SubscriberId, TagId, Transport, TransportFactory,
};

pub const FAKE_SERVICE_TYPE: &str = "fake";

fn store_down() -> CampaignerError {
    CampaignerError::storage(std::io::Error::other("store unavailable"))
}

pub fn epoch(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

pub fn recipient(id: i64, email: &str) -> Recipient {
    Recipient {
        id: SubscriberId(id),
        email: email.to_string(),
        first_name: String::new(),
        last_name: String::new(),
        unsubscribed_at: None,
        unsubscribed_event_id: None,
        created_at: epoch(0),
    }
}

pub fn campaign(id: i64) -> Campaign {
    Campaign {
        id: CampaignId(id),
        name: format!("campaign {id}"),
        email_service_id: ServiceId(1),
        template_id: Some(1),
        status: CampaignStatus::Draft,
        scheduled_at: None,
        from_email: "news@example.com".into(),
        from_name: "News".into(),
        subject: "Hello".into(),
        content: "<p>hi</p>".into(),
        created_at: epoch(id),
        updated_at: epoch(id),
    }
}

pub fn message(subscriber: i64, source: i64) -> DeliveryMessage {
    DeliveryMessage::for_campaign(
        &campaign(source),
        &recipient(subscriber, &format!("r{subscriber}@example.org")),
    )
}

/// Recipient store over `(tag, recipient)` rows. Returns one entry per
/// matching row, so duplicates across tags come through.
pub struct FakeRecipients {
    rows: Vec<(TagId, Recipient)>,
    honor_filter: bool,
    fail: bool,
}

impl FakeRecipients {
    pub fn new(rows: Vec<(TagId, Recipient)>) -> Self {
        Self {
            rows,
            honor_filter: true,
            fail: false,
        }
    }

    pub fn ignoring_unsubscribe_filter(mut self) -> Self {
        self.honor_filter = false;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[async_trait]
impl RecipientStore for FakeRecipients {
    async fn find_by_tags(
        &self,
        tags: &[TagId],
        exclude_unsubscribed: bool,
    ) -> Result<Vec<Recipient>, CampaignerError> {
        if self.fail {
            return Err(store_down());
        }
        Ok(self
            .rows
            .iter()
            .filter(|(tag, _)| tags.contains(tag))
            .filter(|(_, r)| !(exclude_unsubscribed && self.honor_filter && r.is_unsubscribed()))
            .map(|(_, r)| r.clone())
            .collect())
    }
}

#[derive(Default)]
pub struct FakeCampaigns {
    campaigns: Mutex<Vec<Campaign>>,
    tags: Mutex<HashMap<CampaignId, Vec<TagId>>>,
    fail_tags: bool,
    /// Simulates another worker claiming the campaign between pick and claim.
    lose_race: bool,
}

impl FakeCampaigns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_campaign(self, campaign: Campaign, tags: &[i64]) -> Self {
        self.tags
            .lock()
            .unwrap()
            .insert(campaign.id, tags.iter().copied().map(TagId).collect());
        self.campaigns.lock().unwrap().push(campaign);
        self
    }

    pub fn failing_tags(mut self) -> Self {
        self.fail_tags = true;
        self
    }

    pub fn losing_race(mut self) -> Self {
        self.lose_race = true;
        self
    }

    pub fn status(&self, id: i64) -> CampaignStatus {
        self.campaigns
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id.0 == id)
            .map(|c| c.status)
            .unwrap()
    }
}

#[async_trait]
impl CampaignStore for FakeCampaigns {
    async fn next_eligible(&self, now: DateTime<Utc>) -> Result<Option<Campaign>, CampaignerError> {
        let campaigns = self.campaigns.lock().unwrap();
        Ok(campaigns
            .iter()
            .filter(|c| c.is_due(now))
            .min_by_key(|c| (c.created_at, c.id))
            .cloned())
    }

    async fn transition_status(
        &self,
        id: CampaignId,
        from: CampaignStatus,
        to: CampaignStatus,
    ) -> Result<bool, CampaignerError> {
        if self.lose_race && from == CampaignStatus::Draft {
            return Ok(false);
        }
        let mut campaigns = self.campaigns.lock().unwrap();
        match campaigns.iter_mut().find(|c| c.id == id) {
            Some(c) if c.status == from => {
                c.status = to;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_status(
        &self,
        id: CampaignId,
        status: CampaignStatus,
    ) -> Result<(), CampaignerError> {
        let mut campaigns = self.campaigns.lock().unwrap();
        if let Some(c) = campaigns.iter_mut().find(|c| c.id == id) {
            c.status = status;
        }
        Ok(())
    }

    async fn tags_for(&self, id: CampaignId) -> Result<Vec<TagId>, CampaignerError> {
        if self.fail_tags {
            return Err(store_down());
        }
        Ok(self.tags.lock().unwrap().get(&id).cloned().unwrap_or_default())
    }
}

/// Ledger keyed like the real one; ids are assigned in insert order.
#[derive(Default)]
pub struct FakeLedger {
    rows: Mutex<Vec<DeliveryMessage>>,
    hide_existing: bool,
    fail_updates: bool,
}

impl FakeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// `exists` always answers `false`, so only `create` sees duplicates.
    pub fn hiding_existing(mut self) -> Self {
        self.hide_existing = true;
        self
    }

    /// `update` always fails with a storage error.
    pub fn failing_updates(mut self) -> Self {
        self.fail_updates = true;
        self
    }

    pub fn rows(&self) -> Vec<DeliveryMessage> {
        self.rows.lock().unwrap().clone()
    }

    pub fn seed(&self, message: DeliveryMessage) {
        let mut rows = self.rows.lock().unwrap();
        let mut message = message;
        message.id = Some(rows.len() as i64 + 1);
        rows.push(message);
    }
}

#[async_trait]
impl MessageLedger for FakeLedger {
    async fn exists(
        &self,
        subscriber_id: SubscriberId,
        source_id: i64,
        source_type: SourceType,
    ) -> Result<bool, CampaignerError> {
        if self.hide_existing {
            return Ok(false);
        }
        Ok(self.rows.lock().unwrap().iter().any(|m| {
            m.subscriber_id == subscriber_id
                && m.source_id == source_id
                && m.source_type == source_type
        }))
    }

    async fn create(&self, message: &DeliveryMessage) -> Result<Option<i64>, CampaignerError> {
        let mut rows = self.rows.lock().unwrap();
        let key = message.dedup_key();
        if rows.iter().any(|m| m.dedup_key() == key) {
            return Ok(None);
        }
        let id = rows.len() as i64 + 1;
        let mut stored = message.clone();
        stored.id = Some(id);
        rows.push(stored);
        Ok(Some(id))
    }

    async fn update(&self, message: &DeliveryMessage) -> Result<(), CampaignerError> {
        if self.fail_updates {
            return Err(store_down());
        }
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|m| m.id.is_some() && m.id == message.id)
            .ok_or_else(|| CampaignerError::Internal("unknown message".into()))?;
        row.sent_at = message.sent_at;
        row.failed_at = message.failed_at;
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeServices {
    services: HashMap<ServiceId, ServiceConfig>,
}

impl FakeServices {
    pub fn with(mut self, id: i64, service_type: &str) -> Self {
        self.services.insert(
            ServiceId(id),
            ServiceConfig {
                id: ServiceId(id),
                name: format!("service {id}"),
                service_type: service_type.to_string(),
                payload: "{}".into(),
            },
        );
        self
    }
}

#[async_trait]
impl ServiceDirectory for FakeServices {
    async fn service_config(
        &self,
        id: ServiceId,
    ) -> Result<Option<ServiceConfig>, CampaignerError> {
        Ok(self.services.get(&id).cloned())
    }
}

/// Shared state behind every transport a [`RecordingFactory`] builds.
#[derive(Default)]
pub struct Outbox {
    pub sent: Mutex<Vec<String>>,
    pub failing: HashSet<String>,
    pub delay: Option<Duration>,
}

impl Outbox {
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

struct RecordingTransport {
    outbox: Arc<Outbox>,
}

#[async_trait]
impl Transport for RecordingTransport {
    fn service_type(&self) -> &str {
        FAKE_SERVICE_TYPE
    }

    async fn send(&self, envelope: &Envelope<'_>) -> Result<(), CampaignerError> {
        if let Some(delay) = self.outbox.delay {
            tokio::time::sleep(delay).await;
        }
        if self.outbox.failing.contains(envelope.to) {
            return Err(CampaignerError::transport(format!("mailbox {} rejected", envelope.to)));
        }
        self.outbox.sent.lock().unwrap().push(envelope.to.to_string());
        Ok(())
    }
}

pub struct RecordingFactory {
    pub outbox: Arc<Outbox>,
}

impl TransportFactory for RecordingFactory {
    fn service_type(&self) -> &str {
        FAKE_SERVICE_TYPE
    }

    fn configure(&self, _payload: &str) -> Result<Box<dyn Transport>, CampaignerError> {
        Ok(Box::new(RecordingTransport {
            outbox: Arc::clone(&self.outbox),
        }))
    }
}
