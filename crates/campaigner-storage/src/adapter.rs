// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the dispatcher's collaborator traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use campaigner_core::types::{
    Campaign, CampaignId, CampaignStatus, DeliveryMessage, Recipient, ServiceConfig, ServiceId,
    SourceType, SubscriberId, TagId,
};
use campaigner_core::{
    CampaignStore, CampaignerError, MessageLedger, RecipientStore, ServiceDirectory,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed store.
///
/// One value serves every collaborator role; share it as an `Arc` and hand
/// it to the dispatcher once per trait.
#[derive(Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// The database handle, for operator queries outside the dispatch path.
    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl CampaignStore for SqliteStore {
    async fn next_eligible(&self, now: DateTime<Utc>) -> Result<Option<Campaign>, CampaignerError> {
        queries::campaigns::next_eligible(&self.db, now).await
    }

    async fn transition_status(
        &self,
        id: CampaignId,
        from: CampaignStatus,
        to: CampaignStatus,
    ) -> Result<bool, CampaignerError> {
        queries::campaigns::transition_status(&self.db, id, from, to).await
    }

    async fn update_status(
        &self,
        id: CampaignId,
        status: CampaignStatus,
    ) -> Result<(), CampaignerError> {
        queries::campaigns::update_status(&self.db, id, status).await
    }

    async fn tags_for(&self, id: CampaignId) -> Result<Vec<TagId>, CampaignerError> {
        queries::campaigns::tags_for(&self.db, id).await
    }
}

#[async_trait]
impl RecipientStore for SqliteStore {
    async fn find_by_tags(
        &self,
        tags: &[TagId],
        exclude_unsubscribed: bool,
    ) -> Result<Vec<Recipient>, CampaignerError> {
        queries::recipients::find_by_tags(&self.db, tags, exclude_unsubscribed).await
    }
}

#[async_trait]
impl MessageLedger for SqliteStore {
    async fn exists(
        &self,
        subscriber_id: SubscriberId,
        source_id: i64,
        source_type: SourceType,
    ) -> Result<bool, CampaignerError> {
        queries::messages::exists(&self.db, subscriber_id, source_id, source_type).await
    }

    async fn create(&self, message: &DeliveryMessage) -> Result<Option<i64>, CampaignerError> {
        queries::messages::create(&self.db, message).await
    }

    async fn update(&self, message: &DeliveryMessage) -> Result<(), CampaignerError> {
        queries::messages::update(&self.db, message).await
    }
}

#[async_trait]
impl ServiceDirectory for SqliteStore {
    async fn service_config(
        &self,
        id: ServiceId,
    ) -> Result<Option<ServiceConfig>, CampaignerError> {
        queries::services::get_service(&self.db, id).await
    }
}
