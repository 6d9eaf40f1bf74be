// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence seams used by the dispatcher.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::CampaignerError;
use crate::types::{
    Campaign, CampaignId, CampaignStatus, DeliveryMessage, Recipient, ServiceConfig, ServiceId,
    SourceType, SubscriberId, TagId,
};

/// Campaign lookup and lifecycle updates.
#[async_trait]
pub trait CampaignStore: Send + Sync {
    /// Oldest `Draft` campaign (by creation time, then id) whose schedule is
    /// unset or not later than `now`.
    async fn next_eligible(&self, now: DateTime<Utc>) -> Result<Option<Campaign>, CampaignerError>;

    /// Move `id` from `from` to `to` only if it is still in `from`.
    ///
    /// Returns `false` when another worker got there first.
    async fn transition_status(
        &self,
        id: CampaignId,
        from: CampaignStatus,
        to: CampaignStatus,
    ) -> Result<bool, CampaignerError>;

    /// Unconditionally set the status.
    async fn update_status(
        &self,
        id: CampaignId,
        status: CampaignStatus,
    ) -> Result<(), CampaignerError>;

    async fn tags_for(&self, id: CampaignId) -> Result<Vec<TagId>, CampaignerError>;
}

#[async_trait]
pub trait RecipientStore: Send + Sync {
    /// Recipients holding at least one of `tags`, each at most once.
    ///
    /// With `exclude_unsubscribed`, anyone with either unsubscribe field set
    /// is left out.
    async fn find_by_tags(
        &self,
        tags: &[TagId],
        exclude_unsubscribed: bool,
    ) -> Result<Vec<Recipient>, CampaignerError>;
}

/// The message ledger: one row per attempted delivery, unique on
/// `(subscriber_id, source_id, source_type)`.
#[async_trait]
pub trait MessageLedger: Send + Sync {
    async fn exists(
        &self,
        subscriber_id: SubscriberId,
        source_id: i64,
        source_type: SourceType,
    ) -> Result<bool, CampaignerError>;

    /// Insert a queued message. Returns `None` if a row with the same
    /// dedup key already exists.
    async fn create(&self, message: &DeliveryMessage) -> Result<Option<i64>, CampaignerError>;

    /// Persist the outcome timestamps of a previously created message.
    /// Outcomes already recorded in the ledger are never overwritten.
    async fn update(&self, message: &DeliveryMessage) -> Result<(), CampaignerError>;
}

#[async_trait]
pub trait ServiceDirectory: Send + Sync {
    async fn service_config(&self, id: ServiceId)
    -> Result<Option<ServiceConfig>, CampaignerError>;
}
