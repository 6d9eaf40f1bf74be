// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the stores, the transports, and the dispatcher.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::CampaignerError;

/// Name of the reserved tag implicitly assigned to subscribers without tags.
pub const ALL_TAG: &str = "all";

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Identifier of a campaign row.
    CampaignId
);
id_type!(
    /// Identifier of a tag row.
    TagId
);
id_type!(
    /// Identifier of a subscriber (recipient) row.
    SubscriberId
);
id_type!(
    /// Identifier of a configured email service.
    ServiceId
);

/// Subscriber population a scheduler works on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Email,
    Mobile,
    Notification,
}

/// Campaign lifecycle.
///
/// `Draft -> Sending -> Sent | Failed`. `Sending -> Draft` is only used to
/// hand a campaign back to the next tick after a transient store error.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Draft,
    Sending,
    Sent,
    Failed,
}

impl CampaignStatus {
    /// Whether the dispatcher may move a campaign from `self` to `next`.
    pub fn can_transition_to(self, next: CampaignStatus) -> bool {
        use CampaignStatus::*;
        matches!(
            (self, next),
            (Draft, Sending) | (Sending, Sent) | (Sending, Failed) | (Sending, Draft)
        )
    }

    /// Terminal statuses are never picked up again.
    pub fn is_terminal(self) -> bool {
        matches!(self, CampaignStatus::Sent | CampaignStatus::Failed)
    }
}

/// Discriminator for what produced a delivery message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Campaign,
}

/// A scheduled bulk send targeting the recipients of a tag set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub name: String,
    pub email_service_id: ServiceId,
    /// Template the content was copied from, if it still exists.
    pub template_id: Option<i64>,
    pub status: CampaignStatus,
    /// `None` means "as soon as a scheduler picks it".
    pub scheduled_at: Option<DateTime<Utc>>,
    pub from_email: String,
    pub from_name: String,
    pub subject: String,
    /// Snapshot of the template body taken at create/update time.
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    /// A campaign is due when it is a draft and its schedule (if any) has passed.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == CampaignStatus::Draft && self.scheduled_at.is_none_or(|at| at <= now)
    }
}

/// An email subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    pub id: SubscriberId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub unsubscribed_at: Option<DateTime<Utc>>,
    pub unsubscribed_event_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Recipient {
    /// Either unsubscribe field alone marks the recipient as unsubscribed.
    pub fn is_unsubscribed(&self) -> bool {
        self.unsubscribed_at.is_some() || self.unsubscribed_event_id.is_some()
    }
}

/// A named recipient group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
}

impl Tag {
    /// Tag names are case-insensitive and stored lower-case.
    pub fn normalize_name(name: &str) -> String {
        name.trim().to_lowercase()
    }

    pub fn is_reserved(&self) -> bool {
        self.name == ALL_TAG
    }
}

/// Why a subscriber left.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsubscribeEvent {
    pub id: i64,
    pub kind: u8,
    pub reason: String,
}

/// A reusable email body. Campaigns copy its content; they never reference it live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailTemplate {
    pub id: i64,
    pub name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A configured delivery service: a service type key plus an opaque payload
/// only the matching transport understands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub id: ServiceId,
    pub name: String,
    pub service_type: String,
    pub payload: String,
}

/// Delivery progress of one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeliveryState {
    Queued,
    Sent,
    Failed,
}

/// The idempotency key of the message ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub subscriber_id: SubscriberId,
    pub source_id: i64,
    pub source_type: SourceType,
}

/// One persisted attempt to deliver a campaign's content to one recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryMessage {
    /// Ledger row id, `None` until the message has been persisted.
    pub id: Option<i64>,
    pub subscriber_id: SubscriberId,
    pub source_id: i64,
    pub source_type: SourceType,
    pub recipient_email: String,
    pub email_service_id: ServiceId,
    pub from_email: String,
    pub from_name: String,
    pub subject: String,
    pub body: String,
    pub queued_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
}

impl DeliveryMessage {
    /// Build the message for one recipient of a campaign.
    ///
    /// Sender fields and body are copied from the campaign now; `queued_at`
    /// is the construction time.
    pub fn for_campaign(campaign: &Campaign, recipient: &Recipient) -> Self {
        Self {
            id: None,
            subscriber_id: recipient.id,
            source_id: campaign.id.0,
            source_type: SourceType::Campaign,
            recipient_email: recipient.email.clone(),
            email_service_id: campaign.email_service_id,
            from_email: campaign.from_email.clone(),
            from_name: campaign.from_name.clone(),
            subject: campaign.subject.clone(),
            body: campaign.content.clone(),
            queued_at: Utc::now(),
            sent_at: None,
            failed_at: None,
        }
    }

    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            subscriber_id: self.subscriber_id,
            source_id: self.source_id,
            source_type: self.source_type,
        }
    }

    pub fn state(&self) -> DeliveryState {
        match (self.sent_at, self.failed_at) {
            (Some(_), _) => DeliveryState::Sent,
            (None, Some(_)) => DeliveryState::Failed,
            (None, None) => DeliveryState::Queued,
        }
    }

    /// Record a successful send. One-way: fails if an outcome is already set.
    pub fn mark_sent(&mut self, at: DateTime<Utc>) -> Result<(), CampaignerError> {
        self.ensure_queued("sent")?;
        self.sent_at = Some(at);
        Ok(())
    }

    /// Record a failed send. One-way: fails if an outcome is already set.
    pub fn mark_failed(&mut self, at: DateTime<Utc>) -> Result<(), CampaignerError> {
        self.ensure_queued("failed")?;
        self.failed_at = Some(at);
        Ok(())
    }

    fn ensure_queued(&self, target: &str) -> Result<(), CampaignerError> {
        let current = self.state();
        if current == DeliveryState::Queued {
            return Ok(());
        }
        Err(CampaignerError::InvalidTransition {
            entity: "delivery message",
            id: self.id.unwrap_or_default(),
            detail: format!("already {current}, cannot mark {target}"),
        })
    }
}
