// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Input records for operator writes.
//!
//! Read-side rows map straight onto the `campaigner-core` domain types,
//! re-exported here for callers that only depend on storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use campaigner_core::ServiceId;
pub use campaigner_core::types::{
    Campaign, CampaignStatus, DeliveryMessage, EmailTemplate, Recipient, ServiceConfig, Tag,
    UnsubscribeEvent,
};

/// A new email subscriber.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewSubscriber {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// Operator-editable campaign fields, used for both create and update.
///
/// The body is not part of the draft: it is copied from `template_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignDraft {
    pub name: String,
    pub email_service_id: ServiceId,
    pub template_id: i64,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub from_email: String,
    pub from_name: String,
    pub subject: String,
}

/// A new mobile (SMS) subscriber.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewMobileSubscriber {
    pub country_code: String,
    pub mobile: String,
    pub first_name: String,
    pub last_name: String,
}

/// A stored mobile subscriber. Unsubscribe state works as for email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MobileSubscriber {
    pub id: i64,
    pub country_code: String,
    pub mobile: String,
    pub first_name: String,
    pub last_name: String,
    pub unsubscribed_at: Option<DateTime<Utc>>,
    pub unsubscribed_event_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl MobileSubscriber {
    pub fn is_unsubscribed(&self) -> bool {
        self.unsubscribed_at.is_some() || self.unsubscribed_event_id.is_some()
    }
}

/// A push provider (e.g. FCM, APNs) a notification token belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationDriver {
    pub id: i64,
    pub name: String,
}

/// A new push-notification token.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewNotificationSubscriber {
    pub token: String,
    pub driver_id: i64,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationSubscriber {
    pub id: i64,
    pub token: String,
    pub driver_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
}
