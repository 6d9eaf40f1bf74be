// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Campaigner dispatch engine.
//!
//! Domain types, the error taxonomy, and the collaborator traits that the
//! storage, transport, and dispatch crates implement or consume.

pub mod error;
pub mod traits;
pub mod types;

pub use error::CampaignerError;
pub use types::{
    ALL_TAG, Campaign, CampaignId, CampaignStatus, ChannelKind, DedupKey, DeliveryMessage,
    DeliveryState, EmailTemplate, Recipient, ServiceConfig, ServiceId, SourceType, SubscriberId,
    Tag, TagId, UnsubscribeEvent,
};

pub use traits::{
    CampaignStore, Envelope, MessageLedger, RecipientStore, ServiceDirectory, Transport,
    TransportFactory,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_traits_are_object_safe() {
        fn _campaigns(_: &dyn CampaignStore) {}
        fn _recipients(_: &dyn RecipientStore) {}
        fn _ledger(_: &dyn MessageLedger) {}
        fn _services(_: &dyn ServiceDirectory) {}
        fn _transport(_: &dyn Transport) {}
        fn _factory(_: &dyn TransportFactory) {}
    }

    #[test]
    fn envelope_borrows_message_fields() {
        let msg = DeliveryMessage {
            id: Some(1),
            subscriber_id: SubscriberId(2),
            source_id: 3,
            source_type: SourceType::Campaign,
            recipient_email: "to@example.org".into(),
            email_service_id: ServiceId(4),
            from_email: "from@example.com".into(),
            from_name: "Sender".into(),
            subject: "Hi".into(),
            body: "Body".into(),
            queued_at: chrono::Utc::now(),
            sent_at: None,
            failed_at: None,
        };
        let env = Envelope::from_message(&msg);
        assert_eq!(env.to, "to@example.org");
        assert_eq!(env.from_address, "from@example.com");
        assert_eq!(env.from_name, "Sender");
        assert_eq!(env.subject, "Hi");
        assert_eq!(env.body, "Body");
    }
}
