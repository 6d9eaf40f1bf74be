// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery transports and the factories that build them from a service payload.

use async_trait::async_trait;

use crate::error::CampaignerError;
use crate::types::DeliveryMessage;

/// What a transport needs to put one email on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope<'a> {
    pub from_name: &'a str,
    pub from_address: &'a str,
    pub to: &'a str,
    pub subject: &'a str,
    pub body: &'a str,
}

impl<'a> Envelope<'a> {
    pub fn from_message(message: &'a DeliveryMessage) -> Self {
        Self {
            from_name: &message.from_name,
            from_address: &message.from_email,
            to: &message.recipient_email,
            subject: &message.subject,
            body: &message.body,
        }
    }
}

/// A configured delivery backend.
#[async_trait]
pub trait Transport: Send + Sync {
    /// The service type key this transport was built for (e.g. `"smtp"`).
    fn service_type(&self) -> &str;

    /// Deliver one email. Any failure is scoped to this recipient.
    async fn send(&self, envelope: &Envelope<'_>) -> Result<(), CampaignerError>;
}

/// Builds a [`Transport`] from an opaque, transport-specific payload.
pub trait TransportFactory: Send + Sync {
    fn service_type(&self) -> &str;

    /// Parse `payload` and return a ready transport.
    ///
    /// Returns [`CampaignerError::Config`] when the payload is malformed.
    fn configure(&self, payload: &str) -> Result<Box<dyn Transport>, CampaignerError>;
}
