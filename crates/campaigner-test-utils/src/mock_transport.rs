// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock transport for deterministic testing.
//!
//! `MockTransport` implements `Transport` by capturing every envelope it
//! accepts. Recipients can be marked as failing, and an artificial delay
//! can be added to every send.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use campaigner_core::{CampaignerError, Envelope, Transport, TransportFactory};

/// Service type the mock registers under.
pub const MOCK_SERVICE_TYPE: &str = "mock";

/// An owned copy of an accepted envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub from_name: String,
    pub from_address: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl From<&Envelope<'_>> for SentEmail {
    fn from(envelope: &Envelope<'_>) -> Self {
        Self {
            from_name: envelope.from_name.to_string(),
            from_address: envelope.from_address.to_string(),
            to: envelope.to.to_string(),
            subject: envelope.subject.to_string(),
            body: envelope.body.to_string(),
        }
    }
}

/// A transport that records instead of delivering.
///
/// Clones share the same capture buffer, so a clone handed to a
/// [`MockTransportFactory`] reports into the original.
#[derive(Clone, Default)]
pub struct MockTransport {
    sent: Arc<Mutex<Vec<SentEmail>>>,
    attempts: Arc<Mutex<Vec<String>>>,
    failing: Arc<Mutex<HashSet<String>>>,
    delay: Option<Duration>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep for `delay` before every send.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make every send to `address` fail with a transport error.
    pub async fn fail_for(&self, address: &str) {
        self.failing.lock().await.insert(address.to_string());
    }

    /// Emails accepted so far, in send order.
    pub async fn sent_messages(&self) -> Vec<SentEmail> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Every address a send was attempted for, including failures.
    pub async fn attempted(&self) -> Vec<String> {
        self.attempts.lock().await.clone()
    }

    pub async fn clear_sent(&self) {
        self.sent.lock().await.clear();
        self.attempts.lock().await.clear();
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn service_type(&self) -> &str {
        MOCK_SERVICE_TYPE
    }

    async fn send(&self, envelope: &Envelope<'_>) -> Result<(), CampaignerError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.attempts.lock().await.push(envelope.to.to_string());
        if self.failing.lock().await.contains(envelope.to) {
            return Err(CampaignerError::transport(format!(
                "mock transport rejected {}",
                envelope.to
            )));
        }
        self.sent.lock().await.push(SentEmail::from(envelope));
        Ok(())
    }
}

/// Hands out clones of one [`MockTransport`], whatever the payload.
pub struct MockTransportFactory {
    transport: MockTransport,
}

impl MockTransportFactory {
    pub fn new(transport: MockTransport) -> Self {
        Self { transport }
    }
}

impl TransportFactory for MockTransportFactory {
    fn service_type(&self) -> &str {
        MOCK_SERVICE_TYPE
    }

    fn configure(&self, _payload: &str) -> Result<Box<dyn Transport>, CampaignerError> {
        Ok(Box::new(self.transport.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(to: &str) -> Envelope<'_> {
        Envelope {
            from_name: "News",
            from_address: "news@example.com",
            to,
            subject: "Hello",
            body: "<p>hi</p>",
        }
    }

    #[tokio::test]
    async fn captures_accepted_sends() {
        let mock = MockTransport::new();
        mock.send(&envelope("a@example.org")).await.unwrap();
        let sent = mock.sent_messages().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "a@example.org");
        assert_eq!(sent[0].from_name, "News");
    }

    #[tokio::test]
    async fn failing_recipients_are_attempted_but_not_sent() {
        let mock = MockTransport::new();
        mock.fail_for("bad@example.org").await;
        assert!(mock.send(&envelope("bad@example.org")).await.is_err());
        assert_eq!(mock.sent_count().await, 0);
        assert_eq!(mock.attempted().await, vec!["bad@example.org"]);
    }

    #[tokio::test]
    async fn factory_clones_share_the_capture_buffer() {
        let mock = MockTransport::new();
        let factory = MockTransportFactory::new(mock.clone());
        let built = factory.configure("ignored").unwrap();
        built.send(&envelope("a@example.org")).await.unwrap();
        assert_eq!(mock.sent_count().await, 1);
    }
}
