// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ledger-guarded delivery of one message.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, error};

use campaigner_core::{
    CampaignerError, DeliveryMessage, Envelope, MessageLedger, ServiceDirectory,
};
use campaigner_transport::TransportRegistry;

use crate::queue::{TaskHandler, TaskOutcome};

/// The queue consumer's handler.
///
/// A message whose dedup key is already in the ledger is skipped without
/// sending. Otherwise the ledger row is written first, the transport is
/// resolved from the message's email service, and the outcome is recorded on
/// the row. Any ledger row, sent or failed, blocks later attempts.
pub struct DeliveryHandler {
    ledger: Arc<dyn MessageLedger>,
    services: Arc<dyn ServiceDirectory>,
    transports: Arc<TransportRegistry>,
    send_timeout: Option<Duration>,
}

impl DeliveryHandler {
    pub fn new(
        ledger: Arc<dyn MessageLedger>,
        services: Arc<dyn ServiceDirectory>,
        transports: Arc<TransportRegistry>,
    ) -> Self {
        Self {
            ledger,
            services,
            transports,
            send_timeout: None,
        }
    }

    /// Give up on a send after `timeout` and record it as failed.
    pub fn with_send_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.send_timeout = timeout;
        self
    }

    async fn attempt(&self, message: &DeliveryMessage) -> Result<(), CampaignerError> {
        let service = self
            .services
            .service_config(message.email_service_id)
            .await?
            .ok_or(CampaignerError::ServiceNotFound {
                service_id: message.email_service_id.0,
            })?;
        let transport = self
            .transports
            .resolve(&service.service_type, &service.payload)?;

        let envelope = Envelope::from_message(message);
        match self.send_timeout {
            Some(limit) => tokio::time::timeout(limit, transport.send(&envelope))
                .await
                .map_err(|_| CampaignerError::Timeout { duration: limit })?,
            None => transport.send(&envelope).await,
        }
    }
}

#[async_trait]
impl TaskHandler for DeliveryHandler {
    async fn handle(&self, mut message: DeliveryMessage) -> Result<TaskOutcome, CampaignerError> {
        let key = message.dedup_key();
        if self
            .ledger
            .exists(key.subscriber_id, key.source_id, key.source_type)
            .await?
        {
            debug!(subscriber_id = %key.subscriber_id, source_id = key.source_id, "already attempted, skipping");
            return Ok(TaskOutcome::Duplicate);
        }
        let Some(id) = self.ledger.create(&message).await? else {
            debug!(subscriber_id = %key.subscriber_id, source_id = key.source_id, "ledger row appeared concurrently, skipping");
            return Ok(TaskOutcome::Duplicate);
        };
        message.id = Some(id);

        match self.attempt(&message).await {
            Ok(()) => {
                message.mark_sent(Utc::now())?;
                if let Err(update_err) = self.ledger.update(&message).await {
                    error!(
                        message_id = id,
                        to = %message.recipient_email,
                        error = %update_err,
                        "sent but outcome not recorded"
                    );
                    return Ok(TaskOutcome::SentUnrecorded);
                }
                debug!(message_id = id, to = %message.recipient_email, "message sent");
                Ok(TaskOutcome::Sent)
            }
            Err(err) => {
                message.mark_failed(Utc::now())?;
                if let Err(update_err) = self.ledger.update(&message).await {
                    error!(message_id = id, error = %update_err, "could not record delivery failure");
                }
                Err(err)
            }
        }
    }
}
