// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One dispatch run: pick a due campaign, claim it, fan it out, finalize it.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use campaigner_core::{
    Campaign, CampaignId, CampaignStatus, CampaignStore, CampaignerError, DeliveryMessage,
    RecipientStore,
};

use crate::queue::{DeliveryQueue, QueueReport, TaskHandler};
use crate::resolver::RecipientResolver;

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Nothing was due.
    Idle,
    /// The picked campaign was claimed by someone else first.
    LostRace { campaign_id: CampaignId },
    /// The campaign had no tags and was marked failed.
    Failed { campaign_id: CampaignId },
    /// Every recipient was handed to the queue and the campaign marked sent.
    Sent {
        campaign_id: CampaignId,
        report: QueueReport,
    },
}

/// Anything a scheduler worker can drive on a timer.
#[async_trait]
pub trait DispatchStep: Send + Sync {
    async fn run(&self) -> Result<RunOutcome, CampaignerError>;
}

pub struct CampaignDispatcher {
    campaigns: Arc<dyn CampaignStore>,
    resolver: RecipientResolver,
    handler: Arc<dyn TaskHandler>,
    queue_depth: usize,
}

impl CampaignDispatcher {
    pub fn new(
        campaigns: Arc<dyn CampaignStore>,
        recipients: Arc<dyn RecipientStore>,
        handler: Arc<dyn TaskHandler>,
    ) -> Self {
        Self {
            campaigns,
            resolver: RecipientResolver::new(recipients),
            handler,
            queue_depth: 1,
        }
    }

    pub fn with_queue_depth(mut self, depth: usize) -> Self {
        self.queue_depth = depth.max(1);
        self
    }

    /// Run one dispatch step as of `now`.
    ///
    /// A store or resolver error after the campaign was claimed hands it back
    /// to `Draft` before the error is returned, so the next run picks it up
    /// again. Recipients already in the ledger are skipped on that retry.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<RunOutcome, CampaignerError> {
        let Some(campaign) = self.campaigns.next_eligible(now).await? else {
            debug!("no campaign due");
            return Ok(RunOutcome::Idle);
        };
        let id = campaign.id;

        let claimed = self
            .campaigns
            .transition_status(id, CampaignStatus::Draft, CampaignStatus::Sending)
            .await?;
        if !claimed {
            info!(campaign_id = %id, "campaign already claimed by another worker");
            return Ok(RunOutcome::LostRace { campaign_id: id });
        }
        info!(campaign_id = %id, name = %campaign.name, "campaign sending");

        match self.fan_out(&campaign).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                self.release(id).await;
                Err(err)
            }
        }
    }

    async fn fan_out(&self, campaign: &Campaign) -> Result<RunOutcome, CampaignerError> {
        let id = campaign.id;
        let tags = self.campaigns.tags_for(id).await?;
        if tags.is_empty() {
            warn!(campaign_id = %id, "campaign has no tags, marking failed");
            self.campaigns
                .update_status(id, CampaignStatus::Failed)
                .await?;
            return Ok(RunOutcome::Failed { campaign_id: id });
        }

        let recipients = self.resolver.resolve(&tags).await?;
        let mut queue = DeliveryQueue::open(self.queue_depth, Arc::clone(&self.handler));
        for recipient in &recipients {
            queue
                .enqueue(DeliveryMessage::for_campaign(campaign, recipient))
                .await?;
        }
        let report = queue.close().await?;

        self.campaigns
            .update_status(id, CampaignStatus::Sent)
            .await?;
        info!(
            campaign_id = %id,
            recipients = report.accepted,
            delivered = report.delivered,
            skipped = report.skipped_duplicate,
            failed = report.failed,
            sent_unrecorded = report.sent_unrecorded,
            "campaign sent"
        );
        Ok(RunOutcome::Sent {
            campaign_id: id,
            report,
        })
    }

    async fn release(&self, id: CampaignId) {
        match self
            .campaigns
            .transition_status(id, CampaignStatus::Sending, CampaignStatus::Draft)
            .await
        {
            Ok(true) => warn!(campaign_id = %id, "campaign returned to draft for retry"),
            Ok(false) => warn!(campaign_id = %id, "campaign left sending state before release"),
            Err(e) => error!(campaign_id = %id, error = %e, "could not return campaign to draft"),
        }
    }
}

#[async_trait]
impl DispatchStep for CampaignDispatcher {
    async fn run(&self) -> Result<RunOutcome, CampaignerError> {
        self.run_at(Utc::now()).await
    }
}
