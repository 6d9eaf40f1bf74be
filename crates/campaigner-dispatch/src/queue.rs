// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-run delivery queue.
//!
//! One producer (the dispatcher) hands messages to one consumer task through
//! a bounded channel. The consumer processes one message at a time, so at
//! most one send is in flight per queue. With the default depth of 1 the
//! producer waits on [`DeliveryQueue::enqueue`] whenever a message is
//! already waiting.
//!
//! A failing or panicking handler is logged and counted; the consumer moves
//! on to the next message.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use campaigner_core::{CampaignerError, DeliveryMessage};

/// What a handler did with a message it did not fail on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The transport accepted the message.
    Sent,
    /// The transport accepted the message but its ledger row could not be
    /// updated, so the row still reads as queued.
    SentUnrecorded,
    /// The ledger already had a row for this recipient and source.
    Duplicate,
}

/// Processes one queued message.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(&self, message: DeliveryMessage) -> Result<TaskOutcome, CampaignerError>;
}

/// Counts for one closed queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueReport {
    pub accepted: usize,
    pub delivered: usize,
    pub skipped_duplicate: usize,
    pub failed: usize,
    /// Sent, but the outcome is missing from the ledger.
    pub sent_unrecorded: usize,
}

pub struct DeliveryQueue {
    tx: mpsc::Sender<DeliveryMessage>,
    consumer: JoinHandle<QueueReport>,
    accepted: usize,
}

impl DeliveryQueue {
    /// Start the consumer. `depth` is the number of messages that may wait
    /// behind the one being handled; 0 is treated as 1.
    pub fn open(depth: usize, handler: Arc<dyn TaskHandler>) -> Self {
        let (tx, rx) = mpsc::channel(depth.max(1));
        let consumer = tokio::spawn(consume(rx, handler));
        Self {
            tx,
            consumer,
            accepted: 0,
        }
    }

    /// Hand a message to the consumer, waiting while the queue is full.
    pub async fn enqueue(&mut self, message: DeliveryMessage) -> Result<(), CampaignerError> {
        self.tx
            .send(message)
            .await
            .map_err(|_| CampaignerError::Internal("delivery queue consumer has stopped".into()))?;
        self.accepted += 1;
        Ok(())
    }

    /// Stop accepting messages and wait until every accepted message has
    /// been handled.
    pub async fn close(self) -> Result<QueueReport, CampaignerError> {
        let Self {
            tx,
            consumer,
            accepted,
        } = self;
        drop(tx);
        let mut report = consumer
            .await
            .map_err(|e| CampaignerError::Internal(format!("delivery queue consumer died: {e}")))?;
        report.accepted = accepted;
        debug!(?report, "delivery queue closed");
        Ok(report)
    }
}

async fn consume(
    mut rx: mpsc::Receiver<DeliveryMessage>,
    handler: Arc<dyn TaskHandler>,
) -> QueueReport {
    let mut report = QueueReport::default();
    while let Some(message) = rx.recv().await {
        let key = message.dedup_key();
        let handler = Arc::clone(&handler);
        let result = tokio::spawn(async move { handler.handle(message).await }).await;
        match result {
            Ok(Ok(TaskOutcome::Sent)) => report.delivered += 1,
            Ok(Ok(TaskOutcome::SentUnrecorded)) => report.sent_unrecorded += 1,
            Ok(Ok(TaskOutcome::Duplicate)) => report.skipped_duplicate += 1,
            Ok(Err(e)) => {
                report.failed += 1;
                warn!(
                    subscriber_id = %key.subscriber_id,
                    source_id = key.source_id,
                    source_type = %key.source_type,
                    error = %e,
                    "delivery failed"
                );
            }
            Err(e) => {
                report.failed += 1;
                error!(
                    subscriber_id = %key.subscriber_id,
                    source_id = key.source_id,
                    error = %e,
                    "delivery handler aborted"
                );
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use tokio::sync::Semaphore;

    use super::*;
    use crate::testing::message;

    /// Records subscriber ids; fails on `fail_on`, panics on `panic_on`, and
    /// optionally waits for a permit before each message.
    #[derive(Default)]
    struct Scripted {
        seen: Mutex<Vec<i64>>,
        fail_on: Option<i64>,
        panic_on: Option<i64>,
        duplicate_on: Option<i64>,
        unrecorded_on: Option<i64>,
        gate: Option<Arc<Semaphore>>,
    }

    #[async_trait]
    impl TaskHandler for Scripted {
        async fn handle(&self, message: DeliveryMessage) -> Result<TaskOutcome, CampaignerError> {
            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
            let id = message.subscriber_id.0;
            self.seen.lock().unwrap().push(id);
            if self.panic_on == Some(id) {
                panic!("handler blew up on {id}");
            }
            if self.fail_on == Some(id) {
                return Err(CampaignerError::transport("rejected"));
            }
            if self.duplicate_on == Some(id) {
                return Ok(TaskOutcome::Duplicate);
            }
            if self.unrecorded_on == Some(id) {
                return Ok(TaskOutcome::SentUnrecorded);
            }
            Ok(TaskOutcome::Sent)
        }
    }

    #[tokio::test]
    async fn handles_messages_in_enqueue_order() {
        let handler = Arc::new(Scripted::default());
        let mut queue = DeliveryQueue::open(1, handler.clone());
        for id in [3, 1, 2] {
            queue.enqueue(message(id, 10)).await.unwrap();
        }
        let report = queue.close().await.unwrap();

        assert_eq!(*handler.seen.lock().unwrap(), vec![3, 1, 2]);
        assert_eq!(
            report,
            QueueReport {
                accepted: 3,
                delivered: 3,
                skipped_duplicate: 0,
                failed: 0,
                sent_unrecorded: 0,
            }
        );
    }

    #[tokio::test]
    async fn failures_and_panics_do_not_stop_the_consumer() {
        let handler = Arc::new(Scripted {
            fail_on: Some(1),
            panic_on: Some(2),
            duplicate_on: Some(3),
            unrecorded_on: Some(5),
            ..Default::default()
        });
        let mut queue = DeliveryQueue::open(4, handler.clone());
        for id in 1..=5 {
            queue.enqueue(message(id, 10)).await.unwrap();
        }
        let report = queue.close().await.unwrap();

        assert_eq!(*handler.seen.lock().unwrap(), vec![1, 2, 3, 4, 5]);
        assert_eq!(report.accepted, 5);
        assert_eq!(report.delivered, 1);
        assert_eq!(report.skipped_duplicate, 1);
        assert_eq!(report.failed, 2);
        assert_eq!(report.sent_unrecorded, 1);
    }

    #[tokio::test]
    async fn closing_an_empty_queue_reports_nothing() {
        let queue = DeliveryQueue::open(1, Arc::new(Scripted::default()));
        assert_eq!(queue.close().await.unwrap(), QueueReport::default());
    }

    #[tokio::test(start_paused = true)]
    async fn producer_waits_when_queue_is_full() {
        let gate = Arc::new(Semaphore::new(0));
        let handler = Arc::new(Scripted {
            gate: Some(gate.clone()),
            ..Default::default()
        });
        let mut queue = DeliveryQueue::open(1, handler.clone());

        // One message held by the blocked handler, one waiting in the channel.
        queue.enqueue(message(1, 10)).await.unwrap();
        queue.enqueue(message(2, 10)).await.unwrap();
        let blocked =
            tokio::time::timeout(Duration::from_millis(50), queue.enqueue(message(3, 10))).await;
        assert!(blocked.is_err());

        gate.add_permits(3);
        queue.enqueue(message(3, 10)).await.unwrap();
        let report = queue.close().await.unwrap();
        assert_eq!(report.accepted, 3);
        assert_eq!(report.delivered, 3);
    }

    #[tokio::test]
    async fn close_waits_for_in_flight_work() {
        let gate = Arc::new(Semaphore::new(0));
        let handler = Arc::new(Scripted {
            gate: Some(gate.clone()),
            ..Default::default()
        });
        let mut queue = DeliveryQueue::open(2, handler.clone());
        queue.enqueue(message(1, 10)).await.unwrap();
        queue.enqueue(message(2, 10)).await.unwrap();

        let closing = tokio::spawn(queue.close());
        tokio::task::yield_now().await;
        assert!(!closing.is_finished());

        gate.add_permits(2);
        let report = closing.await.unwrap().unwrap();
        assert_eq!(report.delivered, 2);
        assert_eq!(handler.seen.lock().unwrap().len(), 2);
    }
}
