// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed-interval scheduler workers.
//!
//! Each worker owns one channel (email, mobile, notification) and calls its
//! [`DispatchStep`] once per interval. The first run happens one full
//! interval after start. A tick that comes due while a run is still going is
//! delayed, never stacked. Cancellation is only observed between runs, so a
//! run in progress always completes.

use std::sync::Arc;
use std::time::Duration;

use campaigner_core::ChannelKind;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::dispatcher::{DispatchStep, RunOutcome};

pub struct Scheduler {
    cancel: CancellationToken,
    workers: Vec<(ChannelKind, JoinHandle<()>)>,
}

impl Scheduler {
    /// Workers stop once `cancel` fires.
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            workers: Vec::new(),
        }
    }

    pub fn spawn(&mut self, channel: ChannelKind, every: Duration, step: Arc<dyn DispatchStep>) {
        let cancel = self.cancel.clone();
        let handle = tokio::spawn(run_worker(channel, every, step, cancel));
        self.workers.push((channel, handle));
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Cancel every worker and wait up to `timeout` for them to finish.
    ///
    /// Returns `false` if the timeout elapsed; any worker still running is
    /// then aborted.
    pub async fn shutdown(self, timeout: Duration) -> bool {
        self.cancel.cancel();
        let mut workers = self.workers;
        info!(count = workers.len(), "waiting for scheduler workers to stop");

        let joined = tokio::time::timeout(timeout, async {
            for (channel, handle) in workers.iter_mut() {
                if let Err(e) = handle.await {
                    error!(%channel, error = %e, "scheduler worker panicked");
                }
            }
        })
        .await;

        match joined {
            Ok(()) => {
                info!("all scheduler workers stopped");
                true
            }
            Err(_) => {
                warn!(
                    timeout_secs = timeout.as_secs(),
                    "scheduler workers did not stop in time, aborting"
                );
                for (_, handle) in &workers {
                    handle.abort();
                }
                false
            }
        }
    }
}

async fn run_worker(
    channel: ChannelKind,
    every: Duration,
    step: Arc<dyn DispatchStep>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; skip it.
    ticker.tick().await;
    info!(%channel, interval_secs = every.as_secs(), "scheduler worker started");

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => match step.run().await {
                Ok(RunOutcome::Idle) => {}
                Ok(outcome) => debug!(%channel, ?outcome, "dispatch run finished"),
                Err(e) if e.is_transient() => {
                    error!(%channel, error = %e, "store error aborted dispatch run, retrying next tick");
                }
                Err(e) => error!(%channel, error = %e, "dispatch run failed, retrying next tick"),
            },
        }
    }
    info!(%channel, "scheduler worker stopped");
}
