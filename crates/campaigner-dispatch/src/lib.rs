// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign dispatch engine.
//!
//! A [`Scheduler`] worker calls [`CampaignDispatcher`] on a timer. Each run
//! claims one due campaign, resolves its recipients through the
//! [`RecipientResolver`], and feeds one message per recipient through a
//! [`DeliveryQueue`] whose consumer is the ledger-guarded
//! [`DeliveryHandler`].

pub mod delivery;
pub mod dispatcher;
pub mod queue;
pub mod resolver;
pub mod scheduler;
pub mod shutdown;

#[cfg(test)]
mod testing;

pub use delivery::DeliveryHandler;
pub use dispatcher::{CampaignDispatcher, DispatchStep, RunOutcome};
pub use queue::{DeliveryQueue, QueueReport, TaskHandler, TaskOutcome};
pub use resolver::RecipientResolver;
pub use scheduler::Scheduler;
pub use shutdown::install_signal_handler;
