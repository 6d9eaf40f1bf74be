// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits the dispatch engine is written against.
//!
//! All traits use `#[async_trait]` so they can be held as `Arc<dyn _>`.

pub mod store;
pub mod transport;

pub use store::{CampaignStore, MessageLedger, RecipientStore, ServiceDirectory};
pub use transport::{Envelope, Transport, TransportFactory};
