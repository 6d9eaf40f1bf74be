// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tag set to recipient list.

use std::collections::HashSet;
use std::sync::Arc;

use campaigner_core::{CampaignerError, Recipient, RecipientStore, TagId};
use tracing::debug;

/// Resolves the recipients a campaign should reach.
///
/// The result never holds an unsubscribed recipient and never holds the same
/// subscriber twice, whatever the store returns.
#[derive(Clone)]
pub struct RecipientResolver {
    store: Arc<dyn RecipientStore>,
}

impl RecipientResolver {
    pub fn new(store: Arc<dyn RecipientStore>) -> Self {
        Self { store }
    }

    /// Eligible recipients for `tags`, in the order the store first yields them.
    pub async fn resolve(&self, tags: &[TagId]) -> Result<Vec<Recipient>, CampaignerError> {
        if tags.is_empty() {
            return Ok(Vec::new());
        }
        let found = self.store.find_by_tags(tags, true).await?;
        let total = found.len();

        let mut seen = HashSet::with_capacity(total);
        let recipients: Vec<Recipient> = found
            .into_iter()
            .filter(|r| !r.is_unsubscribed())
            .filter(|r| seen.insert(r.id))
            .collect();

        debug!(
            tags = tags.len(),
            returned = total,
            eligible = recipients.len(),
            "recipients resolved"
        );
        Ok(recipients)
    }
}
