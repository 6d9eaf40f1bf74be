// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Campaigner dispatch engine.
//!
//! "Nothing to do" outcomes (no eligible campaign, no tags, no recipients)
//! are not errors; lookups return `Option` or empty collections instead.

use thiserror::Error;

/// The primary error type used across all Campaigner collaborator traits.
#[derive(Debug, Error)]
pub enum CampaignerError {
    /// Configuration errors (invalid TOML, bad transport payload, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (connection, query failure, serialization).
    ///
    /// Always transient from the dispatcher's point of view: the step is
    /// aborted and the next tick retries.
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A transport failed to deliver to one recipient.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// No transport factory is registered for the service type.
    #[error("no transport registered for service type `{service_type}`")]
    UnknownTransport { service_type: String },

    /// The email service referenced by a message does not exist.
    #[error("email service {service_id} not found")]
    ServiceNotFound { service_id: i64 },

    /// A lifecycle transition that the state machine does not allow.
    #[error("invalid transition for {entity} {id}: {detail}")]
    InvalidTransition {
        entity: &'static str,
        id: i64,
        detail: String,
    },

    /// Rejected operator input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors (panicked worker, broken channel).
    #[error("internal error: {0}")]
    Internal(String),
}

impl CampaignerError {
    /// Shorthand for a transport failure without an underlying source.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps any error as a storage failure.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            source: Box::new(err),
        }
    }

    /// Returns `true` if the failed step should simply be retried on the next tick.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Storage { .. } | Self::Timeout { .. })
    }

    /// Returns `true` if the error is scoped to a single recipient's delivery.
    ///
    /// These are recorded on the delivery message and never abort a campaign.
    #[must_use]
    pub const fn is_per_recipient(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. }
                | Self::UnknownTransport { .. }
                | Self::ServiceNotFound { .. }
                | Self::Timeout { .. }
        )
    }
}
