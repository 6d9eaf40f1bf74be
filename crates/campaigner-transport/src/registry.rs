// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport registry: service type key to the factory that builds it.
//!
//! Keys are case-insensitive, so a service stored as `"SMTP"` resolves to the
//! factory registered as `"smtp"`.

use std::collections::HashMap;
use std::sync::Arc;

use campaigner_core::{CampaignerError, Transport, TransportFactory};
use tracing::debug;

/// Registry of transport factories keyed by lower-cased service type.
pub struct TransportRegistry {
    factories: HashMap<String, Arc<dyn TransportFactory>>,
}

impl TransportRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// A registry with every built-in transport registered.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(crate::smtp::SmtpTransportFactory));
        registry
    }

    /// Register a factory under its own service type. Replaces any factory
    /// already registered for that type.
    pub fn register(&mut self, factory: Arc<dyn TransportFactory>) {
        let key = factory.service_type().to_lowercase();
        debug!(service_type = %key, "transport registered");
        self.factories.insert(key, factory);
    }

    pub fn contains(&self, service_type: &str) -> bool {
        self.factories.contains_key(&service_type.to_lowercase())
    }

    /// Build a configured transport for `service_type` from its opaque payload.
    pub fn resolve(
        &self,
        service_type: &str,
        payload: &str,
    ) -> Result<Box<dyn Transport>, CampaignerError> {
        let factory = self
            .factories
            .get(&service_type.to_lowercase())
            .ok_or_else(|| CampaignerError::UnknownTransport {
                service_type: service_type.to_string(),
            })?;
        factory.configure(payload)
    }

    /// Registered service types, sorted.
    pub fn service_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl Default for TransportRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TransportRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportRegistry")
            .field("service_types", &self.service_types())
            .finish()
    }
}
