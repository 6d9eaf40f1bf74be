// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery transports for the Campaigner dispatch engine.
//!
//! [`TransportRegistry`] maps a service type (`"smtp"`, ...) to the factory
//! that turns a service's opaque payload into a ready [`Transport`].
//!
//! [`Transport`]: campaigner_core::Transport

pub mod registry;
pub mod smtp;

pub use registry::TransportRegistry;
pub use smtp::{SMTP_SERVICE_TYPE, SmtpSettings, SmtpTransport, SmtpTransportFactory};
