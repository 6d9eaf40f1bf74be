// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Campaigner integration tests.
//!
//! Provides a mock transport and a temp-database harness for fast,
//! deterministic tests without a mail server.
//!
//! # Components
//!
//! - [`MockTransport`] - Transport that captures sends and fails on demand
//! - [`TestHarness`] - SQLite store, transport registry and dispatcher wired together

pub mod harness;
pub mod mock_transport;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_transport::{MOCK_SERVICE_TYPE, MockTransport, MockTransportFactory, SentEmail};
