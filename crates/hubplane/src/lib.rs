// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Hubplane: server-side backplane for a sharded real-time messaging service
//!
//! An application server talks to one or more service endpoints (shards),
//! each holding a subset of live client connections. Hubplane correlates the
//! asynchronous answers coming back from those shards.
//!
//! # Features
//!
//! - **Acks**: single-shot and multi-endpoint acknowledgments with timeout
//!   and forced completion ([`AckHandler`])
//! - **Client invocations**: call a method on a client connection and await
//!   its return value across a fan-out ([`ClientInvocationCorrelator`])
//! - **Partitioning**: stable shard key for group and user names
//!   ([`partition_key`])
//! - **Control plane**: group/user membership and existence checks carrying
//!   ack ids, tracing ids and TTLs ([`protocol`], [`HubLifetimeManager`])
//!
//! # Configuration File
//!
//! ```toml
//! server_name = "api-1"
//! ack_timeout_ms = 5000
//! enable_message_tracing = true
//!
//! [[endpoints]]
//! name = "east"
//! url = "https://east.example.net"
//! ```
//!
//! # Quick Start
//!
//! ```no_run
//! use hubplane::{
//!     BackplaneConfig, DefaultEndpointRouter, HubLifetimeManager, ServiceMessage,
//!     ServiceMessageWriter, ServiceEndpoint, StaticEndpointManager,
//! };
//! use std::sync::Arc;
//!
//! struct Transport;
//!
//! impl ServiceMessageWriter for Transport {
//!     fn write(&self, message: ServiceMessage) -> hubplane::Result<()> {
//!         let _frame = hubplane::protocol::encode(&message)?;
//!         Ok(())
//!     }
//!
//!     fn write_to(&self, _: &ServiceEndpoint, message: ServiceMessage) -> hubplane::Result<()> {
//!         self.write(message)
//!     }
//! }
//!
//! # async fn run() -> hubplane::Result<()> {
//! let config = BackplaneConfig::from_file("hubplane.toml")?;
//! let hub = HubLifetimeManager::new(
//!     "chat",
//!     &config,
//!     Arc::new(Transport),
//!     Arc::new(StaticEndpointManager::from_config(&config)),
//!     Arc::new(DefaultEndpointRouter),
//! );
//! hub.add_to_group("conn-1", "lobby").await?;
//! # Ok(())
//! # }
//! ```

pub mod ack;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod invocation;
pub mod lifetime;
pub mod partition;
pub mod protocol;

pub use ack::{AckHandler, AckId, AckOutcome, AckWaiter, DEFAULT_ACK_TIMEOUT};
pub use config::{BackplaneConfig, ConfigError, EndpointConfig};
pub use endpoint::{
    DefaultEndpointRouter, EndpointManager, EndpointRole, EndpointRouter, ServiceEndpoint,
    StaticEndpointManager,
};
pub use error::{BackplaneError, Result};
pub use invocation::{ClientInvocationCorrelator, InvocationIdGenerator, PendingResult, ResultType};
pub use lifetime::{HubLifetimeManager, ServiceMessageWriter};
pub use partition::{partition_key, NULL_PARTITION_KEY};
pub use protocol::{AckMessage, AckStatus, CompletionMessage, ServiceMessage};
