// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Service endpoints and the seams that select them.
//!
//! The correlators only count endpoints; which endpoint owns which
//! connection, user or group is decided by an [`EndpointRouter`] over the
//! candidates an [`EndpointManager`] returns for a hub.

mod manager;
mod router;

pub use manager::{EndpointManager, StaticEndpointManager};
pub use router::{DefaultEndpointRouter, EndpointRouter};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of an endpoint in a multi-endpoint deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointRole {
    #[default]
    Primary,
    Secondary,
}

/// One shard/replica of the backing service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceEndpoint {
    name: String,
    url: String,
    role: EndpointRole,
    /// Hubs served; empty means every hub
    hubs: Vec<String>,
}

impl ServiceEndpoint {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            role: EndpointRole::Primary,
            hubs: Vec::new(),
        }
    }

    pub fn with_role(mut self, role: EndpointRole) -> Self {
        self.role = role;
        self
    }

    /// Restrict the endpoint to the given hubs.
    pub fn with_hubs<I, S>(mut self, hubs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hubs = hubs.into_iter().map(Into::into).collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn role(&self) -> EndpointRole {
        self.role
    }

    /// Whether this endpoint serves `hub`.
    pub fn serves(&self, hub: &str) -> bool {
        self.hubs.is_empty() || self.hubs.iter().any(|h| h == hub)
    }
}

impl fmt::Display for ServiceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:?})", self.name, self.role)
    }
}
