// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Endpoint inventory per hub.

use super::ServiceEndpoint;
use crate::config::BackplaneConfig;
use parking_lot::RwLock;

/// Lists the endpoints that serve a hub.
pub trait EndpointManager: Send + Sync {
    fn endpoints(&self, hub: &str) -> Vec<ServiceEndpoint>;
}

/// Fixed endpoint list, editable at runtime.
#[derive(Debug, Default)]
pub struct StaticEndpointManager {
    endpoints: RwLock<Vec<ServiceEndpoint>>,
}

impl StaticEndpointManager {
    pub fn new(endpoints: Vec<ServiceEndpoint>) -> Self {
        Self {
            endpoints: RwLock::new(endpoints),
        }
    }

    /// Build from the `endpoints` section of a config.
    pub fn from_config(config: &BackplaneConfig) -> Self {
        Self::new(config.endpoints.iter().map(|e| e.to_endpoint()).collect())
    }

    /// Add or replace (by name) an endpoint.
    pub fn add(&self, endpoint: ServiceEndpoint) {
        let mut endpoints = self.endpoints.write();
        endpoints.retain(|e| e.name() != endpoint.name());
        endpoints.push(endpoint);
    }

    /// Remove an endpoint by name.
    pub fn remove(&self, name: &str) -> bool {
        let mut endpoints = self.endpoints.write();
        let before = endpoints.len();
        endpoints.retain(|e| e.name() != name);
        endpoints.len() < before
    }

    pub fn len(&self) -> usize {
        self.endpoints.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.read().is_empty()
    }
}

impl EndpointManager for StaticEndpointManager {
    fn endpoints(&self, hub: &str) -> Vec<ServiceEndpoint> {
        self.endpoints
            .read()
            .iter()
            .filter(|e| e.serves(hub))
            .cloned()
            .collect()
    }
}
