// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Backplane configuration.
//!
//! Supports both programmatic and file-based configuration.
//!
//! ```toml
//! server_name = "api-1"
//! ack_timeout_ms = 5000
//! enable_message_tracing = true
//!
//! [[endpoints]]
//! name = "east"
//! url = "https://east.example.net"
//!
//! [[endpoints]]
//! name = "west"
//! url = "https://west.example.net"
//! role = "secondary"
//! hubs = ["chat"]
//! ```

use crate::endpoint::{EndpointRole, ServiceEndpoint};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackplaneConfig {
    /// Identifies this server as the caller of client invocations.
    #[serde(default = "default_server_name")]
    pub server_name: String,

    /// How long an ack may stay pending (milliseconds).
    #[serde(default = "default_ack_timeout_ms")]
    pub ack_timeout_ms: u64,

    /// Stamp tracing ids on outgoing control messages.
    #[serde(default)]
    pub enable_message_tracing: bool,

    /// Service endpoints.
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,
}

fn default_server_name() -> String {
    "hubplane".to_string()
}

fn default_ack_timeout_ms() -> u64 {
    5000
}

impl Default for BackplaneConfig {
    fn default() -> Self {
        Self {
            server_name: default_server_name(),
            ack_timeout_ms: default_ack_timeout_ms(),
            enable_message_tracing: false,
            endpoints: Vec::new(),
        }
    }
}

impl BackplaneConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Ack timeout as a `Duration`.
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }

    /// Add an endpoint.
    pub fn endpoint(mut self, endpoint: EndpointConfig) -> Self {
        self.endpoints.push(endpoint);
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server_name.is_empty() {
            return Err(ConfigError::Invalid("server_name is empty".into()));
        }
        if self.ack_timeout_ms == 0 {
            return Err(ConfigError::Invalid("ack_timeout_ms must be > 0".into()));
        }

        let mut names = HashSet::new();
        for (i, endpoint) in self.endpoints.iter().enumerate() {
            if endpoint.name.is_empty() {
                return Err(ConfigError::Invalid(format!("Endpoint {} has empty name", i)));
            }
            if endpoint.url.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "Endpoint '{}' has empty url",
                    endpoint.name
                )));
            }
            if !names.insert(endpoint.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "Duplicate endpoint name '{}'",
                    endpoint.name
                )));
            }
        }

        Ok(())
    }
}

/// Configuration for a single endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub role: EndpointRole,
    /// Hubs served; empty means every hub.
    #[serde(default)]
    pub hubs: Vec<String>,
}

impl EndpointConfig {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            role: EndpointRole::Primary,
            hubs: Vec::new(),
        }
    }

    pub fn role(mut self, role: EndpointRole) -> Self {
        self.role = role;
        self
    }

    pub(crate) fn to_endpoint(&self) -> ServiceEndpoint {
        ServiceEndpoint::new(&self.name, &self.url)
            .with_role(self.role)
            .with_hubs(self.hubs.iter().cloned())
    }
}
