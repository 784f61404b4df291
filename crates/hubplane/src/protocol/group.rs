// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Group membership messages.
//!
//! A `None` group name on a leave message means "every group" and is
//! expanded by the receiving shard.

use crate::ack::AckId;
use crate::error::{BackplaneError, Result};
use crate::partition::partition_key;
use serde::{Deserialize, Serialize};

/// Check a TTL in seconds and narrow it to the wire width.
pub fn validate_ttl(ttl_secs: i64) -> Result<i32> {
    if ttl_secs < 0 {
        return Err(BackplaneError::TtlOutOfRange(ttl_secs));
    }
    i32::try_from(ttl_secs).map_err(|_| BackplaneError::TtlOutOfRange(ttl_secs))
}

/// Add a connection to a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinGroupMessage {
    pub connection_id: String,
    pub group_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack_id: Option<AckId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracing_id: Option<u64>,
}

impl JoinGroupMessage {
    pub fn new(connection_id: impl Into<String>, group_name: impl Into<String>) -> Self {
        Self {
            connection_id: connection_id.into(),
            group_name: group_name.into(),
            ack_id: None,
            tracing_id: None,
        }
    }

    pub fn partition_key(&self) -> u8 {
        partition_key(Some(&self.group_name))
    }
}

/// Remove a connection from one group, or from all groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveGroupMessage {
    pub connection_id: String,
    #[serde(default)]
    pub group_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack_id: Option<AckId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracing_id: Option<u64>,
}

impl LeaveGroupMessage {
    pub fn new(connection_id: impl Into<String>, group_name: Option<String>) -> Self {
        Self {
            connection_id: connection_id.into(),
            group_name,
            ack_id: None,
            tracing_id: None,
        }
    }

    /// Leave every group.
    pub fn all(connection_id: impl Into<String>) -> Self {
        Self::new(connection_id, None)
    }

    pub fn partition_key(&self) -> u8 {
        partition_key(self.group_name.as_deref())
    }
}

/// Add a user to a group, optionally for a limited time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserJoinGroupMessage {
    pub user_id: String,
    pub group_name: String,
    /// Seconds the membership lives; `None` is permanent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack_id: Option<AckId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracing_id: Option<u64>,
}

impl UserJoinGroupMessage {
    pub fn new(user_id: impl Into<String>, group_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            group_name: group_name.into(),
            ttl: None,
            ack_id: None,
            tracing_id: None,
        }
    }

    /// Set the membership TTL. Negative or oversized values are rejected.
    pub fn with_ttl(mut self, ttl_secs: i64) -> Result<Self> {
        self.ttl = Some(validate_ttl(ttl_secs)?);
        Ok(self)
    }

    pub fn partition_key(&self) -> u8 {
        partition_key(Some(&self.group_name))
    }
}

/// Remove a user from one group, or from all groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLeaveGroupMessage {
    pub user_id: String,
    #[serde(default)]
    pub group_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack_id: Option<AckId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracing_id: Option<u64>,
}

impl UserLeaveGroupMessage {
    pub fn new(user_id: impl Into<String>, group_name: Option<String>) -> Self {
        Self {
            user_id: user_id.into(),
            group_name,
            ack_id: None,
            tracing_id: None,
        }
    }

    /// Leave every group.
    pub fn all(user_id: impl Into<String>) -> Self {
        Self::new(user_id, None)
    }

    pub fn partition_key(&self) -> u8 {
        partition_key(self.group_name.as_deref())
    }
}
