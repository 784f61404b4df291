// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Existence checks answered through the ack status.

use crate::ack::AckId;
use crate::partition::partition_key;
use serde::{Deserialize, Serialize};

/// Is `user_id` a member of `group_name`?
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckUserInGroupMessage {
    pub user_id: String,
    pub group_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack_id: Option<AckId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracing_id: Option<u64>,
}

impl CheckUserInGroupMessage {
    pub fn new(user_id: impl Into<String>, group_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            group_name: group_name.into(),
            ack_id: None,
            tracing_id: None,
        }
    }

    pub fn partition_key(&self) -> u8 {
        partition_key(Some(&self.group_name))
    }
}

/// Does any connection belong to `group_name`?
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckGroupExistenceMessage {
    pub group_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack_id: Option<AckId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracing_id: Option<u64>,
}

impl CheckGroupExistenceMessage {
    pub fn new(group_name: impl Into<String>) -> Self {
        Self {
            group_name: group_name.into(),
            ack_id: None,
            tracing_id: None,
        }
    }

    pub fn partition_key(&self) -> u8 {
        partition_key(Some(&self.group_name))
    }
}

/// Is `connection_id` connected? Not partitioned: any shard may hold it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckConnectionExistenceMessage {
    pub connection_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack_id: Option<AckId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracing_id: Option<u64>,
}

impl CheckConnectionExistenceMessage {
    pub fn new(connection_id: impl Into<String>) -> Self {
        Self {
            connection_id: connection_id.into(),
            ack_id: None,
            tracing_id: None,
        }
    }
}

/// Does `user_id` have at least one connection?
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckUserExistenceMessage {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack_id: Option<AckId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracing_id: Option<u64>,
}

impl CheckUserExistenceMessage {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ack_id: None,
            tracing_id: None,
        }
    }

    pub fn partition_key(&self) -> u8 {
        partition_key(Some(&self.user_id))
    }
}
