// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Inbound acknowledgment message.

use crate::ack::AckId;
use serde::{Deserialize, Serialize};

/// Verdict carried by an ack, encoded as an `i32` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
#[repr(i32)]
pub enum AckStatus {
    /// Operation applied / entity exists
    #[default]
    Ok = 1,
    /// Target entity does not exist
    NotExist = 2,
    /// Service side gave up waiting
    Timeout = 3,
}

impl TryFrom<i32> for AckStatus {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Ok),
            2 => Ok(Self::NotExist),
            3 => Ok(Self::Timeout),
            other => Err(format!("unknown ack status {}", other)),
        }
    }
}

impl From<AckStatus> for i32 {
    fn from(status: AckStatus) -> Self {
        status as i32
    }
}

/// Acknowledgment for a previously sent ackable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AckMessage {
    pub ack_id: AckId,
    pub status: AckStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AckMessage {
    pub fn new(ack_id: AckId, status: AckStatus) -> Self {
        Self {
            ack_id,
            status,
            message: None,
        }
    }

    /// Attach a diagnostic message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}
