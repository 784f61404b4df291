// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Control-plane message set exchanged with service endpoints.
//!
//! [`ServiceMessage`] is a closed sum type, one variant per message kind.
//! On the wire a message is a JSON object tagged by `"type"` with camelCase
//! fields; optional fields are omitted when absent.
//!
//! ```json
//! {"type":"UserJoinGroup","userId":"u1","groupName":"room","ttl":60,"ackId":3}
//! ```
//!
//! Field widths that peers rely on:
//!
//! | Field          | Width            |
//! |----------------|------------------|
//! | `ackId`        | `i32`            |
//! | `tracingId`    | optional `u64`   |
//! | `ttl`          | optional `i32` s |
//! | partition key  | `u8` (derived)   |
//! | `invocationId` | string           |

mod ack;
mod check;
mod group;
mod invocation;
mod tracing_id;

pub use ack::{AckMessage, AckStatus};
pub use check::{
    CheckConnectionExistenceMessage, CheckGroupExistenceMessage, CheckUserExistenceMessage,
    CheckUserInGroupMessage,
};
pub use group::{
    validate_ttl, JoinGroupMessage, LeaveGroupMessage, UserJoinGroupMessage,
    UserLeaveGroupMessage,
};
pub use invocation::{
    ClientInvocationMessage, CloseConnectionMessage, CompletionMessage, CompletionOutcome,
};
pub use tracing_id::TracingIdGenerator;

use crate::ack::AckId;
use crate::error::{BackplaneError, Result};
use serde::{Deserialize, Serialize};

/// Every message kind the backplane sends or receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServiceMessage {
    JoinGroup(JoinGroupMessage),
    LeaveGroup(LeaveGroupMessage),
    UserJoinGroup(UserJoinGroupMessage),
    UserLeaveGroup(UserLeaveGroupMessage),
    CheckUserInGroup(CheckUserInGroupMessage),
    CheckGroupExistence(CheckGroupExistenceMessage),
    CheckConnectionExistence(CheckConnectionExistenceMessage),
    CheckUserExistence(CheckUserExistenceMessage),
    ClientInvocation(ClientInvocationMessage),
    Completion(CompletionMessage),
    CloseConnection(CloseConnectionMessage),
    Ack(AckMessage),
}

impl ServiceMessage {
    /// Short kind name, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::JoinGroup(_) => "JoinGroup",
            Self::LeaveGroup(_) => "LeaveGroup",
            Self::UserJoinGroup(_) => "UserJoinGroup",
            Self::UserLeaveGroup(_) => "UserLeaveGroup",
            Self::CheckUserInGroup(_) => "CheckUserInGroup",
            Self::CheckGroupExistence(_) => "CheckGroupExistence",
            Self::CheckConnectionExistence(_) => "CheckConnectionExistence",
            Self::CheckUserExistence(_) => "CheckUserExistence",
            Self::ClientInvocation(_) => "ClientInvocation",
            Self::Completion(_) => "Completion",
            Self::CloseConnection(_) => "CloseConnection",
            Self::Ack(_) => "Ack",
        }
    }

    /// Shard selector for messages keyed by a group name or user id.
    pub fn partition_key(&self) -> Option<u8> {
        match self {
            Self::JoinGroup(m) => Some(m.partition_key()),
            Self::LeaveGroup(m) => Some(m.partition_key()),
            Self::UserJoinGroup(m) => Some(m.partition_key()),
            Self::UserLeaveGroup(m) => Some(m.partition_key()),
            Self::CheckUserInGroup(m) => Some(m.partition_key()),
            Self::CheckGroupExistence(m) => Some(m.partition_key()),
            Self::CheckUserExistence(m) => Some(m.partition_key()),
            Self::CheckConnectionExistence(_)
            | Self::ClientInvocation(_)
            | Self::Completion(_)
            | Self::CloseConnection(_)
            | Self::Ack(_) => None,
        }
    }

    /// Ack id requested by (or, for `Ack`, acknowledged by) this message.
    pub fn ack_id(&self) -> Option<AckId> {
        match self {
            Self::JoinGroup(m) => m.ack_id,
            Self::LeaveGroup(m) => m.ack_id,
            Self::UserJoinGroup(m) => m.ack_id,
            Self::UserLeaveGroup(m) => m.ack_id,
            Self::CheckUserInGroup(m) => m.ack_id,
            Self::CheckGroupExistence(m) => m.ack_id,
            Self::CheckConnectionExistence(m) => m.ack_id,
            Self::CheckUserExistence(m) => m.ack_id,
            Self::Ack(m) => Some(m.ack_id),
            Self::ClientInvocation(_) | Self::Completion(_) | Self::CloseConnection(_) => None,
        }
    }

    /// Attach an ack id. Returns `false` for kinds that cannot carry one.
    pub fn set_ack_id(&mut self, ack_id: AckId) -> bool {
        let slot = match self {
            Self::JoinGroup(m) => &mut m.ack_id,
            Self::LeaveGroup(m) => &mut m.ack_id,
            Self::UserJoinGroup(m) => &mut m.ack_id,
            Self::UserLeaveGroup(m) => &mut m.ack_id,
            Self::CheckUserInGroup(m) => &mut m.ack_id,
            Self::CheckGroupExistence(m) => &mut m.ack_id,
            Self::CheckConnectionExistence(m) => &mut m.ack_id,
            Self::CheckUserExistence(m) => &mut m.ack_id,
            Self::ClientInvocation(_)
            | Self::Completion(_)
            | Self::CloseConnection(_)
            | Self::Ack(_) => return false,
        };
        *slot = Some(ack_id);
        true
    }

    pub fn tracing_id(&self) -> Option<u64> {
        match self {
            Self::JoinGroup(m) => m.tracing_id,
            Self::LeaveGroup(m) => m.tracing_id,
            Self::UserJoinGroup(m) => m.tracing_id,
            Self::UserLeaveGroup(m) => m.tracing_id,
            Self::CheckUserInGroup(m) => m.tracing_id,
            Self::CheckGroupExistence(m) => m.tracing_id,
            Self::CheckConnectionExistence(m) => m.tracing_id,
            Self::CheckUserExistence(m) => m.tracing_id,
            Self::ClientInvocation(m) => m.tracing_id,
            Self::Completion(m) => m.tracing_id,
            Self::CloseConnection(m) => m.tracing_id,
            Self::Ack(_) => None,
        }
    }

    /// Attach a tracing id. Acks carry none and are left untouched.
    pub fn set_tracing_id(&mut self, tracing_id: u64) {
        let slot = match self {
            Self::JoinGroup(m) => &mut m.tracing_id,
            Self::LeaveGroup(m) => &mut m.tracing_id,
            Self::UserJoinGroup(m) => &mut m.tracing_id,
            Self::UserLeaveGroup(m) => &mut m.tracing_id,
            Self::CheckUserInGroup(m) => &mut m.tracing_id,
            Self::CheckGroupExistence(m) => &mut m.tracing_id,
            Self::CheckConnectionExistence(m) => &mut m.tracing_id,
            Self::CheckUserExistence(m) => &mut m.tracing_id,
            Self::ClientInvocation(m) => &mut m.tracing_id,
            Self::Completion(m) => &mut m.tracing_id,
            Self::CloseConnection(m) => &mut m.tracing_id,
            Self::Ack(_) => return,
        };
        *slot = Some(tracing_id);
    }
}

macro_rules! impl_from_message {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for ServiceMessage {
                fn from(m: $ty) -> Self {
                    Self::$variant(m)
                }
            }
        )*
    };
}

impl_from_message!(
    JoinGroup(JoinGroupMessage),
    LeaveGroup(LeaveGroupMessage),
    UserJoinGroup(UserJoinGroupMessage),
    UserLeaveGroup(UserLeaveGroupMessage),
    CheckUserInGroup(CheckUserInGroupMessage),
    CheckGroupExistence(CheckGroupExistenceMessage),
    CheckConnectionExistence(CheckConnectionExistenceMessage),
    CheckUserExistence(CheckUserExistenceMessage),
    ClientInvocation(ClientInvocationMessage),
    Completion(CompletionMessage),
    CloseConnection(CloseConnectionMessage),
    Ack(AckMessage),
);

/// Serialize a message to its wire form.
pub fn encode(message: &ServiceMessage) -> Result<Vec<u8>> {
    serde_json::to_vec(message).map_err(BackplaneError::Codec)
}

/// Parse a message from its wire form.
pub fn decode(bytes: &[u8]) -> Result<ServiceMessage> {
    serde_json::from_slice(bytes).map_err(BackplaneError::Codec)
}
