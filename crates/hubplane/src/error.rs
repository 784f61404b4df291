// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types for backplane operations.

use crate::ack::AckId;
use crate::config::ConfigError;
use thiserror::Error;

/// Result type for backplane operations
pub type Result<T> = std::result::Result<T, BackplaneError>;

/// Errors surfaced by the ack handler, the invocation correlator and the
/// lifetime manager facade.
#[derive(Debug, Error)]
pub enum BackplaneError {
    /// The ack was not satisfied before its deadline
    #[error("ack {ack_id} timed out")]
    Timeout { ack_id: AckId },

    /// The caller canceled the invocation before it completed
    #[error("invocation '{invocation_id}' was canceled")]
    Canceled { invocation_id: String },

    /// The target connection went away while an invocation was pending
    #[error("Connection '{connection_id}' is disconnected.")]
    Disconnected { connection_id: String },

    /// The client reported an error for the invocation
    #[error("remote error: {0}")]
    Remote(String),

    /// Every endpoint answered and none of them produced a result
    #[error("invocation '{invocation_id}' completed without a result on every endpoint")]
    NoResult { invocation_id: String },

    /// A completion arrived from a connection that does not own the invocation
    #[error("Connection ID '{connection_id}' is not valid for invocation ID '{invocation_id}'.")]
    ConnectionMismatch {
        connection_id: String,
        invocation_id: String,
    },

    /// No pending invocation with this id
    #[error("Invocation ID '{0}' is not associated with a pending client result.")]
    UnknownInvocation(String),

    /// An invocation with this id is already pending
    #[error("invocation '{0}' is already pending")]
    DuplicateInvocation(String),

    /// The invocation was removed without being resolved
    #[error("invocation '{0}' was removed before it completed")]
    InvocationRemoved(String),

    /// The ack entry was discarded before resolution
    #[error("ack {ack_id} was discarded")]
    AckDiscarded { ack_id: AckId },

    /// Rejected at the call boundary
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Negative or oversized time-to-live
    #[error("TTL must be between 0 and 2147483647 seconds, got {0}")]
    TtlOutOfRange(i64),

    /// Result payload could not be decoded into the awaited type
    #[error("failed to decode invocation result: {0}")]
    Decode(#[source] serde_json::Error),

    /// Wire encoding/decoding failure
    #[error("message codec error: {0}")]
    Codec(#[source] serde_json::Error),

    /// Transport refused or failed to queue a message
    #[error("transport error: {0}")]
    Transport(String),

    /// Message kind not valid in this direction
    #[error("unexpected message: {0}")]
    UnexpectedMessage(&'static str),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl BackplaneError {
    /// Check if this is a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Check if this is a caller cancellation
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled { .. })
    }

    /// Check if this is a connection disconnect
    pub fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected { .. })
    }

    /// Protocol violations that must reach an operator.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ConnectionMismatch { .. })
    }

    pub(crate) fn invalid_arg(name: &str) -> Self {
        Self::InvalidArgument(format!("'{}' must be a non-empty string", name))
    }
}
