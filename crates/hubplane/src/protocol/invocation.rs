// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Client invocation, completion and connection close messages.

use crate::error::BackplaneError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ask a client connection to run `method` and send its return value back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInvocationMessage {
    pub invocation_id: String,
    pub connection_id: String,
    /// Server that awaits the result
    pub caller_server_id: String,
    pub method: String,
    #[serde(default)]
    pub arguments: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracing_id: Option<u64>,
}

/// What an endpoint reports for an invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CompletionOutcome {
    /// Client returned a value
    Result(Value),
    /// Client (or the endpoint on its behalf) reported an error
    Error(String),
    /// Endpoint received the invocation but holds no result, typically
    /// because the connection does not live on that shard
    Empty,
}

impl CompletionOutcome {
    /// True when this is a definitive answer rather than a bare receipt.
    pub fn is_definitive(&self) -> bool {
        !matches!(self, Self::Empty)
    }
}

/// Completion of a [`ClientInvocationMessage`], one per endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionMessage {
    pub invocation_id: String,
    pub connection_id: String,
    pub outcome: CompletionOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracing_id: Option<u64>,
}

impl CompletionMessage {
    pub fn with_result(
        invocation_id: impl Into<String>,
        connection_id: impl Into<String>,
        result: Value,
    ) -> Self {
        Self::new(invocation_id, connection_id, CompletionOutcome::Result(result))
    }

    pub fn with_error(
        invocation_id: impl Into<String>,
        connection_id: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self::new(
            invocation_id,
            connection_id,
            CompletionOutcome::Error(error.into()),
        )
    }

    pub fn empty(invocation_id: impl Into<String>, connection_id: impl Into<String>) -> Self {
        Self::new(invocation_id, connection_id, CompletionOutcome::Empty)
    }

    fn new(
        invocation_id: impl Into<String>,
        connection_id: impl Into<String>,
        outcome: CompletionOutcome,
    ) -> Self {
        Self {
            invocation_id: invocation_id.into(),
            connection_id: connection_id.into(),
            outcome,
            tracing_id: None,
        }
    }

    pub fn has_result(&self) -> bool {
        matches!(self.outcome, CompletionOutcome::Result(_))
    }

    /// Convert into the value handed to the awaiting caller.
    pub(crate) fn to_result(&self) -> Result<Value, BackplaneError> {
        match &self.outcome {
            CompletionOutcome::Result(value) => Ok(value.clone()),
            CompletionOutcome::Error(error) => Err(BackplaneError::Remote(error.clone())),
            CompletionOutcome::Empty => Err(BackplaneError::NoResult {
                invocation_id: self.invocation_id.clone(),
            }),
        }
    }
}

/// Close a client connection. Fire-and-forget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseConnectionMessage {
    pub connection_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracing_id: Option<u64>,
}

impl CloseConnectionMessage {
    pub fn new(connection_id: impl Into<String>, reason: Option<String>) -> Self {
        Self {
            connection_id: connection_id.into(),
            reason,
            tracing_id: None,
        }
    }
}
