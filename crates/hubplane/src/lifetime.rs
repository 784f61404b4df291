// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-hub facade over the service connection.
//!
//! [`HubLifetimeManager`] turns group, user and connection operations into
//! ackable control messages, writes them through a [`ServiceMessageWriter`],
//! and awaits the matching ack. Client invocations fan out to every endpoint
//! the router picks and are correlated by [`ClientInvocationCorrelator`].

use crate::ack::AckHandler;
use crate::config::BackplaneConfig;
use crate::endpoint::{EndpointManager, EndpointRouter, ServiceEndpoint};
use crate::error::{BackplaneError, Result};
use crate::invocation::ClientInvocationCorrelator;
use crate::protocol::{
    CheckConnectionExistenceMessage, CheckGroupExistenceMessage, CheckUserExistenceMessage,
    CheckUserInGroupMessage, ClientInvocationMessage, CloseConnectionMessage, CompletionMessage,
    JoinGroupMessage, LeaveGroupMessage, ServiceMessage, TracingIdGenerator,
    UserJoinGroupMessage, UserLeaveGroupMessage,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Outbound side of the service connection.
///
/// Implementations queue or send; they must not block on the remote answer.
pub trait ServiceMessageWriter: Send + Sync {
    /// Send to the shard the transport selects, normally by
    /// [`ServiceMessage::partition_key`].
    fn write(&self, message: ServiceMessage) -> Result<()>;

    /// Send to one explicit endpoint.
    fn write_to(&self, endpoint: &ServiceEndpoint, message: ServiceMessage) -> Result<()>;
}

/// Group, user and connection operations for one hub.
pub struct HubLifetimeManager {
    hub: String,
    server_name: String,
    writer: Arc<dyn ServiceMessageWriter>,
    endpoints: Arc<dyn EndpointManager>,
    router: Arc<dyn EndpointRouter>,
    acks: AckHandler,
    invocations: ClientInvocationCorrelator,
    tracing_ids: Option<TracingIdGenerator>,
}

impl std::fmt::Debug for HubLifetimeManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubLifetimeManager")
            .field("hub", &self.hub)
            .field("server_name", &self.server_name)
            .field("acks", &self.acks)
            .field("invocations", &self.invocations)
            .finish()
    }
}

impl HubLifetimeManager {
    pub fn new(
        hub: impl Into<String>,
        config: &BackplaneConfig,
        writer: Arc<dyn ServiceMessageWriter>,
        endpoints: Arc<dyn EndpointManager>,
        router: Arc<dyn EndpointRouter>,
    ) -> Self {
        let acks = AckHandler::with_timeout(config.ack_timeout());
        let invocations =
            ClientInvocationCorrelator::new(Arc::clone(&endpoints), Arc::clone(&router), acks.clone());
        Self {
            hub: hub.into(),
            server_name: config.server_name.clone(),
            writer,
            endpoints,
            router,
            acks,
            invocations,
            tracing_ids: config.enable_message_tracing.then(TracingIdGenerator::new),
        }
    }

    pub fn hub(&self) -> &str {
        &self.hub
    }

    pub fn ack_handler(&self) -> &AckHandler {
        &self.acks
    }

    pub fn correlator(&self) -> &ClientInvocationCorrelator {
        &self.invocations
    }

    // Groups

    pub async fn add_to_group(&self, connection_id: &str, group_name: &str) -> Result<()> {
        require("connection_id", connection_id)?;
        require("group_name", group_name)?;
        self.send_with_ack(JoinGroupMessage::new(connection_id, group_name).into())
            .await
            .map(drop)
    }

    pub async fn remove_from_group(&self, connection_id: &str, group_name: &str) -> Result<()> {
        require("connection_id", connection_id)?;
        require("group_name", group_name)?;
        self.send_with_ack(
            LeaveGroupMessage::new(connection_id, Some(group_name.to_string())).into(),
        )
        .await
        .map(drop)
    }

    /// Leave every group; the shard treats the missing group as a wildcard.
    pub async fn remove_from_all_groups(&self, connection_id: &str) -> Result<()> {
        require("connection_id", connection_id)?;
        self.send_with_ack(LeaveGroupMessage::all(connection_id).into())
            .await
            .map(drop)
    }

    // Users

    pub async fn user_add_to_group(&self, user_id: &str, group_name: &str) -> Result<()> {
        require("user_id", user_id)?;
        require("group_name", group_name)?;
        self.send_with_ack(UserJoinGroupMessage::new(user_id, group_name).into())
            .await
            .map(drop)
    }

    /// Membership expires after `ttl_secs`. Out-of-range values are rejected
    /// before anything is written.
    pub async fn user_add_to_group_with_ttl(
        &self,
        user_id: &str,
        group_name: &str,
        ttl_secs: i64,
    ) -> Result<()> {
        require("user_id", user_id)?;
        require("group_name", group_name)?;
        let message = UserJoinGroupMessage::new(user_id, group_name).with_ttl(ttl_secs)?;
        self.send_with_ack(message.into()).await.map(drop)
    }

    pub async fn user_remove_from_group(&self, user_id: &str, group_name: &str) -> Result<()> {
        require("user_id", user_id)?;
        require("group_name", group_name)?;
        self.send_with_ack(
            UserLeaveGroupMessage::new(user_id, Some(group_name.to_string())).into(),
        )
        .await
        .map(drop)
    }

    pub async fn user_remove_from_all_groups(&self, user_id: &str) -> Result<()> {
        require("user_id", user_id)?;
        self.send_with_ack(UserLeaveGroupMessage::all(user_id).into())
            .await
            .map(drop)
    }

    // Existence checks

    pub async fn is_user_in_group(&self, user_id: &str, group_name: &str) -> Result<bool> {
        require("user_id", user_id)?;
        require("group_name", group_name)?;
        self.send_with_ack(CheckUserInGroupMessage::new(user_id, group_name).into())
            .await
    }

    pub async fn connection_exists(&self, connection_id: &str) -> Result<bool> {
        require("connection_id", connection_id)?;
        self.send_with_ack(CheckConnectionExistenceMessage::new(connection_id).into())
            .await
    }

    pub async fn user_exists(&self, user_id: &str) -> Result<bool> {
        require("user_id", user_id)?;
        self.send_with_ack(CheckUserExistenceMessage::new(user_id).into())
            .await
    }

    pub async fn group_exists(&self, group_name: &str) -> Result<bool> {
        require("group_name", group_name)?;
        self.send_with_ack(CheckGroupExistenceMessage::new(group_name).into())
            .await
    }

    // Connections

    /// Ask the service to drop a client connection. Nothing is awaited.
    pub fn close_connection(&self, connection_id: &str, reason: Option<&str>) -> Result<()> {
        require("connection_id", connection_id)?;
        let mut message: ServiceMessage =
            CloseConnectionMessage::new(connection_id, reason.map(str::to_string)).into();
        self.stamp(&mut message);
        self.writer.write(message)
    }

    /// Invoke `method` on a client connection and await its return value.
    ///
    /// The invocation is registered before any message leaves, so a fast
    /// completion cannot arrive for an unknown id. Targets are resolved once
    /// and the same set is both sent to and counted for completions.
    pub async fn invoke_connection<T>(
        &self,
        connection_id: &str,
        method: &str,
        arguments: Vec<Value>,
        cancel: CancellationToken,
    ) -> Result<T>
    where
        T: DeserializeOwned + 'static,
    {
        require("connection_id", connection_id)?;
        require("method", method)?;

        let candidates = self.endpoints.endpoints(&self.hub);
        let targets = self.router.endpoints_for_connection(connection_id, &candidates);
        if targets.is_empty() {
            return Err(BackplaneError::Transport(format!(
                "no endpoint serves hub '{}'",
                self.hub
            )));
        }

        let invocation_id = self.invocations.generate_invocation_id(connection_id);
        let pending = self.invocations.add_invocation_for::<T>(
            connection_id,
            &invocation_id,
            &targets,
            cancel,
        )?;

        let mut message: ServiceMessage = ClientInvocationMessage {
            invocation_id: invocation_id.clone(),
            connection_id: connection_id.to_string(),
            caller_server_id: self.server_name.clone(),
            method: method.to_string(),
            arguments,
            tracing_id: None,
        }
        .into();
        self.stamp(&mut message);
        debug!(
            hub = %self.hub,
            connection_id,
            invocation_id = %invocation_id,
            method,
            endpoints = targets.len(),
            tracing_id = ?message.tracing_id(),
            "invoking client"
        );

        for endpoint in &targets {
            if let Err(e) = self.writer.write_to(endpoint, message.clone()) {
                warn!(endpoint = %endpoint, invocation_id = %invocation_id, error = %e, "invocation write failed");
                self.invocations.remove_invocation(&invocation_id);
                return Err(e);
            }
        }

        // Dropping the handle, here or with this future, releases the entry
        pending.wait().await
    }

    /// Feed a completion received from `connection_id`'s endpoint.
    ///
    /// Returns whether it resolved a pending invocation. A completion whose
    /// invocation id matches nothing, empty included, is ignored.
    pub fn set_connection_result(
        &self,
        connection_id: &str,
        completion: &CompletionMessage,
    ) -> Result<bool> {
        require("connection_id", connection_id)?;
        let resolved = self.invocations.try_complete_result(connection_id, completion)?;
        if !resolved && self.invocations.try_result_type(&completion.invocation_id).is_none() {
            info!(
                connection_id,
                invocation_id = %completion.invocation_id,
                "completion matched no pending invocation"
            );
        }
        Ok(resolved)
    }

    /// Fail every invocation still waiting on a closed connection.
    pub fn on_connection_closed(&self, connection_id: &str) -> usize {
        self.invocations.cleanup_invocations_by_connection(connection_id)
    }

    /// Route one inbound message from the service.
    pub fn dispatch(&self, message: ServiceMessage) -> Result<()> {
        match message {
            ServiceMessage::Ack(ack) => {
                self.acks.handle_ack_message(&ack);
                Ok(())
            }
            ServiceMessage::Completion(completion) => {
                let connection_id = completion.connection_id.clone();
                self.set_connection_result(&connection_id, &completion)
                    .map(drop)
            }
            other => Err(BackplaneError::UnexpectedMessage(other.kind())),
        }
    }

    fn stamp(&self, message: &mut ServiceMessage) {
        if let Some(ids) = &self.tracing_ids {
            message.set_tracing_id(ids.next_id());
        }
    }

    /// Attach a fresh single-shot ack, write, and wait for the verdict.
    async fn send_with_ack(&self, mut message: ServiceMessage) -> Result<bool> {
        let (ack_id, waiter) = self.acks.create_ack();
        message.set_ack_id(ack_id);
        self.stamp(&mut message);
        debug!(
            hub = %self.hub,
            kind = message.kind(),
            ack_id,
            partition = ?message.partition_key(),
            tracing_id = ?message.tracing_id(),
            "sending control message"
        );

        if let Err(e) = self.writer.write(message) {
            self.acks.discard_ack(ack_id);
            return Err(e);
        }
        waiter.wait().await
    }
}

fn require(name: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(BackplaneError::invalid_arg(name));
    }
    Ok(())
}
