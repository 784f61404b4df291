// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Caller-side correlation of client invocations.

use super::id::InvocationIdGenerator;
use crate::ack::{AckHandler, AckId, AckWaiter};
use crate::endpoint::{EndpointManager, EndpointRouter, ServiceEndpoint};
use crate::error::{BackplaneError, Result};
use crate::protocol::CompletionMessage;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::TypeId;
use std::fmt;
use std::future::{Future, IntoFuture};
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Type recorded for an invocation's return value, used by decoders to
/// deserialize the incoming payload.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResultType {
    type_id: TypeId,
    type_name: &'static str,
}

impl ResultType {
    pub fn of<T: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

impl fmt::Debug for ResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResultType({})", self.type_name)
    }
}

struct PendingInvocation {
    connection_id: String,
    result_type: ResultType,
    ack_id: AckId,
    tx: oneshot::Sender<Result<Value>>,
}

struct InvocationTable {
    pending: DashMap<String, PendingInvocation>,
    acks: AckHandler,
}

impl InvocationTable {
    /// Remove `invocation_id` and hand `outcome` to its caller. Only the call
    /// that removes the entry resolves it; returns whether this one did.
    fn resolve(&self, invocation_id: &str, outcome: Result<Value>) -> bool {
        let Some((_, invocation)) = self.pending.remove(invocation_id) else {
            return false;
        };
        self.acks.complete_ack(invocation.ack_id, outcome.is_ok());
        debug!(invocation_id, ok = outcome.is_ok(), "invocation resolved");
        // Caller may have dropped its PendingResult
        let _ = invocation.tx.send(outcome);
        true
    }
}

/// Tracks invocations sent to client connections through one or more
/// endpoints, and resolves each exactly once.
///
/// An invocation resolves on the first completion carrying a result or an
/// error, or once every relevant endpoint has answered (multi-ack satisfied),
/// whichever comes first. Only one endpoint holds the live connection; the
/// others answer with an empty completion.
pub struct ClientInvocationCorrelator {
    table: Arc<InvocationTable>,
    ids: InvocationIdGenerator,
    endpoints: Arc<dyn EndpointManager>,
    router: Arc<dyn EndpointRouter>,
}

impl fmt::Debug for ClientInvocationCorrelator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientInvocationCorrelator")
            .field("instance", &self.ids.instance_id())
            .field("pending", &self.table.pending.len())
            .finish()
    }
}

impl ClientInvocationCorrelator {
    pub fn new(
        endpoints: Arc<dyn EndpointManager>,
        router: Arc<dyn EndpointRouter>,
        acks: AckHandler,
    ) -> Self {
        Self {
            table: Arc::new(InvocationTable {
                pending: DashMap::new(),
                acks,
            }),
            ids: InvocationIdGenerator::new(),
            endpoints,
            router,
        }
    }

    /// New unique id for an invocation targeting `connection_id`.
    pub fn generate_invocation_id(&self, connection_id: &str) -> String {
        self.ids.next_id(connection_id)
    }

    /// Register an invocation and return the handle its caller awaits.
    ///
    /// The number of endpoints expected to answer is what the router returns
    /// for `(hub, connection_id)`. Callers that also send the invocation
    /// should resolve the targets once and use
    /// [`add_invocation_for`](Self::add_invocation_for), so the count matches
    /// what was sent.
    ///
    /// With zero endpoints one completion is still awaited and the ack
    /// timeout bounds the wait. A plain multi-ack expecting zero triggers
    /// would resolve at once instead.
    pub fn add_invocation<T>(
        &self,
        hub: &str,
        connection_id: &str,
        invocation_id: &str,
        cancel: CancellationToken,
    ) -> Result<PendingResult<T>>
    where
        T: DeserializeOwned + 'static,
    {
        let candidates = self.endpoints.endpoints(hub);
        let targets = self.router.endpoints_for_connection(connection_id, &candidates);
        debug!(hub, connection_id, targets = targets.len(), "invocation targets resolved");
        self.add_invocation_for(connection_id, invocation_id, &targets, cancel)
    }

    /// Register an invocation that will be sent to exactly `targets`.
    ///
    /// One completion is expected per target, and at least one when
    /// `targets` is empty (see [`add_invocation`](Self::add_invocation)).
    pub fn add_invocation_for<T>(
        &self,
        connection_id: &str,
        invocation_id: &str,
        targets: &[ServiceEndpoint],
        cancel: CancellationToken,
    ) -> Result<PendingResult<T>>
    where
        T: DeserializeOwned + 'static,
    {
        let expected = targets.len().max(1);

        let (ack_id, ack) = self.table.acks.create_multi_ack();
        self.table
            .acks
            .set_expected_count(ack_id, i32::try_from(expected).unwrap_or(i32::MAX));

        let (tx, rx) = oneshot::channel();
        match self.table.pending.entry(invocation_id.to_string()) {
            Entry::Occupied(_) => {
                self.table.acks.discard_ack(ack_id);
                return Err(BackplaneError::DuplicateInvocation(invocation_id.to_string()));
            }
            Entry::Vacant(slot) => {
                slot.insert(PendingInvocation {
                    connection_id: connection_id.to_string(),
                    result_type: ResultType::of::<T>(),
                    ack_id,
                    tx,
                });
            }
        }

        debug!(
            connection_id,
            invocation_id, ack_id, expected, "invocation registered"
        );

        Ok(PendingResult {
            invocation_id: invocation_id.to_string(),
            rx,
            ack,
            cancel,
            table: Arc::clone(&self.table),
            _marker: PhantomData,
        })
    }

    /// Feed one endpoint's completion.
    ///
    /// Returns `Ok(true)` only if this call resolved the invocation,
    /// `Ok(false)` if it is still waiting for other endpoints or was already
    /// resolved/unknown. A completion from a connection that does not own the
    /// invocation is a protocol violation and yields `ConnectionMismatch`.
    pub fn try_complete_result(
        &self,
        connection_id: &str,
        message: &CompletionMessage,
    ) -> Result<bool> {
        let ack_id = {
            let Some(item) = self.table.pending.get(&message.invocation_id) else {
                debug!(
                    invocation_id = %message.invocation_id,
                    "completion for unknown invocation ignored"
                );
                return Ok(false);
            };
            if item.connection_id != connection_id {
                error!(
                    connection_id,
                    owner = %item.connection_id,
                    invocation_id = %message.invocation_id,
                    "completion from a connection that does not own the invocation"
                );
                return Err(BackplaneError::ConnectionMismatch {
                    connection_id: connection_id.to_string(),
                    invocation_id: message.invocation_id.clone(),
                });
            }
            item.ack_id
        };

        if message.outcome.is_definitive() {
            return Ok(self.table.resolve(&message.invocation_id, message.to_result()));
        }

        // Receipts never count the owner's answer, so they can only satisfy
        // the ack when no endpoint holds a result
        if self.table.acks.trigger_ack(ack_id) {
            return Ok(self.table.resolve(&message.invocation_id, message.to_result()));
        }
        Ok(false)
    }

    /// Fail every invocation pending on `connection_id` with a disconnect
    /// error. Returns how many were failed.
    pub fn cleanup_invocations_by_connection(&self, connection_id: &str) -> usize {
        let ids: Vec<String> = self
            .table
            .pending
            .iter()
            .filter(|e| e.connection_id == connection_id)
            .map(|e| e.key().clone())
            .collect();

        let mut failed = 0;
        for id in ids {
            let err = BackplaneError::Disconnected {
                connection_id: connection_id.to_string(),
            };
            if self.table.resolve(&id, Err(err)) {
                failed += 1;
            }
        }
        if failed > 0 {
            info!(connection_id, failed, "pending invocations failed on disconnect");
        }
        failed
    }

    /// Drop an invocation without resolving it.
    pub fn remove_invocation(&self, invocation_id: &str) -> bool {
        match self.table.pending.remove(invocation_id) {
            Some((_, invocation)) => {
                self.table.acks.discard_ack(invocation.ack_id);
                true
            }
            None => false,
        }
    }

    /// Result type recorded by [`add_invocation`](Self::add_invocation).
    pub fn result_type(&self, invocation_id: &str) -> Result<ResultType> {
        self.try_result_type(invocation_id)
            .ok_or_else(|| BackplaneError::UnknownInvocation(invocation_id.to_string()))
    }

    pub fn try_result_type(&self, invocation_id: &str) -> Option<ResultType> {
        self.table.pending.get(invocation_id).map(|e| e.result_type)
    }

    /// Number of unresolved invocations.
    pub fn pending_count(&self) -> usize {
        self.table.pending.len()
    }
}

/// Awaitable result of a client invocation.
///
/// Dropping it before the outcome arrives removes the invocation and
/// discards its ack; a later completion is then ignored.
pub struct PendingResult<T> {
    invocation_id: String,
    rx: oneshot::Receiver<Result<Value>>,
    ack: AckWaiter,
    cancel: CancellationToken,
    table: Arc<InvocationTable>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for PendingResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingResult")
            .field("invocation_id", &self.invocation_id)
            .field("ack", &self.ack)
            .finish()
    }
}

impl<T: DeserializeOwned> PendingResult<T> {
    pub fn invocation_id(&self) -> &str {
        &self.invocation_id
    }

    /// Wait for the outcome.
    ///
    /// Fails with `Canceled` when the token fires first, with `Timeout` when
    /// the underlying ack expires first, and with the remote error otherwise.
    pub async fn wait(mut self) -> Result<T> {
        let ack_wait = self.ack.clone().wait();
        tokio::pin!(ack_wait);
        let mut ack_settled = false;

        loop {
            tokio::select! {
                biased;

                outcome = &mut self.rx => {
                    return match outcome {
                        Ok(Ok(value)) => serde_json::from_value(value).map_err(BackplaneError::Decode),
                        Ok(Err(e)) => Err(e),
                        Err(_) => Err(BackplaneError::InvocationRemoved(self.invocation_id.clone())),
                    };
                }

                () = self.cancel.cancelled() => {
                    // A completion that raced us wins; rx is ready either way
                    self.table.resolve(
                        &self.invocation_id,
                        Err(BackplaneError::Canceled { invocation_id: self.invocation_id.clone() }),
                    );
                }

                acked = &mut ack_wait, if !ack_settled => {
                    ack_settled = true;
                    if let Err(e) = acked {
                        self.table.resolve(&self.invocation_id, Err(e));
                    }
                }
            }
        }
    }
}

impl<T> Drop for PendingResult<T> {
    fn drop(&mut self) {
        let ack_id = self.ack.id();
        let abandoned = self
            .table
            .pending
            .remove_if(&self.invocation_id, |_, invocation| invocation.ack_id == ack_id);
        if abandoned.is_some() {
            self.table.acks.discard_ack(ack_id);
            debug!(invocation_id = %self.invocation_id, "invocation abandoned by its caller");
        }
    }
}

impl<T> IntoFuture for PendingResult<T>
where
    T: DeserializeOwned + Send + 'static,
{
    type Output = Result<T>;
    type IntoFuture = Pin<Box<dyn Future<Output = Result<T>> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.wait())
    }
}
