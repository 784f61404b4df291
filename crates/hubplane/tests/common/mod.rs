// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-process stand-in for a set of service shards.

#![allow(dead_code)]

use hubplane::protocol::{AckMessage, AckStatus, ClientInvocationMessage, CompletionMessage};
use hubplane::{
    BackplaneConfig, BackplaneError, DefaultEndpointRouter, EndpointConfig, HubLifetimeManager,
    Result, ServiceEndpoint, ServiceMessage, ServiceMessageWriter, StaticEndpointManager,
};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const HUB: &str = "chat";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Config with `n` endpoints named `ep0..`.
pub fn config_with_endpoints(n: usize) -> BackplaneConfig {
    (0..n).fold(BackplaneConfig::default(), |config, i| {
        config.endpoint(EndpointConfig::new(
            format!("ep{}", i),
            format!("https://ep{}.test", i),
        ))
    })
}

/// One message as it left the hub.
#[derive(Debug, Clone)]
pub struct Outbound {
    /// Explicit target, `None` when the transport picks the shard
    pub endpoint: Option<String>,
    pub message: ServiceMessage,
}

pub struct ChannelWriter {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl ChannelWriter {
    fn send(&self, endpoint: Option<String>, message: ServiceMessage) -> Result<()> {
        self.tx
            .send(Outbound { endpoint, message })
            .map_err(|_| BackplaneError::Transport("service connection closed".into()))
    }
}

impl ServiceMessageWriter for ChannelWriter {
    fn write(&self, message: ServiceMessage) -> Result<()> {
        self.send(None, message)
    }

    fn write_to(&self, endpoint: &ServiceEndpoint, message: ServiceMessage) -> Result<()> {
        self.send(Some(endpoint.name().to_string()), message)
    }
}

/// Membership state and answering policy of the fake shards.
#[derive(Default)]
pub struct FakeService {
    /// Endpoint that holds client connections; others answer empty
    pub owner: Option<String>,
    pub endpoints: usize,
    pub drop_acks: bool,
    pub answer_invocations: bool,
    groups: HashMap<String, HashSet<String>>,
    user_groups: HashMap<String, HashSet<String>>,
    connections: HashSet<String>,
    users: HashSet<String>,
    buffered: HashMap<String, Vec<CompletionMessage>>,
}

impl FakeService {
    pub fn new(endpoints: usize) -> Self {
        Self {
            owner: Some("ep0".to_string()),
            endpoints,
            answer_invocations: true,
            ..Self::default()
        }
    }

    pub fn owned_by(mut self, endpoint: &str) -> Self {
        self.owner = Some(endpoint.to_string());
        self
    }

    pub fn silent(mut self) -> Self {
        self.drop_acks = true;
        self.answer_invocations = false;
        self
    }

    pub fn with_connection(mut self, connection_id: &str) -> Self {
        self.connections.insert(connection_id.to_string());
        self
    }

    async fn run(
        mut self,
        hub: Arc<HubLifetimeManager>,
        mut rx: mpsc::UnboundedReceiver<Outbound>,
        log: Arc<Mutex<Vec<Outbound>>>,
    ) {
        while let Some(out) = rx.recv().await {
            log.lock().push(out.clone());
            for reply in self.handle(&out) {
                let _ = hub.dispatch(reply);
            }
        }
    }

    fn handle(&mut self, out: &Outbound) -> Vec<ServiceMessage> {
        if let ServiceMessage::ClientInvocation(invocation) = &out.message {
            return self.on_invocation(out.endpoint.as_deref(), invocation);
        }
        if self.drop_acks {
            return Vec::new();
        }
        let Some(ack_id) = out.message.ack_id() else {
            return Vec::new();
        };
        let status = self.apply(&out.message);
        vec![AckMessage::new(ack_id, status).into()]
    }

    /// Reply once every endpoint got the invocation, in random order.
    fn on_invocation(
        &mut self,
        endpoint: Option<&str>,
        invocation: &ClientInvocationMessage,
    ) -> Vec<ServiceMessage> {
        if !self.answer_invocations {
            return Vec::new();
        }
        let completion = if endpoint == self.owner.as_deref() {
            CompletionMessage::with_result(
                &invocation.invocation_id,
                &invocation.connection_id,
                json!({ "method": invocation.method, "args": invocation.arguments }),
            )
        } else {
            CompletionMessage::empty(&invocation.invocation_id, &invocation.connection_id)
        };

        let batch = self
            .buffered
            .entry(invocation.invocation_id.clone())
            .or_default();
        batch.push(completion);
        if batch.len() < self.endpoints {
            return Vec::new();
        }

        let mut batch = self
            .buffered
            .remove(&invocation.invocation_id)
            .unwrap_or_default();
        fastrand::shuffle(&mut batch);
        batch.into_iter().map(Into::into).collect()
    }

    fn apply(&mut self, message: &ServiceMessage) -> AckStatus {
        match message {
            ServiceMessage::JoinGroup(m) => {
                self.connections.insert(m.connection_id.clone());
                self.groups
                    .entry(m.group_name.clone())
                    .or_default()
                    .insert(m.connection_id.clone());
                AckStatus::Ok
            }
            ServiceMessage::LeaveGroup(m) => {
                match &m.group_name {
                    Some(group) => {
                        if let Some(members) = self.groups.get_mut(group) {
                            members.remove(&m.connection_id);
                        }
                    }
                    None => {
                        for members in self.groups.values_mut() {
                            members.remove(&m.connection_id);
                        }
                    }
                }
                AckStatus::Ok
            }
            ServiceMessage::UserJoinGroup(m) => {
                self.users.insert(m.user_id.clone());
                self.user_groups
                    .entry(m.user_id.clone())
                    .or_default()
                    .insert(m.group_name.clone());
                AckStatus::Ok
            }
            ServiceMessage::UserLeaveGroup(m) => {
                match &m.group_name {
                    Some(group) => {
                        if let Some(groups) = self.user_groups.get_mut(&m.user_id) {
                            groups.remove(group);
                        }
                    }
                    None => {
                        self.user_groups.remove(&m.user_id);
                    }
                }
                AckStatus::Ok
            }
            ServiceMessage::CheckUserInGroup(m) => status(
                self.user_groups
                    .get(&m.user_id)
                    .is_some_and(|groups| groups.contains(&m.group_name)),
            ),
            ServiceMessage::CheckGroupExistence(m) => status(
                self.groups
                    .get(&m.group_name)
                    .is_some_and(|members| !members.is_empty())
                    || self
                        .user_groups
                        .values()
                        .any(|groups| groups.contains(&m.group_name)),
            ),
            ServiceMessage::CheckConnectionExistence(m) => {
                status(self.connections.contains(&m.connection_id))
            }
            ServiceMessage::CheckUserExistence(m) => status(self.users.contains(&m.user_id)),
            _ => AckStatus::Ok,
        }
    }
}

fn status(found: bool) -> AckStatus {
    if found {
        AckStatus::Ok
    } else {
        AckStatus::NotExist
    }
}

pub struct Harness {
    pub hub: Arc<HubLifetimeManager>,
    pub log: Arc<Mutex<Vec<Outbound>>>,
    pub service: JoinHandle<()>,
}

impl Harness {
    pub fn start(config: BackplaneConfig, service: FakeService) -> Self {
        init_tracing();
        let (tx, rx) = mpsc::unbounded_channel();
        let hub = Arc::new(HubLifetimeManager::new(
            HUB,
            &config,
            Arc::new(ChannelWriter { tx }),
            Arc::new(StaticEndpointManager::from_config(&config)),
            Arc::new(DefaultEndpointRouter),
        ));
        let log = Arc::new(Mutex::new(Vec::new()));
        let service = tokio::spawn(service.run(Arc::clone(&hub), rx, Arc::clone(&log)));
        Self { hub, log, service }
    }

    /// Messages sent so far.
    pub fn sent(&self) -> Vec<Outbound> {
        self.log.lock().clone()
    }
}

/// Hub whose service side is already gone.
pub fn disconnected_hub(config: &BackplaneConfig) -> HubLifetimeManager {
    let (tx, rx) = mpsc::unbounded_channel();
    drop(rx);
    HubLifetimeManager::new(
        HUB,
        config,
        Arc::new(ChannelWriter { tx }),
        Arc::new(StaticEndpointManager::from_config(config)),
        Arc::new(DefaultEndpointRouter),
    )
}
