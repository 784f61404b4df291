// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Endpoint selection per target.

use super::ServiceEndpoint;

/// Picks, among candidate endpoints, those that may hold a connection.
///
/// May return several endpoints when ownership is unknown; every returned
/// endpoint is expected to answer an invocation for the connection. Group
/// and user control messages are not routed here: the transport shards them
/// by partition key.
pub trait EndpointRouter: Send + Sync {
    fn endpoints_for_connection(
        &self,
        connection_id: &str,
        candidates: &[ServiceEndpoint],
    ) -> Vec<ServiceEndpoint>;
}

/// Broadcasts to every candidate: the server does not know which shard
/// holds a connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEndpointRouter;

impl EndpointRouter for DefaultEndpointRouter {
    fn endpoints_for_connection(
        &self,
        _connection_id: &str,
        candidates: &[ServiceEndpoint],
    ) -> Vec<ServiceEndpoint> {
        candidates.to_vec()
    }
}
