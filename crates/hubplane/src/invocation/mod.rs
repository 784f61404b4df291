// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Client invocations routed through service endpoints.
//!
//! A server asks a client connection to run a method and awaits the return
//! value. The connection lives behind exactly one endpoint, but the server
//! cannot tell which, so the invocation fans out to every relevant endpoint.
//! Each endpoint answers with a [`CompletionMessage`](crate::protocol::CompletionMessage):
//! the owner with a result or an error, the others with an empty receipt.
//!
//! [`ClientInvocationCorrelator`] matches those completions back to the
//! caller's [`PendingResult`].

mod correlator;
mod id;


pub use correlator::{ClientInvocationCorrelator, PendingResult, ResultType};
pub use id::{connection_id_of, InvocationIdGenerator};
