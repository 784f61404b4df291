// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Many concurrent invocations fanned out to several endpoints, with
//! completions arriving in random order off the wire.

mod common;

use common::{config_with_endpoints, init_tracing, HUB};
use hubplane::protocol::{decode, encode};
use hubplane::{
    AckHandler, BackplaneError, ClientInvocationCorrelator, CompletionMessage,
    DefaultEndpointRouter, ServiceMessage, StaticEndpointManager,
};
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const ENDPOINTS: usize = 4;
const CONNECTIONS: usize = 8;
const CALLS_PER_CONNECTION: usize = 16;

fn correlator() -> Arc<ClientInvocationCorrelator> {
    let config = config_with_endpoints(ENDPOINTS);
    Arc::new(ClientInvocationCorrelator::new(
        Arc::new(StaticEndpointManager::from_config(&config)),
        Arc::new(DefaultEndpointRouter),
        AckHandler::with_timeout(config.ack_timeout()),
    ))
}

/// Encode then decode, as the transport would.
fn over_the_wire(message: CompletionMessage) -> CompletionMessage {
    let bytes = encode(&message.into()).unwrap();
    match decode(&bytes).unwrap() {
        ServiceMessage::Completion(m) => m,
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_shuffled_fanout_resolves_every_invocation_once() {
    init_tracing();
    let correlator = correlator();

    let mut waiters = Vec::new();
    let mut completions = Vec::new();
    for c in 0..CONNECTIONS {
        let connection_id = format!("conn-{}", c);
        for n in 0..CALLS_PER_CONNECTION {
            let id = correlator.generate_invocation_id(&connection_id);
            let pending = correlator
                .add_invocation::<u64>(HUB, &connection_id, &id, CancellationToken::new())
                .unwrap();
            let expected = (c * 1000 + n) as u64;
            waiters.push((pending, expected));

            let owner = fastrand::usize(..ENDPOINTS);
            for e in 0..ENDPOINTS {
                let message = if e == owner {
                    CompletionMessage::with_result(&id, &connection_id, json!(expected))
                } else {
                    CompletionMessage::empty(&id, &connection_id)
                };
                completions.push(over_the_wire(message));
            }
        }
    }
    assert_eq!(correlator.pending_count(), CONNECTIONS * CALLS_PER_CONNECTION);

    fastrand::shuffle(&mut completions);
    let chunks: Vec<Vec<CompletionMessage>> = completions
        .chunks(completions.len() / 4 + 1)
        .map(<[CompletionMessage]>::to_vec)
        .collect();

    let feeders: Vec<_> = chunks
        .into_iter()
        .map(|chunk| {
            let correlator = Arc::clone(&correlator);
            tokio::spawn(async move {
                let mut resolved = 0;
                for message in chunk {
                    if correlator
                        .try_complete_result(&message.connection_id, &message)
                        .unwrap()
                    {
                        resolved += 1;
                    }
                }
                resolved
            })
        })
        .collect();

    let mut resolved = 0;
    for feeder in feeders {
        resolved += feeder.await.unwrap();
    }
    assert_eq!(resolved, CONNECTIONS * CALLS_PER_CONNECTION);

    for (pending, expected) in waiters {
        assert_eq!(pending.await.unwrap(), expected);
    }
    assert_eq!(correlator.pending_count(), 0);
}

#[tokio::test]
async fn test_disconnect_only_hits_its_connection() {
    let correlator = correlator();

    let doomed: Vec<_> = (0..5)
        .map(|_| {
            let id = correlator.generate_invocation_id("doomed");
            correlator
                .add_invocation::<u64>(HUB, "doomed", &id, CancellationToken::new())
                .unwrap()
        })
        .collect();
    let survivor_id = correlator.generate_invocation_id("survivor");
    let survivor = correlator
        .add_invocation::<u64>(HUB, "survivor", &survivor_id, CancellationToken::new())
        .unwrap();

    assert_eq!(correlator.cleanup_invocations_by_connection("doomed"), 5);
    assert_eq!(correlator.cleanup_invocations_by_connection("doomed"), 0);
    for pending in doomed {
        let id = pending.invocation_id().to_string();
        assert!(pending.await.unwrap_err().is_disconnected());
        assert!(matches!(
            correlator.result_type(&id),
            Err(BackplaneError::UnknownInvocation(_))
        ));
    }

    assert!(correlator.result_type(&survivor_id).unwrap().is::<u64>());
    let message = over_the_wire(CompletionMessage::with_result(&survivor_id, "survivor", json!(1)));
    assert!(correlator.try_complete_result("survivor", &message).unwrap());
    assert_eq!(survivor.await.unwrap(), 1);
}
