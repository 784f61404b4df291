// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Invocation id generation.
//!
//! Format: `{connection_id}-{instance}-{counter}` where `instance` is a
//! 32-hex-digit random id of the generator and `counter` starts at 1.
//! Nothing should parse ids except for diagnostics.

use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Per-correlator source of unique invocation ids.
#[derive(Debug)]
pub struct InvocationIdGenerator {
    instance: String,
    last: AtomicU64,
}

impl Default for InvocationIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl InvocationIdGenerator {
    pub fn new() -> Self {
        Self {
            instance: Uuid::new_v4().simple().to_string(),
            last: AtomicU64::new(0),
        }
    }

    /// Instance part of every id this generator emits.
    pub fn instance_id(&self) -> &str {
        &self.instance
    }

    pub fn next_id(&self, connection_id: &str) -> String {
        let n = self.last.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{}-{}", connection_id, self.instance, n)
    }
}

/// Recover the originating connection id from an invocation id.
pub fn connection_id_of(invocation_id: &str) -> Option<&str> {
    let mut parts = invocation_id.rsplitn(3, '-');
    let counter = parts.next()?;
    let instance = parts.next()?;
    let connection = parts.next()?;
    if counter.parse::<u64>().is_err() || instance.is_empty() || connection.is_empty() {
        return None;
    }
    Some(connection)
}
