// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Message tracing id generation.

use std::sync::atomic::{AtomicU32, Ordering};
use uuid::Uuid;

/// Produces 64-bit tracing ids: a random per-instance prefix in the high
/// word, a wrapping counter in the low word.
#[derive(Debug)]
pub struct TracingIdGenerator {
    prefix: u64,
    counter: AtomicU32,
}

impl Default for TracingIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl TracingIdGenerator {
    pub fn new() -> Self {
        let random = Uuid::new_v4().as_u128();
        Self::with_prefix(random as u32)
    }

    pub fn with_prefix(prefix: u32) -> Self {
        Self {
            prefix: u64::from(prefix) << 32,
            counter: AtomicU32::new(0),
        }
    }

    pub fn next_id(&self) -> u64 {
        let low = self.counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        self.prefix | u64::from(low)
    }
}
