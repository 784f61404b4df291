// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Acknowledgment correlation.
//!
//! An ack is created with a fresh id, travels to one or more endpoints inside
//! a control message, and comes back as one or more [`AckMessage`]s. The
//! [`AckHandler`] turns those completions into a single awaitable
//! [`AckWaiter`]:
//!
//! - **Single-shot**: resolved by the first trigger.
//! - **Multi-ack**: resolved once `expected` triggers arrived (one per endpoint).
//! - **Forced**: [`AckHandler::complete_ack`] resolves regardless of count.
//! - **Timeout**: a timer armed at creation removes the entry at its deadline,
//!   whether or not anyone awaits the waiter, so a late trigger can never
//!   resolve a reused id.
//!
//! # Concurrency
//!
//! Entries live in a sharded `DashMap`. The only transition to "resolved" is
//! removal of the entry under its shard lock; whoever removes it publishes the
//! outcome. Every other concurrent trigger finds no entry and does nothing.

use crate::protocol::{AckMessage, AckStatus};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Identifier carried by ackable messages. `0` means "no ack requested".
pub type AckId = i32;

/// Default time an ack may stay pending.
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(5);

/// How a pending ack ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// Resolved by triggers or forced completion; `false` means the remote
    /// side answered negatively (e.g. "not exist").
    Completed(bool),
    /// Deadline passed before resolution.
    TimedOut,
}

struct AckEntry {
    serial: u64,
    multi: bool,
    expected: i32,
    received: i32,
    deadline: Instant,
    tx: watch::Sender<Option<AckOutcome>>,
}

impl AckEntry {
    fn is_satisfied(&self) -> bool {
        self.received >= self.expected
    }

    fn resolve(self, outcome: AckOutcome) {
        // Receivers keep the last value after the sender is dropped
        self.tx.send_replace(Some(outcome));
    }
}

struct AckTable {
    pending: DashMap<AckId, AckEntry>,
    next_id: AtomicI32,
    next_serial: AtomicU64,
    timeout: Duration,
}

impl AckTable {
    /// Remove and resolve `id`, but only if it is still the entry `serial`
    /// refers to (ids wrap and get reused).
    fn expire(&self, id: AckId, serial: u64) {
        if let Some((_, entry)) = self.pending.remove_if(&id, |_, e| e.serial == serial) {
            debug!(ack_id = id, "ack timed out");
            entry.resolve(AckOutcome::TimedOut);
        }
    }
}

/// Tracks pending acks. Cheap to clone; clones share the same table.
#[derive(Clone)]
pub struct AckHandler {
    table: Arc<AckTable>,
}

impl Default for AckHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AckHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AckHandler")
            .field("pending", &self.table.pending.len())
            .field("timeout", &self.table.timeout)
            .finish()
    }
}

impl AckHandler {
    /// Create a handler with [`DEFAULT_ACK_TIMEOUT`].
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_ACK_TIMEOUT)
    }

    /// Create a handler with a custom ack timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            table: Arc::new(AckTable {
                pending: DashMap::new(),
                next_id: AtomicI32::new(0),
                next_serial: AtomicU64::new(0),
                timeout,
            }),
        }
    }

    /// Configured ack timeout.
    pub fn timeout(&self) -> Duration {
        self.table.timeout
    }

    /// Allocate a single-shot ack.
    pub fn create_ack(&self) -> (AckId, AckWaiter) {
        self.register(false)
    }

    /// Allocate a multi-ack. Call [`set_expected_count`](Self::set_expected_count)
    /// before any trigger can arrive; until then one trigger is expected.
    pub fn create_multi_ack(&self) -> (AckId, AckWaiter) {
        self.register(true)
    }

    fn register(&self, multi: bool) -> (AckId, AckWaiter) {
        let serial = self.table.next_serial.fetch_add(1, Ordering::Relaxed);
        let deadline = Instant::now() + self.table.timeout;
        let (tx, rx) = watch::channel(None);
        let mut entry = Some(AckEntry {
            serial,
            multi,
            expected: 1,
            received: 0,
            deadline,
            tx,
        });

        loop {
            // fetch_add wraps at i32::MAX; 0 is reserved on the wire
            let id = self.table.next_id.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
            if id == 0 {
                continue;
            }
            if let Entry::Vacant(slot) = self.table.pending.entry(id) {
                if let Some(entry) = entry.take() {
                    slot.insert(entry);
                }
                debug!(ack_id = id, multi, "ack created");
                self.arm_timer(id, serial, deadline);
                let waiter = AckWaiter {
                    id,
                    serial,
                    deadline,
                    rx,
                    table: Arc::clone(&self.table),
                };
                return (id, waiter);
            }
        }
    }

    /// Expire `id` at `deadline` even if nobody awaits its waiter. Outside a
    /// tokio runtime no timer runs and [`sweep_expired`](Self::sweep_expired)
    /// has to reclaim the entry.
    fn arm_timer(&self, id: AckId, serial: u64, deadline: Instant) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let table = Arc::downgrade(&self.table);
        runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if let Some(table) = table.upgrade() {
                table.expire(id, serial);
            }
        });
    }

    /// Set how many triggers a multi-ack needs. `n <= 0` resolves it
    /// successfully right away (nobody to wait for).
    pub fn set_expected_count(&self, id: AckId, n: i32) {
        let Entry::Occupied(mut slot) = self.table.pending.entry(id) else {
            return;
        };
        if !slot.get().multi {
            debug!(ack_id = id, "expected count ignored for single-shot ack");
            return;
        }
        if n <= 0 {
            slot.remove().resolve(AckOutcome::Completed(true));
            return;
        }
        let entry = slot.get_mut();
        entry.expected = n;
        if entry.is_satisfied() {
            slot.remove().resolve(AckOutcome::Completed(true));
        }
    }

    /// Record one response for `id`. Unknown ids are ignored.
    ///
    /// Returns `true` only for the call that satisfied the ack.
    pub fn trigger_ack(&self, id: AckId) -> bool {
        let Entry::Occupied(mut slot) = self.table.pending.entry(id) else {
            return false;
        };
        let entry = slot.get_mut();
        entry.received += 1;
        if !entry.is_satisfied() {
            return false;
        }
        let entry = slot.remove();
        debug!(ack_id = id, received = entry.received, "ack completed");
        entry.resolve(AckOutcome::Completed(true));
        true
    }

    /// Resolve `id` now, whatever the received count.
    pub fn complete_ack(&self, id: AckId, success: bool) {
        if let Some((_, entry)) = self.table.pending.remove(&id) {
            debug!(ack_id = id, success, "ack force-completed");
            entry.resolve(AckOutcome::Completed(success));
        }
    }

    /// Drop `id` without resolving it; its waiter fails with `AckDiscarded`.
    pub fn discard_ack(&self, id: AckId) {
        self.table.pending.remove(&id);
    }

    /// Route an inbound [`AckMessage`].
    pub fn handle_ack_message(&self, message: &AckMessage) {
        match message.status {
            AckStatus::Ok => {
                self.trigger_ack(message.ack_id);
            }
            AckStatus::NotExist => self.complete_ack(message.ack_id, false),
            AckStatus::Timeout => {
                if let Some((_, entry)) = self.table.pending.remove(&message.ack_id) {
                    debug!(ack_id = message.ack_id, "service reported ack timeout");
                    entry.resolve(AckOutcome::TimedOut);
                }
            }
        }
    }

    /// Resolve every entry whose deadline has passed. Only needed for acks
    /// created outside a tokio runtime, which get no expiry timer.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<(AckId, u64)> = self
            .table
            .pending
            .iter()
            .filter(|e| e.deadline <= now)
            .map(|e| (*e.key(), e.serial))
            .collect();

        let count = expired.len();
        for (id, serial) in expired {
            self.table.expire(id, serial);
        }
        if count > 0 {
            warn!(count, "swept expired acks");
        }
        count
    }

    /// Number of acks still pending.
    pub fn pending_count(&self) -> usize {
        self.table.pending.len()
    }
}

/// Awaitable side of an ack.
///
/// Clones observe the same outcome.
#[derive(Clone)]
pub struct AckWaiter {
    id: AckId,
    serial: u64,
    deadline: Instant,
    rx: watch::Receiver<Option<AckOutcome>>,
    table: Arc<AckTable>,
}

impl AckWaiter {
    /// Ack id this waiter tracks.
    pub fn id(&self) -> AckId {
        self.id
    }

    /// Outcome if already resolved.
    pub fn outcome(&self) -> Option<AckOutcome> {
        *self.rx.borrow()
    }

    /// True once resolved with `Completed(true)`.
    pub fn is_completed_successfully(&self) -> bool {
        self.outcome() == Some(AckOutcome::Completed(true))
    }

    /// Wait for resolution or the deadline.
    ///
    /// Returns the remote verdict (`true` for ok, `false` for "not exist").
    pub async fn wait(mut self) -> crate::Result<bool> {
        let timed_out = tokio::time::timeout_at(self.deadline, self.rx.wait_for(Option::is_some))
            .await
            .is_err();
        if timed_out {
            self.table.expire(self.id, self.serial);
        }

        let outcome = *self.rx.borrow();
        match outcome {
            Some(AckOutcome::Completed(ok)) => Ok(ok),
            Some(AckOutcome::TimedOut) => Err(crate::BackplaneError::Timeout { ack_id: self.id }),
            None => Err(crate::BackplaneError::AckDiscarded { ack_id: self.id }),
        }
    }
}

impl std::fmt::Debug for AckWaiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AckWaiter")
            .field("id", &self.id)
            .field("outcome", &self.outcome())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;

    #[tokio::test]
    async fn single_ack_resolves_on_trigger() {
        let handler = AckHandler::new();
        let (id, waiter) = handler.create_ack();
        assert_ne!(id, 0);
        assert_eq!(handler.pending_count(), 1);

        handler.trigger_ack(id);
        assert_eq!(handler.pending_count(), 0);
        assert!(waiter.wait().await.unwrap());
    }

    #[test]
    fn ids_are_unique_while_pending() {
        let handler = AckHandler::new();
        let (a, _wa) = handler.create_ack();
        let (b, _wb) = handler.create_ack();
        assert_ne!(a, b);
    }

    #[test]
    fn id_allocation_skips_zero_and_pending() {
        let handler = AckHandler::new();
        handler.table.next_id.store(i32::MAX - 1, Ordering::Relaxed);
        let (a, _wa) = handler.create_ack();
        assert_eq!(a, i32::MAX);
        let (b, _wb) = handler.create_ack();
        assert_eq!(b, i32::MIN);

        // Force the counter back onto a live id
        handler.table.next_id.store(i32::MAX - 1, Ordering::Relaxed);
        let (c, _wc) = handler.create_ack();
        assert_ne!(c, a);
        assert_ne!(c, b);
        assert_ne!(c, 0);
    }

    #[test]
    fn unknown_trigger_is_noop() {
        let handler = AckHandler::new();
        handler.trigger_ack(42);
        handler.complete_ack(42, true);
        handler.set_expected_count(42, 3);
        assert_eq!(handler.pending_count(), 0);
    }

    #[tokio::test]
    async fn multi_ack_waits_for_expected_count() {
        let handler = AckHandler::new();
        let (id, waiter) = handler.create_multi_ack();
        handler.set_expected_count(id, 3);

        handler.trigger_ack(id);
        handler.trigger_ack(id);
        assert_eq!(waiter.outcome(), None);

        handler.trigger_ack(id);
        assert!(waiter.is_completed_successfully());
        assert!(waiter.wait().await.unwrap());
    }

    #[tokio::test]
    async fn multi_ack_with_no_endpoints_resolves_immediately() {
        let handler = AckHandler::new();
        let (id, waiter) = handler.create_multi_ack();
        handler.set_expected_count(id, 0);
        assert!(waiter.is_completed_successfully());
        assert_eq!(handler.pending_count(), 0);
    }

    #[test]
    fn expected_count_ignored_for_single_shot() {
        let handler = AckHandler::new();
        let (id, waiter) = handler.create_ack();
        handler.set_expected_count(id, 0);
        assert_eq!(waiter.outcome(), None);
        handler.trigger_ack(id);
        assert!(waiter.is_completed_successfully());
    }

    #[tokio::test]
    async fn forced_completion_ignores_count() {
        let handler = AckHandler::new();
        let (id, waiter) = handler.create_multi_ack();
        handler.set_expected_count(id, 5);
        handler.trigger_ack(id);
        handler.complete_ack(id, false);

        assert!(!waiter.wait().await.unwrap());
        // Late triggers do nothing
        handler.trigger_ack(id);
        assert_eq!(handler.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_removes_entry() {
        let handler = AckHandler::with_timeout(Duration::from_millis(100));
        let (id, waiter) = handler.create_ack();

        let err = waiter.wait().await.unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(handler.pending_count(), 0);

        // Late trigger on the expired id is a no-op
        handler.trigger_ack(id);
        assert_eq!(handler.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_waiter_still_expires() {
        let handler = AckHandler::with_timeout(Duration::from_millis(50));
        let (_, waiter) = handler.create_ack();
        let (_, kept) = handler.create_multi_ack();
        drop(waiter);
        assert_eq!(handler.pending_count(), 2);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(handler.pending_count(), 0);
        assert_eq!(kept.outcome(), Some(AckOutcome::TimedOut));
    }

    #[test]
    fn sweep_reclaims_acks_created_outside_runtime() {
        let handler = AckHandler::with_timeout(Duration::from_millis(20));
        let (_, waiter) = handler.create_ack();
        let (_, _dropped) = handler.create_ack();
        assert_eq!(handler.sweep_expired(), 0);

        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(handler.sweep_expired(), 2);
        assert_eq!(handler.pending_count(), 0);
        assert_eq!(waiter.outcome(), Some(AckOutcome::TimedOut));
    }

    #[tokio::test]
    async fn discarded_ack_fails_waiter() {
        let handler = AckHandler::new();
        let (id, waiter) = handler.create_ack();
        handler.discard_ack(id);
        assert!(matches!(
            waiter.wait().await,
            Err(crate::BackplaneError::AckDiscarded { .. })
        ));
    }

    #[tokio::test]
    async fn ack_message_statuses() {
        let handler = AckHandler::new();

        let (ok_id, ok) = handler.create_ack();
        let (missing_id, missing) = handler.create_ack();
        let (late_id, late) = handler.create_ack();

        handler.handle_ack_message(&AckMessage::new(ok_id, AckStatus::Ok));
        handler.handle_ack_message(&AckMessage::new(missing_id, AckStatus::NotExist));
        handler.handle_ack_message(&AckMessage::new(late_id, AckStatus::Timeout));

        assert!(ok.wait().await.unwrap());
        assert!(!missing.wait().await.unwrap());
        assert!(late.wait().await.unwrap_err().is_timeout());
    }

    #[test]
    fn concurrent_triggers_resolve_exactly_once() {
        const SOURCES: usize = 16;

        for _ in 0..50 {
            let handler = AckHandler::new();
            let (id, waiter) = handler.create_multi_ack();
            handler.set_expected_count(id, SOURCES as i32);

            let run = |count: usize| {
                let barrier = Arc::new(Barrier::new(count));
                let threads: Vec<_> = (0..count)
                    .map(|_| {
                        let handler = handler.clone();
                        let barrier = Arc::clone(&barrier);
                        std::thread::spawn(move || {
                            barrier.wait();
                            handler.trigger_ack(id)
                        })
                    })
                    .collect();
                threads
                    .into_iter()
                    .map(|t| t.join().unwrap())
                    .filter(|satisfied| *satisfied)
                    .count()
            };

            assert_eq!(run(SOURCES - 1), 0);
            assert_eq!(waiter.outcome(), None, "resolved before every source answered");
            assert_eq!(handler.pending_count(), 1);

            // The last source races with duplicates; only one may resolve
            assert_eq!(run(4), 1);
            assert!(waiter.is_completed_successfully());
            assert_eq!(handler.pending_count(), 0);
        }
    }
}
