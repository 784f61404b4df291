// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Partition keys for group/user control messages.
//!
//! The transport uses the key to pick a shard, so the mapping must be stable
//! across processes and restarts: FNV-1a over the UTF-8 bytes of the name,
//! reduced to a single byte. No per-process seeding.

/// Key for a missing or empty name.
pub const NULL_PARTITION_KEY: u8 = 0;

const FNV1A_OFFSET_BASIS_32: u32 = 0x811c_9dc5;
const FNV1A_PRIME_32: u32 = 0x0100_0193;

/// Compute the partition key for a group name or user id.
pub fn partition_key(name: Option<&str>) -> u8 {
    match name {
        None | Some("") => NULL_PARTITION_KEY,
        Some(name) => (fnv1a_hash(name) % 256) as u8,
    }
}

fn fnv1a_hash(s: &str) -> u32 {
    let mut hash = FNV1A_OFFSET_BASIS_32;
    for byte in s.bytes() {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(FNV1A_PRIME_32);
    }
    hash
}
