// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (C) 2025 Shahzad A. Bhatti <bhatti@plexobject.com>
//
// This file is part of Lockd.
//
// Lockd is free software: you can redistribute it and/or modify
// it under the terms of the GNU Lesser General Public License as published by
// the Free Software Foundation, either version 2.1 of the License, or
// (at your option) any later version.
//
// Lockd is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public License
// along with Lockd. If not, see <https://www.gnu.org/licenses/>.

//! # Lockd Backing Stores
//!
//! ## Purpose
//! Defines the [`LockStore`] capability that the quorum coordinator requires
//! from a single backing key-value instance, plus the available backends.
//! Each instance is fully independent; the coordinator derives its safety
//! from a majority of them, never from coordination between them.
//!
//! ## Capability Surface
//! The coordinator only ever needs five operations, all atomic on the
//! instance:
//! - set-if-absent with a millisecond expiry (`SET k v NX PX`)
//! - plain conditional read (`GET`)
//! - compare-and-delete (scripted `GET`/`DEL`)
//! - compare-and-set that resets the expiry (scripted `GET`/`SET PX`)
//! - residual-lifetime query (`PTTL`)
//!
//! Unconditional writes or deletes are deliberately absent from the trait:
//! releasing or refreshing without comparing the stored token can clobber a
//! lock acquired by a later holder.
//!
//! ## Backend Support
//! - **Redis**: production backend, one instance per configured URI
//! - **InMemory**: process-local backend for tests and single-node use
//!
//! ## Examples
//! ```rust,no_run
//! use lockd_store::{LockStore, RedisLockStore, SetOutcome};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = RedisLockStore::new("redis://127.0.0.1:6379").await?;
//! match store.set_if_absent("orders:refund", "caller-token", 5_000).await? {
//!     SetOutcome::Acquired => println!("locked"),
//!     SetOutcome::Held => println!("someone else holds it"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod memory;
pub mod redis;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryLockStore;
pub use redis::RedisLockStore;

use async_trait::async_trait;

/// Outcome of an atomic set-if-absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    /// The key was absent and is now set with the requested expiry.
    Acquired,
    /// The key already held a value; nothing was written.
    Held,
}

/// Outcome of a compare-and-delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The stored value matched and the key was removed.
    Deleted,
    /// The key was absent or held a different value; nothing was removed.
    Mismatch,
}

/// Outcome of a compare-and-set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The stored value matched; the value was rewritten with a fresh expiry.
    Updated,
    /// The key was absent or held a different value; nothing changed.
    Mismatch,
}

/// Residual lifetime reported by a backing instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// Key exists and expires in the contained number of milliseconds.
    Remaining(u64),
    /// Key does not exist.
    Missing,
    /// Key exists but carries no expiry.
    NoExpiry,
}

/// Capability required from one independent backing instance.
///
/// ## Purpose
/// Abstracts the concrete client library away from the coordinator so that
/// production can inject Redis while tests inject [`MemoryLockStore`].
///
/// ## Atomicity Contract
/// Every operation must be atomic on the instance. In particular
/// `compare_and_delete` and `compare_and_set` must observe and mutate the
/// key in one step; a read-then-write from the client side would race with
/// other holders.
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Store `value` under `key` with a `ttl_ms` expiry, only if `key` is
    /// currently absent.
    async fn set_if_absent(&self, key: &str, value: &str, ttl_ms: u64) -> StoreResult<SetOutcome>;

    /// Read the value currently stored under `key`, if any.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Delete `key` only if its stored value equals `expected`.
    async fn compare_and_delete(&self, key: &str, expected: &str) -> StoreResult<DeleteOutcome>;

    /// Rewrite `key` with `value` and a fresh `ttl_ms` expiry, only if its
    /// stored value equals `expected`.
    async fn compare_and_set(
        &self,
        key: &str,
        expected: &str,
        value: &str,
        ttl_ms: u64,
    ) -> StoreResult<UpdateOutcome>;

    /// Residual lifetime of `key` in milliseconds.
    async fn ttl_ms(&self, key: &str) -> StoreResult<KeyTtl>;
}
