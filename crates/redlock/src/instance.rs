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

//! Per-instance lock primitives.
//!
//! Each function runs against exactly one backing instance and collapses
//! the store's typed outcome to a vote: `true`/`Some` counts toward quorum,
//! anything else — mismatch, held key, transport error — counts against it.
//! Errors are absorbed here deliberately; an unreachable instance is just a
//! missing vote, and the coordinator decides what a missing vote means.

use lockd_store::{DeleteOutcome, KeyTtl, LockStore, SetOutcome, UpdateOutcome};
use tracing::debug;

/// Lock state observed on one backing instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockRecord {
    /// Resource the record belongs to.
    pub resource: String,
    /// Token stored on the instance.
    pub lock_id: String,
    /// Residual lifetime reported by the same instance, in milliseconds.
    pub remaining_ttl_ms: u64,
}

/// Try to store `lock_id` under `resource` on one instance.
///
/// True iff the key was absent and is now set with the requested expiry.
pub async fn try_acquire(store: &dyn LockStore, resource: &str, lock_id: &str, ttl_ms: u64) -> bool {
    match store.set_if_absent(resource, lock_id, ttl_ms).await {
        Ok(SetOutcome::Acquired) => true,
        Ok(SetOutcome::Held) => false,
        Err(err) => {
            debug!(resource, error = %err, "acquire vote lost to store error");
            false
        }
    }
}

/// Try to re-extend the expiry of `resource` on one instance.
///
/// True iff the instance still stored `lock_id` and reset its expiry.
pub async fn try_extend(store: &dyn LockStore, resource: &str, lock_id: &str, ttl_ms: u64) -> bool {
    match store.compare_and_set(resource, lock_id, lock_id, ttl_ms).await {
        Ok(UpdateOutcome::Updated) => true,
        Ok(UpdateOutcome::Mismatch) => false,
        Err(err) => {
            debug!(resource, error = %err, "refresh vote lost to store error");
            false
        }
    }
}

/// Try to delete `resource` on one instance, guarded by `lock_id`.
///
/// True iff the instance stored exactly `lock_id` and removed the key.
pub async fn try_release(store: &dyn LockStore, resource: &str, lock_id: &str) -> bool {
    match store.compare_and_delete(resource, lock_id).await {
        Ok(DeleteOutcome::Deleted) => true,
        Ok(DeleteOutcome::Mismatch) => false,
        Err(err) => {
            debug!(resource, error = %err, "release vote lost to store error");
            false
        }
    }
}

/// Read the lock state of `resource` from one instance.
///
/// Some iff the key exists with a value; the residual TTL is taken from the
/// same instance. A key that expires between the two reads yields `None`.
pub async fn probe(store: &dyn LockStore, resource: &str) -> Option<LockRecord> {
    let lock_id = match store.get(resource).await {
        Ok(Some(value)) => value,
        Ok(None) => return None,
        Err(err) => {
            debug!(resource, error = %err, "probe lost to store error");
            return None;
        }
    };

    match store.ttl_ms(resource).await {
        Ok(KeyTtl::Remaining(ms)) => Some(LockRecord {
            resource: resource.to_string(),
            lock_id,
            remaining_ttl_ms: ms,
        }),
        // A key without expiry was not written by this coordinator; report
        // it with a zero residual rather than inventing a lifetime.
        Ok(KeyTtl::NoExpiry) => Some(LockRecord {
            resource: resource.to_string(),
            lock_id,
            remaining_ttl_ms: 0,
        }),
        Ok(KeyTtl::Missing) => None,
        Err(err) => {
            debug!(resource, error = %err, "probe lost to store error");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockd_store::MemoryLockStore;

    #[tokio::test]
    async fn test_try_acquire_votes_true_once() {
        let store = MemoryLockStore::new();

        assert!(try_acquire(&store, "r", "token-a", 60_000).await);
        assert!(!try_acquire(&store, "r", "token-b", 60_000).await);
    }

    #[tokio::test]
    async fn test_try_acquire_absorbs_store_errors() {
        let store = MemoryLockStore::new();
        store.set_unavailable(true);

        assert!(!try_acquire(&store, "r", "token-a", 60_000).await);
    }

    #[tokio::test]
    async fn test_try_extend_requires_ownership() {
        let store = MemoryLockStore::new();
        store.set_if_absent("r", "token-a", 60_000).await.unwrap();

        assert!(try_extend(&store, "r", "token-a", 60_000).await);
        assert!(!try_extend(&store, "r", "token-b", 60_000).await);
    }

    #[tokio::test]
    async fn test_try_release_requires_ownership() {
        let store = MemoryLockStore::new();
        store.set_if_absent("r", "token-a", 60_000).await.unwrap();

        assert!(!try_release(&store, "r", "token-b").await);
        assert!(try_release(&store, "r", "token-a").await);
        assert!(!try_release(&store, "r", "token-a").await);
    }

    #[tokio::test]
    async fn test_probe_reports_stored_token_and_ttl() {
        let store = MemoryLockStore::new();
        store.set_if_absent("r", "token-a", 60_000).await.unwrap();

        let record = probe(&store, "r").await.unwrap();
        assert_eq!(record.resource, "r");
        assert_eq!(record.lock_id, "token-a");
        assert!(record.remaining_ttl_ms <= 60_000);
        assert!(record.remaining_ttl_ms > 0);
    }

    #[tokio::test]
    async fn test_probe_empty_and_unreachable() {
        let store = MemoryLockStore::new();
        assert!(probe(&store, "r").await.is_none());

        store.set_unavailable(true);
        assert!(probe(&store, "r").await.is_none());
    }
}
