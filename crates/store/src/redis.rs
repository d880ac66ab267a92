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

//! Redis-backed [`LockStore`] implementation.
//!
//! ## Purpose
//! One `RedisLockStore` wraps one independent Redis instance. The quorum
//! coordinator owns several of these, one per configured URI; they never
//! talk to each other.
//!
//! ## Design Decisions
//! - **Why ConnectionManager**: automatic reconnection and cheap clones per
//!   operation, so concurrent fan-outs never serialize on a connection
//! - **Why `SET NX PX`**: the native set-if-absent-with-expiry primitive is
//!   the only safe acquisition path; `EXISTS` followed by `SET` would race
//! - **Why Lua for release/refresh**: compare-and-delete and
//!   compare-and-set must observe the stored token and mutate the key in
//!   one atomic step on the instance

use crate::{
    DeleteOutcome, KeyTtl, LockStore, SetOutcome, StoreError, StoreResult, UpdateOutcome,
};
use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client, Script};

/// Delete the key only when it still stores the caller's token.
const COMPARE_AND_DELETE: &str = r#"
if redis.call('get', KEYS[1]) == ARGV[1] then
    return redis.call('del', KEYS[1])
end
return 0
"#;

/// Rewrite the key with a fresh expiry only when it still stores the
/// caller's token.
const COMPARE_AND_SET: &str = r#"
if redis.call('get', KEYS[1]) == ARGV[1] then
    redis.call('set', KEYS[1], ARGV[2], 'PX', ARGV[3])
    return 1
end
return 0
"#;

/// One independent Redis backing instance.
pub struct RedisLockStore {
    /// Redis connection manager (async, reconnecting)
    manager: ConnectionManager,
    /// Scripted compare-and-delete, loaded by hash on first use
    compare_and_delete: Script,
    /// Scripted compare-and-set, loaded by hash on first use
    compare_and_set: Script,
}

impl RedisLockStore {
    /// Connect to a single Redis instance.
    ///
    /// ## Arguments
    /// * `url` - Redis connection URL (e.g. "redis://127.0.0.1:6379")
    ///
    /// ## Errors
    /// [`StoreError::ConnectionFailed`] if the URL is malformed or the
    /// initial connection cannot be established.
    pub async fn new(url: &str) -> StoreResult<Self> {
        let client = Client::open(url)
            .map_err(|e| StoreError::ConnectionFailed(format!("invalid redis url: {}", e)))?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| StoreError::ConnectionFailed(format!("failed to connect redis: {}", e)))?;

        Ok(Self {
            manager,
            compare_and_delete: Script::new(COMPARE_AND_DELETE),
            compare_and_set: Script::new(COMPARE_AND_SET),
        })
    }
}

#[async_trait]
impl LockStore for RedisLockStore {
    async fn set_if_absent(&self, key: &str, value: &str, ttl_ms: u64) -> StoreResult<SetOutcome> {
        let mut conn = self.manager.clone();

        // SET NX PX replies "OK" on success and nil when the key is held.
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::BackendError(format!("Redis SET NX PX failed: {}", e)))?;

        Ok(match reply {
            Some(_) => SetOutcome::Acquired,
            None => SetOutcome::Held,
        })
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.manager.clone();

        conn.get(key)
            .await
            .map_err(|e| StoreError::BackendError(format!("Redis GET failed: {}", e)))
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> StoreResult<DeleteOutcome> {
        let mut conn = self.manager.clone();

        let deleted: i64 = self
            .compare_and_delete
            .key(key)
            .arg(expected)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| StoreError::BackendError(format!("Redis compare-and-delete failed: {}", e)))?;

        Ok(if deleted == 1 {
            DeleteOutcome::Deleted
        } else {
            DeleteOutcome::Mismatch
        })
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: &str,
        value: &str,
        ttl_ms: u64,
    ) -> StoreResult<UpdateOutcome> {
        let mut conn = self.manager.clone();

        let updated: i64 = self
            .compare_and_set
            .key(key)
            .arg(expected)
            .arg(value)
            .arg(ttl_ms)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| StoreError::BackendError(format!("Redis compare-and-set failed: {}", e)))?;

        Ok(if updated == 1 {
            UpdateOutcome::Updated
        } else {
            UpdateOutcome::Mismatch
        })
    }

    async fn ttl_ms(&self, key: &str) -> StoreResult<KeyTtl> {
        let mut conn = self.manager.clone();

        let pttl: i64 = redis::cmd("PTTL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::BackendError(format!("Redis PTTL failed: {}", e)))?;

        Ok(match pttl {
            -2 => KeyTtl::Missing,
            -1 => KeyTtl::NoExpiry,
            ms if ms >= 0 => KeyTtl::Remaining(ms as u64),
            _ => KeyTtl::Missing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Helper to create a test store (requires a running Redis instance)
    async fn create_test_store() -> RedisLockStore {
        RedisLockStore::new("redis://127.0.0.1:6379")
            .await
            .expect("Failed to connect to Redis (ensure Redis is running)")
    }

    #[tokio::test]
    #[ignore] // Requires running Redis instance
    async fn test_set_if_absent_then_held() {
        let store = create_test_store().await;

        let first = store
            .set_if_absent("lockd:test:acquire", "token-a", 60_000)
            .await
            .unwrap();
        assert_eq!(first, SetOutcome::Acquired);

        let second = store
            .set_if_absent("lockd:test:acquire", "token-b", 60_000)
            .await
            .unwrap();
        assert_eq!(second, SetOutcome::Held);

        // Cleanup
        store
            .compare_and_delete("lockd:test:acquire", "token-a")
            .await
            .unwrap();
    }

    #[tokio::test]
    #[ignore]
    async fn test_compare_and_delete_mismatch() {
        let store = create_test_store().await;

        store
            .set_if_absent("lockd:test:release", "token-a", 60_000)
            .await
            .unwrap();

        let wrong = store
            .compare_and_delete("lockd:test:release", "token-b")
            .await
            .unwrap();
        assert_eq!(wrong, DeleteOutcome::Mismatch);

        let right = store
            .compare_and_delete("lockd:test:release", "token-a")
            .await
            .unwrap();
        assert_eq!(right, DeleteOutcome::Deleted);
    }

    #[tokio::test]
    #[ignore]
    async fn test_compare_and_set_resets_ttl() {
        let store = create_test_store().await;

        store
            .set_if_absent("lockd:test:refresh", "token-a", 1_000)
            .await
            .unwrap();

        let updated = store
            .compare_and_set("lockd:test:refresh", "token-a", "token-a", 60_000)
            .await
            .unwrap();
        assert_eq!(updated, UpdateOutcome::Updated);

        match store.ttl_ms("lockd:test:refresh").await.unwrap() {
            KeyTtl::Remaining(ms) => assert!(ms > 1_000),
            other => panic!("expected a residual ttl, got {:?}", other),
        }

        // Cleanup
        store
            .compare_and_delete("lockd:test:refresh", "token-a")
            .await
            .unwrap();
    }
}
