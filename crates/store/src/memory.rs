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

//! In-memory [`LockStore`] implementation (for testing).
//!
//! ## Purpose
//! Provides a process-local backing instance with real expiry semantics so
//! coordinator behavior can be tested without Redis. Also carries two fault
//! switches used to simulate the partial-failure scenarios the quorum logic
//! exists for: an unavailability toggle and a fail-the-next-N-operations
//! budget.
//!
//! ## Limitations
//! - Not persistent (keys lost on drop)
//! - Not distributed (single process only)
//! - No background expiry sweep (expired keys are dropped on access)

use crate::{
    DeleteOutcome, KeyTtl, LockStore, SetOutcome, StoreError, StoreResult, UpdateOutcome,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(deadline) => Instant::now() >= deadline,
            None => false,
        }
    }
}

/// In-memory backing instance with fault injection.
#[derive(Clone, Default)]
pub struct MemoryLockStore {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    unavailable: Arc<AtomicBool>,
    fail_budget: Arc<AtomicUsize>,
}

impl MemoryLockStore {
    /// Create an empty in-memory backing instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the instance unreachable; every operation fails until cleared.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Fail the next `count` operations, then recover.
    pub fn fail_next(&self, count: usize) {
        self.fail_budget.store(count, Ordering::SeqCst);
    }

    /// Number of live (unexpired) keys currently stored.
    pub async fn len(&self) -> usize {
        let entries = self.entries.read().await;
        entries.values().filter(|e| !e.is_expired()).count()
    }

    /// True when no live keys are stored.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("instance marked offline".to_string()));
        }
        let failed = self
            .fail_budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |budget| {
                budget.checked_sub(1)
            })
            .is_ok();
        if failed {
            return Err(StoreError::Unavailable("injected failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl LockStore for MemoryLockStore {
    async fn set_if_absent(&self, key: &str, value: &str, ttl_ms: u64) -> StoreResult<SetOutcome> {
        self.check_available()?;
        let mut entries = self.entries.write().await;

        if let Some(existing) = entries.get(key) {
            if !existing.is_expired() {
                return Ok(SetOutcome::Held);
            }
        }

        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + Duration::from_millis(ttl_ms)),
            },
        );
        Ok(SetOutcome::Acquired)
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.check_available()?;
        let mut entries = self.entries.write().await;

        match entries.get(key) {
            Some(entry) if entry.is_expired() => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> StoreResult<DeleteOutcome> {
        self.check_available()?;
        let mut entries = self.entries.write().await;

        match entries.get(key) {
            Some(entry) if entry.is_expired() => {
                entries.remove(key);
                Ok(DeleteOutcome::Mismatch)
            }
            Some(entry) if entry.value == expected => {
                entries.remove(key);
                Ok(DeleteOutcome::Deleted)
            }
            _ => Ok(DeleteOutcome::Mismatch),
        }
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: &str,
        value: &str,
        ttl_ms: u64,
    ) -> StoreResult<UpdateOutcome> {
        self.check_available()?;
        let mut entries = self.entries.write().await;

        match entries.get(key) {
            Some(entry) if entry.is_expired() => {
                entries.remove(key);
                Ok(UpdateOutcome::Mismatch)
            }
            Some(entry) if entry.value == expected => {
                entries.insert(
                    key.to_string(),
                    Entry {
                        value: value.to_string(),
                        expires_at: Some(Instant::now() + Duration::from_millis(ttl_ms)),
                    },
                );
                Ok(UpdateOutcome::Updated)
            }
            _ => Ok(UpdateOutcome::Mismatch),
        }
    }

    async fn ttl_ms(&self, key: &str) -> StoreResult<KeyTtl> {
        self.check_available()?;
        let mut entries = self.entries.write().await;

        match entries.get(key) {
            Some(entry) if entry.is_expired() => {
                entries.remove(key);
                Ok(KeyTtl::Missing)
            }
            Some(entry) => match entry.expires_at {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    Ok(KeyTtl::Remaining(remaining.as_millis() as u64))
                }
                None => Ok(KeyTtl::NoExpiry),
            },
            None => Ok(KeyTtl::Missing),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_if_absent_then_held() {
        let store = MemoryLockStore::new();

        let first = store.set_if_absent("r", "token-a", 60_000).await.unwrap();
        assert_eq!(first, SetOutcome::Acquired);

        let second = store.set_if_absent("r", "token-b", 60_000).await.unwrap();
        assert_eq!(second, SetOutcome::Held);

        assert_eq!(store.get("r").await.unwrap(), Some("token-a".to_string()));
    }

    #[tokio::test]
    async fn test_expired_key_can_be_reacquired() {
        let store = MemoryLockStore::new();

        store.set_if_absent("r", "token-a", 20).await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;

        let outcome = store.set_if_absent("r", "token-b", 60_000).await.unwrap();
        assert_eq!(outcome, SetOutcome::Acquired);
        assert_eq!(store.get("r").await.unwrap(), Some("token-b".to_string()));
    }

    #[tokio::test]
    async fn test_compare_and_delete_requires_matching_token() {
        let store = MemoryLockStore::new();
        store.set_if_absent("r", "token-a", 60_000).await.unwrap();

        let wrong = store.compare_and_delete("r", "token-b").await.unwrap();
        assert_eq!(wrong, DeleteOutcome::Mismatch);
        assert_eq!(store.get("r").await.unwrap(), Some("token-a".to_string()));

        let right = store.compare_and_delete("r", "token-a").await.unwrap();
        assert_eq!(right, DeleteOutcome::Deleted);
        assert_eq!(store.get("r").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_compare_and_delete_missing_key() {
        let store = MemoryLockStore::new();

        let outcome = store.compare_and_delete("r", "token-a").await.unwrap();
        assert_eq!(outcome, DeleteOutcome::Mismatch);
    }

    #[tokio::test]
    async fn test_compare_and_set_resets_ttl() {
        let store = MemoryLockStore::new();
        store.set_if_absent("r", "token-a", 100).await.unwrap();

        let updated = store
            .compare_and_set("r", "token-a", "token-a", 60_000)
            .await
            .unwrap();
        assert_eq!(updated, UpdateOutcome::Updated);

        match store.ttl_ms("r").await.unwrap() {
            KeyTtl::Remaining(ms) => assert!(ms > 1_000),
            other => panic!("expected a residual ttl, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_compare_and_set_wrong_token_leaves_ttl() {
        let store = MemoryLockStore::new();
        store.set_if_absent("r", "token-a", 60_000).await.unwrap();

        let outcome = store
            .compare_and_set("r", "token-b", "token-b", 120_000)
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::Mismatch);

        match store.ttl_ms("r").await.unwrap() {
            KeyTtl::Remaining(ms) => assert!(ms <= 60_000),
            other => panic!("expected a residual ttl, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_ttl_of_missing_key() {
        let store = MemoryLockStore::new();
        assert_eq!(store.ttl_ms("r").await.unwrap(), KeyTtl::Missing);
    }

    #[tokio::test]
    async fn test_unavailable_instance_fails_every_operation() {
        let store = MemoryLockStore::new();
        store.set_unavailable(true);

        assert!(store.set_if_absent("r", "token-a", 1_000).await.is_err());
        assert!(store.get("r").await.is_err());
        assert!(store.ttl_ms("r").await.is_err());

        store.set_unavailable(false);
        assert!(store.set_if_absent("r", "token-a", 1_000).await.is_ok());
    }

    #[tokio::test]
    async fn test_fail_budget_recovers() {
        let store = MemoryLockStore::new();
        store.fail_next(2);

        assert!(store.get("r").await.is_err());
        assert!(store.get("r").await.is_err());
        assert!(store.get("r").await.is_ok());
    }
}
