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

//! Quorum coordinator.
//!
//! ## Purpose
//! Drives the four lock operations across every configured backing
//! instance: concurrent fan-out, fan-in over a channel bounded to the
//! instance count, quorum tally, validity accounting against a monotonic
//! clock, and jittered retries.
//!
//! ## Time Accounting
//! A successful acquire/refresh returns the validity
//! `V = ttl − elapsed − (⌊ttl·drift_factor⌋ + 2)` where `elapsed` is the
//! wall time between fan-out start and the arrival of the last vote. The
//! tally therefore always waits for all instances: returning at quorum
//! would charge `V` against the fastest majority while the lock's true
//! lifetime is bounded by the slowest instance, and the losing minority
//! may still need cleanup.

use crate::config::RedlockConfig;
use crate::error::{RedlockError, RedlockResult};
use crate::instance::{self, LockRecord};
use lockd_store::LockStore;
use rand::Rng;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tracing::debug;

/// Bound on a single store call for operations that carry no TTL to derive
/// one from (release, inspect, cleanup).
const CALL_TIMEOUT: Duration = Duration::from_millis(1_000);

/// Which conditional write an attempt fans out.
#[derive(Debug, Clone, Copy)]
enum WriteOp {
    Acquire,
    Extend,
}

/// Quorum-based lock coordinator over independent backing instances.
///
/// Stateless across requests: configuration and the instance set are fixed
/// after construction, and all lock state lives in the instances under the
/// resource key. Safe to share behind an `Arc` between concurrent callers.
pub struct Redlock {
    config: RedlockConfig,
    stores: Vec<Arc<dyn LockStore>>,
    quorum: usize,
}

impl Redlock {
    /// Create a coordinator with no backing instances yet.
    pub fn new(config: RedlockConfig) -> RedlockResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            stores: Vec::new(),
            quorum: 1,
        })
    }

    /// Add one backing instance and recompute the quorum threshold.
    pub fn add_store(&mut self, store: Arc<dyn LockStore>) {
        self.stores.push(store);
        self.quorum = self.stores.len() / 2 + 1;
    }

    /// Number of configured backing instances.
    pub fn store_count(&self) -> usize {
        self.stores.len()
    }

    /// Strict majority threshold for the current instance set.
    pub fn quorum(&self) -> usize {
        self.quorum
    }

    /// Acquire `resource` for `lock_id` with a `ttl_ms` lifetime.
    ///
    /// ## Returns
    /// The validity in milliseconds: the portion of the TTL still usable
    /// after elapsed time and the clock-drift budget.
    ///
    /// ## Errors
    /// [`RedlockError::AcquireFailed`] when no attempt reached a quorum
    /// with positive validity. Partial acquisitions of failed attempts are
    /// released before each retry and before the error is returned.
    pub async fn acquire(&self, resource: &str, lock_id: &str, ttl_ms: u64) -> RedlockResult<u64> {
        self.contend(resource, lock_id, ttl_ms, WriteOp::Acquire)
            .await
            .ok_or_else(|| RedlockError::AcquireFailed {
                resource: resource.to_string(),
                lock_id: lock_id.to_string(),
            })
    }

    /// Reset the lifetime of a lock currently held by `lock_id`.
    ///
    /// Unlike acquire this requires the token to already be stored on a
    /// quorum of instances; the conditional write never succeeds elsewhere.
    /// Failed attempts are not cleaned up: the token stays on whatever
    /// instances still hold it, bounded by their previous expiry.
    pub async fn refresh(&self, resource: &str, lock_id: &str, ttl_ms: u64) -> RedlockResult<u64> {
        self.contend(resource, lock_id, ttl_ms, WriteOp::Extend)
            .await
            .ok_or_else(|| RedlockError::RefreshFailed {
                resource: resource.to_string(),
                lock_id: lock_id.to_string(),
            })
    }

    /// Release `resource` if it is held by `lock_id`.
    ///
    /// Single shot, no retries: instances that already dropped the key stay
    /// dropped, so either the holder reaches quorum on the first pass or no
    /// consistent lock existed to begin with.
    pub async fn release(&self, resource: &str, lock_id: &str) -> RedlockResult<()> {
        let successes = self.release_votes(resource, lock_id).await;
        debug!(resource, successes, quorum = self.quorum, "release tallied");

        if successes >= self.quorum {
            Ok(())
        } else {
            Err(RedlockError::ReleaseFailed {
                resource: resource.to_string(),
                lock_id: lock_id.to_string(),
            })
        }
    }

    /// Report the lock state of `resource` as observed on any instance.
    ///
    /// Best-effort diagnostic, not a consensus read: at most one token can
    /// hold a quorum at an instant, so the first record any instance
    /// reports is informative.
    pub async fn inspect(&self, resource: &str) -> RedlockResult<LockRecord> {
        for attempt in 1..=self.config.retry_count {
            let records = self
                .fan_out(|store| {
                    let resource = resource.to_string();
                    async move {
                        timeout(CALL_TIMEOUT, instance::probe(store.as_ref(), &resource))
                            .await
                            .unwrap_or(None)
                    }
                })
                .await;

            if let Some(record) = records.into_iter().flatten().next() {
                return Ok(record);
            }

            if attempt < self.config.retry_count {
                self.backoff().await;
            }
        }

        Err(RedlockError::InspectFailed {
            resource: resource.to_string(),
        })
    }

    /// Attempt loop shared by acquire and refresh.
    async fn contend(
        &self,
        resource: &str,
        lock_id: &str,
        ttl_ms: u64,
        op: WriteOp,
    ) -> Option<u64> {
        // A store call slower than half the requested lifetime cannot
        // contribute to a useful validity.
        let call_bound = Duration::from_millis((ttl_ms / 2).max(1));

        for attempt in 1..=self.config.retry_count {
            let start = Instant::now();
            let votes = self
                .fan_out(|store| {
                    let resource = resource.to_string();
                    let lock_id = lock_id.to_string();
                    async move {
                        let call = async {
                            match op {
                                WriteOp::Acquire => {
                                    instance::try_acquire(store.as_ref(), &resource, &lock_id, ttl_ms)
                                        .await
                                }
                                WriteOp::Extend => {
                                    instance::try_extend(store.as_ref(), &resource, &lock_id, ttl_ms)
                                        .await
                                }
                            }
                        };
                        timeout(call_bound, call).await.unwrap_or(false)
                    }
                })
                .await;

            let successes = votes.into_iter().filter(|vote| *vote).count();
            let elapsed = start.elapsed().as_millis() as u64;
            let drift = self.config.drift_ms(ttl_ms);
            let validity = ttl_ms as i64 - elapsed as i64 - drift as i64;

            if successes >= self.quorum && validity > 0 {
                debug!(resource, attempt, successes, validity, ?op, "quorum reached");
                return Some(validity as u64);
            }

            debug!(resource, attempt, successes, validity, ?op, "attempt failed");

            // A failed acquire may have written the token to a minority of
            // instances; clear them so later contenders do not have to wait
            // out the full TTL. A failed refresh gets no cleanup: the
            // conditional write cannot create minority state, and deleting
            // the token here would destroy the holder's still-valid lock on
            // the instances that survived a transient fault.
            if matches!(op, WriteOp::Acquire) {
                self.release_votes(resource, lock_id).await;
            }

            if attempt < self.config.retry_count {
                self.backoff().await;
            }
        }

        None
    }

    /// Fan out compare-and-delete to every instance; count the deletions.
    async fn release_votes(&self, resource: &str, lock_id: &str) -> usize {
        let votes = self
            .fan_out(|store| {
                let resource = resource.to_string();
                let lock_id = lock_id.to_string();
                async move {
                    timeout(
                        CALL_TIMEOUT,
                        instance::try_release(store.as_ref(), &resource, &lock_id),
                    )
                    .await
                    .unwrap_or(false)
                }
            })
            .await;

        votes.into_iter().filter(|vote| *vote).count()
    }

    /// Run one operation per instance concurrently and collect exactly one
    /// outcome per instance.
    ///
    /// The channel is bounded to the instance count and each task sends
    /// exactly once, so the fan-in drains without head-of-line blocking.
    /// Dropped callers abandon the receiving side; whatever the detached
    /// tasks still write to their instances ages out via the key TTL.
    async fn fan_out<T, F, Fut>(&self, op: F) -> Vec<T>
    where
        T: Send + 'static,
        F: Fn(Arc<dyn LockStore>) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        if self.stores.is_empty() {
            return Vec::new();
        }

        let (tx, mut rx) = mpsc::channel::<T>(self.stores.len());
        for store in &self.stores {
            let tx = tx.clone();
            let fut = op(Arc::clone(store));
            tokio::spawn(async move {
                let _ = tx.send(fut.await).await;
            });
        }
        drop(tx);

        let mut outcomes = Vec::with_capacity(self.stores.len());
        while let Some(outcome) = rx.recv().await {
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Sleep a uniform random duration below the configured retry delay.
    async fn backoff(&self) {
        let delay_ms = {
            let mut rng = rand::thread_rng();
            rng.gen_range(0..self.config.retry_delay_ms)
        };
        sleep(Duration::from_millis(delay_ms)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockd_store::MemoryLockStore;

    fn coordinator_with(n: usize) -> Redlock {
        let mut redlock = Redlock::new(RedlockConfig::default()).unwrap();
        for _ in 0..n {
            redlock.add_store(Arc::new(MemoryLockStore::new()));
        }
        redlock
    }

    #[test]
    fn test_quorum_is_strict_majority() {
        assert_eq!(coordinator_with(1).quorum(), 1);
        assert_eq!(coordinator_with(2).quorum(), 2);
        assert_eq!(coordinator_with(3).quorum(), 2);
        assert_eq!(coordinator_with(4).quorum(), 3);
        assert_eq!(coordinator_with(5).quorum(), 3);
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let config = RedlockConfig {
            retry_count: 0,
            ..Default::default()
        };
        assert!(matches!(
            Redlock::new(config),
            Err(RedlockError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_acquire_without_stores_fails() {
        let redlock = Redlock::new(RedlockConfig {
            retry_count: 1,
            ..Default::default()
        })
        .unwrap();

        let result = redlock.acquire("r", "token", 1_000).await;
        assert!(matches!(result, Err(RedlockError::AcquireFailed { .. })));
    }

    #[tokio::test]
    async fn test_single_instance_round_trip() {
        let redlock = coordinator_with(1);

        let validity = redlock.acquire("r", "token", 5_000).await.unwrap();
        assert!(validity > 0);

        redlock.release("r", "token").await.unwrap();
        assert!(matches!(
            redlock.inspect("r").await,
            Err(RedlockError::InspectFailed { .. })
        ));
    }
}
