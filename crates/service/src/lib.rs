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

//! Lock gRPC Service Implementation
//!
//! ## Purpose
//! Implements the gRPC `LockService` by delegating to the quorum
//! coordinator. The service owns no lock state: it validates requests,
//! dispatches, translates coordinator outcomes into responses or status
//! codes, and logs a structured request/outcome event pair with the
//! caller's correlation id.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────┐
//! │   gRPC Client                       │
//! └────────┬────────────────────────────┘
//!          │ gRPC/HTTP2
//!     ┌────▼──────────────────────────┐
//!     │  LockServiceImpl              │
//!     │  (This crate)                 │
//!     └────────┬──────────────────────┘
//!              │ Delegates to
//!         ┌────▼─────┐
//!         │ Redlock  │ fan-out across backing instances
//!         └──────────┘
//! ```
//!
//! ## Status Mapping
//! - empty resource / lock id, zero ttl → `INVALID_ARGUMENT`
//! - acquire/refresh/release exhausted → `FAILED_PRECONDITION`
//! - inspect found nothing → `NOT_FOUND`

#![warn(missing_docs)]
#![warn(clippy::all)]

use lockd_proto::lockd::v1::{
    lock_service_server::LockService, LockRequest, LockResponse, LockStatus,
};
use lockd_redlock::{Redlock, RedlockError};
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::{info, warn};

/// gRPC lock service delegating to a shared [`Redlock`] coordinator.
///
/// Stateless and safe for concurrent calls; clone-free sharing happens via
/// the inner `Arc`.
pub struct LockServiceImpl {
    /// The quorum coordinator handling all four operations
    redlock: Arc<Redlock>,
}

impl LockServiceImpl {
    /// Create a new lock service around a configured coordinator.
    pub fn new(redlock: Arc<Redlock>) -> Self {
        Self { redlock }
    }

    /// Get the underlying coordinator (for testing).
    pub fn coordinator(&self) -> &Arc<Redlock> {
        &self.redlock
    }
}

/// Correlation identifier propagated from inbound request metadata.
fn correlation_id<T>(request: &Request<T>) -> String {
    request
        .metadata()
        .get("correlation-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Reject empty resource identifiers.
fn require_resource(request: &LockRequest) -> Result<(), Status> {
    if request.resource.is_empty() {
        return Err(Status::invalid_argument("resource must not be empty"));
    }
    Ok(())
}

/// Reject empty lock identifiers for operations that prove ownership.
fn require_lock_id(request: &LockRequest) -> Result<(), Status> {
    if request.lock_id.is_empty() {
        return Err(Status::invalid_argument("lock_id must not be empty"));
    }
    Ok(())
}

/// Reject non-positive lifetimes for operations that create or extend one.
fn require_ttl(request: &LockRequest) -> Result<(), Status> {
    if request.ttl_ms == 0 {
        return Err(Status::invalid_argument("ttl_ms must be positive"));
    }
    Ok(())
}

/// Translate coordinator failures into transport status codes.
fn map_error(err: RedlockError) -> Status {
    match err {
        RedlockError::AcquireFailed { .. }
        | RedlockError::RefreshFailed { .. }
        | RedlockError::ReleaseFailed { .. } => Status::failed_precondition(err.to_string()),
        RedlockError::InspectFailed { .. } => Status::not_found(err.to_string()),
        RedlockError::InvalidConfig(_) => Status::internal(err.to_string()),
    }
}

#[tonic::async_trait]
impl LockService for LockServiceImpl {
    async fn acquire(
        &self,
        request: Request<LockRequest>,
    ) -> Result<Response<LockResponse>, Status> {
        let correlation_id = correlation_id(&request);
        let req = request.into_inner();
        info!(
            correlation_id = %correlation_id,
            resource = %req.resource,
            lock_id = %req.lock_id,
            ttl_ms = req.ttl_ms,
            "acquire received"
        );
        require_resource(&req)?;
        require_lock_id(&req)?;
        require_ttl(&req)?;

        match self
            .redlock
            .acquire(&req.resource, &req.lock_id, u64::from(req.ttl_ms))
            .await
        {
            Ok(validity_ms) => {
                info!(
                    correlation_id = %correlation_id,
                    resource = %req.resource,
                    lock_id = %req.lock_id,
                    ttl_ms = req.ttl_ms,
                    validity_ms,
                    "acquire ok"
                );
                Ok(Response::new(LockResponse {
                    status: LockStatus::Ok as i32,
                    resource: req.resource,
                    lock_id: req.lock_id,
                    remaining_ttl_ms: validity_ms as u32,
                }))
            }
            Err(err) => {
                warn!(
                    correlation_id = %correlation_id,
                    resource = %req.resource,
                    lock_id = %req.lock_id,
                    error = %err,
                    "acquire failed"
                );
                Err(map_error(err))
            }
        }
    }

    async fn refresh(
        &self,
        request: Request<LockRequest>,
    ) -> Result<Response<LockResponse>, Status> {
        let correlation_id = correlation_id(&request);
        let req = request.into_inner();
        info!(
            correlation_id = %correlation_id,
            resource = %req.resource,
            lock_id = %req.lock_id,
            ttl_ms = req.ttl_ms,
            "refresh received"
        );
        require_resource(&req)?;
        require_lock_id(&req)?;
        require_ttl(&req)?;

        match self
            .redlock
            .refresh(&req.resource, &req.lock_id, u64::from(req.ttl_ms))
            .await
        {
            Ok(validity_ms) => {
                info!(
                    correlation_id = %correlation_id,
                    resource = %req.resource,
                    lock_id = %req.lock_id,
                    ttl_ms = req.ttl_ms,
                    validity_ms,
                    "refresh ok"
                );
                Ok(Response::new(LockResponse {
                    status: LockStatus::Ok as i32,
                    resource: req.resource,
                    lock_id: req.lock_id,
                    remaining_ttl_ms: validity_ms as u32,
                }))
            }
            Err(err) => {
                warn!(
                    correlation_id = %correlation_id,
                    resource = %req.resource,
                    lock_id = %req.lock_id,
                    error = %err,
                    "refresh failed"
                );
                Err(map_error(err))
            }
        }
    }

    async fn release(
        &self,
        request: Request<LockRequest>,
    ) -> Result<Response<LockResponse>, Status> {
        let correlation_id = correlation_id(&request);
        let req = request.into_inner();
        info!(
            correlation_id = %correlation_id,
            resource = %req.resource,
            lock_id = %req.lock_id,
            "release received"
        );
        require_resource(&req)?;
        require_lock_id(&req)?;

        match self.redlock.release(&req.resource, &req.lock_id).await {
            Ok(()) => {
                info!(
                    correlation_id = %correlation_id,
                    resource = %req.resource,
                    lock_id = %req.lock_id,
                    "release ok"
                );
                Ok(Response::new(LockResponse {
                    status: LockStatus::Ok as i32,
                    resource: req.resource,
                    lock_id: req.lock_id,
                    remaining_ttl_ms: 0,
                }))
            }
            Err(err) => {
                warn!(
                    correlation_id = %correlation_id,
                    resource = %req.resource,
                    lock_id = %req.lock_id,
                    error = %err,
                    "release failed"
                );
                Err(map_error(err))
            }
        }
    }

    async fn inspect(
        &self,
        request: Request<LockRequest>,
    ) -> Result<Response<LockResponse>, Status> {
        let correlation_id = correlation_id(&request);
        let req = request.into_inner();
        info!(
            correlation_id = %correlation_id,
            resource = %req.resource,
            "inspect received"
        );
        require_resource(&req)?;

        match self.redlock.inspect(&req.resource).await {
            Ok(record) => {
                info!(
                    correlation_id = %correlation_id,
                    resource = %record.resource,
                    lock_id = %record.lock_id,
                    remaining_ttl_ms = record.remaining_ttl_ms,
                    "inspect ok"
                );
                Ok(Response::new(LockResponse {
                    status: LockStatus::Ok as i32,
                    resource: record.resource,
                    lock_id: record.lock_id,
                    remaining_ttl_ms: record.remaining_ttl_ms as u32,
                }))
            }
            Err(err) => {
                warn!(
                    correlation_id = %correlation_id,
                    resource = %req.resource,
                    error = %err,
                    "inspect failed"
                );
                Err(map_error(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockd_redlock::RedlockConfig;
    use lockd_store::MemoryLockStore;
    use tonic::Code;

    fn test_service(n: usize) -> LockServiceImpl {
        let mut redlock = Redlock::new(RedlockConfig {
            retry_count: 2,
            retry_delay_ms: 10,
            drift_factor: 0.01,
        })
        .unwrap();
        for _ in 0..n {
            redlock.add_store(Arc::new(MemoryLockStore::new()));
        }
        LockServiceImpl::new(Arc::new(redlock))
    }

    fn request(resource: &str, lock_id: &str, ttl_ms: u32) -> Request<LockRequest> {
        let mut request = Request::new(LockRequest {
            resource: resource.to_string(),
            lock_id: lock_id.to_string(),
            ttl_ms,
        });
        request
            .metadata_mut()
            .insert("correlation-id", "test-correlation".parse().unwrap());
        request
    }

    #[tokio::test]
    async fn test_acquire_returns_validity() {
        let service = test_service(3);

        let response = service
            .acquire(request("r", "lock-a", 5_000))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(response.status(), LockStatus::Ok);
        assert_eq!(response.resource, "r");
        assert_eq!(response.lock_id, "lock-a");
        assert!(response.remaining_ttl_ms > 0);
        assert!(response.remaining_ttl_ms <= 5_000 - 52);
    }

    #[tokio::test]
    async fn test_acquire_rejects_empty_resource() {
        let service = test_service(3);

        let status = service
            .acquire(request("", "lock-a", 5_000))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);
    }

    #[tokio::test]
    async fn test_acquire_rejects_empty_lock_id() {
        let service = test_service(3);

        let status = service.acquire(request("r", "", 5_000)).await.unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);
    }

    #[tokio::test]
    async fn test_acquire_rejects_zero_ttl() {
        let service = test_service(3);

        let status = service.acquire(request("r", "lock-a", 0)).await.unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);
    }

    #[tokio::test]
    async fn test_contended_acquire_maps_to_failed_precondition() {
        let service = test_service(3);

        service.acquire(request("r", "lock-a", 60_000)).await.unwrap();
        let status = service
            .acquire(request("r", "lock-b", 60_000))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::FailedPrecondition);
    }

    #[tokio::test]
    async fn test_refresh_round_trip_and_non_holder() {
        let service = test_service(3);

        service.acquire(request("r", "lock-a", 60_000)).await.unwrap();

        let response = service
            .refresh(request("r", "lock-a", 30_000))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(response.status(), LockStatus::Ok);
        assert!(response.remaining_ttl_ms > 0);

        let status = service
            .refresh(request("r", "lock-b", 30_000))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::FailedPrecondition);
    }

    #[tokio::test]
    async fn test_release_requires_ownership() {
        let service = test_service(3);

        service.acquire(request("r", "lock-a", 60_000)).await.unwrap();

        let status = service.release(request("r", "lock-b", 0)).await.unwrap_err();
        assert_eq!(status.code(), Code::FailedPrecondition);

        let response = service
            .release(request("r", "lock-a", 0))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(response.status(), LockStatus::Ok);
        assert_eq!(response.remaining_ttl_ms, 0);
    }

    #[tokio::test]
    async fn test_inspect_reports_holder() {
        let service = test_service(3);

        service.acquire(request("r", "lock-a", 60_000)).await.unwrap();

        let response = service
            .inspect(request("r", "", 0))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(response.status(), LockStatus::Ok);
        assert_eq!(response.resource, "r");
        assert_eq!(response.lock_id, "lock-a");
        assert!(response.remaining_ttl_ms <= 60_000);
    }

    #[tokio::test]
    async fn test_inspect_missing_maps_to_not_found() {
        let service = test_service(3);

        let status = service.inspect(request("r", "", 0)).await.unwrap_err();
        assert_eq!(status.code(), Code::NotFound);
    }

    #[tokio::test]
    async fn test_inspect_rejects_empty_resource() {
        let service = test_service(3);

        let status = service.inspect(request("", "", 0)).await.unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);
    }
}
