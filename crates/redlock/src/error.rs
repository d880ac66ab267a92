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

//! Error types for coordinator operations.
//!
//! Per-instance transport errors never surface here; they are absorbed as
//! failed votes before the quorum tally. Only operation-level outcomes are
//! reported.

use thiserror::Error;

/// Result type for coordinator operations.
pub type RedlockResult<T> = Result<T, RedlockError>;

/// Errors that can occur during coordinator operations.
#[derive(Error, Debug)]
pub enum RedlockError {
    /// Quorum was never reached with positive validity across all attempts
    #[error("failed to acquire lock: resource {resource}, lock id {lock_id}")]
    AcquireFailed { resource: String, lock_id: String },

    /// The lock could not be re-extended on a quorum across all attempts
    #[error("failed to refresh lock: resource {resource}, lock id {lock_id}")]
    RefreshFailed { resource: String, lock_id: String },

    /// Fewer than a quorum of instances deleted the caller's token
    #[error("failed to release lock: resource {resource}, lock id {lock_id}")]
    ReleaseFailed { resource: String, lock_id: String },

    /// No instance reported a record for the resource across all attempts
    #[error("no lock found for resource {resource}")]
    InspectFailed { resource: String },

    /// Coordinator configuration rejected at construction
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
