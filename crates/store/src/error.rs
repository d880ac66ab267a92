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

//! Error types for backing store operations.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while talking to one backing instance.
///
/// The coordinator treats every variant the same way (the instance did not
/// vote), so the taxonomy exists for logs and for backend tests, not for
/// control flow above the quorum tally.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The instance could not be reached or the connection was refused
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The instance answered but the command failed
    #[error("backend error: {0}")]
    BackendError(String),

    /// The instance is administratively unavailable (in-memory backend only)
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::BackendError(format!("Redis error: {}", err))
    }
}
