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

//! # Lockd Quorum Coordinator
//!
//! ## Purpose
//! Implements the Redlock algorithm over a set of independent backing
//! instances: a resource is considered locked by a token only while a
//! strict majority of instances store that token, and only for the portion
//! of the requested TTL that survives measured elapsed time and a
//! clock-drift budget.
//!
//! ## Architecture Context
//! ```text
//!     ┌───────────────────────────┐
//!     │  gRPC handler             │
//!     └────────┬──────────────────┘
//!              │
//!         ┌────▼─────┐   fan-out, one task per instance
//!         │ Redlock  ├────────────┬────────────┐
//!         └────┬─────┘            │            │
//!          ┌───▼────┐        ┌────▼───┐   ┌────▼───┐
//!          │ store 0│        │ store 1│   │ store 2│
//!          └────────┘        └────────┘   └────────┘
//! ```
//!
//! ## Safety Model
//! Advisory locking under the Redlock assumptions: bounded clock drift on
//! the instances and crash recovery that preserves expiries. The
//! coordinator itself is stateless; all durable state lives in the
//! instances under the resource key.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod instance;

pub use config::{
    RedlockConfig, DEFAULT_DRIFT_FACTOR, DEFAULT_RETRY_COUNT, DEFAULT_RETRY_DELAY_MS,
};
pub use coordinator::Redlock;
pub use error::{RedlockError, RedlockResult};
pub use instance::LockRecord;
