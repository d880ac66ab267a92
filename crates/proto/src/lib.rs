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

//! Lockd Protocol Buffers
//!
//! Generated protobuf definitions for the lockd lock service.

// Allow clippy warnings for generated code
#![allow(clippy::doc_lazy_continuation)]
#![allow(clippy::large_enum_variant)]

// Include generated modules - these match the generated file names
pub mod lockd {
    pub mod v1 {
        // Note: the lockd.v1.rs file includes lockd.v1.tonic.rs at the end
        include!("generated/lockd.v1.rs");
    }
}
