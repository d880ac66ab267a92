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

//! Coordinator tuning parameters.

use crate::error::{RedlockError, RedlockResult};

/// Max attempts for acquire/refresh/inspect before reporting failure.
pub const DEFAULT_RETRY_COUNT: u32 = 10;

/// Upper bound in milliseconds of the uniform jitter between attempts.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 200;

/// Fraction of the requested TTL budgeted for clock drift across instances.
pub const DEFAULT_DRIFT_FACTOR: f64 = 0.01;

/// Tuning parameters for the quorum coordinator.
///
/// The drift budget charged against a requested TTL is
/// `⌊ttl · drift_factor⌋ + 2` milliseconds; the extra 2 ms covers the
/// minimum expiry granularity of the backing instances.
#[derive(Debug, Clone)]
pub struct RedlockConfig {
    /// Maximum attempts before an acquire/refresh/inspect fails.
    pub retry_count: u32,
    /// Upper bound of the uniform random delay between attempts, in ms.
    pub retry_delay_ms: u64,
    /// Fraction of the TTL subtracted as clock-drift budget.
    pub drift_factor: f64,
}

impl Default for RedlockConfig {
    fn default() -> Self {
        Self {
            retry_count: DEFAULT_RETRY_COUNT,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            drift_factor: DEFAULT_DRIFT_FACTOR,
        }
    }
}

impl RedlockConfig {
    /// Check the parameters are usable.
    pub fn validate(&self) -> RedlockResult<()> {
        if self.retry_count < 1 {
            return Err(RedlockError::InvalidConfig(
                "retry_count must be at least 1".to_string(),
            ));
        }
        if self.retry_delay_ms < 1 {
            return Err(RedlockError::InvalidConfig(
                "retry_delay_ms must be at least 1".to_string(),
            ));
        }
        if self.drift_factor <= 0.0 {
            return Err(RedlockError::InvalidConfig(
                "drift_factor must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Drift budget in milliseconds for a requested TTL.
    pub fn drift_ms(&self, ttl_ms: u64) -> u64 {
        (ttl_ms as f64 * self.drift_factor) as u64 + 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RedlockConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retry_count, 10);
        assert_eq!(config.retry_delay_ms, 200);
        assert_eq!(config.drift_factor, 0.01);
    }

    #[test]
    fn test_rejects_zero_retry_count() {
        let config = RedlockConfig {
            retry_count: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(RedlockError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_zero_retry_delay() {
        let config = RedlockConfig {
            retry_delay_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_non_positive_drift_factor() {
        let config = RedlockConfig {
            drift_factor: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_drift_budget() {
        let config = RedlockConfig::default();
        assert_eq!(config.drift_ms(5_000), 52);
        assert_eq!(config.drift_ms(1_000), 12);
        assert_eq!(config.drift_ms(0), 2);
    }
}
