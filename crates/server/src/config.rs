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

//! Server configuration: YAML file with defaults, overridden by CLI flags.

use anyhow::{bail, Context, Result};
use lockd_redlock::{
    RedlockConfig, DEFAULT_DRIFT_FACTOR, DEFAULT_RETRY_COUNT, DEFAULT_RETRY_DELAY_MS,
};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

fn default_port() -> u16 {
    10000
}

fn default_retry_count() -> u32 {
    DEFAULT_RETRY_COUNT
}

fn default_retry_delay_ms() -> u64 {
    DEFAULT_RETRY_DELAY_MS
}

fn default_drift_factor() -> f64 {
    DEFAULT_DRIFT_FACTOR
}

#[derive(Debug, Deserialize)]
pub struct ServerConfigYaml {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub tls: TlsConfigYaml,
    #[serde(default)]
    pub stores: Vec<String>,
    #[serde(default)]
    pub redlock: RedlockConfigYaml,
}

#[derive(Debug, Deserialize, Default)]
pub struct TlsConfigYaml {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub cert_file: Option<PathBuf>,
    #[serde(default)]
    pub key_file: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct RedlockConfigYaml {
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_drift_factor")]
    pub drift_factor: f64,
}

impl Default for RedlockConfigYaml {
    fn default() -> Self {
        Self {
            retry_count: default_retry_count(),
            retry_delay_ms: default_retry_delay_ms(),
            drift_factor: default_drift_factor(),
        }
    }
}

/// TLS material resolved from flags and file.
#[derive(Debug, Clone)]
pub struct TlsConfig {
    pub cert_file: PathBuf,
    pub key_file: PathBuf,
}

/// Fully resolved server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub tls: Option<TlsConfig>,
    pub stores: Vec<String>,
    pub redlock: RedlockConfig,
}

impl ServerConfig {
    /// Resolve the configuration from the optional YAML file and CLI flags.
    pub fn load(cli: &crate::Cli) -> Result<Self> {
        let yaml: ServerConfigYaml = match &cli.config {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("failed to read config file {}", path.display()))?;
                serde_yaml::from_str(&raw)
                    .with_context(|| format!("failed to parse config file {}", path.display()))?
            }
            None => serde_yaml::from_str("{}").context("failed to build default configuration")?,
        };
        Self::merge(cli, yaml)
    }

    /// Merge CLI flags over file values; flags win wherever both are given.
    fn merge(cli: &crate::Cli, yaml: ServerConfigYaml) -> Result<Self> {
        let port = cli.port.unwrap_or(yaml.port);

        let stores = if cli.stores.is_empty() {
            yaml.stores
        } else {
            cli.stores.clone()
        };
        if stores.is_empty() {
            bail!("at least one backing store URI is required (--store or config file)");
        }

        let tls = if cli.tls || yaml.tls.enabled {
            let cert_file = cli
                .cert_file
                .clone()
                .or(yaml.tls.cert_file)
                .context("cert_file is required when TLS is enabled")?;
            let key_file = cli
                .key_file
                .clone()
                .or(yaml.tls.key_file)
                .context("key_file is required when TLS is enabled")?;
            Some(TlsConfig {
                cert_file,
                key_file,
            })
        } else {
            None
        };

        Ok(Self {
            port,
            tls,
            stores,
            redlock: RedlockConfig {
                retry_count: yaml.redlock.retry_count,
                retry_delay_ms: yaml.redlock.retry_delay_ms,
                drift_factor: yaml.redlock.drift_factor,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_cli() -> crate::Cli {
        crate::Cli {
            port: None,
            tls: false,
            cert_file: None,
            key_file: None,
            stores: Vec::new(),
            config: None,
        }
    }

    #[test]
    fn test_defaults_from_empty_yaml() {
        let yaml: ServerConfigYaml = serde_yaml::from_str("{}").unwrap();
        assert_eq!(yaml.port, 10000);
        assert!(!yaml.tls.enabled);
        assert!(yaml.stores.is_empty());
        assert_eq!(yaml.redlock.retry_count, 10);
        assert_eq!(yaml.redlock.retry_delay_ms, 200);
        assert_eq!(yaml.redlock.drift_factor, 0.01);
    }

    #[test]
    fn test_merge_requires_stores() {
        let yaml: ServerConfigYaml = serde_yaml::from_str("{}").unwrap();
        assert!(ServerConfig::merge(&empty_cli(), yaml).is_err());
    }

    #[test]
    fn test_cli_flags_override_file() {
        let yaml: ServerConfigYaml = serde_yaml::from_str(
            r#"
port: 9001
stores:
  - redis://10.0.0.1:6379
  - redis://10.0.0.2:6379
  - redis://10.0.0.3:6379
redlock:
  retry_count: 5
"#,
        )
        .unwrap();

        let mut cli = empty_cli();
        cli.port = Some(9002);
        cli.stores = vec!["redis://127.0.0.1:6379".to_string()];

        let config = ServerConfig::merge(&cli, yaml).unwrap();
        assert_eq!(config.port, 9002);
        assert_eq!(config.stores, vec!["redis://127.0.0.1:6379".to_string()]);
        assert_eq!(config.redlock.retry_count, 5);
    }

    #[test]
    fn test_tls_requires_cert_and_key() {
        let yaml: ServerConfigYaml = serde_yaml::from_str("stores: [redis://127.0.0.1]").unwrap();
        let mut cli = empty_cli();
        cli.tls = true;

        assert!(ServerConfig::merge(&cli, yaml).is_err());

        let yaml: ServerConfigYaml = serde_yaml::from_str("stores: [redis://127.0.0.1]").unwrap();
        cli.cert_file = Some(PathBuf::from("server.pem"));
        cli.key_file = Some(PathBuf::from("server.key"));
        let config = ServerConfig::merge(&cli, yaml).unwrap();
        assert!(config.tls.is_some());
    }
}
