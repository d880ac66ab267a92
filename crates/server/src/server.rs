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

//! gRPC server bootstrap: store connections, TLS, graceful shutdown.

use anyhow::{Context, Result};
use lockd_proto::lockd::v1::lock_service_server::LockServiceServer;
use lockd_redlock::Redlock;
use lockd_service::LockServiceImpl;
use lockd_store::RedisLockStore;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tonic::transport::{Identity, Server, ServerTlsConfig};
use tracing::{info, warn};

use crate::config::ServerConfig;

/// Bound on draining in-flight calls after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Run the lock service until a shutdown signal drains it.
pub async fn run(config: ServerConfig) -> Result<()> {
    if config.stores.len() < 3 || config.stores.len() % 2 == 0 {
        warn!(
            instances = config.stores.len(),
            "quorum guarantees assume an odd instance count of at least 3"
        );
    }

    let mut redlock = Redlock::new(config.redlock.clone())?;
    for uri in &config.stores {
        let store = RedisLockStore::new(uri)
            .await
            .with_context(|| format!("failed to connect backing store {}", uri))?;
        redlock.add_store(Arc::new(store));
    }
    info!(
        instances = redlock.store_count(),
        quorum = redlock.quorum(),
        "backing stores connected"
    );

    let service = LockServiceImpl::new(Arc::new(redlock));

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port)
        .parse()
        .context("invalid listen address")?;

    let mut builder = Server::builder();
    if let Some(tls) = &config.tls {
        let cert = tokio::fs::read(&tls.cert_file)
            .await
            .with_context(|| format!("failed to read cert file {}", tls.cert_file.display()))?;
        let key = tokio::fs::read(&tls.key_file)
            .await
            .with_context(|| format!("failed to read key file {}", tls.key_file.display()))?;
        builder = builder
            .tls_config(ServerTlsConfig::new().identity(Identity::from_pem(cert, key)))
            .context("invalid TLS configuration")?;
        info!("TLS enabled");
    }

    info!(%addr, "lockd listening");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let serve = builder
        .add_service(LockServiceServer::new(service))
        .serve_with_shutdown(addr, async {
            let _ = shutdown_rx.await;
        });
    tokio::pin!(serve);

    tokio::select! {
        result = &mut serve => {
            return result.context("server terminated unexpectedly");
        }
        _ = shutdown_signal() => {
            info!("received shutdown signal");
            let _ = shutdown_tx.send(());
        }
    }

    // Stop accepting new calls, drain in-flight ones with a bounded deadline.
    match tokio::time::timeout(SHUTDOWN_GRACE, &mut serve).await {
        Ok(result) => result.context("server failed while draining")?,
        Err(_) => warn!("drain deadline exceeded, exiting with calls in flight"),
    }

    info!("lockd shut down");
    Ok(())
}

/// Complete when SIGINT or SIGTERM arrives.
async fn shutdown_signal() {
    let ctrl_c = signal::ctrl_c();

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("unable to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
