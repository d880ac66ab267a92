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

//! Lockd Server
//!
//! ## Purpose
//! Serves the lockd quorum coordinator over gRPC: parses CLI flags and the
//! optional config file, connects the backing Redis instances, and runs the
//! tonic server until an interrupt signal drains it.
//!
//! ## Exit Codes
//! - `0`: normal shutdown
//! - `2`: server exited with an error

use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

mod config;
mod server;
mod tracing_setup;

use config::ServerConfig;

/// Distributed advisory lock coordinator speaking gRPC.
#[derive(Parser, Debug)]
#[command(name = "lockd", about = "Distributed advisory lock coordinator", version)]
struct Cli {
    /// The server port
    #[arg(long)]
    port: Option<u16>,

    /// Connection uses TLS if true, else plain TCP
    #[arg(long)]
    tls: bool,

    /// The TLS cert file
    #[arg(long = "cert_file")]
    cert_file: Option<PathBuf>,

    /// The TLS key file
    #[arg(long = "key_file")]
    key_file: Option<PathBuf>,

    /// Backing store URI, one per independent instance (repeatable)
    #[arg(long = "store")]
    stores: Vec<String>,

    /// YAML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    tracing_setup::init_tracing();

    let cli = Cli::parse();
    info!("lockd :: version {}", env!("CARGO_PKG_VERSION"));

    let config = match ServerConfig::load(&cli) {
        Ok(config) => config,
        Err(err) => {
            error!("invalid configuration: {:#}", err);
            std::process::exit(2);
        }
    };

    if let Err(err) = server::run(config).await {
        error!("server returning an error: {:#}", err);
        std::process::exit(2);
    }
}
