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

use std::env;
use std::fs;
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Generated files live in the source tree and are committed, so the
    // crate builds without protoc available.
    let crate_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let out_dir = crate_dir.join("src/generated");

    let files_exist = out_dir.exists() && out_dir.read_dir()?.next().is_some();
    if files_exist {
        println!("cargo:warning=Proto files already generated, skipping compilation");
        println!("cargo:warning=To regenerate: remove src/generated and set PROTOC");
        return Ok(());
    }

    if env::var("PROTOC").is_err() {
        println!("cargo:warning=PROTOC environment variable not set!");
        println!("cargo:warning=Cannot regenerate proto files without protoc installed.");
        return Ok(());
    }

    // Proto definitions live at workspace_root/proto.
    let workspace_root = crate_dir
        .parent()
        .and_then(|p| p.parent())
        .ok_or("crate is expected to live at <workspace>/crates/proto")?;
    let proto_dir = workspace_root.join("proto");
    let proto_files = vec![proto_dir.join("lockd/v1/lock.proto")];

    fs::create_dir_all(&out_dir)?;

    let config = prost_build::Config::new();

    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .out_dir(&out_dir)
        .emit_rerun_if_changed(true)
        .compile_with_config(config, &proto_files, &[proto_dir])?;

    Ok(())
}
