// Copyright 2018 Google LLC
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use clap::Parser;
use service::server::{Server, DEFAULT_PORT};
use std::{process, time::Duration};

/// How long to wait for in-flight work when shutting down.
const SHUTDOWN_WAIT: Duration = Duration::from_secs(5);

/// Say hello! Arguments take the original tool's `--key=value` form.
#[derive(Parser, Debug)]
#[command(name = "server", about = "Say hello!")]
struct Flags {
    /// Port to listen on.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Whether to use TLS.
    #[arg(long = "use_tls", action = clap::ArgAction::Set, default_value_t = false)]
    use_tls: bool,

    /// Wire protocol version; only version 2 is supported.
    #[arg(long = "grpc_version", default_value = "2", value_parser = supported_grpc_version)]
    grpc_version: String,
}

fn supported_grpc_version(value: &str) -> Result<String, String> {
    if value == "2" {
        Ok(value.to_string())
    } else {
        Err("Only grpc version 2 is supported".to_string())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let flags = Flags::try_parse().unwrap_or_else(|e| {
        // Usage goes to stderr and the exit status is 1, --help included.
        eprintln!("{e}");
        process::exit(1);
    });
    service::init_tracing()?;
    tracing::debug!("speaking grpc version {}", flags.grpc_version);

    if flags.use_tls {
        // Certificate provisioning is not wired up; the flag is accepted for
        // command-line compatibility only.
        println!("TLS was requested, but no certificate is provisioned; serving plaintext.");
    }

    let server = Server::start(flags.port).await?;
    println!("Server started on port {}", flags.port);

    shutdown_signal().await?;
    println!("Shutting down");
    server.stop(SHUTDOWN_WAIT).await;

    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        r = tokio::signal::ctrl_c() => r,
        _ = sigterm.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
