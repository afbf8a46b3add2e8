// Copyright 2018 Google LLC
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! A minimal hello service: one unary RPC, a server that answers it, and a
//! client that drives it from a log-and-send-button style frontend.
//!
//! The [`client`] half owns a lazily connected [`client::Channel`] per
//! server endpoint and dispatches each call on its own task, reporting a
//! single [`client::Outcome`] back to the controlling loop. The [`server`]
//! half binds the [`Greeter`] implementation, wrapped by a logging
//! interceptor, to a TCP port.

use tracing_subscriber::{fmt::format::FmtSpan, prelude::*};

pub mod client;
pub mod server;

/// This is the service definition. It looks a lot like a trait definition.
/// It defines one RPC, say_hello, which takes one arg, name, and returns a
/// String.
#[tarpc::service]
pub trait Greeter {
    /// Returns a greeting for name.
    async fn say_hello(name: String) -> String;
}

/// Initializes a tracing subscriber that reads its filter from the
/// environment and writes to stderr, leaving stdout to the binaries.
pub fn init_tracing() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE),
        )
        .try_init()?;

    Ok(())
}
