// Copyright 2018 Google LLC
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use clap::Parser;
use service::client::{Controller, SendRequest, View};

/// Say hello!
#[derive(Parser, Debug)]
#[command(name = "client", about = "Say hello!")]
struct Flags {
    /// Server host to connect to.
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Server port to connect to. Passed through as text; the controller
    /// validates it like any other field input.
    #[arg(long, default_value = "8080")]
    port: String,

    /// Name to be greeted by the server.
    #[arg(long, default_value = "Android")]
    name: String,
}

/// Stands in for the log view, rendering controller output to stdout.
struct Console;

impl View for Console {
    fn append_log(&mut self, line: &str) {
        println!("{line}");
    }

    fn set_send_enabled(&mut self, _enabled: bool) {}
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let flags = Flags::parse();
    service::init_tracing()?;

    let (controller, sends) = Controller::new(Console);
    let controller = tokio::spawn(controller.run());
    sends
        .send(SendRequest {
            host: flags.host,
            port: flags.port,
            name: flags.name,
        })
        .await?;
    drop(sends);
    controller.await?;

    Ok(())
}
