// Copyright 2018 Google LLC
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! The server half: the greeter implementation, and an orchestrator that
//! binds it (wrapped by the logging interceptor) to a TCP port and manages
//! the start/stop lifecycle.

pub mod intercept;

pub use intercept::LogInterceptor;

use crate::Greeter;
use futures::{future, prelude::*};
use std::{
    io,
    net::{IpAddr, SocketAddr},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tarpc::{
    context,
    server::{self, Channel},
    tokio_serde::formats::Json,
};
use tokio::{sync::oneshot, task::JoinHandle, time};
use tracing::{debug, error};

/// The port the server binary listens on unless told otherwise.
pub const DEFAULT_PORT: u16 = 8080;

/// How many connections are driven concurrently.
const MAX_CONNECTIONS: usize = 10;

/// How often the housekeeping task reports the served-call count.
const HOUSEKEEPING_INTERVAL: Duration = Duration::from_secs(60);

/// Bounded wait for the housekeeping task to stop.
const HOUSEKEEPING_SHUTDOWN_WAIT: Duration = Duration::from_secs(5);

/// This is the type that implements the greeter contract. Pure: the response
/// depends only on the request, and any name is accepted, the empty string
/// included.
#[derive(Clone)]
pub struct HelloServer;

impl Greeter for HelloServer {
    async fn say_hello(self, _: context::Context, name: String) -> String {
        format!("Hello {name}")
    }
}

/// A running server: listener bound, the handler registered behind the
/// logging interceptor, housekeeping ticking.
///
/// Dropping a `Server` also winds the accept loop down (the stop signal
/// fires on sender drop), but only [`Server::stop`] waits for connections to
/// drain.
pub struct Server {
    local_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    accept: JoinHandle<()>,
    housekeeping: JoinHandle<()>,
}

impl Server {
    /// Binds the wrapped handler to `port` on all interfaces and starts
    /// serving. Port 0 asks the OS for an ephemeral port; the bound address
    /// is available through [`Server::local_addr`].
    pub async fn start(port: u16) -> io::Result<Server> {
        let mut listener =
            tarpc::serde_transport::tcp::listen((IpAddr::from([0, 0, 0, 0]), port), Json::default)
                .await?;
        listener.config_mut().max_frame_length(usize::MAX);
        let local_addr = listener.local_addr();

        let (shutdown, stopped) = oneshot::channel::<()>();
        let served = Arc::new(AtomicU64::new(0));

        let counter = served.clone();
        let accept = tokio::spawn(async move {
            let serve = LogInterceptor::new(HelloServer.serve());
            listener
                // Stop taking connections the moment a stop is requested.
                .take_until(stopped)
                // Ignore accept errors.
                .filter_map(|r| future::ready(r.ok()))
                .map(server::BaseChannel::with_defaults)
                .map(move |channel| {
                    let serve = serve.clone();
                    let counter = counter.clone();
                    channel.execute(serve).for_each(move |call| {
                        let counter = counter.clone();
                        async move {
                            tokio::spawn(async move {
                                call.await;
                                counter.fetch_add(1, Ordering::Relaxed);
                            });
                        }
                    })
                })
                .buffer_unordered(MAX_CONNECTIONS)
                .for_each(|_| async {})
                .await;
        });
        let housekeeping = tokio::spawn(housekeeping(served));

        Ok(Server {
            local_addr,
            shutdown,
            accept,
            housekeeping,
        })
    }

    /// The address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Halts acceptance of new connections at once, waits up to `timeout`
    /// for live connections and their in-flight calls to drain, then
    /// releases the housekeeping task. Overruns are logged and the offending
    /// task aborted; `stop` always returns.
    pub async fn stop(mut self, timeout: Duration) {
        let _ = self.shutdown.send(());
        if time::timeout(timeout, &mut self.accept).await.is_err() {
            error!("Timed out waiting for server shutdown");
            self.accept.abort();
        }
        self.housekeeping.abort();
        if time::timeout(HOUSEKEEPING_SHUTDOWN_WAIT, &mut self.housekeeping)
            .await
            .is_err()
        {
            error!("Timed out waiting for the housekeeping task to stop");
        }
    }
}

/// Periodic bookkeeping on its own task, stopped as part of [`Server::stop`].
async fn housekeeping(served: Arc<AtomicU64>) {
    let mut interval = time::interval(HOUSEKEEPING_INTERVAL);
    // The first tick completes immediately.
    interval.tick().await;
    loop {
        interval.tick().await;
        debug!("served {} calls in total", served.load(Ordering::Relaxed));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn say_hello_greets_any_name() {
        assert_eq!(
            HelloServer
                .say_hello(context::current(), "Android".to_string())
                .await,
            "Hello Android"
        );
        assert_eq!(
            HelloServer.say_hello(context::current(), String::new()).await,
            "Hello "
        );
    }

    #[tokio::test]
    async fn start_binds_an_ephemeral_port_and_stops() {
        let server = Server::start(0).await.unwrap();
        assert_ne!(server.local_addr().port(), 0);
        server.stop(Duration::from_secs(5)).await;
    }
}
