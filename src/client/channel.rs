// Copyright 2018 Google LLC
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::GreeterClient;
use std::{io, sync::Arc, time::Duration};
use tarpc::{client, tokio_serde::formats::Json};
use tokio::{sync::Mutex, task::JoinHandle, time};
use tracing::warn;

/// Identifies the server a [`Channel`] is bound to. Two endpoints are equal
/// iff host and port are equal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

/// A reusable connection handle for issuing calls to one [`Endpoint`].
///
/// Opening a channel performs no I/O: the TCP connection and the tarpc
/// request-dispatch task are only created on first use, so connect failures
/// surface when a call is attempted. Once shut down, a channel is never
/// reused; a fresh one must be opened instead.
///
/// Clones share the same underlying connection. The internal lock serializes
/// connection handout against teardown, so no call can start against a
/// channel mid-shutdown.
#[derive(Clone)]
pub struct Channel {
    endpoint: Endpoint,
    state: Arc<Mutex<State>>,
}

enum State {
    /// The connection is established lazily, on the first call.
    Open { connection: Option<Connection> },
    ShuttingDown,
    Closed,
}

struct Connection {
    client: GreeterClient,
    dispatch: JoinHandle<()>,
}

impl Channel {
    /// Opens a channel bound to `endpoint`. Never fails; see the type docs.
    pub fn open(endpoint: Endpoint) -> Self {
        Channel {
            endpoint,
            state: Arc::new(Mutex::new(State::Open { connection: None })),
        }
    }

    /// The endpoint this channel is bound to.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Hands out a client stub, connecting to the endpoint first if this
    /// channel has not been used yet. Fails once the channel is closed.
    pub async fn client(&self) -> io::Result<GreeterClient> {
        let mut state = self.state.lock().await;
        match &mut *state {
            State::Open {
                connection: Some(connection),
            } => Ok(connection.client.clone()),
            State::Open { connection } => {
                let transport = tarpc::serde_transport::tcp::connect(
                    (self.endpoint.host.as_str(), self.endpoint.port),
                    Json::default,
                )
                .await?;
                let client::NewClient { client, dispatch } =
                    GreeterClient::new(client::Config::default(), transport);
                // Spawned by hand rather than through NewClient::spawn so the
                // handle is available for the bounded shutdown wait.
                let dispatch = tokio::spawn(async move {
                    if let Err(e) = dispatch.await {
                        warn!("client dispatch exited with an error: {e}");
                    }
                });
                let stub = client.clone();
                *connection = Some(Connection { client, dispatch });
                Ok(stub)
            }
            State::ShuttingDown | State::Closed => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "channel is closed",
            )),
        }
    }

    /// Shuts the channel down, waiting up to `timeout` for the dispatch task
    /// to wind down. An overrun is logged and the task aborted; either way
    /// the channel ends up closed. Shutting down an already-closed channel
    /// is a no-op.
    pub async fn shutdown(&self, timeout: Duration) {
        let mut state = self.state.lock().await;
        let connection = match &mut *state {
            State::Open { connection } => connection.take(),
            State::ShuttingDown | State::Closed => return,
        };
        *state = State::ShuttingDown;
        if let Some(Connection {
            client,
            mut dispatch,
        }) = connection
        {
            // Dropping the stub lets the dispatch task finish once in-flight
            // requests have completed.
            drop(client);
            if time::timeout(timeout, &mut dispatch).await.is_err() {
                warn!(
                    "timed out shutting down the channel to {}:{}",
                    self.endpoint.host, self.endpoint.port
                );
                dispatch.abort();
            }
        }
        *state = State::Closed;
    }

    /// Whether this channel has been shut down.
    pub async fn is_closed(&self) -> bool {
        matches!(*self.state.lock().await, State::Closed)
    }
}
