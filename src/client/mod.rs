// Copyright 2018 Google LLC
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! The client half: a controller that validates field text, keeps at most
//! one channel open, dispatches each call on its own task, and renders the
//! outcome into a log view.

pub mod channel;
pub mod dispatch;

pub use channel::{Channel, Endpoint};
pub use dispatch::{dispatch, validate, InvalidInput, Outcome, SendRequest, ValidRequest};

use std::time::Duration;
use tokio::sync::mpsc;

/// How long to wait for a channel to wind down before giving up on it.
const CHANNEL_SHUTDOWN_WAIT: Duration = Duration::from_secs(1);

/// The frontend widgets the controller talks to: an append-only log and a
/// send control. The controller disables the send control while a call is in
/// flight, which is what enforces single-flight dispatch.
pub trait View: Send + 'static {
    /// Appends one line to the log view.
    fn append_log(&mut self, line: &str);

    /// Enables or disables the send control.
    fn set_send_enabled(&mut self, enabled: bool);
}

/// Drives sends against the server.
///
/// Each send runs through validate → dispatch → render. The channel used for
/// a call is shut down once the outcome has been rendered, so every call gets
/// a fresh connection; a leftover channel bound to a different endpoint is
/// shut down before the next call executes.
pub struct Controller<V> {
    view: V,
    channel: Option<Channel>,
    commands: mpsc::Receiver<SendRequest>,
    outcomes: mpsc::Receiver<Outcome>,
    outcomes_tx: mpsc::Sender<Outcome>,
    in_flight: bool,
}

impl<V: View> Controller<V> {
    /// Creates a controller and the sender used to hand it send requests.
    /// Dropping the sender tears the controller down.
    pub fn new(view: V) -> (Self, mpsc::Sender<SendRequest>) {
        let (commands_tx, commands) = mpsc::channel(1);
        let (outcomes_tx, outcomes) = mpsc::channel(1);
        let controller = Controller {
            view,
            channel: None,
            commands,
            outcomes,
            outcomes_tx,
            in_flight: false,
        };
        (controller, commands_tx)
    }

    /// Runs until the command sender is dropped and any in-flight call has
    /// finished, then shuts down a live channel with a bounded wait.
    pub async fn run(mut self) {
        let mut commands_open = true;
        while commands_open || self.in_flight {
            tokio::select! {
                // Command intake pauses while a call is in flight; the send
                // control is disabled for the same stretch.
                command = self.commands.recv(), if commands_open && !self.in_flight => match command {
                    Some(request) => self.send(request).await,
                    None => commands_open = false,
                },
                outcome = self.outcomes.recv(), if self.in_flight => {
                    if let Some(outcome) = outcome {
                        self.finish(outcome).await;
                    }
                }
            }
        }
        if let Some(channel) = self.channel.take() {
            channel.shutdown(CHANNEL_SHUTDOWN_WAIT).await;
        }
    }

    async fn send(&mut self, request: SendRequest) {
        self.view.set_send_enabled(false);
        let ValidRequest { endpoint, name } = match validate(&request) {
            Ok(request) => request,
            Err(e) => {
                self.view.append_log(&format!("ERROR: {e}"));
                self.finish(Outcome::Cancelled).await;
                return;
            }
        };
        match self.channel.take() {
            // A channel bound to a previous endpoint is closed before the new
            // call executes, so two channels are never open at once.
            Some(channel) if *channel.endpoint() != endpoint => {
                channel.shutdown(CHANNEL_SHUTDOWN_WAIT).await;
            }
            Some(channel) => self.channel = Some(channel),
            None => {}
        }
        let channel = self
            .channel
            .get_or_insert_with(|| Channel::open(endpoint))
            .clone();
        self.view.append_log("Sending hello to server...");
        self.in_flight = true;
        let outcomes = self.outcomes_tx.clone();
        tokio::spawn(async move {
            let outcome = dispatch(&channel, name).await;
            let _ = outcomes.send(outcome).await;
        });
    }

    async fn finish(&mut self, outcome: Outcome) {
        // One channel per call: tear it down however the call went. A
        // cancelled send never touched the channel, so nothing is torn down.
        if !matches!(outcome, Outcome::Cancelled) {
            if let Some(channel) = self.channel.take() {
                channel.shutdown(CHANNEL_SHUTDOWN_WAIT).await;
            }
        }
        match outcome {
            Outcome::Success(message) => self.view.append_log(&format!("SERVER: {message}")),
            Outcome::Failed(e) => self.view.append_log(&format!("ERROR: {e}")),
            Outcome::Cancelled => {}
        }
        self.in_flight = false;
        self.view.set_send_enabled(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct TestView(Arc<Mutex<TestViewState>>);

    struct TestViewState {
        log: Vec<String>,
        send_enabled: bool,
    }

    impl Default for TestViewState {
        fn default() -> Self {
            TestViewState {
                log: Vec::new(),
                send_enabled: true,
            }
        }
    }

    impl TestView {
        fn log(&self) -> Vec<String> {
            self.0.lock().unwrap().log.clone()
        }

        fn send_enabled(&self) -> bool {
            self.0.lock().unwrap().send_enabled
        }
    }

    impl View for TestView {
        fn append_log(&mut self, line: &str) {
            self.0.lock().unwrap().log.push(line.to_string());
        }

        fn set_send_enabled(&mut self, enabled: bool) {
            self.0.lock().unwrap().send_enabled = enabled;
        }
    }

    fn send_request(port: u16) -> SendRequest {
        SendRequest {
            host: "localhost".to_string(),
            port: port.to_string(),
            name: "Android".to_string(),
        }
    }

    #[tokio::test]
    async fn endpoint_change_closes_the_prior_channel() {
        let server = crate::server::Server::start(0).await.unwrap();
        let port = server.local_addr().port();

        let view = TestView::default();
        let (mut controller, commands) = Controller::new(view.clone());
        let stale = Channel::open(Endpoint {
            host: "otherhost".to_string(),
            port,
        });
        controller.channel = Some(stale.clone());

        let run = tokio::spawn(controller.run());
        commands.send(send_request(port)).await.unwrap();
        drop(commands);
        run.await.unwrap();

        assert!(stale.is_closed().await);
        assert!(view.log().contains(&"SERVER: Hello Android".to_string()));
        server.stop(Duration::from_secs(5)).await;
    }

    #[tokio::test]
    async fn channel_is_torn_down_after_each_call() {
        let server = crate::server::Server::start(0).await.unwrap();
        let port = server.local_addr().port();

        let view = TestView::default();
        let (controller, commands) = Controller::new(view.clone());
        let run = tokio::spawn(controller.run());
        commands.send(send_request(port)).await.unwrap();
        commands.send(send_request(port)).await.unwrap();
        drop(commands);
        run.await.unwrap();

        let greetings = view
            .log()
            .iter()
            .filter(|line| *line == "SERVER: Hello Android")
            .count();
        assert_eq!(greetings, 2);
        assert!(view.send_enabled());
        server.stop(Duration::from_secs(5)).await;
    }

    #[tokio::test]
    async fn invalid_input_cancels_without_dispatch() {
        let view = TestView::default();
        let (mut controller, commands) = Controller::new(view.clone());
        let open = Channel::open(Endpoint {
            host: "localhost".to_string(),
            port: 4321,
        });
        controller.channel = Some(open.clone());

        let run = tokio::spawn(controller.run());
        commands
            .send(SendRequest {
                host: String::new(),
                port: "4321".to_string(),
                name: "Android".to_string(),
            })
            .await
            .unwrap();
        drop(commands);
        run.await.unwrap();

        assert_eq!(view.log(), vec!["ERROR: empty host name!".to_string()]);
        assert!(view.send_enabled());
        // The cancelled send never dispatched; the injected channel was only
        // closed by controller teardown at the end of run().
        assert!(open.is_closed().await);
    }
}
