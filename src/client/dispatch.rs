// Copyright 2018 Google LLC
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use super::channel::{Channel, Endpoint};
use tarpc::context;
use thiserror::Error;

/// The raw field text captured from the frontend at send time.
#[derive(Clone, Debug)]
pub struct SendRequest {
    pub host: String,
    pub port: String,
    pub name: String,
}

/// A [`SendRequest`] whose fields passed validation.
#[derive(Debug, PartialEq, Eq)]
pub struct ValidRequest {
    pub endpoint: Endpoint,
    pub name: String,
}

/// A configuration error caught before any network activity.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum InvalidInput {
    #[error("empty host name!")]
    EmptyHost,
    #[error("empty port")]
    EmptyPort,
    #[error("invalid port")]
    InvalidPort,
    #[error("empty name")]
    EmptyName,
}

/// Checks the field text. On failure no channel may be constructed or
/// touched; the caller reports the error and cancels the send.
pub fn validate(request: &SendRequest) -> Result<ValidRequest, InvalidInput> {
    if request.host.is_empty() {
        return Err(InvalidInput::EmptyHost);
    }
    if request.port.is_empty() {
        return Err(InvalidInput::EmptyPort);
    }
    let port = request
        .port
        .parse::<u16>()
        .map_err(|_| InvalidInput::InvalidPort)?;
    if request.name.is_empty() {
        return Err(InvalidInput::EmptyName);
    }
    Ok(ValidRequest {
        endpoint: Endpoint {
            host: request.host.clone(),
            port,
        },
        name: request.name.clone(),
    })
}

/// The terminal result of one dispatched call, produced exactly once.
#[derive(Debug)]
pub enum Outcome {
    /// The server answered with a greeting.
    Success(String),
    /// Validation failed; the send was abandoned before any network activity.
    Cancelled,
    /// The call failed in flight.
    Failed(String),
}

/// Issues one say_hello call over `channel`.
///
/// A channel that has not been used yet connects here, so connect failures
/// are reported as [`Outcome::Failed`] like any other call failure. Runs on
/// its own task; the caller observes the outcome without blocking.
pub async fn dispatch(channel: &Channel, name: String) -> Outcome {
    let client = match channel.client().await {
        Ok(client) => client,
        Err(e) => return Outcome::Failed(e.to_string()),
    };
    match client.say_hello(context::current(), name).await {
        Ok(message) => Outcome::Success(message),
        Err(e) => Outcome::Failed(e.to_string()),
    }
}
