// Copyright 2018 Google LLC
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use tarpc::{context, server::Serve, ServerError};
use tracing::info;

/// A [`Serve`] decorator that logs the method name of every inbound call,
/// then delegates to the wrapped service. It never rejects or mutates a
/// call; this is where cross-cutting concerns would hook in.
#[derive(Clone, Debug)]
pub struct LogInterceptor<S> {
    inner: S,
}

impl<S> LogInterceptor<S> {
    /// Returns a new `LogInterceptor` wrapping `inner`, typically the served
    /// form of the greeter.
    pub fn new(inner: S) -> Self {
        LogInterceptor { inner }
    }

    /// Returns the wrapped service.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }
}

impl<S> Serve for LogInterceptor<S>
where
    S: Serve,
{
    type Req = S::Req;
    type Resp = S::Resp;

    fn method(&self, request: &Self::Req) -> Option<&'static str> {
        self.inner.method(request)
    }

    async fn serve(self, ctx: context::Context, req: Self::Req) -> Result<Self::Resp, ServerError> {
        let method = self.inner.method(&req).unwrap_or("<unknown>");
        info!("Received call to {method}");
        self.inner.serve(ctx, req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{server::HelloServer, Greeter, GreeterRequest, GreeterResponse};
    use assert_matches::assert_matches;

    fn request() -> GreeterRequest {
        GreeterRequest::SayHello {
            name: "Android".to_string(),
        }
    }

    #[test]
    fn reports_the_wrapped_method_name() {
        let serve = LogInterceptor::new(HelloServer.serve());
        assert!(serve.method(&request()).is_some());
        assert_eq!(
            serve.method(&request()),
            serve.get_ref().method(&request())
        );
    }

    #[tokio::test]
    async fn delegates_to_the_wrapped_service() {
        let serve = LogInterceptor::new(HelloServer.serve());
        let response = serve.serve(context::current(), request()).await.unwrap();
        assert_matches!(
            response,
            GreeterResponse::SayHello(message) if message == "Hello Android"
        );
    }
}
