//! Port catalog client: shared configuration plus a transport.
//!
//! # Design
//! `PortClient` is immutable after construction and holds no per-call state,
//! so one instance can serve concurrent callers as long as its transport
//! can. Requests are started with `request`, which applies the base URL and
//! default headers, and executed with `send`. The resource mappers borrow
//! the client and add one method per catalog operation on top.

use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, RequestBuilder};
use crate::mapper::{Blueprints, Entities};
use crate::transport::{CallContext, Transport, UreqTransport};

/// The raw response of a call plus the result of decoding its body.
///
/// A body that does not decode is not a transport failure, so both are
/// returned and the caller decides.
#[derive(Debug)]
pub struct Decoded<R> {
    pub response: HttpResponse,
    pub result: Result<R, ApiError>,
}

#[derive(Debug, Clone)]
pub struct PortClient<T: Transport = UreqTransport> {
    config: ClientConfig,
    transport: T,
}

impl PortClient<UreqTransport> {
    /// Client over the blocking `ureq` transport.
    pub fn new(config: ClientConfig) -> Self {
        let transport = UreqTransport::with_user_agent(&config.user_agent);
        Self::with_transport(config, transport)
    }

    /// Client configured from `ClientConfig::load`.
    pub fn from_env() -> Result<Self, ApiError> {
        Ok(Self::new(ClientConfig::load()?))
    }
}

impl<T: Transport> PortClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Start a request against `template`, relative to the configured base URL.
    pub fn request(&self, method: HttpMethod, template: &str) -> RequestBuilder {
        let builder = RequestBuilder::new(method, &self.config.base_url, template)
            .header("accept", "application/json");
        match &self.config.token {
            Some(token) => builder.header("authorization", format!("Bearer {token}")),
            None => builder,
        }
    }

    /// Execute `request` and return the raw response.
    pub fn execute(&self, ctx: &CallContext, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        self.transport.execute(ctx, request)
    }

    /// Execute `request` and decode the body into `R`.
    pub fn send<R: DeserializeOwned>(
        &self,
        ctx: &CallContext,
        request: &HttpRequest,
    ) -> Result<Decoded<R>, ApiError> {
        let response = self.execute(ctx, request)?;
        let result = response.decode();
        Ok(Decoded { response, result })
    }

    pub fn blueprints(&self) -> Blueprints<'_, T> {
        Blueprints::new(self)
    }

    pub fn entities(&self) -> Entities<'_, T> {
        Entities::new(self)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Replays canned responses and records every request it receives.
    #[derive(Default)]
    pub(crate) struct ReplayTransport {
        pub(crate) responses: Mutex<VecDeque<HttpResponse>>,
        pub(crate) requests: Mutex<Vec<HttpRequest>>,
    }

    impl ReplayTransport {
        pub(crate) fn replying(responses: Vec<HttpResponse>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn last_request(&self) -> HttpRequest {
            self.requests.lock().unwrap().last().cloned().expect("no request recorded")
        }
    }

    impl Transport for ReplayTransport {
        fn execute(&self, ctx: &CallContext, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
            ctx.remaining()?;
            self.requests.lock().unwrap().push(request.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| ApiError::Transport("no canned response left".to_string()))
        }
    }

    pub(crate) fn client_replying(responses: Vec<HttpResponse>) -> PortClient<ReplayTransport> {
        PortClient::with_transport(
            ClientConfig::new("https://api.getport.io").with_token("t0ken"),
            ReplayTransport::replying(responses),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn request_carries_default_headers() {
        let client = client_replying(Vec::new());
        let req = client.request(HttpMethod::Get, "v1/blueprints").build().unwrap();
        assert_eq!(req.url, "https://api.getport.io/v1/blueprints");
        assert_eq!(req.header("accept"), Some("application/json"));
        assert_eq!(req.header("authorization"), Some("Bearer t0ken"));
    }

    #[test]
    fn no_token_means_no_authorization_header() {
        let client = PortClient::with_transport(
            ClientConfig::new("http://localhost:3000"),
            ReplayTransport::default(),
        );
        let req = client.request(HttpMethod::Get, "v1/blueprints").build().unwrap();
        assert!(req.header("authorization").is_none());
    }

    #[test]
    fn send_returns_response_even_when_decoding_fails() {
        let client = client_replying(vec![HttpResponse::new(502, "bad gateway")]);
        let req = client.request(HttpMethod::Get, "v1/blueprints").build().unwrap();
        let decoded = client.send::<serde_json::Value>(&CallContext::background(), &req).unwrap();
        assert_eq!(decoded.response.status, 502);
        assert!(matches!(decoded.result, Err(ApiError::Decode { .. })));
    }

    #[test]
    fn transport_failure_is_surfaced() {
        let client = client_replying(Vec::new());
        let req = client.request(HttpMethod::Get, "v1/blueprints").build().unwrap();
        let err = client.send::<serde_json::Value>(&CallContext::background(), &req).unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
    }
}
