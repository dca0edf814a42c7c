//! Request execution and the caller-supplied call context.
//!
//! # Design
//! `Transport` is the single seam where bytes leave the process. It hands
//! back whatever status the server sent; deciding success is left to the
//! mappers, which read the envelope's `ok` flag. `UreqTransport` is the
//! blocking implementation. Tests substitute their own `Transport` to
//! replay canned responses.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Cloneable cancellation flag shared between a caller and in-flight calls.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Cancellation and deadline for a single mapper call.
///
/// The deadline aborts a request still in flight. The token only takes
/// effect between steps: a token fired while a create, update or delete is
/// on the wire yields `Cancelled`, but the catalog may already have applied
/// the change.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
    token: CancellationToken,
}

impl CallContext {
    /// A context that never expires and is never cancelled.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::background().deadline(Instant::now() + timeout)
    }

    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Time left before the deadline, or `Cancelled` if none is left.
    ///
    /// `Ok(None)` means the context has no deadline.
    pub fn remaining(&self) -> Result<Option<Duration>, ApiError> {
        if self.token.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        match self.deadline {
            None => Ok(None),
            Some(deadline) => match deadline.checked_duration_since(Instant::now()) {
                Some(left) if !left.is_zero() => Ok(Some(left)),
                _ => Err(ApiError::Cancelled),
            },
        }
    }
}

/// Executes one HTTP request per call.
pub trait Transport: Send + Sync {
    fn execute(&self, ctx: &CallContext, request: &HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// Blocking transport backed by a shared `ureq::Agent`.
///
/// The agent is configured to return 4xx/5xx responses as data so the
/// envelope can be inspected for every status.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport").finish_non_exhaustive()
    }
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::with_user_agent(concat!("port-core/", env!("CARGO_PKG_VERSION")))
    }

    pub fn with_user_agent(user_agent: &str) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .user_agent(user_agent)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, ctx: &CallContext, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let timeout = ctx.remaining()?;
        debug!(method = request.method.as_str(), url = %request.url, "dispatching request");

        let url = request.url.as_str();
        let result = match request.method {
            HttpMethod::Get => prepare(self.agent.get(url), request, timeout).call(),
            HttpMethod::Delete => prepare(self.agent.delete(url), request, timeout).call(),
            HttpMethod::Post => send(prepare(self.agent.post(url), request, timeout), request),
            HttpMethod::Put => send(prepare(self.agent.put(url), request, timeout), request),
        };

        let mut response = result.map_err(|e| match e {
            ureq::Error::Timeout(_) => ApiError::Cancelled,
            other => ApiError::Transport(other.to_string()),
        })?;

        // The agent cannot be interrupted mid-flight; a cancellation that
        // raced the request still discards its result.
        if ctx.token().is_cancelled() {
            return Err(ApiError::Cancelled);
        }

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| match e {
                ureq::Error::Timeout(_) => ApiError::Cancelled,
                other => ApiError::Transport(other.to_string()),
            })?;
        debug!(status, "received response");

        Ok(HttpResponse { status, headers, body })
    }
}

fn prepare<B>(
    mut builder: ureq::RequestBuilder<B>,
    request: &HttpRequest,
    timeout: Option<Duration>,
) -> ureq::RequestBuilder<B> {
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    match timeout {
        Some(timeout) => builder.config().timeout_global(Some(timeout)).build(),
        None => builder,
    }
}

fn send(
    builder: ureq::RequestBuilder<ureq::typestate::WithBody>,
    request: &HttpRequest,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match &request.body {
        Some(body) => builder.send(body.as_bytes()),
        None => builder.send_empty(),
    }
}
