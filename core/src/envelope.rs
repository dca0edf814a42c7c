//! The response wrapper every catalog endpoint returns.
//!
//! `ok` is the authoritative success signal; the HTTP status is only kept for
//! diagnostics. A missing `ok` field counts as failure.
//!
//! Payloads stay untyped until the flag has been checked, so a rejection
//! whose body carries a partial object is still reported as a rejection.

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::error::ApiError;
use crate::http::HttpResponse;
use crate::types::{Blueprint, Entity};

#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub blueprint: Option<Value>,
    #[serde(default)]
    pub entity: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl Envelope {
    /// Decode the envelope from `response` and require `ok: true`.
    pub fn check(operation: &'static str, response: &HttpResponse) -> Result<Envelope, ApiError> {
        let envelope: Envelope = response.decode()?;
        envelope.require_ok(operation, response)
    }

    /// Require `ok: true` on an envelope that was already decoded from `response`.
    pub fn require_ok(self, operation: &'static str, response: &HttpResponse) -> Result<Envelope, ApiError> {
        if self.ok {
            return Ok(self);
        }
        warn!(operation, status = response.status, error = ?self.error, "catalog rejected request");
        Err(ApiError::RemoteRejection {
            operation,
            status: response.status,
            message: self.message.or(self.error),
            body: response.body.clone(),
        })
    }

    pub fn into_blueprint(self, response: &HttpResponse) -> Result<Blueprint, ApiError> {
        payload("blueprint", self.blueprint, response)
    }

    pub fn into_entity(self, response: &HttpResponse) -> Result<Entity, ApiError> {
        payload("entity", self.entity, response)
    }
}

fn payload<T: serde::de::DeserializeOwned>(
    field: &str,
    value: Option<Value>,
    response: &HttpResponse,
) -> Result<T, ApiError> {
    let decode_error = |message: String| ApiError::Decode {
        status: response.status,
        message,
        body: response.body.clone(),
    };
    match value {
        None | Some(Value::Null) => Err(decode_error(format!("envelope is missing `{field}`"))),
        Some(value) => serde_json::from_value(value).map_err(|e| decode_error(format!("`{field}`: {e}"))),
    }
}
