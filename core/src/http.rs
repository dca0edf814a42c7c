//! HTTP request/response data and the fluent request builder.
//!
//! # Design
//! Requests and responses are plain owned data. `RequestBuilder` resolves a
//! path template such as `v1/blueprints/{blueprint}/entities/{identifier}`
//! against named parameters and appends query parameters in insertion order,
//! so a built `HttpRequest` is fully determined by its inputs and can be
//! asserted on without touching the network.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ApiError;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// A fully resolved HTTP request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Value of the first header named `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A raw HTTP response. The status is recorded but never interpreted here.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Parse the body as JSON into `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_str(&self.body).map_err(|e| ApiError::Decode {
            status: self.status,
            message: e.to_string(),
            body: self.body.clone(),
        })
    }
}

/// Fluent builder for `HttpRequest`.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    method: HttpMethod,
    base_url: String,
    template: String,
    path_params: Vec<(String, String)>,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: Option<Result<String, String>>,
}

impl RequestBuilder {
    pub fn new(method: HttpMethod, base_url: &str, template: &str) -> Self {
        Self {
            method,
            base_url: base_url.trim_end_matches('/').to_string(),
            template: template.trim_start_matches('/').to_string(),
            path_params: Vec::new(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Bind `{name}` in the path template. Later bindings of the same name win.
    pub fn path_param(mut self, name: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        match self.path_params.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = value,
            None => self.path_params.push((name.to_string(), value)),
        }
        self
    }

    pub fn query_param(mut self, name: &str, value: impl Into<String>) -> Self {
        self.query.push((name.to_string(), value.into()));
        self
    }

    /// Set a header, replacing any earlier value under the same name.
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.into()));
        self
    }

    /// Serialize `body` as the JSON request payload.
    ///
    /// Serialization errors are deferred to `build` so the chain stays fluent.
    pub fn json_body<B: Serialize + ?Sized>(self, body: &B) -> Self {
        let encoded = serde_json::to_string(body).map_err(|e| e.to_string());
        let mut this = self.header("content-type", "application/json");
        this.body = Some(encoded);
        this
    }

    pub fn build(self) -> Result<HttpRequest, ApiError> {
        let path = resolve_template(&self.template, &self.path_params)?;
        let mut url = format!("{}/{path}", self.base_url);
        if !self.query.is_empty() {
            let pairs: Vec<String> = self
                .query
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .collect();
            url.push('?');
            url.push_str(&pairs.join("&"));
        }
        let body = self.body.transpose().map_err(ApiError::Serialization)?;
        Ok(HttpRequest {
            method: self.method,
            url,
            headers: self.headers,
            body,
        })
    }
}

/// Substitute every `{name}` segment in `template` with its percent-encoded value.
fn resolve_template(template: &str, params: &[(String, String)]) -> Result<String, ApiError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after.find('}').ok_or_else(|| {
            ApiError::InvalidRequest(format!("unterminated placeholder in `{template}`"))
        })?;
        let name = &after[..end];
        let value = params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
            .ok_or_else(|| ApiError::InvalidRequest(format!("path parameter `{name}` is not bound")))?;
        if value.is_empty() {
            return Err(ApiError::InvalidRequest(format!("path parameter `{name}` is empty")));
        }
        out.push_str(&urlencoding::encode(value));
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}
