//! Blueprint endpoints under `v1/blueprints`.

use tracing::debug;

use crate::client::PortClient;
use crate::envelope::Envelope;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::transport::{CallContext, Transport};
use crate::types::Blueprint;

const COLLECTION: &str = "v1/blueprints";
const MEMBER: &str = "v1/blueprints/{identifier}";

/// CRUD operations on blueprints.
pub struct Blueprints<'c, T: Transport> {
    client: &'c PortClient<T>,
}

impl<'c, T: Transport> Blueprints<'c, T> {
    pub(crate) fn new(client: &'c PortClient<T>) -> Self {
        Self { client }
    }

    pub fn build_read(&self, identifier: &str) -> Result<HttpRequest, ApiError> {
        self.client
            .request(HttpMethod::Get, MEMBER)
            .path_param("identifier", identifier)
            .query_param("exclude_calculated_properties", "true")
            .build()
    }

    pub fn build_create(&self, blueprint: &Blueprint) -> Result<HttpRequest, ApiError> {
        self.client
            .request(HttpMethod::Post, COLLECTION)
            .json_body(blueprint)
            .build()
    }

    /// Full replace of the blueprint stored under `identifier`.
    pub fn build_update(&self, blueprint: &Blueprint, identifier: &str) -> Result<HttpRequest, ApiError> {
        self.client
            .request(HttpMethod::Put, MEMBER)
            .path_param("identifier", identifier)
            .json_body(blueprint)
            .build()
    }

    pub fn build_delete(&self, identifier: &str) -> Result<HttpRequest, ApiError> {
        self.client
            .request(HttpMethod::Delete, MEMBER)
            .path_param("identifier", identifier)
            .build()
    }

    pub fn parse_read(&self, response: &HttpResponse) -> Result<Blueprint, ApiError> {
        Envelope::check("read blueprint", response)?.into_blueprint(response)
    }

    pub fn parse_create(&self, response: &HttpResponse) -> Result<Blueprint, ApiError> {
        Envelope::check("create blueprint", response)?.into_blueprint(response)
    }

    pub fn parse_update(&self, response: &HttpResponse) -> Result<Blueprint, ApiError> {
        Envelope::check("update blueprint", response)?.into_blueprint(response)
    }

    pub fn parse_delete(&self, response: &HttpResponse) -> Result<(), ApiError> {
        Envelope::check("delete blueprint", response).map(|_| ())
    }

    /// Fetch a blueprint with calculated properties excluded.
    ///
    /// Returns the HTTP status alongside the blueprint. On failure the status
    /// is available through `ApiError::status`, which lets callers tell a
    /// missing blueprint (404) from other rejections.
    pub fn read(&self, ctx: &CallContext, identifier: &str) -> Result<(Blueprint, u16), ApiError> {
        let request = self.build_read(identifier)?;
        let decoded = self.client.send::<Envelope>(ctx, &request)?;
        let response = decoded.response;
        let blueprint = decoded
            .result?
            .require_ok("read blueprint", &response)?
            .into_blueprint(&response)?;
        Ok((blueprint, response.status))
    }

    pub fn create(&self, ctx: &CallContext, blueprint: &Blueprint) -> Result<Blueprint, ApiError> {
        let request = self.build_create(blueprint)?;
        let response = self.client.execute(ctx, &request)?;
        let created = self.parse_create(&response)?;
        debug!(identifier = %created.identifier, "blueprint created");
        Ok(created)
    }

    pub fn update(&self, ctx: &CallContext, blueprint: &Blueprint, identifier: &str) -> Result<Blueprint, ApiError> {
        let request = self.build_update(blueprint, identifier)?;
        let response = self.client.execute(ctx, &request)?;
        self.parse_update(&response)
    }

    pub fn delete(&self, ctx: &CallContext, identifier: &str) -> Result<(), ApiError> {
        let request = self.build_delete(identifier)?;
        let response = self.client.execute(ctx, &request)?;
        self.parse_delete(&response)?;
        debug!(identifier, "blueprint deleted");
        Ok(())
    }
}
