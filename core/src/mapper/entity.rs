//! Entity endpoints under `v1/blueprints/{blueprint}/entities`.
//!
//! Creates are always sent as upserts.

use tracing::debug;

use crate::client::PortClient;
use crate::envelope::Envelope;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::transport::{CallContext, Transport};
use crate::types::{Entity, EntityKey};

const COLLECTION: &str = "v1/blueprints/{blueprint}/entities";
const MEMBER: &str = "v1/blueprints/{blueprint}/entities/{identifier}";

/// CRUD operations on entities. Entities are addressed by the composite
/// key (owning blueprint, identifier).
pub struct Entities<'c, T: Transport> {
    client: &'c PortClient<T>,
}

impl<'c, T: Transport> Entities<'c, T> {
    pub(crate) fn new(client: &'c PortClient<T>) -> Self {
        Self { client }
    }

    pub fn build_read(&self, identifier: &str, blueprint: &str) -> Result<HttpRequest, ApiError> {
        self.client
            .request(HttpMethod::Get, MEMBER)
            .path_param("blueprint", blueprint)
            .path_param("identifier", identifier)
            .query_param("exclude_calculated_properties", "true")
            .build()
    }

    /// Create-or-replace: the path comes from `entity.blueprint` and
    /// `upsert=true` makes a colliding identifier overwrite.
    pub fn build_create(&self, entity: &Entity) -> Result<HttpRequest, ApiError> {
        self.client
            .request(HttpMethod::Post, COLLECTION)
            .path_param("blueprint", entity.blueprint.as_str())
            .query_param("upsert", "true")
            .json_body(entity)
            .build()
    }

    pub fn build_update(&self, entity: &Entity, identifier: &str) -> Result<HttpRequest, ApiError> {
        self.client
            .request(HttpMethod::Put, MEMBER)
            .path_param("blueprint", entity.blueprint.as_str())
            .path_param("identifier", identifier)
            .json_body(entity)
            .build()
    }

    pub fn build_delete(&self, identifier: &str, blueprint: &str) -> Result<HttpRequest, ApiError> {
        self.client
            .request(HttpMethod::Delete, MEMBER)
            .path_param("blueprint", blueprint)
            .path_param("identifier", identifier)
            .build()
    }

    pub fn parse_read(&self, response: &HttpResponse) -> Result<Entity, ApiError> {
        Envelope::check("read entity", response)?.into_entity(response)
    }

    pub fn parse_create(&self, response: &HttpResponse) -> Result<Entity, ApiError> {
        Envelope::check("create entity", response)?.into_entity(response)
    }

    pub fn parse_update(&self, response: &HttpResponse) -> Result<Entity, ApiError> {
        Envelope::check("update entity", response)?.into_entity(response)
    }

    pub fn parse_delete(&self, response: &HttpResponse) -> Result<(), ApiError> {
        Envelope::check("delete entity", response).map(|_| ())
    }

    /// Fetch an entity with calculated properties excluded.
    ///
    /// An `ok: false` envelope is an error here, same as for blueprints.
    pub fn read(&self, ctx: &CallContext, identifier: &str, blueprint: &str) -> Result<Entity, ApiError> {
        let request = self.build_read(identifier, blueprint)?;
        let decoded = self.client.send::<Envelope>(ctx, &request)?;
        let response = decoded.response;
        decoded
            .result?
            .require_ok("read entity", &response)?
            .into_entity(&response)
    }

    /// Read by an import key such as `microservice:monolith`.
    pub fn read_key(&self, ctx: &CallContext, key: &EntityKey) -> Result<Entity, ApiError> {
        self.read(ctx, &key.identifier, &key.blueprint)
    }

    pub fn create(&self, ctx: &CallContext, entity: &Entity) -> Result<Entity, ApiError> {
        let request = self.build_create(entity)?;
        let response = self.client.execute(ctx, &request)?;
        let created = self.parse_create(&response)?;
        debug!(
            blueprint = %created.blueprint,
            identifier = created.identifier.as_deref().unwrap_or_default(),
            "entity upserted"
        );
        Ok(created)
    }

    pub fn update(&self, ctx: &CallContext, entity: &Entity, identifier: &str) -> Result<Entity, ApiError> {
        let request = self.build_update(entity, identifier)?;
        let response = self.client.execute(ctx, &request)?;
        self.parse_update(&response)
    }

    pub fn delete(&self, ctx: &CallContext, identifier: &str, blueprint: &str) -> Result<(), ApiError> {
        let request = self.build_delete(identifier, blueprint)?;
        let response = self.client.execute(ctx, &request)?;
        self.parse_delete(&response)?;
        debug!(blueprint, identifier, "entity deleted");
        Ok(())
    }
}
