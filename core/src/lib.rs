//! Client core for the Port software catalog API.
//!
//! # Overview
//! Maps blueprints and entities onto the catalog's REST endpoints. Every
//! response carries an `ok` flag, and that flag, not the HTTP status,
//! decides whether a call succeeded.
//!
//! # Design
//! - `PortClient` holds an immutable `ClientConfig` and a `Transport`; it is
//!   safe to share between threads when the transport is.
//! - `Blueprints` and `Entities` expose one method per operation, each a
//!   single request/response round trip. Pure `build_*` / `parse_*` pairs are
//!   kept alongside so hosts can run the I/O themselves.
//! - Property values are a closed tagged union (`PropertyValue`) instead of
//!   untyped JSON.

pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod http;
pub mod mapper;
pub mod transport;
pub mod types;

pub use client::{Decoded, PortClient};
pub use config::ClientConfig;
pub use envelope::Envelope;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, RequestBuilder};
pub use mapper::{Blueprints, Entities};
pub use transport::{CallContext, CancellationToken, Transport, UreqTransport};
pub use types::{
    Blueprint, BlueprintProperty, BlueprintRelation, Entity, EntityKey, EntityProperty, EntityRelation,
    PropertyType, PropertyValue, RelationTarget, Team,
};
