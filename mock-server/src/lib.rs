use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// In-memory catalog. Blueprints and entities are kept as raw JSON so the
/// server stays independent of the client's types.
#[derive(Default)]
pub struct Catalog {
    pub blueprints: HashMap<String, Value>,
    pub entities: HashMap<(String, String), Value>,
}

pub type Db = Arc<RwLock<Catalog>>;

type Reply = (StatusCode, Json<Value>);

#[derive(Deserialize)]
pub struct ReadQuery {
    #[serde(default)]
    pub exclude_calculated_properties: bool,
}

#[derive(Deserialize)]
pub struct CreateQuery {
    #[serde(default)]
    pub upsert: bool,
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Catalog::default()));
    Router::new()
        .route("/v1/blueprints", post(create_blueprint))
        .route(
            "/v1/blueprints/{blueprint}",
            get(get_blueprint).put(update_blueprint).delete(delete_blueprint),
        )
        .route("/v1/blueprints/{blueprint}/entities", post(create_entity))
        .route(
            "/v1/blueprints/{blueprint}/entities/{identifier}",
            get(get_entity).put(update_entity).delete(delete_entity),
        )
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn ok(status: StatusCode, payload: Option<(&str, Value)>) -> Reply {
    let mut body = json!({ "ok": true });
    if let Some((key, value)) = payload {
        body[key] = value;
    }
    (status, Json(body))
}

fn reject(status: StatusCode, error: &str, message: String) -> Reply {
    tracing::debug!(%status, error, %message, "rejecting request");
    (
        status,
        Json(json!({ "ok": false, "error": error, "message": message })),
    )
}

fn not_found(kind: &str, identifier: &str) -> Reply {
    reject(
        StatusCode::NOT_FOUND,
        "not_found",
        format!("{kind} with identifier \"{identifier}\" was not found"),
    )
}

fn invalid(message: String) -> Reply {
    reject(StatusCode::UNPROCESSABLE_ENTITY, "invalid_request", message)
}

// ---------------------------------------------------------------------------
// Blueprints
// ---------------------------------------------------------------------------

async fn create_blueprint(State(db): State<Db>, Json(body): Json<Value>) -> Reply {
    let Some(identifier) = body.get("identifier").and_then(Value::as_str).map(str::to_string) else {
        return invalid("blueprint identifier is required".to_string());
    };
    let mut catalog = db.write().await;
    if catalog.blueprints.contains_key(&identifier) {
        return reject(
            StatusCode::CONFLICT,
            "identifier_taken",
            format!("blueprint \"{identifier}\" already exists"),
        );
    }
    catalog.blueprints.insert(identifier, body.clone());
    ok(StatusCode::CREATED, Some(("blueprint", without_calculations(body))))
}

async fn get_blueprint(
    State(db): State<Db>,
    Path(identifier): Path<String>,
    Query(query): Query<ReadQuery>,
) -> Reply {
    let catalog = db.read().await;
    match catalog.blueprints.get(&identifier) {
        Some(bp) if query.exclude_calculated_properties => {
            ok(StatusCode::OK, Some(("blueprint", without_calculations(bp.clone()))))
        }
        Some(bp) => ok(StatusCode::OK, Some(("blueprint", bp.clone()))),
        None => not_found("blueprint", &identifier),
    }
}

/// Full replace. The stored identifier always follows the path.
async fn update_blueprint(
    State(db): State<Db>,
    Path(identifier): Path<String>,
    Json(mut body): Json<Value>,
) -> Reply {
    if !body.is_object() {
        return invalid("blueprint must be a JSON object".to_string());
    }
    let mut catalog = db.write().await;
    let Some(slot) = catalog.blueprints.get_mut(&identifier) else {
        return not_found("blueprint", &identifier);
    };
    body["identifier"] = Value::String(identifier);
    *slot = body.clone();
    ok(StatusCode::OK, Some(("blueprint", without_calculations(body))))
}

async fn delete_blueprint(State(db): State<Db>, Path(identifier): Path<String>) -> Reply {
    let mut catalog = db.write().await;
    if catalog.blueprints.remove(&identifier).is_none() {
        return not_found("blueprint", &identifier);
    }
    catalog.entities.retain(|(bp, _), _| *bp != identifier);
    ok(StatusCode::OK, None)
}

fn without_calculations(mut blueprint: Value) -> Value {
    if let Some(obj) = blueprint.as_object_mut() {
        obj.remove("calculationProperties");
    }
    blueprint
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

async fn create_entity(
    State(db): State<Db>,
    Path(blueprint): Path<String>,
    Query(query): Query<CreateQuery>,
    Json(mut body): Json<Value>,
) -> Reply {
    let mut catalog = db.write().await;
    if !catalog.blueprints.contains_key(&blueprint) {
        return not_found("blueprint", &blueprint);
    }
    let Some(obj) = body.as_object_mut() else {
        return invalid("entity must be a JSON object".to_string());
    };
    let identifier = match obj.get("identifier") {
        Some(Value::String(id)) => id.clone(),
        None | Some(Value::Null) => Uuid::new_v4().to_string(),
        Some(_) => return invalid("entity identifier must be a string".to_string()),
    };
    obj.insert("identifier".to_string(), Value::String(identifier.clone()));
    obj.insert("blueprint".to_string(), Value::String(blueprint.clone()));

    if let Err(message) = check_relations(&catalog, &blueprint, &body) {
        return invalid(message);
    }
    let key = (blueprint, identifier);
    if catalog.entities.contains_key(&key) && !query.upsert {
        return reject(
            StatusCode::CONFLICT,
            "identifier_taken",
            format!("entity \"{}\" already exists", key.1),
        );
    }
    catalog.entities.insert(key, body.clone());
    ok(StatusCode::CREATED, Some(("entity", body)))
}

async fn get_entity(
    State(db): State<Db>,
    Path((blueprint, identifier)): Path<(String, String)>,
    Query(query): Query<ReadQuery>,
) -> Reply {
    let catalog = db.read().await;
    let Some(entity) = catalog.entities.get(&(blueprint.clone(), identifier.clone())) else {
        return not_found("entity", &identifier);
    };
    let mut entity = entity.clone();
    if !query.exclude_calculated_properties {
        if let Some(bp) = catalog.blueprints.get(&blueprint) {
            add_calculations(bp, &mut entity);
        }
    }
    ok(StatusCode::OK, Some(("entity", entity)))
}

async fn update_entity(
    State(db): State<Db>,
    Path((blueprint, identifier)): Path<(String, String)>,
    Json(mut body): Json<Value>,
) -> Reply {
    let mut catalog = db.write().await;
    let key = (blueprint.clone(), identifier.clone());
    if !catalog.entities.contains_key(&key) {
        return not_found("entity", &identifier);
    }
    let Some(obj) = body.as_object_mut() else {
        return invalid("entity must be a JSON object".to_string());
    };
    obj.insert("identifier".to_string(), Value::String(identifier));
    obj.insert("blueprint".to_string(), Value::String(blueprint.clone()));
    if let Err(message) = check_relations(&catalog, &blueprint, &body) {
        return invalid(message);
    }
    catalog.entities.insert(key, body.clone());
    ok(StatusCode::OK, Some(("entity", body)))
}

async fn delete_entity(
    State(db): State<Db>,
    Path((blueprint, identifier)): Path<(String, String)>,
) -> Reply {
    let mut catalog = db.write().await;
    match catalog.entities.remove(&(blueprint, identifier.clone())) {
        Some(_) => ok(StatusCode::OK, None),
        None => not_found("entity", &identifier),
    }
}

/// Every relation on `entity` must be declared on its blueprint, match the
/// declared cardinality, and point at existing entities of the target.
fn check_relations(catalog: &Catalog, blueprint: &str, entity: &Value) -> Result<(), String> {
    let Some(relations) = entity.get("relations").and_then(Value::as_object) else {
        return Ok(());
    };
    let declared = catalog
        .blueprints
        .get(blueprint)
        .and_then(|bp| bp.get("relations"))
        .and_then(Value::as_object);
    for (name, value) in relations {
        if value.is_null() {
            continue;
        }
        let Some(def) = declared.and_then(|d| d.get(name)) else {
            return Err(format!("relation \"{name}\" is not declared on \"{blueprint}\""));
        };
        let target = def.get("target").and_then(Value::as_str).unwrap_or_default();
        let many = def.get("many").and_then(Value::as_bool).unwrap_or(false);
        let ids: Vec<&str> = match (value, many) {
            (Value::String(id), false) => vec![id.as_str()],
            (Value::Array(items), true) => items.iter().filter_map(Value::as_str).collect(),
            _ => return Err(format!("relation \"{name}\" does not match its cardinality")),
        };
        for id in ids {
            if !catalog.entities.contains_key(&(target.to_string(), id.to_string())) {
                return Err(format!("relation \"{name}\" target \"{id}\" does not exist in \"{target}\""));
            }
        }
    }
    Ok(())
}

/// The mock does not evaluate calculations; it reports each one's
/// `calculation` text as the property value.
fn add_calculations(blueprint: &Value, entity: &mut Value) {
    let Some(calcs) = blueprint.get("calculationProperties").and_then(Value::as_object) else {
        return;
    };
    let Some(obj) = entity.as_object_mut() else {
        return;
    };
    let properties = obj
        .entry("properties")
        .or_insert_with(|| Value::Object(Map::new()));
    if let Some(props) = properties.as_object_mut() {
        for (name, def) in calcs {
            let value = def.get("calculation").cloned().unwrap_or(Value::Null);
            props.insert(name.clone(), value);
        }
    }
}
