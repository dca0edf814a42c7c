//! Full blueprint and entity lifecycle against the live mock catalog.
//!
//! # Design
//! Starts the mock server on a random port, then drives every mapper
//! operation over real HTTP through `UreqTransport`.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use port_core::{
    ApiError, Blueprint, BlueprintProperty, BlueprintRelation, CallContext, ClientConfig, Entity, HttpMethod,
    PortClient, PropertyType, PropertyValue, RelationTarget, Team,
};
use serde_json::json;

fn start_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });
    addr
}

fn client() -> PortClient {
    let addr = start_server();
    PortClient::new(ClientConfig::new(&format!("http://{addr}")).with_token("integration"))
}

fn gen_id() -> String {
    format!("t-{}", uuid::Uuid::new_v4().simple())
}

fn text_blueprint(identifier: &str) -> Blueprint {
    Blueprint::new(identifier, "TF Provider Test")
        .with_icon("Terraform")
        .with_property(BlueprintProperty::new("text", PropertyType::String).titled("text"))
}

#[test]
fn blueprint_lifecycle() {
    let client = client();
    let ctx = CallContext::background();
    let id = gen_id();

    // Step 1: create.
    let created = client.blueprints().create(&ctx, &text_blueprint(&id)).unwrap();
    assert_eq!(created.identifier, id);

    // Step 2: read returns what was created.
    let (fetched, status) = client.blueprints().read(&ctx, &id).unwrap();
    assert_eq!(status, 200);
    assert_eq!(fetched, text_blueprint(&id));

    // Step 3: creating the same identifier again is rejected.
    let err = client.blueprints().create(&ctx, &text_blueprint(&id)).unwrap_err();
    assert!(matches!(err, ApiError::RemoteRejection { status: 409, .. }));

    // Step 4: full replace.
    let replacement = text_blueprint(&id)
        .with_property(BlueprintProperty::new("num", PropertyType::Number).titled("number").required());
    let updated = client.blueprints().update(&ctx, &replacement, &id).unwrap();
    assert!(updated.property("num").unwrap().required);
    let (fetched, _) = client.blueprints().read(&ctx, &id).unwrap();
    assert_eq!(fetched.properties.len(), 2);

    // Step 5: delete, then read and delete again are rejected.
    client.blueprints().delete(&ctx, &id).unwrap();
    let err = client.blueprints().read(&ctx, &id).unwrap_err();
    assert!(err.is_not_found(), "{err}");
    assert_eq!(err.status(), Some(404));
    let err = client.blueprints().delete(&ctx, &id).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn entity_lifecycle() {
    let client = client();
    let ctx = CallContext::background();
    let bp = gen_id();
    client.blueprints().create(&ctx, &text_blueprint(&bp)).unwrap();

    // Step 1: create with the mixed property shapes the catalog supports.
    let entity = Entity::new(&bp, "monolith")
        .with_identifier("mono")
        .with_team(Team::Many(vec!["Everyone".to_string()]))
        .with_property("text", "hedwig")
        .with_property("bool", true)
        .with_property("num", 123)
        .with_property("arr", vec![json!(1), json!(2), json!(3)])
        .with_property("obj", json!({"a": "b"}).as_object().cloned().unwrap());
    let created = client.entities().create(&ctx, &entity).unwrap();
    assert_eq!(created, entity);

    // Step 2: read back by composite key and by import key.
    let fetched = client.entities().read(&ctx, "mono", &bp).unwrap();
    assert_eq!(fetched, entity);
    let key = format!("{bp}:mono").parse().unwrap();
    assert_eq!(client.entities().read_key(&ctx, &key).unwrap(), entity);

    // Step 3: upsert with a colliding identifier overwrites.
    let changed = entity.clone().with_property("text", "hedwig2");
    client.entities().create(&ctx, &changed).unwrap();
    let fetched = client.entities().read(&ctx, "mono", &bp).unwrap();
    assert_eq!(fetched.property("text"), Some(&PropertyValue::from("hedwig2")));

    // Step 4: explicit update.
    let renamed = Entity {
        title: "monolith v2".to_string(),
        ..changed
    };
    let updated = client.entities().update(&ctx, &renamed, "mono").unwrap();
    assert_eq!(updated.title, "monolith v2");

    // Step 5: omitted identifier is assigned by the server.
    let anon = client.entities().create(&ctx, &Entity::new(&bp, "anon")).unwrap();
    let anon_id = anon.identifier.clone().unwrap();
    assert!(!anon_id.is_empty());

    // Step 6: delete, then read and delete again are rejected.
    client.entities().delete(&ctx, "mono", &bp).unwrap();
    let err = client.entities().read(&ctx, "mono", &bp).unwrap_err();
    assert!(err.is_not_found());
    let err = client.entities().delete(&ctx, "mono", &bp).unwrap_err();
    assert!(matches!(err, ApiError::RemoteRejection { .. }));

    client.entities().delete(&ctx, &anon_id, &bp).unwrap();
    client.blueprints().delete(&ctx, &bp).unwrap();
}

#[test]
fn entity_under_missing_blueprint_is_rejected() {
    let client = client();
    let err = client
        .entities()
        .create(&CallContext::background(), &Entity::new(&gen_id(), "orphan"))
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn many_relation_keeps_every_target() {
    let client = client();
    let ctx = CallContext::background();
    let env = gen_id();
    let svc = gen_id();

    client
        .blueprints()
        .create(&ctx, &Blueprint::new(&env, "Env").with_property(BlueprintProperty::new("str", PropertyType::String)))
        .unwrap();
    client
        .blueprints()
        .create(
            &ctx,
            &text_blueprint(&svc).with_relation(BlueprintRelation::new("tf-relation", &env).titled("Test Relation").many()),
        )
        .unwrap();
    for name in ["production", "staging"] {
        let target = Entity::new(&env, name).with_identifier(name).with_property("str", "test-many-relation");
        client.entities().create(&ctx, &target).unwrap();
    }

    let entity = Entity::new(&svc, "monolith").with_identifier("mono").with_relation(
        "tf-relation",
        RelationTarget::Many(vec!["production".to_string(), "staging".to_string()]),
    );
    client.entities().create(&ctx, &entity).unwrap();

    let fetched = client.entities().read(&ctx, "mono", &svc).unwrap();
    let mut ids = fetched.relation("tf-relation").unwrap().identifiers();
    ids.sort_unstable();
    assert_eq!(ids, ["production", "staging"]);

    // A relation to an entity that does not exist is refused.
    let dangling = entity.with_relation("tf-relation", RelationTarget::Many(vec!["qa".to_string()]));
    let err = client.entities().create(&ctx, &dangling).unwrap_err();
    assert!(matches!(err, ApiError::RemoteRejection { status: 422, .. }));
}

#[test]
fn reads_exclude_calculated_properties() {
    let client = client();
    let ctx = CallContext::background();
    let bp = gen_id();

    // The typed Blueprint has no calculation section; post the raw payload.
    let raw = json!({
        "identifier": &bp,
        "title": "Calculated",
        "schema": {"properties": {"text": {"type": "string"}}, "required": []},
        "calculationProperties": {"url": {"title": "URL", "type": "string", "calculation": "'x'"}},
        "relations": {}
    });
    let request = client
        .request(HttpMethod::Post, "v1/blueprints")
        .json_body(&raw)
        .build()
        .unwrap();
    let response = client.execute(&ctx, &request).unwrap();
    assert_eq!(response.status, 201);

    client
        .entities()
        .create(&ctx, &Entity::new(&bp, "e1").with_identifier("e1").with_property("text", "a"))
        .unwrap();
    let fetched = client.entities().read(&ctx, "e1", &bp).unwrap();
    assert!(fetched.property("url").is_none());
    assert_eq!(fetched.property("text"), Some(&PropertyValue::from("a")));

    // Without the flag the server does report the calculated value.
    let request = client
        .request(HttpMethod::Get, "v1/blueprints/{blueprint}/entities/{identifier}")
        .path_param("blueprint", bp.as_str())
        .path_param("identifier", "e1")
        .build()
        .unwrap();
    let decoded = client.send::<serde_json::Value>(&ctx, &request).unwrap();
    assert_eq!(decoded.result.unwrap()["entity"]["properties"]["url"], "'x'");
}

#[test]
fn expired_deadline_is_cancelled() {
    let client = client();
    let ctx = CallContext::background().deadline(Instant::now() - Duration::from_secs(1));
    let err = client.blueprints().read(&ctx, "anything").unwrap_err();
    assert!(matches!(err, ApiError::Cancelled));

    let ctx = CallContext::with_timeout(Duration::from_secs(5));
    let err = client.blueprints().read(&ctx, "missing").unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn deadline_aborts_a_request_in_flight() {
    // Accepts connections but never answers.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        let mut held = Vec::new();
        for stream in listener.incoming() {
            held.push(stream);
        }
    });

    let client = PortClient::new(ClientConfig::new(&format!("http://{addr}")));
    let started = Instant::now();
    let err = client
        .blueprints()
        .read(&CallContext::with_timeout(Duration::from_millis(300)), "silent")
        .unwrap_err();
    assert!(matches!(err, ApiError::Cancelled), "{err:?}");
    assert!(started.elapsed() < Duration::from_secs(5));
}
