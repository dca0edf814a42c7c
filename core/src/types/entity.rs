//! Entities, their relation targets, and the `blueprint:identifier` import key.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::property::PropertyValue;
use super::OrderedMap;
use crate::error::ApiError;

/// A single catalog instance conforming to a blueprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "EntityWire", from = "EntityWire")]
pub struct Entity {
    /// Assigned by the server when omitted on create.
    pub identifier: Option<String>,
    pub title: String,
    pub blueprint: String,
    pub team: Option<Team>,
    pub properties: Vec<EntityProperty>,
    pub relations: Vec<EntityRelation>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
}

/// Owning team assignment: the catalog accepts one team or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Team {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityProperty {
    pub name: String,
    pub value: PropertyValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityRelation {
    pub name: String,
    pub target: RelationTarget,
}

/// Target of an entity relation. `Many` is used for relations declared with
/// `many: true` on the blueprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelationTarget {
    One(String),
    Many(Vec<String>),
}

impl RelationTarget {
    pub fn identifiers(&self) -> Vec<&str> {
        match self {
            RelationTarget::One(id) => vec![id.as_str()],
            RelationTarget::Many(ids) => ids.iter().map(String::as_str).collect(),
        }
    }
}

impl Entity {
    pub fn new(blueprint: &str, title: &str) -> Self {
        Self {
            identifier: None,
            title: title.to_string(),
            blueprint: blueprint.to_string(),
            team: None,
            properties: Vec::new(),
            relations: Vec::new(),
            created_at: None,
            updated_at: None,
            created_by: None,
            updated_by: None,
        }
    }

    pub fn with_identifier(mut self, identifier: &str) -> Self {
        self.identifier = Some(identifier.to_string());
        self
    }

    pub fn with_team(mut self, team: Team) -> Self {
        self.team = Some(team);
        self
    }

    /// Set a property, replacing an earlier value under the same name.
    pub fn with_property(mut self, name: &str, value: impl Into<PropertyValue>) -> Self {
        let value = value.into();
        match self.properties.iter_mut().find(|p| p.name == name) {
            Some(existing) => existing.value = value,
            None => self.properties.push(EntityProperty {
                name: name.to_string(),
                value,
            }),
        }
        self
    }

    pub fn with_relation(mut self, name: &str, target: RelationTarget) -> Self {
        match self.relations.iter_mut().find(|r| r.name == name) {
            Some(existing) => existing.target = target,
            None => self.relations.push(EntityRelation {
                name: name.to_string(),
                target,
            }),
        }
        self
    }

    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.iter().find(|p| p.name == name).map(|p| &p.value)
    }

    pub fn relation(&self, name: &str) -> Option<&RelationTarget> {
        self.relations.iter().find(|r| r.name == name).map(|r| &r.target)
    }

    /// Composite key of this entity, if it has an identifier yet.
    pub fn key(&self) -> Option<EntityKey> {
        self.identifier.as_ref().map(|id| EntityKey::new(&self.blueprint, id))
    }
}

/// Composite key of an entity: owning blueprint plus entity identifier.
///
/// Rendered as `blueprint:identifier`, the form used to import existing
/// entities.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityKey {
    pub blueprint: String,
    pub identifier: String,
}

impl EntityKey {
    pub fn new(blueprint: &str, identifier: &str) -> Self {
        Self {
            blueprint: blueprint.to_string(),
            identifier: identifier.to_string(),
        }
    }
}

impl FromStr for EntityKey {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((blueprint, identifier)) if !blueprint.is_empty() && !identifier.is_empty() => {
                Ok(EntityKey::new(blueprint, identifier))
            }
            _ => Err(ApiError::InvalidRequest(format!(
                "entity key `{s}` is not of the form blueprint:identifier"
            ))),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.blueprint, self.identifier)
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntityWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    identifier: Option<String>,
    #[serde(default)]
    title: String,
    blueprint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    team: Option<Team>,
    // Unset properties and relations come back as `null`.
    #[serde(default)]
    properties: OrderedMap<Option<PropertyValue>>,
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    relations: OrderedMap<Option<RelationTarget>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_by: Option<String>,
}

impl From<Entity> for EntityWire {
    fn from(entity: Entity) -> Self {
        EntityWire {
            identifier: entity.identifier,
            title: entity.title,
            blueprint: entity.blueprint,
            team: entity.team,
            properties: OrderedMap(
                entity
                    .properties
                    .into_iter()
                    .map(|p| (p.name, Some(p.value)))
                    .collect(),
            ),
            relations: OrderedMap(
                entity
                    .relations
                    .into_iter()
                    .map(|r| (r.name, Some(r.target)))
                    .collect(),
            ),
            created_at: entity.created_at,
            updated_at: entity.updated_at,
            created_by: entity.created_by,
            updated_by: entity.updated_by,
        }
    }
}

impl From<EntityWire> for Entity {
    fn from(wire: EntityWire) -> Self {
        Entity {
            identifier: wire.identifier,
            title: wire.title,
            blueprint: wire.blueprint,
            team: wire.team,
            properties: wire
                .properties
                .0
                .into_iter()
                .filter_map(|(name, value)| value.map(|value| EntityProperty { name, value }))
                .collect(),
            relations: wire
                .relations
                .0
                .into_iter()
                .filter_map(|(name, target)| target.map(|target| EntityRelation { name, target }))
                .collect(),
            created_at: wire.created_at,
            updated_at: wire.updated_at,
            created_by: wire.created_by,
            updated_by: wire.updated_by,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn serializes_properties_and_relations_as_objects() {
        let entity = Entity::new("microservice", "monolith")
            .with_identifier("mono")
            .with_team(Team::One("Everyone".to_string()))
            .with_property("text", "hedwig")
            .with_property("num", 123)
            .with_relation(
                "tf-relation",
                RelationTarget::Many(vec!["production".to_string(), "staging".to_string()]),
            );
        let json = serde_json::to_value(entity).unwrap();
        assert_eq!(
            json,
            json!({
                "identifier": "mono",
                "title": "monolith",
                "blueprint": "microservice",
                "team": "Everyone",
                "properties": {"text": "hedwig", "num": 123},
                "relations": {"tf-relation": ["production", "staging"]}
            })
        );
    }

    #[test]
    fn omitted_identifier_is_not_sent() {
        let json = serde_json::to_value(Entity::new("svc", "untitled")).unwrap();
        assert!(json.get("identifier").is_none());
        assert!(json.get("relations").is_none());
        assert_eq!(json["properties"], json!({}));
    }

    #[test]
    fn team_accepts_single_or_list() {
        let one: Entity = serde_json::from_value(json!({"blueprint": "b", "team": "Everyone"})).unwrap();
        assert_eq!(one.team, Some(Team::One("Everyone".to_string())));
        let many: Entity = serde_json::from_value(json!({"blueprint": "b", "team": ["a", "b"]})).unwrap();
        assert_eq!(many.team, Some(Team::Many(vec!["a".to_string(), "b".to_string()])));
    }

    #[test]
    fn null_properties_and_relations_are_dropped() {
        let entity: Entity = serde_json::from_value(json!({
            "identifier": "e1",
            "title": "e1",
            "blueprint": "svc",
            "properties": {"text": "x", "unset": null, "arr": [1, 2, 3], "obj": {"a": "b"}},
            "relations": {"single": "target-1", "empty": null}
        }))
        .unwrap();
        let names: Vec<&str> = entity.properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["text", "arr", "obj"]);
        assert_eq!(entity.relation("single"), Some(&RelationTarget::One("target-1".to_string())));
        assert!(entity.relation("empty").is_none());
    }

    #[test]
    fn with_property_replaces_existing_value() {
        let entity = Entity::new("svc", "e").with_property("text", "a").with_property("text", "b");
        assert_eq!(entity.properties.len(), 1);
        assert_eq!(entity.property("text").and_then(PropertyValue::as_str), Some("b"));
    }

    #[test]
    fn entity_key_parses_import_form() {
        let key: EntityKey = "microservice:monolith".parse().unwrap();
        assert_eq!(key, EntityKey::new("microservice", "monolith"));
        assert_eq!(key.to_string(), "microservice:monolith");
    }

    #[test]
    fn entity_key_rejects_malformed_input() {
        for raw in ["no-colon", ":id", "bp:", ""] {
            assert!(raw.parse::<EntityKey>().is_err(), "{raw}");
        }
    }

    #[test]
    fn relation_target_lists_identifiers() {
        assert_eq!(RelationTarget::One("a".to_string()).identifiers(), ["a"]);
        let many = RelationTarget::Many(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(many.identifiers(), ["a", "b"]);
    }
}
