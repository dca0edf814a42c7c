//! Blueprints and their property and relation declarations.

use serde::{Deserialize, Serialize};

use super::property::{PropertyType, PropertyValue};
use super::OrderedMap;

/// Schema definition for a class of catalog entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "BlueprintWire", from = "BlueprintWire")]
pub struct Blueprint {
    pub identifier: String,
    pub title: String,
    pub icon: Option<String>,
    pub description: Option<String>,
    pub properties: Vec<BlueprintProperty>,
    pub relations: Vec<BlueprintRelation>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
}

/// A property declared on a blueprint.
#[derive(Debug, Clone, PartialEq)]
pub struct BlueprintProperty {
    pub identifier: String,
    pub property_type: PropertyType,
    pub title: Option<String>,
    pub description: Option<String>,
    pub format: Option<String>,
    pub default: Option<PropertyValue>,
    pub enum_values: Option<Vec<PropertyValue>>,
    pub required: bool,
}

/// A relation declared on a blueprint, pointing at another blueprint.
#[derive(Debug, Clone, PartialEq)]
pub struct BlueprintRelation {
    pub identifier: String,
    pub title: Option<String>,
    pub target: String,
    pub many: bool,
    pub required: bool,
}

impl Blueprint {
    pub fn new(identifier: &str, title: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            title: title.to_string(),
            icon: None,
            description: None,
            properties: Vec::new(),
            relations: Vec::new(),
            created_at: None,
            updated_at: None,
            created_by: None,
            updated_by: None,
        }
    }

    pub fn with_icon(mut self, icon: &str) -> Self {
        self.icon = Some(icon.to_string());
        self
    }

    pub fn with_property(mut self, property: BlueprintProperty) -> Self {
        self.properties.push(property);
        self
    }

    pub fn with_relation(mut self, relation: BlueprintRelation) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn property(&self, identifier: &str) -> Option<&BlueprintProperty> {
        self.properties.iter().find(|p| p.identifier == identifier)
    }

    pub fn relation(&self, identifier: &str) -> Option<&BlueprintRelation> {
        self.relations.iter().find(|r| r.identifier == identifier)
    }
}

impl BlueprintProperty {
    pub fn new(identifier: &str, property_type: PropertyType) -> Self {
        Self {
            identifier: identifier.to_string(),
            property_type,
            title: None,
            description: None,
            format: None,
            default: None,
            enum_values: None,
            required: false,
        }
    }

    pub fn titled(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

impl BlueprintRelation {
    pub fn new(identifier: &str, target: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            title: None,
            target: target.to_string(),
            many: false,
            required: false,
        }
    }

    pub fn titled(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn many(mut self) -> Self {
        self.many = true;
        self
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlueprintWire {
    identifier: String,
    #[serde(default)]
    title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default)]
    schema: SchemaWire,
    #[serde(default)]
    relations: OrderedMap<RelationWire>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_by: Option<String>,
}

#[derive(Default, Serialize, Deserialize)]
struct SchemaWire {
    #[serde(default)]
    properties: OrderedMap<PropertyWire>,
    #[serde(default)]
    required: Vec<String>,
}

#[derive(Serialize, Deserialize)]
struct PropertyWire {
    #[serde(rename = "type")]
    property_type: PropertyType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default: Option<PropertyValue>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    enum_values: Option<Vec<PropertyValue>>,
}

#[derive(Serialize, Deserialize)]
struct RelationWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    target: String,
    #[serde(default)]
    many: bool,
    #[serde(default)]
    required: bool,
}

impl From<Blueprint> for BlueprintWire {
    fn from(bp: Blueprint) -> Self {
        let required = bp
            .properties
            .iter()
            .filter(|p| p.required)
            .map(|p| p.identifier.clone())
            .collect();
        let properties = bp
            .properties
            .into_iter()
            .map(|p| {
                let wire = PropertyWire {
                    property_type: p.property_type,
                    title: p.title,
                    description: p.description,
                    format: p.format,
                    default: p.default,
                    enum_values: p.enum_values,
                };
                (p.identifier, wire)
            })
            .collect();
        let relations = bp
            .relations
            .into_iter()
            .map(|r| {
                let wire = RelationWire {
                    title: r.title,
                    target: r.target,
                    many: r.many,
                    required: r.required,
                };
                (r.identifier, wire)
            })
            .collect();
        BlueprintWire {
            identifier: bp.identifier,
            title: bp.title,
            icon: bp.icon,
            description: bp.description,
            schema: SchemaWire {
                properties: OrderedMap(properties),
                required,
            },
            relations: OrderedMap(relations),
            created_at: bp.created_at,
            updated_at: bp.updated_at,
            created_by: bp.created_by,
            updated_by: bp.updated_by,
        }
    }
}

impl From<BlueprintWire> for Blueprint {
    fn from(wire: BlueprintWire) -> Self {
        let required = wire.schema.required;
        let properties = wire
            .schema
            .properties
            .0
            .into_iter()
            .map(|(identifier, p)| BlueprintProperty {
                required: required.contains(&identifier),
                identifier,
                property_type: p.property_type,
                title: p.title,
                description: p.description,
                format: p.format,
                default: p.default,
                enum_values: p.enum_values,
            })
            .collect();
        let relations = wire
            .relations
            .0
            .into_iter()
            .map(|(identifier, r)| BlueprintRelation {
                identifier,
                title: r.title,
                target: r.target,
                many: r.many,
                required: r.required,
            })
            .collect();
        Blueprint {
            identifier: wire.identifier,
            title: wire.title,
            icon: wire.icon,
            description: wire.description,
            properties,
            relations,
            created_at: wire.created_at,
            updated_at: wire.updated_at,
            created_by: wire.created_by,
            updated_by: wire.updated_by,
        }
    }
}
