//! Extraction schemas and their translation to the provider's field schema.
//!
//! Categories declare the fields they want extracted as a tree of
//! [`FieldSchema`] nodes. Before an analyzer can be registered, that tree
//! is translated node-for-node into the provider's wire format
//! ([`WireField`]).
//!
//! # Declarative format
//!
//! ```toml
//! [categories.extraction_schema.member]
//! type = "object"
//! description = "Insured member"
//!
//! [categories.extraction_schema.member.properties.name]
//! type = "string"
//!
//! [categories.extraction_schema.lines]
//! type = "array"
//! items = { type = "object", properties = { code = { type = "string" } } }
//! ```
//!
//! Parsing is permissive: a node without `type` is a string leaf, and an
//! `object`/`array` node without `properties`/`items` is kept as a leaf with
//! its declared type.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Named top-level fields of a category.
pub type ExtractionSchema = IndexMap<String, FieldSchema>;

/// Leaf type used when a node declares none.
pub const DEFAULT_FIELD_TYPE: &str = "string";

/// One node of a declarative extraction schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawFieldSchema", into = "RawFieldSchema")]
pub enum FieldSchema {
    Leaf {
        field_type: String,
        description: Option<String>,
    },
    Object {
        description: Option<String>,
        properties: IndexMap<String, FieldSchema>,
    },
    Array {
        description: Option<String>,
        item: Box<FieldSchema>,
    },
}

impl FieldSchema {
    pub fn leaf(field_type: &str) -> Self {
        FieldSchema::Leaf {
            field_type: field_type.to_string(),
            description: None,
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            FieldSchema::Leaf { description, .. }
            | FieldSchema::Object { description, .. }
            | FieldSchema::Array { description, .. } => description.as_deref(),
        }
    }

    /// Number of nodes in this subtree, including this one.
    pub fn node_count(&self) -> usize {
        match self {
            FieldSchema::Leaf { .. } => 1,
            FieldSchema::Object { properties, .. } => {
                1 + properties.values().map(FieldSchema::node_count).sum::<usize>()
            }
            FieldSchema::Array { item, .. } => 1 + item.node_count(),
        }
    }

    /// Nesting depth of this subtree; a leaf has depth 1.
    pub fn depth(&self) -> usize {
        match self {
            FieldSchema::Leaf { .. } => 1,
            FieldSchema::Object { properties, .. } => {
                1 + properties.values().map(FieldSchema::depth).max().unwrap_or(0)
            }
            FieldSchema::Array { item, .. } => 1 + item.depth(),
        }
    }
}

/// The on-disk shape of a schema node, before it is resolved into a
/// [`FieldSchema`] variant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawFieldSchema {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    field_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    properties: Option<IndexMap<String, RawFieldSchema>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    items: Option<Box<RawFieldSchema>>,
}

impl From<RawFieldSchema> for FieldSchema {
    fn from(raw: RawFieldSchema) -> Self {
        let description = raw.description.filter(|d| !d.is_empty());
        match (raw.field_type.as_deref(), raw.properties, raw.items) {
            (Some("object"), Some(properties), _) => FieldSchema::Object {
                description,
                properties: properties
                    .into_iter()
                    .map(|(name, child)| (name, child.into()))
                    .collect(),
            },
            (Some("array"), _, Some(item)) => FieldSchema::Array {
                description,
                item: Box::new((*item).into()),
            },
            (field_type, _, _) => FieldSchema::Leaf {
                field_type: field_type.unwrap_or(DEFAULT_FIELD_TYPE).to_string(),
                description,
            },
        }
    }
}

impl From<FieldSchema> for RawFieldSchema {
    fn from(schema: FieldSchema) -> Self {
        match schema {
            FieldSchema::Leaf {
                field_type,
                description,
            } => RawFieldSchema {
                field_type: Some(field_type),
                description,
                ..Default::default()
            },
            FieldSchema::Object {
                description,
                properties,
            } => RawFieldSchema {
                field_type: Some("object".to_string()),
                description,
                properties: Some(
                    properties
                        .into_iter()
                        .map(|(name, child)| (name, child.into()))
                        .collect(),
                ),
                items: None,
            },
            FieldSchema::Array { description, item } => RawFieldSchema {
                field_type: Some("array".to_string()),
                description,
                properties: None,
                items: Some(Box::new((*item).into())),
            },
        }
    }
}

/// A field definition in the provider's `fieldSchema` wire format.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireField {
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, WireField>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<WireField>>,
}

impl WireField {
    pub fn node_count(&self) -> usize {
        1 + self
            .properties
            .iter()
            .flat_map(|p| p.values())
            .map(WireField::node_count)
            .sum::<usize>()
            + self.items.as_ref().map_or(0, |i| i.node_count())
    }

    pub fn depth(&self) -> usize {
        let children = self
            .properties
            .iter()
            .flat_map(|p| p.values())
            .map(WireField::depth)
            .chain(self.items.as_ref().map(|i| i.depth()))
            .max()
            .unwrap_or(0);
        1 + children
    }
}

/// Translate a category's extraction schema into the provider's field
/// schema. Names, nesting, and order are preserved; the input is not
/// modified.
pub fn translate_schema(schema: &ExtractionSchema) -> IndexMap<String, WireField> {
    schema
        .iter()
        .map(|(name, field)| (name.clone(), translate_field(field)))
        .collect()
}

/// Translate a single schema node and everything below it.
pub fn translate_field(field: &FieldSchema) -> WireField {
    match field {
        FieldSchema::Leaf {
            field_type,
            description,
        } => WireField {
            field_type: field_type.clone(),
            description: description.clone(),
            properties: None,
            items: None,
        },
        FieldSchema::Object {
            description,
            properties,
        } => WireField {
            field_type: "object".to_string(),
            description: description.clone(),
            properties: Some(
                properties
                    .iter()
                    .map(|(name, child)| (name.clone(), translate_field(child)))
                    .collect(),
            ),
            items: None,
        },
        FieldSchema::Array { description, item } => WireField {
            field_type: "array".to_string(),
            description: description.clone(),
            properties: None,
            items: Some(Box::new(translate_field(item))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> ExtractionSchema {
        serde_json::from_value(value).unwrap()
    }

    fn claim_schema() -> ExtractionSchema {
        parse(json!({
            "claim": {
                "type": "object",
                "properties": {
                    "member": {
                        "type": "object",
                        "properties": {
                            "id": {"type": "string"},
                            "name": {"type": "string"}
                        }
                    },
                    "lines": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "code": {"type": "string"},
                                "amount": {"type": "number"}
                            }
                        }
                    }
                }
            }
        }))
    }

    #[test]
    fn test_leaf_without_type_defaults_to_string() {
        let schema = parse(json!({"name": {"description": "d"}}));
        let wire = translate_schema(&schema);
        assert_eq!(
            serde_json::to_value(&wire).unwrap(),
            json!({"name": {"type": "string", "description": "d"}})
        );
    }

    #[test]
    fn test_number_leaf_keeps_type() {
        let wire = translate_schema(&parse(json!({"amount": {"type": "number"}})));
        assert_eq!(wire["amount"].field_type, "number");
        assert!(wire["amount"].description.is_none());
    }

    #[test]
    fn test_nested_object_translation() {
        let schema = parse(json!({
            "address": {
                "type": "object",
                "description": "Address details",
                "properties": {
                    "street": {"type": "string"},
                    "city": {},
                    "zip": {"type": "string"}
                }
            }
        }));
        let wire = translate_schema(&schema);
        let address = &wire["address"];
        assert_eq!(address.field_type, "object");
        assert_eq!(address.description.as_deref(), Some("Address details"));
        let props = address.properties.as_ref().unwrap();
        assert_eq!(props.keys().collect::<Vec<_>>(), vec!["street", "city", "zip"]);
        assert_eq!(props["city"].field_type, "string");
    }

    #[test]
    fn test_array_of_objects_translation() {
        let wire = translate_schema(&claim_schema());
        let lines = &wire["claim"].properties.as_ref().unwrap()["lines"];
        assert_eq!(lines.field_type, "array");
        let item = lines.items.as_ref().unwrap();
        assert_eq!(item.field_type, "object");
        assert_eq!(item.properties.as_ref().unwrap()["code"].field_type, "string");
    }

    #[test]
    fn test_translation_preserves_node_count_and_depth() {
        let schema = claim_schema();
        let wire = translate_schema(&schema);
        for (name, field) in &schema {
            assert_eq!(field.node_count(), wire[name].node_count());
            assert_eq!(field.depth(), wire[name].depth());
        }
        assert_eq!(schema["claim"].node_count(), 8);
        assert_eq!(schema["claim"].depth(), 4);
    }

    #[test]
    fn test_object_without_properties_stays_a_typed_leaf() {
        let schema = parse(json!({"meta": {"type": "object"}, "tags": {"type": "array"}}));
        assert!(matches!(schema["meta"], FieldSchema::Leaf { .. }));
        let wire = serde_json::to_value(translate_schema(&schema)).unwrap();
        assert_eq!(wire, json!({"meta": {"type": "object"}, "tags": {"type": "array"}}));
    }

    #[test]
    fn test_translation_does_not_mutate_input() {
        let schema = claim_schema();
        let before = schema.clone();
        let _ = translate_schema(&schema);
        assert_eq!(schema, before);
    }

    #[test]
    fn test_schema_serializes_back_to_declarative_shape() {
        let source = json!({
            "total": {"type": "number", "description": "Claimed total"},
            "items": {"type": "array", "items": {"type": "string"}}
        });
        let schema = parse(source.clone());
        assert_eq!(serde_json::to_value(&schema).unwrap(), source);
    }
}
