//! Normalization of provider analysis responses.
//!
//! The provider returns extracted fields as a nested tree where each node
//! is wrapped in metadata (`{"type": "...", "value": ...}` or
//! `{"values": [...]}`). [`normalize_fields`] strips that wrapping and
//! produces a plain [`FieldMap`]. [`extract_classification`] reads the
//! router's category decision from the `contents` list.
//!
//! # Node rules, in priority order
//!
//! | Node shape | Output |
//! |------------|--------|
//! | object with a `value` key | the `value`, as-is |
//! | object with a `values` key | a list; object elements are normalized recursively |
//! | any other object | a nested map, normalized recursively |
//! | non-object | passed through unchanged |

use serde::Serialize;
use serde_json::{Map, Value};

use crate::models::{FieldMap, FieldValue};

/// How a single response node is interpreted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResponseNode<'a> {
    /// Carries a `value` key.
    Value(&'a Value),
    /// Carries a `values` key.
    Values(&'a Value),
    /// An object without either marker.
    Object(&'a Map<String, Value>),
    /// Not an object at all.
    Scalar(&'a Value),
}

impl<'a> ResponseNode<'a> {
    pub fn classify(node: &'a Value) -> Self {
        match node {
            Value::Object(map) => {
                if let Some(value) = map.get("value") {
                    ResponseNode::Value(value)
                } else if let Some(values) = map.get("values") {
                    ResponseNode::Values(values)
                } else {
                    ResponseNode::Object(map)
                }
            }
            other => ResponseNode::Scalar(other),
        }
    }
}

/// The router's category decision.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Classification {
    pub category_id: Option<String>,
    pub confidence: Option<f64>,
}

/// A provider response reduced to a classification and a field map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedAnalysis {
    pub classification: Classification,
    pub fields: FieldMap,
}

/// Flatten a provider `fields` object into a [`FieldMap`].
pub fn normalize_fields(fields: &Map<String, Value>) -> FieldMap {
    fields
        .iter()
        .map(|(name, node)| (name.clone(), normalize_node(node)))
        .collect()
}

/// Flatten one response node according to the module rules.
pub fn normalize_node(node: &Value) -> FieldValue {
    match ResponseNode::classify(node) {
        ResponseNode::Value(value) => FieldValue::from(value.clone()),
        ResponseNode::Values(values) => match values {
            Value::Array(items) => FieldValue::List(
                items
                    .iter()
                    .map(|item| match item {
                        Value::Object(map) => FieldValue::Map(normalize_fields(map)),
                        other => FieldValue::from(other.clone()),
                    })
                    .collect(),
            ),
            // A non-list `values` is kept verbatim rather than dropped.
            other => FieldValue::from(other.clone()),
        },
        ResponseNode::Object(map) => FieldValue::Map(normalize_fields(map)),
        ResponseNode::Scalar(value) => FieldValue::from(value.clone()),
    }
}

/// Pick the category from the first `contents` entry that carries a
/// non-empty `category` object.
///
/// Later entries are ignored even when their confidence is higher.
pub fn extract_classification(response: &Value) -> Classification {
    let Some(contents) = response.get("contents").and_then(Value::as_array) else {
        return Classification::default();
    };

    contents
        .iter()
        .filter_map(|content| content.get("category").and_then(Value::as_object))
        .find(|category| !category.is_empty())
        .map(|category| Classification {
            category_id: category
                .get("id")
                .and_then(Value::as_str)
                .map(str::to_string),
            confidence: category.get("confidence").and_then(Value::as_f64),
        })
        .unwrap_or_default()
}

/// Reduce a full provider response to its classification and fields.
///
/// Fields are read from the top-level `fields` object; a missing or
/// non-object `fields` yields an empty map.
pub fn normalize_response(response: &Value) -> NormalizedAnalysis {
    let fields = response
        .get("fields")
        .and_then(Value::as_object)
        .map(normalize_fields)
        .unwrap_or_default();

    NormalizedAnalysis {
        classification: extract_classification(response),
        fields,
    }
}
