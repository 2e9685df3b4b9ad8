//! Core data models used throughout the document orchestrator.
//!
//! These types describe the pipeline configuration (provider settings and
//! document categories), the normalized field values produced from provider
//! responses, and the two persisted records: [`AnalysisResult`] and
//! [`FeedbackRecord`].

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::error::{PipelineError, Result};
use crate::schema::ExtractionSchema;

/// Ordered map of field name to normalized value.
pub type FieldMap = IndexMap<String, FieldValue>;

/// A normalized field value: a scalar, an ordered list, or a nested map.
///
/// Serializes as plain JSON, so a stored result reads the same as the
/// provider's flattened output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<FieldValue>),
    Map(FieldMap),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&FieldMap> {
        match self {
            FieldValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Look up a key when this value is a map.
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.as_map().and_then(|m| m.get(key))
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(self, FieldValue::List(_) | FieldValue::Map(_))
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Bool(b),
            Value::Number(n) => FieldValue::Number(n),
            Value::String(s) => FieldValue::String(s),
            Value::Array(items) => FieldValue::List(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => FieldValue::Map(field_map_from_json(map)),
        }
    }
}

impl From<FieldValue> for Value {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::Bool(b),
            FieldValue::Number(n) => Value::Number(n),
            FieldValue::String(s) => Value::String(s),
            FieldValue::List(items) => Value::Array(items.into_iter().map(Into::into).collect()),
            FieldValue::Map(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Number(n.into())
    }
}

impl From<f64> for FieldValue {
    /// Non-finite floats have no JSON representation and become `Null`.
    fn from(n: f64) -> Self {
        Number::from_f64(n).map_or(FieldValue::Null, FieldValue::Number)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

/// Convert a JSON object into a [`FieldMap`], keeping key order.
pub fn field_map_from_json(map: serde_json::Map<String, Value>) -> FieldMap {
    map.into_iter().map(|(k, v)| (k, v.into())).collect()
}

/// Convert a [`FieldMap`] back into a JSON object.
pub fn field_map_to_json(map: &FieldMap) -> Value {
    Value::Object(
        map.iter()
            .map(|(k, v)| (k.clone(), Value::from(v.clone())))
            .collect(),
    )
}

/// Provider routing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AzureSettings {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_router_analyzer_id")]
    pub router_analyzer_id: String,
}

pub const DEFAULT_API_VERSION: &str = "2025-05-01-preview";

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_router_analyzer_id() -> String {
    "doc-router".to_string()
}

impl Default for AzureSettings {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_version: default_api_version(),
            router_analyzer_id: default_router_analyzer_id(),
        }
    }
}

/// A document category: how the router recognizes it and which fields
/// its dedicated analyzer extracts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub display_name: String,
    pub analyzer_id: String,
    #[serde(default)]
    pub classification_prompt: String,
    #[serde(default)]
    pub extraction_schema: ExtractionSchema,
}

/// The complete pipeline configuration: provider settings plus the ordered
/// category list. Loaded wholesale and shared read-only.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub azure: AzureSettings,
    #[serde(default)]
    pub categories: Vec<Category>,
}

impl PipelineConfig {
    /// Find a category by its id.
    pub fn get_category(&self, category_id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == category_id)
    }

    /// Find a category by the id of its analyzer.
    pub fn get_category_by_analyzer(&self, analyzer_id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.analyzer_id == analyzer_id)
    }

    /// List every configuration problem. An empty list means the router
    /// and category analyzers can be provisioned.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.azure.endpoint.trim().is_empty() {
            issues.push("Azure endpoint not configured".to_string());
        }
        if self.azure.router_analyzer_id.trim().is_empty() {
            issues.push("Router analyzer id not configured".to_string());
        }
        if self.categories.is_empty() {
            issues.push("No categories configured".to_string());
        }

        let mut ids = HashSet::new();
        let mut analyzer_ids = HashSet::new();
        for (i, cat) in self.categories.iter().enumerate() {
            if cat.id.trim().is_empty() {
                issues.push(format!("Category #{} has an empty id", i + 1));
            } else if !ids.insert(cat.id.as_str()) {
                issues.push(format!("Duplicate category id '{}'", cat.id));
            }

            if cat.analyzer_id.trim().is_empty() {
                issues.push(format!("Category '{}' has an empty analyzer_id", cat.id));
            } else if !analyzer_ids.insert(cat.analyzer_id.as_str()) {
                issues.push(format!(
                    "Duplicate analyzer id '{}' (category '{}')",
                    cat.analyzer_id, cat.id
                ));
            }

            if cat.analyzer_id == self.azure.router_analyzer_id {
                issues.push(format!(
                    "Category '{}' reuses the router analyzer id '{}'",
                    cat.id, cat.analyzer_id
                ));
            }
        }

        issues
    }

    /// Fail with [`PipelineError::Configuration`] if [`validate`](Self::validate)
    /// reports anything.
    pub fn ensure_valid(&self) -> Result<()> {
        let issues = self.validate();
        if issues.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::Configuration(issues.join("; ")))
        }
    }
}

/// Outcome of one analysis run. Keyed by `document_id`; a later analysis of
/// the same document replaces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub document_id: String,
    pub category_id: Option<String>,
    pub extracted_fields: FieldMap,
    pub confidence: Option<f64>,
    pub analyzed_at: DateTime<Utc>,
}

/// Reviewer corrections for a document. Append-only; many records may
/// reference the same document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub feedback_id: String,
    pub document_id: String,
    pub corrected_fields: FieldMap,
    pub reviewer: Option<String>,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn category(id: &str, analyzer_id: &str) -> Category {
        Category {
            id: id.to_string(),
            display_name: id.to_uppercase(),
            analyzer_id: analyzer_id.to_string(),
            classification_prompt: format!("{} documents", id),
            extraction_schema: ExtractionSchema::new(),
        }
    }

    fn config(categories: Vec<Category>) -> PipelineConfig {
        PipelineConfig {
            azure: AzureSettings {
                endpoint: "https://test.example.com".to_string(),
                api_version: DEFAULT_API_VERSION.to_string(),
                router_analyzer_id: "router".to_string(),
            },
            categories,
        }
    }

    #[test]
    fn test_field_value_json_conversion_keeps_structure() {
        let raw = json!({"a": 1, "b": [true, null, "x"], "c": {"d": 2.5}});
        let value = FieldValue::from(raw.clone());
        assert_eq!(value.get("a").and_then(|v| v.as_f64()), Some(1.0));
        assert_eq!(value.get("b").and_then(|v| v.as_list()).map(|l| l.len()), Some(3));
        assert_eq!(
            value.get("c").and_then(|v| v.get("d")).and_then(|v| v.as_f64()),
            Some(2.5)
        );
        assert_eq!(Value::from(value), raw);
    }

    #[test]
    fn test_field_value_serializes_as_plain_json() {
        let mut map = FieldMap::new();
        map.insert("name".to_string(), "Jane".into());
        map.insert("total".to_string(), 1500.0.into());
        let s = serde_json::to_string(&FieldValue::Map(map)).unwrap();
        assert_eq!(s, r#"{"name":"Jane","total":1500.0}"#);
    }

    #[test]
    fn test_non_finite_float_becomes_null() {
        assert_eq!(FieldValue::from(f64::NAN), FieldValue::Null);
    }

    #[test]
    fn test_get_category_by_id_and_analyzer() {
        let cfg = config(vec![category("claim", "claim-analyzer")]);
        assert_eq!(cfg.get_category("claim").unwrap().analyzer_id, "claim-analyzer");
        assert!(cfg.get_category("missing").is_none());
        assert_eq!(cfg.get_category_by_analyzer("claim-analyzer").unwrap().id, "claim");
        assert!(cfg.get_category_by_analyzer("other").is_none());
    }

    #[test]
    fn test_valid_config_has_no_issues() {
        let cfg = config(vec![category("a", "a-analyzer"), category("b", "b-analyzer")]);
        assert!(cfg.validate().is_empty());
        assert!(cfg.ensure_valid().is_ok());
    }

    #[test]
    fn test_duplicate_ids_are_reported() {
        let cfg = config(vec![category("a", "shared"), category("a", "shared")]);
        let issues = cfg.validate();
        assert!(issues.iter().any(|i| i.contains("Duplicate category id 'a'")));
        assert!(issues.iter().any(|i| i.contains("Duplicate analyzer id 'shared'")));
    }

    #[test]
    fn test_router_id_collision_is_a_configuration_error() {
        let cfg = config(vec![category("a", "router")]);
        let err = cfg.ensure_valid().unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
        assert!(err.to_string().contains("reuses the router analyzer id"));
    }

    #[test]
    fn test_empty_config_reports_endpoint_and_categories() {
        let issues = PipelineConfig::default().validate();
        assert!(issues.contains(&"Azure endpoint not configured".to_string()));
        assert!(issues.contains(&"No categories configured".to_string()));
    }

    #[test]
    fn test_azure_settings_defaults() {
        let settings: AzureSettings = serde_json::from_value(json!({"endpoint": "https://x"})).unwrap();
        assert_eq!(settings.api_version, DEFAULT_API_VERSION);
        assert_eq!(settings.router_analyzer_id, "doc-router");
    }
}
