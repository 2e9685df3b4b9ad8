//! Analyzer definitions registered with the provider.
//!
//! Two kinds of analyzer are provisioned from a [`PipelineConfig`]:
//!
//! - one **category analyzer** per [`Category`], built on the provider's
//!   prebuilt document analyzer and carrying the category's translated
//!   field schema;
//! - one **router analyzer**, which classifies a document into one of the
//!   categories and hands it to that category's analyzer.
//!
//! The router references category analyzers by id, so the category
//! analyzers must exist before the router is registered.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::models::{Category, PipelineConfig};
use crate::schema::{translate_schema, WireField};

/// Provider analyzer that both the router and the category analyzers extend.
pub const BASE_ANALYZER_ID: &str = "prebuilt-document";

pub const ROUTER_DESCRIPTION: &str = "Document classification router";

/// The body of an analyzer create-or-update request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzerDefinition {
    pub description: String,
    pub base_analyzer_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_schema: Option<IndexMap<String, WireField>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<RouterConfig>,
}

/// Classification settings of the router analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouterConfig {
    pub content_categories: Vec<ContentCategory>,
    pub enable_segment: bool,
}

/// One routing target: the category id, the prompt the router matches
/// against, and the analyzer that extracts fields for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentCategory {
    pub id: String,
    pub description: String,
    pub analyzer_id: String,
}

/// Build the field-extraction analyzer for one category.
pub fn build_category_analyzer(category: &Category) -> AnalyzerDefinition {
    AnalyzerDefinition {
        description: format!("Extractor for {}", category.display_name),
        base_analyzer_id: BASE_ANALYZER_ID.to_string(),
        field_schema: Some(translate_schema(&category.extraction_schema)),
        config: None,
    }
}

/// Build the router analyzer listing every configured category in order.
/// Segmentation is always disabled.
pub fn build_router_analyzer(config: &PipelineConfig) -> AnalyzerDefinition {
    let content_categories = config
        .categories
        .iter()
        .map(|c| ContentCategory {
            id: c.id.clone(),
            description: c.classification_prompt.clone(),
            analyzer_id: c.analyzer_id.clone(),
        })
        .collect();

    AnalyzerDefinition {
        description: ROUTER_DESCRIPTION.to_string(),
        base_analyzer_id: BASE_ANALYZER_ID.to_string(),
        field_schema: None,
        config: Some(RouterConfig {
            content_categories,
            enable_segment: false,
        }),
    }
}
