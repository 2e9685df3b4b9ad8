//! Analyzer provisioning.
//!
//! Registers one analyzer per category and then the router that points at
//! them. The order matters: the provider resolves the router's
//! `analyzerId` references when the router is created.

use std::sync::Arc;

use doc_orchestrator_core::analyzer::{build_category_analyzer, build_router_analyzer};
use doc_orchestrator_core::{PipelineConfig, Result};
use serde::Serialize;

use crate::gateway::AnalyzerGateway;

/// Analyzers touched by a provisioning run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProvisionReport {
    pub router_analyzer_id: String,
    pub category_analyzer_ids: Vec<String>,
}

pub struct AnalyzerProvisioner {
    gateway: Arc<dyn AnalyzerGateway>,
}

impl AnalyzerProvisioner {
    pub fn new(gateway: Arc<dyn AnalyzerGateway>) -> Self {
        Self { gateway }
    }

    /// Create or update every category analyzer, then the router.
    ///
    /// The configuration is validated first; nothing is sent to the
    /// provider when it has issues.
    pub async fn setup_all(&self, config: &PipelineConfig) -> Result<ProvisionReport> {
        config.ensure_valid()?;

        let mut category_analyzer_ids = Vec::with_capacity(config.categories.len());
        for category in &config.categories {
            let definition = build_category_analyzer(category);
            self.gateway
                .create_analyzer(&category.analyzer_id, &definition)
                .await?;
            tracing::info!(
                analyzer_id = %category.analyzer_id,
                category = %category.id,
                "category analyzer ready"
            );
            category_analyzer_ids.push(category.analyzer_id.clone());
        }

        let router_id = &config.azure.router_analyzer_id;
        self.gateway
            .create_analyzer(router_id, &build_router_analyzer(config))
            .await?;
        tracing::info!(analyzer_id = %router_id, "router analyzer ready");

        Ok(ProvisionReport {
            router_analyzer_id: router_id.clone(),
            category_analyzer_ids,
        })
    }

    /// Delete the router, then every category analyzer. Analyzers that are
    /// already gone are skipped silently.
    pub async fn teardown_all(&self, config: &PipelineConfig) -> Result<ProvisionReport> {
        let router_id = &config.azure.router_analyzer_id;
        self.gateway.delete_analyzer(router_id).await?;
        tracing::info!(analyzer_id = %router_id, "router analyzer deleted");

        let mut category_analyzer_ids = Vec::with_capacity(config.categories.len());
        for category in &config.categories {
            self.gateway.delete_analyzer(&category.analyzer_id).await?;
            tracing::info!(analyzer_id = %category.analyzer_id, "category analyzer deleted");
            category_analyzer_ids.push(category.analyzer_id.clone());
        }

        Ok(ProvisionReport {
            router_analyzer_id: router_id.clone(),
            category_analyzer_ids,
        })
    }
}
