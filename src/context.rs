//! Application context.
//!
//! [`AppContext`] is assembled once at startup from [`Config`] and handed
//! by reference to CLI commands and HTTP handlers. Every collaborator is
//! created here and shared through `Arc`.

use std::sync::Arc;

use anyhow::Result;
use doc_orchestrator_core::blob::BlobStore;
use doc_orchestrator_core::store::{FeedbackRepository, ResultRepository};
use doc_orchestrator_core::PipelineConfig;
use sqlx::SqlitePool;

use crate::blob_store::LocalBlobStore;
use crate::config::Config;
use crate::content_understanding::ContentUnderstandingClient;
use crate::db;
use crate::gateway::AnalyzerGateway;
use crate::migrate;
use crate::provision::AnalyzerProvisioner;
use crate::service::DocumentService;
use crate::sqlite_store::{SqliteFeedbackRepository, SqliteResultRepository};

pub struct AppContext {
    pub config: Arc<Config>,
    pub pipeline: Arc<PipelineConfig>,
    pub pool: SqlitePool,
    pub blobs: Arc<LocalBlobStore>,
    pub gateway: Arc<dyn AnalyzerGateway>,
    pub service: Arc<DocumentService>,
    pub provisioner: Arc<AnalyzerProvisioner>,
}

impl AppContext {
    /// Connect to the database, apply migrations, and build the production
    /// provider client from the environment.
    pub async fn build(config: &Config) -> Result<Self> {
        let gateway: Arc<dyn AnalyzerGateway> =
            Arc::new(ContentUnderstandingClient::from_config(config)?);
        Self::with_gateway(config, gateway).await
    }

    /// Like [`build`](Self::build) but with a caller-supplied gateway.
    pub async fn with_gateway(config: &Config, gateway: Arc<dyn AnalyzerGateway>) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::run_migrations(&pool).await?;

        let pipeline = Arc::new(config.pipeline());
        let blobs = Arc::new(LocalBlobStore::from_config(&config.storage));
        let results: Arc<dyn ResultRepository> =
            Arc::new(SqliteResultRepository::new(pool.clone()));
        let feedback: Arc<dyn FeedbackRepository> =
            Arc::new(SqliteFeedbackRepository::new(pool.clone()));

        let blob_store: Arc<dyn BlobStore> = blobs.clone();
        let service = Arc::new(DocumentService::new(
            blob_store,
            gateway.clone(),
            results,
            feedback,
            pipeline.clone(),
            config.storage.access_ttl(),
        ));
        let provisioner = Arc::new(AnalyzerProvisioner::new(gateway.clone()));

        Ok(Self {
            config: Arc::new(config.clone()),
            pipeline,
            pool,
            blobs,
            gateway,
            service,
            provisioner,
        })
    }
}
