//! # Document Orchestrator Core
//!
//! Shared, I/O-free logic for the document orchestrator: data models,
//! extraction-schema translation, provider response normalization,
//! analyzer-definition builders, and the collaborator traits (repositories
//! and blob storage) the orchestration service is written against.
//!
//! This crate contains no tokio, sqlx, HTTP client, or filesystem access.
//! Everything that talks to the outside world lives in the
//! `doc-orchestrator` package.

pub mod analyzer;
pub mod blob;
pub mod error;
pub mod models;
pub mod normalize;
pub mod schema;
pub mod store;

pub use error::{PipelineError, Result};
pub use models::{
    AnalysisResult, AzureSettings, Category, FeedbackRecord, FieldMap, FieldValue, PipelineConfig,
};
