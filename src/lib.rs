//! # Document Orchestrator
//!
//! Classifies uploaded documents and extracts their fields through a cloud
//! document-understanding service, then stores the normalized result and
//! any reviewer corrections.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐  upload   ┌────────────┐  signed URL  ┌──────────────────┐
//! │ CLI/HTTP │──────────▶│ Blob store │─────────────▶│ Router analyzer  │
//! └────┬─────┘           └────────────┘              │ (provider side)  │
//!      │ analyze                                     └────────┬─────────┘
//!      ▼                                                      │ submit + poll
//! ┌──────────────────┐  raw response  ┌────────────┐          │
//! │ DocumentService  │◀───────────────│  Gateway   │◀─────────┘
//! └────┬─────────────┘                └────────────┘
//!      │ normalize + upsert
//!      ▼
//! ┌──────────────────────────┐
//! │ SQLite: results/feedback │
//! └──────────────────────────┘
//! ```
//!
//! Pure logic (models, schema translation, response normalization,
//! analyzer definitions, repository traits) lives in
//! [`doc_orchestrator_core`]. This crate adds the I/O around it.
//!
//! ## Quick Start
//!
//! ```bash
//! docorch init                       # create database
//! docorch validate                   # check categories and routing
//! docorch setup-analyzers            # register analyzers with the provider
//! docorch process ./claim.pdf        # upload + analyze one file
//! docorch serve                      # start HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`context`] | Application context built once at startup |
//! | [`transport`] | HTTP transport abstraction |
//! | [`gateway`] | Analyzer gateway trait and polling policy |
//! | [`content_understanding`] | Provider REST client |
//! | [`service`] | Document orchestration |
//! | [`provision`] | Analyzer provisioning |
//! | [`blob_store`] | Local blob storage with signed URLs |
//! | [`sqlite_store`] | SQLite repositories |
//! | [`server`] | HTTP API |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`analyzers`] | Analyzer administration commands |
//! | [`documents`] | Document commands |
//! | [`testing`] | Deterministic fakes |

pub mod analyzers;
pub mod blob_store;
pub mod config;
pub mod content_understanding;
pub mod context;
pub mod db;
pub mod documents;
pub mod gateway;
pub mod migrate;
pub mod provision;
pub mod server;
pub mod service;
pub mod sqlite_store;
pub mod testing;
pub mod transport;

pub use doc_orchestrator_core as core;
