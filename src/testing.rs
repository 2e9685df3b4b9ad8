//! Deterministic fakes for tests.
//!
//! None of these touch the network or the filesystem:
//!
//! - [`ScriptedTransport`] replays queued HTTP responses and records every
//!   request, for exercising the provider client's protocol handling.
//! - [`FakeGateway`] stands in for the whole provider behind
//!   [`AnalyzerGateway`], with optional per-call delays for race tests.
//! - [`MemoryBlobStore`] keeps uploaded objects in a map.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use doc_orchestrator_core::analyzer::AnalyzerDefinition;
use doc_orchestrator_core::blob::{BlobObject, BlobStore};
use doc_orchestrator_core::{PipelineError, Result};
use serde_json::Value;

use crate::gateway::AnalyzerGateway;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};

/// Replays queued responses in order.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    responses: Arc<Mutex<VecDeque<HttpResponse>>>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response.
    pub fn push(&self, response: HttpResponse) -> &Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    /// Queue a `status` response with a JSON body.
    pub fn push_json(&self, status: u16, body: Value) -> &Self {
        self.push(HttpResponse::new(status, body.to_string()))
    }

    /// Every request sent so far, oldest first.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses.lock().unwrap().pop_front().ok_or_else(|| {
            PipelineError::Transport(format!(
                "no scripted response for {} {}",
                request.method.as_str(),
                request.url
            ))
        })
    }
}

/// Record of a call made to the [`FakeGateway`].
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    Analyze {
        analyzer_id: String,
        document_url: String,
    },
    CreateAnalyzer {
        analyzer_id: String,
        definition: Value,
    },
    GetAnalyzer {
        analyzer_id: String,
    },
    DeleteAnalyzer {
        analyzer_id: String,
    },
}

struct ScriptedAnalysis {
    outcome: Result<Value>,
    delay: Duration,
}

/// An in-process provider.
///
/// `analyze` pops scripted outcomes in call order; each outcome may wait
/// before returning. Analyzer definitions are kept in a map so
/// create/get/delete behave like the real upsert semantics.
#[derive(Default)]
pub struct FakeGateway {
    analyses: Mutex<VecDeque<ScriptedAnalysis>>,
    analyzers: RwLock<HashMap<String, Value>>,
    calls: Mutex<Vec<GatewayCall>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful analysis returning `result`.
    pub fn with_result(self, result: Value) -> Self {
        self.with_delayed_result(result, Duration::ZERO)
    }

    /// Queue a successful analysis that completes after `delay`.
    pub fn with_delayed_result(self, result: Value, delay: Duration) -> Self {
        self.analyses.lock().unwrap().push_back(ScriptedAnalysis {
            outcome: Ok(result),
            delay,
        });
        self
    }

    /// Queue a failing analysis.
    pub fn with_error(self, error: PipelineError) -> Self {
        self.analyses.lock().unwrap().push_back(ScriptedAnalysis {
            outcome: Err(error),
            delay: Duration::ZERO,
        });
        self
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Analyzer ids passed to `create_analyzer`, in call order.
    pub fn created_analyzers(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                GatewayCall::CreateAnalyzer { analyzer_id, .. } => Some(analyzer_id),
                _ => None,
            })
            .collect()
    }

    /// Analyzer ids passed to `delete_analyzer`, in call order.
    pub fn deleted_analyzers(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                GatewayCall::DeleteAnalyzer { analyzer_id } => Some(analyzer_id),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: GatewayCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl AnalyzerGateway for FakeGateway {
    async fn analyze(&self, analyzer_id: &str, document_url: &str) -> Result<Value> {
        self.record(GatewayCall::Analyze {
            analyzer_id: analyzer_id.to_string(),
            document_url: document_url.to_string(),
        });
        let scripted = self.analyses.lock().unwrap().pop_front();
        let Some(scripted) = scripted else {
            return Err(PipelineError::ProviderProtocol(
                "no scripted analysis outcome".to_string(),
            ));
        };
        if !scripted.delay.is_zero() {
            tokio::time::sleep(scripted.delay).await;
        }
        scripted.outcome
    }

    async fn create_analyzer(
        &self,
        analyzer_id: &str,
        definition: &AnalyzerDefinition,
    ) -> Result<()> {
        let definition = serde_json::to_value(definition)?;
        self.record(GatewayCall::CreateAnalyzer {
            analyzer_id: analyzer_id.to_string(),
            definition: definition.clone(),
        });
        self.analyzers
            .write()
            .unwrap()
            .insert(analyzer_id.to_string(), definition);
        Ok(())
    }

    async fn get_analyzer(&self, analyzer_id: &str) -> Result<Option<Value>> {
        self.record(GatewayCall::GetAnalyzer {
            analyzer_id: analyzer_id.to_string(),
        });
        Ok(self.analyzers.read().unwrap().get(analyzer_id).cloned())
    }

    async fn delete_analyzer(&self, analyzer_id: &str) -> Result<()> {
        self.record(GatewayCall::DeleteAnalyzer {
            analyzer_id: analyzer_id.to_string(),
        });
        self.analyzers.write().unwrap().remove(analyzer_id);
        Ok(())
    }
}

/// Blob store backed by a map. URLs look like `memory://blobs/{name}`.
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: RwLock<HashMap<String, BlobObject>>,
}

const MEMORY_PREFIX: &str = "memory://blobs/";

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.objects.read().unwrap().keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, name: &str, bytes: &[u8], content_type: &str) -> Result<String> {
        self.objects.write().unwrap().insert(
            name.to_string(),
            BlobObject {
                bytes: bytes.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        Ok(format!("{}{}", MEMORY_PREFIX, name))
    }

    async fn temporary_access_url(&self, name: &str, ttl: Duration) -> Result<String> {
        Ok(format!("{}{}?ttl={}", MEMORY_PREFIX, name, ttl.as_secs()))
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.objects.read().unwrap().contains_key(name))
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.objects
            .write()
            .unwrap()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| PipelineError::not_found("blob", name))
    }

    async fn read(&self, name: &str) -> Result<BlobObject> {
        self.objects
            .read()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| PipelineError::not_found("blob", name))
    }

    fn blob_name_for(&self, url: &str) -> String {
        match url.strip_prefix(MEMORY_PREFIX) {
            Some(rest) => rest.split_once('?').map_or(rest, |(name, _)| name).to_string(),
            None => url.to_string(),
        }
    }
}
