//! Parse cycle orchestration.
//!
//! One call to [`Pipeline::process`] is one parse cycle: normalize the stored
//! content, lint it, hand it to the resolver (bounded wait), then extract
//! endpoints. Only a resolution failure stops a cycle early, and even then
//! the caller gets the lint diagnostics plus one classified error.
//!
//! Cycles are numbered. When a newer cycle starts before an older one
//! finishes, the older result is dropped instead of returned.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::classifier::{self, Classifier, Diagnosis, DEFAULT_MAX_MESSAGE_LEN};
use crate::error::ResolveError;
use crate::expansion::SchemaGraph;
use crate::extractor::{extract_endpoints, Endpoint};
use crate::layout::LayoutConfig;
use crate::linter::{lint_document, Diagnostic, Severity};
use crate::loader::normalize;
use crate::resolver::{LocalResolver, ReferenceResolver};
use crate::types::{spec_version_label, ApiInfo, SpecDocument};

/// Pipeline tuning, read from the `[pipeline]` config table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// How long to wait for the resolver before giving up.
    pub resolve_timeout_ms: u64,
    /// Upper bound on classified failure explanations.
    pub max_message_len: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            resolve_timeout_ms: 10_000,
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
        }
    }
}

impl PipelineConfig {
    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_millis(self.resolve_timeout_ms)
    }
}

/// Everything one parse cycle produced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineOutput {
    pub document_id: String,
    pub endpoints: Vec<Endpoint>,
    pub diagnostics: Vec<Diagnostic>,
    /// "OpenAPI 3.0.3", "Swagger 2.0" or "Unknown".
    pub spec_version_label: String,
    pub api: ApiInfo,
    /// Parsed document before resolution.
    #[serde(skip)]
    pub normalized: Value,
    /// Resolved document, absent when resolution failed.
    #[serde(skip)]
    pub resolved: Option<Value>,
    /// Classified parse or resolution failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<Diagnosis>,
}

impl PipelineOutput {
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Initial graph for this output, nothing expanded.
    pub fn graph(&self, layout: LayoutConfig) -> SchemaGraph {
        SchemaGraph::new(self.api.clone(), self.endpoints.clone(), layout)
    }
}

/// Runs parse cycles against a shared resolver.
///
/// Cheap to clone; clones share the resolver and the cycle counter, so
/// latest-wins holds across all of them.
#[derive(Clone)]
pub struct Pipeline {
    resolver: Arc<dyn ReferenceResolver>,
    generation: Arc<AtomicU64>,
    config: PipelineConfig,
    classifier: Classifier,
}

impl Pipeline {
    pub fn new(resolver: Arc<dyn ReferenceResolver>, config: PipelineConfig) -> Self {
        Self {
            resolver,
            generation: Arc::new(AtomicU64::new(0)),
            classifier: Classifier::new(config.max_message_len),
            config,
        }
    }

    /// Pipeline backed by [`LocalResolver`].
    pub fn local(config: PipelineConfig) -> Self {
        Self::new(Arc::new(LocalResolver::new()), config)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one parse cycle.
    ///
    /// Returns `None` when another cycle was started on this pipeline (or a
    /// clone of it) while this one was running.
    pub async fn process(&self, doc: &SpecDocument) -> Option<PipelineOutput> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        info!(document = %doc.id, generation, "parse cycle started");

        let output = self.run(doc).await;

        if self.generation.load(Ordering::SeqCst) != generation {
            info!(document = %doc.id, generation, "discarding superseded parse cycle");
            return None;
        }
        debug!(
            document = %doc.id,
            endpoints = output.endpoints.len(),
            diagnostics = output.diagnostics.len(),
            "parse cycle finished"
        );
        Some(output)
    }

    async fn run(&self, doc: &SpecDocument) -> PipelineOutput {
        let mut output = PipelineOutput {
            document_id: doc.id.clone(),
            endpoints: Vec::new(),
            diagnostics: Vec::new(),
            spec_version_label: "Unknown".to_string(),
            api: ApiInfo::default(),
            normalized: Value::Null,
            resolved: None,
            failure: None,
        };

        let normalized = match normalize(&doc.content, doc.format) {
            Ok(value) => value,
            Err(e) => {
                warn!(document = %doc.id, error = %e, "document could not be parsed");
                let message = classifier::redact(&e.to_string());
                output.failure = Some(self.classifier.classify(&message));
                output.diagnostics.push(Diagnostic::error(None, message));
                return output;
            }
        };

        output.diagnostics = lint_document(&normalized);
        output.spec_version_label = spec_version_label(&normalized);
        output.api = ApiInfo::from_document(&normalized);

        if normalized.is_object() {
            match self.resolve(normalized.clone()).await {
                Ok(resolved) => {
                    let extraction = extract_endpoints(&resolved);
                    output.endpoints = extraction.endpoints;
                    output.diagnostics.extend(extraction.diagnostics);
                    output.resolved = Some(resolved);
                }
                Err(e) => {
                    let diagnosis = self.classifier.classify(&e.to_string());
                    warn!(
                        document = %doc.id,
                        category = %diagnosis.category,
                        "reference resolution failed"
                    );
                    output
                        .diagnostics
                        .push(Diagnostic::error(None, diagnosis.to_string()));
                    output.failure = Some(diagnosis);
                }
            }
        }

        output.normalized = normalized;
        output
    }

    async fn resolve(&self, document: Value) -> Result<Value, ResolveError> {
        let timeout = self.config.resolve_timeout();
        match tokio::time::timeout(timeout, self.resolver.resolve(document)).await {
            Ok(result) => result,
            Err(_) => Err(ResolveError::Timeout { timeout }),
        }
    }
}
