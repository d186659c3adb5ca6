//! OpenAPI Graph
//!
//! Ingests OpenAPI 3.x / Swagger 2.0 documents and derives a normalized
//! endpoint list plus an expandable node/edge graph of the document's
//! structure, ready for a visualization layer.
//!
//! # Example
//!
//! ```
//! use openapi_graph::{
//!     extract_endpoints, lint_document, parse_document, LayoutConfig, LocalResolver,
//!     SchemaGraph, ApiInfo, Toggle,
//! };
//!
//! let text = r#"
//! openapi: 3.0.0
//! info: { title: Pets, version: "1" }
//! paths:
//!   /pets:
//!     get:
//!       operationId: listPets
//!       responses:
//!         "200":
//!           description: ok
//!           content:
//!             application/json:
//!               schema:
//!                 type: object
//!                 required: [id]
//!                 properties:
//!                   id: { type: integer }
//!                   name: { type: string }
//! "#;
//!
//! let doc = parse_document(text, None).unwrap();
//! assert!(lint_document(&doc).is_empty());
//!
//! let resolved = LocalResolver::new().resolve_document(&doc).unwrap();
//! let endpoints = extract_endpoints(&resolved).endpoints;
//! assert_eq!(endpoints[0].id, "list_pets");
//!
//! let mut graph = SchemaGraph::new(ApiInfo::from_document(&doc), endpoints, LayoutConfig::default());
//! assert_eq!(graph.toggle("api-root-list_pets"), Toggle::Expanded { nodes: 1, edges: 1 });
//! graph.toggle("api-root-list_pets-200");
//!
//! let labels: Vec<&str> = graph.nodes().iter().map(|n| n.label.as_str()).collect();
//! assert!(labels.contains(&"id*: integer"));
//! assert!(labels.contains(&"name: string"));
//! ```
//!
//! # Pipeline
//!
//! | Stage | Module | Failure handling |
//! |-------|--------|------------------|
//! | Parse | `loader` | Declared format first, then the other one |
//! | Lint | `linter` | Diagnostics only, never aborts |
//! | Resolve | `resolver` | Bounded wait; one classified error |
//! | Extract | `extractor` | Per-operation warnings |
//! | Graph | `graph`, `layout`, `expansion` | Malformed schemas skipped |
//!
//! [`Pipeline`] runs the stages for a [`SpecDocument`]; [`Session`] keeps
//! the selected document's graph and expansion state.

mod classifier;
mod config;
mod error;
mod expansion;
mod extractor;
mod graph;
mod layout;
mod linter;
mod loader;
mod pipeline;
mod resolver;
mod session;
mod types;

pub use classifier::{classify, redact, Classifier, Diagnosis, ErrorCategory};
pub use config::{Config, ENV_MAX_MESSAGE_LEN, ENV_RESOLVE_TIMEOUT_MS};
pub use error::{ConfigError, LoadError, ParseError, ResolveError};
pub use expansion::{SchemaGraph, Toggle};
pub use extractor::{
    extract_endpoints, slugify, Endpoint, Extraction, MediaContent, Parameter, RequestBody,
    ResponseDescriptor,
};
pub use graph::{
    node_id, ref_name, sanitize, EdgeKind, GraphEdge, GraphNode, NodeData, NodeKind, Position,
    ROOT_ID,
};
pub use layout::LayoutConfig;
pub use linter::{
    is_supported_openapi_version, lint, lint_document, lint_file, Diagnostic, FileResult,
    FileStatus, LintResult, Severity,
};
pub use loader::{
    detect_format, is_url, load_document, load_document_auto, navigate_fragment, normalize,
    parse_document, render_document,
};
pub use pipeline::{Pipeline, PipelineConfig, PipelineOutput};
pub use resolver::{LocalResolver, ReferenceResolver, DEFAULT_NODE_LIMIT};
pub use session::Session;
pub use types::{
    json_type_name, spec_version_label, ApiInfo, DocumentContent, SpecDocument, SpecFormat,
    OPERATION_METHODS, RECOGNIZED_METHODS,
};

#[cfg(feature = "remote")]
pub use loader::load_document_url;
