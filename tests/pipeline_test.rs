//! End-to-end tests: stored document in, endpoints and graph out.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use openapi_graph::{
    extract_endpoints, lint_document, ApiInfo, EdgeKind, ErrorCategory, LayoutConfig,
    LocalResolver, NodeKind, Pipeline, PipelineConfig, ReferenceResolver, ResolveError,
    SchemaGraph, Severity, SpecDocument, SpecFormat, Toggle,
};
use serde_json::{json, Value};

const PETSTORE_YAML: &str = r#"
openapi: 3.0.3
info:
  title: Swagger Petstore
  version: 1.0.0
paths:
  /pets:
    get:
      operationId: listPets
      summary: List all pets
      parameters:
        - name: limit
          in: query
          schema: { type: integer, format: int32 }
      responses:
        '200':
          description: A paged array of pets
          content:
            application/json:
              schema:
                type: array
                items: { $ref: '#/components/schemas/Pet' }
        '400':
          description: bad request
          content:
            application/json:
              schema: { $ref: '#/components/schemas/Error' }
        default:
          description: unexpected error
          content:
            application/json:
              schema: { $ref: '#/components/schemas/Error' }
    post:
      operationId: createPets
      requestBody:
        required: true
        content:
          application/json:
            schema: { $ref: '#/components/schemas/Pet' }
      responses:
        '201': { description: Null response }
  /pets/{petId}:
    get:
      operationId: showPetById
      parameters:
        - name: petId
          in: path
          required: true
          schema: { type: string }
      responses:
        '200':
          description: Expected response to a valid request
          content:
            application/json:
              schema: { $ref: '#/components/schemas/Pet' }
components:
  schemas:
    Pet:
      type: object
      required: [id, name]
      properties:
        id: { type: integer, format: int64 }
        name: { type: string }
        tag: { type: string }
    Error:
      type: object
      required: [code, message]
      properties:
        code: { type: integer, format: int32 }
        message: { type: string }
"#;

fn petstore() -> SpecDocument {
    SpecDocument::new("petstore", "Petstore", PETSTORE_YAML, SpecFormat::Yaml)
}

async fn run(doc: &SpecDocument) -> openapi_graph::PipelineOutput {
    Pipeline::local(PipelineConfig::default())
        .process(doc)
        .await
        .expect("cycle should not be superseded")
}

fn node_ids(graph: &SchemaGraph) -> BTreeSet<String> {
    graph.nodes().iter().map(|n| n.id.clone()).collect()
}

fn edge_ids(graph: &SchemaGraph) -> BTreeSet<String> {
    graph.edges().iter().map(|e| e.id.clone()).collect()
}

mod extraction {
    use super::*;

    #[tokio::test]
    async fn endpoint_count_matches_method_keys() {
        let output = run(&petstore()).await;
        assert_eq!(output.endpoints.len(), 3);
        let ids: Vec<&str> = output.endpoints.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["list_pets", "create_pets", "show_pet_by_id"]);
        assert_eq!(output.spec_version_label, "OpenAPI 3.0.3");
        assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);
    }

    #[tokio::test]
    async fn json_content_with_yaml_format_still_parses() {
        let doc = SpecDocument::new(
            "mislabelled",
            "Mislabelled",
            r#"{"openapi":"3.0.0","info":{"title":"t","version":"1"},"paths":{"/a":{"get":{}},"/b":{"put":{},"head":{}}}}"#,
            SpecFormat::Yaml,
        );
        let output = run(&doc).await;
        // head is recognized by the linter but not extracted.
        assert_eq!(output.endpoints.len(), 2);
        assert!(output.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn parsed_content_passes_through() {
        let content = json!({
            "swagger": "2.0",
            "info": { "title": "Legacy", "version": "0.1" },
            "paths": { "/things": { "get": { "responses": { "200": {
                "description": "ok",
                "schema": { "type": "array", "items": { "type": "string" } }
            } } } } }
        });
        let doc = SpecDocument::new("legacy", "Legacy", content.clone(), SpecFormat::Json);
        let output = run(&doc).await;
        assert_eq!(output.normalized, content);
        assert_eq!(output.spec_version_label, "Swagger 2.0");
        assert_eq!(output.endpoints[0].id, "get_things");
    }

    #[test]
    fn object_response_without_content() {
        let doc = json!({ "paths": { "/x": { "get": {
            "responses": { "200": { "description": "ok" } }
        } } } });
        let endpoints = extract_endpoints(&doc).endpoints;
        assert_eq!(endpoints[0].responses.len(), 1);
        assert_eq!(endpoints[0].responses[0].status_code, "200");
        assert_eq!(endpoints[0].responses[0].description, "ok");
        assert!(endpoints[0].responses[0].content.is_none());
    }
}

mod validation {
    use super::*;

    #[tokio::test]
    async fn paths_only_document() {
        let doc = SpecDocument::new("bare", "Bare", r#"{"paths": {}}"#, SpecFormat::Json);
        let output = run(&doc).await;
        let errors = output
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count();
        assert!(errors >= 2);
        assert!(output.endpoints.is_empty());
        assert_eq!(output.spec_version_label, "Unknown");
    }

    #[test]
    fn missing_info_is_reported_once() {
        let diagnostics = lint_document(&json!({ "openapi": "3.0.0", "paths": { "/a": { "get": {} } } }));
        let info: Vec<_> = diagnostics
            .iter()
            .filter(|d| d.path.as_deref().is_some_and(|p| p.starts_with("info")))
            .collect();
        assert_eq!(info.len(), 1);
        assert_eq!(info[0].path.as_deref(), Some("info"));
    }

    #[tokio::test]
    async fn malformed_responses_keep_the_endpoint() {
        let doc = SpecDocument::new(
            "partial",
            "Partial",
            json!({
                "openapi": "3.0.0",
                "info": { "title": "t", "version": "1" },
                "paths": {
                    "/ok": { "get": { "responses": { "200": "fine" } } },
                    "/broken": { "get": { "responses": ["not", "a", "map"] } }
                }
            }),
            SpecFormat::Json,
        );
        let output = run(&doc).await;
        assert_eq!(output.endpoints.len(), 2);
        let broken = output.endpoints.iter().find(|e| e.path == "/broken").unwrap();
        assert!(broken.responses.is_empty());
        assert_eq!(output.diagnostics.len(), 1);
        assert_eq!(output.diagnostics[0].severity, Severity::Warning);
        assert_eq!(
            output.diagnostics[0].path.as_deref(),
            Some("paths./broken.get")
        );
    }
}

mod graph {
    use super::*;

    async fn petstore_graph() -> SchemaGraph {
        run(&petstore()).await.graph(LayoutConfig::default())
    }

    #[tokio::test]
    async fn three_responses_add_three_nodes_and_edges() {
        let mut graph = petstore_graph().await;
        let nodes = node_ids(&graph);
        let edges = edge_ids(&graph);

        // listPets also has a parameters container, so count only responses.
        graph.toggle("api-root-list_pets");
        let responses: Vec<_> = graph
            .nodes()
            .iter()
            .filter(|n| n.kind() == NodeKind::Response)
            .collect();
        assert_eq!(responses.len(), 3);

        graph.toggle("api-root-list_pets");
        assert_eq!(node_ids(&graph), nodes);
        assert_eq!(edge_ids(&graph), edges);
    }

    #[tokio::test]
    async fn show_pet_adds_response_and_parameters() {
        let mut graph = petstore_graph().await;
        let toggle = graph.toggle("api-root-show_pet_by_id");
        assert_eq!(toggle, Toggle::Expanded { nodes: 2, edges: 2 });

        graph.toggle("api-root-show_pet_by_id-parameters");
        let param = graph.node("api-root-show_pet_by_id-parameters-petId").unwrap();
        assert_eq!(param.label, "petId*: string");
    }

    #[tokio::test]
    async fn required_marker_on_properties() {
        let mut graph = petstore_graph().await;
        graph.toggle("api-root-show_pet_by_id");
        graph.toggle("api-root-show_pet_by_id-200");

        let schema = graph.node("api-root-show_pet_by_id-200-schema").unwrap();
        assert_eq!(schema.kind(), NodeKind::Schema);
        let label = |key: &str| {
            graph
                .node(&format!("api-root-show_pet_by_id-200-schema-{}", key))
                .unwrap()
                .label
                .clone()
        };
        assert_eq!(label("id"), "id*: integer");
        assert_eq!(label("name"), "name*: string");
        assert_eq!(label("tag"), "tag: string");
    }

    #[tokio::test]
    async fn building_twice_is_identical() {
        let a = petstore_graph().await;
        let b = petstore_graph().await;
        assert_eq!(node_ids(&a), node_ids(&b));
        assert_eq!(a.edges(), b.edges());
        assert_eq!(a.nodes(), b.nodes());
    }

    #[tokio::test]
    async fn toggle_idempotence_for_every_container() {
        let mut graph = petstore_graph().await;
        graph.expand_all();
        let containers: Vec<String> = graph
            .nodes()
            .iter()
            .filter(|n| graph.is_container(&n.id))
            .map(|n| n.id.clone())
            .collect();
        assert!(containers.len() > 5);

        for id in containers {
            let nodes = node_ids(&graph);
            let edges = edge_ids(&graph);
            graph.toggle(&id);
            graph.toggle(&id);
            assert_eq!(node_ids(&graph), nodes, "{}", id);
            assert_eq!(edge_ids(&graph), edges, "{}", id);
        }
    }

    #[test]
    fn unresolved_recursion_ends_in_reference_leaf() {
        let doc = json!({
            "openapi": "3.0.0",
            "paths": { "/tree": { "get": { "responses": { "200": {
                "description": "ok",
                "content": { "application/json": {
                    "schema": { "$ref": "#/components/schemas/Node" }
                } }
            } } } } },
            "components": { "schemas": { "Node": {
                "type": "object",
                "properties": {
                    "value": { "type": "string" },
                    "children": { "type": "array", "items": { "$ref": "#/components/schemas/Node" } }
                }
            } } }
        });
        let resolved = LocalResolver::new().resolve_document(&doc).unwrap();
        let endpoints = extract_endpoints(&resolved).endpoints;
        let mut graph = SchemaGraph::new(ApiInfo::default(), endpoints, LayoutConfig::default());
        graph.toggle("api-root-get_tree");
        graph.toggle("api-root-get_tree-200");

        let leaf = graph
            .node("api-root-get_tree-200-schema-children-items-ref")
            .unwrap();
        assert_eq!(leaf.label, "Node");
        let edge = graph
            .edges()
            .iter()
            .find(|e| e.target_id == leaf.id)
            .unwrap();
        assert_eq!(edge.kind, EdgeKind::Reference);
    }
}

mod resolution {
    use super::*;

    /// Waits for `x-delay-ms` before answering.
    struct DelayedResolver;

    #[async_trait]
    impl ReferenceResolver for DelayedResolver {
        async fn resolve(&self, document: Value) -> Result<Value, ResolveError> {
            let delay = document
                .get("x-delay-ms")
                .and_then(Value::as_u64)
                .unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(document)
        }
    }

    fn delayed(id: &str, delay: u64) -> SpecDocument {
        SpecDocument::new(
            id,
            id,
            json!({
                "openapi": "3.0.0",
                "info": { "title": id, "version": "1" },
                "x-delay-ms": delay,
                "paths": { "/a": { "get": {} } }
            }),
            SpecFormat::Json,
        )
    }

    #[tokio::test]
    async fn latest_cycle_wins() {
        let pipeline = Pipeline::new(Arc::new(DelayedResolver), PipelineConfig::default());
        let slow = delayed("slow", 200);
        let fast = delayed("fast", 0);

        let first = pipeline.clone();
        let older = tokio::spawn(async move { first.process(&slow).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        let newer = pipeline.process(&fast).await;

        assert!(older.await.unwrap().is_none());
        assert_eq!(newer.unwrap().api.title, "fast");
    }

    #[tokio::test]
    async fn slow_resolver_is_bounded() {
        let config = PipelineConfig {
            resolve_timeout_ms: 30,
            ..PipelineConfig::default()
        };
        let pipeline = Pipeline::new(Arc::new(DelayedResolver), config);
        let output = pipeline.process(&delayed("slow", 5_000)).await.unwrap();

        assert!(output.endpoints.is_empty());
        assert!(output.has_errors());
        assert!(output.failure.is_some());
    }

    #[tokio::test]
    async fn missing_reference_is_classified_and_redacted() {
        let doc = SpecDocument::new(
            "dangling",
            "Dangling",
            json!({
                "openapi": "3.0.0",
                "info": { "title": "t", "version": "1" },
                "paths": { "/a": { "get": { "responses": { "200": {
                    "description": "ok",
                    "content": { "application/json": {
                        "schema": { "$ref": "#/components/schemas/Ghost" }
                    } }
                } } } } }
            }),
            SpecFormat::Json,
        );
        let output = run(&doc).await;
        let failure = output.failure.unwrap();
        assert_eq!(failure.category, ErrorCategory::ReferenceError);
        assert!(failure.explanation.contains("#/components/schemas/Ghost"));
        assert!(output.endpoints.is_empty());
        assert_eq!(
            output
                .diagnostics
                .iter()
                .filter(|d| d.severity == Severity::Error)
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn malformed_component_schema_is_a_schema_error() {
        let doc = SpecDocument::new(
            "bad-schema",
            "Bad",
            "openapi: 3.0.0\ninfo: {title: t, version: '1'}\npaths:\n  /a:\n    get: {}\ncomponents:\n  schemas:\n    Pet: {type: strin}\n",
            SpecFormat::Yaml,
        );
        let output = run(&doc).await;
        let failure = output.failure.unwrap();
        assert_eq!(failure.category, ErrorCategory::SchemaError);
        assert!(output.endpoints.is_empty());
    }
}
