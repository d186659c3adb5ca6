//! Node/edge graph derived from extracted endpoints.
//!
//! The builder only ever produces *fragments*: the root fragment (API node
//! plus one node per endpoint) and the immediate subtree of one container.
//! [`crate::expansion::SchemaGraph`] decides which fragments are live.
//!
//! Node ids are a pure function of the parent id and a local key:
//! `parent + "-" + sanitize(key)`. Sanitized keys never contain `-`, so every
//! descendant of `X` (and nothing else) has an id starting with `X-`.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;

use crate::extractor::Endpoint;
use crate::types::ApiInfo;

/// Id of the API root node.
pub const ROOT_ID: &str = "api-root";

/// Schemas nested deeper than this are cut off.
const MAX_SCHEMA_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Node category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Api,
    Endpoint,
    Request,
    Response,
    Schema,
    Property,
    Array,
}

/// Kind-specific payload of a node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum NodeData {
    Api {
        title: String,
        version: String,
    },
    Endpoint {
        endpoint_id: String,
        method: String,
        path: String,
        summary: String,
    },
    Request {
        media_type: Option<String>,
    },
    Response {
        status_code: String,
        description: String,
        media_type: Option<String>,
    },
    /// `reference` is set on synthetic `$ref` leaves.
    Schema {
        reference: Option<String>,
    },
    Property {
        name: String,
        property_type: String,
        required: bool,
    },
    Array {
        item_type: String,
    },
}

impl NodeData {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeData::Api { .. } => NodeKind::Api,
            NodeData::Endpoint { .. } => NodeKind::Endpoint,
            NodeData::Request { .. } => NodeKind::Request,
            NodeData::Response { .. } => NodeKind::Response,
            NodeData::Schema { .. } => NodeKind::Schema,
            NodeData::Property { .. } => NodeKind::Property,
            NodeData::Array { .. } => NodeKind::Array,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub position: Position,
    pub data: NodeData,
}

impl GraphNode {
    pub fn kind(&self) -> NodeKind {
        self.data.kind()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    /// Parent/child containment.
    Structural,
    /// Edge into a synthetic `$ref` leaf.
    Reference,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    pub kind: EdgeKind,
}

impl GraphEdge {
    fn new(source: &str, target: &str, kind: EdgeKind) -> Self {
        // Every node has exactly one incoming edge, so the target names it.
        Self {
            id: format!("edge:{}", target),
            source_id: source.to_string(),
            target_id: target.to_string(),
            kind,
        }
    }
}

/// What a container expands into, captured when the container is created.
#[derive(Debug, Clone, PartialEq)]
pub enum Expandable {
    /// Index into the graph's endpoint list.
    Endpoint(usize),
    /// Parameters of the endpoint at this index.
    Parameters(usize),
    /// Request or response body schema.
    Body(Value),
}

/// Nodes and edges produced by one build step, in pre-order.
#[derive(Debug, Clone, Default)]
pub struct Fragment {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    /// Expandable nodes created by this step.
    pub containers: Vec<(String, Expandable)>,
    /// Depth of each node below the fragment's anchor (1 = direct child).
    pub(crate) depths: Vec<usize>,
}

impl Fragment {
    fn push(&mut self, parent: &str, node: GraphNode, edge: EdgeKind, depth: usize) {
        self.edges.push(GraphEdge::new(parent, &node.id, edge));
        self.nodes.push(node);
        self.depths.push(depth);
    }
}

/// Make a key safe for use as one id segment.
///
/// Anything outside `[A-Za-z0-9_]` becomes `_`. An empty key gets a short
/// random token so sibling ids stay distinct.
pub fn sanitize(key: &str) -> String {
    if key.is_empty() {
        return format!("k{:06x}", rand::random::<u32>() & 0x00ff_ffff);
    }
    key.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Id of the child `key` under `parent`.
pub fn node_id(parent: &str, key: &str) -> String {
    format!("{}-{}", parent, sanitize(key))
}

/// Hands out child ids under one parent, numbering collisions
/// (`user-name` and `user_name` both sanitize to `user_name`).
struct Siblings<'a> {
    parent: &'a str,
    used: HashSet<String>,
}

impl<'a> Siblings<'a> {
    fn new(parent: &'a str) -> Self {
        Self {
            parent,
            used: HashSet::new(),
        }
    }

    fn id(&mut self, key: &str) -> String {
        let base = node_id(self.parent, key);
        let mut id = base.clone();
        let mut n = 1;
        while !self.used.insert(id.clone()) {
            n += 1;
            id = format!("{}_{}", base, n);
        }
        id
    }
}

/// Last segment of a `$ref` pointer: `#/components/schemas/Pet` → `Pet`.
pub fn ref_name(reference: &str) -> &str {
    reference.rsplit('/').next().unwrap_or(reference)
}

fn ref_of(schema: &Value) -> Option<&str> {
    schema.get("$ref").and_then(Value::as_str)
}

/// Short type description of a schema fragment.
fn type_label(schema: &Value) -> String {
    if let Some(reference) = ref_of(schema) {
        return ref_name(reference).to_string();
    }
    match schema.get("type") {
        Some(Value::String(t)) => t.clone(),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join("|"),
        _ if schema.get("properties").is_some() => "object".to_string(),
        _ if schema.get("items").is_some() => "array".to_string(),
        _ => "any".to_string(),
    }
}

fn property_label(name: &str, required: bool, property_type: &str) -> String {
    if required {
        format!("{}*: {}", name, property_type)
    } else {
        format!("{}: {}", name, property_type)
    }
}

fn reference_leaf(id: String, reference: &str) -> GraphNode {
    GraphNode {
        id,
        label: ref_name(reference).to_string(),
        position: Position::default(),
        data: NodeData::Schema {
            reference: Some(reference.to_string()),
        },
    }
}

/// Root fragment: the API node and one node per endpoint.
///
/// Endpoint nodes are registered as containers.
pub fn root_fragment(api: &ApiInfo, endpoints: &[Endpoint]) -> Fragment {
    let mut fragment = Fragment::default();
    fragment.nodes.push(GraphNode {
        id: ROOT_ID.to_string(),
        label: api.title.clone(),
        position: Position::default(),
        data: NodeData::Api {
            title: api.title.clone(),
            version: api.version.clone(),
        },
    });
    fragment.depths.push(0);

    let mut siblings = Siblings::new(ROOT_ID);
    for (index, endpoint) in endpoints.iter().enumerate() {
        let id = siblings.id(&endpoint.id);
        fragment.containers.push((id.clone(), Expandable::Endpoint(index)));
        fragment.push(
            ROOT_ID,
            GraphNode {
                id,
                label: format!("{} {}", endpoint.method, endpoint.path),
                position: Position::default(),
                data: NodeData::Endpoint {
                    endpoint_id: endpoint.id.clone(),
                    method: endpoint.method.clone(),
                    path: endpoint.path.clone(),
                    summary: endpoint.summary.clone(),
                },
            },
            EdgeKind::Structural,
            1,
        );
    }
    fragment
}

/// Immediate subtree of the container `id`.
///
/// An endpoint index that is out of range yields an empty fragment.
pub fn expand(id: &str, what: &Expandable, endpoints: &[Endpoint]) -> Fragment {
    let mut fragment = Fragment::default();
    match what {
        Expandable::Endpoint(index) => {
            if let Some(endpoint) = endpoints.get(*index) {
                endpoint_children(id, *index, endpoint, &mut fragment);
            }
        }
        Expandable::Parameters(index) => {
            if let Some(endpoint) = endpoints.get(*index) {
                parameter_children(id, endpoint, &mut fragment);
            }
        }
        Expandable::Body(schema) => body_children(id, schema, &mut fragment),
    }
    fragment
}

fn endpoint_children(id: &str, index: usize, endpoint: &Endpoint, out: &mut Fragment) {
    let mut siblings = Siblings::new(id);

    if let Some(schema) = endpoint.request_schema() {
        let request_id = siblings.id("request");
        out.containers
            .push((request_id.clone(), Expandable::Body(schema.clone())));
        let media_type = endpoint
            .request_body
            .as_ref()
            .and_then(|b| b.content.as_ref())
            .map(|c| c.media_type.clone());
        out.push(
            id,
            GraphNode {
                id: request_id,
                label: "request".to_string(),
                position: Position::default(),
                data: NodeData::Request { media_type },
            },
            EdgeKind::Structural,
            1,
        );
    }

    for response in &endpoint.responses {
        let Some(schema) = response.schema() else {
            continue;
        };
        let response_id = siblings.id(&response.status_code);
        out.containers
            .push((response_id.clone(), Expandable::Body(schema.clone())));
        out.push(
            id,
            GraphNode {
                id: response_id,
                label: response.status_code.clone(),
                position: Position::default(),
                data: NodeData::Response {
                    status_code: response.status_code.clone(),
                    description: response.description.clone(),
                    media_type: response.content.as_ref().map(|c| c.media_type.clone()),
                },
            },
            EdgeKind::Structural,
            1,
        );
    }

    if endpoint.parameters.iter().any(|p| p.schema.is_some()) {
        let params_id = siblings.id("parameters");
        out.containers
            .push((params_id.clone(), Expandable::Parameters(index)));
        out.push(
            id,
            GraphNode {
                id: params_id,
                label: "parameters".to_string(),
                position: Position::default(),
                data: NodeData::Schema { reference: None },
            },
            EdgeKind::Structural,
            1,
        );
    }
}

fn parameter_children(id: &str, endpoint: &Endpoint, out: &mut Fragment) {
    let mut siblings = Siblings::new(id);
    for param in &endpoint.parameters {
        let Some(schema) = &param.schema else {
            continue;
        };
        let param_id = siblings.id(&param.name);
        out.push(
            id,
            GraphNode {
                id: param_id.clone(),
                label: property_label(&param.name, param.required, &param.param_type),
                position: Position::default(),
                data: NodeData::Property {
                    name: param.name.clone(),
                    property_type: param.param_type.clone(),
                    required: param.required,
                },
            },
            EdgeKind::Structural,
            1,
        );
        walk_schema(&param_id, schema, 2, out);
    }
}

fn body_children(id: &str, schema: &Value, out: &mut Fragment) {
    if !schema.is_object() {
        return;
    }
    if let Some(reference) = ref_of(schema) {
        out.push(
            id,
            reference_leaf(node_id(id, "ref"), reference),
            EdgeKind::Reference,
            1,
        );
        return;
    }

    let schema_id = node_id(id, "schema");
    let label = schema
        .get("title")
        .and_then(Value::as_str)
        .map(String::from)
        .unwrap_or_else(|| type_label(schema));
    out.push(
        id,
        GraphNode {
            id: schema_id.clone(),
            label,
            position: Position::default(),
            data: NodeData::Schema { reference: None },
        },
        EdgeKind::Structural,
        1,
    );
    walk_schema(&schema_id, schema, 2, out);
}

/// Emit the children of `schema` under `parent`: one node per property, or
/// an array node for `items`. Anything else, and malformed input, stops.
fn walk_schema(parent: &str, schema: &Value, depth: usize, out: &mut Fragment) {
    if depth > MAX_SCHEMA_DEPTH {
        tracing::debug!(%parent, "schema nesting limit reached");
        return;
    }
    let Some(obj) = schema.as_object() else {
        return;
    };

    if let Some(Value::Object(properties)) = obj.get("properties") {
        let required: HashSet<&str> = obj
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let mut siblings = Siblings::new(parent);
        for (name, property) in properties {
            if !property.is_object() {
                continue;
            }
            let id = siblings.id(name);
            if let Some(reference) = ref_of(property) {
                out.push(parent, reference_leaf(id, reference), EdgeKind::Reference, depth);
                continue;
            }

            let property_type = type_label(property);
            let is_required = required.contains(name.as_str());
            out.push(
                parent,
                GraphNode {
                    id: id.clone(),
                    label: property_label(name, is_required, &property_type),
                    position: Position::default(),
                    data: NodeData::Property {
                        name: name.clone(),
                        property_type,
                        required: is_required,
                    },
                },
                EdgeKind::Structural,
                depth,
            );
            walk_schema(&id, property, depth + 1, out);
        }
    } else if let Some(items) = obj.get("items").filter(|items| items.is_object()) {
        let item_type = type_label(items);
        let array_id = node_id(parent, "items");
        out.push(
            parent,
            GraphNode {
                id: array_id.clone(),
                label: format!("{}[]", item_type),
                position: Position::default(),
                data: NodeData::Array { item_type },
            },
            EdgeKind::Structural,
            depth,
        );
        match ref_of(items) {
            Some(reference) => out.push(
                &array_id,
                reference_leaf(node_id(&array_id, "ref"), reference),
                EdgeKind::Reference,
                depth + 1,
            ),
            None => walk_schema(&array_id, items, depth + 1, out),
        }
    }
}
