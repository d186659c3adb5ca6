//! Reference resolution.
//!
//! The pipeline talks to resolvers through [`ReferenceResolver`]: a document
//! goes in, either a dereferenced document or a [`ResolveError`] comes out.
//! [`LocalResolver`] is the built-in implementation. It inlines local
//! (`#/...`) references and builds a JSON Schema validator for every
//! reusable schema so malformed definitions fail early. Inlining runs on
//! the blocking pool and stops after [`DEFAULT_NODE_LIMIT`] visited nodes,
//! so a caller's timeout always gets a chance to fire.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::ResolveError;
use crate::loader::navigate_fragment;

/// Nodes [`LocalResolver`] may visit while inlining before giving up.
pub const DEFAULT_NODE_LIMIT: usize = 1_000_000;

/// Something that dereferences `$ref` pointers in a document.
#[async_trait]
pub trait ReferenceResolver: Send + Sync {
    /// Return the document with references expanded.
    async fn resolve(&self, document: Value) -> Result<Value, ResolveError>;
}

/// Dereferences local pointers in place.
///
/// A reference that points back into a schema currently being inlined is
/// left as a `$ref` object, so recursive types terminate instead of
/// expanding forever. External files and URLs are rejected.
#[derive(Debug, Clone)]
pub struct LocalResolver {
    skip_schema_checks: bool,
    node_limit: usize,
}

impl Default for LocalResolver {
    fn default() -> Self {
        Self {
            skip_schema_checks: false,
            node_limit: DEFAULT_NODE_LIMIT,
        }
    }
}

impl LocalResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the number of nodes visited while inlining.
    ///
    /// Definitions that reference each other more than once grow
    /// exponentially when inlined; past the cap resolution fails with
    /// [`ResolveError::TooLarge`].
    pub fn with_node_limit(mut self, limit: usize) -> Self {
        self.node_limit = limit;
        self
    }

    /// Disable the JSON Schema well-formedness checks on reusable schemas.
    pub fn without_schema_checks(mut self) -> Self {
        self.skip_schema_checks = true;
        self
    }

    /// Resolve synchronously. [`ReferenceResolver::resolve`] delegates here.
    pub fn resolve_document(&self, document: &Value) -> Result<Value, ResolveError> {
        let mut resolved = document.clone();
        let mut inliner = Inliner {
            root: document,
            stack: Vec::new(),
            visited: 0,
            limit: self.node_limit,
        };
        inliner.inline(&mut resolved)?;

        if !self.skip_schema_checks {
            check_schemas(&resolved)?;
        }
        Ok(resolved)
    }
}

#[async_trait]
impl ReferenceResolver for LocalResolver {
    async fn resolve(&self, document: Value) -> Result<Value, ResolveError> {
        let resolver = self.clone();
        tokio::task::spawn_blocking(move || resolver.resolve_document(&document))
            .await
            .map_err(|e| ResolveError::Failed {
                message: format!("resolver task failed: {}", e),
            })?
    }
}

struct Inliner<'a> {
    root: &'a Value,
    stack: Vec<String>,
    visited: usize,
    limit: usize,
}

impl Inliner<'_> {
    fn inline(&mut self, value: &mut Value) -> Result<(), ResolveError> {
        self.visited += 1;
        if self.visited > self.limit {
            return Err(ResolveError::TooLarge { limit: self.limit });
        }

        match value {
            Value::Object(obj) => {
                if let Some(pointer) = obj.get("$ref").and_then(Value::as_str).map(String::from) {
                    if !pointer.starts_with('#') {
                        return Err(ResolveError::ExternalReference { reference: pointer });
                    }
                    if self.stack.contains(&pointer) {
                        tracing::debug!(%pointer, "leaving recursive reference in place");
                        return Ok(());
                    }

                    // Targets come from the unexpanded root, so each clone is
                    // bounded by the source document.
                    let mut target = navigate_fragment(self.root, &pointer)?.clone();
                    self.stack.push(pointer);
                    self.inline(&mut target)?;
                    self.stack.pop();

                    obj.remove("$ref");
                    merge_target(obj, target);
                    return Ok(());
                }

                for child in obj.values_mut() {
                    self.inline(child)?;
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.inline(item)?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

// Sibling keys next to a $ref win over the target's keys.
fn merge_target(obj: &mut Map<String, Value>, target: Value) {
    if let Value::Object(fields) = target {
        for (k, v) in fields {
            obj.entry(k).or_insert(v);
        }
    }
}

fn contains_ref(value: &Value) -> bool {
    match value {
        Value::Object(obj) => obj.contains_key("$ref") || obj.values().any(contains_ref),
        Value::Array(items) => items.iter().any(contains_ref),
        _ => false,
    }
}

fn schema_draft(doc: &Value) -> jsonschema::Draft {
    let is_31 = doc
        .get("openapi")
        .and_then(Value::as_str)
        .map(|v| v.starts_with("3.1"))
        .unwrap_or(false);
    if is_31 {
        jsonschema::Draft::Draft202012
    } else {
        jsonschema::Draft::Draft4
    }
}

/// Build a validator for every reusable schema; the first failure wins.
fn check_schemas(doc: &Value) -> Result<(), ResolveError> {
    let draft = schema_draft(doc);
    let sections = [
        ("#/components/schemas", doc.pointer("/components/schemas")),
        ("#/definitions", doc.get("definitions")),
    ];

    for (base, section) in sections {
        let Some(Value::Object(schemas)) = section else {
            continue;
        };
        for (name, schema) in schemas {
            // Recursive leftovers point at the document root, which a
            // standalone validator cannot see.
            if !schema.is_object() || contains_ref(schema) {
                continue;
            }
            if let Err(e) = jsonschema::options().with_draft(draft).build(schema) {
                return Err(ResolveError::InvalidSchema {
                    pointer: format!("{}/{}", base, name),
                    message: e.to_string(),
                });
            }
        }
    }
    Ok(())
}
