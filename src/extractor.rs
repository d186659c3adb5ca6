//! Endpoint extraction from a resolved document.
//!
//! Walks `paths` and maps each HTTP operation into an [`Endpoint`]. Mapping
//! is best-effort: a malformed field (a parameter, `tags`, a response) is
//! dropped with a warning at `paths.<path>.<method>` and the endpoint is
//! kept. Only an operation that is not an object is skipped entirely.
//! Both OpenAPI 3.x and Swagger 2.0 layouts are understood.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::linter::Diagnostic;
use crate::types::{json_type_name, OPERATION_METHODS};

const DEFAULT_MEDIA_TYPE: &str = "application/json";

/// One HTTP operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    /// Stable identifier: slug of `operationId`, or method plus path.
    pub id: String,
    /// Upper-case HTTP method.
    pub method: String,
    pub path: String,
    pub summary: String,
    pub description: String,
    pub tags: Vec<String>,
    pub parameters: Vec<Parameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    pub responses: Vec<ResponseDescriptor>,
}

/// Operation input other than the body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
    #[serde(rename = "type")]
    pub param_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Schema used for graph nodes.
    #[serde(skip)]
    pub schema: Option<Value>,
}

/// Operation request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<MediaContent>,
}

/// One response of an operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseDescriptor {
    pub status_code: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<MediaContent>,
}

/// Media type and schema taken from the first entry of a `content` map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaContent {
    #[serde(rename = "type")]
    pub media_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
}

impl Endpoint {
    /// Request body schema, when the body declares one.
    pub fn request_schema(&self) -> Option<&Value> {
        self.request_body
            .as_ref()
            .and_then(|b| b.content.as_ref())
            .and_then(|c| c.schema.as_ref())
    }
}

impl ResponseDescriptor {
    pub fn schema(&self) -> Option<&Value> {
        self.content.as_ref().and_then(|c| c.schema.as_ref())
    }
}

/// Endpoints plus the warnings collected while extracting them.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub endpoints: Vec<Endpoint>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Error)]
enum OperationError {
    #[error("{field} must be {expected}, got {actual}")]
    Shape {
        field: String,
        expected: &'static str,
        actual: &'static str,
    },
}

fn shape(field: impl Into<String>, expected: &'static str, value: &Value) -> OperationError {
    OperationError::Shape {
        field: field.into(),
        expected,
        actual: json_type_name(value),
    }
}

/// Extract every operation under `paths`.
pub fn extract_endpoints(doc: &Value) -> Extraction {
    let mut extraction = Extraction::default();
    let Some(paths) = doc.get("paths").and_then(Value::as_object) else {
        return extraction;
    };

    let mut issued: HashSet<String> = HashSet::new();

    for (path, item) in paths {
        let Some(item) = item.as_object() else {
            extraction.diagnostics.push(Diagnostic::warning(
                Some(&format!("paths.{}", path)),
                format!("path item must be an object, got {}", json_type_name(item)),
            ));
            continue;
        };

        for &method in OPERATION_METHODS {
            let Some(operation) = item.get(method) else {
                continue;
            };
            let scope = format!("paths.{}.{}", path, method);
            let mut issues = Vec::new();
            match map_operation(doc, path, method, operation, item, &mut issues) {
                Ok(mut endpoint) => {
                    endpoint.id = unique_id(&endpoint.id, &mut issued);
                    extraction.endpoints.push(endpoint);
                }
                Err(e) => {
                    tracing::warn!(%path, %method, error = %e, "skipping operation");
                    extraction.diagnostics.push(Diagnostic::warning(
                        Some(&scope),
                        format!("could not read operation: {}", e),
                    ));
                }
            }
            for issue in issues {
                tracing::warn!(%path, %method, error = %issue, "ignoring field");
                extraction.diagnostics.push(Diagnostic::warning(
                    Some(&scope),
                    format!("ignored invalid field: {}", issue),
                ));
            }
        }
    }

    tracing::debug!(
        endpoints = extraction.endpoints.len(),
        warnings = extraction.diagnostics.len(),
        "extracted endpoints"
    );
    extraction
}

/// First free id among `base`, `base_2`, `base_3`, ...
fn unique_id(base: &str, issued: &mut HashSet<String>) -> String {
    let mut id = base.to_string();
    let mut n = 1;
    while issued.contains(&id) {
        n += 1;
        id = format!("{}_{}", base, n);
    }
    issued.insert(id.clone());
    id
}

/// Map one operation. Field-level problems are pushed to `issues` and the
/// field falls back to its default; only a non-object operation fails.
fn map_operation(
    doc: &Value,
    path: &str,
    method: &str,
    operation: &Value,
    path_item: &Map<String, Value>,
    issues: &mut Vec<OperationError>,
) -> Result<Endpoint, OperationError> {
    let op = operation
        .as_object()
        .ok_or_else(|| shape("operation", "an object", operation))?;

    let id = match op.get("operationId").and_then(Value::as_str) {
        Some(operation_id) if !slugify(operation_id).is_empty() => slugify(operation_id),
        _ => synthesize_id(method, path),
    };

    let tags = match op.get("tags") {
        None => Vec::new(),
        Some(Value::Array(tags)) => tags
            .iter()
            .filter_map(Value::as_str)
            .map(String::from)
            .collect(),
        Some(other) => {
            issues.push(shape("tags", "an array", other));
            Vec::new()
        }
    };

    let raw_parameters =
        merged_parameters(path_item.get("parameters"), op.get("parameters"), issues);
    let mut parameters = Vec::new();
    let mut body_parameter = None;
    for (index, raw) in raw_parameters.iter().enumerate() {
        let Some(param) = raw.as_object() else {
            issues.push(shape(format!("parameters[{}]", index), "an object", raw));
            continue;
        };
        if param.get("in").and_then(Value::as_str) == Some("body") {
            body_parameter = Some(param);
            continue;
        }
        match map_parameter(param, index) {
            Ok(parameter) => parameters.push(parameter),
            Err(e) => issues.push(e),
        }
    }

    let request_body = match (op.get("requestBody"), body_parameter) {
        (Some(body), _) => map_request_body(body, issues),
        (None, Some(param)) => Some(RequestBody {
            description: string_field(param, "description"),
            required: param.get("required").and_then(Value::as_bool).unwrap_or(false),
            content: param.get("schema").map(|schema| MediaContent {
                media_type: first_media_type(op, doc, "consumes"),
                schema: Some(schema.clone()),
            }),
        }),
        (None, None) => None,
    };

    let responses = match op.get("responses") {
        None => Vec::new(),
        Some(Value::Object(responses)) => responses
            .iter()
            .filter_map(|(status, response)| match map_response(doc, op, status, response) {
                Ok(descriptor) => Some(descriptor),
                Err(e) => {
                    issues.push(e);
                    None
                }
            })
            .collect(),
        Some(other) => {
            issues.push(shape("responses", "an object", other));
            Vec::new()
        }
    };

    Ok(Endpoint {
        id,
        method: method.to_ascii_uppercase(),
        path: path.to_string(),
        summary: string_field(op, "summary").unwrap_or_default(),
        description: string_field(op, "description").unwrap_or_default(),
        tags,
        parameters,
        request_body,
        responses,
    })
}

/// Path-level parameters, overridden by operation parameters with the same
/// `name` and `in`.
fn merged_parameters(
    path_level: Option<&Value>,
    op_level: Option<&Value>,
    issues: &mut Vec<OperationError>,
) -> Vec<Value> {
    let mut as_list = |field: &str, value: Option<&Value>| match value {
        None => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(other) => {
            issues.push(shape(field, "an array", other));
            Vec::new()
        }
    };
    let mut merged = as_list("path parameters", path_level);
    let own = as_list("parameters", op_level);

    let key = |p: &Value| {
        (
            p.get("name").and_then(Value::as_str).map(String::from),
            p.get("in").and_then(Value::as_str).map(String::from),
        )
    };
    for param in own {
        let k = key(&param);
        match merged.iter_mut().find(|existing| key(&**existing) == k) {
            Some(existing) => *existing = param,
            None => merged.push(param),
        }
    }
    merged
}

fn map_parameter(param: &Map<String, Value>, index: usize) -> Result<Parameter, OperationError> {
    let field = |name: &str| format!("parameters[{}].{}", index, name);
    let name = match param.get("name") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => return Err(shape(field("name"), "a string", other)),
        None => return Err(shape(field("name"), "a string", &Value::Null)),
    };
    let location = match param.get("in") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => return Err(shape(field("in"), "a string", other)),
        None => return Err(shape(field("in"), "a string", &Value::Null)),
    };

    // OpenAPI 3 nests the type in `schema`; Swagger 2.0 keeps it inline.
    let schema = match param.get("schema") {
        Some(schema) => Some(schema.clone()),
        None => inline_parameter_schema(param),
    };
    let from_schema = |key: &str| {
        schema
            .as_ref()
            .and_then(|s| s.get(key))
            .and_then(Value::as_str)
            .map(String::from)
    };

    Ok(Parameter {
        required: param
            .get("required")
            .and_then(Value::as_bool)
            .unwrap_or(location == "path"),
        name,
        location,
        description: string_field(param, "description"),
        param_type: from_schema("type").unwrap_or_else(|| "string".to_string()),
        format: from_schema("format"),
        schema,
    })
}

fn inline_parameter_schema(param: &Map<String, Value>) -> Option<Value> {
    param.get("type")?;
    let mut schema = Map::new();
    for key in ["type", "format", "items", "enum", "default"] {
        if let Some(value) = param.get(key) {
            schema.insert(key.to_string(), value.clone());
        }
    }
    Some(Value::Object(schema))
}

fn map_request_body(body: &Value, issues: &mut Vec<OperationError>) -> Option<RequestBody> {
    let Some(body) = body.as_object() else {
        issues.push(shape("requestBody", "an object", body));
        return None;
    };
    let content = first_content(body, "requestBody.content").unwrap_or_else(|e| {
        issues.push(e);
        None
    });
    Some(RequestBody {
        description: string_field(body, "description"),
        required: body.get("required").and_then(Value::as_bool).unwrap_or(false),
        content,
    })
}

fn map_response(
    doc: &Value,
    op: &Map<String, Value>,
    status: &str,
    response: &Value,
) -> Result<ResponseDescriptor, OperationError> {
    match response {
        Value::String(description) => Ok(ResponseDescriptor {
            status_code: status.to_string(),
            description: description.clone(),
            content: None,
        }),
        Value::Object(obj) => {
            let content = match obj.get("schema") {
                // Swagger 2.0
                Some(schema) if !obj.contains_key("content") => Some(MediaContent {
                    media_type: first_media_type(op, doc, "produces"),
                    schema: Some(schema.clone()),
                }),
                _ => first_content(obj, &format!("responses.{}.content", status))?,
            };
            Ok(ResponseDescriptor {
                status_code: status.to_string(),
                description: string_field(obj, "description").unwrap_or_default(),
                content,
            })
        }
        other => Err(shape(format!("responses.{}", status), "an object or string", other)),
    }
}

fn first_content(
    obj: &Map<String, Value>,
    field: &str,
) -> Result<Option<MediaContent>, OperationError> {
    match obj.get("content") {
        None => Ok(None),
        Some(Value::Object(media)) => Ok(media.iter().next().map(|(media_type, entry)| {
            MediaContent {
                media_type: media_type.clone(),
                schema: entry.get("schema").cloned(),
            }
        })),
        Some(other) => Err(shape(field, "an object", other)),
    }
}

/// First entry of an operation's (or the document's) `consumes`/`produces`.
fn first_media_type(op: &Map<String, Value>, doc: &Value, key: &str) -> String {
    op.get(key)
        .or_else(|| doc.get(key))
        .and_then(Value::as_array)
        .and_then(|types| types.first())
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_MEDIA_TYPE)
        .to_string()
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(String::from)
}

fn synthesize_id(method: &str, path: &str) -> String {
    let slug = slugify(path);
    if slug.is_empty() {
        format!("{}_root", method)
    } else {
        format!("{}_{}", method, slug)
    }
}

/// Convert an identifier or path into a lower snake_case slug.
///
/// `listPets` → `list_pets`, `/pets/{petId}` → `pets_pet_id`.
pub fn slugify(s: &str) -> String {
    let mut result = String::new();
    let chars: Vec<char> = s.chars().collect();

    for (i, &ch) in chars.iter().enumerate() {
        if ch.is_uppercase() {
            // Split before an upper-case letter that follows a lower-case letter
            // or digit, or that starts a new word (HTTPServer -> http_server).
            let should_add_underscore = i > 0
                && (chars[i - 1].is_lowercase()
                    || chars[i - 1].is_ascii_digit()
                    || (i + 1 < chars.len() && chars[i + 1].is_lowercase()));

            if should_add_underscore && !result.ends_with('_') {
                result.push('_');
            }
            result.extend(ch.to_lowercase());
        } else if ch.is_alphanumeric() {
            result.push(ch);
        } else if !result.is_empty() && !result.ends_with('_') {
            result.push('_');
        }
    }

    result.trim_matches('_').to_string()
}
