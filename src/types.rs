//! Core document records shared across the pipeline.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// HTTP methods that become endpoints.
pub const OPERATION_METHODS: &[&str] = &["get", "post", "put", "delete", "patch", "options"];

/// HTTP method keys the structural validator recognizes under a path item.
pub const RECOGNIZED_METHODS: &[&str] =
    &["get", "post", "put", "delete", "patch", "options", "head"];

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Serialization format of a document's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecFormat {
    Json,
    Yaml,
}

impl SpecFormat {
    /// The format tried when this one fails to parse.
    pub fn other(self) -> Self {
        match self {
            SpecFormat::Json => SpecFormat::Yaml,
            SpecFormat::Yaml => SpecFormat::Json,
        }
    }

    /// Guess a format from a file name, if the extension is recognized.
    pub fn from_extension(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".json") {
            Some(SpecFormat::Json)
        } else if lower.ends_with(".yaml") || lower.ends_with(".yml") {
            Some(SpecFormat::Yaml)
        } else {
            None
        }
    }
}

impl std::fmt::Display for SpecFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpecFormat::Json => write!(f, "JSON"),
            SpecFormat::Yaml => write!(f, "YAML"),
        }
    }
}

/// Document body as handed over by the storage layer.
///
/// Stored documents are usually raw text, but some callers keep an already
/// parsed tree around.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocumentContent {
    Text(String),
    Parsed(Value),
}

impl From<&str> for DocumentContent {
    fn from(text: &str) -> Self {
        DocumentContent::Text(text.to_string())
    }
}

impl From<String> for DocumentContent {
    fn from(text: String) -> Self {
        DocumentContent::Text(text)
    }
}

impl From<Value> for DocumentContent {
    fn from(value: Value) -> Self {
        DocumentContent::Parsed(value)
    }
}

/// A stored API description.
///
/// Owned by the storage collaborator. The pipeline only reads `content` and
/// `format`; the remaining fields travel along for the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecDocument {
    pub id: String,
    pub name: String,
    pub content: DocumentContent,
    pub format: SpecFormat,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favorite: Option<bool>,
}

impl SpecDocument {
    /// Create a document record with empty metadata.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<DocumentContent>,
        format: SpecFormat,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            content: content.into(),
            format,
            version: String::new(),
            tags: None,
            favorite: None,
        }
    }
}

/// Title and version from the document's `info` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiInfo {
    pub title: String,
    pub version: String,
}

impl ApiInfo {
    /// Read `info.title`/`info.version`, falling back to placeholders.
    pub fn from_document(doc: &Value) -> Self {
        let info = doc.get("info");
        let field = |key: &str| {
            info.and_then(|i| i.get(key))
                .and_then(scalar_text)
                .unwrap_or_default()
        };
        let title = field("title");
        Self {
            title: if title.is_empty() {
                "API".to_string()
            } else {
                title
            },
            version: field("version"),
        }
    }
}

/// Render a scalar (string, number or boolean) as text.
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Human-readable label such as "OpenAPI 3.0.3" or "Swagger 2.0".
pub fn spec_version_label(doc: &Value) -> String {
    if let Some(v) = doc.get("openapi").and_then(scalar_text) {
        format!("OpenAPI {}", v)
    } else if let Some(v) = doc.get("swagger").and_then(scalar_text) {
        format!("Swagger {}", v)
    } else {
        "Unknown".to_string()
    }
}
