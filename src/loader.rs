//! Document loading and format normalization.
//!
//! Handles raw text in either JSON or YAML, files, and HTTP URLs. Text is
//! classified by its first significant character; when the preferred parser
//! rejects it the other one gets a try before giving up.

use std::path::Path;

use serde_json::Value;

use crate::error::{LoadError, ParseError, ResolveError};
use crate::types::{DocumentContent, SpecFormat};

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Classify raw text: `{` or `[` after trimming means JSON, anything else YAML.
pub fn detect_format(text: &str) -> SpecFormat {
    match text.trim_start().chars().next() {
        Some('{') | Some('[') => SpecFormat::Json,
        _ => SpecFormat::Yaml,
    }
}

/// Parse document text into a JSON tree.
///
/// `declared` is the format the storage layer claims; it is only a hint.
/// Without one the format is detected from the text. Blank text parses to
/// `null`, which the structural linter reports as an empty specification.
///
/// # Errors
///
/// Returns `ParseError::Unparseable` carrying the first parser's message
/// when both formats fail.
pub fn parse_document(text: &str, declared: Option<SpecFormat>) -> Result<Value, ParseError> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }

    let first = declared.unwrap_or_else(|| detect_format(text));
    let second = first.other();

    let message = match parse_as(text, first) {
        Ok(value) => return Ok(value),
        Err(message) => message,
    };
    tracing::debug!(%first, %second, error = %message, "primary parser failed, trying fallback");

    parse_as(text, second).map_err(|_| ParseError::Unparseable {
        first,
        second,
        message,
    })
}

fn parse_as(text: &str, format: SpecFormat) -> Result<Value, String> {
    match format {
        SpecFormat::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
        SpecFormat::Yaml => serde_yaml::from_str(text).map_err(|e| e.to_string()),
    }
}

/// Turn stored content into a document tree without mutating it.
///
/// Parsed, non-null content passes through as-is; text goes through
/// [`parse_document`].
pub fn normalize(content: &DocumentContent, declared: SpecFormat) -> Result<Value, ParseError> {
    match content {
        DocumentContent::Parsed(value) if !value.is_null() => Ok(value.clone()),
        DocumentContent::Parsed(_) => Ok(Value::Null),
        DocumentContent::Text(text) => parse_document(text, Some(declared)),
    }
}

/// Serialize a document for display in the given format.
pub fn render_document(value: &Value, format: SpecFormat) -> String {
    let rendered = match format {
        SpecFormat::Json => serde_json::to_string_pretty(value).map_err(|e| e.to_string()),
        SpecFormat::Yaml => serde_yaml::to_string(value).map_err(|e| e.to_string()),
    };
    rendered.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "could not render document");
        String::new()
    })
}

/// Load a document from a file path.
///
/// The file extension (`.json`, `.yaml`, `.yml`) is used as the declared format.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist,
/// or `LoadError::Parse` if neither parser accepts it.
pub fn load_document(path: &Path) -> Result<Value, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    let declared = SpecFormat::from_extension(&path.to_string_lossy());
    Ok(parse_document(&content, declared)?)
}

/// Load a document from an HTTP/HTTPS URL.
///
/// Requires the `remote` feature (enabled by default).
///
/// # Errors
///
/// Returns `LoadError::NetworkError` if the request fails,
/// or `LoadError::Parse` if the body isn't JSON or YAML.
#[cfg(feature = "remote")]
pub fn load_document_url(url: &str) -> Result<Value, LoadError> {
    let network_error = |source| LoadError::NetworkError {
        url: url.to_string(),
        source,
    };

    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(network_error)?;

    let response = client
        .get(url)
        .send()
        .and_then(|r| r.error_for_status())
        .map_err(network_error)?;

    let body = response.text().map_err(network_error)?;
    let declared = SpecFormat::from_extension(url.split('?').next().unwrap_or(url));
    Ok(parse_document(&body, declared)?)
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Load a document from a file path or URL.
///
/// URL loading requires the `remote` feature.
pub fn load_document_auto(source: &str) -> Result<Value, LoadError> {
    if is_url(source) {
        #[cfg(feature = "remote")]
        {
            load_document_url(source)
        }
        #[cfg(not(feature = "remote"))]
        {
            Err(LoadError::FileNotFound {
                path: std::path::PathBuf::from(source),
            })
        }
    } else {
        load_document(Path::new(source))
    }
}

/// Navigate a JSON Pointer fragment (e.g., "#/components/schemas/Pet").
///
/// The fragment should start with '#'. `"#"` alone returns the whole document.
pub fn navigate_fragment<'a>(doc: &'a Value, fragment: &str) -> Result<&'a Value, ResolveError> {
    let path = fragment.trim_start_matches('#').trim_start_matches('/');
    if path.is_empty() {
        return Ok(doc);
    }

    let mut current = doc;
    for part in path.split('/') {
        // Unescape JSON Pointer encoding (~1 = /, ~0 = ~)
        let key = part.replace("~1", "/").replace("~0", "~");
        let next = match current {
            Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            other => other.get(&key),
        };
        current = next.ok_or_else(|| ResolveError::MissingTarget {
            pointer: fragment.to_string(),
        })?;
    }
    Ok(current)
}
