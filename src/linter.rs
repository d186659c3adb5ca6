//! Structural linting of OpenAPI/Swagger documents.
//!
//! Runs a fixed rule set over a parsed document:
//! - Empty documents
//! - Missing or unsupported `openapi`/`swagger` version fields
//! - Missing `info`, `info.title`, `info.version`
//! - Empty `paths` or paths without any HTTP operation
//!
//! Rules never abort; a document can be structurally broken and still go
//! through endpoint extraction.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::loader::load_document;
use crate::types::RECOGNIZED_METHODS;

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single finding about a document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// Dotted path to the issue (e.g., "info.title"), if it has a location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub message: String,
    pub severity: Severity,
}

impl Diagnostic {
    pub fn error(path: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            path: path.map(String::from),
            message: message.into(),
            severity: Severity::Error,
        }
    }

    pub fn warning(path: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            path: path.map(String::from),
            message: message.into(),
            severity: Severity::Warning,
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        match &self.path {
            Some(path) => write!(f, "{}: {} - {}", level, path, self.message),
            None => write!(f, "{}: {}", level, self.message),
        }
    }
}

/// Check whether `version` names a supported OpenAPI 3 release (3.0.x or 3.1.0).
pub fn is_supported_openapi_version(version: &str) -> bool {
    if version == "3.1.0" {
        return true;
    }
    version
        .strip_prefix("3.0.")
        .map(|patch| !patch.is_empty() && patch.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(false)
}

fn is_falsy(doc: &Value) -> bool {
    match doc {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        _ => false,
    }
}

/// Run every structural rule against a document.
pub fn lint_document(doc: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    if is_falsy(doc) {
        diagnostics.push(Diagnostic::error(None, "specification is empty"));
        return diagnostics;
    }

    let openapi = doc.get("openapi");
    let swagger = doc.get("swagger");

    if openapi.is_none() && swagger.is_none() {
        diagnostics.push(Diagnostic::error(
            None,
            "missing version identifier: expected an \"openapi\" or \"swagger\" field",
        ));
    }

    if let Some(version) = openapi {
        let supported = version
            .as_str()
            .map(is_supported_openapi_version)
            .unwrap_or(false);
        if !supported {
            diagnostics.push(Diagnostic::warning(
                Some("openapi"),
                format!(
                    "unsupported OpenAPI version {}: expected 3.0.x or 3.1.0",
                    version
                ),
            ));
        }
    }

    if let Some(version) = swagger {
        if version.as_str() != Some("2.0") {
            diagnostics.push(Diagnostic::warning(
                Some("swagger"),
                format!("unsupported Swagger version {}: expected \"2.0\"", version),
            ));
        }
    }

    match doc.get("info") {
        None => diagnostics.push(Diagnostic::error(Some("info"), "missing info section")),
        Some(info) => {
            if info.get("title").is_none() {
                diagnostics.push(Diagnostic::error(Some("info.title"), "missing API title"));
            }
            if info.get("version").is_none() {
                diagnostics.push(Diagnostic::error(
                    Some("info.version"),
                    "missing API version",
                ));
            }
        }
    }

    match doc.get("paths").and_then(Value::as_object) {
        Some(paths) if !paths.is_empty() => {
            let has_operation = paths.values().any(|item| {
                item.as_object()
                    .map(|ops| ops.keys().any(|k| RECOGNIZED_METHODS.contains(&k.as_str())))
                    .unwrap_or(false)
            });
            if !has_operation {
                diagnostics.push(Diagnostic::warning(
                    Some("paths"),
                    "no HTTP operations found under paths",
                ));
            }
        }
        _ => diagnostics.push(Diagnostic::warning(Some("paths"), "no paths defined")),
    }

    diagnostics
}

/// Diagnostics for one file, with its path relative to the lint root.
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub file: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Status of a linted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Ok,
    Error,
    Warning,
}

/// Result of linting a directory or set of files.
#[derive(Debug, Clone, Serialize)]
pub struct LintResult {
    pub path: PathBuf,
    pub files_checked: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub results: Vec<FileResult>,
}

impl LintResult {
    /// Returns true if all files passed (no errors).
    pub fn is_ok(&self) -> bool {
        self.errors == 0
    }
}

/// Lint a file or directory.
///
/// If path is a directory, recursively finds all `.json`, `.yaml` and `.yml`
/// files. If `strict` is true, warnings are treated as errors.
pub fn lint(path: &Path, strict: bool) -> LintResult {
    let files = collect_document_files(path);
    let mut results = Vec::new();
    let mut total_errors = 0;
    let mut total_warnings = 0;

    for file in &files {
        let file_result = lint_file(file, path);
        total_errors += count(&file_result.diagnostics, Severity::Error);
        total_warnings += count(&file_result.diagnostics, Severity::Warning);
        results.push(file_result);
    }

    let failed = results
        .iter()
        .filter(|r| {
            if strict {
                r.status != FileStatus::Ok
            } else {
                r.status == FileStatus::Error
            }
        })
        .count();

    LintResult {
        path: path.to_path_buf(),
        files_checked: files.len(),
        passed: files.len() - failed,
        failed,
        errors: total_errors,
        warnings: total_warnings,
        results,
    }
}

fn count(diagnostics: &[Diagnostic], severity: Severity) -> usize {
    diagnostics.iter().filter(|d| d.severity == severity).count()
}

/// Lint a single document file.
pub fn lint_file(file: &Path, base_path: &Path) -> FileResult {
    let relative = file.strip_prefix(base_path).unwrap_or(file).to_path_buf();
    let relative = if relative.as_os_str().is_empty() {
        file.to_path_buf()
    } else {
        relative
    };

    let diagnostics = match load_document(file) {
        Ok(doc) => lint_document(&doc),
        Err(e) => vec![Diagnostic::error(None, format!("syntax error: {}", e))],
    };

    let status = if diagnostics.iter().any(|d| d.severity == Severity::Error) {
        FileStatus::Error
    } else if diagnostics.iter().any(|d| d.severity == Severity::Warning) {
        FileStatus::Warning
    } else {
        FileStatus::Ok
    };

    FileResult {
        file: relative,
        status,
        diagnostics,
    }
}

fn is_document_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "json" | "yaml" | "yml"))
        .unwrap_or(false)
}

/// Collect all document files in a path (file or directory).
fn collect_document_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        if is_document_file(path) {
            return vec![path.to_path_buf()];
        }
        return vec![];
    }

    let mut files = Vec::new();
    collect_files_recursive(path, &mut files);
    files.sort();
    files
}

fn collect_files_recursive(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files_recursive(&path, files);
        } else if is_document_file(&path) {
            files.push(path);
        }
    }
}
