//! Turns raw resolver/validator failure text into a short diagnosis.
//!
//! Messages coming out of a resolver often quote parts of the document they
//! choked on. Everything returned from here is redacted: object literals
//! collapse to `{...}`, long quoted values to `"..."`, and the result is
//! length-bounded.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Default upper bound on an explanation, in characters.
pub const DEFAULT_MAX_MESSAGE_LEN: usize = 200;

/// Quoted values at least this long are replaced.
const LONG_QUOTE_LEN: usize = 40;

static REF_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r##"#/[^\s"'`,;)\]]*"##).expect("ref token regex should be valid"));

static NOT_OF_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\S+) is not of (?:a )?type(?:\(s\))?\s+(.+)")
        .expect("type regex should be valid")
});

static QUOTED_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"["']([^"']+)["']"#).expect("quoted name regex should be valid"));

static SCHEMA_CLAUSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\S+)\s+(?:is|requires|must|should)\s+[^.;\n]{0,80}")
        .expect("schema clause regex should be valid")
});

static LONG_DOUBLE_QUOTED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r#""[^"]{{{},}}""#, LONG_QUOTE_LEN)).expect("quote regex should be valid")
});

static LONG_SINGLE_QUOTED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"'[^']{{{},}}'", LONG_QUOTE_LEN)).expect("quote regex should be valid")
});

/// Failure taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCategory {
    SchemaError,
    ReferenceError,
    TypeError,
    MissingRequiredProperty,
    Generic,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::SchemaError => "schema-error",
            ErrorCategory::ReferenceError => "reference-error",
            ErrorCategory::TypeError => "type-error",
            ErrorCategory::MissingRequiredProperty => "missing-required-property",
            ErrorCategory::Generic => "generic",
        }
    }

    fn title(&self) -> &'static str {
        match self {
            ErrorCategory::SchemaError => "Schema violation",
            ErrorCategory::ReferenceError => "Reference error",
            ErrorCategory::TypeError => "Type mismatch",
            ErrorCategory::MissingRequiredProperty => "Missing required property",
            ErrorCategory::Generic => "Resolution failed",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified, redacted failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub category: ErrorCategory,
    pub title: String,
    pub explanation: String,
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.explanation)
    }
}

struct Rule {
    category: ErrorCategory,
    predicate: fn(&str) -> bool,
    /// Receives the redacted message.
    formatter: fn(&str) -> String,
}

/// Checked in order; the first matching rule wins.
static RULES: &[Rule] = &[
    Rule {
        category: ErrorCategory::ReferenceError,
        predicate: |m| m.to_lowercase().contains("reference"),
        formatter: explain_reference,
    },
    Rule {
        category: ErrorCategory::TypeError,
        predicate: |m| NOT_OF_TYPE.is_match(m),
        formatter: explain_type,
    },
    Rule {
        category: ErrorCategory::MissingRequiredProperty,
        predicate: |m| m.to_lowercase().contains("required property"),
        formatter: explain_required,
    },
    Rule {
        category: ErrorCategory::SchemaError,
        predicate: |m| m.to_lowercase().contains("schema"),
        formatter: explain_schema,
    },
];

fn explain_reference(message: &str) -> String {
    let target = REF_TOKEN
        .find(message)
        .map(|m| format!("`{}`", m.as_str()))
        .unwrap_or_else(|| "a reference".to_string());
    format!(
        "The document points to {} that cannot be resolved. Check that the target exists and is spelled correctly.",
        target
    )
}

fn explain_type(message: &str) -> String {
    match NOT_OF_TYPE.captures(message) {
        Some(caps) => format!(
            "{} has the wrong type; expected {}.",
            &caps[1],
            truncate(caps[2].trim().trim_end_matches('.'), 60)
        ),
        None => "A value has the wrong type.".to_string(),
    }
}

fn explain_required(message: &str) -> String {
    match QUOTED_NAME.captures(message) {
        Some(caps) => format!("The required property \"{}\" is missing.", &caps[1]),
        None => "A required property is missing.".to_string(),
    }
}

fn explain_schema(message: &str) -> String {
    match SCHEMA_CLAUSE.find(message) {
        Some(clause) => format!(
            "The document does not satisfy the OpenAPI schema: {}.",
            clause.as_str().trim()
        ),
        None => "The document does not satisfy the OpenAPI schema.".to_string(),
    }
}

/// Classifies failure messages with a configurable length bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classifier {
    max_message_len: usize,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MESSAGE_LEN)
    }
}

impl Classifier {
    pub fn new(max_message_len: usize) -> Self {
        Self {
            // Room for the ellipsis at least.
            max_message_len: max_message_len.max(8),
        }
    }

    pub fn classify(&self, message: &str) -> Diagnosis {
        // Rules match on the raw text but only ever quote the redacted one.
        let redacted = redact(message);
        let (category, explanation) = RULES
            .iter()
            .find(|rule| (rule.predicate)(message))
            .map(|rule| (rule.category, (rule.formatter)(&redacted)))
            .unwrap_or_else(|| (ErrorCategory::Generic, redacted.clone()));

        Diagnosis {
            category,
            title: category.title().to_string(),
            explanation: truncate(&redact(&explanation), self.max_message_len),
        }
    }
}

/// Classify with the default length bound.
pub fn classify(message: &str) -> Diagnosis {
    Classifier::default().classify(message)
}

/// Strip document content from free text.
///
/// Outermost `{...}` groups (including an unterminated trailing one)
/// become `{...}`; quoted values of 40+ characters become `"..."`.
pub fn redact(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;

    for c in text.chars() {
        match c {
            '{' => {
                if depth == 0 {
                    out.push_str("{...}");
                }
                depth += 1;
            }
            '}' if depth > 0 => depth -= 1,
            _ if depth > 0 => {}
            _ => out.push(c),
        }
    }

    let out = LONG_DOUBLE_QUOTED.replace_all(&out, "\"...\"");
    LONG_SINGLE_QUOTED.replace_all(&out, "'...'").into_owned()
}

/// Cut `text` to at most `max` characters, marking the cut with `...`.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(3);
    let mut cut: String = text.chars().take(keep).collect();
    cut.push_str("...");
    cut
}
