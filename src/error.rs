//! Error types for document loading, reference resolution and configuration.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::types::SpecFormat;

/// Raw text that neither parser accepted.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("document is not valid {first} (also tried {second}): {message}")]
    Unparseable {
        first: SpecFormat,
        second: SpecFormat,
        message: String,
    },
}

/// Errors while obtaining a document from disk or the network.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            LoadError::Parse(_) => 2,
        }
    }
}

/// Failures reported by a reference resolver.
///
/// The messages are free text from the pipeline's point of view; they go
/// through the classifier before reaching a user.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Error resolving $ref pointer \"{pointer}\": the reference target does not exist")]
    MissingTarget { pointer: String },

    #[error("external reference \"{reference}\" cannot be resolved: only local references are supported")]
    ExternalReference { reference: String },

    #[error("invalid schema at {pointer}: {message}")]
    InvalidSchema { pointer: String, message: String },

    #[error("resolved document exceeds {limit} nodes")]
    TooLarge { limit: usize },

    #[error("resolver did not answer within {} ms", timeout.as_millis())]
    Timeout { timeout: Duration },

    #[error("{message}")]
    Failed { message: String },
}

impl ResolveError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

/// Problems reading the TOML configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ConfigError::Read { .. } => 3,
            ConfigError::Invalid { .. } => 2,
        }
    }
}
