use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Error produced while reading provider output.
#[derive(Debug, Error)]
pub enum ParseError {
    /// A line that does not fit the provider grammar.
    ///
    /// Lenient parsers log and drop these; strict grammars surface them.
    #[error("line {line_no}: {reason}: {line:?}")]
    Malformed { line_no: usize, line: String, reason: String },

    #[error("failed to read provider output: {0}")]
    Io(#[from] std::io::Error),
}

impl ParseError {
    pub(crate) fn malformed(line_no: usize, line: &str, reason: impl Into<String>) -> Self {
        ParseError::Malformed { line_no, line: line.to_string(), reason: reason.into() }
    }
}

/// Configuration problems, reported before any provider is run.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("incompatible options: {0}")]
    IncompatibleOptions(String),
}

/// Failure invoking or reading one of the external tools.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("failed to spawn {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with {status}")]
    Failed { tool: String, status: ExitStatus },

    #[error("failed to parse {tool} output: {source}")]
    Parse {
        tool: String,
        #[source]
        source: ParseError,
    },
}

/// Top-level error for a comparison run.
#[derive(Debug, Error)]
pub enum CompareError {
    #[error("Binary not found at {0}")]
    MissingInput(PathBuf),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
