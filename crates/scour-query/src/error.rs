//! Error types for query parsing and DSL rendering

use thiserror::Error;

/// Errors raised while turning untrusted request input into the query IR.
///
/// Every variant is caused by the client and should surface as a bad request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// A bracket-notation path is used both as a value and as a group
    #[error("Structure conflict at key '{key}': a path cannot hold both a value and nested keys")]
    StructureConflict { key: String },

    /// A `filter=` expression could not be understood
    #[error("Invalid filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    /// An aggregation parameter failed to decode into its expected type
    #[error(
        "Invalid value for '{field}' in aggregation '{aggregation}': expected {expected}, found '{found}'"
    )]
    InvalidField {
        aggregation: String,
        field: String,
        expected: &'static str,
        found: String,
    },

    /// Metric aggregation tag outside the known set
    #[error("Unknown metric aggregation type: {tag}")]
    UnknownMetric { tag: String },

    /// Pipeline aggregation tag outside the known set
    #[error("Unknown pipeline aggregation type: {tag}")]
    UnknownPipeline { tag: String },
}

/// Errors raised by a DSL compiler.
///
/// These indicate a clause that should never have reached the compiler; the
/// request is aborted instead of emitting a partial document.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// The leaf payload does not fit its operator
    #[error("Operator '{operator}' cannot render payload: {message}")]
    InvalidPayload {
        operator: &'static str,
        message: String,
    },
}

/// Top-level error for callers that drive the whole pipeline
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScourError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

impl ScourError {
    /// Whether the error was caused by request input (as opposed to an
    /// internal invariant violation)
    pub fn is_client_error(&self) -> bool {
        matches!(self, ScourError::Parse(_))
    }
}

/// Result type for scour operations
pub type ScourResult<T> = Result<T, ScourError>;
