use thiserror::Error;

#[derive(Error, Debug)]
pub enum StrataError {
    /// Invalid list/field configuration. Fatal at startup: a system with a
    /// broken schema must never serve requests.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation, item or field access denial. The message is deliberately
    /// generic so callers cannot tell which rule fired.
    #[error("Access denied")]
    AccessDenied,

    #[error("Validation failed: {0}")]
    Validation(String),

    /// Unique lookup missed, or an item-access denial was shaped as
    /// not-found to avoid leaking existence.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Query would return more than {max} results (requested {requested})")]
    LimitExceeded { max: usize, requested: usize },

    /// Underlying store failure, wrapped so storage-engine internals never
    /// reach the caller.
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("GraphQL error: {0}")]
    Graphql(String),

    #[error("Artifact error: {0}")]
    Artifact(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StrataError {
    /// Validation failure scoped to a single field, surfaced with field-level
    /// detail (safe to expose, unlike access denials).
    pub fn validation_field(list: &str, field: &str, message: impl AsRef<str>) -> Self {
        StrataError::Validation(format!("{}.{}: {}", list, field, message.as_ref()))
    }
}

pub type Result<T> = std::result::Result<T, StrataError>;
