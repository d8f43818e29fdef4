use thiserror::Error;

/// Errors from parsing resource references
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("Unknown resource type: {0}")]
    UnknownResourceType(String),

    #[error("Malformed reference: {0}")]
    Malformed(String),
}
