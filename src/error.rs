//! Error taxonomy shared by every primitive.
//!
//! All errors are synchronous: `fill`, `merge` and `deserialize` surface
//! them directly to the caller instead of retrying or swallowing them.

use std::fmt;

/// Top-level error returned by any operation in this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Container(#[from] ContainerError),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Version(#[from] VersionError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Quantity(#[from] QuantityError),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures in `merge` or in a container's own invariants.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("cannot merge {this} with {other}: shapes differ")]
    ShapeMismatch { this: String, other: String },
    #[error("invariant violated in {type_name}: {message}")]
    InvariantViolation {
        type_name: &'static str,
        message: String,
    },
}

/// Failures while decoding a document tree.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("{path}: missing field `{field}`")]
    MissingField { path: String, field: &'static str },
    #[error("{path}: field `{field}` has the wrong type, expected {expected}")]
    WrongType {
        path: String,
        field: &'static str,
        expected: &'static str,
    },
    #[error("{path}: unknown container type `{type_name}`")]
    UnknownType { path: String, type_name: String },
    #[error("{path}: malformed number token `{token}`")]
    BadNumber { path: String, token: String },
    #[error("{path}: {message}")]
    Malformed { path: String, message: String },
}

impl FormatError {
    /// Path to the offending node, for diagnostics.
    pub fn path(&self) -> &str {
        match self {
            FormatError::MissingField { path, .. }
            | FormatError::WrongType { path, .. }
            | FormatError::UnknownType { path, .. }
            | FormatError::BadNumber { path, .. }
            | FormatError::Malformed { path, .. } => path,
        }
    }
}

/// A document's `version` field is incompatible with this reader.
#[derive(Debug, thiserror::Error)]
#[error("document version {found} is incompatible with reader version {reader}")]
pub struct VersionError {
    pub found: String,
    pub reader: String,
}

/// Construction-time and registry misuse.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("type `{0}` is already registered with a different factory")]
    DuplicateType(String),
    #[error("invalid construction: {0}")]
    InvalidConstruction(String),
}

/// A user-supplied quantity failed to evaluate.
#[derive(Debug, thiserror::Error)]
#[error("quantity `{name}` failed: {message}")]
pub struct QuantityError {
    pub name: String,
    pub message: String,
}

impl QuantityError {
    pub fn new(name: impl Into<String>, message: impl fmt::Display) -> Self {
        Self {
            name: name.into(),
            message: message.to_string(),
        }
    }
}
