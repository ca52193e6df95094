//! Error types for the CTS framework.
//!
//! Case-body failures are never errors at this level: they are recorded as
//! `fail` results on the case. Everything here is a structural problem with
//! a group, a query, or a spec module, and aborts the enclosing load.

use thiserror::Error;

/// Errors raised while registering, validating, addressing, or loading tests.
#[derive(Debug, Error)]
pub enum FrameworkError {
    /// Two registered cases share one identity.
    #[error("duplicate test case: {0}")]
    DuplicateCase(String),

    /// A case name cannot be addressed by a query.
    #[error("invalid test case name {name:?}: {reason}")]
    InvalidCaseName { name: String, reason: String },

    /// A query string could not be parsed.
    #[error("invalid query {query:?}: {reason}")]
    InvalidQuery { query: String, reason: String },

    /// No spec module is registered at the requested path.
    #[error("unknown spec: {0}")]
    UnknownSpec(String),

    /// A query selected a case the spec does not contain.
    #[error("spec {spec} has no test case {case}")]
    UnknownCase { spec: String, case: String },

    /// A spec module was registered without a description.
    #[error("spec module missing description: {0}")]
    MissingDescription(String),

    /// A spec module failed validation.
    #[error("spec module {spec} is invalid: {source}")]
    InvalidSpec {
        spec: String,
        #[source]
        source: Box<FrameworkError>,
    },

    /// A case recorder was driven out of order.
    #[error("case {case}: {reason}")]
    CaseLifecycle { case: String, reason: &'static str },

    /// Parameter values that do not form a valid param spec.
    #[error("invalid params: {0}")]
    InvalidParams(String),

    /// Report serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for framework operations.
pub type FrameworkResult<T> = std::result::Result<T, FrameworkError>;
