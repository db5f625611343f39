//! Unified error types for the provisioner.
//!
//! Error codes:
//! - DIR_404: referenced directory object is absent
//! - DIR_409: object already exists (object-level no-op, never surfaced by the engine)
//! - DIR_401: directory service rejected the bind credentials
//! - HOST_001: host probe could not connect (never fatal)
//! - VALID_001: request rejected before any directory mutation
//! - JOB_408: caller-supplied deadline elapsed
//! - INTERNAL_500: anything else

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Kind of directory object an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectRef {
    OrganizationalUnit,
    Group,
    User,
    Computer,
    Entry,
}

impl ObjectRef {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OrganizationalUnit => "organizational unit",
            Self::Group => "group",
            Self::User => "user",
            Self::Computer => "computer",
            Self::Entry => "entry",
        }
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for the provisioner.
#[derive(Debug, Error)]
pub enum Error {
    #[error("[DIR_404] {kind} not found: {name}")]
    NotFound { kind: ObjectRef, name: String },

    #[error("[DIR_409] {kind} already exists: {name}")]
    AlreadyExists { kind: ObjectRef, name: String },

    #[error("[HOST_001] host unreachable: {0}")]
    Unreachable(String),

    #[error("[DIR_401] unauthorized: {0}")]
    Unauthorized(String),

    #[error("[VALID_001] validation error: {0}")]
    Validation(String),

    #[error("[JOB_408] deadline of {seconds}s exceeded while {operation}")]
    DeadlineExceeded { operation: String, seconds: u64 },

    #[error("[INTERNAL_500] {0}")]
    Unexpected(String),
}

impl Error {
    pub fn not_found(kind: ObjectRef, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn already_exists(kind: ObjectRef, name: impl Into<String>) -> Self {
        Self::AlreadyExists {
            kind,
            name: name.into(),
        }
    }

    pub fn unreachable(host: impl Into<String>) -> Self {
        Self::Unreachable(host.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn deadline(operation: impl Into<String>, seconds: u64) -> Self {
        Self::DeadlineExceeded {
            operation: operation.into(),
            seconds,
        }
    }

    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self::Unexpected(msg.into())
    }

    /// Stable error code for callers that forward results.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "DIR_404",
            Self::AlreadyExists { .. } => "DIR_409",
            Self::Unreachable(_) => "HOST_001",
            Self::Unauthorized(_) => "DIR_401",
            Self::Validation(_) => "VALID_001",
            Self::DeadlineExceeded { .. } => "JOB_408",
            Self::Unexpected(_) => "INTERNAL_500",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Unexpected(format!("serialization error: {}", err))
    }
}
