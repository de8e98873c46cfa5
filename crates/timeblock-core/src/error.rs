//! Core error types for timeblock-core.
//!
//! Errors here abort a whole operation. Per-task scheduling failures are
//! not errors: they are data carried in the run report (see
//! [`crate::scheduler::FailureReason`]).

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for timeblock-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Malformed task, event, zone or horizon input
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The dependency graph is not acyclic
    #[error("{0}")]
    Cycle(#[from] CycleError),

    /// A task source or calendar store call failed
    #[error("{0}")]
    Collaborator(#[from] CollaboratorError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Validation errors raised at ingestion. Never coerced to a default.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Invalid time range
    #[error("Invalid time range: end_time ({end}) must be greater than start_time ({start})")]
    InvalidTimeRange {
        start: chrono::DateTime<chrono::Utc>,
        end: chrono::DateTime<chrono::Utc>,
    },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// Two entities share an identity
    #[error("Duplicate {kind} id: {id}")]
    DuplicateId { kind: &'static str, id: String },

    /// A task lists itself as a dependency
    #[error("Task '{0}' depends on itself")]
    SelfDependency(String),

    /// The planning horizon is malformed or out of the supported span
    #[error("Invalid planning horizon: {0}")]
    InvalidHorizon(String),
}

impl ValidationError {
    pub(crate) fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// The task dependency graph contains at least one cycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Dependency cycle detected among tasks: {}", task_ids.join(", "))]
pub struct CycleError {
    /// Tasks that could not be ordered, sorted by id.
    pub task_ids: Vec<String>,
}

/// Failure reported by a task source or calendar store.
#[derive(Error, Debug)]
#[error("Collaborator error for '{service}': {message}")]
pub struct CollaboratorError {
    pub service: String,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl CollaboratorError {
    pub fn new(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        service: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            service: service.into(),
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

impl From<Box<dyn std::error::Error + Send + Sync>> for CoreError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        CoreError::Custom(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
