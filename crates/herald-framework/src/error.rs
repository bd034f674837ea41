//! Error types for the Herald framework.
//!
//! User-facing failures (unknown command, bad syntax, a failed constraint)
//! are not errors here: they cancel the invocation and produce a reply.
//! The types below cover misconfiguration and handler faults.

use thiserror::Error;

/// A catalog that cannot be dispatched against.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("command has no labels")]
    EmptyLabels,

    #[error("label '{label}' is declared by more than one command{}", scope_suffix(.scope))]
    DuplicateLabel { label: String, scope: Option<String> },

    #[error("command '{command}' has neither a handler nor sub-commands")]
    NoHandler { command: String },

    #[error("command '{command}': parameter '{parameter}': {reason}")]
    InvalidParameter {
        command: String,
        parameter: String,
        reason: String,
    },

    #[error("command '{command}': no type adapter registered for parameter '{parameter}' of type {ty}")]
    MissingAdapter {
        command: String,
        parameter: String,
        ty: String,
    },

    #[error("command '{command}': unknown validator '{validator}' on parameter '{parameter}'")]
    UnknownValidator {
        command: String,
        parameter: String,
        validator: String,
    },
}

fn scope_suffix(scope: &Option<String>) -> String {
    scope
        .as_ref()
        .map(|s| format!(" under '{s}'"))
        .unwrap_or_default()
}

impl CatalogError {
    pub fn invalid_parameter(
        command: impl Into<String>,
        parameter: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            command: command.into(),
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }
}

/// Errors that abort a dispatch.
///
/// These indicate a configuration defect rather than bad user input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("no type adapter found for {ty} (command '{command}')")]
    MissingAdapter { command: String, ty: String },

    #[error("an instance of the command dispatcher is already running")]
    AlreadyActive,
}

/// Errors raised while handing bound arguments to a handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    #[error("argument {position}: expected {expected}, found {found}")]
    TypeMismatch {
        position: usize,
        expected: &'static str,
        found: &'static str,
    },

    #[error("argument {position}: required {expected} was not supplied")]
    Missing {
        position: usize,
        expected: &'static str,
    },
}

/// A handler that panicked instead of returning.
#[derive(Debug, Clone, Error)]
#[error("handler panicked: {0}")]
pub struct HandlerPanic(pub String);

/// Result type for catalog construction.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;
