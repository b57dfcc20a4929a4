//! Error types for sprocket

use thiserror::Error;

/// Core error type for procedure calls
#[derive(Error, Debug)]
pub enum ProcError {
    /// Descriptor was not fully initialized before use
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A structured parameter was bound to an incompatible value
    #[error("Type mismatch for field {field}: {message}")]
    TypeMismatch { field: String, message: String },

    /// A result column could not be assigned to its target field
    #[error("Error processing return column {column} in {record}: {message}")]
    FieldMapping {
        column: String,
        record: String,
        message: String,
    },

    /// The underlying open/execute/read operation failed
    #[error("Error reading from stored proc {routine}: {message}")]
    Transport { routine: String, message: String },

    /// An in-flight call was cancelled by the caller's signal
    #[error("Cancelled")]
    Cancelled,

    /// The transport cannot represent the requested operation
    #[error("Not supported: {0}")]
    NotSupported(String),

    /// IO error from a stream destination
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProcError {
    /// Wrap a transport failure with the routine name it occurred in.
    pub fn transport(routine: impl Into<String>, message: impl std::fmt::Display) -> Self {
        ProcError::Transport {
            routine: routine.into(),
            message: message.to_string(),
        }
    }

    /// Wrap a per-field failure with the column and record type it occurred in.
    pub fn field_mapping(
        column: impl Into<String>,
        record: &'static str,
        message: impl std::fmt::Display,
    ) -> Self {
        ProcError::FieldMapping {
            column: column.into(),
            record: record.to_string(),
            message: message.to_string(),
        }
    }
}

/// A value could not be converted to the target field type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot convert {from} to {to}")]
pub struct ConvertError {
    pub from: &'static str,
    pub to: &'static str,
}

impl ConvertError {
    pub fn new(from: &'static str, to: &'static str) -> Self {
        Self { from, to }
    }
}

/// Result type alias for procedure calls
pub type Result<T> = std::result::Result<T, ProcError>;
