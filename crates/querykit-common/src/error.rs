//! Unified error type for querykit.
//!
//! Parameter binding, field restriction, query compilation, and database
//! failures all surface as [`Error`]. Database errors keep their original
//! source so callers see exactly what the engine reported.

use std::fmt;

/// Unified error type covering all failure modes in querykit.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A parameter declared by a query was not supplied.
    #[error("Missing parameter: {name}")]
    MissingParameter {
        /// Name of the declared parameter.
        name: String,
    },

    /// A supplied parameter value does not match the declared type.
    #[error("Parameter '{name}' expects {expected}, got {found}")]
    ParameterType {
        /// Name of the parameter.
        name: String,
        /// The declared type.
        expected: String,
        /// The type of the supplied value.
        found: String,
    },

    /// A supplied parameter is not declared by the query.
    #[error("Unknown parameter: {name}")]
    UnknownParameter {
        /// Name of the undeclared parameter.
        name: String,
    },

    /// A column required by a field restriction is absent from the record.
    #[error("Missing column: {column}")]
    MissingColumn {
        /// Name of the absent column.
        column: String,
    },

    /// A query builder could not be compiled into a statement.
    #[error("Compile error: {0}")]
    Compile(String),

    /// A database operation failed.
    #[error("Database error: {source}")]
    Database {
        /// The underlying database error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "person").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// A conflicting row already exists.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Input or configuration failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Convenience constructor for [`Error::MissingParameter`].
    pub fn missing_parameter(name: impl Into<String>) -> Self {
        Error::MissingParameter { name: name.into() }
    }

    /// Convenience constructor for [`Error::ParameterType`].
    pub fn parameter_type(
        name: impl Into<String>,
        expected: impl fmt::Display,
        found: impl fmt::Display,
    ) -> Self {
        Error::ParameterType {
            name: name.into(),
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    /// Convenience constructor for [`Error::UnknownParameter`].
    pub fn unknown_parameter(name: impl Into<String>) -> Self {
        Error::UnknownParameter { name: name.into() }
    }

    /// Convenience constructor for [`Error::MissingColumn`].
    pub fn missing_column(column: impl Into<String>) -> Self {
        Error::MissingColumn {
            column: column.into(),
        }
    }

    /// Convenience constructor for [`Error::Compile`].
    pub fn compile(msg: impl Into<String>) -> Self {
        Error::Compile(msg.into())
    }

    /// Convenience constructor for [`Error::Database`].
    pub fn database(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Database {
            source: source.into(),
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Whether this error was raised before any statement reached the
    /// database (binding, restriction, or compilation).
    pub fn is_binding(&self) -> bool {
        matches!(
            self,
            Error::MissingParameter { .. }
                | Error::ParameterType { .. }
                | Error::UnknownParameter { .. }
                | Error::MissingColumn { .. }
                | Error::Compile(_)
        )
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
