//! Error types for dataset operations.
//!
//! Every public operation returns [`DatasetResult`]. The variants mirror the
//! outcomes a caller can act on; `Coercion` and `Provisioning` carry detail
//! for the logs but surface to callers as a generic internal failure (see
//! [`DatasetError::kind`]).

use thiserror::Error;

/// Result alias used across the crate.
pub type DatasetResult<T> = Result<T, DatasetError>;

/// Errors produced while ingesting, editing or reading datasets.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// Malformed upload, unparseable geometry or an unsafe identifier
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Name collides with a catalog entry or an existing schema object
    #[error("dataset '{0}' already exists")]
    AlreadyExists(String),

    /// Operation targets a dataset absent from the catalog
    #[error("dataset '{0}' not found")]
    NotFound(String),

    /// A property value does not convert to its column type
    #[error("cannot coerce property '{property}' of feature {feature}: {message}")]
    Coercion {
        /// Property (column) name
        property: String,
        /// Zero-based feature index within the upload
        feature: usize,
        /// What went wrong
        message: String,
    },

    /// DDL for the physical table could not be executed
    #[error("failed to provision table '{table}': {message}")]
    Provisioning {
        /// Physical table name
        table: String,
        /// Underlying failure
        message: String,
    },

    /// Storage or transaction failure
    #[error("internal error: {0}")]
    Internal(String),
}

/// Caller-visible error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    AlreadyExists,
    NotFound,
    Internal,
}

impl ErrorKind {
    /// Stable code reported by the HTTP layer.
    pub fn api_code(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "INVALID_INPUT",
            ErrorKind::AlreadyExists => "RESOURCE_ALREADY_EXISTS",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Internal => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl DatasetError {
    pub fn invalid(message: impl Into<String>) -> Self {
        DatasetError::InvalidInput(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        DatasetError::Internal(message.into())
    }

    /// The category reported to callers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DatasetError::InvalidInput(_) => ErrorKind::InvalidInput,
            DatasetError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            DatasetError::NotFound(_) => ErrorKind::NotFound,
            DatasetError::Coercion { .. }
            | DatasetError::Provisioning { .. }
            | DatasetError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Message safe to hand to an end user.
    ///
    /// Internal failures are reported generically; their detail only goes
    /// to the log.
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal => "an unexpected error occurred".to_string(),
            _ => self.to_string(),
        }
    }
}

/// True when the error is SQLite rejecting a duplicate key.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

impl From<rusqlite::Error> for DatasetError {
    fn from(err: rusqlite::Error) -> Self {
        if is_unique_violation(&err) {
            // The catalog's UNIQUE(table_name) is the only unique key we write
            // through a generic path.
            return DatasetError::AlreadyExists(constraint_subject(&err));
        }
        DatasetError::Internal(err.to_string())
    }
}

fn constraint_subject(err: &rusqlite::Error) -> String {
    match err {
        rusqlite::Error::SqliteFailure(_, Some(msg)) => msg.clone(),
        other => other.to_string(),
    }
}

impl From<serde_json::Error> for DatasetError {
    fn from(err: serde_json::Error) -> Self {
        DatasetError::Internal(err.to_string())
    }
}
