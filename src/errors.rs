use std::fmt;

use thiserror::Error;

/// Which version comparison produced a [`PersistError::VersionMismatch`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MismatchScope {
    /// The live database holds a different data version than the application.
    Database,
    /// An interchange file set was written by a different data version.
    Interchange,
}

impl fmt::Display for MismatchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MismatchScope::Database => f.write_str("database"),
            MismatchScope::Interchange => f.write_str("interchange"),
        }
    }
}

/// Error type for persistence lifecycle operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("configuration error: {0}")]
    ConfigurationError(String),
    #[error(
        "data version mismatch ({scope} data version: {stored}, application data version: {expected})"
    )]
    VersionMismatch {
        scope: MismatchScope,
        stored: String,
        expected: String,
    },
    #[error("incorrect data format: {0}")]
    DataFormatError(String),
    #[error("error executing sql `{statement}`: {message}")]
    SqlExecutionError { statement: String, message: String },
    #[error("replication conflict on {entity} #{id}: {message}")]
    ReplicationConflict {
        entity: String,
        id: i64,
        message: String,
    },
    #[error("connection error: {0}")]
    ConnectionError(String),
    #[error("io error: {0}")]
    IoError(String),
}

impl PersistError {
    pub fn configuration<T: Into<String>>(msg: T) -> Self {
        PersistError::ConfigurationError(msg.into())
    }

    pub fn version_mismatch<S: Into<String>, E: Into<String>>(
        scope: MismatchScope,
        stored: S,
        expected: E,
    ) -> Self {
        PersistError::VersionMismatch {
            scope,
            stored: stored.into(),
            expected: expected.into(),
        }
    }

    pub fn data_format<T: Into<String>>(msg: T) -> Self {
        PersistError::DataFormatError(msg.into())
    }

    pub fn sql<S: Into<String>, M: Into<String>>(statement: S, message: M) -> Self {
        PersistError::SqlExecutionError {
            statement: statement.into(),
            message: message.into(),
        }
    }

    pub fn replication_conflict<E: Into<String>, M: Into<String>>(
        entity: E,
        id: i64,
        message: M,
    ) -> Self {
        PersistError::ReplicationConflict {
            entity: entity.into(),
            id,
            message: message.into(),
        }
    }

    pub fn connection<T: Into<String>>(msg: T) -> Self {
        PersistError::ConnectionError(msg.into())
    }

    pub fn io<T: Into<String>>(msg: T) -> Self {
        PersistError::IoError(msg.into())
    }
}
