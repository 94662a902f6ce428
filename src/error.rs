//! Error types for the collation fixer.
//!
//! All failures flow through [`FixerError`]. Skip conditions are not errors;
//! they are reported by the eligibility filter as a [`Decision`](crate::models::Decision).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FixerError {
    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Query failed: {message}")]
    Query {
        message: String,
        /// e.g. "42S02" for an unknown table
        sql_state: Option<String>,
        suggestion: String,
    },

    #[error("Table '{table}' not found in schema '{schema}'")]
    TableNotFound { schema: String, table: String },

    #[error("Column '{column}' not found on table '{table}'")]
    ColumnNotFound { table: String, column: String },

    #[error("Conversion of {item} failed: {message}{}", rollback_note(.rolled_back))]
    Conversion {
        item: String,
        message: String,
        sql_state: Option<String>,
        /// True once every change made earlier in the batch has been undone.
        rolled_back: bool,
    },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl FixerError {
    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a query error with optional SQL state.
    pub fn query(
        message: impl Into<String>,
        sql_state: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Query {
            message: message.into(),
            sql_state,
            suggestion: suggestion.into(),
        }
    }

    pub fn table_not_found(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self::TableNotFound {
            schema: schema.into(),
            table: table.into(),
        }
    }

    pub fn column_not_found(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::ColumnNotFound {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Create a conversion error for a rejected DDL statement.
    ///
    /// The SQL state is lifted from `cause` when it is a [`FixerError::Query`].
    pub fn conversion(item: impl Into<String>, cause: &FixerError, rolled_back: bool) -> Self {
        let (message, sql_state) = match cause {
            Self::Query {
                message, sql_state, ..
            } => (message.clone(), sql_state.clone()),
            other => (other.to_string(), None),
        };
        Self::Conversion {
            item: item.into(),
            message,
            sql_state,
            rolled_back,
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Query { suggestion, .. } => Some(suggestion),
            Self::TableNotFound { .. } => Some("Run list-tables to see the available tables"),
            Self::ColumnNotFound { .. } => Some("Run list-columns to see the table's columns"),
            Self::Conversion { .. } => Some(
                "Indexed columns may exceed key length limits and foreign key columns cannot change charset; \
                 retry with indexed columns skipped or convert them manually",
            ),
            _ => None,
        }
    }
}

fn rollback_note(rolled_back: &bool) -> &'static str {
    if *rolled_back {
        " (batch rolled back)"
    } else {
        ""
    }
}

/// Convert sqlx errors to FixerError.
impl From<sqlx::Error> for FixerError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => FixerError::connection(
                msg.to_string(),
                "Check the host, port and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                FixerError::query(
                    db_err.message(),
                    code,
                    "Check the referenced schema, table and column names",
                )
            }
            sqlx::Error::RowNotFound => FixerError::query(
                "No rows returned",
                None,
                "Verify the schema and table names",
            ),
            sqlx::Error::PoolTimedOut => {
                FixerError::connection("Timed out waiting for a connection", "Retry later")
            }
            sqlx::Error::PoolClosed => {
                FixerError::connection("Connection is closed", "Reconnect to the database")
            }
            sqlx::Error::Io(io_err) => FixerError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => FixerError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => FixerError::connection(
                format!("Protocol error: {}", msg),
                "Check that the server speaks the MySQL protocol",
            ),
            sqlx::Error::ColumnNotFound(col) => {
                FixerError::internal(format!("Catalog column not found: {}", col))
            }
            sqlx::Error::ColumnDecode { index, source } => {
                FixerError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => {
                FixerError::internal(format!("Decode error: {}", source))
            }
            sqlx::Error::WorkerCrashed => FixerError::internal("Database worker crashed"),
            _ => FixerError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Result type alias used across the crate.
pub type FixerResult<T> = Result<T, FixerError>;
