//! Store error types
//!
//! # Example
//!
//! ```rust
//! use relist::store::{StoreError, StoreErrorKind, StoreOperation};
//!
//! let error = StoreError::unknown_table(StoreOperation::SelectRows, "users");
//! assert_eq!(error.kind, StoreErrorKind::UnknownTable);
//! assert!(!error.is_retriable());
//! ```

use std::fmt;

/// Store primitive being executed when the error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    /// Establishing a connection or pool
    Connect,
    /// Executing a count query
    Count,
    /// Selecting bounded primary keys
    SelectKeys,
    /// Selecting (joined) rows
    SelectRows,
    /// Inserting records
    BulkInsert,
    /// Inserting join-table rows
    Link,
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => write!(f, "connect"),
            Self::Count => write!(f, "count"),
            Self::SelectKeys => write!(f, "select_keys"),
            Self::SelectRows => write!(f, "select_rows"),
            Self::BulkInsert => write!(f, "bulk_insert"),
            Self::Link => write!(f, "link"),
        }
    }
}

/// Category of store error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreErrorKind {
    /// Failed to connect
    ConnectionFailed,
    /// Statement execution failed
    QueryFailed,
    /// A table referenced by a descriptor does not exist
    UnknownTable,
    /// A column value could not be decoded
    TypeConversion,
    /// Operation timed out
    Timeout,
    /// Connection pool exhausted
    PoolExhausted,
    /// Other unclassified error
    Other,
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionFailed => write!(f, "connection_failed"),
            Self::QueryFailed => write!(f, "query_failed"),
            Self::UnknownTable => write!(f, "unknown_table"),
            Self::TypeConversion => write!(f, "type_conversion"),
            Self::Timeout => write!(f, "timeout"),
            Self::PoolExhausted => write!(f, "pool_exhausted"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Structured store error with operation context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    /// The primitive being executed
    pub operation: StoreOperation,
    /// The category of error
    pub kind: StoreErrorKind,
    /// Human-readable error message
    pub message: String,
    /// Table involved, when known
    pub table: Option<String>,
}

impl StoreError {
    /// Create a new store error
    pub fn new(operation: StoreOperation, kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            table: None,
        }
    }

    /// A descriptor referenced a table the store does not have
    pub fn unknown_table(operation: StoreOperation, table: impl Into<String>) -> Self {
        let table = table.into();
        Self {
            operation,
            kind: StoreErrorKind::UnknownTable,
            message: format!("table '{}' does not exist", table),
            table: Some(table),
        }
    }

    /// Statement execution failed
    pub fn query_failed(operation: StoreOperation, message: impl Into<String>) -> Self {
        Self::new(operation, StoreErrorKind::QueryFailed, message)
    }

    /// Connection could not be established
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::new(
            StoreOperation::Connect,
            StoreErrorKind::ConnectionFailed,
            message,
        )
    }

    /// Whether retrying the same operation may succeed
    pub fn is_retriable(&self) -> bool {
        matches!(
            self.kind,
            StoreErrorKind::ConnectionFailed | StoreErrorKind::Timeout | StoreErrorKind::PoolExhausted
        )
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Store {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        if let Some(ref table) = self.table {
            write!(f, " [table: {}]", table)?;
        }
        Ok(())
    }
}

impl std::error::Error for StoreError {}

#[cfg(feature = "database")]
impl StoreError {
    /// Classify a driver error raised while executing `operation`
    pub fn from_sqlx(operation: StoreOperation, err: sqlx::Error) -> Self {
        use sqlx::Error as E;
        match err {
            E::PoolTimedOut => Self::new(
                operation,
                StoreErrorKind::PoolExhausted,
                "Connection pool timed out",
            ),
            E::PoolClosed => Self::new(
                operation,
                StoreErrorKind::ConnectionFailed,
                "Connection pool is closed",
            ),
            E::Io(e) => Self::new(operation, StoreErrorKind::ConnectionFailed, e.to_string()),
            E::Tls(e) => Self::new(
                operation,
                StoreErrorKind::ConnectionFailed,
                format!("TLS error: {}", e),
            ),
            E::ColumnDecode { index, source } => Self::new(
                operation,
                StoreErrorKind::TypeConversion,
                format!("Failed to decode column {}: {}", index, source),
            ),
            E::Decode(e) => Self::new(operation, StoreErrorKind::TypeConversion, e.to_string()),
            E::Database(db_err) => {
                // 42P01: undefined_table
                if db_err.code().as_deref() == Some("42P01") {
                    Self::new(operation, StoreErrorKind::UnknownTable, db_err.to_string())
                } else {
                    Self::query_failed(operation, db_err.to_string())
                }
            }
            E::WorkerCrashed => Self::new(
                operation,
                StoreErrorKind::ConnectionFailed,
                "Database worker crashed",
            ),
            _ => Self::new(operation, StoreErrorKind::Other, err.to_string()),
        }
    }
}
