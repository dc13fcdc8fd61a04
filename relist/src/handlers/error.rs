//! API error types for list and read requests
//!
//! Every failure of the fetch pipeline ends up as an [`ApiError`], which maps
//! itself onto an HTTP status and a JSON body via `IntoResponse`.
//!
//! # Example
//!
//! ```rust
//! use relist::handlers::{ApiError, ApiErrorKind};
//!
//! let error = ApiError::not_found("users", "42");
//! assert!(matches!(error.kind, ApiErrorKind::NotFound));
//! assert_eq!(error.kind.status_code().as_u16(), 404);
//! ```

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::query::QueryError;
use crate::store::StoreError;

/// Operation being performed when the API error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiOperation {
    /// Listing a collection
    List,
    /// Reading a single record by key
    Read,
}

impl fmt::Display for ApiOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List => write!(f, "list"),
            Self::Read => write!(f, "read"),
        }
    }
}

/// Category of API error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// A filter, sort or search references an unusable field or value
    InvalidFilter,
    /// Requested page bounds are out of range
    InvalidPagination,
    /// An include names an undeclared association
    AssociationNotFound,
    /// No record has the requested key
    NotFound,
    /// The store failed to execute a query
    StoreExecution,
    /// Any other server-side failure
    Internal,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFilter => write!(f, "invalid_filter"),
            Self::InvalidPagination => write!(f, "invalid_pagination"),
            Self::AssociationNotFound => write!(f, "association_not_found"),
            Self::NotFound => write!(f, "not_found"),
            Self::StoreExecution => write!(f, "store_execution"),
            Self::Internal => write!(f, "internal_error"),
        }
    }
}

impl ApiErrorKind {
    /// Get the HTTP status code for this error kind
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidFilter | Self::InvalidPagination | Self::AssociationNotFound => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::StoreExecution | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code string for this error kind
    #[must_use]
    pub fn error_code(&self) -> String {
        format!("{}", self).to_uppercase()
    }
}

/// Structured API error with operation context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// The operation being performed when the error occurred
    pub operation: ApiOperation,
    /// The category of error
    pub kind: ApiErrorKind,
    /// Human-readable error message, safe to return to the caller
    pub message: String,
    /// Request field the error refers to
    pub field: Option<String>,
    /// Resource being fetched
    pub resource: Option<String>,
    /// Whether the underlying failure is transient
    pub retriable: bool,
}

impl ApiError {
    /// Create a new API error
    pub fn new(operation: ApiOperation, kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            field: None,
            resource: None,
            retriable: false,
        }
    }

    /// No record of `resource` has the key `id`
    pub fn not_found(resource: impl Into<String>, id: impl Into<String>) -> Self {
        let resource = resource.into();
        let id: String = id.into();
        Self {
            message: format!("No {} record with key '{}'", resource, id),
            resource: Some(resource),
            ..Self::new(ApiOperation::Read, ApiErrorKind::NotFound, String::new())
        }
    }

    /// Malformed request parameter
    pub fn invalid_filter(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            ..Self::new(ApiOperation::List, ApiErrorKind::InvalidFilter, message)
        }
    }

    /// Out-of-range page bounds
    pub fn invalid_pagination(message: impl Into<String>) -> Self {
        Self::new(ApiOperation::List, ApiErrorKind::InvalidPagination, message)
    }

    /// Server-side failure with a caller-safe message
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ApiOperation::List, ApiErrorKind::Internal, message)
    }

    /// Set the operation that caused the error
    #[must_use]
    pub fn with_operation(mut self, operation: ApiOperation) -> Self {
        self.operation = operation;
        self
    }

    /// Add the resource being fetched
    #[must_use]
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Check if this error is retriable (transient errors that may succeed on retry)
    pub fn is_retriable(&self) -> bool {
        self.retriable
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "API {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        if let Some(ref resource) = self.resource {
            write!(f, " [resource: {}]", resource)?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

/// Response body for API errors
#[derive(Debug, Serialize, Deserialize)]
struct ApiErrorResponse {
    error: String,
    code: String,
    status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    resource: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.kind.status_code();
        let code = self.kind.error_code();

        if status.is_server_error() {
            tracing::error!(
                operation = %self.operation,
                kind = %self.kind,
                resource = ?self.resource,
                retriable = self.is_retriable(),
                "API error: {}", self.message
            );
        } else {
            tracing::debug!(
                operation = %self.operation,
                kind = %self.kind,
                resource = ?self.resource,
                field = ?self.field,
                "Rejected request: {}", self.message
            );
        }

        let response = ApiErrorResponse {
            error: self.message,
            code,
            status: status.as_u16(),
            field: self.field,
            resource: self.resource,
        };

        (status, Json(response)).into_response()
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        let message = err.to_string();
        match err {
            QueryError::InvalidFilter { field, .. } => Self::invalid_filter(field, message),
            QueryError::InvalidPagination(_) => Self::invalid_pagination(message),
            QueryError::AssociationNotFound { alias, .. } => Self {
                field: Some(alias),
                ..Self::new(ApiOperation::List, ApiErrorKind::AssociationNotFound, message)
            },
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        // Store details stay in the logs
        tracing::error!(
            operation = %err.operation,
            kind = %err.kind,
            table = ?err.table,
            "Store error: {}", err.message
        );

        Self {
            retriable: err.is_retriable(),
            ..Self::new(
                ApiOperation::List,
                ApiErrorKind::StoreExecution,
                "An internal error occurred",
            )
        }
    }
}
