//! Errors raised while turning a fetch request into a query plan

use thiserror::Error;

/// Query construction failure
///
/// All variants are caller mistakes and map to 400-class responses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// A filter, sort or search term references a field that cannot be used
    #[error("invalid filter on '{field}': {reason}")]
    InvalidFilter {
        /// The offending field as supplied by the caller
        field: String,
        /// Why it was rejected
        reason: String,
    },

    /// Requested page bounds are out of range
    #[error("invalid pagination: {0}")]
    InvalidPagination(String),

    /// An include names an association the model does not declare
    #[error("model '{model}' has no association '{alias}'")]
    AssociationNotFound {
        /// Base model name
        model: String,
        /// Requested association alias
        alias: String,
    },
}

impl QueryError {
    pub(crate) fn invalid_filter(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFilter {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = QueryError::invalid_filter("age", "unknown attribute");
        assert_eq!(err.to_string(), "invalid filter on 'age': unknown attribute");

        let err = QueryError::AssociationNotFound {
            model: "users".to_string(),
            alias: "pets".to_string(),
        };
        assert_eq!(err.to_string(), "model 'users' has no association 'pets'");
    }
}
