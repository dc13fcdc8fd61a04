//! Per-request fetch state shared with hooks

use serde::{Deserialize, Serialize};

use crate::handlers::ResultPage;
use crate::query::{FilterCondition, OrderTerm};

/// Query options a hook may set for one request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOptions {
    /// Overrides the resource's `sub_query` default when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_query: Option<bool>,
}

/// Mutable state of one list or read request
///
/// Created from the parsed request, handed to every hook in order, then read
/// by strategy selection and query construction. After-hooks see the
/// assembled [`ResultPage`] in `page`.
///
/// `offset` and `count` are signed so hooks can assign any value; invalid
/// bounds are rejected when the query is built.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchContext {
    /// Rows to skip
    pub offset: i64,
    /// Maximum rows to return
    pub count: i64,
    /// Conjunctive filters; `alias.field` targets an included association
    pub filters: Vec<FilterCondition>,
    /// Requested ordering
    pub sort: Vec<OrderTerm>,
    /// Free-text search term
    pub search: Option<String>,
    /// Per-request query options
    pub options: QueryOptions,
    /// Result of the fetch, available to after-hooks
    pub page: Option<ResultPage>,
}

impl Default for FetchContext {
    fn default() -> Self {
        Self {
            offset: 0,
            count: 100,
            filters: Vec::new(),
            sort: Vec::new(),
            search: None,
            options: QueryOptions::default(),
            page: None,
        }
    }
}

impl FetchContext {
    /// Context for a window of `count` rows starting at `offset`
    pub fn window(offset: i64, count: i64) -> Self {
        Self {
            offset,
            count,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_serialize_camel_case() {
        let options = QueryOptions {
            sub_query: Some(false),
        };
        assert_eq!(
            serde_json::to_value(options).unwrap(),
            serde_json::json!({"subQuery": false})
        );
        assert_eq!(
            serde_json::to_value(QueryOptions::default()).unwrap(),
            serde_json::json!({})
        );
    }

    #[test]
    fn test_window() {
        let context = FetchContext::window(20, 10);
        assert_eq!(context.offset, 20);
        assert_eq!(context.count, 10);
        assert!(context.options.sub_query.is_none());
    }
}
