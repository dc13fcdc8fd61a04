//! Request parameters for list operations
//!
//! Reserved query keys control the window and ordering; every other key is
//! a filter.
//!
//! | Key | Meaning |
//! |-----|---------|
//! | `count` | page size, clamped to `pagination.max_count` |
//! | `offset` | rows to skip |
//! | `page` | 1-indexed page, used when `offset` is absent |
//! | `sort` | comma-separated fields, `-field` for descending |
//! | `q` | free-text search |
//! | `field=value` | equality filter |
//! | `field__op=value` | `ne`, `gt`, `gte`, `lt`, `lte`, `like`, `in` (comma-separated) |
//! | `field__null=true` | `IS NULL` (`false` for `IS NOT NULL`) |
//!
//! # Example
//!
//! ```rust
//! use relist::config::PaginationConfig;
//! use relist::handlers::ListQuery;
//!
//! let uri = "/users?count=10&page=3&sort=-age".parse().unwrap();
//! let query = ListQuery::from_uri(&uri).unwrap();
//! let context = query.into_context(&PaginationConfig::default());
//!
//! assert_eq!(context.count, 10);
//! assert_eq!(context.offset, 20);
//! ```

use axum::extract::Query;
use axum::http::Uri;

use super::error::ApiError;
use crate::config::PaginationConfig;
use crate::context::FetchContext;
use crate::query::{FilterCondition, FilterOperator, FilterValue, OrderTerm, Pagination};

const RESERVED: [&str; 5] = ["count", "offset", "page", "sort", "q"];

/// Parsed list request parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    /// Requested page size
    pub count: Option<i64>,
    /// Requested number of rows to skip
    pub offset: Option<i64>,
    /// Requested 1-indexed page
    pub page: Option<i64>,
    /// Requested ordering
    pub sort: Vec<OrderTerm>,
    /// Search term
    pub search: Option<String>,
    /// Filters with uncoerced values
    pub filters: Vec<FilterCondition>,
}

impl ListQuery {
    /// Parse the query string of a request URI
    ///
    /// # Errors
    ///
    /// Returns an invalid-pagination error for non-numeric window parameters
    /// and an invalid-filter error for malformed filter keys.
    pub fn from_uri(uri: &Uri) -> Result<Self, ApiError> {
        let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(uri)
            .map_err(|e| ApiError::invalid_filter("query", e.body_text()))?;
        Self::from_pairs(pairs)
    }

    /// Parse decoded key/value pairs, in request order
    ///
    /// # Errors
    ///
    /// See [`ListQuery::from_uri`].
    pub fn from_pairs<I>(pairs: I) -> Result<Self, ApiError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut query = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "count" => query.count = Some(integer(&key, &value)?),
                "offset" => query.offset = Some(integer(&key, &value)?),
                "page" => {
                    let page = integer(&key, &value)?;
                    if page < 1 {
                        return Err(ApiError::invalid_pagination(format!(
                            "'page' starts at 1, got {}",
                            page
                        )));
                    }
                    query.page = Some(page);
                }
                "sort" => query.sort.extend(
                    value
                        .split(',')
                        .map(str::trim)
                        .filter(|item| !item.is_empty())
                        .map(OrderTerm::parse),
                ),
                "q" => query.search = Some(value),
                _ => query.filters.push(filter(&key, value)?),
            }
        }
        Ok(query)
    }

    /// Whether `key` is a window, sort or search parameter rather than a filter
    pub fn is_reserved(key: &str) -> bool {
        RESERVED.contains(&key)
    }

    /// Resolve defaults and build the fetch context hooks will see
    ///
    /// Out-of-range values are passed through unchanged so hooks can still
    /// correct them; they are rejected when the query is built.
    pub fn into_context(self, config: &PaginationConfig) -> FetchContext {
        let max_count = i64::try_from(config.max_count).unwrap_or(i64::MAX);
        let default_count = i64::try_from(config.default_count).unwrap_or(max_count);
        let count = self.count.unwrap_or(default_count).min(max_count);

        let offset = match (self.offset, self.page) {
            (Some(offset), _) => offset,
            (None, Some(page)) => match (u64::try_from(page), u64::try_from(count)) {
                (Ok(page), Ok(size)) => {
                    i64::try_from(Pagination::page(page, size).offset).unwrap_or(i64::MAX)
                }
                _ => 0,
            },
            (None, None) => 0,
        };

        FetchContext {
            offset,
            count,
            filters: self.filters,
            sort: self.sort,
            search: self.search,
            ..FetchContext::default()
        }
    }
}

fn integer(key: &str, value: &str) -> Result<i64, ApiError> {
    value.trim().parse().map_err(|_| {
        ApiError::invalid_pagination(format!("'{}' must be an integer, got '{}'", key, value))
    })
}

fn filter(key: &str, value: String) -> Result<FilterCondition, ApiError> {
    let Some((field, suffix)) = key.rsplit_once("__") else {
        return Ok(FilterCondition::eq(key, value));
    };
    if field.is_empty() {
        return Err(ApiError::invalid_filter(key, "missing field name"));
    }

    if suffix == "null" {
        return match value.trim() {
            "true" | "1" => Ok(FilterCondition::is_null(field)),
            "false" | "0" => Ok(FilterCondition::is_not_null(field)),
            _ => Err(ApiError::invalid_filter(key, "expected true or false")),
        };
    }

    let operator = FilterOperator::from_suffix(suffix)
        .ok_or_else(|| ApiError::invalid_filter(key, format!("unknown operator '{}'", suffix)))?;
    let value = match operator {
        FilterOperator::In => FilterValue::StringList(
            value
                .split(',')
                .map(|item| item.trim().to_string())
                .collect(),
        ),
        _ => FilterValue::String(value),
    };
    Ok(FilterCondition::new(field, operator, value))
}
