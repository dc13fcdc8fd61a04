//! Filtering, ordering and windowing types for list queries
//!
//! These are the building blocks of every query descriptor the engine hands to
//! a store: filter conditions for WHERE clauses, order terms for ORDER BY and
//! a [`Pagination`] window for LIMIT/OFFSET.
//!
//! # Example
//!
//! ```rust
//! use relist::query::{FilterCondition, OrderTerm, Pagination};
//!
//! let pagination = Pagination::new(0, 20);
//!
//! let filters = vec![
//!     FilterCondition::eq("status", "active"),
//!     FilterCondition::gte("age", 18_i64),
//!     FilterCondition::eq("hobbies.name", "coding"),
//! ];
//! assert_eq!(filters[2].qualifier(), Some("hobbies"));
//!
//! let order = OrderTerm::parse("-created_at");
//! assert_eq!(order.field, "created_at");
//! ```

use std::fmt;

use serde_json::Value;

use crate::model::AttributeType;

/// Direction for ordering results
///
/// # Example
///
/// ```rust
/// use relist::query::OrderDirection;
///
/// assert_eq!(format!("{}", OrderDirection::Ascending), "asc");
/// assert_eq!(OrderDirection::Descending.as_sql(), "DESC");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    /// Sort in ascending order (A-Z, 0-9)
    #[default]
    Ascending,
    /// Sort in descending order (Z-A, 9-0)
    Descending,
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "asc"),
            Self::Descending => write!(f, "desc"),
        }
    }
}

impl OrderDirection {
    /// SQL keyword for this direction
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

/// One ORDER BY term
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderTerm {
    /// Attribute of the base model
    pub field: String,
    /// Sort direction
    pub direction: OrderDirection,
}

impl OrderTerm {
    /// Ascending term
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Ascending,
        }
    }

    /// Descending term
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Descending,
        }
    }

    /// Parse a `sort` parameter item; a leading `-` means descending
    ///
    /// # Example
    ///
    /// ```rust
    /// use relist::query::{OrderDirection, OrderTerm};
    ///
    /// assert_eq!(OrderTerm::parse("name"), OrderTerm::asc("name"));
    /// assert_eq!(OrderTerm::parse("-name").direction, OrderDirection::Descending);
    /// ```
    pub fn parse(item: &str) -> Self {
        let item = item.trim();
        match item.strip_prefix('-') {
            Some(field) => Self::desc(field),
            None => Self::asc(item.strip_prefix('+').unwrap_or(item)),
        }
    }
}

/// LIMIT/OFFSET window applied to a query
///
/// # Example
///
/// ```rust
/// use relist::query::Pagination;
///
/// let page3 = Pagination::page(3, 20);
/// assert_eq!(page3.offset, 40);
/// assert_eq!(page3.limit, 20);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Number of results to skip
    pub offset: u64,
    /// Maximum number of results to return
    pub limit: u64,
}

impl Pagination {
    /// Create new pagination parameters
    #[must_use]
    pub const fn new(offset: u64, limit: u64) -> Self {
        Self { offset, limit }
    }

    /// Pagination for a 1-indexed page number
    #[must_use]
    pub const fn page(page_number: u64, page_size: u64) -> Self {
        let offset = page_number.saturating_sub(1).saturating_mul(page_size);
        Self {
            offset,
            limit: page_size,
        }
    }
}

/// Comparison operators for filter conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// Equal to (=)
    Equal,
    /// Not equal to (!=)
    NotEqual,
    /// Greater than (>)
    GreaterThan,
    /// Greater than or equal to (>=)
    GreaterThanOrEqual,
    /// Less than (<)
    LessThan,
    /// Less than or equal to (<=)
    LessThanOrEqual,
    /// Pattern matching (LIKE)
    Like,
    /// Value is in a list (IN)
    In,
    /// Value is null (IS NULL)
    IsNull,
    /// Value is not null (IS NOT NULL)
    IsNotNull,
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equal => write!(f, "="),
            Self::NotEqual => write!(f, "!="),
            Self::GreaterThan => write!(f, ">"),
            Self::GreaterThanOrEqual => write!(f, ">="),
            Self::LessThan => write!(f, "<"),
            Self::LessThanOrEqual => write!(f, "<="),
            Self::Like => write!(f, "LIKE"),
            Self::In => write!(f, "IN"),
            Self::IsNull => write!(f, "IS NULL"),
            Self::IsNotNull => write!(f, "IS NOT NULL"),
        }
    }
}

impl FilterOperator {
    /// Operator named by a `field__op` query suffix
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "eq" => Some(Self::Equal),
            "ne" => Some(Self::NotEqual),
            "gt" => Some(Self::GreaterThan),
            "gte" => Some(Self::GreaterThanOrEqual),
            "lt" => Some(Self::LessThan),
            "lte" => Some(Self::LessThanOrEqual),
            "like" => Some(Self::Like),
            "in" => Some(Self::In),
            _ => None,
        }
    }
}

/// A value that can be used in filter conditions
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// String value
    String(String),
    /// 64-bit integer value
    Integer(i64),
    /// 64-bit floating point value
    Float(f64),
    /// Boolean value
    Boolean(bool),
    /// List of string values (for IN operator)
    StringList(Vec<String>),
    /// List of integer values (for IN operator)
    IntegerList(Vec<i64>),
    /// List of float values (for IN operator)
    FloatList(Vec<f64>),
    /// List of boolean values (for IN operator)
    BooleanList(Vec<bool>),
    /// Null value (for IS NULL / IS NOT NULL)
    Null,
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for FilterValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for FilterValue {
    fn from(n: i32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<f64> for FilterValue {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(list: Vec<String>) -> Self {
        Self::StringList(list)
    }
}

impl From<Vec<i64>> for FilterValue {
    fn from(list: Vec<i64>) -> Self {
        Self::IntegerList(list)
    }
}

impl From<Vec<f64>> for FilterValue {
    fn from(list: Vec<f64>) -> Self {
        Self::FloatList(list)
    }
}

impl From<Vec<bool>> for FilterValue {
    fn from(list: Vec<bool>) -> Self {
        Self::BooleanList(list)
    }
}

impl FilterValue {
    /// Convert a JSON scalar (such as a primary key) into a filter value
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(Self::Null),
            Value::Bool(b) => Some(Self::Boolean(*b)),
            Value::Number(n) => n
                .as_i64()
                .map(Self::Integer)
                .or_else(|| n.as_f64().map(Self::Float)),
            Value::String(s) => Some(Self::String(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// JSON form of a scalar value; lists have none
    pub fn to_json(&self) -> Option<Value> {
        match self {
            Self::String(s) => Some(Value::String(s.clone())),
            Self::Integer(n) => Some(Value::from(*n)),
            Self::Float(n) => Some(Value::from(*n)),
            Self::Boolean(b) => Some(Value::Bool(*b)),
            Self::Null => Some(Value::Null),
            Self::StringList(_)
            | Self::IntegerList(_)
            | Self::FloatList(_)
            | Self::BooleanList(_) => None,
        }
    }

    /// Coerce this value to the given column type
    ///
    /// Strings coming from a query string are parsed; already-typed values
    /// pass through when compatible. Returns `None` when the value cannot
    /// represent the column type.
    ///
    /// # Example
    ///
    /// ```rust
    /// use relist::model::AttributeType;
    /// use relist::query::FilterValue;
    ///
    /// let raw = FilterValue::from("42");
    /// assert_eq!(raw.coerce(AttributeType::Integer), Some(FilterValue::Integer(42)));
    /// assert_eq!(FilterValue::from("abc").coerce(AttributeType::Integer), None);
    /// ```
    pub fn coerce(&self, kind: AttributeType) -> Option<Self> {
        match (self, kind) {
            (Self::Null, _) => Some(Self::Null),
            (Self::String(s), AttributeType::Text) => Some(Self::String(s.clone())),
            (Self::String(s), AttributeType::Integer) => s.trim().parse().ok().map(Self::Integer),
            (Self::String(s), AttributeType::Float) => s.trim().parse().ok().map(Self::Float),
            (Self::String(s), AttributeType::Boolean) => parse_bool(s).map(Self::Boolean),
            (Self::Integer(n), AttributeType::Integer) => Some(Self::Integer(*n)),
            (Self::Integer(n), AttributeType::Float) => Some(Self::Float(*n as f64)),
            (Self::Integer(n), AttributeType::Text) => Some(Self::String(n.to_string())),
            (Self::Float(n), AttributeType::Float) => Some(Self::Float(*n)),
            (Self::Boolean(b), AttributeType::Boolean) => Some(Self::Boolean(*b)),
            (Self::StringList(list), AttributeType::Text) => Some(Self::StringList(list.clone())),
            (Self::StringList(list), AttributeType::Integer) => list
                .iter()
                .map(|s| s.trim().parse().ok())
                .collect::<Option<Vec<i64>>>()
                .map(Self::IntegerList),
            (Self::StringList(list), AttributeType::Float) => list
                .iter()
                .map(|s| s.trim().parse().ok())
                .collect::<Option<Vec<f64>>>()
                .map(Self::FloatList),
            (Self::StringList(list), AttributeType::Boolean) => list
                .iter()
                .map(|s| parse_bool(s))
                .collect::<Option<Vec<bool>>>()
                .map(Self::BooleanList),
            (Self::IntegerList(list), AttributeType::Integer) => {
                Some(Self::IntegerList(list.clone()))
            }
            (Self::IntegerList(list), AttributeType::Float) => {
                Some(Self::FloatList(list.iter().map(|n| *n as f64).collect()))
            }
            (Self::FloatList(list), AttributeType::Float) => Some(Self::FloatList(list.clone())),
            (Self::BooleanList(list), AttributeType::Boolean) => {
                Some(Self::BooleanList(list.clone()))
            }
            _ => None,
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// A single filter condition
///
/// `field` is either a base attribute (`"username"`) or an attribute of an
/// included association qualified by its alias (`"hobbies.name"`).
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCondition {
    /// The field name to filter on
    pub field: String,
    /// The comparison operator
    pub operator: FilterOperator,
    /// The value to compare against
    pub value: FilterValue,
}

impl FilterCondition {
    /// Create a new filter condition
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: FilterValue) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    /// Create an equality filter (field = value)
    pub fn eq(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::Equal, value.into())
    }

    /// Create a not-equal filter (field != value)
    pub fn ne(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::NotEqual, value.into())
    }

    /// Create a greater-than filter (field > value)
    pub fn gt(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::GreaterThan, value.into())
    }

    /// Create a greater-than-or-equal filter (field >= value)
    pub fn gte(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::GreaterThanOrEqual, value.into())
    }

    /// Create a less-than filter (field < value)
    pub fn lt(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::LessThan, value.into())
    }

    /// Create a less-than-or-equal filter (field <= value)
    pub fn lte(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::LessThanOrEqual, value.into())
    }

    /// Create a LIKE pattern filter
    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(field, FilterOperator::Like, FilterValue::String(pattern.into()))
    }

    /// Create an IN list filter for integers
    pub fn in_integers(field: impl Into<String>, values: Vec<i64>) -> Self {
        Self::new(field, FilterOperator::In, FilterValue::IntegerList(values))
    }

    /// Create an IN list filter for strings
    pub fn in_strings(field: impl Into<String>, values: Vec<String>) -> Self {
        Self::new(field, FilterOperator::In, FilterValue::StringList(values))
    }

    /// Create an IS NULL filter
    pub fn is_null(field: impl Into<String>) -> Self {
        Self::new(field, FilterOperator::IsNull, FilterValue::Null)
    }

    /// Create an IS NOT NULL filter
    pub fn is_not_null(field: impl Into<String>) -> Self {
        Self::new(field, FilterOperator::IsNotNull, FilterValue::Null)
    }

    /// Association alias this filter is qualified with, if any
    pub fn qualifier(&self) -> Option<&str> {
        self.field.split_once('.').map(|(alias, _)| alias)
    }

    /// Column name without the alias qualifier
    pub fn column(&self) -> &str {
        self.field
            .split_once('.')
            .map_or(self.field.as_str(), |(_, column)| column)
    }
}

/// Case-insensitive substring search across a set of text columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchClause {
    /// Text to look for
    pub term: String,
    /// Base attributes searched; a row matches when any of them contains `term`
    pub fields: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_direction_display() {
        assert_eq!(format!("{}", OrderDirection::Ascending), "asc");
        assert_eq!(format!("{}", OrderDirection::Descending), "desc");
    }

    #[test]
    fn test_order_term_parse() {
        assert_eq!(OrderTerm::parse("name"), OrderTerm::asc("name"));
        assert_eq!(OrderTerm::parse("+name"), OrderTerm::asc("name"));
        assert_eq!(OrderTerm::parse(" -id "), OrderTerm::desc("id"));
    }

    #[test]
    fn test_pagination_page() {
        assert_eq!(Pagination::page(1, 20), Pagination::new(0, 20));
        assert_eq!(Pagination::page(3, 20), Pagination::new(40, 20));
        // Page 0 is treated as page 1
        assert_eq!(Pagination::page(0, 20).offset, 0);
    }

    #[test]
    fn test_filter_operator_display() {
        assert_eq!(format!("{}", FilterOperator::Equal), "=");
        assert_eq!(format!("{}", FilterOperator::NotEqual), "!=");
        assert_eq!(format!("{}", FilterOperator::Like), "LIKE");
        assert_eq!(format!("{}", FilterOperator::IsNotNull), "IS NOT NULL");
    }

    #[test]
    fn test_filter_operator_from_suffix() {
        assert_eq!(FilterOperator::from_suffix("gte"), Some(FilterOperator::GreaterThanOrEqual));
        assert_eq!(FilterOperator::from_suffix("like"), Some(FilterOperator::Like));
        assert_eq!(FilterOperator::from_suffix("between"), None);
    }

    #[test]
    fn test_filter_value_from_json() {
        assert_eq!(
            FilterValue::from_json(&serde_json::json!(7)),
            Some(FilterValue::Integer(7))
        );
        assert_eq!(
            FilterValue::from_json(&serde_json::json!("a")),
            Some(FilterValue::String("a".to_string()))
        );
        assert_eq!(FilterValue::from_json(&serde_json::json!([1])), None);
    }

    #[test]
    fn test_coerce_from_query_strings() {
        let raw = FilterValue::from("12");
        assert_eq!(raw.coerce(AttributeType::Integer), Some(FilterValue::Integer(12)));
        assert_eq!(raw.coerce(AttributeType::Float), Some(FilterValue::Float(12.0)));
        assert_eq!(
            raw.coerce(AttributeType::Text),
            Some(FilterValue::String("12".to_string()))
        );
        assert_eq!(
            FilterValue::from("true").coerce(AttributeType::Boolean),
            Some(FilterValue::Boolean(true))
        );
        assert_eq!(FilterValue::from("yes").coerce(AttributeType::Boolean), None);
    }

    #[test]
    fn test_coerce_typed_values() {
        assert_eq!(
            FilterValue::Integer(3).coerce(AttributeType::Integer),
            Some(FilterValue::Integer(3))
        );
        assert_eq!(FilterValue::Boolean(true).coerce(AttributeType::Integer), None);
        assert_eq!(
            FilterValue::StringList(vec!["1".to_string(), "2".to_string()])
                .coerce(AttributeType::Integer),
            Some(FilterValue::IntegerList(vec![1, 2]))
        );
        assert_eq!(FilterValue::Null.coerce(AttributeType::Text), Some(FilterValue::Null));
    }

    #[test]
    fn test_coerce_lists_for_every_attribute_type() {
        let list = |items: &[&str]| FilterValue::StringList(items.iter().map(|s| s.to_string()).collect());

        assert_eq!(
            list(&["1.5", "2"]).coerce(AttributeType::Float),
            Some(FilterValue::FloatList(vec![1.5, 2.0]))
        );
        assert_eq!(
            list(&["true", "0"]).coerce(AttributeType::Boolean),
            Some(FilterValue::BooleanList(vec![true, false]))
        );
        assert_eq!(list(&["1.5", "x"]).coerce(AttributeType::Float), None);
        assert_eq!(list(&["maybe"]).coerce(AttributeType::Boolean), None);
        assert_eq!(
            FilterValue::IntegerList(vec![1, 2]).coerce(AttributeType::Float),
            Some(FilterValue::FloatList(vec![1.0, 2.0]))
        );
        assert_eq!(FilterValue::FloatList(vec![1.5]).to_json(), None);
    }

    #[test]
    fn test_filter_condition_constructors() {
        let filter = FilterCondition::gte("age", 18_i64);
        assert_eq!(filter.operator, FilterOperator::GreaterThanOrEqual);
        assert_eq!(filter.value, FilterValue::Integer(18));

        let filter = FilterCondition::is_null("deleted_at");
        assert_eq!(filter.operator, FilterOperator::IsNull);
        assert_eq!(filter.value, FilterValue::Null);

        let filter = FilterCondition::in_integers("id", vec![1, 2]);
        assert_eq!(filter.value, FilterValue::IntegerList(vec![1, 2]));
    }

    #[test]
    fn test_filter_condition_qualifier() {
        let plain = FilterCondition::eq("username", "arthur");
        assert_eq!(plain.qualifier(), None);
        assert_eq!(plain.column(), "username");

        let qualified = FilterCondition::eq("hobbies.name", "coding");
        assert_eq!(qualified.qualifier(), Some("hobbies"));
        assert_eq!(qualified.column(), "name");
    }
}
