//! PostgreSQL rendering of query descriptors
//!
//! The base table is aliased by its own name and every association by its
//! include alias, so qualified filters (`hobbies.name`) map straight onto
//! `"hobbies"."name"`. Values are always bound as parameters; identifiers are
//! quoted. Only LIMIT/OFFSET are rendered as literals.
//!
//! # Example
//!
//! ```rust
//! use relist::query::{sql, Pagination, SelectQuery};
//!
//! let mut query = SelectQuery::new("users", "id");
//! query.window = Some(Pagination::new(20, 10));
//! let statement = sql::select_keys(&query);
//! assert_eq!(
//!     statement.sql,
//!     r#"SELECT to_jsonb("users"."id") FROM "users" AS "users" LIMIT 10 OFFSET 20"#
//! );
//! ```

use serde_json::Value;

use crate::model::AssociationKind;

use super::filter::{FilterCondition, FilterOperator, FilterValue, OrderDirection, SearchClause};
use super::plan::{CountMode, CountQuery, SelectQuery, SemiJoin};
use super::planner::JoinDescriptor;

/// SQL text with its positional parameters (`$1`, `$2`, ...)
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    /// Statement text
    pub sql: String,
    /// Values for the placeholders, in order
    pub params: Vec<FilterValue>,
}

/// `SELECT COUNT(...)` for a count query
pub fn count(query: &CountQuery) -> SqlStatement {
    let select = &query.select;
    let mut w = Writer::default();
    let projection = match query.mode {
        CountMode::DistinctKeys => format!("COUNT(DISTINCT {})", w.base_column(select, &select.primary_key)),
        CountMode::JoinedRows => "COUNT(*)".to_string(),
    };
    w.push(&format!("SELECT {}", projection));
    w.from(select);
    w.filter(select);
    w.finish()
}

/// Select base primary keys as JSON values
///
/// When the query has joins the result is grouped by key, so each base row
/// is returned once regardless of fan-out.
pub fn select_keys(query: &SelectQuery) -> SqlStatement {
    let mut w = Writer::default();
    let key = w.base_column(query, &query.primary_key);
    w.push(&format!("SELECT to_jsonb({})", key));
    w.from(query);
    w.filter(query);
    if !query.joins.is_empty() {
        let mut group = vec![key];
        group.extend(
            query
                .order
                .iter()
                .filter(|t| t.field != query.primary_key)
                .map(|t| w.base_column(query, &t.field)),
        );
        w.push(&format!(" GROUP BY {}", group.join(", ")));
    }
    w.order(query, false);
    w.window(query);
    w.finish()
}

/// Select base rows and joined association rows as JSON objects
///
/// Column 0 is the base row; column `i + 1` is the row joined for
/// `query.joins[i]`, NULL when the LEFT JOIN found nothing.
pub fn select_rows(query: &SelectQuery) -> SqlStatement {
    let mut w = Writer::default();
    let mut columns = vec![format!("to_jsonb({}.*)", ident(&query.table))];
    columns.extend(
        query
            .joins
            .iter()
            .map(|join| format!("to_jsonb({}.*)", ident(&join.alias))),
    );
    w.push(&format!("SELECT {}", columns.join(", ")));
    w.from(query);
    w.filter(query);
    w.order(query, true);
    w.window(query);
    w.finish()
}

/// Quote an identifier
fn ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn through_alias(join: &JoinDescriptor) -> String {
    format!("{}__through", join.alias)
}

/// Escape LIKE metacharacters so a search term matches literally
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[derive(Default)]
struct Writer {
    sql: String,
    params: Vec<FilterValue>,
}

impl Writer {
    fn push(&mut self, text: &str) {
        self.sql.push_str(text);
    }

    fn bind(&mut self, value: FilterValue) -> String {
        self.params.push(value);
        format!("${}", self.params.len())
    }

    fn finish(self) -> SqlStatement {
        SqlStatement {
            sql: self.sql,
            params: self.params,
        }
    }

    fn base_column(&self, query: &SelectQuery, column: &str) -> String {
        format!("{}.{}", ident(&query.table), ident(column))
    }

    fn from(&mut self, query: &SelectQuery) {
        let base = ident(&query.table);
        self.push(&format!(" FROM {} AS {}", base, base));
        for join in &query.joins {
            let alias = ident(&join.alias);
            let target = ident(&join.table);
            let target_pk = format!("{}.{}", alias, ident(&join.primary_key));
            let base_pk = self.base_column(query, &query.primary_key);
            let clause = match &join.kind {
                AssociationKind::BelongsTo { foreign_key } => format!(
                    " LEFT JOIN {} AS {} ON {} = {}",
                    target,
                    alias,
                    target_pk,
                    self.base_column(query, foreign_key)
                ),
                AssociationKind::HasOne { foreign_key } | AssociationKind::HasMany { foreign_key } => {
                    format!(
                        " LEFT JOIN {} AS {} ON {}.{} = {}",
                        target,
                        alias,
                        alias,
                        ident(foreign_key),
                        base_pk
                    )
                }
                AssociationKind::BelongsToMany {
                    through,
                    source_key,
                    target_key,
                } => {
                    let link = ident(&through_alias(join));
                    format!(
                        " LEFT JOIN {} AS {} ON {}.{} = {} LEFT JOIN {} AS {} ON {} = {}.{}",
                        ident(through),
                        link,
                        link,
                        ident(source_key),
                        base_pk,
                        target,
                        alias,
                        target_pk,
                        link,
                        ident(target_key)
                    )
                }
            };
            self.push(&clause);
        }
    }

    fn filter(&mut self, query: &SelectQuery) {
        let mut conditions = Vec::new();

        if let Some(keys) = &query.keys {
            let column = self.base_column(query, &query.primary_key);
            if keys.is_empty() {
                conditions.push("FALSE".to_string());
            } else {
                let placeholders: Vec<String> = keys
                    .iter()
                    .map(|key| self.bind(key_param(key)))
                    .collect();
                conditions.push(format!("{} IN ({})", column, placeholders.join(", ")));
            }
        }

        for filter in &query.filters {
            let column = match filter.qualifier() {
                Some(alias) => format!("{}.{}", ident(alias), ident(filter.column())),
                None => self.base_column(query, &filter.field),
            };
            conditions.push(self.condition(&column, filter));
        }

        if let Some(search) = &query.search {
            conditions.push(self.search(query, search));
        }

        for semi_join in &query.semi_joins {
            conditions.push(self.exists(query, semi_join));
        }

        if !conditions.is_empty() {
            self.push(&format!(" WHERE {}", conditions.join(" AND ")));
        }
    }

    fn condition(&mut self, column: &str, filter: &FilterCondition) -> String {
        let op = match filter.operator {
            FilterOperator::IsNull => return format!("{} IS NULL", column),
            FilterOperator::IsNotNull => return format!("{} IS NOT NULL", column),
            FilterOperator::In => {
                let param = self.bind(filter.value.clone());
                return format!("{} = ANY({})", column, param);
            }
            FilterOperator::Equal => "=",
            FilterOperator::NotEqual => "<>",
            FilterOperator::GreaterThan => ">",
            FilterOperator::GreaterThanOrEqual => ">=",
            FilterOperator::LessThan => "<",
            FilterOperator::LessThanOrEqual => "<=",
            FilterOperator::Like => "LIKE",
        };
        let param = self.bind(filter.value.clone());
        format!("{} {} {}", column, op, param)
    }

    fn search(&mut self, query: &SelectQuery, search: &SearchClause) -> String {
        let param = self.bind(FilterValue::String(format!("%{}%", escape_like(&search.term))));
        let alternatives: Vec<String> = search
            .fields
            .iter()
            .map(|field| format!("{} ILIKE {}", self.base_column(query, field), param))
            .collect();
        format!("({})", alternatives.join(" OR "))
    }

    fn exists(&mut self, query: &SelectQuery, semi_join: &SemiJoin) -> String {
        let join = &semi_join.join;
        let alias = ident(&join.alias);
        let target = ident(&join.table);
        let target_pk = format!("{}.{}", alias, ident(&join.primary_key));
        let base_pk = self.base_column(query, &query.primary_key);

        let (from, correlation) = match &join.kind {
            AssociationKind::BelongsTo { foreign_key } => (
                format!("{} AS {}", target, alias),
                format!("{} = {}", target_pk, self.base_column(query, foreign_key)),
            ),
            AssociationKind::HasOne { foreign_key } | AssociationKind::HasMany { foreign_key } => (
                format!("{} AS {}", target, alias),
                format!("{}.{} = {}", alias, ident(foreign_key), base_pk),
            ),
            AssociationKind::BelongsToMany {
                through,
                source_key,
                target_key,
            } => {
                let link = ident(&through_alias(join));
                (
                    format!(
                        "{} AS {} JOIN {} AS {} ON {} = {}.{}",
                        ident(through),
                        link,
                        target,
                        alias,
                        target_pk,
                        link,
                        ident(target_key)
                    ),
                    format!("{}.{} = {}", link, ident(source_key), base_pk),
                )
            }
        };

        let mut conditions = vec![correlation];
        for filter in &semi_join.filters {
            let column = format!("{}.{}", alias, ident(filter.column()));
            conditions.push(self.condition(&column, filter));
        }
        format!("EXISTS (SELECT 1 FROM {} WHERE {})", from, conditions.join(" AND "))
    }

    fn order(&mut self, query: &SelectQuery, with_joins: bool) {
        let mut terms: Vec<String> = query
            .order
            .iter()
            .map(|term| {
                let direction = match term.direction {
                    OrderDirection::Ascending => "ASC",
                    OrderDirection::Descending => "DESC",
                };
                format!("{} {}", self.base_column(query, &term.field), direction)
            })
            .collect();
        if with_joins {
            terms.extend(
                query
                    .joins
                    .iter()
                    .map(|join| format!("{}.{} ASC", ident(&join.alias), ident(&join.primary_key))),
            );
        }
        if !terms.is_empty() {
            self.push(&format!(" ORDER BY {}", terms.join(", ")));
        }
    }

    fn window(&mut self, query: &SelectQuery) {
        if let Some(window) = query.window {
            self.push(&format!(" LIMIT {} OFFSET {}", window.limit, window.offset));
        }
    }
}

/// Bind value for a primary key returned by a key selection
fn key_param(key: &Value) -> FilterValue {
    FilterValue::from_json(key).unwrap_or_else(|| FilterValue::String(key.to_string()))
}
