//! Query construction
//!
//! Turns a strategy, a resource snapshot and a fetch context into the count
//! and data descriptors of one list request. Every caller-supplied name is
//! checked against the model here, so stores only ever see declared columns.

use std::collections::BTreeMap;

use crate::config::AssociatedFilterPolicy;
use crate::context::FetchContext;
use crate::model::{AttributeType, Model};
use crate::resource::ResourceDefinition;

use super::error::QueryError;
use super::filter::{FilterCondition, FilterOperator, FilterValue, OrderTerm, Pagination, SearchClause};
use super::plan::{CountMode, CountQuery, DataQuery, QueryPlan, SelectQuery, SemiJoin, Strategy};
use super::planner::JoinSpec;

/// Build the count and data queries for a list request
///
/// # Errors
///
/// - [`QueryError::InvalidPagination`] when `count` is not positive or
///   `offset` is negative
/// - [`QueryError::InvalidFilter`] when a filter, sort or search references
///   an unknown field, a value cannot be coerced to its column type, or an
///   associated filter is rejected under subquery pagination
pub fn build(
    strategy: Strategy,
    definition: &ResourceDefinition,
    joins: &JoinSpec,
    context: &FetchContext,
) -> Result<QueryPlan, QueryError> {
    let window = window(context)?;
    let model = &definition.model;

    let mut base = SelectQuery::new(model.table_name(), model.primary_key_column());
    let mut qualified = Vec::new();
    for filter in &context.filters {
        match filter.qualifier() {
            None => base.filters.push(base_filter(model, joins, filter)?),
            Some(alias) => qualified.push(associated_filter(definition, alias, filter)?),
        }
    }
    base.search = search(definition, context)?;
    base.order = order(model, &context.sort)?;

    let plan = match strategy {
        Strategy::SubQuery => {
            base.semi_joins = semi_joins(definition, joins, qualified)?;

            let count = CountQuery {
                select: base.clone().unbounded(),
                mode: CountMode::DistinctKeys,
            };

            let mut rows = SelectQuery::new(model.table_name(), model.primary_key_column());
            rows.joins = joins.joins().to_vec();
            rows.order = base.order.clone();

            let mut keys = base;
            keys.window = Some(window);

            QueryPlan {
                strategy,
                count,
                data: DataQuery::TwoPhase { keys, rows },
            }
        }
        Strategy::Flat => {
            base.joins = joins.joins().to_vec();
            base.filters.extend(qualified);

            let mode = if base.joins.is_empty() {
                CountMode::DistinctKeys
            } else {
                CountMode::JoinedRows
            };
            let count = CountQuery {
                select: base.clone().unbounded(),
                mode,
            };
            base.window = Some(window);

            QueryPlan {
                strategy,
                count,
                data: DataQuery::Single(base),
            }
        }
    };

    Ok(plan)
}

/// Build the query for a single record addressed by primary key
///
/// # Errors
///
/// Returns [`QueryError::InvalidFilter`] when `id` cannot be coerced to the
/// primary key's declared type.
pub fn build_read(
    definition: &ResourceDefinition,
    joins: &JoinSpec,
    id: &str,
) -> Result<SelectQuery, QueryError> {
    let model = &definition.model;
    let primary_key = model.primary_key_column();

    let raw = FilterValue::from(id);
    let key = match model.find_attribute(primary_key) {
        Some(attribute) => raw.coerce(attribute.kind),
        None => raw
            .coerce(AttributeType::Integer)
            .or_else(|| raw.coerce(AttributeType::Text)),
    }
    .and_then(|value| value.to_json())
    .ok_or_else(|| QueryError::invalid_filter(primary_key, format!("'{}' is not a valid key", id)))?;

    let mut query = SelectQuery::new(model.table_name(), primary_key).with_keys(vec![key]);
    query.joins = joins.joins().to_vec();
    query.order.push(OrderTerm::asc(primary_key));
    Ok(query)
}

fn window(context: &FetchContext) -> Result<Pagination, QueryError> {
    if context.count <= 0 {
        return Err(QueryError::InvalidPagination(format!(
            "count must be positive, got {}",
            context.count
        )));
    }
    if context.offset < 0 {
        return Err(QueryError::InvalidPagination(format!(
            "offset must not be negative, got {}",
            context.offset
        )));
    }
    Ok(Pagination::new(context.offset as u64, context.count as u64))
}

fn base_filter(
    model: &Model,
    joins: &JoinSpec,
    filter: &FilterCondition,
) -> Result<FilterCondition, QueryError> {
    if joins.is_alias(&filter.field) {
        return Err(QueryError::invalid_filter(
            &filter.field,
            "associations can only be filtered by qualified attributes such as 'alias.field'",
        ));
    }
    coerce(model, filter.column(), filter)
}

fn associated_filter(
    definition: &ResourceDefinition,
    alias: &str,
    filter: &FilterCondition,
) -> Result<FilterCondition, QueryError> {
    let include = definition
        .includes
        .iter()
        .find(|include| include.alias == alias)
        .ok_or_else(|| {
            QueryError::invalid_filter(&filter.field, format!("'{}' is not an included association", alias))
        })?;
    coerce(&include.target, filter.column(), filter)
}

/// Type-check a filter against `model`, keeping the caller's field name
fn coerce(model: &Model, column: &str, filter: &FilterCondition) -> Result<FilterCondition, QueryError> {
    let attribute = model
        .find_attribute(column)
        .ok_or_else(|| QueryError::invalid_filter(&filter.field, "unknown attribute"))?;

    let value = match filter.operator {
        FilterOperator::IsNull | FilterOperator::IsNotNull => FilterValue::Null,
        FilterOperator::Like if attribute.kind != AttributeType::Text => {
            return Err(QueryError::invalid_filter(
                &filter.field,
                format!("pattern matching needs a text attribute, found {}", attribute.kind),
            ));
        }
        _ => filter.value.coerce(attribute.kind).ok_or_else(|| {
            QueryError::invalid_filter(&filter.field, format!("expected a {} value", attribute.kind))
        })?,
    };

    Ok(FilterCondition::new(filter.field.clone(), filter.operator, value))
}

fn semi_joins(
    definition: &ResourceDefinition,
    joins: &JoinSpec,
    qualified: Vec<FilterCondition>,
) -> Result<Vec<SemiJoin>, QueryError> {
    if qualified.is_empty() {
        return Ok(Vec::new());
    }
    if definition.associated_filters == AssociatedFilterPolicy::Reject {
        let field = qualified
            .first()
            .map(|f| f.field.clone())
            .unwrap_or_default();
        return Err(QueryError::invalid_filter(
            field,
            "filters on included associations are not supported with subquery pagination",
        ));
    }

    let mut grouped: BTreeMap<String, Vec<FilterCondition>> = BTreeMap::new();
    for filter in qualified {
        let alias = filter.qualifier().unwrap_or_default().to_string();
        grouped.entry(alias).or_default().push(filter);
    }

    grouped
        .into_iter()
        .map(|(alias, filters)| {
            let join = joins.find(&alias).cloned().ok_or_else(|| {
                QueryError::invalid_filter(&alias, "not an included association")
            })?;
            Ok(SemiJoin { join, filters })
        })
        .collect()
}

fn search(definition: &ResourceDefinition, context: &FetchContext) -> Result<Option<SearchClause>, QueryError> {
    let Some(term) = context.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(None);
    };
    if definition.search_attributes.is_empty() {
        return Err(QueryError::invalid_filter("q", "resource has no searchable attributes"));
    }
    Ok(Some(SearchClause {
        term: term.to_string(),
        fields: definition.search_attributes.clone(),
    }))
}

/// Validated sort terms with the primary key appended as a tie-breaker
fn order(model: &Model, sort: &[OrderTerm]) -> Result<Vec<OrderTerm>, QueryError> {
    let primary_key = model.primary_key_column();
    let mut terms = Vec::with_capacity(sort.len() + 1);
    for term in sort {
        if term.field != primary_key && model.find_attribute(&term.field).is_none() {
            return Err(QueryError::invalid_filter(&term.field, "unknown sort attribute"));
        }
        terms.push(term.clone());
    }
    if !terms.iter().any(|t| t.field == primary_key) {
        terms.push(OrderTerm::asc(primary_key));
    }
    Ok(terms)
}
