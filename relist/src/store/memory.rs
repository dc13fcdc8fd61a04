//! In-process store
//!
//! Tables are vectors of JSON records. Joins are executed for real: a
//! flat join over a MANY association yields one result row per associated
//! row, so windowing and counting behave exactly as they would in SQL.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use serde_json::Value;

use super::error::{StoreError, StoreOperation};
use super::{Store, StoreResult};
use crate::model::{AssociationKind, Record};
use crate::query::{
    CountMode, CountQuery, FilterCondition, FilterOperator, FilterValue, JoinDescriptor,
    JoinedRow, OrderDirection, OrderTerm, SearchClause, SelectQuery, SemiJoin,
};

#[derive(Debug, Default)]
struct Table {
    rows: Vec<Record>,
    next_id: i64,
}

/// In-memory relational store
///
/// # Example
///
/// ```rust
/// use relist::store::MemoryStore;
/// use serde_json::json;
///
/// let store = MemoryStore::new();
/// let users = store
///     .bulk_insert("users", "id", vec![
///         json!({"username": "arthur"}).as_object().unwrap().clone(),
///         json!({"username": "ford"}).as_object().unwrap().clone(),
///     ])
///     .unwrap();
/// assert_eq!(users[1]["id"], json!(2));
/// assert_eq!(store.len("users"), 2);
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Table>>,
}

type Tables = HashMap<String, Table>;

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table if it does not exist yet
    pub fn create_table(&self, table: &str) {
        self.write().entry(table.to_string()).or_default();
    }

    /// Insert records, assigning auto-increment primary keys where missing
    ///
    /// Returns the stored records, keys included. Creates the table on first use.
    pub fn bulk_insert(
        &self,
        table: &str,
        primary_key: &str,
        records: Vec<Record>,
    ) -> StoreResult<Vec<Record>> {
        let mut tables = self.write();
        let table = tables.entry(table.to_string()).or_default();

        let mut inserted = Vec::with_capacity(records.len());
        for mut record in records {
            match record.get(primary_key) {
                None | Some(Value::Null) => {
                    table.next_id += 1;
                    record.insert(primary_key.to_string(), Value::from(table.next_id));
                }
                Some(key) => {
                    if let Some(n) = key.as_i64() {
                        table.next_id = table.next_id.max(n);
                    }
                }
            }
            table.rows.push(record.clone());
            inserted.push(record);
        }

        Ok(inserted)
    }

    /// Insert a join-table row linking `source` to `target`
    pub fn link(
        &self,
        through: &str,
        source_key: &str,
        source: Value,
        target_key: &str,
        target: Value,
    ) -> StoreResult<()> {
        let mut row = Record::new();
        row.insert(source_key.to_string(), source);
        row.insert(target_key.to_string(), target);
        self.write()
            .entry(through.to_string())
            .or_default()
            .rows
            .push(row);
        Ok(())
    }

    /// All rows of `table` matching every filter (unqualified fields only)
    pub fn find_all(&self, table: &str, filters: &[FilterCondition]) -> StoreResult<Vec<Record>> {
        let tables = self.read();
        let rows = rows_of(&tables, table, StoreOperation::SelectRows)?;
        Ok(rows
            .iter()
            .filter(|row| filters.iter().all(|f| matches(row.get(f.column()), f)))
            .cloned()
            .collect())
    }

    /// Number of rows in a table; zero when it does not exist
    pub fn len(&self, table: &str) -> usize {
        self.read().get(table).map_or(0, |t| t.rows.len())
    }

    /// Whether a table is missing or empty
    pub fn is_empty(&self, table: &str) -> bool {
        self.len(table) == 0
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn count(&self, query: &CountQuery) -> StoreResult<u64> {
        let op = StoreOperation::Count;
        let tables = self.read();
        let select = &query.select;
        let base = base_rows(&tables, select, op)?;

        let total = match query.mode {
            CountMode::JoinedRows => expand(&tables, select, base).len(),
            CountMode::DistinctKeys if select.joins.is_empty() => base.len(),
            CountMode::DistinctKeys => {
                let rows = expand(&tables, select, base);
                distinct_keys(&rows, &select.primary_key).len()
            }
        };
        Ok(total as u64)
    }

    async fn select_keys(&self, query: &SelectQuery) -> StoreResult<Vec<Value>> {
        let op = StoreOperation::SelectKeys;
        let tables = self.read();
        let base = base_rows(&tables, query, op)?;
        let mut rows = expand(&tables, query, base);
        sort_rows(&mut rows, &query.order);

        let keys = distinct_keys(&rows, &query.primary_key);
        Ok(match query.window {
            Some(window) => keys
                .into_iter()
                .skip(to_usize(window.offset))
                .take(to_usize(window.limit))
                .collect(),
            None => keys,
        })
    }

    async fn select_rows(&self, query: &SelectQuery) -> StoreResult<Vec<JoinedRow>> {
        let op = StoreOperation::SelectRows;
        let tables = self.read();
        let base = base_rows(&tables, query, op)?;
        let mut rows = expand(&tables, query, base);
        sort_rows(&mut rows, &query.order);

        Ok(match query.window {
            Some(window) => rows
                .into_iter()
                .skip(to_usize(window.offset))
                .take(to_usize(window.limit))
                .collect(),
            None => rows,
        })
    }
}

fn to_usize(n: u64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}

fn rows_of<'a>(tables: &'a Tables, table: &str, op: StoreOperation) -> StoreResult<&'a [Record]> {
    tables
        .get(table)
        .map(|t| t.rows.as_slice())
        .ok_or_else(|| StoreError::unknown_table(op, table))
}

fn association_rows<'a>(tables: &'a Tables, table: &str) -> &'a [Record] {
    tables
        .get(table)
        .map(|t| t.rows.as_slice())
        .unwrap_or_default()
}

/// Base rows passing key restriction, unqualified filters, search and semi-joins
fn base_rows<'a>(
    tables: &'a Tables,
    query: &SelectQuery,
    op: StoreOperation,
) -> StoreResult<Vec<&'a Record>> {
    let mut selected = Vec::new();
    for row in rows_of(tables, &query.table, op)? {
        if let Some(keys) = &query.keys {
            let key = row.get(&query.primary_key).unwrap_or(&Value::Null);
            if !keys.iter().any(|k| values_equal(k, key)) {
                continue;
            }
        }
        let passes_filters = query
            .filters
            .iter()
            .filter(|f| f.qualifier().is_none())
            .all(|f| matches(row.get(&f.field), f));
        if !passes_filters {
            continue;
        }
        if let Some(search) = &query.search {
            if !matches_search(row, search) {
                continue;
            }
        }
        if !semi_joins_match(tables, query, row) {
            continue;
        }
        selected.push(row);
    }
    Ok(selected)
}

fn semi_joins_match(tables: &Tables, query: &SelectQuery, row: &Record) -> bool {
    for SemiJoin { join, filters } in &query.semi_joins {
        let associated = associated_rows(tables, join, &query.primary_key, row);
        let found = associated
            .iter()
            .any(|assoc| filters.iter().all(|f| matches(assoc.get(f.column()), f)));
        if !found {
            return false;
        }
    }
    true
}

/// LEFT JOIN every association, then apply alias-qualified filters
fn expand(tables: &Tables, query: &SelectQuery, base: Vec<&Record>) -> Vec<JoinedRow> {
    let mut result = Vec::with_capacity(base.len());
    for row in base {
        let mut rows = vec![JoinedRow::base(row.clone())];
        for join in &query.joins {
            let associated = associated_rows(tables, join, &query.primary_key, row);
            let options: Vec<Option<Record>> = if associated.is_empty() {
                vec![None]
            } else {
                associated.into_iter().map(|r| Some(r.clone())).collect()
            };

            let mut multiplied = Vec::with_capacity(rows.len() * options.len());
            for partial in &rows {
                for option in &options {
                    let mut next = partial.clone();
                    next.joined.insert(join.alias.clone(), option.clone());
                    multiplied.push(next);
                }
            }
            rows = multiplied;
        }
        result.extend(rows);
    }

    let qualified: Vec<&FilterCondition> = query
        .filters
        .iter()
        .filter(|f| f.qualifier().is_some())
        .collect();
    if !qualified.is_empty() {
        result.retain(|row| {
            qualified.iter().all(|f| {
                let value = f
                    .qualifier()
                    .and_then(|alias| row.joined.get(alias))
                    .and_then(Option::as_ref)
                    .and_then(|assoc| assoc.get(f.column()));
                matches(value, f)
            })
        });
    }
    result
}

/// Rows of `join`'s target owned by `row`
///
/// A target or through table nothing was written to yet has no rows.
fn associated_rows<'a>(
    tables: &'a Tables,
    join: &JoinDescriptor,
    primary_key: &str,
    row: &Record,
) -> Vec<&'a Record> {
    let targets = association_rows(tables, &join.table);
    let own_key = row.get(primary_key).unwrap_or(&Value::Null);

    match &join.kind {
        AssociationKind::BelongsTo { foreign_key } => {
            let reference = row.get(foreign_key).unwrap_or(&Value::Null);
            targets
                .iter()
                .filter(|t| values_equal(t.get(&join.primary_key).unwrap_or(&Value::Null), reference))
                .take(1)
                .collect()
        }
        AssociationKind::HasOne { foreign_key } => targets
            .iter()
            .filter(|t| values_equal(t.get(foreign_key).unwrap_or(&Value::Null), own_key))
            .take(1)
            .collect(),
        AssociationKind::HasMany { foreign_key } => targets
            .iter()
            .filter(|t| values_equal(t.get(foreign_key).unwrap_or(&Value::Null), own_key))
            .collect(),
        AssociationKind::BelongsToMany {
            through,
            source_key,
            target_key,
        } => {
            let links = association_rows(tables, through);
            let mut found = Vec::new();
            for link in links
                .iter()
                .filter(|l| values_equal(l.get(source_key).unwrap_or(&Value::Null), own_key))
            {
                let reference = link.get(target_key).unwrap_or(&Value::Null);
                found.extend(targets.iter().filter(|t| {
                    values_equal(t.get(&join.primary_key).unwrap_or(&Value::Null), reference)
                }));
            }
            found
        }
    }
}

fn distinct_keys(rows: &[JoinedRow], primary_key: &str) -> Vec<Value> {
    let mut seen = HashSet::new();
    rows.iter()
        .filter_map(|row| row.base.get(primary_key))
        .filter(|key| seen.insert(key.to_string()))
        .cloned()
        .collect()
}

fn sort_rows(rows: &mut [JoinedRow], order: &[OrderTerm]) {
    if order.is_empty() {
        return;
    }
    rows.sort_by(|a, b| {
        order
            .iter()
            .map(|term| {
                let ordering = compare_values(
                    a.base.get(&term.field).unwrap_or(&Value::Null),
                    b.base.get(&term.field).unwrap_or(&Value::Null),
                );
                match term.direction {
                    OrderDirection::Ascending => ordering,
                    OrderDirection::Descending => ordering.reverse(),
                }
            })
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over JSON scalars; NULL sorts first
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            match (x.as_i64(), y.as_i64()) {
                (Some(x), Some(y)) => x.cmp(&y),
                _ => x
                    .as_f64()
                    .partial_cmp(&y.as_f64())
                    .unwrap_or(Ordering::Equal),
            }
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// SQL equality: NULL equals nothing
fn values_equal(a: &Value, b: &Value) -> bool {
    !a.is_null()
        && !b.is_null()
        && type_rank(a) == type_rank(b)
        && compare_values(a, b) == Ordering::Equal
}

fn matches(value: Option<&Value>, filter: &FilterCondition) -> bool {
    let value = value.unwrap_or(&Value::Null);
    match filter.operator {
        FilterOperator::IsNull => value.is_null(),
        FilterOperator::IsNotNull => !value.is_null(),
        _ if value.is_null() => false,
        FilterOperator::In => match &filter.value {
            FilterValue::IntegerList(list) => list.iter().any(|n| values_equal(value, &Value::from(*n))),
            FilterValue::StringList(list) => list
                .iter()
                .any(|s| values_equal(value, &Value::String(s.clone()))),
            FilterValue::FloatList(list) => list.iter().any(|n| values_equal(value, &Value::from(*n))),
            FilterValue::BooleanList(list) => list.iter().any(|b| values_equal(value, &Value::Bool(*b))),
            scalar => scalar.to_json().is_some_and(|rhs| values_equal(value, &rhs)),
        },
        FilterOperator::Like => match (&filter.value, value) {
            (FilterValue::String(pattern), Value::String(text)) => like_match(pattern, text),
            _ => false,
        },
        op => {
            let Some(rhs) = filter.value.to_json() else {
                return false;
            };
            if rhs.is_null() || type_rank(value) != type_rank(&rhs) {
                return false;
            }
            let ordering = compare_values(value, &rhs);
            match op {
                FilterOperator::Equal => ordering == Ordering::Equal,
                FilterOperator::NotEqual => ordering != Ordering::Equal,
                FilterOperator::GreaterThan => ordering == Ordering::Greater,
                FilterOperator::GreaterThanOrEqual => ordering != Ordering::Less,
                FilterOperator::LessThan => ordering == Ordering::Less,
                FilterOperator::LessThanOrEqual => ordering != Ordering::Greater,
                _ => false,
            }
        }
    }
}

fn matches_search(row: &Record, search: &SearchClause) -> bool {
    let term = search.term.to_lowercase();
    search.fields.iter().any(|field| {
        row.get(field)
            .and_then(Value::as_str)
            .is_some_and(|text| text.to_lowercase().contains(&term))
    })
}

/// SQL LIKE: `%` matches any run of characters, `_` exactly one
fn like_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && pattern[p] == '%' {
            backtrack = Some((p, t));
            p += 1;
        } else if p < pattern.len() && (pattern[p] == '_' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if let Some((star, mark)) = backtrack {
            p = star + 1;
            t = mark + 1;
            backtrack = Some((star, mark + 1));
        } else {
            return false;
        }
    }
    while p < pattern.len() && pattern[p] == '%' {
        p += 1;
    }
    p == pattern.len()
}
