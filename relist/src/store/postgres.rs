//! PostgreSQL store

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row};

use super::error::{StoreError, StoreErrorKind, StoreOperation};
use super::{Store, StoreResult};
use crate::config::DatabaseConfig;
use crate::model::Record;
use crate::query::{sql, CountQuery, FilterValue, JoinedRow, SelectQuery};

/// Store executing descriptors through a `sqlx` PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect using the service's database configuration
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        crate::database::create_pool(config).await.map(Self::new)
    }

    /// The underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_all(
        &self,
        operation: StoreOperation,
        statement: &sql::SqlStatement,
    ) -> StoreResult<Vec<PgRow>> {
        tracing::trace!(%operation, sql = %statement.sql, params = statement.params.len(), "Executing");
        bind(sqlx::query(&statement.sql), &statement.params)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::from_sqlx(operation, e))
    }
}

fn bind<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &[FilterValue],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = match param {
            FilterValue::String(s) => query.bind(s.clone()),
            FilterValue::Integer(n) => query.bind(*n),
            FilterValue::Float(n) => query.bind(*n),
            FilterValue::Boolean(b) => query.bind(*b),
            FilterValue::StringList(list) => query.bind(list.clone()),
            FilterValue::IntegerList(list) => query.bind(list.clone()),
            FilterValue::FloatList(list) => query.bind(list.clone()),
            FilterValue::BooleanList(list) => query.bind(list.clone()),
            FilterValue::Null => query.bind(Option::<String>::None),
        };
    }
    query
}

fn decode_error(operation: StoreOperation, err: sqlx::Error) -> StoreError {
    let mut error = StoreError::from_sqlx(operation, err);
    error.kind = StoreErrorKind::TypeConversion;
    error
}

/// A joined row object, or `None` for a LEFT JOIN miss
fn joined_record(value: Option<Value>, primary_key: &str) -> Option<Record> {
    match value {
        Some(Value::Object(record)) if record.get(primary_key).is_some_and(|v| !v.is_null()) => {
            Some(record)
        }
        _ => None,
    }
}

#[async_trait]
impl Store for PgStore {
    async fn count(&self, query: &CountQuery) -> StoreResult<u64> {
        let operation = StoreOperation::Count;
        let rows = self.fetch_all(operation, &sql::count(query)).await?;
        let total: i64 = match rows.first() {
            Some(row) => row.try_get(0).map_err(|e| decode_error(operation, e))?,
            None => 0,
        };
        Ok(u64::try_from(total).unwrap_or_default())
    }

    async fn select_keys(&self, query: &SelectQuery) -> StoreResult<Vec<Value>> {
        let operation = StoreOperation::SelectKeys;
        self.fetch_all(operation, &sql::select_keys(query))
            .await?
            .iter()
            .map(|row| row.try_get::<Value, _>(0).map_err(|e| decode_error(operation, e)))
            .collect()
    }

    async fn select_rows(&self, query: &SelectQuery) -> StoreResult<Vec<JoinedRow>> {
        let operation = StoreOperation::SelectRows;
        let rows = self.fetch_all(operation, &sql::select_rows(query)).await?;

        let mut result = Vec::with_capacity(rows.len());
        for row in rows {
            let base = match row.try_get::<Value, _>(0).map_err(|e| decode_error(operation, e))? {
                Value::Object(record) => record,
                other => {
                    return Err(StoreError::new(
                        operation,
                        StoreErrorKind::TypeConversion,
                        format!("expected a row object, got {}", other),
                    ))
                }
            };

            let mut joined_row = JoinedRow::base(base);
            for (index, join) in query.joins.iter().enumerate() {
                let value: Option<Value> = row
                    .try_get(index + 1)
                    .map_err(|e| decode_error(operation, e))?;
                joined_row
                    .joined
                    .insert(join.alias.clone(), joined_record(value, &join.primary_key));
            }
            result.push(joined_row);
        }
        Ok(result)
    }
}
