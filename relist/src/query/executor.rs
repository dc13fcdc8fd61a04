//! Plan execution against a store

use crate::store::{Store, StoreResult};

use super::plan::{DataQuery, JoinedRow, QueryPlan};

/// Rows and total produced by executing a plan
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fetched {
    /// Total matching the request's filters, ignoring the window
    pub total: u64,
    /// Joined rows of the requested page
    pub rows: Vec<JoinedRow>,
}

/// Execute the count and data queries of a plan concurrently
///
/// For two-phase plans the key selection runs first and the row selection is
/// skipped entirely when the window holds no keys.
pub async fn execute(store: &dyn Store, plan: &QueryPlan) -> StoreResult<Fetched> {
    let (total, rows) = futures::try_join!(store.count(&plan.count), fetch(store, &plan.data))?;
    Ok(Fetched { total, rows })
}

async fn fetch(store: &dyn Store, data: &DataQuery) -> StoreResult<Vec<JoinedRow>> {
    match data {
        DataQuery::Single(select) => store.select_rows(select).await,
        DataQuery::TwoPhase { keys, rows } => {
            let keys = store.select_keys(keys).await?;
            if keys.is_empty() {
                return Ok(Vec::new());
            }
            store.select_rows(&rows.clone().with_keys(keys)).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::FetchContext;
    use crate::fixtures::{seeded_store, users_definition};
    use crate::query::{build, plan, Strategy};

    fn context(offset: i64, count: i64) -> FetchContext {
        FetchContext {
            offset,
            count,
            ..FetchContext::default()
        }
    }

    #[tokio::test]
    async fn test_subquery_page_holds_whole_records() {
        let store = seeded_store(12, 3);
        let definition = users_definition(true);
        let joins = plan(&definition.includes);
        let query = build(Strategy::SubQuery, &definition, &joins, &context(0, 5)).unwrap();

        let fetched = execute(&store, &query).await.unwrap();
        assert_eq!(fetched.total, 12);
        // 5 users, each sharing the same 3 hobbies
        assert_eq!(fetched.rows.len(), 15);
        let records = joins.attach("id", fetched.rows);
        assert_eq!(records.len(), 5);
        for record in &records {
            let ids: Vec<i64> = record["hobbies"]
                .as_array()
                .unwrap()
                .iter()
                .map(|h| h["id"].as_i64().unwrap())
                .collect();
            assert_eq!(ids, vec![1, 2, 3]);
        }
    }

    #[tokio::test]
    async fn test_flat_page_counts_joined_rows() {
        let store = seeded_store(12, 3);
        let definition = users_definition(false);
        let joins = plan(&definition.includes);
        let query = build(Strategy::Flat, &definition, &joins, &context(0, 5)).unwrap();

        let fetched = execute(&store, &query).await.unwrap();
        assert_eq!(fetched.total, 36);
        assert_eq!(fetched.rows.len(), 5);
        assert_eq!(joins.attach("id", fetched.rows).len(), 2);
    }

    #[tokio::test]
    async fn test_window_past_end_skips_row_phase() {
        let store = seeded_store(3, 1);
        let definition = users_definition(true);
        let joins = plan(&definition.includes);
        let query = build(Strategy::SubQuery, &definition, &joins, &context(50, 10)).unwrap();

        let fetched = execute(&store, &query).await.unwrap();
        assert_eq!(fetched.total, 3);
        assert!(fetched.rows.is_empty());
    }
}
