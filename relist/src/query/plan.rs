//! Query descriptors handed to a store
//!
//! The engine never talks to storage directly. It composes these descriptors,
//! and a [`Store`](crate::store::Store) executes them.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

use super::filter::{FilterCondition, OrderTerm, Pagination, SearchClause};
use super::planner::JoinDescriptor;
use crate::model::Record;

/// Pagination strategy chosen for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Bound base-entity primary keys first, then join associations for that key set
    SubQuery,
    /// Join first and bound the joined result set
    Flat,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SubQuery => write!(f, "subquery"),
            Self::Flat => write!(f, "flat"),
        }
    }
}

/// EXISTS restriction on base rows through one association
#[derive(Debug, Clone, PartialEq)]
pub struct SemiJoin {
    /// Association to probe
    pub join: JoinDescriptor,
    /// Conditions on the association's columns (alias-qualified)
    pub filters: Vec<FilterCondition>,
}

/// A SELECT over the base table and, optionally, joined associations
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    /// Base table
    pub table: String,
    /// Base primary key column
    pub primary_key: String,
    /// LEFT JOINed associations
    pub joins: Vec<JoinDescriptor>,
    /// Conjunctive conditions; alias-qualified fields refer to `joins`
    pub filters: Vec<FilterCondition>,
    /// Base rows must have at least one matching associated row per entry
    pub semi_joins: Vec<SemiJoin>,
    /// Optional text search over base attributes
    pub search: Option<SearchClause>,
    /// When set, only base rows whose primary key is listed are selected
    pub keys: Option<Vec<Value>>,
    /// ORDER BY terms on base attributes
    pub order: Vec<OrderTerm>,
    /// LIMIT/OFFSET, applied to whatever rows this query produces
    pub window: Option<Pagination>,
}

impl SelectQuery {
    /// Unfiltered, unordered select of a base table
    pub fn new(table: impl Into<String>, primary_key: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            primary_key: primary_key.into(),
            joins: Vec::new(),
            filters: Vec::new(),
            semi_joins: Vec::new(),
            search: None,
            keys: None,
            order: Vec::new(),
            window: None,
        }
    }

    /// Same query restricted to the given primary keys
    #[must_use]
    pub fn with_keys(mut self, keys: Vec<Value>) -> Self {
        self.keys = Some(keys);
        self
    }

    /// Same query without LIMIT/OFFSET and ORDER BY
    #[must_use]
    pub fn unbounded(mut self) -> Self {
        self.window = None;
        self.order.clear();
        self
    }
}

/// What a count query counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountMode {
    /// `COUNT(DISTINCT base.pk)`
    DistinctKeys,
    /// `COUNT(*)` over the joined result
    JoinedRows,
}

/// Total-count query of a plan
#[derive(Debug, Clone, PartialEq)]
pub struct CountQuery {
    /// Rows to count; never windowed
    pub select: SelectQuery,
    /// Counting mode
    pub mode: CountMode,
}

/// Data query of a plan
#[derive(Debug, Clone, PartialEq)]
pub enum DataQuery {
    /// Select bounded base keys, then select rows restricted to those keys
    TwoPhase {
        /// Phase 1: bounded primary-key selection on the unjoined base table
        keys: SelectQuery,
        /// Phase 2: full rows plus joins, restricted to the phase-1 keys
        rows: SelectQuery,
    },
    /// Joined, ordered and windowed in one statement
    Single(SelectQuery),
}

/// Count and data queries for one list request
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    /// Strategy the plan was built for
    pub strategy: Strategy,
    /// Total-count query
    pub count: CountQuery,
    /// Page query
    pub data: DataQuery,
}

/// One row of a (possibly joined) result set
///
/// `joined` holds, per join alias, the associated row matched on this result
/// row, or `None` when the LEFT JOIN found nothing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JoinedRow {
    /// Base table columns
    pub base: Record,
    /// Associated row per join alias
    pub joined: BTreeMap<String, Option<Record>>,
}

impl JoinedRow {
    /// A result row without joins
    pub fn base(base: Record) -> Self {
        Self {
            base,
            joined: BTreeMap::new(),
        }
    }
}
