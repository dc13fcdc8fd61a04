//! List query construction
//!
//! A list request flows through this module in four steps:
//!
//! 1. [`plan`] turns a resource's resolved includes into a [`JoinSpec`]
//! 2. [`select`] picks a [`Strategy`] for the request
//! 3. [`build`] composes the count and data queries into a [`QueryPlan`]
//! 4. [`execute`] runs the plan against a [`Store`](crate::store::Store)
//!
//! [`JoinSpec::attach`] then groups the joined rows under their base records.

mod builder;
mod error;
mod executor;
mod filter;
mod plan;
mod planner;
pub mod sql;
mod strategy;

pub use builder::{build, build_read};
pub use error::QueryError;
pub use executor::{execute, Fetched};
pub use filter::{
    FilterCondition, FilterOperator, FilterValue, OrderDirection, OrderTerm, Pagination,
    SearchClause,
};
pub use plan::{
    CountMode, CountQuery, DataQuery, JoinedRow, QueryPlan, SelectQuery, SemiJoin, Strategy,
};
pub use planner::{plan, AssociationInclude, IncludeSpec, JoinDescriptor, JoinSpec};
pub use strategy::select;
