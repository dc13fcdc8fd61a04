//! Store collaborators
//!
//! The engine composes query descriptors; a [`Store`] executes them. Two
//! implementations ship with the crate:
//!
//! - [`MemoryStore`]: in-process tables with a real join executor, used by
//!   tests and the demo binary
//! - `PgStore` (feature `database`): PostgreSQL through `sqlx`
//!
//! Stores own their connection handling. The two phases of a subquery plan
//! are separate calls; a store without snapshot isolation across them may
//! return a page reflecting rows inserted or deleted in between.

mod error;
mod memory;
#[cfg(feature = "database")]
mod postgres;

use async_trait::async_trait;
use serde_json::Value;

use crate::query::{CountQuery, JoinedRow, SelectQuery};

pub use error::{StoreError, StoreErrorKind, StoreOperation};
pub use memory::MemoryStore;
#[cfg(feature = "database")]
pub use postgres::PgStore;

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Executes query descriptors against relational storage
#[async_trait]
pub trait Store: Send + Sync {
    /// Execute a count query
    async fn count(&self, query: &CountQuery) -> StoreResult<u64>;

    /// Select the primary keys of the base rows `query` produces, ordered and
    /// windowed as the query specifies
    async fn select_keys(&self, query: &SelectQuery) -> StoreResult<Vec<Value>>;

    /// Select base rows with their joined association rows
    ///
    /// The window, when present, applies to the joined result.
    async fn select_rows(&self, query: &SelectQuery) -> StoreResult<Vec<JoinedRow>>;
}
