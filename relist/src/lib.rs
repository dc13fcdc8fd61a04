//! # relist
//!
//! REST list resources over relational models, with pagination that stays
//! correct when records include one-to-many associations.
//!
//! Joining a MANY association multiplies base rows, so a naive
//! `LIMIT 10` over the join returns fewer than ten records and a total that
//! counts joined rows. Resources here paginate base-entity keys first and
//! join associations for exactly that key set ("subquery" pagination), so
//! `GET /users?count=10` returns ten users with all of their hobbies and a
//! `Content-Range: items 0-9/100` header.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use relist::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let hobby = Arc::new(
//!         Model::new("hobby")
//!             .attribute("id", AttributeType::Integer)
//!             .attribute("name", AttributeType::Text),
//!     );
//!     let user = Arc::new(
//!         Model::new("users")
//!             .attribute("id", AttributeType::Integer)
//!             .attribute("username", AttributeType::Text)
//!             .belongs_to_many("hobbies", &hobby, "user_hobbies", "user_id", "hobby_id"),
//!     );
//!
//!     let mut rest = Rest::with_config(Arc::new(MemoryStore::new()), &config.pagination);
//!     let users = rest.resource(
//!         ResourceConfig::new(user)
//!             .endpoints(["/users", "/users/:id"])
//!             .include(IncludeSpec::new("hobby", "hobbies")),
//!     )?;
//!
//!     users.list().fetch().before(|_request, context| {
//!         context.options.sub_query = Some(true);
//!         Control::Continue
//!     });
//!
//!     Server::new(config).serve(rest.router()).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod handlers;
pub mod hooks;
pub mod model;
pub mod observability;
pub mod projection;
pub mod query;
pub mod resource;
pub mod server;
pub mod store;

#[cfg(feature = "database")]
pub mod database;

#[cfg(test)]
mod fixtures;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{AssociatedFilterPolicy, Config, PaginationConfig};
    pub use crate::context::{FetchContext, QueryOptions};
    pub use crate::error::{Error, Result};
    pub use crate::handlers::{ApiError, ApiErrorKind, ListQuery, ResultPage};
    pub use crate::hooks::{Control, FetchHook, RequestInfo};
    pub use crate::model::{AttributeType, Cardinality, Model, Record};
    pub use crate::observability::init_tracing;
    pub use crate::projection::AttributeList;
    pub use crate::query::{FilterCondition, IncludeSpec, OrderTerm, QueryError, Strategy};
    pub use crate::resource::{ResourceConfig, ResourceHandle, Rest};
    pub use crate::server::Server;
    pub use crate::store::{MemoryStore, Store, StoreError};

    #[cfg(feature = "database")]
    pub use crate::store::PgStore;

    pub use async_trait::async_trait;
    pub use axum::Router;
}
