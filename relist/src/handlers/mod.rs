//! HTTP surface of list resources
//!
//! - [`ListQuery`] parses request parameters into a fetch context
//! - [`list`] and [`read`] run the fetch pipelines
//! - [`ResultPage`] renders a page with its `Content-Range` header
//! - [`ApiError`] maps pipeline failures onto status codes
//!
//! Handlers are mounted by [`ResourceHandle::router`](crate::resource::ResourceHandle::router);
//! they can also be called directly from custom axum routes:
//!
//! ```rust,ignore
//! use axum::{extract::{Request, State}, response::Response};
//! use relist::resource::ResourceHandle;
//!
//! async fn active_users(State(users): State<ResourceHandle>, request: Request) -> Response {
//!     relist::handlers::list(&users, request).await
//! }
//! ```

mod error;
mod fetch;
mod query;
mod response;

pub use error::{ApiError, ApiErrorKind, ApiOperation};
pub use fetch::{list, read};
pub use query::ListQuery;
pub use response::{ItemResponse, ResultPage, RANGE_UNIT};
