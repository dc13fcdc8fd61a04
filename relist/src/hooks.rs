//! Hook pipeline for list and read actions
//!
//! Each action has a `fetch` milestone with a `before` chain, run after the
//! request is parsed and before the query is built, and an `after` chain, run
//! once the result page is assembled. Hooks run in registration order and may
//! mutate the [`FetchContext`], for example to change pagination options for
//! one request.
//!
//! # Example
//!
//! ```rust
//! use relist::hooks::{Action, Control};
//!
//! let list = Action::default();
//! list.fetch().before(|_request, context| {
//!     context.options.sub_query = Some(false);
//!     Control::Continue
//! });
//! assert_eq!(list.fetch().len(), 1);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use axum::http::{HeaderMap, Method, Uri};
use axum::response::Response;

use crate::context::FetchContext;
use crate::handlers::ApiError;

/// What the pipeline does after a hook returns
#[derive(Debug)]
pub enum Control {
    /// Run the next hook, then carry on with the fetch
    Continue,
    /// Stop and send this response instead
    Respond(Response),
}

/// Read-only view of the incoming request
#[derive(Debug, Clone, Default)]
pub struct RequestInfo {
    /// HTTP method
    pub method: Method,
    /// Full request URI
    pub uri: Uri,
    /// Request headers
    pub headers: HeaderMap,
    /// Path parameters, such as `id` on the read endpoint
    pub params: HashMap<String, String>,
}

/// A hook on a fetch milestone
#[async_trait]
pub trait FetchHook: Send + Sync {
    /// Inspect the request and adjust the context
    ///
    /// # Errors
    ///
    /// An error aborts the request and is returned as the response.
    async fn call(
        &self,
        request: &RequestInfo,
        context: &mut FetchContext,
    ) -> Result<Control, ApiError>;
}

/// Adapter running a synchronous closure as a hook
pub struct FnHook<F>(pub F);

#[async_trait]
impl<F> FetchHook for FnHook<F>
where
    F: Fn(&RequestInfo, &mut FetchContext) -> Control + Send + Sync,
{
    async fn call(
        &self,
        request: &RequestInfo,
        context: &mut FetchContext,
    ) -> Result<Control, ApiError> {
        Ok((self.0)(request, context))
    }
}

type Chain = RwLock<Vec<Arc<dyn FetchHook>>>;

/// Before and after hook chains of one milestone
#[derive(Default)]
pub struct Milestone {
    before: Chain,
    after: Chain,
}

impl Milestone {
    /// Append a closure to the before chain
    pub fn before<F>(&self, hook: F) -> &Self
    where
        F: Fn(&RequestInfo, &mut FetchContext) -> Control + Send + Sync + 'static,
    {
        self.before_hook(FnHook(hook))
    }

    /// Append a hook to the before chain
    pub fn before_hook(&self, hook: impl FetchHook + 'static) -> &Self {
        push(&self.before, Arc::new(hook));
        self
    }

    /// Append a closure to the after chain
    pub fn after<F>(&self, hook: F) -> &Self
    where
        F: Fn(&RequestInfo, &mut FetchContext) -> Control + Send + Sync + 'static,
    {
        self.after_hook(FnHook(hook))
    }

    /// Append a hook to the after chain
    pub fn after_hook(&self, hook: impl FetchHook + 'static) -> &Self {
        push(&self.after, Arc::new(hook));
        self
    }

    /// Number of registered hooks across both chains
    pub fn len(&self) -> usize {
        snapshot(&self.before).len() + snapshot(&self.after).len()
    }

    /// Whether no hooks are registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) async fn run_before(
        &self,
        request: &RequestInfo,
        context: &mut FetchContext,
    ) -> Result<Control, ApiError> {
        run(snapshot(&self.before), request, context).await
    }

    pub(crate) async fn run_after(
        &self,
        request: &RequestInfo,
        context: &mut FetchContext,
    ) -> Result<Control, ApiError> {
        run(snapshot(&self.after), request, context).await
    }
}

impl fmt::Debug for Milestone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Milestone")
            .field("before", &snapshot(&self.before).len())
            .field("after", &snapshot(&self.after).len())
            .finish()
    }
}

/// Hook points of one endpoint action
#[derive(Debug, Default)]
pub struct Action {
    fetch: Milestone,
}

impl Action {
    /// The fetch milestone
    pub fn fetch(&self) -> &Milestone {
        &self.fetch
    }
}

fn push(chain: &Chain, hook: Arc<dyn FetchHook>) {
    chain
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .push(hook);
}

/// Copy of a chain, so no lock is held across hook awaits
fn snapshot(chain: &Chain) -> Vec<Arc<dyn FetchHook>> {
    chain
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

async fn run(
    hooks: Vec<Arc<dyn FetchHook>>,
    request: &RequestInfo,
    context: &mut FetchContext,
) -> Result<Control, ApiError> {
    for hook in hooks {
        if let Control::Respond(response) = hook.call(request, context).await? {
            return Ok(Control::Respond(response));
        }
    }
    Ok(Control::Continue)
}
