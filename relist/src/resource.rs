//! Resource registration and routing
//!
//! A resource binds a [`Model`] to a list endpoint and a read endpoint. It is
//! registered once through [`Rest::resource`], which resolves every include
//! against the model's declared associations, and can be reconfigured
//! afterwards through the returned [`ResourceHandle`]. Each request works on
//! a snapshot of the configuration taken when it is dispatched.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use relist::model::{AttributeType, Model};
//! use relist::query::IncludeSpec;
//! use relist::resource::{ResourceConfig, Rest};
//! use relist::store::MemoryStore;
//!
//! let hobby = Arc::new(
//!     Model::new("hobby")
//!         .attribute("id", AttributeType::Integer)
//!         .attribute("name", AttributeType::Text),
//! );
//! let user = Arc::new(
//!     Model::new("users")
//!         .attribute("id", AttributeType::Integer)
//!         .attribute("username", AttributeType::Text)
//!         .belongs_to_many("hobbies", &hobby, "user_hobbies", "user_id", "hobby_id"),
//! );
//!
//! let mut rest = Rest::initialize(Arc::new(MemoryStore::new()));
//! let users = rest
//!     .resource(
//!         ResourceConfig::new(user)
//!             .endpoints(["/users", "/users/:id"])
//!             .include(IncludeSpec::new("hobby", "hobbies")),
//!     )
//!     .unwrap();
//! users.set_attributes(["id", "username"]);
//!
//! let app = rest.router();
//! # let _ = app;
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use axum::extract::{Path, Request, State};
use axum::response::Response;
use axum::routing::get;
use axum::Router;

use crate::config::{AssociatedFilterPolicy, PaginationConfig};
use crate::handlers;
use crate::hooks::Action;
use crate::model::Model;
use crate::projection::AttributeList;
use crate::query::{AssociationInclude, IncludeSpec, QueryError};
use crate::store::Store;

/// Registration options for one resource
#[derive(Debug, Clone)]
pub struct ResourceConfig {
    /// Base model
    pub model: Arc<Model>,
    /// `[list, read]` endpoint patterns; `:name` marks a path parameter
    pub endpoints: Vec<String>,
    /// Associations to nest in every record
    pub include: Vec<IncludeSpec>,
    /// Serialized base columns; all when unset
    pub attributes: Option<AttributeList>,
    /// Subquery pagination default; the service-wide setting when unset
    pub sub_query: Option<bool>,
    /// Columns searched by `q`; the model's text attributes when unset
    pub search: Option<Vec<String>>,
}

impl ResourceConfig {
    /// Configuration with `/{table}` and `/{table}/:id` endpoints
    pub fn new(model: Arc<Model>) -> Self {
        let table = model.table_name().to_string();
        Self {
            endpoints: vec![format!("/{}", table), format!("/{}/:id", table)],
            model,
            include: Vec::new(),
            attributes: None,
            sub_query: None,
            search: None,
        }
    }

    /// Set the endpoint patterns
    #[must_use]
    pub fn endpoints<I, S>(mut self, endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.endpoints = endpoints.into_iter().map(Into::into).collect();
        self
    }

    /// Add an include
    #[must_use]
    pub fn include(mut self, include: IncludeSpec) -> Self {
        self.include.push(include);
        self
    }

    /// Set the serialized base columns
    #[must_use]
    pub fn attributes(mut self, attributes: impl Into<AttributeList>) -> Self {
        self.attributes = Some(attributes.into());
        self
    }

    /// Set the subquery pagination default
    #[must_use]
    pub fn sub_query(mut self, sub_query: bool) -> Self {
        self.sub_query = Some(sub_query);
        self
    }

    /// Set the searchable columns
    #[must_use]
    pub fn search<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search = Some(fields.into_iter().map(Into::into).collect());
        self
    }
}

/// Resolved, immutable view of a resource's configuration
#[derive(Debug, Clone)]
pub struct ResourceDefinition {
    /// Resource name, the base model's name
    pub name: String,
    /// Base model
    pub model: Arc<Model>,
    /// `[list, read]` endpoint patterns
    pub endpoints: Vec<String>,
    /// Includes resolved against the model's associations
    pub includes: Vec<AssociationInclude>,
    /// Serialized base columns
    pub attributes: AttributeList,
    /// Subquery pagination default
    pub sub_query: bool,
    /// Columns searched by `q`
    pub search_attributes: Vec<String>,
    /// Handling of `alias.field` filters under subquery pagination
    pub associated_filters: AssociatedFilterPolicy,
}

impl ResourceDefinition {
    /// Resolve a registration against its model
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::AssociationNotFound`] for an include the model
    /// does not declare, and [`QueryError::InvalidFilter`] for an unknown
    /// search column.
    pub fn resolve(config: ResourceConfig, pagination: &PaginationConfig) -> Result<Self, QueryError> {
        let model = config.model;
        let includes = config
            .include
            .iter()
            .map(|spec| AssociationInclude::resolve(&model, spec))
            .collect::<Result<Vec<_>, _>>()?;

        let search_attributes = match config.search {
            Some(fields) => {
                if let Some(unknown) = fields.iter().find(|f| model.find_attribute(f).is_none()) {
                    return Err(QueryError::InvalidFilter {
                        field: unknown.clone(),
                        reason: "unknown search attribute".to_string(),
                    });
                }
                fields
            }
            None => model.text_attributes(),
        };

        Ok(Self {
            name: model.name().to_string(),
            endpoints: config.endpoints,
            includes,
            attributes: config.attributes.unwrap_or_default(),
            sub_query: config.sub_query.unwrap_or(pagination.sub_query),
            search_attributes,
            associated_filters: pagination.associated_filters,
            model,
        })
    }
}

struct ResourceInner {
    definition: RwLock<ResourceDefinition>,
    store: Arc<dyn Store>,
    pagination: PaginationConfig,
    list: Action,
    read: Action,
}

/// Shared handle to a registered resource
///
/// Cloning is cheap; all clones see the same configuration and hooks.
#[derive(Clone)]
pub struct ResourceHandle {
    inner: Arc<ResourceInner>,
}

impl ResourceHandle {
    fn new(definition: ResourceDefinition, store: Arc<dyn Store>, pagination: PaginationConfig) -> Self {
        Self {
            inner: Arc::new(ResourceInner {
                definition: RwLock::new(definition),
                store,
                pagination,
                list: Action::default(),
                read: Action::default(),
            }),
        }
    }

    /// Hooks of the list endpoint
    pub fn list(&self) -> &Action {
        &self.inner.list
    }

    /// Hooks of the read endpoint
    pub fn read(&self) -> &Action {
        &self.inner.read
    }

    /// Resource name
    pub fn name(&self) -> String {
        self.snapshot().name
    }

    /// Currently serialized base columns
    pub fn attributes(&self) -> AttributeList {
        self.snapshot().attributes
    }

    /// Replace the serialized base columns
    ///
    /// Requests already dispatched keep the list they started with.
    pub fn set_attributes(&self, attributes: impl Into<AttributeList>) {
        let attributes = attributes.into();
        tracing::debug!(resource = %self.name(), ?attributes, "Attribute list replaced");
        self.inner
            .definition
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .attributes = attributes;
    }

    /// Replace the subquery pagination default
    pub fn set_sub_query(&self, sub_query: bool) {
        self.inner
            .definition
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .sub_query = sub_query;
    }

    /// Configuration as of now
    pub fn snapshot(&self) -> ResourceDefinition {
        self.inner
            .definition
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn store(&self) -> &dyn Store {
        self.inner.store.as_ref()
    }

    pub(crate) fn pagination(&self) -> &PaginationConfig {
        &self.inner.pagination
    }

    /// Router serving this resource's endpoints
    pub fn router(&self) -> Router {
        let definition = self.snapshot();
        let mut router = Router::new();
        if let Some(list) = definition.endpoints.first() {
            router = router.route(&route_path(list), get(list_endpoint));
        }
        if let Some(read) = definition.endpoints.get(1) {
            router = router.route(&route_path(read), get(read_endpoint));
        }
        router.with_state(self.clone())
    }
}

impl fmt::Debug for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("definition", &self.snapshot())
            .field("list", &self.inner.list)
            .field("read", &self.inner.read)
            .finish_non_exhaustive()
    }
}

async fn list_endpoint(State(resource): State<ResourceHandle>, request: Request) -> Response {
    handlers::list(&resource, request).await
}

async fn read_endpoint(
    State(resource): State<ResourceHandle>,
    Path(params): Path<HashMap<String, String>>,
    request: Request,
) -> Response {
    handlers::read(&resource, params, request).await
}

/// Convert `:name` segments to the router's `{name}` syntax
fn route_path(endpoint: &str) -> String {
    endpoint
        .split('/')
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) => format!("{{{}}}", name),
            None => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Registry of list resources sharing one store
pub struct Rest {
    store: Arc<dyn Store>,
    pagination: PaginationConfig,
    resources: Vec<ResourceHandle>,
}

impl Rest {
    /// Registry with default pagination settings
    pub fn initialize(store: Arc<dyn Store>) -> Self {
        Self::with_config(store, &PaginationConfig::default())
    }

    /// Registry with the given pagination settings
    pub fn with_config(store: Arc<dyn Store>, pagination: &PaginationConfig) -> Self {
        Self {
            store,
            pagination: pagination.clone(),
            resources: Vec::new(),
        }
    }

    /// Register a resource
    ///
    /// # Errors
    ///
    /// See [`ResourceDefinition::resolve`].
    pub fn resource(&mut self, config: ResourceConfig) -> Result<ResourceHandle, QueryError> {
        let definition = ResourceDefinition::resolve(config, &self.pagination)?;
        tracing::info!(
            resource = %definition.name,
            endpoints = ?definition.endpoints,
            includes = definition.includes.len(),
            sub_query = definition.sub_query,
            "Registered resource"
        );

        let handle = ResourceHandle::new(
            definition,
            Arc::clone(&self.store),
            self.pagination.clone(),
        );
        self.resources.push(handle.clone());
        Ok(handle)
    }

    /// Registered resources, in registration order
    pub fn resources(&self) -> &[ResourceHandle] {
        &self.resources
    }

    /// Router serving every registered resource
    pub fn router(&self) -> Router {
        self.resources
            .iter()
            .fold(Router::new(), |router, resource| router.merge(resource.router()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::users_model;
    use crate::store::MemoryStore;

    fn rest() -> Rest {
        Rest::initialize(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_route_path() {
        assert_eq!(route_path("/users"), "/users");
        assert_eq!(route_path("/users/:id"), "/users/{id}");
        assert_eq!(route_path("/teams/:team/users"), "/teams/{team}/users");
    }

    #[test]
    fn test_default_endpoints() {
        let config = ResourceConfig::new(users_model());
        assert_eq!(config.endpoints, vec!["/users", "/users/:id"]);
    }

    #[test]
    fn test_registration_resolves_includes() {
        let mut rest = rest();
        let handle = rest
            .resource(ResourceConfig::new(users_model()).include(IncludeSpec::new("hobby", "hobbies")))
            .unwrap();
        let definition = handle.snapshot();
        assert_eq!(definition.includes.len(), 1);
        assert!(definition.sub_query);
        assert_eq!(definition.search_attributes, vec!["username", "email"]);
        assert_eq!(rest.resources().len(), 1);
    }

    #[test]
    fn test_registration_rejects_unknown_association() {
        let err = rest()
            .resource(ResourceConfig::new(users_model()).include(IncludeSpec::alias("pets")))
            .unwrap_err();
        assert!(matches!(err, QueryError::AssociationNotFound { ref alias, .. } if alias == "pets"));
    }

    #[test]
    fn test_registration_rejects_unknown_search_column() {
        let err = rest()
            .resource(ResourceConfig::new(users_model()).search(["nickname"]))
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidFilter { .. }));
    }

    #[test]
    fn test_service_default_for_sub_query() {
        let pagination = PaginationConfig {
            sub_query: false,
            ..PaginationConfig::default()
        };
        let mut rest = Rest::with_config(Arc::new(MemoryStore::new()), &pagination);
        let handle = rest.resource(ResourceConfig::new(users_model())).unwrap();
        assert!(!handle.snapshot().sub_query);

        let handle = rest
            .resource(ResourceConfig::new(users_model()).sub_query(true))
            .unwrap();
        assert!(handle.snapshot().sub_query);
    }

    #[test]
    fn test_attributes_last_write_wins() {
        let mut rest = rest();
        let handle = rest.resource(ResourceConfig::new(users_model())).unwrap();
        assert_eq!(handle.attributes(), AttributeList::All);

        let before = handle.snapshot();
        handle.set_attributes(["id"]);
        handle.clone().set_attributes(["id", "username"]);

        assert_eq!(handle.attributes(), AttributeList::only(["id", "username"]));
        assert_eq!(before.attributes, AttributeList::All);
    }
}
