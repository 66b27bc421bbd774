//! Resource handlers.
//!
//! Most resources map one-to-one onto a REST collection: POST to create,
//! GET/PUT/DELETE on `/{id}`. Those implement [`Resource`], which only
//! describes the schema and the model/wire conversion, and get their CRUD from
//! [`RestResource`]. Resources with a different HTTP layout supply their own
//! [`ResourceOps`].
//!
//! [`all`] lists every resource the provider serves.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::client::TsugaClient;
use crate::error::ProviderError;
use crate::schema::{has_errors, Diagnostic, Schema};
use crate::types::{PlanResult, ReadResult};

pub mod common;
pub mod dashboard;
pub mod ingestion_api_key;
pub mod monitor;
pub mod notification_rule;
pub mod notification_silence;
pub mod processor;
pub mod retention_policy;
pub mod route;
pub mod tag_policy;
pub mod team;
pub mod team_membership;

/// Static description of a resource type.
///
/// `Model` is the configuration/state shape (snake_case, explicit nulls) and
/// `Request`/`Response` are the API bodies.
pub trait Resource: Send + Sync + 'static {
    /// Resource type name, e.g. `tsuga_team`.
    const TYPE_NAME: &'static str;
    /// API collection path, e.g. `/v1/teams`.
    const PATH: &'static str;

    /// Configuration and state.
    type Model: Serialize + DeserializeOwned + Clone + Send + Sync;
    /// Body of create and update calls.
    type Request: Serialize + Send + Sync;
    /// Entity returned by the API.
    type Response: DeserializeOwned + Send;

    /// Resource schema.
    fn schema() -> Schema;

    /// Convert configuration into a request body. All value checks that need
    /// more than the schema (enums, ranges, oneof groups) happen here.
    fn expand(model: &Self::Model) -> Result<Self::Request, ProviderError>;

    /// Convert an API entity back into state.
    ///
    /// `prior` is the planned state on create and update and the current
    /// state on read. It supplies values the API does not echo back.
    fn flatten(
        response: Self::Response,
        prior: Option<&Self::Model>,
    ) -> Result<(Self::Model, Vec<Diagnostic>), ProviderError>;

    /// Remote id stored in state.
    fn id(state: &Value) -> Option<String> {
        state
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
    }

    /// Initial state for `ImportResourceState`. Read fills in the rest.
    fn import_state(id: &str) -> Result<Value, ProviderError> {
        if id.trim().is_empty() {
            return Err(ProviderError::InvalidRequest(format!(
                "{}: import id must not be empty",
                Self::TYPE_NAME
            )));
        }
        Ok(serde_json::json!({ "id": id }))
    }

    /// Validate configuration: schema first, then the full expand.
    fn validate(config: &Value) -> Vec<Diagnostic> {
        let mut diagnostics = crate::validation::validate(&Self::schema(), config);
        if has_errors(&diagnostics) {
            return diagnostics;
        }
        let expanded = serde_json::from_value::<Self::Model>(config.clone())
            .map_err(ProviderError::from)
            .and_then(|model| Self::expand(&model));
        if let Err(err) = expanded {
            diagnostics.push(err.to_diagnostic());
        }
        diagnostics
    }

    /// Copy computed values from prior state into a proposed or planned
    /// state that lacks them.
    ///
    /// The default handles top-level computed attributes.
    fn carry_computed(planned: &mut Value, prior: &Value) {
        carry_top_level_computed(&Self::schema(), planned, prior);
    }
}

/// Copy top-level computed attributes that are null or missing in `planned`.
pub(crate) fn carry_top_level_computed(schema: &Schema, planned: &mut Value, prior: &Value) {
    let Some(planned) = planned.as_object_mut() else {
        return;
    };
    for (name, attr) in &schema.block.attributes {
        // Configurable attributes, including defaulted ones, are left alone.
        if !attr.flags.computed || attr.flags.optional || attr.flags.required {
            continue;
        }
        let missing = planned.get(name).map_or(true, Value::is_null);
        match prior.get(name) {
            Some(value) if missing && !value.is_null() => {
                planned.insert(name.clone(), value.clone());
            }
            _ => {}
        }
    }
}

/// CRUD against the API for one resource type.
#[async_trait::async_trait]
pub trait ResourceOps: Send + Sync {
    /// Create the remote object and return its state.
    async fn create(&self, planned: Value) -> Result<Value, ProviderError>;

    /// Refresh state. [`ReadResult::gone`] when the object no longer exists.
    async fn read(&self, current: Value) -> Result<ReadResult, ProviderError>;

    /// Apply `planned` to the object described by `prior`.
    async fn update(&self, prior: Value, planned: Value) -> Result<Value, ProviderError>;

    /// Delete the object. Deleting something already gone is not an error.
    async fn delete(&self, current: Value) -> Result<(), ProviderError>;
}

/// [`ResourceOps`] for resources living under `PATH/{id}`.
pub struct RestResource<R> {
    client: Arc<TsugaClient>,
    _resource: PhantomData<fn() -> R>,
}

impl<R: Resource> RestResource<R> {
    /// Bind the resource to a configured client.
    pub fn new(client: Arc<TsugaClient>) -> Self {
        Self {
            client,
            _resource: PhantomData,
        }
    }
}

pub(crate) fn missing_id(type_name: &str) -> ProviderError {
    ProviderError::InvalidRequest(format!("{} state has no id", type_name))
}

pub(crate) fn log_diagnostics(type_name: &str, diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        warn!(
            resource_type = type_name,
            attribute = diagnostic.attribute.as_deref().unwrap_or(""),
            "{}: {}",
            diagnostic.summary,
            diagnostic.detail.as_deref().unwrap_or("")
        );
    }
}

#[async_trait::async_trait]
impl<R: Resource> ResourceOps for RestResource<R> {
    async fn create(&self, planned: Value) -> Result<Value, ProviderError> {
        let model: R::Model = serde_json::from_value(planned)?;
        let body = R::expand(&model)?;
        info!(resource_type = R::TYPE_NAME, "creating resource");
        let response: R::Response = self.client.create(R::PATH, &body).await?;
        let (state, diagnostics) = R::flatten(response, Some(&model))?;
        log_diagnostics(R::TYPE_NAME, &diagnostics);
        let state = serde_json::to_value(state)?;
        info!(resource_type = R::TYPE_NAME, id = ?R::id(&state), "created resource");
        Ok(state)
    }

    async fn read(&self, current: Value) -> Result<ReadResult, ProviderError> {
        let id = R::id(&current).ok_or_else(|| missing_id(R::TYPE_NAME))?;
        // Imported state only carries the id, so a partial prior is fine.
        let prior: Option<R::Model> = serde_json::from_value(current).ok();
        debug!(resource_type = R::TYPE_NAME, id = %id, "reading resource");
        match self.client.get::<R::Response>(R::PATH, &id).await? {
            Some(response) => {
                let (state, diagnostics) = R::flatten(response, prior.as_ref())?;
                Ok(ReadResult::found(serde_json::to_value(state)?, diagnostics))
            }
            None => {
                info!(resource_type = R::TYPE_NAME, id = %id, "resource is gone, removing from state");
                Ok(ReadResult::gone())
            }
        }
    }

    async fn update(&self, prior: Value, mut planned: Value) -> Result<Value, ProviderError> {
        let id = R::id(&prior).ok_or_else(|| missing_id(R::TYPE_NAME))?;
        R::carry_computed(&mut planned, &prior);
        let model: R::Model = serde_json::from_value(planned)?;
        let body = R::expand(&model)?;
        info!(resource_type = R::TYPE_NAME, id = %id, "updating resource");
        let response: R::Response = self.client.update(R::PATH, &id, &body).await?;
        let (state, diagnostics) = R::flatten(response, Some(&model))?;
        log_diagnostics(R::TYPE_NAME, &diagnostics);
        Ok(serde_json::to_value(state)?)
    }

    async fn delete(&self, current: Value) -> Result<(), ProviderError> {
        let id = R::id(&current).ok_or_else(|| missing_id(R::TYPE_NAME))?;
        info!(resource_type = R::TYPE_NAME, id = %id, "deleting resource");
        if !self.client.delete(R::PATH, &id).await? {
            info!(resource_type = R::TYPE_NAME, id = %id, "resource was already deleted");
        }
        Ok(())
    }
}

type BuildFn = fn(Arc<TsugaClient>) -> Box<dyn ResourceOps>;

/// Type-erased entry for one resource type.
#[derive(Clone, Copy)]
pub struct ResourceDescriptor {
    /// Resource type name.
    pub type_name: &'static str,
    schema: fn() -> Schema,
    validate: fn(&Value) -> Vec<Diagnostic>,
    plan: fn(Option<&Value>, Option<Value>) -> PlanResult,
    import: fn(&str) -> Result<Value, ProviderError>,
    build: BuildFn,
}

impl std::fmt::Debug for ResourceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceDescriptor")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

fn build_rest<R: Resource>(client: Arc<TsugaClient>) -> Box<dyn ResourceOps> {
    Box::new(RestResource::<R>::new(client))
}

fn plan_resource<R: Resource>(prior: Option<&Value>, proposed: Option<Value>) -> PlanResult {
    let proposed = match (proposed, prior) {
        (Some(mut proposed), Some(prior)) => {
            R::carry_computed(&mut proposed, prior);
            Some(proposed)
        }
        (proposed, _) => proposed,
    };
    crate::plan::plan(&R::schema(), prior, proposed)
}

impl ResourceDescriptor {
    /// Descriptor for a REST resource.
    pub fn of<R: Resource>() -> Self {
        Self {
            type_name: R::TYPE_NAME,
            schema: R::schema,
            validate: R::validate,
            plan: plan_resource::<R>,
            import: R::import_state,
            build: build_rest::<R>,
        }
    }

    /// Replace the CRUD implementation.
    pub fn with_ops(mut self, build: BuildFn) -> Self {
        self.build = build;
        self
    }

    /// Resource schema.
    pub fn schema(&self) -> Schema {
        (self.schema)()
    }

    /// Validate a configuration.
    pub fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        (self.validate)(config)
    }

    /// Plan a change locally.
    pub fn plan(&self, prior: Option<&Value>, proposed: Option<Value>) -> PlanResult {
        (self.plan)(prior, proposed)
    }

    /// Initial state for an import.
    pub fn import_state(&self, id: &str) -> Result<Value, ProviderError> {
        (self.import)(id)
    }

    /// Bind CRUD handlers to a configured client.
    pub fn build(&self, client: Arc<TsugaClient>) -> Box<dyn ResourceOps> {
        (self.build)(client)
    }
}

/// Every resource served by the provider.
pub fn all() -> Vec<ResourceDescriptor> {
    vec![
        ResourceDescriptor::of::<team::Team>(),
        ResourceDescriptor::of::<team_membership::TeamMembership>()
            .with_ops(team_membership::build_ops),
        ResourceDescriptor::of::<dashboard::Dashboard>(),
        ResourceDescriptor::of::<monitor::Monitor>(),
        ResourceDescriptor::of::<route::Route>(),
        ResourceDescriptor::of::<notification_rule::NotificationRule>(),
        ResourceDescriptor::of::<notification_silence::NotificationSilence>(),
        ResourceDescriptor::of::<retention_policy::RetentionPolicy>(),
        ResourceDescriptor::of::<tag_policy::TagPolicy>(),
        ResourceDescriptor::of::<ingestion_api_key::IngestionApiKey>(),
    ]
}
