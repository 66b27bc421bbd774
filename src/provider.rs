//! The Tsuga provider.
//!
//! Schema, validation, planning and import are local and work before
//! `Configure`. CRUD and data source reads need the API client, which
//! `Configure` builds once and hands to every resource handler.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use serde_json::Value;
use tracing::{debug, info};

use crate::client::TsugaClient;
use crate::config::{env_var_or_none, provider_schema, validate_with, ProviderConfig};
use crate::data_sources::{self, DataSource};
use crate::error::ProviderError;
use crate::resources::{self, ResourceDescriptor, ResourceOps};
use crate::schema::{Diagnostic, ProviderSchema};
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult, ReadResult};

type EnvLookup = fn(&str) -> Option<String>;

/// State built by `Configure`.
struct Configured {
    client: Arc<TsugaClient>,
    handlers: HashMap<&'static str, Box<dyn ResourceOps>>,
}

/// [`ProviderService`] for the Tsuga API.
pub struct TsugaProvider {
    descriptors: HashMap<&'static str, ResourceDescriptor>,
    data_sources: HashMap<&'static str, Box<dyn DataSource>>,
    configured: OnceLock<Configured>,
    env: EnvLookup,
}

impl Default for TsugaProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TsugaProvider {
    /// Provider reading fallbacks from the process environment.
    pub fn new() -> Self {
        Self::with_env_lookup(env_var_or_none)
    }

    /// Provider reading fallbacks through `env`.
    pub fn with_env_lookup(env: EnvLookup) -> Self {
        let descriptors = resources::all()
            .into_iter()
            .map(|descriptor| (descriptor.type_name, descriptor))
            .collect();
        let data_sources = data_sources::all()
            .into_iter()
            .map(|source| (source.type_name(), source))
            .collect();
        Self {
            descriptors,
            data_sources,
            configured: OnceLock::new(),
            env,
        }
    }

    /// Whether `Configure` has succeeded.
    pub fn is_configured(&self) -> bool {
        self.configured.get().is_some()
    }

    fn descriptor(&self, resource_type: &str) -> Result<&ResourceDescriptor, ProviderError> {
        self.descriptors
            .get(resource_type)
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))
    }

    fn handler(&self, resource_type: &str) -> Result<&dyn ResourceOps, ProviderError> {
        self.descriptor(resource_type)?;
        let configured = self.configured.get().ok_or(ProviderError::NotConfigured)?;
        configured
            .handlers
            .get(resource_type)
            .map(|ops| ops.as_ref())
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))
    }

    fn data_source(&self, data_source_type: &str) -> Result<&dyn DataSource, ProviderError> {
        self.data_sources
            .get(data_source_type)
            .map(|source| source.as_ref())
            .ok_or_else(|| ProviderError::UnknownResource(data_source_type.to_string()))
    }
}

#[async_trait::async_trait]
impl ProviderService for TsugaProvider {
    fn schema(&self) -> ProviderSchema {
        let schema = self.descriptors.values().fold(
            ProviderSchema::new().with_provider_config(provider_schema()),
            |schema, descriptor| schema.with_resource(descriptor.type_name, descriptor.schema()),
        );
        self.data_sources.values().fold(schema, |schema, source| {
            schema.with_data_source(source.type_name(), source.schema())
        })
    }

    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(validate_with(config, self.env))
    }

    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        if self.is_configured() {
            return Err(ProviderError::Configuration(
                "provider is already configured".to_string(),
            ));
        }
        let resolved = ProviderConfig::from_value(config)?.resolve_with(self.env)?;
        let client = Arc::new(TsugaClient::new(&resolved)?);
        let handlers = self
            .descriptors
            .values()
            .map(|descriptor| (descriptor.type_name, descriptor.build(Arc::clone(&client))))
            .collect();
        self.configured
            .set(Configured { client, handlers })
            .map_err(|_| {
                ProviderError::Configuration("provider is already configured".to_string())
            })?;
        info!(base_url = %resolved.base_url, "provider configured");
        Ok(Vec::new())
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(self.descriptor(resource_type)?.validate(&config))
    }

    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Option<Value>,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let descriptor = self.descriptor(resource_type)?;
        let result = descriptor.plan(prior_state.as_ref(), proposed_state);
        debug!(
            resource_type,
            changes = result.changes.len(),
            requires_replace = result.requires_replace,
            "planned"
        );
        Ok(result)
    }

    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        self.handler(resource_type)?.create(planned_state).await
    }

    async fn read(&self, resource_type: &str, current_state: Value) -> Result<ReadResult, ProviderError> {
        self.handler(resource_type)?.read(current_state).await
    }

    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.handler(resource_type)?
            .update(prior_state, planned_state)
            .await
    }

    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        self.handler(resource_type)?.delete(current_state).await
    }

    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let state = self.descriptor(resource_type)?.import_state(id)?;
        info!(resource_type, id, "importing resource");
        Ok(vec![ImportedResource::new(resource_type, state)])
    }

    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(self.data_source(data_source_type)?.validate(&config))
    }

    async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let source = self.data_source(data_source_type)?;
        let configured = self.configured.get().ok_or(ProviderError::NotConfigured)?;
        debug!(data_source_type, "reading data source");
        source.read(&configured.client, config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn provider() -> TsugaProvider {
        TsugaProvider::with_env_lookup(no_env)
    }

    fn config() -> Value {
        json!({"base_url": "http://127.0.0.1:9", "token": "tsg_test"})
    }

    #[test]
    fn test_schema_lists_every_resource() {
        let schema = provider().schema();
        assert_eq!(schema.resources.len(), 10);
        assert!(schema.resources.contains_key("tsuga_route"));
        assert!(schema.provider.attribute("token").unwrap().flags.sensitive);

        let metadata = provider().metadata();
        assert_eq!(metadata.resources[0], "tsuga_dashboard");
        assert_eq!(metadata.data_sources, vec!["tsuga_team", "tsuga_user"]);
    }

    #[test]
    fn test_schema_lists_data_sources() {
        let schema = provider().schema();
        assert_eq!(schema.data_sources.len(), 2);
        let user = &schema.data_sources["tsuga_user"];
        assert!(user.attribute("id").unwrap().flags.required);
        assert!(user.attribute("email").unwrap().flags.computed);
    }

    #[tokio::test]
    async fn test_data_source_read_requires_configure() {
        let provider = provider();
        let err = provider
            .read_data_source("tsuga_user", json!({"id": "user-1"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured));

        // Validation stays local.
        let diagnostics = provider
            .validate_data_source_config("tsuga_team", json!({"name": "platform"}))
            .await
            .unwrap();
        assert!(diagnostics.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_data_source() {
        let provider = provider();
        provider.configure(config()).await.unwrap();
        let err = provider
            .read_data_source("tsuga_monitor", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(name) if name == "tsuga_monitor"));
    }

    #[tokio::test]
    async fn test_crud_requires_configure() {
        let provider = provider();
        let err = provider.create("tsuga_team", json!({})).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured));

        let err = provider.read("tsuga_team", json!({"id": "t"})).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured));
    }

    #[tokio::test]
    async fn test_unknown_resource() {
        let provider = provider();
        let err = provider.create("tsuga_widget", json!({})).await.unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(name) if name == "tsuga_widget"));

        let err = provider
            .validate_resource_config("tsuga_widget", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));
    }

    #[tokio::test]
    async fn test_configure_once() {
        let provider = provider();
        assert!(provider.configure(config()).await.unwrap().is_empty());
        assert!(provider.is_configured());
        let err = provider.configure(config()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_configure_without_token_fails() {
        let provider = provider();
        let err = provider.configure(json!({"base_url": null, "token": null})).await.unwrap_err();
        assert!(err.to_string().contains("TSUGA_TOKEN"));
        assert!(!provider.is_configured());

        let diagnostics = provider.validate_provider_config(json!({})).await.unwrap();
        assert_eq!(diagnostics.len(), 1);
    }

    #[tokio::test]
    async fn test_configure_reads_env_fallback() {
        fn env(key: &str) -> Option<String> {
            (key == "TSUGA_TOKEN").then(|| "from-env".to_string())
        }
        let provider = TsugaProvider::with_env_lookup(env);
        assert!(provider.configure(json!({})).await.is_ok());
    }

    #[tokio::test]
    async fn test_import_uses_resource_id_format() {
        let provider = provider();
        let imported = provider
            .import_resource("tsuga_team_membership", "user-1:team-1")
            .await
            .unwrap();
        assert_eq!(imported[0].state["user_id"], "user-1");
        assert_eq!(imported[0].state["team_id"], "team-1");

        let err = provider
            .import_resource("tsuga_team_membership", "user-1")
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidRequest(_)));

        let imported = provider.import_resource("tsuga_route", "r-1").await.unwrap();
        assert_eq!(imported[0].state, json!({"id": "r-1"}));
    }

    #[tokio::test]
    async fn test_plan_is_local() {
        let provider = provider();
        let result = provider
            .plan(
                "tsuga_team",
                None,
                Some(json!({"name": "payments", "visibility": "private"})),
                Value::Null,
            )
            .await
            .unwrap();
        assert!(!result.changes.is_empty());
        assert!(!result.requires_replace);
    }
}
