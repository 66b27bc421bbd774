//! Test harness for [`ProviderService`] implementations.
//!
//! Drives a provider the way the gRPC layer would, without a server.
//!
//! # Example
//!
//! ```ignore
//! use tsuga_provider::testing::ProviderTester;
//! use tsuga_provider::TsugaProvider;
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn test_create_team() {
//!     let tester = ProviderTester::new(TsugaProvider::new());
//!     tester
//!         .configure(json!({"base_url": server.uri(), "token": "tsg_test"}))
//!         .await
//!         .unwrap();
//!
//!     let state = tester
//!         .lifecycle_create("tsuga_team", json!({"name": "payments", "visibility": "private"}))
//!         .await
//!         .unwrap();
//!     assert_eq!(state["name"], "payments");
//! }
//! ```

use crate::error::ProviderError;
use crate::schema::{Diagnostic, DiagnosticSeverity, ProviderSchema};
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult, ReadResult};
use serde_json::Value;

/// Wraps a provider with plan/apply shortcuts and lifecycle helpers.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    /// Create a new tester for the given provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// The wrapped provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    // =========================================================================
    // Schema & Metadata
    // =========================================================================

    /// The provider's schema.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Resource type names, sorted.
    pub fn resource_types(&self) -> Vec<String> {
        self.provider.metadata().resources
    }

    /// Data source type names, sorted.
    pub fn data_source_types(&self) -> Vec<String> {
        self.provider.metadata().data_sources
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Validate provider configuration. Fails on any error diagnostic.
    pub async fn validate_provider_config(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.validate_provider_config(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Configure the provider. Fails on any error diagnostic.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.configure(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Stop the provider.
    pub async fn stop(&self) -> Result<(), ProviderError> {
        self.provider.stop().await
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Validate a resource configuration. Fails on any error diagnostic.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_resource_config(resource_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Raw diagnostics from resource validation.
    pub async fn resource_diagnostics(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        self.provider
            .validate_resource_config(resource_type, config)
            .await
    }

    /// Plan a create.
    pub async fn plan_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, None, Some(config.clone()), config)
            .await
    }

    /// Plan an update of `prior_state` towards `config`.
    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), Some(config.clone()), config)
            .await
    }

    /// Plan a destroy.
    pub async fn plan_delete(
        &self,
        resource_type: &str,
        prior_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), None, Value::Null)
            .await
    }

    /// Create a resource from a planned state.
    pub async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, planned_state).await
    }

    /// Refresh a resource.
    pub async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<ReadResult, ProviderError> {
        self.provider.read(resource_type, current_state).await
    }

    /// Update a resource.
    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .update(resource_type, prior_state, planned_state)
            .await
    }

    /// Delete a resource.
    pub async fn delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, current_state).await
    }

    /// Import a resource by id.
    pub async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    /// Upgrade stored state.
    pub async fn upgrade_resource_state(
        &self,
        resource_type: &str,
        version: i64,
        state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .upgrade_resource_state(resource_type, version, state)
            .await
    }

    // =========================================================================
    // Data Source Operations
    // =========================================================================

    /// Validate a data source configuration. Fails on any error diagnostic.
    pub async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_data_source_config(data_source_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Look up a data source.
    pub async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .read_data_source(data_source_type, config)
            .await
    }

    // =========================================================================
    // Lifecycle Helpers
    // =========================================================================

    /// Plan, create, then read back. Returns the refreshed state.
    pub async fn lifecycle_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Value, TestError> {
        let plan = self.plan_create(resource_type, config).await?;
        let created = self.create(resource_type, plan.planned_state).await?;
        self.read_existing(resource_type, created).await
    }

    /// Plan, update, then read back. Returns the refreshed state.
    pub async fn lifecycle_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        config: Value,
    ) -> Result<Value, TestError> {
        let plan = self
            .plan_update(resource_type, prior_state.clone(), config)
            .await?;
        let updated = self
            .update(resource_type, prior_state, plan.planned_state)
            .await?;
        self.read_existing(resource_type, updated).await
    }

    /// Plan a destroy, then delete.
    pub async fn lifecycle_delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), TestError> {
        self.plan_delete(resource_type, current_state.clone())
            .await?;
        Ok(self.delete(resource_type, current_state).await?)
    }

    /// Create, update, delete. Returns the state after the update.
    pub async fn lifecycle_crud(
        &self,
        resource_type: &str,
        initial_config: Value,
        updated_config: Value,
    ) -> Result<Value, TestError> {
        let created = self.lifecycle_create(resource_type, initial_config).await?;
        let updated = self
            .lifecycle_update(resource_type, created, updated_config)
            .await?;
        self.lifecycle_delete(resource_type, updated.clone()).await?;
        Ok(updated)
    }

    async fn read_existing(&self, resource_type: &str, state: Value) -> Result<Value, TestError> {
        self.read(resource_type, state)
            .await?
            .state
            .ok_or_else(|| TestError::Gone(resource_type.to_string()))
    }
}

/// Failure of a tester operation.
#[derive(Debug)]
pub enum TestError {
    /// The operation returned error diagnostics.
    Diagnostics(Vec<Diagnostic>),
    /// The provider returned an error.
    Provider(ProviderError),
    /// A read right after create or update reported the resource gone.
    Gone(String),
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::Diagnostics(diags) => {
                writeln!(f, "Operation failed with {} diagnostic(s):", diags.len())?;
                for diag in diags {
                    write!(f, "  [{:?}] {}", diag.severity, diag.summary)?;
                    if let Some(detail) = &diag.detail {
                        write!(f, ": {}", detail)?;
                    }
                    if let Some(attr) = &diag.attribute {
                        write!(f, " (at {})", attr)?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            }
            TestError::Provider(e) => write!(f, "Provider error: {}", e),
            TestError::Gone(resource_type) => {
                write!(f, "{} disappeared right after it was written", resource_type)
            }
        }
    }
}

impl std::error::Error for TestError {}

impl From<ProviderError> for TestError {
    fn from(e: ProviderError) -> Self {
        TestError::Provider(e)
    }
}

fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics
        .into_iter()
        .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

// =========================================================================
// Assertion Helpers
// =========================================================================

fn changed_paths(plan: &PlanResult) -> Vec<&str> {
    plan.changes.iter().map(|c| c.path.as_str()).collect()
}

/// Assert that a plan creates the resource.
///
/// # Panics
///
/// Panics if the plan has no changes or requires replacement.
pub fn assert_plan_creates(plan: &PlanResult) {
    assert!(
        !plan.changes.is_empty(),
        "Expected plan to have changes for create, but got no changes"
    );
    assert!(
        !plan.requires_replace,
        "Expected plan to create, not replace"
    );
}

/// Assert that a plan has no changes.
///
/// # Panics
///
/// Panics if the plan has any changes.
pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        plan.changes.is_empty(),
        "Expected no changes, but got {} change(s): {:?}",
        plan.changes.len(),
        changed_paths(plan)
    );
}

/// Assert that a plan has changes.
///
/// # Panics
///
/// Panics if the plan has no changes.
pub fn assert_plan_has_changes(plan: &PlanResult) {
    assert!(
        !plan.changes.is_empty(),
        "Expected plan to have changes, but got no changes"
    );
}

/// Assert that a plan replaces the resource.
///
/// # Panics
///
/// Panics if the plan does not require replacement.
pub fn assert_plan_replaces(plan: &PlanResult) {
    assert!(
        plan.requires_replace,
        "Expected plan to require replacement, but it does not. Changes: {:?}",
        changed_paths(plan)
    );
}

/// Assert that a plan updates in place.
///
/// # Panics
///
/// Panics if the plan requires replacement.
pub fn assert_plan_updates_in_place(plan: &PlanResult) {
    assert!(
        !plan.requires_replace,
        "Expected plan to update in place, but it requires replacement"
    );
}

/// Assert that a plan changes the attribute at `path`.
///
/// # Panics
///
/// Panics if no change has that path.
pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str) {
    assert!(
        plan.changes.iter().any(|c| c.path == path),
        "Expected plan to change attribute '{}', but it was not changed. Changed attributes: {:?}",
        path,
        changed_paths(plan)
    );
}

/// Assert that a plan leaves the attribute at `path` alone.
///
/// # Panics
///
/// Panics if a change has that path.
pub fn assert_plan_does_not_change_attribute(plan: &PlanResult, path: &str) {
    assert!(
        !plan.changes.iter().any(|c| c.path == path),
        "Expected plan to not change attribute '{}', but it was changed",
        path
    );
}

/// Assert that diagnostics contain no errors.
///
/// # Panics
///
/// Panics if there are any error diagnostics.
pub fn assert_no_errors(diagnostics: &[Diagnostic]) {
    let errors: Vec<_> = diagnostics.iter().filter(|d| d.is_error()).collect();

    assert!(
        errors.is_empty(),
        "Expected no errors, but got {} error(s): {:?}",
        errors.len(),
        errors
            .iter()
            .map(|d| (&d.summary, &d.detail, &d.attribute))
            .collect::<Vec<_>>()
    );
}

/// Assert that diagnostics contain at least one error.
///
/// # Panics
///
/// Panics if there are no error diagnostics.
pub fn assert_has_errors(diagnostics: &[Diagnostic]) {
    assert!(
        diagnostics.iter().any(Diagnostic::is_error),
        "Expected at least one error, but got none"
    );
}

/// Assert that some error's summary or detail contains `substring`.
///
/// # Panics
///
/// Panics if no error diagnostic matches.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    let matches = |d: &&Diagnostic| {
        d.summary.contains(substring)
            || d.detail.as_deref().is_some_and(|detail| detail.contains(substring))
    };
    assert!(
        diagnostics.iter().filter(|d| d.is_error()).any(|d| matches(&d)),
        "Expected an error containing '{}', but no matching error found. Errors: {:?}",
        substring,
        diagnostics
            .iter()
            .filter(|d| d.is_error())
            .map(|d| (&d.summary, &d.detail))
            .collect::<Vec<_>>()
    );
}

/// Assert that some error points at `attribute`.
///
/// # Panics
///
/// Panics if no error diagnostic has that attribute path.
pub fn assert_error_at(diagnostics: &[Diagnostic], attribute: &str) {
    assert!(
        diagnostics
            .iter()
            .any(|d| d.is_error() && d.attribute.as_deref() == Some(attribute)),
        "Expected an error at '{}', got errors at {:?}",
        attribute,
        diagnostics
            .iter()
            .filter(|d| d.is_error())
            .map(|d| &d.attribute)
            .collect::<Vec<_>>()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::TsugaProvider;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn tester() -> ProviderTester<TsugaProvider> {
        ProviderTester::new(TsugaProvider::with_env_lookup(no_env))
    }

    fn team() -> Value {
        json!({"name": "payments", "description": null, "visibility": "private", "tags": null})
    }

    #[test]
    fn test_resource_types_sorted() {
        let types = tester().resource_types();
        assert_eq!(types.len(), 10);
        let mut sorted = types.clone();
        sorted.sort();
        assert_eq!(types, sorted);
    }

    #[test]
    fn test_data_source_types() {
        assert_eq!(tester().data_source_types(), vec!["tsuga_team", "tsuga_user"]);
    }

    #[tokio::test]
    async fn test_validate_data_source_config() {
        let tester = tester();
        assert_ok!(
            tester
                .validate_data_source_config("tsuga_team", json!({"name": "payments"}))
                .await
        );

        let err = assert_err!(
            tester
                .validate_data_source_config("tsuga_team", json!({"id": null, "name": null}))
                .await
        );
        let TestError::Diagnostics(diagnostics) = err else {
            panic!("expected diagnostics, got {err}");
        };
        assert_error_at(&diagnostics, "id");

        let err = assert_err!(tester.read_data_source("tsuga_user", json!({"id": "u"})).await);
        assert!(matches!(err, ProviderError::NotConfigured));
    }

    #[tokio::test]
    async fn test_validate_resource_config() {
        let tester = tester();
        assert_ok!(tester.validate_resource_config("tsuga_team", team()).await);

        let err = assert_err!(
            tester
                .validate_resource_config(
                    "tsuga_team",
                    json!({"name": "payments", "visibility": "hidden"})
                )
                .await
        );
        let TestError::Diagnostics(diagnostics) = err else {
            panic!("expected diagnostics, got {err}");
        };
        assert_error_at(&diagnostics, "visibility");
    }

    #[tokio::test]
    async fn test_plan_create_and_update() {
        let tester = tester();
        let plan = tester.plan_create("tsuga_team", team()).await.unwrap();
        assert_plan_creates(&plan);

        let mut prior = team();
        prior["id"] = json!("team-1");
        let plan = tester
            .plan_update("tsuga_team", prior.clone(), team())
            .await
            .unwrap();
        assert_plan_no_changes(&plan);
        assert_eq!(plan.planned_state["id"], "team-1");

        let mut renamed = team();
        renamed["name"] = json!("billing");
        let plan = tester
            .plan_update("tsuga_team", prior, renamed)
            .await
            .unwrap();
        assert_plan_changes_attribute(&plan, "name");
        assert_plan_does_not_change_attribute(&plan, "id");
        assert_plan_updates_in_place(&plan);
    }

    #[tokio::test]
    async fn test_plan_delete() {
        let mut prior = team();
        prior["id"] = json!("team-1");
        let plan = tester().plan_delete("tsuga_team", prior).await.unwrap();
        assert_plan_has_changes(&plan);
        assert!(plan.planned_state.is_null());
    }

    #[tokio::test]
    async fn test_upgrade_is_identity() {
        let state = json!({"id": "team-1", "name": "payments"});
        let upgraded = tester()
            .upgrade_resource_state("tsuga_team", 0, state.clone())
            .await
            .unwrap();
        assert_eq!(upgraded, state);
    }

    #[tokio::test]
    async fn test_configure_failure_is_provider_error() {
        let err = assert_err!(tester().configure(json!({})).await);
        assert!(matches!(
            err,
            TestError::Provider(ProviderError::Configuration(_))
        ));
    }

    #[test]
    fn test_assert_no_errors() {
        let diagnostics = vec![Diagnostic::warning("Just a warning")];
        assert_no_errors(&diagnostics);
    }

    #[test]
    #[should_panic(expected = "Expected no errors")]
    fn test_assert_no_errors_fails() {
        let diagnostics = vec![Diagnostic::error("An error")];
        assert_no_errors(&diagnostics);
    }

    #[test]
    fn test_assert_error_contains_checks_detail() {
        let diagnostics = vec![Diagnostic::error("Invalid configuration")
            .with_detail("exactly one of slack, email must be set")];
        assert_error_contains(&diagnostics, "Invalid");
        assert_error_contains(&diagnostics, "exactly one of");
        assert_has_errors(&diagnostics);
    }

    #[test]
    fn test_test_error_display() {
        let err = TestError::Diagnostics(vec![
            Diagnostic::error("First error").with_attribute("field1"),
            Diagnostic::error("Second error").with_detail("More info"),
        ]);

        let display = format!("{}", err);
        assert!(display.contains("First error"));
        assert!(display.contains("Second error"));
        assert!(display.contains("field1"));
        assert!(display.contains("More info"));
        assert!(TestError::Gone("tsuga_team".into()).to_string().contains("tsuga_team"));
    }
}
