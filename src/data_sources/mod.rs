//! Read-only data sources.
//!
//! A data source looks up an existing object and returns it as state. It has
//! no plan or lifecycle, just a schema, a configuration check and a read.

use serde_json::Value;

use crate::client::TsugaClient;
use crate::error::ProviderError;
use crate::schema::{has_errors, Diagnostic, Schema};

pub mod team;
pub mod user;

/// A lookup served through `ReadDataSource`.
#[async_trait::async_trait]
pub trait DataSource: Send + Sync {
    /// Data source type name, e.g. `tsuga_team`.
    fn type_name(&self) -> &'static str;

    /// Data source schema.
    fn schema(&self) -> Schema;

    /// Checks the schema cannot express.
    fn check(&self, _config: &Value) -> Result<(), ProviderError> {
        Ok(())
    }

    /// Validate configuration: schema first, then [`DataSource::check`].
    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let mut diagnostics = crate::validation::validate(&self.schema(), config);
        if has_errors(&diagnostics) {
            return diagnostics;
        }
        if let Err(err) = self.check(config) {
            diagnostics.push(err.to_diagnostic());
        }
        diagnostics
    }

    /// Look the object up and return the full state.
    async fn read(&self, client: &TsugaClient, config: Value) -> Result<Value, ProviderError>;
}

/// Every data source the provider serves.
pub fn all() -> Vec<Box<dyn DataSource>> {
    vec![Box::new(team::TeamLookup), Box::new(user::UserLookup)]
}
