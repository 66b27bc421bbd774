//! `tsuga_user` data source.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::DataSource;
use crate::client::TsugaClient;
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};

const PATH: &str = "/v1/users";

/// Finds a user by id.
pub struct UserLookup;

#[derive(Debug, Deserialize)]
struct UserQuery {
    id: String,
}

/// User as returned by the API and stored in state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserModel {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[async_trait::async_trait]
impl DataSource for UserLookup {
    fn type_name(&self) -> &'static str {
        "tsuga_user"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Look up a Tsuga user by id")
            .with_attribute("id", Attribute::required_string().with_description("User id"))
            .with_attribute("email", Attribute::computed_string())
            .with_attribute("name", Attribute::computed_string())
            .with_attribute("role", Attribute::computed_string())
    }

    fn check(&self, config: &Value) -> Result<(), ProviderError> {
        let query: UserQuery = serde_json::from_value(config.clone())?;
        if query.id.is_empty() {
            return Err(ProviderError::invalid("id", "must not be empty"));
        }
        Ok(())
    }

    async fn read(&self, client: &TsugaClient, config: Value) -> Result<Value, ProviderError> {
        self.check(&config)?;
        let query: UserQuery = serde_json::from_value(config)?;
        let user: UserModel = client
            .get(PATH, &query.id)
            .await?
            .ok_or_else(|| {
                ProviderError::NotFound(format!("no user was found with id {:?}", query.id))
            })?;
        Ok(serde_json::to_value(user)?)
    }
}
