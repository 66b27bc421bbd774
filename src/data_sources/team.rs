//! `tsuga_team` data source.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::DataSource;
use crate::client::TsugaClient;
use crate::error::ProviderError;
use crate::resources::common::tags_type;
use crate::resources::team::{Team, TeamResponse};
use crate::resources::Resource;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Schema};

/// Finds a team by id, or by name when the name is unique.
pub struct TeamLookup;

#[derive(Debug, Default, Deserialize)]
struct TeamQuery {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

/// How a team is looked up. The id wins when both are set.
#[derive(Debug, PartialEq)]
enum TeamKey {
    Id(String),
    Name(String),
}

impl TeamKey {
    fn parse(config: &Value) -> Result<Self, ProviderError> {
        let query: TeamQuery = serde_json::from_value(config.clone())?;
        let id = query.id.filter(|id| !id.is_empty());
        let name = query.name.filter(|name| !name.is_empty());
        match (id, name) {
            (Some(id), _) => Ok(Self::Id(id)),
            (None, Some(name)) => Ok(Self::Name(name)),
            (None, None) => Err(ProviderError::invalid(
                "id",
                "one of \"id\" or \"name\" must be set",
            )),
        }
    }
}

fn lookup_key() -> Attribute {
    Attribute::new(
        AttributeType::String,
        AttributeFlags {
            optional: true,
            computed: true,
            ..Default::default()
        },
    )
}

#[async_trait::async_trait]
impl DataSource for TeamLookup {
    fn type_name(&self) -> &'static str {
        Team::TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Look up a Tsuga team by id or name")
            .with_attribute("id", lookup_key().with_description("Team id"))
            .with_attribute(
                "name",
                lookup_key().with_description("Team name. Must match exactly one team"),
            )
            .with_attribute("description", Attribute::computed_string())
            .with_attribute("visibility", Attribute::computed_string())
            .with_attribute("tags", Attribute::new(tags_type(), AttributeFlags::computed()))
    }

    fn check(&self, config: &Value) -> Result<(), ProviderError> {
        TeamKey::parse(config).map(drop)
    }

    async fn read(&self, client: &TsugaClient, config: Value) -> Result<Value, ProviderError> {
        let team = match TeamKey::parse(&config)? {
            TeamKey::Id(id) => client
                .get::<TeamResponse>(Team::PATH, &id)
                .await?
                .ok_or_else(|| {
                    ProviderError::NotFound(format!("no team was found with id {:?}", id))
                })?,
            TeamKey::Name(name) => {
                let teams: Vec<TeamResponse> =
                    client.find(Team::PATH, &[]).await?.unwrap_or_default();
                debug!(candidates = teams.len(), name = %name, "matching team by name");
                pick_by_name(teams, &name)?
            }
        };
        let (model, _) = Team::flatten(team, None)?;
        Ok(serde_json::to_value(model)?)
    }
}

fn pick_by_name(teams: Vec<TeamResponse>, name: &str) -> Result<TeamResponse, ProviderError> {
    let mut matches: Vec<_> = teams.into_iter().filter(|team| team.name == name).collect();
    match matches.len() {
        0 => Err(ProviderError::NotFound(format!("no team was found with name {:?}", name))),
        1 => Ok(matches.remove(0)),
        n => Err(ProviderError::invalid(
            "name",
            format!("found {} teams named {:?}; set \"id\" to pick one", n, name),
        )),
    }
}
