//! `tsuga_team_membership`.
//!
//! Memberships are addressed by `(userId, teamId)` rather than by id: reads
//! filter the collection with a query string, and updates and deletes send
//! the pair in the body of a request to the collection itself.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use super::common::{check_allowed, null_as_default};
use super::{log_diagnostics, Resource, ResourceOps};
use crate::client::TsugaClient;
use crate::error::ProviderError;
use crate::schema::{Attribute, Diagnostic, Schema};
use crate::types::ReadResult;

const ROLES: &[&str] = &["admin", "editor", "viewer"];

/// A user's role in a team.
pub struct TeamMembership;

/// Membership configuration and state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TeamMembershipModel {
    #[serde(default)]
    pub id: Option<String>,
    pub user_id: String,
    pub team_id: String,
    /// `admin`, `editor` or `viewer`. Empty right after an import.
    #[serde(default, deserialize_with = "null_as_default")]
    pub role_key: String,
}

/// Body of create and update calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipBody {
    pub user_id: String,
    pub team_id: String,
    pub role_key: String,
}

/// Membership as returned by the API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipResponse {
    pub id: String,
    pub user_id: String,
    pub team_id: String,
    pub role_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MembershipKey<'a> {
    user_id: &'a str,
    team_id: &'a str,
}

impl Resource for TeamMembership {
    const TYPE_NAME: &'static str = "tsuga_team_membership";
    const PATH: &'static str = "/v1/team-memberships";

    type Model = TeamMembershipModel;
    type Request = MembershipBody;
    type Response = MembershipResponse;

    fn schema() -> Schema {
        Schema::v0()
            .with_description("Membership of a user in a team")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("user_id", Attribute::required_string().with_force_new())
            .with_attribute("team_id", Attribute::required_string().with_force_new())
            .with_attribute(
                "role_key",
                Attribute::required_string().with_description("`admin`, `editor` or `viewer`"),
            )
    }

    fn expand(model: &TeamMembershipModel) -> Result<MembershipBody, ProviderError> {
        check_allowed("role_key", &model.role_key, ROLES)?;
        Ok(MembershipBody {
            user_id: model.user_id.clone(),
            team_id: model.team_id.clone(),
            role_key: model.role_key.clone(),
        })
    }

    fn flatten(
        response: MembershipResponse,
        _prior: Option<&TeamMembershipModel>,
    ) -> Result<(TeamMembershipModel, Vec<Diagnostic>), ProviderError> {
        Ok((
            TeamMembershipModel {
                id: Some(response.id),
                user_id: response.user_id,
                team_id: response.team_id,
                role_key: response.role_key,
            },
            Vec::new(),
        ))
    }

    /// Import ids are `userId:teamId`.
    fn import_state(id: &str) -> Result<Value, ProviderError> {
        match id.split_once(':') {
            Some((user_id, team_id))
                if !user_id.is_empty() && !team_id.is_empty() && !team_id.contains(':') =>
            {
                Ok(json!({
                    "id": null,
                    "user_id": user_id,
                    "team_id": team_id,
                    "role_key": null,
                }))
            }
            _ => Err(ProviderError::InvalidRequest(format!(
                "invalid import id {:?}: expected \"userId:teamId\"",
                id
            ))),
        }
    }
}

/// Build the membership CRUD handler.
pub(crate) fn build_ops(client: Arc<TsugaClient>) -> Box<dyn ResourceOps> {
    Box::new(MembershipOps { client })
}

struct MembershipOps {
    client: Arc<TsugaClient>,
}

fn decode(state: Value) -> Result<TeamMembershipModel, ProviderError> {
    Ok(serde_json::from_value(state)?)
}

fn to_state(response: MembershipResponse) -> Result<Value, ProviderError> {
    let (model, diagnostics) = TeamMembership::flatten(response, None)?;
    log_diagnostics(TeamMembership::TYPE_NAME, &diagnostics);
    Ok(serde_json::to_value(model)?)
}

#[async_trait::async_trait]
impl ResourceOps for MembershipOps {
    async fn create(&self, planned: Value) -> Result<Value, ProviderError> {
        let model = decode(planned)?;
        let body = TeamMembership::expand(&model)?;
        info!(user_id = %body.user_id, team_id = %body.team_id, "creating team membership");
        let response: MembershipResponse =
            self.client.create(TeamMembership::PATH, &body).await?;
        to_state(response)
    }

    async fn read(&self, current: Value) -> Result<ReadResult, ProviderError> {
        let model = decode(current)?;
        debug!(user_id = %model.user_id, team_id = %model.team_id, "reading team membership");
        let found: Option<Vec<MembershipResponse>> = self
            .client
            .find(
                TeamMembership::PATH,
                &[
                    ("userId", model.user_id.as_str()),
                    ("teamId", model.team_id.as_str()),
                ],
            )
            .await?;
        match found.and_then(|list| list.into_iter().next()) {
            Some(membership) => Ok(ReadResult::found(to_state(membership)?, Vec::new())),
            None => {
                info!(user_id = %model.user_id, team_id = %model.team_id, "team membership is gone, removing from state");
                Ok(ReadResult::gone())
            }
        }
    }

    async fn update(&self, prior: Value, planned: Value) -> Result<Value, ProviderError> {
        let prior = decode(prior)?;
        let planned = decode(planned)?;
        // The pair is force-new, so only the role can change here.
        let body = TeamMembership::expand(&TeamMembershipModel {
            user_id: prior.user_id.clone(),
            team_id: prior.team_id.clone(),
            ..planned
        })?;
        info!(user_id = %body.user_id, team_id = %body.team_id, role = %body.role_key, "updating team membership");
        let response: MembershipResponse = self.client.put(TeamMembership::PATH, &body).await?;
        to_state(response)
    }

    async fn delete(&self, current: Value) -> Result<(), ProviderError> {
        let model = decode(current)?;
        info!(user_id = %model.user_id, team_id = %model.team_id, "deleting team membership");
        let key = MembershipKey {
            user_id: &model.user_id,
            team_id: &model.team_id,
        };
        if !self.client.delete_matching(TeamMembership::PATH, &key).await? {
            info!("team membership was already deleted");
        }
        Ok(())
    }
}
