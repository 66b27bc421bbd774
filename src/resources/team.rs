//! `tsuga_team`.

use serde::{Deserialize, Serialize};

use super::common::{check_allowed, check_tags, non_blank, non_empty, tags_attribute, Tag};
use super::Resource;
use crate::error::ProviderError;
use crate::schema::{Attribute, Diagnostic, Schema};

const VISIBILITIES: &[&str] = &["public", "private"];

/// A team owns dashboards, monitors and routes.
pub struct Team;

/// Team configuration and state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TeamModel {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// `public` or `private`.
    pub visibility: String,
    #[serde(default)]
    pub tags: Option<Vec<Tag>>,
}

/// Create/update body.
#[derive(Debug, Clone, Serialize)]
pub struct TeamRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub visibility: String,
    pub tags: Vec<Tag>,
}

/// Team as returned by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct TeamResponse {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub visibility: String,
    #[serde(default)]
    pub tags: Option<Vec<Tag>>,
}

impl Resource for Team {
    const TYPE_NAME: &'static str = "tsuga_team";
    const PATH: &'static str = "/v1/teams";

    type Model = TeamModel;
    type Request = TeamRequest;
    type Response = TeamResponse;

    fn schema() -> Schema {
        Schema::v0()
            .with_description("A Tsuga team")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("description", Attribute::optional_string())
            .with_attribute(
                "visibility",
                Attribute::required_string().with_description("`public` or `private`"),
            )
            .with_attribute("tags", tags_attribute())
    }

    fn expand(model: &TeamModel) -> Result<TeamRequest, ProviderError> {
        check_allowed("visibility", &model.visibility, VISIBILITIES)?;
        check_tags("tags", model.tags.as_ref())?;
        Ok(TeamRequest {
            name: model.name.clone(),
            description: model.description.clone(),
            visibility: model.visibility.clone(),
            tags: model.tags.clone().unwrap_or_default(),
        })
    }

    fn flatten(
        response: TeamResponse,
        _prior: Option<&TeamModel>,
    ) -> Result<(TeamModel, Vec<Diagnostic>), ProviderError> {
        Ok((
            TeamModel {
                id: Some(response.id),
                name: response.name,
                description: non_blank(response.description),
                visibility: response.visibility,
                tags: non_empty(response.tags),
            },
            Vec::new(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_expand_body() {
        let model: TeamModel = serde_json::from_value(json!({
            "name": "platform",
            "visibility": "private",
            "tags": [{"key": "env", "value": "prod"}]
        }))
        .unwrap();
        let body = serde_json::to_value(Team::expand(&model).unwrap()).unwrap();
        assert_eq!(
            body,
            json!({
                "name": "platform",
                "visibility": "private",
                "tags": [{"key": "env", "value": "prod"}]
            })
        );
    }

    #[test]
    fn test_rejects_unknown_visibility() {
        let diagnostics = Team::validate(&json!({"name": "platform", "visibility": "secret"}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("visibility"));
    }

    #[test]
    fn test_flatten_normalizes_empty_values() {
        let response: TeamResponse = serde_json::from_value(json!({
            "id": "team-1", "name": "platform", "description": "", "visibility": "public", "tags": []
        }))
        .unwrap();
        let (model, diagnostics) = Team::flatten(response, None).unwrap();
        assert!(diagnostics.is_empty());
        assert_eq!(model.id.as_deref(), Some("team-1"));
        assert!(model.description.is_none());
        assert!(model.tags.is_none());
        assert_eq!(
            serde_json::to_value(&model).unwrap(),
            json!({
                "id": "team-1", "name": "platform", "description": null,
                "visibility": "public", "tags": null
            })
        );
    }
}
