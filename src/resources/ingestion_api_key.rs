//! `tsuga_ingestion_api_key`.
//!
//! The full key is only returned by the create call. Every later read or
//! update keeps the value already in state.

use serde::{Deserialize, Serialize};

use super::common::{check_tags, non_blank, non_empty, tags_attribute, Tag};
use super::Resource;
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Diagnostic, Schema};

/// A key used to send telemetry to Tsuga.
pub struct IngestionApiKey;

/// Key configuration and state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IngestionApiKeyModel {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub owner: String,
    #[serde(default)]
    pub tags: Option<Vec<Tag>>,
    #[serde(default)]
    pub team_override_fields: Option<Vec<String>>,
    #[serde(default)]
    pub key_last_characters: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
}

/// Create/update body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionApiKeyRequest {
    pub name: String,
    pub owner: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Tag>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_override_fields: Option<Vec<String>>,
}

/// Key as returned by the API. `key` is only present on create.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionApiKeyResponse {
    pub id: String,
    pub name: String,
    pub owner: String,
    #[serde(default)]
    pub key_last_characters: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<Tag>>,
    #[serde(default)]
    pub team_override_fields: Option<Vec<String>>,
}

impl Resource for IngestionApiKey {
    const TYPE_NAME: &'static str = "tsuga_ingestion_api_key";
    const PATH: &'static str = "/v1/ingestion-api-keys";

    type Model = IngestionApiKeyModel;
    type Request = IngestionApiKeyRequest;
    type Response = IngestionApiKeyResponse;

    fn schema() -> Schema {
        Schema::v0()
            .with_description("An ingestion API key used to send telemetry data to Tsuga")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("owner", Attribute::required_string())
            .with_attribute("tags", tags_attribute())
            .with_attribute(
                "team_override_fields",
                Attribute::optional(AttributeType::list(AttributeType::String)),
            )
            .with_attribute(
                "key_last_characters",
                Attribute::computed_string().with_description("Last characters of the key"),
            )
            .with_attribute(
                "key",
                Attribute::new(AttributeType::String, AttributeFlags::computed().sensitive())
                    .with_description(
                        "The full key. Only available at creation time; not retrievable afterwards",
                    ),
            )
    }

    fn expand(model: &IngestionApiKeyModel) -> Result<IngestionApiKeyRequest, ProviderError> {
        check_tags("tags", model.tags.as_ref())?;
        Ok(IngestionApiKeyRequest {
            name: model.name.clone(),
            owner: model.owner.clone(),
            tags: model.tags.clone(),
            team_override_fields: model.team_override_fields.clone(),
        })
    }

    fn flatten(
        response: IngestionApiKeyResponse,
        prior: Option<&IngestionApiKeyModel>,
    ) -> Result<(IngestionApiKeyModel, Vec<Diagnostic>), ProviderError> {
        let key = non_blank(response.key).or_else(|| prior.and_then(|p| p.key.clone()));
        Ok((
            IngestionApiKeyModel {
                id: Some(response.id),
                name: response.name,
                owner: response.owner,
                tags: non_empty(response.tags),
                team_override_fields: non_empty(response.team_override_fields),
                key_last_characters: non_blank(response.key_last_characters),
                key,
            },
            Vec::new(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(key: Option<&str>) -> IngestionApiKeyResponse {
        serde_json::from_value(json!({
            "id": "key-1",
            "name": "ingest",
            "owner": "team-1",
            "keyLastCharacters": "a1b2",
            "key": key,
            "tags": [],
            "teamOverrideFields": ["service"]
        }))
        .unwrap()
    }

    #[test]
    fn test_create_stores_key() {
        let (model, _) = IngestionApiKey::flatten(response(Some("tsg_secret")), None).unwrap();
        assert_eq!(model.key.as_deref(), Some("tsg_secret"));
        assert_eq!(model.key_last_characters.as_deref(), Some("a1b2"));
        assert_eq!(model.team_override_fields, Some(vec!["service".to_string()]));
        assert!(model.tags.is_none());
    }

    #[test]
    fn test_read_keeps_prior_key() {
        let prior = IngestionApiKeyModel {
            key: Some("tsg_secret".into()),
            ..Default::default()
        };
        for key in [None, Some("")] {
            let (model, _) = IngestionApiKey::flatten(response(key), Some(&prior)).unwrap();
            assert_eq!(model.key.as_deref(), Some("tsg_secret"));
        }
    }

    #[test]
    fn test_key_is_sensitive_and_computed() {
        let schema = IngestionApiKey::schema();
        let key = schema.attribute("key").unwrap();
        assert!(key.flags.sensitive);
        assert!(key.flags.computed);
        assert!(!key.flags.optional);
    }

    #[test]
    fn test_plan_carries_key_into_update() {
        let descriptor = super::super::ResourceDescriptor::of::<IngestionApiKey>();
        let prior = json!({
            "id": "key-1", "name": "ingest", "owner": "team-1", "tags": null,
            "team_override_fields": null, "key_last_characters": "a1b2", "key": "tsg_secret"
        });
        let plan = descriptor.plan(
            Some(&prior),
            Some(json!({"name": "renamed", "owner": "team-1", "key": null})),
        );
        assert_eq!(plan.planned_state["key"], "tsg_secret");
        assert_eq!(plan.planned_state["id"], "key-1");
        let paths: Vec<_> = plan.changes.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["name"]);
    }
}
