//! `tsuga_tag_policy`.

use serde::{Deserialize, Serialize};

use super::common::{check_allowed, check_length, check_max_items, check_range, non_blank};
use super::Resource;
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeType, Diagnostic, Schema};
use crate::validation::{index_path, one_of};

const TELEMETRY_ASSETS: &[&str] = &["logs", "metrics", "traces"];
const TSUGA_ASSETS: &[&str] = &[
    "ingestion-api-key",
    "operation-api-key",
    "dashboard",
    "log-route",
    "monitor",
    "notification-rule",
    "notification-silence",
];
const SCOPE_MODES: &[&str] = &["include", "exclude"];

/// Rules for a tag key on telemetry or Tsuga assets.
pub struct TagPolicy;

/// Tag policy configuration and state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TagPolicyModel {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub is_active: bool,
    pub tag_key: String,
    #[serde(default, deserialize_with = "super::common::null_as_default")]
    pub allowed_tag_values: Vec<String>,
    pub is_required: bool,
    pub owner: String,
    #[serde(default)]
    pub team_scope: Option<TeamScope>,
    pub configuration: TagPolicyConfigurationModel,
}

/// Which teams the policy applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamScope {
    pub team_ids: Vec<String>,
    /// `include` or `exclude`.
    pub mode: String,
}

/// `configuration`: exactly one of `telemetry` or `tsuga_asset`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TagPolicyConfigurationModel {
    #[serde(default)]
    pub telemetry: Option<TelemetryModel>,
    #[serde(default)]
    pub tsuga_asset: Option<TsugaAssetModel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryModel {
    pub asset_types: Vec<String>,
    pub should_insert_warning: bool,
    /// Percentage of violating samples to drop.
    #[serde(default)]
    pub drop_sample: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TsugaAssetModel {
    pub asset_types: Vec<String>,
}

/// Request body and API entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagPolicyBody {
    #[serde(default, skip_serializing)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_active: bool,
    pub tag_key: String,
    #[serde(default)]
    pub allowed_tag_values: Vec<String>,
    pub is_required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_scope: Option<WireTeamScope>,
    pub configuration: WireConfiguration,
    #[serde(default)]
    pub owner: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTeamScope {
    pub team_ids: Vec<String>,
    pub mode: String,
}

/// Configuration on the wire, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum WireConfiguration {
    Telemetry {
        asset_types: Vec<String>,
        #[serde(default)]
        should_insert_warning: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        drop_sample: Option<f64>,
    },
    TsugaAsset {
        asset_types: Vec<String>,
    },
}

fn check_asset_types(path: &str, types: &[String], allowed: &[&str]) -> Result<(), ProviderError> {
    if types.is_empty() {
        return Err(ProviderError::invalid(path, "at least one asset type is required"));
    }
    types
        .iter()
        .enumerate()
        .try_for_each(|(i, t)| check_allowed(&index_path(path, i), t, allowed))
}

impl TagPolicyConfigurationModel {
    fn expand(&self, path: &str) -> Result<WireConfiguration, ProviderError> {
        let configuration = one_of(
            path,
            [
                (
                    "telemetry",
                    self.telemetry.as_ref().map(|t| WireConfiguration::Telemetry {
                        asset_types: t.asset_types.clone(),
                        should_insert_warning: Some(t.should_insert_warning),
                        drop_sample: t.drop_sample,
                    }),
                ),
                (
                    "tsuga_asset",
                    self.tsuga_asset.as_ref().map(|a| WireConfiguration::TsugaAsset {
                        asset_types: a.asset_types.clone(),
                    }),
                ),
            ],
        )?;
        match &configuration {
            WireConfiguration::Telemetry {
                asset_types,
                drop_sample,
                ..
            } => {
                check_asset_types(
                    &format!("{}.telemetry.asset_types", path),
                    asset_types,
                    TELEMETRY_ASSETS,
                )?;
                if let Some(drop_sample) = drop_sample {
                    check_range(
                        &format!("{}.telemetry.drop_sample", path),
                        *drop_sample,
                        0.0,
                        100.0,
                    )?;
                }
            }
            WireConfiguration::TsugaAsset { asset_types } => check_asset_types(
                &format!("{}.tsuga_asset.asset_types", path),
                asset_types,
                TSUGA_ASSETS,
            )?,
        }
        Ok(configuration)
    }
}

impl From<WireConfiguration> for TagPolicyConfigurationModel {
    fn from(configuration: WireConfiguration) -> Self {
        match configuration {
            WireConfiguration::Telemetry {
                asset_types,
                should_insert_warning,
                drop_sample,
            } => Self {
                telemetry: Some(TelemetryModel {
                    asset_types,
                    should_insert_warning: should_insert_warning.unwrap_or(false),
                    drop_sample,
                }),
                tsuga_asset: None,
            },
            WireConfiguration::TsugaAsset { asset_types } => Self {
                telemetry: None,
                tsuga_asset: Some(TsugaAssetModel { asset_types }),
            },
        }
    }
}

impl Resource for TagPolicy {
    const TYPE_NAME: &'static str = "tsuga_tag_policy";
    const PATH: &'static str = "/v1/tag-policies";

    type Model = TagPolicyModel;
    type Request = TagPolicyBody;
    type Response = TagPolicyBody;

    fn schema() -> Schema {
        let strings = || AttributeType::list(AttributeType::String);
        Schema::v0()
            .with_description("Policy that enforces tag requirements on Tsuga assets or telemetry data")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("description", Attribute::optional_string())
            .with_attribute("is_active", Attribute::required(AttributeType::Bool))
            .with_attribute("tag_key", Attribute::required_string())
            .with_attribute("allowed_tag_values", Attribute::required(strings()))
            .with_attribute(
                "is_required",
                Attribute::required(AttributeType::Bool)
                    .with_description("Whether the tag is required on matching assets"),
            )
            .with_attribute("owner", Attribute::required_string())
            .with_attribute(
                "team_scope",
                Attribute::optional(AttributeType::object_of([
                    ("team_ids", strings()),
                    ("mode", AttributeType::String),
                ])),
            )
            .with_attribute(
                "configuration",
                Attribute::required(AttributeType::object_of([
                    (
                        "telemetry",
                        AttributeType::object_of([
                            ("asset_types", strings()),
                            ("should_insert_warning", AttributeType::Bool),
                            ("drop_sample", AttributeType::Float64),
                        ]),
                    ),
                    (
                        "tsuga_asset",
                        AttributeType::object_of([("asset_types", strings())]),
                    ),
                ])),
            )
    }

    fn expand(model: &TagPolicyModel) -> Result<TagPolicyBody, ProviderError> {
        check_length("owner", &model.owner, 1, 250)?;
        let team_scope = match &model.team_scope {
            Some(scope) => {
                check_allowed("team_scope.mode", &scope.mode, SCOPE_MODES)?;
                if scope.team_ids.is_empty() {
                    return Err(ProviderError::invalid(
                        "team_scope.team_ids",
                        "at least one team id is required",
                    ));
                }
                check_max_items("team_scope.team_ids", scope.team_ids.len(), 100)?;
                Some(WireTeamScope {
                    team_ids: scope.team_ids.clone(),
                    mode: scope.mode.clone(),
                })
            }
            None => None,
        };
        Ok(TagPolicyBody {
            id: None,
            name: model.name.clone(),
            description: model.description.clone(),
            is_active: model.is_active,
            tag_key: model.tag_key.clone(),
            allowed_tag_values: model.allowed_tag_values.clone(),
            is_required: model.is_required,
            team_scope,
            configuration: model.configuration.expand("configuration")?,
            owner: model.owner.clone(),
        })
    }

    fn flatten(
        response: TagPolicyBody,
        _prior: Option<&TagPolicyModel>,
    ) -> Result<(TagPolicyModel, Vec<Diagnostic>), ProviderError> {
        let id = response
            .id
            .ok_or_else(|| ProviderError::Parse("tag policy response has no id".to_string()))?;
        Ok((
            TagPolicyModel {
                id: Some(id),
                name: response.name,
                description: non_blank(response.description),
                is_active: response.is_active,
                tag_key: response.tag_key,
                allowed_tag_values: response.allowed_tag_values,
                is_required: response.is_required,
                owner: response.owner,
                team_scope: response.team_scope.map(|scope| TeamScope {
                    team_ids: scope.team_ids,
                    mode: scope.mode,
                }),
                configuration: response.configuration.into(),
            },
            Vec::new(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(configuration: serde_json::Value) -> serde_json::Value {
        json!({
            "name": "env tag",
            "is_active": true,
            "tag_key": "env",
            "allowed_tag_values": ["prod", "staging"],
            "is_required": true,
            "owner": "team-1",
            "configuration": configuration
        })
    }

    #[test]
    fn test_telemetry_wire_format() {
        let model: TagPolicyModel = serde_json::from_value(config(json!({
            "telemetry": {"asset_types": ["logs"], "should_insert_warning": true, "drop_sample": 25.0}
        })))
        .unwrap();
        let body = serde_json::to_value(TagPolicy::expand(&model).unwrap()).unwrap();
        assert_eq!(
            body["configuration"],
            json!({
                "type": "telemetry",
                "assetTypes": ["logs"],
                "shouldInsertWarning": true,
                "dropSample": 25.0
            })
        );
        assert_eq!(body["tagKey"], "env");
        assert!(body.get("teamScope").is_none());
    }

    #[test]
    fn test_tsuga_asset_wire_format() {
        let model: TagPolicyModel = serde_json::from_value(config(json!({
            "tsuga_asset": {"asset_types": ["dashboard", "log-route"]}
        })))
        .unwrap();
        let body = serde_json::to_value(TagPolicy::expand(&model).unwrap()).unwrap();
        assert_eq!(
            body["configuration"],
            json!({"type": "tsuga_asset", "assetTypes": ["dashboard", "log-route"]})
        );
    }

    #[test]
    fn test_configuration_is_oneof() {
        let both = config(json!({
            "telemetry": {"asset_types": ["logs"], "should_insert_warning": false},
            "tsuga_asset": {"asset_types": ["monitor"]}
        }));
        let diagnostics = TagPolicy::validate(&both);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("configuration"));

        let neither = config(json!({}));
        assert_eq!(TagPolicy::validate(&neither).len(), 1);
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        let diagnostics = TagPolicy::validate(&config(json!({
            "telemetry": {"asset_types": ["logs"], "should_insert_warning": false, "drop_sample": 150.0}
        })));
        assert_eq!(
            diagnostics[0].attribute.as_deref(),
            Some("configuration.telemetry.drop_sample")
        );

        let diagnostics = TagPolicy::validate(&config(json!({
            "tsuga_asset": {"asset_types": ["spreadsheet"]}
        })));
        assert_eq!(
            diagnostics[0].attribute.as_deref(),
            Some("configuration.tsuga_asset.asset_types.0")
        );
    }

    #[test]
    fn test_flatten_configuration() {
        let response: TagPolicyBody = serde_json::from_value(json!({
            "id": "tp-1", "name": "env tag", "isActive": true, "tagKey": "env",
            "allowedTagValues": ["prod"], "isRequired": false, "owner": "team-1",
            "teamScope": {"teamIds": ["team-2"], "mode": "exclude"},
            "configuration": {"type": "telemetry", "assetTypes": ["traces"]}
        }))
        .unwrap();
        let (model, _) = TagPolicy::flatten(response, None).unwrap();
        let telemetry = model.configuration.telemetry.unwrap();
        assert_eq!(telemetry.asset_types, vec!["traces"]);
        assert!(!telemetry.should_insert_warning);
        assert!(model.configuration.tsuga_asset.is_none());
        assert_eq!(model.team_scope.unwrap().mode, "exclude");
    }
}
