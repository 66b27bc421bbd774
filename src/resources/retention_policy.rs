//! `tsuga_retention_policy`.

use serde::{Deserialize, Serialize};

use super::common::{check_allowed, non_blank};
use super::Resource;
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeType, Diagnostic, Schema};

const DATA_SOURCES: &[&str] = &["logs", "metrics", "traces"];

/// How long telemetry of one kind is kept.
pub struct RetentionPolicy;

/// Retention policy configuration and state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RetentionPolicyModel {
    #[serde(default)]
    pub id: Option<String>,
    pub data_source: String,
    /// For example `30-days`.
    pub duration_days: String,
    pub is_enabled: bool,
    #[serde(default)]
    pub env: Option<String>,
    #[serde(default)]
    pub team_id: Option<String>,
}

/// Request body and API entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionPolicyBody {
    #[serde(default, skip_serializing)]
    pub id: Option<String>,
    pub data_source: String,
    pub duration_days: String,
    pub is_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
}

/// `<n>-days` with a positive `n`.
fn check_duration(value: &str) -> Result<(), ProviderError> {
    let days = value
        .strip_suffix("-days")
        .and_then(|n| n.parse::<u32>().ok())
        .filter(|n| *n > 0);
    match days {
        Some(_) => Ok(()),
        None => Err(ProviderError::invalid(
            "duration_days",
            format!("expected a duration like \"30-days\", got {:?}", value),
        )),
    }
}

impl Resource for RetentionPolicy {
    const TYPE_NAME: &'static str = "tsuga_retention_policy";
    const PATH: &'static str = "/v1/retention-policies";

    type Model = RetentionPolicyModel;
    type Request = RetentionPolicyBody;
    type Response = RetentionPolicyBody;

    fn schema() -> Schema {
        Schema::v0()
            .with_description("Retention period for logs, metrics or traces")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute(
                "data_source",
                Attribute::required_string().with_description("`logs`, `metrics` or `traces`"),
            )
            .with_attribute(
                "duration_days",
                Attribute::required_string().with_description("Retention period, e.g. `30-days`"),
            )
            .with_attribute("is_enabled", Attribute::required(AttributeType::Bool))
            .with_attribute("env", Attribute::optional_string())
            .with_attribute("team_id", Attribute::optional_string())
    }

    fn expand(model: &RetentionPolicyModel) -> Result<RetentionPolicyBody, ProviderError> {
        check_allowed("data_source", &model.data_source, DATA_SOURCES)?;
        check_duration(&model.duration_days)?;
        Ok(RetentionPolicyBody {
            id: None,
            data_source: model.data_source.clone(),
            duration_days: model.duration_days.clone(),
            is_enabled: model.is_enabled,
            env: non_blank(model.env.clone()),
            team_id: non_blank(model.team_id.clone()),
        })
    }

    fn flatten(
        response: RetentionPolicyBody,
        _prior: Option<&RetentionPolicyModel>,
    ) -> Result<(RetentionPolicyModel, Vec<Diagnostic>), ProviderError> {
        let id = response
            .id
            .ok_or_else(|| ProviderError::Parse("retention policy response has no id".to_string()))?;
        Ok((
            RetentionPolicyModel {
                id: Some(id),
                data_source: response.data_source,
                duration_days: response.duration_days,
                is_enabled: response.is_enabled,
                env: non_blank(response.env),
                team_id: non_blank(response.team_id),
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
    fn test_expand_omits_unset_scope() {
        let model: RetentionPolicyModel = serde_json::from_value(json!({
            "data_source": "logs", "duration_days": "30-days", "is_enabled": true, "env": ""
        }))
        .unwrap();
        let body = serde_json::to_value(RetentionPolicy::expand(&model).unwrap()).unwrap();
        assert_eq!(
            body,
            json!({"dataSource": "logs", "durationDays": "30-days", "isEnabled": true})
        );
    }

    #[test]
    fn test_duration_format() {
        assert!(check_duration("60-days").is_ok());
        for bad in ["60", "0-days", "-days", "sixty-days", "60-day"] {
            assert!(check_duration(bad).is_err(), "{bad} was accepted");
        }
    }

    #[test]
    fn test_rejects_unknown_data_source() {
        let diagnostics = RetentionPolicy::validate(&json!({
            "data_source": "events", "duration_days": "30-days", "is_enabled": true
        }));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("data_source"));
    }
}
