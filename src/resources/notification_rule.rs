//! `tsuga_notification_rule`: where alerts are sent.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::common::{
    check_length, check_range, check_tags, non_empty, null_as_default, tags_attribute, Tag,
};
use super::notification_silence::check_alert_filters;
use super::{carry_top_level_computed, Resource};
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeType, Diagnostic, Schema};
use crate::validation::{index_path, join_path, one_of};

const RENOTIFY_MODES: &[&str] = &["each"];
const RENOTIFY_STATES: &[&str] = &["alert", "alert_no_data"];

/// Config blocks that carry a computed `integration_name`.
const INTEGRATION_KINDS: &[&str] = &[
    "slack",
    "incident_io",
    "pagerduty",
    "grafana_irm",
    "microsoft_teams",
    "webhook",
];

/// An alert notification rule.
pub struct NotificationRule;

/// Notification rule configuration and state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NotificationRuleModel {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub owner: String,
    pub is_active: bool,
    /// Team ids whose alerts match.
    #[serde(default, deserialize_with = "null_as_default")]
    pub teams_filter: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub priorities_filter: Vec<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub transition_types_filter: Vec<String>,
    #[serde(default)]
    pub tags: Option<Vec<Tag>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub targets: Vec<TargetModel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TargetModel {
    pub id: String,
    pub config: TargetConfigModel,
    #[serde(default)]
    pub rate_limit: Option<RateLimitModel>,
    #[serde(default)]
    pub renotify_config: Option<RenotifyModel>,
}

/// `config`: exactly one destination.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TargetConfigModel {
    #[serde(default)]
    pub slack: Option<SlackModel>,
    #[serde(default)]
    pub incident_io: Option<IntegrationModel>,
    #[serde(default)]
    pub pagerduty: Option<IntegrationModel>,
    #[serde(default)]
    pub grafana_irm: Option<IntegrationModel>,
    #[serde(default)]
    pub microsoft_teams: Option<IntegrationModel>,
    #[serde(default)]
    pub webhook: Option<IntegrationModel>,
    #[serde(default)]
    pub email: Option<EmailModel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SlackModel {
    pub channel: String,
    pub integration_id: String,
    #[serde(default)]
    pub hide_time: Option<bool>,
    #[serde(default)]
    pub hide_transition: Option<bool>,
    /// Computed from the response.
    #[serde(default)]
    pub integration_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IntegrationModel {
    pub integration_id: String,
    /// Computed from the response.
    #[serde(default)]
    pub integration_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EmailModel {
    #[serde(default, deserialize_with = "null_as_default")]
    pub addresses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitModel {
    pub max_messages: i64,
    pub minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenotifyModel {
    /// Only `each` is supported.
    pub mode: String,
    pub renotification_states: Vec<String>,
    pub renotify_interval_minutes: i64,
}

/// Slack destination on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireSlack {
    pub channel: String,
    pub integration_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hide_time: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hide_transition: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireIntegration {
    pub integration_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_name: Option<String>,
}

/// Target config on the wire: `{"type": "slack", "channel": .., ..}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WireTargetConfig {
    Slack(WireSlack),
    IncidentIo(WireIntegration),
    Pagerduty(WireIntegration),
    GrafanaIrm(WireIntegration),
    MicrosoftTeams(WireIntegration),
    Webhook(WireIntegration),
    Email {
        #[serde(default)]
        addresses: Vec<String>,
    },
}

/// Wire `type`s of [`WireTargetConfig`].
const KNOWN_TARGET_TYPES: &[&str] = &[
    "slack",
    "incident-io",
    "pagerduty",
    "grafana-irm",
    "microsoft-teams",
    "webhook",
    "email",
];

/// A target config as read back. Destinations added to the API after this
/// provider version land in [`WireTargetSlot::Unrecognized`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireTargetSlot {
    /// A destination this provider manages.
    Known(WireTargetConfig),
    /// Any other destination; only its type is kept.
    Unrecognized {
        /// The wire `type`.
        #[serde(rename = "type")]
        kind: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireRateLimit {
    pub max_messages: i64,
    pub minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireRenotify {
    pub mode: String,
    pub renotification_states: Vec<String>,
    pub renotify_interval_minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTarget {
    pub id: String,
    pub config: WireTargetSlot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<WireRateLimit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renotify_config: Option<WireRenotify>,
}

/// Request body and API entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRuleBody {
    #[serde(default, skip_serializing)]
    pub id: Option<String>,
    pub name: String,
    pub owner: String,
    pub is_active: bool,
    #[serde(default)]
    pub teams_filter: Vec<String>,
    #[serde(default)]
    pub priorities_filter: Vec<i64>,
    #[serde(default)]
    pub transition_types_filter: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Tag>>,
    #[serde(default)]
    pub targets: Vec<WireTarget>,
}

fn wire_integration(model: &IntegrationModel) -> WireIntegration {
    WireIntegration {
        integration_id: model.integration_id.clone(),
        integration_name: model.integration_name.clone(),
    }
}

impl TargetConfigModel {
    fn expand(&self, path: &str) -> Result<WireTargetConfig, ProviderError> {
        let integration = |m: &Option<IntegrationModel>| m.as_ref().map(wire_integration);
        let config = one_of(
            path,
            [
                (
                    "slack",
                    self.slack.as_ref().map(|s| {
                        WireTargetConfig::Slack(WireSlack {
                            channel: s.channel.clone(),
                            integration_id: s.integration_id.clone(),
                            integration_name: s.integration_name.clone(),
                            hide_time: s.hide_time,
                            hide_transition: s.hide_transition,
                        })
                    }),
                ),
                (
                    "incident_io",
                    integration(&self.incident_io).map(WireTargetConfig::IncidentIo),
                ),
                (
                    "pagerduty",
                    integration(&self.pagerduty).map(WireTargetConfig::Pagerduty),
                ),
                (
                    "grafana_irm",
                    integration(&self.grafana_irm).map(WireTargetConfig::GrafanaIrm),
                ),
                (
                    "microsoft_teams",
                    integration(&self.microsoft_teams).map(WireTargetConfig::MicrosoftTeams),
                ),
                (
                    "webhook",
                    integration(&self.webhook).map(WireTargetConfig::Webhook),
                ),
                (
                    "email",
                    self.email.as_ref().map(|e| WireTargetConfig::Email {
                        addresses: e.addresses.clone(),
                    }),
                ),
            ],
        )?;
        match &config {
            WireTargetConfig::Slack(slack) if slack.channel.is_empty() => Err(
                ProviderError::invalid(join_path(path, "slack.channel"), "must not be empty"),
            ),
            WireTargetConfig::Email { addresses } if addresses.is_empty() => {
                Err(ProviderError::invalid(
                    join_path(path, "email.addresses"),
                    "at least one address is required",
                ))
            }
            _ => Ok(config),
        }
    }

    /// Rebuild from the wire. Values the API does not echo come from
    /// `prior` when it configured the same destination.
    fn flatten(config: WireTargetConfig, prior: Option<&TargetConfigModel>) -> Self {
        let integration = |wire: WireIntegration, prior: Option<&IntegrationModel>| {
            IntegrationModel {
                integration_id: wire.integration_id,
                integration_name: wire
                    .integration_name
                    .filter(|n| !n.is_empty())
                    .or_else(|| prior.and_then(|p| p.integration_name.clone())),
            }
        };
        let mut model = Self::default();
        match config {
            WireTargetConfig::Slack(wire) => {
                let prior = prior.and_then(|p| p.slack.as_ref());
                model.slack = Some(SlackModel {
                    channel: wire.channel,
                    integration_id: wire.integration_id,
                    hide_time: wire.hide_time.or_else(|| prior.and_then(|p| p.hide_time)),
                    hide_transition: wire
                        .hide_transition
                        .or_else(|| prior.and_then(|p| p.hide_transition)),
                    integration_name: wire
                        .integration_name
                        .filter(|n| !n.is_empty())
                        .or_else(|| prior.and_then(|p| p.integration_name.clone())),
                });
            }
            WireTargetConfig::IncidentIo(wire) => {
                model.incident_io =
                    Some(integration(wire, prior.and_then(|p| p.incident_io.as_ref())));
            }
            WireTargetConfig::Pagerduty(wire) => {
                model.pagerduty = Some(integration(wire, prior.and_then(|p| p.pagerduty.as_ref())));
            }
            WireTargetConfig::GrafanaIrm(wire) => {
                model.grafana_irm =
                    Some(integration(wire, prior.and_then(|p| p.grafana_irm.as_ref())));
            }
            WireTargetConfig::MicrosoftTeams(wire) => {
                model.microsoft_teams =
                    Some(integration(wire, prior.and_then(|p| p.microsoft_teams.as_ref())));
            }
            WireTargetConfig::Webhook(wire) => {
                model.webhook = Some(integration(wire, prior.and_then(|p| p.webhook.as_ref())));
            }
            WireTargetConfig::Email { addresses } => {
                model.email = Some(EmailModel { addresses });
            }
        }
        model
    }
}

impl TargetModel {
    fn expand(&self, path: &str) -> Result<WireTarget, ProviderError> {
        if self.id.is_empty() {
            return Err(ProviderError::invalid(join_path(path, "id"), "must not be empty"));
        }
        let config = self.config.expand(&join_path(path, "config"))?;
        let rate_limit = match &self.rate_limit {
            Some(limit) => {
                let limit_path = join_path(path, "rate_limit");
                check_range(
                    &join_path(&limit_path, "max_messages"),
                    limit.max_messages,
                    1,
                    i64::MAX,
                )?;
                check_range(&join_path(&limit_path, "minutes"), limit.minutes, 1, i64::MAX)?;
                Some(WireRateLimit {
                    max_messages: limit.max_messages,
                    minutes: limit.minutes,
                })
            }
            None => None,
        };
        let renotify_config = match &self.renotify_config {
            Some(renotify) => {
                let renotify_path = join_path(path, "renotify_config");
                super::common::check_allowed(
                    &join_path(&renotify_path, "mode"),
                    &renotify.mode,
                    RENOTIFY_MODES,
                )?;
                let states_path = join_path(&renotify_path, "renotification_states");
                if renotify.renotification_states.is_empty() {
                    return Err(ProviderError::invalid(
                        states_path,
                        "at least one state is required",
                    ));
                }
                for (i, state) in renotify.renotification_states.iter().enumerate() {
                    super::common::check_allowed(&index_path(&states_path, i), state, RENOTIFY_STATES)?;
                }
                check_range(
                    &join_path(&renotify_path, "renotify_interval_minutes"),
                    renotify.renotify_interval_minutes,
                    1,
                    i64::MAX,
                )?;
                Some(WireRenotify {
                    mode: renotify.mode.clone(),
                    renotification_states: renotify.renotification_states.clone(),
                    renotify_interval_minutes: renotify.renotify_interval_minutes,
                })
            }
            None => None,
        };
        Ok(WireTarget {
            id: self.id.clone(),
            config: WireTargetSlot::Known(config),
            rate_limit,
            renotify_config,
        })
    }

    fn flatten(
        wire: WireTarget,
        prior: Option<&TargetModel>,
        path: &str,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<Self, ProviderError> {
        let config = match wire.config {
            WireTargetSlot::Known(config) => {
                TargetConfigModel::flatten(config, prior.map(|p| &p.config))
            }
            WireTargetSlot::Unrecognized { kind } => {
                let path = join_path(path, "config");
                if KNOWN_TARGET_TYPES.contains(&kind.as_str()) {
                    return Err(ProviderError::Parse(format!(
                        "malformed {} target config at {}",
                        kind, path
                    )));
                }
                tracing::warn!(path = %path, kind = %kind, "unsupported notification target");
                diagnostics.push(
                    Diagnostic::warning("Unsupported notification target")
                        .with_detail(format!(
                            "target type {:?} is kept on the server but cannot be managed by \
                             this provider version",
                            kind
                        ))
                        .with_attribute(path),
                );
                TargetConfigModel::default()
            }
        };
        Ok(Self {
            id: wire.id,
            config,
            rate_limit: wire.rate_limit.map(|l| RateLimitModel {
                max_messages: l.max_messages,
                minutes: l.minutes,
            }),
            renotify_config: wire.renotify_config.map(|r| RenotifyModel {
                mode: r.mode,
                renotification_states: r.renotification_states,
                renotify_interval_minutes: r.renotify_interval_minutes,
            }),
        })
    }
}

fn target_type() -> AttributeType {
    let integration = || {
        AttributeType::object_of([
            ("integration_id", AttributeType::String),
            ("integration_name", AttributeType::String),
        ])
    };
    AttributeType::object_of([
        ("id", AttributeType::String),
        (
            "config",
            AttributeType::object_of([
                (
                    "slack",
                    AttributeType::object_of([
                        ("channel", AttributeType::String),
                        ("integration_id", AttributeType::String),
                        ("integration_name", AttributeType::String),
                        ("hide_time", AttributeType::Bool),
                        ("hide_transition", AttributeType::Bool),
                    ]),
                ),
                ("incident_io", integration()),
                ("pagerduty", integration()),
                ("grafana_irm", integration()),
                ("microsoft_teams", integration()),
                ("webhook", integration()),
                (
                    "email",
                    AttributeType::object_of([(
                        "addresses",
                        AttributeType::list(AttributeType::String),
                    )]),
                ),
            ]),
        ),
        (
            "rate_limit",
            AttributeType::object_of([
                ("max_messages", AttributeType::Int64),
                ("minutes", AttributeType::Int64),
            ]),
        ),
        (
            "renotify_config",
            AttributeType::object_of([
                ("mode", AttributeType::String),
                (
                    "renotification_states",
                    AttributeType::list(AttributeType::String),
                ),
                ("renotify_interval_minutes", AttributeType::Int64),
            ]),
        ),
    ])
}

/// Copy `integration_name` for targets that keep the same destination.
fn carry_integration_names(planned: &mut Value, prior: &Value) {
    let (Some(targets), Some(prior_targets)) = (
        planned.get_mut("targets").and_then(Value::as_array_mut),
        prior.get("targets").and_then(Value::as_array),
    ) else {
        return;
    };
    for (target, prior_target) in targets.iter_mut().zip(prior_targets) {
        for kind in INTEGRATION_KINDS {
            let prior_name = prior_target
                .pointer(&format!("/config/{}/integration_name", kind))
                .filter(|v| !v.is_null());
            let Some(block) = target
                .pointer_mut(&format!("/config/{}", kind))
                .and_then(Value::as_object_mut)
            else {
                continue;
            };
            if let Some(name) = prior_name {
                if block.get("integration_name").map_or(true, Value::is_null) {
                    block.insert("integration_name".to_string(), name.clone());
                }
            }
        }
    }
}

impl Resource for NotificationRule {
    const TYPE_NAME: &'static str = "tsuga_notification_rule";
    const PATH: &'static str = "/v1/notification-rules";

    type Model = NotificationRuleModel;
    type Request = NotificationRuleBody;
    type Response = NotificationRuleBody;

    fn schema() -> Schema {
        Schema::v0()
            .with_description("Routes monitor alerts to notification targets")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("owner", Attribute::required_string())
            .with_attribute("is_active", Attribute::required(AttributeType::Bool))
            .with_attribute(
                "teams_filter",
                Attribute::required(AttributeType::list(AttributeType::String))
                    .with_description("Team ids whose alerts trigger the rule"),
            )
            .with_attribute(
                "priorities_filter",
                Attribute::required(AttributeType::list(AttributeType::Int64))
                    .with_description("Monitor priorities, 1 to 5"),
            )
            .with_attribute(
                "transition_types_filter",
                Attribute::required(AttributeType::list(AttributeType::String)),
            )
            .with_attribute("tags", tags_attribute())
            .with_attribute(
                "targets",
                Attribute::required(AttributeType::list(target_type())).with_description(
                    "Destinations. Each `config` sets exactly one of slack, incident_io, \
                     pagerduty, grafana_irm, microsoft_teams, webhook or email",
                ),
            )
    }

    fn expand(model: &NotificationRuleModel) -> Result<NotificationRuleBody, ProviderError> {
        check_length("name", &model.name, 1, 250)?;
        check_length("owner", &model.owner, 1, 250)?;
        check_tags("tags", model.tags.as_ref())?;
        check_alert_filters(&model.priorities_filter, &model.transition_types_filter)?;
        if model.targets.is_empty() {
            return Err(ProviderError::invalid("targets", "at least one target is required"));
        }
        let targets = model
            .targets
            .iter()
            .enumerate()
            .map(|(i, target)| target.expand(&index_path("targets", i)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(NotificationRuleBody {
            id: None,
            name: model.name.clone(),
            owner: model.owner.clone(),
            is_active: model.is_active,
            teams_filter: model.teams_filter.clone(),
            priorities_filter: model.priorities_filter.clone(),
            transition_types_filter: model.transition_types_filter.clone(),
            tags: model.tags.clone(),
            targets,
        })
    }

    fn flatten(
        response: NotificationRuleBody,
        prior: Option<&NotificationRuleModel>,
    ) -> Result<(NotificationRuleModel, Vec<Diagnostic>), ProviderError> {
        let id = response.id.ok_or_else(|| {
            ProviderError::Parse("notification rule response has no id".to_string())
        })?;
        let mut diagnostics = Vec::new();
        let targets = response
            .targets
            .into_iter()
            .enumerate()
            .map(|(i, target)| {
                TargetModel::flatten(
                    target,
                    prior.and_then(|p| p.targets.get(i)),
                    &index_path("targets", i),
                    &mut diagnostics,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok((
            NotificationRuleModel {
                id: Some(id),
                name: response.name,
                owner: response.owner,
                is_active: response.is_active,
                teams_filter: response.teams_filter,
                priorities_filter: response.priorities_filter,
                transition_types_filter: response.transition_types_filter,
                tags: non_empty(response.tags),
                targets,
            },
            diagnostics,
        ))
    }

    fn carry_computed(planned: &mut Value, prior: &Value) {
        carry_top_level_computed(&Self::schema(), planned, prior);
        carry_integration_names(planned, prior);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> Value {
        json!({
            "name": "on-call",
            "owner": "team-1",
            "is_active": true,
            "teams_filter": ["team-1"],
            "priorities_filter": [1, 2],
            "transition_types_filter": ["triggered", "no-data"],
            "targets": [
                {"id": "t1", "config": {"slack": {"channel": "#alerts", "integration_id": "int-1", "hide_time": true}},
                 "rate_limit": {"max_messages": 10, "minutes": 5}},
                {"id": "t2", "config": {"incident_io": {"integration_id": "int-2"}},
                 "renotify_config": {"mode": "each", "renotification_states": ["alert"], "renotify_interval_minutes": 30}},
                {"id": "t3", "config": {"email": {"addresses": ["ops@example.com"]}}}
            ]
        })
    }

    #[test]
    fn test_target_wire_format() {
        let model: NotificationRuleModel = serde_json::from_value(config()).unwrap();
        let body = serde_json::to_value(NotificationRule::expand(&model).unwrap()).unwrap();
        assert_eq!(
            body["targets"][0],
            json!({
                "id": "t1",
                "config": {"type": "slack", "channel": "#alerts", "integrationId": "int-1", "hideTime": true},
                "rateLimit": {"maxMessages": 10, "minutes": 5}
            })
        );
        assert_eq!(
            body["targets"][1]["config"],
            json!({"type": "incident-io", "integrationId": "int-2"})
        );
        assert_eq!(
            body["targets"][1]["renotifyConfig"]["renotificationStates"],
            json!(["alert"])
        );
        assert_eq!(
            body["targets"][2]["config"],
            json!({"type": "email", "addresses": ["ops@example.com"]})
        );
        assert_eq!(body["transitionTypesFilter"], json!(["triggered", "no-data"]));
    }

    #[test]
    fn test_target_config_is_oneof() {
        let mut value = config();
        value["targets"][0]["config"]["webhook"] = json!({"integration_id": "int-3"});
        let diagnostics = NotificationRule::validate(&value);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("targets.0.config"));

        let mut value = config();
        value["targets"][2]["config"] = json!({});
        let diagnostics = NotificationRule::validate(&value);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("targets.2.config"));
    }

    #[test]
    fn test_rejects_bad_renotify_state() {
        let mut value = config();
        value["targets"][1]["renotify_config"]["renotification_states"] = json!(["ok"]);
        let diagnostics = NotificationRule::validate(&value);
        assert_eq!(
            diagnostics[0].attribute.as_deref(),
            Some("targets.1.renotify_config.renotification_states.0")
        );
    }

    #[test]
    fn test_flatten_fills_integration_name() {
        let model: NotificationRuleModel = serde_json::from_value(config()).unwrap();
        let response: NotificationRuleBody = serde_json::from_value(json!({
            "id": "rule-1", "name": "on-call", "owner": "team-1", "isActive": true,
            "teamsFilter": ["team-1"], "prioritiesFilter": [1, 2],
            "transitionTypesFilter": ["triggered", "no-data"],
            "targets": [
                {"id": "t1", "config": {"type": "slack", "channel": "#alerts", "integrationId": "int-1", "integrationName": "Slack prod"}},
                {"id": "t2", "config": {"type": "incident-io", "integrationId": "int-2", "integrationName": "incident.io"}},
                {"id": "t3", "config": {"type": "email", "addresses": ["ops@example.com"]}}
            ]
        }))
        .unwrap();
        let (state, _) = NotificationRule::flatten(response, Some(&model)).unwrap();
        let slack = state.targets[0].config.slack.as_ref().unwrap();
        assert_eq!(slack.integration_name.as_deref(), Some("Slack prod"));
        // Not echoed by the API, kept from configuration.
        assert_eq!(slack.hide_time, Some(true));
        assert_eq!(
            state.targets[1].config.incident_io.as_ref().unwrap().integration_name.as_deref(),
            Some("incident.io")
        );
        assert!(state.tags.is_none());
    }

    #[test]
    fn test_plan_carries_integration_names() {
        let mut prior = config();
        prior["id"] = json!("rule-1");
        prior["tags"] = Value::Null;
        prior["targets"][0]["config"]["slack"]["integration_name"] = json!("Slack prod");
        let proposed = config();
        let plan = super::super::ResourceDescriptor::of::<NotificationRule>()
            .plan(Some(&prior), Some(proposed));
        assert_eq!(
            plan.planned_state["targets"][0]["config"]["slack"]["integration_name"],
            "Slack prod"
        );
        assert_eq!(plan.planned_state["id"], "rule-1");
        assert!(plan.changes.is_empty(), "{:?}", plan.changes);
    }

    #[test]
    fn test_unknown_target_type_warns() {
        let response: NotificationRuleBody = serde_json::from_value(json!({
            "id": "rule-1", "name": "n", "owner": "o", "isActive": true,
            "targets": [
                {"id": "t1", "config": {"type": "opsgenie", "integrationId": "i"}},
                {"id": "t2", "config": {"type": "webhook", "integrationId": "int-9"}}
            ]
        }))
        .unwrap();
        let (state, diagnostics) = NotificationRule::flatten(response, None).unwrap();
        assert_eq!(state.targets.len(), 2);
        assert_eq!(state.targets[0].config, TargetConfigModel::default());
        assert_eq!(
            state.targets[1].config.webhook.as_ref().unwrap().integration_id,
            "int-9"
        );
        assert_eq!(diagnostics.len(), 1);
        assert!(!diagnostics[0].is_error());
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("targets.0.config"));
    }

    #[test]
    fn test_malformed_known_target_fails() {
        let response: NotificationRuleBody = serde_json::from_value(json!({
            "id": "rule-1", "name": "n", "owner": "o", "isActive": true,
            "targets": [{"id": "t1", "config": {"type": "slack"}}]
        }))
        .unwrap();
        let err = NotificationRule::flatten(response, None).unwrap_err();
        assert!(matches!(err, ProviderError::Parse(_)), "{err:?}");
    }
}
