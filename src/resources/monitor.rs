//! `tsuga_monitor`: threshold and anomaly alerts on logs and metrics.
//!
//! The four configuration variants share their queries and alerting options.
//! Threshold variants (`metric`, `log`) carry a full condition; anomaly
//! variants only carry a formula and let the API compute the rest.

use serde::{Deserialize, Serialize};

use super::common::{
    aggregate_type, check_allowed, check_length, check_max_items, check_range, check_tags,
    group_by_type, non_blank, non_empty, null_as_default, tags_attribute, Aggregate,
    AggregateModel, Empty, Function, GroupBy, Tag,
};
use super::Resource;
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeType, Diagnostic, Schema};
use crate::validation::{index_path, join_path, one_of};

const PERMISSIONS: &[&str] = &["all", "owning-team-only", "owning-team-and-public"];
const OPERATORS: &[&str] = &[
    "greater_than",
    "less_than",
    "equal",
    "not_equal",
    "greater_than_or_equal",
    "less_than_or_equal",
];
const NO_DATA_BEHAVIORS: &[&str] = &["alert", "resolve", "keep_last_status"];
const THRESHOLD_NO_DATA_BEHAVIORS: &[&str] = &["alert", "resolve", "keep_last_status", "consider_zero"];
const ALERT_LOGICS: &[&str] = &["no_aggregation", "all", "any", "each", "proportion"];
const FILL_TYPES: &[&str] = &["zero", "null"];

/// Sent as the anomaly `conditionType`; the API replaces it.
const ANOMALY_CONDITION_TYPE: &str = "to_be_set";

const MAX_QUERIES: usize = 15;
const MAX_FUNCTIONS: usize = 10;

/// A monitor.
pub struct Monitor;

/// Monitor configuration and state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MonitorModel {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub message: Option<String>,
    pub owner: String,
    /// 1 (highest) to 5.
    pub priority: i64,
    pub permissions: String,
    #[serde(default)]
    pub dashboard_id: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<Tag>>,
    pub configuration: MonitorConfigurationModel,
}

/// `configuration`: exactly one variant.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MonitorConfigurationModel {
    #[serde(default)]
    pub metric: Option<MonitorDetailsModel<ThresholdCondition>>,
    #[serde(default)]
    pub log: Option<MonitorDetailsModel<ThresholdCondition>>,
    #[serde(default)]
    pub anomaly_metric: Option<MonitorDetailsModel<AnomalyCondition>>,
    #[serde(default)]
    pub anomaly_log: Option<MonitorDetailsModel<AnomalyCondition>>,
}

/// Fields shared by every configuration variant.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MonitorDetailsModel<C> {
    #[serde(default, deserialize_with = "null_as_default")]
    pub queries: Vec<MonitorQueryModel>,
    pub condition: C,
    pub no_data_behavior: String,
    /// Minutes.
    pub timeframe: i64,
    #[serde(default)]
    pub group_by_fields: Option<Vec<GroupBy>>,
    #[serde(default)]
    pub aggregation_alert_logic: Option<String>,
    #[serde(default)]
    pub proportion_alert_threshold: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MonitorQueryModel {
    pub filter: String,
    pub aggregate: AggregateModel,
    #[serde(default)]
    pub functions: Option<Vec<FunctionModel>>,
    #[serde(default)]
    pub fill: Option<Fill>,
}

/// A query function: exactly one member is set.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FunctionModel {
    #[serde(default)]
    pub per_second: Option<Empty>,
    #[serde(default)]
    pub per_minute: Option<Empty>,
    #[serde(default)]
    pub per_hour: Option<Empty>,
    #[serde(default)]
    pub rate: Option<Empty>,
    #[serde(default)]
    pub increase: Option<Empty>,
    #[serde(default)]
    pub rolling: Option<RollingModel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollingModel {
    pub window: String,
}

/// How gaps are filled. Same shape in configuration and on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
    pub mode: FillMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillMode {
    /// `zero` or `null`.
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ThresholdCondition {
    pub formula: String,
    pub operator: String,
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnomalyCondition {
    pub formula: String,
}

/// Condition as sent to and returned by the API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireCondition {
    pub formula: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_type: Option<String>,
}

/// Conversion between a configured condition and its wire form.
pub trait Condition: Sized {
    /// `no_data_behavior` values accepted with this condition.
    const NO_DATA_BEHAVIORS: &'static [&'static str];

    /// Validate and convert to the wire form.
    fn expand(&self, path: &str) -> Result<WireCondition, ProviderError>;

    /// Rebuild from an API response.
    fn flatten(wire: WireCondition) -> Result<Self, ProviderError>;
}

impl Condition for ThresholdCondition {
    const NO_DATA_BEHAVIORS: &'static [&'static str] = THRESHOLD_NO_DATA_BEHAVIORS;

    fn expand(&self, path: &str) -> Result<WireCondition, ProviderError> {
        check_length(&join_path(path, "formula"), &self.formula, 0, 250)?;
        check_allowed(&join_path(path, "operator"), &self.operator, OPERATORS)?;
        Ok(WireCondition {
            formula: self.formula.clone(),
            operator: Some(self.operator.clone()),
            threshold: Some(self.threshold),
            condition_type: None,
        })
    }

    fn flatten(wire: WireCondition) -> Result<Self, ProviderError> {
        match (wire.operator, wire.threshold) {
            (Some(operator), Some(threshold)) => Ok(Self {
                formula: wire.formula,
                operator,
                threshold,
            }),
            _ => Err(ProviderError::Parse(
                "monitor condition is missing operator or threshold".to_string(),
            )),
        }
    }
}

impl Condition for AnomalyCondition {
    const NO_DATA_BEHAVIORS: &'static [&'static str] = NO_DATA_BEHAVIORS;

    fn expand(&self, path: &str) -> Result<WireCondition, ProviderError> {
        check_length(&join_path(path, "formula"), &self.formula, 0, 250)?;
        Ok(WireCondition {
            formula: self.formula.clone(),
            condition_type: Some(ANOMALY_CONDITION_TYPE.to_string()),
            ..Default::default()
        })
    }

    fn flatten(wire: WireCondition) -> Result<Self, ProviderError> {
        Ok(Self {
            formula: wire.formula,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMonitorQuery {
    pub filter: String,
    pub aggregate: Aggregate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub functions: Option<Vec<Function>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<Fill>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMonitorDetails {
    #[serde(default)]
    pub queries: Vec<WireMonitorQuery>,
    pub condition: WireCondition,
    pub no_data_behavior: String,
    pub timeframe: i64,
    #[serde(default)]
    pub group_by_fields: Vec<GroupBy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation_alert_logic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proportion_alert_threshold: Option<i64>,
}

/// Configuration on the wire, tagged by `type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WireMonitorConfiguration {
    Metric(WireMonitorDetails),
    Log(WireMonitorDetails),
    AnomalyMetric(WireMonitorDetails),
    AnomalyLog(WireMonitorDetails),
}

/// Request body and API entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorBody {
    #[serde(default, skip_serializing)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub owner: String,
    pub priority: i64,
    pub permissions: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dashboard_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    pub configuration: WireMonitorConfiguration,
}

impl FunctionModel {
    fn expand(&self, path: &str) -> Result<Function, ProviderError> {
        let plain = |set: Option<Empty>, kind: &str| {
            set.map(|_| Function {
                kind: kind.to_string(),
                window: None,
            })
        };
        let function = one_of(
            path,
            [
                ("per_second", plain(self.per_second, "per-second")),
                ("per_minute", plain(self.per_minute, "per-minute")),
                ("per_hour", plain(self.per_hour, "per-hour")),
                ("rate", plain(self.rate, "rate")),
                ("increase", plain(self.increase, "increase")),
                (
                    "rolling",
                    self.rolling.as_ref().map(|r| Function {
                        kind: "rolling".to_string(),
                        window: Some(r.window.clone()),
                    }),
                ),
            ],
        )?;
        if let Some(window) = &function.window {
            check_length(&join_path(path, "rolling.window"), window, 1, 250)?;
        }
        Ok(function)
    }

    fn flatten(function: Function) -> Result<Self, ProviderError> {
        let mut model = Self::default();
        match function.kind.as_str() {
            "per-second" => model.per_second = Some(Empty {}),
            "per-minute" => model.per_minute = Some(Empty {}),
            "per-hour" => model.per_hour = Some(Empty {}),
            "rate" => model.rate = Some(Empty {}),
            "increase" => model.increase = Some(Empty {}),
            "rolling" => {
                model.rolling = Some(RollingModel {
                    window: function.window.unwrap_or_default(),
                })
            }
            other => {
                return Err(ProviderError::Parse(format!(
                    "unknown monitor query function type {:?}",
                    other
                )))
            }
        }
        Ok(model)
    }
}

impl MonitorQueryModel {
    fn expand(&self, path: &str) -> Result<WireMonitorQuery, ProviderError> {
        check_length(&join_path(path, "filter"), &self.filter, 0, 10_000)?;
        let aggregate = self.aggregate.expand(&join_path(path, "aggregate"))?;
        let functions = match &self.functions {
            Some(functions) => {
                let functions_path = join_path(path, "functions");
                check_max_items(&functions_path, functions.len(), MAX_FUNCTIONS)?;
                Some(
                    functions
                        .iter()
                        .enumerate()
                        .map(|(i, f)| f.expand(&index_path(&functions_path, i)))
                        .collect::<Result<Vec<_>, _>>()?,
                )
            }
            None => None,
        };
        if let Some(fill) = &self.fill {
            check_allowed(&join_path(path, "fill.mode.type"), &fill.mode.kind, FILL_TYPES)?;
        }
        Ok(WireMonitorQuery {
            filter: self.filter.clone(),
            aggregate,
            functions,
            fill: self.fill.clone(),
        })
    }

    fn flatten(wire: WireMonitorQuery) -> Result<Self, ProviderError> {
        let functions = match non_empty(wire.functions) {
            Some(functions) => Some(
                functions
                    .into_iter()
                    .map(FunctionModel::flatten)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            None => None,
        };
        Ok(Self {
            filter: wire.filter,
            aggregate: wire.aggregate.into(),
            functions,
            fill: wire.fill,
        })
    }
}

impl<C: Condition> MonitorDetailsModel<C> {
    fn expand(&self, path: &str) -> Result<WireMonitorDetails, ProviderError> {
        let queries_path = join_path(path, "queries");
        check_max_items(&queries_path, self.queries.len(), MAX_QUERIES)?;
        let queries = self
            .queries
            .iter()
            .enumerate()
            .map(|(i, q)| q.expand(&index_path(&queries_path, i)))
            .collect::<Result<Vec<_>, _>>()?;
        let condition = self.condition.expand(&join_path(path, "condition"))?;
        check_allowed(
            &join_path(path, "no_data_behavior"),
            &self.no_data_behavior,
            C::NO_DATA_BEHAVIORS,
        )?;

        let group_by_path = join_path(path, "group_by_fields");
        let group_by_fields = self.group_by_fields.clone().unwrap_or_default();
        check_max_items(&group_by_path, group_by_fields.len(), 1)?;
        for (i, group_by) in group_by_fields.iter().enumerate() {
            if group_by.fields.is_empty() {
                return Err(ProviderError::invalid(
                    join_path(&index_path(&group_by_path, i), "fields"),
                    "at least one field is required",
                ));
            }
        }

        let logic_path = join_path(path, "aggregation_alert_logic");
        if let Some(logic) = &self.aggregation_alert_logic {
            check_allowed(&logic_path, logic, ALERT_LOGICS)?;
        }
        let threshold_path = join_path(path, "proportion_alert_threshold");
        match (self.aggregation_alert_logic.as_deref(), self.proportion_alert_threshold) {
            (Some("proportion"), None) => {
                return Err(ProviderError::invalid(
                    threshold_path,
                    "required when aggregation_alert_logic is 'proportion'",
                ))
            }
            (_, Some(threshold)) => check_range(&threshold_path, threshold, 1, 99)?,
            _ => {}
        }

        Ok(WireMonitorDetails {
            queries,
            condition,
            no_data_behavior: self.no_data_behavior.clone(),
            timeframe: self.timeframe,
            group_by_fields,
            aggregation_alert_logic: self.aggregation_alert_logic.clone(),
            proportion_alert_threshold: self.proportion_alert_threshold,
        })
    }

    fn flatten(wire: WireMonitorDetails) -> Result<Self, ProviderError> {
        Ok(Self {
            queries: wire
                .queries
                .into_iter()
                .map(MonitorQueryModel::flatten)
                .collect::<Result<Vec<_>, _>>()?,
            condition: C::flatten(wire.condition)?,
            no_data_behavior: wire.no_data_behavior,
            timeframe: wire.timeframe,
            group_by_fields: non_empty(Some(wire.group_by_fields)),
            aggregation_alert_logic: non_blank(wire.aggregation_alert_logic),
            proportion_alert_threshold: wire.proportion_alert_threshold,
        })
    }
}

enum Variant<'a> {
    Metric(&'a MonitorDetailsModel<ThresholdCondition>),
    Log(&'a MonitorDetailsModel<ThresholdCondition>),
    AnomalyMetric(&'a MonitorDetailsModel<AnomalyCondition>),
    AnomalyLog(&'a MonitorDetailsModel<AnomalyCondition>),
}

impl MonitorConfigurationModel {
    fn expand(&self, path: &str) -> Result<WireMonitorConfiguration, ProviderError> {
        let variant = one_of(
            path,
            [
                ("metric", self.metric.as_ref().map(Variant::Metric)),
                ("log", self.log.as_ref().map(Variant::Log)),
                (
                    "anomaly_metric",
                    self.anomaly_metric.as_ref().map(Variant::AnomalyMetric),
                ),
                ("anomaly_log", self.anomaly_log.as_ref().map(Variant::AnomalyLog)),
            ],
        )?;
        let slot = |name: &str| join_path(path, name);
        Ok(match variant {
            Variant::Metric(m) => WireMonitorConfiguration::Metric(m.expand(&slot("metric"))?),
            Variant::Log(m) => WireMonitorConfiguration::Log(m.expand(&slot("log"))?),
            Variant::AnomalyMetric(m) => {
                WireMonitorConfiguration::AnomalyMetric(m.expand(&slot("anomaly_metric"))?)
            }
            Variant::AnomalyLog(m) => {
                WireMonitorConfiguration::AnomalyLog(m.expand(&slot("anomaly_log"))?)
            }
        })
    }

    fn flatten(wire: WireMonitorConfiguration) -> Result<Self, ProviderError> {
        let mut model = Self::default();
        match wire {
            WireMonitorConfiguration::Metric(d) => model.metric = Some(MonitorDetailsModel::flatten(d)?),
            WireMonitorConfiguration::Log(d) => model.log = Some(MonitorDetailsModel::flatten(d)?),
            WireMonitorConfiguration::AnomalyMetric(d) => {
                model.anomaly_metric = Some(MonitorDetailsModel::flatten(d)?)
            }
            WireMonitorConfiguration::AnomalyLog(d) => {
                model.anomaly_log = Some(MonitorDetailsModel::flatten(d)?)
            }
        }
        Ok(model)
    }
}

fn details_type(condition: AttributeType) -> AttributeType {
    let function = AttributeType::object_of([
        ("per_second", AttributeType::empty_object()),
        ("per_minute", AttributeType::empty_object()),
        ("per_hour", AttributeType::empty_object()),
        ("rate", AttributeType::empty_object()),
        ("increase", AttributeType::empty_object()),
        (
            "rolling",
            AttributeType::object_of([("window", AttributeType::String)]),
        ),
    ]);
    let fill = AttributeType::object_of([(
        "mode",
        AttributeType::object_of([("type", AttributeType::String)]),
    )]);
    let query = AttributeType::object_of([
        ("filter", AttributeType::String),
        ("aggregate", aggregate_type()),
        ("functions", AttributeType::list(function)),
        ("fill", fill),
    ]);
    AttributeType::object_of([
        ("queries", AttributeType::list(query)),
        ("condition", condition),
        ("no_data_behavior", AttributeType::String),
        ("timeframe", AttributeType::Int64),
        ("group_by_fields", AttributeType::list(group_by_type())),
        ("aggregation_alert_logic", AttributeType::String),
        ("proportion_alert_threshold", AttributeType::Int64),
    ])
}

fn configuration_type() -> AttributeType {
    let threshold = || {
        details_type(AttributeType::object_of([
            ("formula", AttributeType::String),
            ("operator", AttributeType::String),
            ("threshold", AttributeType::Float64),
        ]))
    };
    let anomaly = || details_type(AttributeType::object_of([("formula", AttributeType::String)]));
    AttributeType::object_of([
        ("metric", threshold()),
        ("log", threshold()),
        ("anomaly_metric", anomaly()),
        ("anomaly_log", anomaly()),
    ])
}

impl Resource for Monitor {
    const TYPE_NAME: &'static str = "tsuga_monitor";
    const PATH: &'static str = "/v1/monitors";

    type Model = MonitorModel;
    type Request = MonitorBody;
    type Response = MonitorBody;

    fn schema() -> Schema {
        Schema::v0()
            .with_description("Monitor allowing to send alerts based on telemetry data")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string())
            .with_attribute(
                "message",
                Attribute::optional_string()
                    .with_description("Message displayed when a notification is triggered"),
            )
            .with_attribute("owner", Attribute::required_string())
            .with_attribute("priority", Attribute::required_int64())
            .with_attribute(
                "permissions",
                Attribute::required_string().with_description(
                    "`all`, `owning-team-only` or `owning-team-and-public`",
                ),
            )
            .with_attribute("dashboard_id", Attribute::optional_string())
            .with_attribute("tags", tags_attribute())
            .with_attribute(
                "configuration",
                Attribute::required(configuration_type()).with_description(
                    "Exactly one of metric, log, anomaly_metric or anomaly_log",
                ),
            )
    }

    fn expand(model: &MonitorModel) -> Result<MonitorBody, ProviderError> {
        check_length("name", &model.name, 0, 250)?;
        check_length("owner", &model.owner, 0, 250)?;
        check_range("priority", model.priority, 1, 5)?;
        check_allowed("permissions", &model.permissions, PERMISSIONS)?;
        check_tags("tags", model.tags.as_ref())?;
        Ok(MonitorBody {
            id: None,
            name: model.name.clone(),
            message: model.message.clone(),
            owner: model.owner.clone(),
            priority: model.priority,
            permissions: model.permissions.clone(),
            dashboard_id: non_blank(model.dashboard_id.clone()),
            tags: model.tags.clone().unwrap_or_default(),
            configuration: model.configuration.expand("configuration")?,
        })
    }

    fn flatten(
        response: MonitorBody,
        _prior: Option<&MonitorModel>,
    ) -> Result<(MonitorModel, Vec<Diagnostic>), ProviderError> {
        let id = response
            .id
            .ok_or_else(|| ProviderError::Parse("monitor response has no id".to_string()))?;
        Ok((
            MonitorModel {
                id: Some(id),
                name: response.name,
                message: non_blank(response.message),
                owner: response.owner,
                priority: response.priority,
                permissions: response.permissions,
                dashboard_id: non_blank(response.dashboard_id),
                tags: non_empty(Some(response.tags)),
                configuration: MonitorConfigurationModel::flatten(response.configuration)?,
            },
            Vec::new(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn metric_monitor() -> Value {
        json!({
            "name": "High latency",
            "owner": "team-1",
            "priority": 2,
            "permissions": "all",
            "configuration": {"metric": {
                "queries": [{
                    "filter": "service:api",
                    "aggregate": {"percentile": {"field": "duration", "percentile": 99.0}},
                    "functions": [{"rolling": {"window": "5m"}}],
                    "fill": {"mode": {"type": "zero"}}
                }],
                "condition": {"formula": "q1", "operator": "greater_than", "threshold": 500.0},
                "no_data_behavior": "consider_zero",
                "timeframe": 5,
                "group_by_fields": [{"fields": ["service"], "limit": 10}],
                "aggregation_alert_logic": "each"
            }}
        })
    }

    #[test]
    fn test_metric_wire_format() {
        let model: MonitorModel = serde_json::from_value(metric_monitor()).unwrap();
        let body = serde_json::to_value(Monitor::expand(&model).unwrap()).unwrap();
        let config = &body["configuration"];
        assert_eq!(config["type"], "metric");
        assert_eq!(
            config["queries"][0]["aggregate"],
            json!({"type": "percentile", "field": "duration", "percentile": 99.0})
        );
        assert_eq!(
            config["queries"][0]["functions"],
            json!([{"type": "rolling", "window": "5m"}])
        );
        assert_eq!(
            config["condition"],
            json!({"formula": "q1", "operator": "greater_than", "threshold": 500.0})
        );
        assert_eq!(config["noDataBehavior"], "consider_zero");
        assert_eq!(config["groupByFields"], json!([{"fields": ["service"], "limit": 10}]));
        assert!(config.get("proportionAlertThreshold").is_none());
    }

    #[test]
    fn test_anomaly_sends_placeholder_condition_type() {
        let mut value = metric_monitor();
        let mut details = value["configuration"]["metric"].take();
        details["condition"] = json!({"formula": "q1"});
        details["no_data_behavior"] = json!("alert");
        value["configuration"] = json!({"anomaly_log": details});
        let model: MonitorModel = serde_json::from_value(value).unwrap();
        let body = serde_json::to_value(Monitor::expand(&model).unwrap()).unwrap();
        assert_eq!(body["configuration"]["type"], "anomaly-log");
        assert_eq!(
            body["configuration"]["condition"],
            json!({"formula": "q1", "conditionType": "to_be_set"})
        );
    }

    #[test]
    fn test_anomaly_rejects_consider_zero() {
        let mut value = metric_monitor();
        let mut details = value["configuration"]["metric"].take();
        details["condition"] = json!({"formula": "q1"});
        value["configuration"] = json!({"anomaly_metric": details});
        let diagnostics = Monitor::validate(&value);
        assert_eq!(
            diagnostics[0].attribute.as_deref(),
            Some("configuration.anomaly_metric.no_data_behavior")
        );
    }

    #[test]
    fn test_proportion_requires_threshold() {
        let mut value = metric_monitor();
        value["configuration"]["metric"]["aggregation_alert_logic"] = json!("proportion");
        let diagnostics = Monitor::validate(&value);
        assert_eq!(
            diagnostics[0].attribute.as_deref(),
            Some("configuration.metric.proportion_alert_threshold")
        );

        value["configuration"]["metric"]["proportion_alert_threshold"] = json!(50);
        assert!(Monitor::validate(&value).is_empty());
    }

    #[test]
    fn test_configuration_is_oneof() {
        let mut value = metric_monitor();
        value["configuration"]["log"] = value["configuration"]["metric"].clone();
        let diagnostics = Monitor::validate(&value);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("configuration"));
        assert!(diagnostics[0].detail.as_deref().unwrap().contains("found 2"));
    }

    #[test]
    fn test_rejects_out_of_range_priority() {
        let mut value = metric_monitor();
        value["priority"] = json!(6);
        let diagnostics = Monitor::validate(&value);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("priority"));
    }

    #[test]
    fn test_flatten_round_trip() {
        let model: MonitorModel = serde_json::from_value(metric_monitor()).unwrap();
        let mut body = serde_json::to_value(Monitor::expand(&model).unwrap()).unwrap();
        body["id"] = json!("mon-1");
        let response: MonitorBody = serde_json::from_value(body).unwrap();
        let (state, _) = Monitor::flatten(response, None).unwrap();
        assert_eq!(state.id.as_deref(), Some("mon-1"));
        assert_eq!(state.configuration, model.configuration);
        assert!(state.tags.is_none());
    }

    #[test]
    fn test_unknown_function_is_parse_error() {
        let err = FunctionModel::flatten(Function {
            kind: "derivative".into(),
            window: None,
        })
        .unwrap_err();
        assert!(matches!(err, ProviderError::Parse(_)));
    }
}
