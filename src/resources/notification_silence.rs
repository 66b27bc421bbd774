//! `tsuga_notification_silence`: mute notifications on a weekly schedule.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use super::common::{
    check_allowed, check_length, check_max_items, check_range, check_tags, non_blank, non_empty,
    null_as_default, tags_attribute, teams_filter_type, Tag, TeamsFilter, TeamsFilterModel,
};
use super::Resource;
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeType, Diagnostic, Schema};
use crate::validation::{index_path, join_path};

pub(crate) const TRANSITION_TYPES: &[&str] = &["triggered", "resolved", "no-data"];

const TIME_FORMAT: &str = "%H:%M:%SZ";

/// A recurring notification silence.
pub struct NotificationSilence;

/// Silence configuration and state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NotificationSilenceModel {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    /// Sent to the API as `reason`.
    #[serde(default)]
    pub description: Option<String>,
    pub owner: String,
    #[serde(default)]
    pub tags: Option<Vec<Tag>>,
    pub is_active: bool,
    pub schedule: ScheduleModel,
    #[serde(default)]
    pub notification_rule_ids: Option<Vec<String>>,
    #[serde(default)]
    pub query_string: Option<String>,
    #[serde(default)]
    pub teams_filter: Option<TeamsFilterModel>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub priorities_filter: Vec<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub transition_types_filter: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScheduleModel {
    #[serde(default)]
    pub recurring: Option<WeeklySchedule>,
}

/// Time ranges per weekday. Same field names in configuration and on the
/// wire.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WeeklySchedule {
    #[serde(default)]
    pub monday: Option<Vec<TimeRange>>,
    #[serde(default)]
    pub tuesday: Option<Vec<TimeRange>>,
    #[serde(default)]
    pub wednesday: Option<Vec<TimeRange>>,
    #[serde(default)]
    pub thursday: Option<Vec<TimeRange>>,
    #[serde(default)]
    pub friday: Option<Vec<TimeRange>>,
    #[serde(default)]
    pub saturday: Option<Vec<TimeRange>>,
    #[serde(default)]
    pub sunday: Option<Vec<TimeRange>>,
}

/// `HH:MM:SSZ` start and end of a silence window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    #[serde(alias = "startTime")]
    pub start_time: String,
    #[serde(alias = "endTime")]
    pub end_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTimeRange {
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireWeeklySchedule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monday: Option<Vec<WireTimeRange>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tuesday: Option<Vec<WireTimeRange>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wednesday: Option<Vec<WireTimeRange>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thursday: Option<Vec<WireTimeRange>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friday: Option<Vec<WireTimeRange>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saturday: Option<Vec<WireTimeRange>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sunday: Option<Vec<WireTimeRange>>,
}

/// Schedule on the wire. Only recurring schedules are managed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WireSchedule {
    Recurring {
        #[serde(rename = "weeklySchedule", default)]
        weekly_schedule: WireWeeklySchedule,
    },
}

/// Request body and API entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSilenceBody {
    #[serde(default, skip_serializing)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub owner: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
    pub is_active: bool,
    pub schedule: WireSchedule,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_rule_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teams_filter: Option<TeamsFilter>,
    #[serde(default)]
    pub priorities_filter: Vec<i64>,
    #[serde(default)]
    pub transition_types_filter: Vec<String>,
}

/// Check the shared alert filters used by silences and rules.
pub(crate) fn check_alert_filters(
    priorities: &[i64],
    transition_types: &[String],
) -> Result<(), ProviderError> {
    check_max_items("priorities_filter", priorities.len(), 5)?;
    for (i, priority) in priorities.iter().enumerate() {
        check_range(&index_path("priorities_filter", i), *priority, 1, 5)?;
    }
    check_max_items("transition_types_filter", transition_types.len(), 3)?;
    for (i, kind) in transition_types.iter().enumerate() {
        check_allowed(&index_path("transition_types_filter", i), kind, TRANSITION_TYPES)?;
    }
    Ok(())
}

fn parse_time(path: &str, value: &str) -> Result<NaiveTime, ProviderError> {
    NaiveTime::parse_from_str(value, TIME_FORMAT).map_err(|_| {
        ProviderError::invalid(
            path,
            format!("expected a time in HH:MM:SSZ format (e.g. 09:00:00Z), got {:?}", value),
        )
    })
}

fn expand_ranges(
    path: &str,
    ranges: &Option<Vec<TimeRange>>,
) -> Result<Option<Vec<WireTimeRange>>, ProviderError> {
    let Some(ranges) = ranges else {
        return Ok(None);
    };
    ranges
        .iter()
        .enumerate()
        .map(|(i, range)| {
            let range_path = index_path(path, i);
            let start = parse_time(&join_path(&range_path, "start_time"), &range.start_time)?;
            let end = parse_time(&join_path(&range_path, "end_time"), &range.end_time)?;
            if end <= start {
                return Err(ProviderError::invalid(
                    join_path(&range_path, "end_time"),
                    format!("must be after start_time {}", range.start_time),
                ));
            }
            Ok(WireTimeRange {
                start_time: range.start_time.clone(),
                end_time: range.end_time.clone(),
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

fn flatten_ranges(ranges: Option<Vec<WireTimeRange>>) -> Option<Vec<TimeRange>> {
    non_empty(ranges).map(|ranges| {
        ranges
            .into_iter()
            .map(|r| TimeRange {
                start_time: r.start_time,
                end_time: r.end_time,
            })
            .collect()
    })
}

impl ScheduleModel {
    fn expand(&self, path: &str) -> Result<WireSchedule, ProviderError> {
        let Some(week) = &self.recurring else {
            return Err(ProviderError::invalid(
                join_path(path, "recurring"),
                "a recurring schedule is required",
            ));
        };
        let day = |name: &str| join_path(&join_path(path, "recurring"), name);
        let weekly_schedule = WireWeeklySchedule {
            monday: expand_ranges(&day("monday"), &week.monday)?,
            tuesday: expand_ranges(&day("tuesday"), &week.tuesday)?,
            wednesday: expand_ranges(&day("wednesday"), &week.wednesday)?,
            thursday: expand_ranges(&day("thursday"), &week.thursday)?,
            friday: expand_ranges(&day("friday"), &week.friday)?,
            saturday: expand_ranges(&day("saturday"), &week.saturday)?,
            sunday: expand_ranges(&day("sunday"), &week.sunday)?,
        };
        Ok(WireSchedule::Recurring { weekly_schedule })
    }
}

impl From<WireSchedule> for ScheduleModel {
    fn from(schedule: WireSchedule) -> Self {
        let WireSchedule::Recurring { weekly_schedule: w } = schedule;
        Self {
            recurring: Some(WeeklySchedule {
                monday: flatten_ranges(w.monday),
                tuesday: flatten_ranges(w.tuesday),
                wednesday: flatten_ranges(w.wednesday),
                thursday: flatten_ranges(w.thursday),
                friday: flatten_ranges(w.friday),
                saturday: flatten_ranges(w.saturday),
                sunday: flatten_ranges(w.sunday),
            }),
        }
    }
}

fn schedule_type() -> AttributeType {
    let ranges = || {
        AttributeType::list(AttributeType::object_of([
            ("start_time", AttributeType::String),
            ("end_time", AttributeType::String),
        ]))
    };
    let days = [
        "monday",
        "tuesday",
        "wednesday",
        "thursday",
        "friday",
        "saturday",
        "sunday",
    ];
    AttributeType::object_of([(
        "recurring",
        AttributeType::object_of(days.map(|day| (day, ranges()))),
    )])
}

impl Resource for NotificationSilence {
    const TYPE_NAME: &'static str = "tsuga_notification_silence";
    const PATH: &'static str = "/v1/notification-silences";

    type Model = NotificationSilenceModel;
    type Request = NotificationSilenceBody;
    type Response = NotificationSilenceBody;

    fn schema() -> Schema {
        Schema::v0()
            .with_description("Mutes matching notifications during weekly time windows")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("description", Attribute::optional_string())
            .with_attribute("owner", Attribute::required_string())
            .with_attribute("tags", tags_attribute())
            .with_attribute("is_active", Attribute::required(AttributeType::Bool))
            .with_attribute(
                "schedule",
                Attribute::required(schedule_type())
                    .with_description("Weekly windows; times are HH:MM:SSZ"),
            )
            .with_attribute(
                "notification_rule_ids",
                Attribute::optional(AttributeType::list(AttributeType::String)),
            )
            .with_attribute("query_string", Attribute::optional_string())
            .with_attribute("teams_filter", Attribute::optional(teams_filter_type()))
            .with_attribute(
                "priorities_filter",
                Attribute::required(AttributeType::list(AttributeType::Int64)),
            )
            .with_attribute(
                "transition_types_filter",
                Attribute::required(AttributeType::list(AttributeType::String)),
            )
    }

    fn expand(model: &NotificationSilenceModel) -> Result<NotificationSilenceBody, ProviderError> {
        check_length("name", &model.name, 0, 250)?;
        check_length("owner", &model.owner, 1, 250)?;
        if let Some(description) = &model.description {
            check_length("description", description, 0, 250)?;
        }
        if let Some(query) = &model.query_string {
            check_length("query_string", query, 0, 10_000)?;
        }
        check_tags("tags", model.tags.as_ref())?;
        check_alert_filters(&model.priorities_filter, &model.transition_types_filter)?;
        let teams_filter = model
            .teams_filter
            .as_ref()
            .map(|f| f.expand("teams_filter"))
            .transpose()?;
        Ok(NotificationSilenceBody {
            id: None,
            name: model.name.clone(),
            reason: model.description.clone(),
            owner: model.owner.clone(),
            tags: model.tags.clone().unwrap_or_default(),
            is_active: model.is_active,
            schedule: model.schedule.expand("schedule")?,
            notification_rule_ids: model.notification_rule_ids.clone(),
            query_string: model.query_string.clone(),
            teams_filter,
            priorities_filter: model.priorities_filter.clone(),
            transition_types_filter: model.transition_types_filter.clone(),
        })
    }

    fn flatten(
        response: NotificationSilenceBody,
        _prior: Option<&NotificationSilenceModel>,
    ) -> Result<(NotificationSilenceModel, Vec<Diagnostic>), ProviderError> {
        let id = response.id.ok_or_else(|| {
            ProviderError::Parse("notification silence response has no id".to_string())
        })?;
        Ok((
            NotificationSilenceModel {
                id: Some(id),
                name: response.name,
                description: non_blank(response.reason),
                owner: response.owner,
                tags: non_empty(Some(response.tags)),
                is_active: response.is_active,
                schedule: response.schedule.into(),
                notification_rule_ids: non_empty(response.notification_rule_ids),
                query_string: non_blank(response.query_string),
                teams_filter: response.teams_filter.map(TeamsFilterModel::from),
                priorities_filter: response.priorities_filter,
                transition_types_filter: response.transition_types_filter,
            },
            Vec::new(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(schedule: serde_json::Value) -> serde_json::Value {
        json!({
            "name": "weekend",
            "description": "quiet weekends",
            "owner": "team-1",
            "is_active": true,
            "schedule": schedule,
            "priorities_filter": [1, 2],
            "transition_types_filter": ["triggered"]
        })
    }

    #[test]
    fn test_schedule_wire_format() {
        let model: NotificationSilenceModel = serde_json::from_value(config(json!({
            "recurring": {"saturday": [{"start_time": "00:00:00Z", "end_time": "23:59:59Z"}]}
        })))
        .unwrap();
        let body = serde_json::to_value(NotificationSilence::expand(&model).unwrap()).unwrap();
        assert_eq!(
            body["schedule"],
            json!({
                "type": "recurring",
                "weeklySchedule": {
                    "saturday": [{"startTime": "00:00:00Z", "endTime": "23:59:59Z"}]
                }
            })
        );
        assert_eq!(body["reason"], "quiet weekends");
        assert!(body.get("description").is_none());
    }

    #[test]
    fn test_rejects_bad_time_ranges() {
        let diagnostics = NotificationSilence::validate(&config(json!({
            "recurring": {"monday": [{"start_time": "9am", "end_time": "17:00:00Z"}]}
        })));
        assert_eq!(
            diagnostics[0].attribute.as_deref(),
            Some("schedule.recurring.monday.0.start_time")
        );

        let diagnostics = NotificationSilence::validate(&config(json!({
            "recurring": {"friday": [{"start_time": "18:00:00Z", "end_time": "09:00:00Z"}]}
        })));
        assert_eq!(
            diagnostics[0].attribute.as_deref(),
            Some("schedule.recurring.friday.0.end_time")
        );
    }

    #[test]
    fn test_rejects_bad_filters() {
        let mut value = config(json!({"recurring": {}}));
        value["priorities_filter"] = json!([0]);
        let diagnostics = NotificationSilence::validate(&value);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("priorities_filter.0"));

        let mut value = config(json!({"recurring": {}}));
        value["transition_types_filter"] = json!(["exploded"]);
        let diagnostics = NotificationSilence::validate(&value);
        assert_eq!(
            diagnostics[0].attribute.as_deref(),
            Some("transition_types_filter.0")
        );
    }

    #[test]
    fn test_flatten_maps_reason_to_description() {
        let response: NotificationSilenceBody = serde_json::from_value(json!({
            "id": "s-1", "name": "weekend", "reason": "quiet", "owner": "team-1",
            "tags": [], "isActive": false,
            "schedule": {"type": "recurring", "weeklySchedule": {"sunday": [
                {"startTime": "00:00:00Z", "endTime": "12:00:00Z"}
            ], "monday": []}},
            "teamsFilter": {"type": "all-teams"},
            "prioritiesFilter": [3], "transitionTypesFilter": ["resolved"]
        }))
        .unwrap();
        let (model, _) = NotificationSilence::flatten(response, None).unwrap();
        assert_eq!(model.description.as_deref(), Some("quiet"));
        assert!(model.tags.is_none());
        let week = model.schedule.recurring.unwrap();
        assert_eq!(week.sunday.unwrap()[0].end_time, "12:00:00Z");
        assert!(week.monday.is_none());
        assert_eq!(model.teams_filter.unwrap().kind, "all-teams");
    }
}
