//! Field schemas shared by several resources.
//!
//! Each primitive comes in two shapes: a configuration model whose optional
//! fields serialize as explicit nulls, and a wire type matching the API's
//! camelCase JSON. `expand` goes from the first to the second and validates on
//! the way; `From<wire>` goes back.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeType};
use crate::validation::{index_path, join_path, one_of};

/// Deserialize `null` as `T::default()`. Pair with `#[serde(default)]`.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// `None` for an empty list, so a list the API always returns does not
/// show up as a change against configuration that left it unset.
pub(crate) fn non_empty<T>(values: Option<Vec<T>>) -> Option<Vec<T>> {
    values.filter(|v| !v.is_empty())
}

/// `None` for an empty string.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Fail unless `value` is one of `allowed`.
pub(crate) fn check_allowed(path: &str, value: &str, allowed: &[&str]) -> Result<(), ProviderError> {
    if allowed.contains(&value) {
        return Ok(());
    }
    Err(ProviderError::invalid(
        path,
        format!("must be one of {}, got {:?}", allowed.join(", "), value),
    ))
}

/// Fail unless `lo <= value <= hi`.
pub(crate) fn check_range<T>(path: &str, value: T, lo: T, hi: T) -> Result<(), ProviderError>
where
    T: PartialOrd + std::fmt::Display,
{
    if value < lo || value > hi {
        return Err(ProviderError::invalid(
            path,
            format!("must be between {} and {}, got {}", lo, hi, value),
        ));
    }
    Ok(())
}

/// Fail when a list holds more than `max` items.
pub(crate) fn check_max_items(path: &str, len: usize, max: usize) -> Result<(), ProviderError> {
    if len > max {
        return Err(ProviderError::invalid(
            path,
            format!("at most {} items are allowed, got {}", max, len),
        ));
    }
    Ok(())
}

/// Fail unless the string length is within `lo..=hi` characters.
pub(crate) fn check_length(path: &str, value: &str, lo: usize, hi: usize) -> Result<(), ProviderError> {
    let len = value.chars().count();
    if len < lo || len > hi {
        return Err(ProviderError::invalid(
            path,
            format!("must be between {} and {} characters, got {}", lo, hi, len),
        ));
    }
    Ok(())
}

/// Marker payload for variants that carry no fields, such as `count = {}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Empty {}

// Tags

/// A key/value tag. Same shape in configuration and on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag key.
    pub key: String,
    /// Tag value.
    pub value: String,
}

/// Type of a `tags` attribute.
pub fn tags_type() -> AttributeType {
    AttributeType::list(AttributeType::object_of([
        ("key", AttributeType::String),
        ("value", AttributeType::String),
    ]))
}

/// Optional `tags` attribute.
pub fn tags_attribute() -> Attribute {
    Attribute::optional(tags_type()).with_description("Key/value tags")
}

/// Check tag sizes before sending them.
pub(crate) fn check_tags(path: &str, tags: Option<&Vec<Tag>>) -> Result<(), ProviderError> {
    let Some(tags) = tags else {
        return Ok(());
    };
    if tags.len() > 50 {
        return Err(ProviderError::invalid(path, "at most 50 tags are allowed"));
    }
    for (i, tag) in tags.iter().enumerate() {
        if tag.key.is_empty() || tag.key.chars().count() > 128 {
            return Err(ProviderError::invalid(
                join_path(&index_path(path, i), "key"),
                "must be between 1 and 128 characters",
            ));
        }
        if tag.value.chars().count() > 256 {
            return Err(ProviderError::invalid(
                join_path(&index_path(path, i), "value"),
                "must be at most 256 characters",
            ));
        }
    }
    Ok(())
}

// Aggregate

/// An aggregate with a target field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldModel {
    /// Field to aggregate.
    pub field: String,
}

/// A percentile aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentileModel {
    /// Field to aggregate.
    pub field: String,
    /// Percentile, for example `99`.
    pub percentile: f64,
}

/// `aggregate` block as configured: exactly one member is set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AggregateModel {
    #[serde(default)]
    pub count: Option<Empty>,
    #[serde(default)]
    pub sum: Option<FieldModel>,
    #[serde(default)]
    pub average: Option<FieldModel>,
    #[serde(default)]
    pub min: Option<FieldModel>,
    #[serde(default)]
    pub max: Option<FieldModel>,
    #[serde(default)]
    pub unique_count: Option<FieldModel>,
    #[serde(default)]
    pub percentile: Option<PercentileModel>,
}

/// Aggregate as sent to the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Aggregate {
    /// `{"type":"count"}`
    Count,
    /// `{"type":"sum","field":..}`
    Sum { field: String },
    /// `{"type":"average","field":..}`
    Average { field: String },
    /// `{"type":"min","field":..}`
    Min { field: String },
    /// `{"type":"max","field":..}`
    Max { field: String },
    /// `{"type":"unique-count","field":..}`
    UniqueCount { field: String },
    /// `{"type":"percentile","field":..,"percentile":..}`
    Percentile { field: String, percentile: f64 },
}

impl AggregateModel {
    /// Select the configured aggregate.
    pub fn expand(&self, path: &str) -> Result<Aggregate, ProviderError> {
        let field = |f: &Option<FieldModel>| f.as_ref().map(|f| f.field.clone());
        let aggregate = one_of(
            path,
            [
                ("count", self.count.map(|_| Aggregate::Count)),
                ("sum", field(&self.sum).map(|field| Aggregate::Sum { field })),
                ("average", field(&self.average).map(|field| Aggregate::Average { field })),
                ("min", field(&self.min).map(|field| Aggregate::Min { field })),
                ("max", field(&self.max).map(|field| Aggregate::Max { field })),
                (
                    "unique_count",
                    field(&self.unique_count).map(|field| Aggregate::UniqueCount { field }),
                ),
                (
                    "percentile",
                    self.percentile.as_ref().map(|p| Aggregate::Percentile {
                        field: p.field.clone(),
                        percentile: p.percentile,
                    }),
                ),
            ],
        )?;
        if let Aggregate::Percentile { percentile, .. } = &aggregate {
            check_range(&join_path(path, "percentile.percentile"), *percentile, 0.0, 100.0)?;
        }
        Ok(aggregate)
    }
}

impl From<Aggregate> for AggregateModel {
    fn from(aggregate: Aggregate) -> Self {
        let mut model = Self::default();
        match aggregate {
            Aggregate::Count => model.count = Some(Empty {}),
            Aggregate::Sum { field } => model.sum = Some(FieldModel { field }),
            Aggregate::Average { field } => model.average = Some(FieldModel { field }),
            Aggregate::Min { field } => model.min = Some(FieldModel { field }),
            Aggregate::Max { field } => model.max = Some(FieldModel { field }),
            Aggregate::UniqueCount { field } => model.unique_count = Some(FieldModel { field }),
            Aggregate::Percentile { field, percentile } => {
                model.percentile = Some(PercentileModel { field, percentile })
            }
        }
        model
    }
}

/// Type of an `aggregate` attribute.
pub fn aggregate_type() -> AttributeType {
    let field = || AttributeType::object_of([("field", AttributeType::String)]);
    AttributeType::object_of([
        ("count", AttributeType::empty_object()),
        ("sum", field()),
        ("average", field()),
        ("min", field()),
        ("max", field()),
        ("unique_count", field()),
        (
            "percentile",
            AttributeType::object_of([
                ("field", AttributeType::String),
                ("percentile", AttributeType::Float64),
            ]),
        ),
    ])
}

// Group by

/// `group_by`: same shape in configuration and on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupBy {
    /// Fields to group on.
    #[serde(default, deserialize_with = "null_as_default")]
    pub fields: Vec<String>,
    /// Maximum number of groups.
    pub limit: i64,
}

/// Type of one `group_by` entry.
pub fn group_by_type() -> AttributeType {
    AttributeType::object_of([
        ("fields", AttributeType::list(AttributeType::String)),
        ("limit", AttributeType::Int64),
    ])
}

// Normalizer

const NORMALIZER_TYPES: &[&str] = &["duration", "data", "custom", "date", "level"];

/// `normalizer` as configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizerModel {
    /// One of `duration`, `data`, `custom`, `date`, `level`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub unit: Option<String>,
}

/// Normalizer as sent to the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Normalizer {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl NormalizerModel {
    /// Validate and convert.
    pub fn expand(&self, path: &str) -> Result<Normalizer, ProviderError> {
        check_allowed(&join_path(path, "type"), &self.kind, NORMALIZER_TYPES)?;
        Ok(Normalizer {
            kind: self.kind.clone(),
            unit: self.unit.clone(),
        })
    }
}

impl From<Normalizer> for NormalizerModel {
    fn from(normalizer: Normalizer) -> Self {
        Self {
            kind: normalizer.kind,
            unit: non_blank(normalizer.unit),
        }
    }
}

/// Type of a `normalizer` attribute.
pub fn normalizer_type() -> AttributeType {
    AttributeType::object_of([
        ("type", AttributeType::String),
        ("unit", AttributeType::String),
    ])
}

// Teams filter

const SPECIFIC_TEAMS: &str = "specific-teams";
const TEAMS_FILTER_TYPES: &[&str] = &[SPECIFIC_TEAMS, "all-teams", "all-public-teams"];

/// `teams_filter` as configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamsFilterModel {
    /// `specific-teams`, `all-teams` or `all-public-teams`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Team ids, required for `specific-teams`.
    #[serde(default)]
    pub teams: Option<Vec<String>>,
}

/// Teams filter as sent to the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamsFilter {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teams: Option<Vec<String>>,
}

impl TeamsFilterModel {
    /// Validate and convert. `teams` is only sent for `specific-teams`.
    pub fn expand(&self, path: &str) -> Result<TeamsFilter, ProviderError> {
        check_allowed(&join_path(path, "type"), &self.kind, TEAMS_FILTER_TYPES)?;
        if self.kind != SPECIFIC_TEAMS {
            return Ok(TeamsFilter {
                kind: self.kind.clone(),
                teams: None,
            });
        }
        match &self.teams {
            Some(teams) if !teams.is_empty() => {
                if teams.len() > 100 {
                    return Err(ProviderError::invalid(
                        join_path(path, "teams"),
                        "at most 100 teams are allowed",
                    ));
                }
                Ok(TeamsFilter {
                    kind: self.kind.clone(),
                    teams: Some(teams.clone()),
                })
            }
            Some(_) => Err(ProviderError::invalid(
                join_path(path, "teams"),
                "teams must contain at least one team id when type is 'specific-teams'",
            )),
            None => Err(ProviderError::invalid(
                join_path(path, "teams"),
                "teams is required when type is 'specific-teams'",
            )),
        }
    }
}

impl From<TeamsFilter> for TeamsFilterModel {
    fn from(filter: TeamsFilter) -> Self {
        Self {
            kind: filter.kind,
            teams: non_empty(filter.teams),
        }
    }
}

/// Type of a `teams_filter` attribute.
pub fn teams_filter_type() -> AttributeType {
    AttributeType::object_of([
        ("type", AttributeType::String),
        ("teams", AttributeType::list(AttributeType::String)),
    ])
}

// Query functions

/// Query function on the wire, e.g. `{"type":"rolling","window":"5m"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_count_aggregate_wire_format() {
        let model: AggregateModel = serde_json::from_value(json!({"count": {}})).unwrap();
        let wire = serde_json::to_value(model.expand("aggregate").unwrap()).unwrap();
        assert_eq!(wire, json!({"type": "count"}));
    }

    #[test]
    fn test_field_aggregate_wire_format() {
        let model: AggregateModel =
            serde_json::from_value(json!({"sum": {"field": "duration"}, "count": null})).unwrap();
        let wire = serde_json::to_value(model.expand("aggregate").unwrap()).unwrap();
        assert_eq!(wire, json!({"type": "sum", "field": "duration"}));

        let model: AggregateModel =
            serde_json::from_value(json!({"unique_count": {"field": "user"}})).unwrap();
        let wire = serde_json::to_value(model.expand("aggregate").unwrap()).unwrap();
        assert_eq!(wire, json!({"type": "unique-count", "field": "user"}));
    }

    #[test]
    fn test_percentile_aggregate_wire_format() {
        let model: AggregateModel = serde_json::from_value(
            json!({"percentile": {"field": "duration", "percentile": 99.0}}),
        )
        .unwrap();
        let wire = serde_json::to_value(model.expand("aggregate").unwrap()).unwrap();
        assert_eq!(
            wire,
            json!({"type": "percentile", "field": "duration", "percentile": 99.0})
        );
    }

    #[test]
    fn test_aggregate_requires_exactly_one() {
        let err = AggregateModel::default().expand("graphs.0.aggregate").unwrap_err();
        assert_eq!(err.attribute_path(), Some("graphs.0.aggregate"));
        assert!(err.to_string().contains("found none"));

        let model: AggregateModel =
            serde_json::from_value(json!({"count": {}, "max": {"field": "x"}})).unwrap();
        let err = model.expand("aggregate").unwrap_err();
        assert!(err.to_string().contains("found 2: `count`, `max`"));
    }

    #[test]
    fn test_aggregate_flattens_to_single_slot() {
        let model = AggregateModel::from(Aggregate::Average {
            field: "latency".into(),
        });
        let value = serde_json::to_value(&model).unwrap();
        assert_eq!(value["average"], json!({"field": "latency"}));
        assert!(value["count"].is_null());
        assert!(value["percentile"].is_null());
    }

    #[test]
    fn test_teams_filter_specific_requires_teams() {
        let model = TeamsFilterModel {
            kind: "specific-teams".into(),
            teams: None,
        };
        let err = model.expand("teams_filter").unwrap_err();
        assert_eq!(err.attribute_path(), Some("teams_filter.teams"));

        let model = TeamsFilterModel {
            kind: "specific-teams".into(),
            teams: Some(vec![]),
        };
        assert!(model.expand("teams_filter").is_err());
    }

    #[test]
    fn test_teams_filter_only_sends_teams_for_specific() {
        let model = TeamsFilterModel {
            kind: "all-teams".into(),
            teams: Some(vec!["t1".into()]),
        };
        let wire = serde_json::to_value(model.expand("teams_filter").unwrap()).unwrap();
        assert_eq!(wire, json!({"type": "all-teams"}));

        let model = TeamsFilterModel {
            kind: "specific-teams".into(),
            teams: Some(vec!["t1".into()]),
        };
        let wire = serde_json::to_value(model.expand("teams_filter").unwrap()).unwrap();
        assert_eq!(wire, json!({"type": "specific-teams", "teams": ["t1"]}));
    }

    #[test]
    fn test_teams_filter_rejects_unknown_type() {
        let model = TeamsFilterModel {
            kind: "some-teams".into(),
            teams: None,
        };
        let err = model.expand("teams_filter").unwrap_err();
        assert_eq!(err.attribute_path(), Some("teams_filter.type"));
    }

    #[test]
    fn test_normalizer_round_trip() {
        let model = NormalizerModel {
            kind: "data".into(),
            unit: None,
        };
        let wire = model.expand("normalizer").unwrap();
        assert_eq!(serde_json::to_value(&wire).unwrap(), json!({"type": "data"}));
        assert_eq!(NormalizerModel::from(wire), model);

        let bad = NormalizerModel {
            kind: "percent".into(),
            unit: None,
        };
        assert!(bad.expand("normalizer").is_err());
    }

    #[test]
    fn test_check_tags() {
        let tags = vec![Tag {
            key: String::new(),
            value: "v".into(),
        }];
        let err = check_tags("tags", Some(&tags)).unwrap_err();
        assert_eq!(err.attribute_path(), Some("tags.0.key"));
        assert!(check_tags("tags", None).is_ok());
    }

    #[test]
    fn test_check_tags_counts_characters() {
        let tags = vec![Tag {
            key: "é".repeat(128),
            value: "日".repeat(256),
        }];
        assert!(check_tags("tags", Some(&tags)).is_ok());

        let tags = vec![Tag {
            key: "é".repeat(129),
            value: String::new(),
        }];
        let err = check_tags("tags", Some(&tags)).unwrap_err();
        assert_eq!(err.attribute_path(), Some("tags.0.key"));
    }

    #[test]
    fn test_group_by_accepts_null_fields() {
        let group_by: GroupBy = serde_json::from_value(json!({"fields": null, "limit": 10})).unwrap();
        assert!(group_by.fields.is_empty());
    }
}
