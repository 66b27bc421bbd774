//! `tsuga_dashboard`.

use serde::{Deserialize, Serialize};

use super::common::{
    aggregate_type, check_allowed, check_length, check_max_items, check_tags, group_by_type,
    non_blank, non_empty, normalizer_type, null_as_default, tags_attribute, Aggregate,
    AggregateModel, Function, GroupBy, Normalizer, NormalizerModel, Tag,
};
use super::Resource;
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeType, Diagnostic, Schema};
use crate::validation::{index_path, join_path, one_of};

const SOURCES: &[&str] = &["logs", "metrics", "traces"];
const FUNCTION_TYPES: &[&str] = &["per-second", "per-minute", "per-hour", "rate", "rolling"];
const OPERATORS: &[&str] = &[
    "greater_than",
    "less_than",
    "equal",
    "not_equal",
    "greater_than_or_equal",
    "less_than_or_equal",
];
const CONDITION_COLORS: &[&str] = &["alert", "warning", "success"];
const BACKGROUND_MODES: &[&str] = &["background", "no-background"];
const TIME_BUCKET_UNITS: &[&str] = &["sec", "min", "hour", "day"];
const NOTE_ALIGNMENTS: &[&str] = &["flex-start", "center", "flex-end"];
const NOTE_COLORS: &[&str] = &[
    "white",
    "gray.100",
    "amber.200",
    "lime.200",
    "emerald.200",
    "cyan.200",
    "blue.200",
    "violet.200",
    "fuchsia.200",
    "pink.200",
    "red.200",
];

/// A dashboard and its graphs.
pub struct Dashboard;

/// Dashboard configuration and state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DashboardModel {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub owner: String,
    #[serde(default)]
    pub filters: Option<Vec<String>>,
    #[serde(default)]
    pub tags: Option<Vec<Tag>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub graphs: Vec<GraphModel>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphModel {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub layout: Option<Layout>,
    pub visualization: VisualizationModel,
}

/// Grid position. Same shape in configuration and on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// `visualization`: exactly one member is set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VisualizationModel {
    #[serde(default)]
    pub timeseries: Option<SeriesModel>,
    #[serde(default)]
    pub top_list: Option<SeriesModel>,
    #[serde(default)]
    pub pie: Option<SeriesModel>,
    #[serde(default)]
    pub bar: Option<BarModel>,
    #[serde(default)]
    pub query_value: Option<QueryValueModel>,
    #[serde(default)]
    pub list: Option<ListModel>,
    #[serde(default)]
    pub note: Option<NoteModel>,
}

/// Fields shared by the series visualizations.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SeriesModel {
    /// `logs`, `metrics` or `traces`.
    pub source: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub queries: Vec<QueryModel>,
    #[serde(default)]
    pub formula: Option<String>,
    #[serde(default)]
    pub visible_series: Option<Vec<bool>>,
    #[serde(default)]
    pub group_by: Option<Vec<GroupBy>>,
    #[serde(default)]
    pub normalizer: Option<NormalizerModel>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryModel {
    pub aggregate: AggregateModel,
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default)]
    pub functions: Option<Vec<FunctionModel>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionModel {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub window: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BarModel {
    #[serde(flatten)]
    pub series: SeriesModel,
    pub time_bucket: TimeBucket,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryValueModel {
    #[serde(flatten)]
    pub series: SeriesModel,
    #[serde(default)]
    pub background_mode: Option<String>,
    #[serde(default)]
    pub conditions: Option<Vec<ValueCondition>>,
}

/// Bar width. Same shape in configuration and on the wire.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TimeBucket {
    pub time: f64,
    /// `sec`, `min`, `hour` or `day`.
    pub metric: String,
}

/// Query value coloring rule. Same shape in configuration and on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueCondition {
    pub operator: String,
    pub value: f64,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ListModel {
    /// Only `logs`.
    pub source: String,
    pub query: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub list_columns: Vec<ListColumnModel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListColumnModel {
    pub attribute: String,
    #[serde(default)]
    pub normalizer: Option<NormalizerModel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NoteModel {
    pub note: String,
    #[serde(default)]
    pub note_align: Option<String>,
    #[serde(default)]
    pub note_justify_content: Option<String>,
    #[serde(default)]
    pub note_color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireQuery {
    pub aggregate: Aggregate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub functions: Option<Vec<Function>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireSeries {
    pub source: String,
    #[serde(default)]
    pub queries: Vec<WireQuery>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_series: Option<Vec<bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<Vec<GroupBy>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalizer: Option<Normalizer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireListColumn {
    pub attribute: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalizer: Option<Normalizer>,
}

/// Visualization on the wire, tagged by `type`. Any other type fails to
/// parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum WireVisualization {
    Timeseries(WireSeries),
    TopList(WireSeries),
    Pie(WireSeries),
    Bar {
        #[serde(flatten)]
        series: WireSeries,
        time_bucket: TimeBucket,
    },
    QueryValue {
        #[serde(flatten)]
        series: WireSeries,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        background_mode: Option<String>,
        #[serde(default)]
        conditions: Vec<ValueCondition>,
    },
    List {
        source: String,
        query: String,
        #[serde(default)]
        list_columns: Vec<WireListColumn>,
    },
    Note {
        note: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note_align: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note_justify_content: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note_color: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireGraph {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<Layout>,
    pub visualization: WireVisualization,
}

/// Request body and API entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardBody {
    #[serde(default, skip_serializing)]
    pub id: Option<String>,
    pub name: String,
    pub owner: String,
    #[serde(default)]
    pub filters: Vec<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub graphs: Vec<WireGraph>,
}

fn check_optional_allowed(
    path: &str,
    value: Option<&String>,
    allowed: &[&str],
) -> Result<(), ProviderError> {
    match value {
        Some(value) => check_allowed(path, value, allowed),
        None => Ok(()),
    }
}

fn expand_normalizer(
    path: &str,
    normalizer: Option<&NormalizerModel>,
) -> Result<Option<Normalizer>, ProviderError> {
    normalizer.map(|n| n.expand(path)).transpose()
}

impl FunctionModel {
    fn expand(&self, path: &str) -> Result<Function, ProviderError> {
        check_allowed(&join_path(path, "type"), &self.kind, FUNCTION_TYPES)?;
        let window = non_blank(self.window.clone());
        if self.kind == "rolling" && window.is_none() {
            return Err(ProviderError::invalid(
                join_path(path, "window"),
                "required when type is 'rolling'",
            ));
        }
        Ok(Function {
            kind: self.kind.clone(),
            window,
        })
    }
}

impl From<Function> for FunctionModel {
    fn from(function: Function) -> Self {
        Self {
            kind: function.kind,
            window: non_blank(function.window),
        }
    }
}

impl QueryModel {
    fn expand(&self, path: &str) -> Result<WireQuery, ProviderError> {
        let aggregate = self.aggregate.expand(&join_path(path, "aggregate"))?;
        if let Some(filter) = &self.filter {
            check_length(&join_path(path, "filter"), filter, 0, 10_000)?;
        }
        let functions = match &self.functions {
            Some(functions) => {
                let functions_path = join_path(path, "functions");
                check_max_items(&functions_path, functions.len(), 10)?;
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
        Ok(WireQuery {
            aggregate,
            filter: self.filter.clone(),
            functions,
        })
    }
}

impl From<WireQuery> for QueryModel {
    fn from(wire: WireQuery) -> Self {
        Self {
            aggregate: wire.aggregate.into(),
            filter: non_blank(wire.filter),
            functions: non_empty(wire.functions)
                .map(|functions| functions.into_iter().map(FunctionModel::from).collect()),
        }
    }
}

impl SeriesModel {
    fn expand(&self, path: &str) -> Result<WireSeries, ProviderError> {
        check_allowed(&join_path(path, "source"), &self.source, SOURCES)?;
        let queries_path = join_path(path, "queries");
        check_max_items(&queries_path, self.queries.len(), 15)?;
        let queries = self
            .queries
            .iter()
            .enumerate()
            .map(|(i, q)| q.expand(&index_path(&queries_path, i)))
            .collect::<Result<Vec<_>, _>>()?;
        if let Some(formula) = &self.formula {
            check_length(&join_path(path, "formula"), formula, 0, 250)?;
        }
        if let Some(group_by) = &self.group_by {
            check_max_items(&join_path(path, "group_by"), group_by.len(), 3)?;
        }
        Ok(WireSeries {
            source: self.source.clone(),
            queries,
            formula: self.formula.clone(),
            visible_series: self.visible_series.clone(),
            group_by: self.group_by.clone(),
            normalizer: expand_normalizer(&join_path(path, "normalizer"), self.normalizer.as_ref())?,
        })
    }
}

impl From<WireSeries> for SeriesModel {
    fn from(wire: WireSeries) -> Self {
        Self {
            source: wire.source,
            queries: wire.queries.into_iter().map(QueryModel::from).collect(),
            formula: non_blank(wire.formula),
            visible_series: non_empty(wire.visible_series),
            group_by: non_empty(wire.group_by),
            normalizer: wire.normalizer.map(NormalizerModel::from),
        }
    }
}

enum Visualization<'a> {
    Series(&'a SeriesModel, fn(WireSeries) -> WireVisualization),
    Bar(&'a BarModel),
    QueryValue(&'a QueryValueModel),
    List(&'a ListModel),
    Note(&'a NoteModel),
}

impl VisualizationModel {
    fn expand(&self, path: &str) -> Result<WireVisualization, ProviderError> {
        let chosen = one_of(
            path,
            [
                (
                    "timeseries",
                    self.timeseries.as_ref().map(|m| {
                        (Visualization::Series(m, WireVisualization::Timeseries), "timeseries")
                    }),
                ),
                (
                    "top_list",
                    self.top_list
                        .as_ref()
                        .map(|m| (Visualization::Series(m, WireVisualization::TopList), "top_list")),
                ),
                (
                    "pie",
                    self.pie
                        .as_ref()
                        .map(|m| (Visualization::Series(m, WireVisualization::Pie), "pie")),
                ),
                ("bar", self.bar.as_ref().map(|m| (Visualization::Bar(m), "bar"))),
                (
                    "query_value",
                    self.query_value
                        .as_ref()
                        .map(|m| (Visualization::QueryValue(m), "query_value")),
                ),
                ("list", self.list.as_ref().map(|m| (Visualization::List(m), "list"))),
                ("note", self.note.as_ref().map(|m| (Visualization::Note(m), "note"))),
            ],
        )?;
        let (visualization, slot) = chosen;
        let path = join_path(path, slot);
        match visualization {
            Visualization::Series(model, wrap) => Ok(wrap(model.expand(&path)?)),
            Visualization::Bar(bar) => {
                check_allowed(
                    &join_path(&path, "time_bucket.metric"),
                    &bar.time_bucket.metric,
                    TIME_BUCKET_UNITS,
                )?;
                Ok(WireVisualization::Bar {
                    series: bar.series.expand(&path)?,
                    time_bucket: bar.time_bucket.clone(),
                })
            }
            Visualization::QueryValue(model) => {
                check_optional_allowed(
                    &join_path(&path, "background_mode"),
                    model.background_mode.as_ref(),
                    BACKGROUND_MODES,
                )?;
                let conditions = model.conditions.clone().unwrap_or_default();
                for (i, condition) in conditions.iter().enumerate() {
                    let condition_path = index_path(&join_path(&path, "conditions"), i);
                    check_allowed(
                        &join_path(&condition_path, "operator"),
                        &condition.operator,
                        OPERATORS,
                    )?;
                    check_allowed(
                        &join_path(&condition_path, "color"),
                        &condition.color,
                        CONDITION_COLORS,
                    )?;
                }
                Ok(WireVisualization::QueryValue {
                    series: model.series.expand(&path)?,
                    background_mode: model.background_mode.clone(),
                    conditions,
                })
            }
            Visualization::List(list) => {
                check_allowed(&join_path(&path, "source"), &list.source, &["logs"])?;
                check_length(&join_path(&path, "query"), &list.query, 0, 10_000)?;
                let list_columns = list
                    .list_columns
                    .iter()
                    .enumerate()
                    .map(|(i, column)| {
                        let column_path = index_path(&join_path(&path, "list_columns"), i);
                        Ok(WireListColumn {
                            attribute: column.attribute.clone(),
                            normalizer: expand_normalizer(
                                &join_path(&column_path, "normalizer"),
                                column.normalizer.as_ref(),
                            )?,
                        })
                    })
                    .collect::<Result<Vec<_>, ProviderError>>()?;
                Ok(WireVisualization::List {
                    source: list.source.clone(),
                    query: list.query.clone(),
                    list_columns,
                })
            }
            Visualization::Note(note) => {
                check_length(&join_path(&path, "note"), &note.note, 0, 50_000)?;
                check_optional_allowed(
                    &join_path(&path, "note_align"),
                    note.note_align.as_ref(),
                    NOTE_ALIGNMENTS,
                )?;
                check_optional_allowed(
                    &join_path(&path, "note_justify_content"),
                    note.note_justify_content.as_ref(),
                    NOTE_ALIGNMENTS,
                )?;
                check_optional_allowed(
                    &join_path(&path, "note_color"),
                    note.note_color.as_ref(),
                    NOTE_COLORS,
                )?;
                Ok(WireVisualization::Note {
                    note: note.note.clone(),
                    note_align: note.note_align.clone(),
                    note_justify_content: note.note_justify_content.clone(),
                    note_color: note.note_color.clone(),
                })
            }
        }
    }
}

impl From<WireVisualization> for VisualizationModel {
    fn from(wire: WireVisualization) -> Self {
        let mut model = Self::default();
        match wire {
            WireVisualization::Timeseries(series) => model.timeseries = Some(series.into()),
            WireVisualization::TopList(series) => model.top_list = Some(series.into()),
            WireVisualization::Pie(series) => model.pie = Some(series.into()),
            WireVisualization::Bar {
                series,
                time_bucket,
            } => {
                model.bar = Some(BarModel {
                    series: series.into(),
                    time_bucket,
                })
            }
            WireVisualization::QueryValue {
                series,
                background_mode,
                conditions,
            } => {
                model.query_value = Some(QueryValueModel {
                    series: series.into(),
                    background_mode: non_blank(background_mode),
                    conditions: non_empty(Some(conditions)),
                })
            }
            WireVisualization::List {
                source,
                query,
                list_columns,
            } => {
                model.list = Some(ListModel {
                    source,
                    query,
                    list_columns: list_columns
                        .into_iter()
                        .map(|c| ListColumnModel {
                            attribute: c.attribute,
                            normalizer: c.normalizer.map(NormalizerModel::from),
                        })
                        .collect(),
                })
            }
            WireVisualization::Note {
                note,
                note_align,
                note_justify_content,
                note_color,
            } => {
                model.note = Some(NoteModel {
                    note,
                    note_align: non_blank(note_align),
                    note_justify_content: non_blank(note_justify_content),
                    note_color: non_blank(note_color),
                })
            }
        }
        model
    }
}

impl GraphModel {
    fn expand(&self, path: &str) -> Result<WireGraph, ProviderError> {
        check_length(&join_path(path, "id"), &self.id, 1, 250)?;
        check_length(&join_path(path, "name"), &self.name, 0, 250)?;
        Ok(WireGraph {
            id: self.id.clone(),
            name: self.name.clone(),
            layout: self.layout.clone(),
            visualization: self.visualization.expand(&join_path(path, "visualization"))?,
        })
    }
}

fn series_attributes() -> Vec<(&'static str, AttributeType)> {
    let function = AttributeType::object_of([
        ("type", AttributeType::String),
        ("window", AttributeType::String),
    ]);
    let query = AttributeType::object_of([
        ("aggregate", aggregate_type()),
        ("filter", AttributeType::String),
        ("functions", AttributeType::list(function)),
    ]);
    vec![
        ("source", AttributeType::String),
        ("queries", AttributeType::list(query)),
        ("formula", AttributeType::String),
        ("visible_series", AttributeType::list(AttributeType::Bool)),
        ("group_by", AttributeType::list(group_by_type())),
        ("normalizer", normalizer_type()),
    ]
}

fn visualization_type() -> AttributeType {
    let series = || AttributeType::object_of(series_attributes());
    let mut bar = series_attributes();
    bar.push((
        "time_bucket",
        AttributeType::object_of([
            ("time", AttributeType::Float64),
            ("metric", AttributeType::String),
        ]),
    ));
    let mut query_value = series_attributes();
    query_value.push(("background_mode", AttributeType::String));
    query_value.push((
        "conditions",
        AttributeType::list(AttributeType::object_of([
            ("operator", AttributeType::String),
            ("value", AttributeType::Float64),
            ("color", AttributeType::String),
        ])),
    ));
    let list = AttributeType::object_of([
        ("source", AttributeType::String),
        ("query", AttributeType::String),
        (
            "list_columns",
            AttributeType::list(AttributeType::object_of([
                ("attribute", AttributeType::String),
                ("normalizer", normalizer_type()),
            ])),
        ),
    ]);
    let note = AttributeType::object_of([
        ("note", AttributeType::String),
        ("note_align", AttributeType::String),
        ("note_justify_content", AttributeType::String),
        ("note_color", AttributeType::String),
    ]);
    AttributeType::object_of([
        ("timeseries", series()),
        ("top_list", series()),
        ("pie", series()),
        ("bar", AttributeType::object_of(bar)),
        ("query_value", AttributeType::object_of(query_value)),
        ("list", list),
        ("note", note),
    ])
}

fn graph_type() -> AttributeType {
    AttributeType::object_of([
        ("id", AttributeType::String),
        ("name", AttributeType::String),
        (
            "layout",
            AttributeType::object_of([
                ("x", AttributeType::Float64),
                ("y", AttributeType::Float64),
                ("w", AttributeType::Float64),
                ("h", AttributeType::Float64),
            ]),
        ),
        ("visualization", visualization_type()),
    ])
}

impl Resource for Dashboard {
    const TYPE_NAME: &'static str = "tsuga_dashboard";
    const PATH: &'static str = "/v1/dashboards";

    type Model = DashboardModel;
    type Request = DashboardBody;
    type Response = DashboardBody;

    fn schema() -> Schema {
        Schema::v0()
            .with_description("A dashboard of graphs over logs, metrics and traces")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string())
            .with_attribute(
                "owner",
                Attribute::required_string().with_description("Team owning the dashboard"),
            )
            .with_attribute(
                "filters",
                Attribute::optional(AttributeType::list(AttributeType::String)),
            )
            .with_attribute("tags", tags_attribute())
            .with_attribute(
                "graphs",
                Attribute::required(AttributeType::list(graph_type())).with_description(
                    "Each visualization sets exactly one of timeseries, top_list, pie, bar, \
                     query_value, list or note",
                ),
            )
    }

    fn expand(model: &DashboardModel) -> Result<DashboardBody, ProviderError> {
        check_length("name", &model.name, 0, 250)?;
        check_length("owner", &model.owner, 0, 250)?;
        let filters = model.filters.clone().unwrap_or_default();
        check_max_items("filters", filters.len(), 10)?;
        check_tags("tags", model.tags.as_ref())?;
        let graphs = model
            .graphs
            .iter()
            .enumerate()
            .map(|(i, graph)| graph.expand(&index_path("graphs", i)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(DashboardBody {
            id: None,
            name: model.name.clone(),
            owner: model.owner.clone(),
            filters,
            tags: model.tags.clone().unwrap_or_default(),
            graphs,
        })
    }

    fn flatten(
        response: DashboardBody,
        _prior: Option<&DashboardModel>,
    ) -> Result<(DashboardModel, Vec<Diagnostic>), ProviderError> {
        let id = response
            .id
            .ok_or_else(|| ProviderError::Parse("dashboard response has no id".to_string()))?;
        let graphs = response
            .graphs
            .into_iter()
            .map(|graph| GraphModel {
                id: graph.id,
                name: graph.name,
                layout: graph.layout,
                visualization: graph.visualization.into(),
            })
            .collect();
        Ok((
            DashboardModel {
                id: Some(id),
                name: response.name,
                owner: response.owner,
                filters: non_empty(Some(response.filters)),
                tags: non_empty(Some(response.tags)),
                graphs,
            },
            Vec::new(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn dashboard() -> Value {
        json!({
            "name": "Service overview",
            "owner": "team-1",
            "graphs": [
                {"id": "g1", "name": "Requests", "layout": {"x": 0.0, "y": 0.0, "w": 6.0, "h": 4.0},
                 "visualization": {"timeseries": {
                    "source": "logs",
                    "queries": [{"aggregate": {"count": {}}, "filter": "service:api",
                                 "functions": [{"type": "rolling", "window": "5m"}]}],
                    "group_by": [{"fields": ["status"], "limit": 5}]
                 }}},
                {"id": "g2", "name": "Latency", "visualization": {"bar": {
                    "source": "traces",
                    "queries": [{"aggregate": {"average": {"field": "duration"}}}],
                    "time_bucket": {"time": 1.0, "metric": "hour"}
                }}},
                {"id": "g3", "name": "Errors", "visualization": {"query_value": {
                    "source": "logs",
                    "queries": [{"aggregate": {"count": {}}}],
                    "background_mode": "background",
                    "conditions": [{"operator": "greater_than", "value": 10.0, "color": "alert"}]
                }}},
                {"id": "g4", "name": "Recent", "visualization": {"list": {
                    "source": "logs", "query": "level:error",
                    "list_columns": [{"attribute": "duration", "normalizer": {"type": "duration", "unit": "ms"}}]
                }}},
                {"id": "g5", "name": "Readme", "visualization": {"note": {
                    "note": "On-call notes", "note_color": "amber.200"
                }}}
            ]
        })
    }

    #[test]
    fn test_dashboard_is_valid() {
        let diagnostics = Dashboard::validate(&dashboard());
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
    }

    #[test]
    fn test_visualization_wire_format() {
        let model: DashboardModel = serde_json::from_value(dashboard()).unwrap();
        let body = serde_json::to_value(Dashboard::expand(&model).unwrap()).unwrap();
        let graphs = &body["graphs"];
        assert_eq!(graphs[0]["visualization"]["type"], "timeseries");
        assert_eq!(
            graphs[0]["visualization"]["queries"][0]["aggregate"],
            json!({"type": "count"})
        );
        assert_eq!(
            graphs[0]["visualization"]["groupBy"],
            json!([{"fields": ["status"], "limit": 5}])
        );
        assert_eq!(graphs[1]["visualization"]["type"], "bar");
        assert_eq!(
            graphs[1]["visualization"]["timeBucket"],
            json!({"time": 1.0, "metric": "hour"})
        );
        assert_eq!(graphs[2]["visualization"]["type"], "query-value");
        assert_eq!(graphs[2]["visualization"]["backgroundMode"], "background");
        assert_eq!(graphs[3]["visualization"]["listColumns"][0]["attribute"], "duration");
        assert_eq!(graphs[4]["visualization"]["noteColor"], "amber.200");
        assert!(graphs[1].get("layout").is_none());
    }

    #[test]
    fn test_round_trip() {
        let model: DashboardModel = serde_json::from_value(dashboard()).unwrap();
        let mut body = serde_json::to_value(Dashboard::expand(&model).unwrap()).unwrap();
        body["id"] = json!("dash-1");
        let response: DashboardBody = serde_json::from_value(body).unwrap();
        let (state, _) = Dashboard::flatten(response, None).unwrap();
        assert_eq!(state.id.as_deref(), Some("dash-1"));
        assert_eq!(state.graphs, model.graphs);
        assert!(state.filters.is_none());
    }

    #[test]
    fn test_visualization_is_oneof() {
        let mut value = dashboard();
        value["graphs"][4]["visualization"]["pie"] =
            value["graphs"][0]["visualization"]["timeseries"].clone();
        let diagnostics = Dashboard::validate(&value);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("graphs.4.visualization"));
    }

    #[test]
    fn test_rolling_requires_window() {
        let mut value = dashboard();
        value["graphs"][0]["visualization"]["timeseries"]["queries"][0]["functions"] =
            json!([{"type": "rolling"}]);
        let diagnostics = Dashboard::validate(&value);
        assert_eq!(
            diagnostics[0].attribute.as_deref(),
            Some("graphs.0.visualization.timeseries.queries.0.functions.0.window")
        );
    }

    #[test]
    fn test_unknown_visualization_type_fails_to_parse() {
        let result = serde_json::from_value::<DashboardBody>(json!({
            "id": "dash-1", "name": "d", "owner": "team-1",
            "graphs": [{"id": "g1", "name": "x", "visualization": {"type": "heatmap"}}]
        }));
        assert!(result.is_err());
    }
}
