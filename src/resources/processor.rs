//! Route processors: a tree of log transformations.
//!
//! A processor performs exactly one of four operations (`mapper`,
//! `parse_attribute`, `creator`, `split`). `split` branches into items, each
//! holding its own processor list, so the configuration is a tree. The host
//! needs a finite static type for it, so the schema is unrolled to
//! [`MAX_PROCESSOR_DEPTH`] levels of `split`; below the last level `split` is
//! an empty object. Expand and flatten thread the same depth budget and fail
//! instead of truncating when it runs out.
//!
//! On the wire a processor is `{id, name?, description?, tags?, type, params}`
//! where `type` is `mapper`, `parse-attribute`, `creator` or `split` and
//! `params.subtype` picks the concrete operation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::common::{
    check_length, check_max_items, check_tags, non_blank, non_empty, null_as_default, tags_type, Tag,
};
use crate::error::ProviderError;
use crate::schema::{AttributeType, Diagnostic};
use crate::validation::{index_path, join_path, one_of};

/// How many levels of `split` a route may nest.
pub const MAX_PROCESSOR_DEPTH: usize = 8;

const MAX_PROCESSORS: usize = 50;
const MAX_SPLIT_ITEMS: usize = 11;
const MAX_GROK_RULES: usize = 5;

// Configuration model

/// A processor as configured.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProcessorModel {
    /// User-chosen id, unique within the route (for example `mapper-1`).
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<Tag>>,
    #[serde(default)]
    pub mapper: Option<MapperModel>,
    #[serde(default)]
    pub parse_attribute: Option<ParseAttributeModel>,
    #[serde(default)]
    pub creator: Option<CreatorModel>,
    #[serde(default)]
    pub split: Option<SplitModel>,
}

/// `mapper`: exactly one member is set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MapperModel {
    #[serde(default)]
    pub map_attributes: Option<Vec<MapAttributeModel>>,
    #[serde(default)]
    pub map_level: Option<AttributeNameModel>,
    #[serde(default)]
    pub map_timestamp: Option<AttributeNameModel>,
}

/// One attribute rename of `map_attributes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapAttributeModel {
    pub origin_attribute: String,
    pub target_attribute: String,
    #[serde(default)]
    pub keep_origin: Option<bool>,
    #[serde(default)]
    pub override_target: Option<bool>,
}

/// Operations that only name the attribute they read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeNameModel {
    pub attribute_name: String,
}

/// `parse_attribute`: exactly one member is set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParseAttributeModel {
    #[serde(default)]
    pub grok: Option<GrokModel>,
    #[serde(default)]
    pub url: Option<SourceAttributeModel>,
    #[serde(default)]
    pub user_agent: Option<SourceAttributeModel>,
    #[serde(default)]
    pub key_value: Option<KeyValueModel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrokModel {
    pub attribute_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rules: Vec<String>,
    #[serde(default)]
    pub samples: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceAttributeModel {
    pub source_attribute: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValueModel {
    pub source_attribute: String,
    pub target_attribute: String,
    pub key_value_splitter: String,
    pub pairs_splitter: String,
    #[serde(default)]
    pub accept_standalone_key: Option<bool>,
}

/// `creator`: exactly one member is set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CreatorModel {
    #[serde(default)]
    pub format_string: Option<FormatStringModel>,
    #[serde(default)]
    pub math_formula: Option<MathFormulaModel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatStringModel {
    pub target_attribute: String,
    pub format_string: String,
    #[serde(default)]
    pub override_target: Option<bool>,
    #[serde(default)]
    pub replace_missing_by_empty: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MathFormulaModel {
    pub target_attribute: String,
    pub formula: String,
    #[serde(default)]
    pub override_target: Option<bool>,
    #[serde(default)]
    pub replace_missing_by_0: Option<bool>,
}

/// `split`. At the last depth level this must stay empty.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SplitModel {
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<SplitItemModel>,
}

/// One branch of a split: processors applied to logs matching `query`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SplitItemModel {
    pub query: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub processors: Vec<ProcessorModel>,
}

// Wire format

/// A processor as the API sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireProcessor {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Tag>>,
    #[serde(flatten)]
    pub operation: WireOperation,
}

/// The `type`/`params` pair of a processor. Anything this provider does not
/// understand is kept as [`WireOperation::Unrecognized`] so reads of routes
/// edited by newer clients keep working.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireOperation {
    Known(ProcessorOperation),
    Unrecognized {
        #[serde(rename = "type")]
        kind: String,
        #[serde(default)]
        params: Value,
    },
}

/// A processor operation with its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "params", rename_all = "kebab-case")]
pub enum ProcessorOperation {
    Mapper(MapperParams),
    ParseAttribute(ParseAttributeParams),
    Creator(CreatorParams),
    Split(SplitParams),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "subtype", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum MapperParams {
    MapAttributes { attributes: Vec<WireMapAttribute> },
    MapLevel { attribute_name: String },
    MapTimestamp { attribute_name: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMapAttribute {
    /// Always `map-attributes`.
    pub subtype: String,
    pub origin_attribute: String,
    pub target_attribute: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_origin: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_target: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "subtype", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ParseAttributeParams {
    Grok {
        attribute_name: String,
        #[serde(default, deserialize_with = "null_as_default")]
        rules: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        samples: Option<Vec<String>>,
    },
    Url {
        source_attribute: String,
    },
    UserAgent {
        source_attribute: String,
    },
    KeyValue {
        source_attribute: String,
        target_attribute: String,
        key_value_splitter: String,
        pairs_splitter: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        accept_standalone_key: Option<bool>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "subtype", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum CreatorParams {
    FormatString {
        target_attribute: String,
        format_string: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        override_target: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        replace_missing_by_empty: Option<bool>,
    },
    MathFormula {
        target_attribute: String,
        formula: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        override_target: Option<bool>,
        #[serde(
            rename = "replaceMissingBy0",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        replace_missing_by_0: Option<bool>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitParams {
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<WireSplitItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireSplitItem {
    pub query: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub processors: Vec<WireProcessor>,
}

const KNOWN_SUBTYPES: &[(&str, &[&str])] = &[
    ("mapper", &["map-attributes", "map-level", "map-timestamp"]),
    ("parse-attribute", &["grok", "url", "user-agent", "key-value"]),
    ("creator", &["format-string", "math-formula"]),
    ("split", &[]),
];

// Schema

/// Attribute types of a processor with `depth` levels of split left.
///
/// At depth 0 `split` is an empty object, so the type graph is finite and a
/// deeper tree cannot be written down.
pub fn processor_attribute_types(depth: usize) -> HashMap<String, AttributeType> {
    let split = if depth == 0 {
        AttributeType::empty_object()
    } else {
        AttributeType::object_of([(
            "items",
            AttributeType::list(AttributeType::object_of([
                ("query", AttributeType::String),
                (
                    "processors",
                    AttributeType::list(AttributeType::object(processor_attribute_types(
                        depth - 1,
                    ))),
                ),
            ])),
        )])
    };

    let string = || AttributeType::String;
    let strings = || AttributeType::list(AttributeType::String);
    let attribute_name = || AttributeType::object_of([("attribute_name", string())]);
    let source_attribute = || AttributeType::object_of([("source_attribute", string())]);

    let mapper = AttributeType::object_of([
        (
            "map_attributes",
            AttributeType::list(AttributeType::object_of([
                ("origin_attribute", string()),
                ("target_attribute", string()),
                ("keep_origin", AttributeType::Bool),
                ("override_target", AttributeType::Bool),
            ])),
        ),
        ("map_level", attribute_name()),
        ("map_timestamp", attribute_name()),
    ]);
    let parse_attribute = AttributeType::object_of([
        (
            "grok",
            AttributeType::object_of([
                ("attribute_name", string()),
                ("rules", strings()),
                ("samples", strings()),
            ]),
        ),
        ("url", source_attribute()),
        ("user_agent", source_attribute()),
        (
            "key_value",
            AttributeType::object_of([
                ("source_attribute", string()),
                ("target_attribute", string()),
                ("key_value_splitter", string()),
                ("pairs_splitter", string()),
                ("accept_standalone_key", AttributeType::Bool),
            ]),
        ),
    ]);
    let creator = AttributeType::object_of([
        (
            "format_string",
            AttributeType::object_of([
                ("target_attribute", string()),
                ("format_string", string()),
                ("override_target", AttributeType::Bool),
                ("replace_missing_by_empty", AttributeType::Bool),
            ]),
        ),
        (
            "math_formula",
            AttributeType::object_of([
                ("target_attribute", string()),
                ("formula", string()),
                ("override_target", AttributeType::Bool),
                ("replace_missing_by_0", AttributeType::Bool),
            ]),
        ),
    ]);

    HashMap::from([
        ("id".to_string(), string()),
        ("name".to_string(), string()),
        ("description".to_string(), string()),
        ("tags".to_string(), tags_type()),
        ("mapper".to_string(), mapper),
        ("parse_attribute".to_string(), parse_attribute),
        ("creator".to_string(), creator),
        ("split".to_string(), split),
    ])
}

/// Type of a top-level `processors` attribute.
pub fn processors_type() -> AttributeType {
    AttributeType::list(AttributeType::object(processor_attribute_types(
        MAX_PROCESSOR_DEPTH,
    )))
}

// Expand

/// Convert configured processors into wire processors.
///
/// `path` is the attribute path of the list, used in error messages.
pub fn expand_processors(
    models: &[ProcessorModel],
    depth: usize,
    path: &str,
) -> Result<Vec<WireProcessor>, ProviderError> {
    check_max_items(path, models.len(), MAX_PROCESSORS)?;
    models
        .iter()
        .enumerate()
        .map(|(i, model)| expand_processor(model, depth, &index_path(path, i)))
        .collect()
}

enum Variant<'a> {
    Mapper(&'a MapperModel),
    ParseAttribute(&'a ParseAttributeModel),
    Creator(&'a CreatorModel),
    Split(&'a SplitModel),
}

fn expand_processor(
    model: &ProcessorModel,
    depth: usize,
    path: &str,
) -> Result<WireProcessor, ProviderError> {
    if model.id.is_empty() {
        return Err(ProviderError::invalid(join_path(path, "id"), "must not be empty"));
    }
    if let Some(name) = &model.name {
        check_length(&join_path(path, "name"), name, 0, 250)?;
    }
    check_tags(&join_path(path, "tags"), model.tags.as_ref())?;

    let variant = one_of(
        path,
        [
            ("mapper", model.mapper.as_ref().map(Variant::Mapper)),
            (
                "parse_attribute",
                model.parse_attribute.as_ref().map(Variant::ParseAttribute),
            ),
            ("creator", model.creator.as_ref().map(Variant::Creator)),
            ("split", model.split.as_ref().map(Variant::Split)),
        ],
    )?;

    let operation = match variant {
        Variant::Mapper(mapper) => {
            ProcessorOperation::Mapper(expand_mapper(mapper, &join_path(path, "mapper"))?)
        }
        Variant::ParseAttribute(parse) => ProcessorOperation::ParseAttribute(
            expand_parse_attribute(parse, &join_path(path, "parse_attribute"))?,
        ),
        Variant::Creator(creator) => {
            ProcessorOperation::Creator(expand_creator(creator, &join_path(path, "creator"))?)
        }
        Variant::Split(split) => {
            ProcessorOperation::Split(expand_split(split, depth, &join_path(path, "split"))?)
        }
    };

    Ok(WireProcessor {
        id: model.id.clone(),
        name: model.name.clone(),
        description: model.description.clone(),
        tags: model.tags.clone(),
        operation: WireOperation::Known(operation),
    })
}

fn expand_mapper(model: &MapperModel, path: &str) -> Result<MapperParams, ProviderError> {
    one_of(
        path,
        [
            (
                "map_attributes",
                model.map_attributes.as_ref().map(|attributes| {
                    MapperParams::MapAttributes {
                        attributes: attributes
                            .iter()
                            .map(|a| WireMapAttribute {
                                subtype: "map-attributes".to_string(),
                                origin_attribute: a.origin_attribute.clone(),
                                target_attribute: a.target_attribute.clone(),
                                keep_origin: a.keep_origin,
                                override_target: a.override_target,
                            })
                            .collect(),
                    }
                }),
            ),
            (
                "map_level",
                model.map_level.as_ref().map(|m| MapperParams::MapLevel {
                    attribute_name: m.attribute_name.clone(),
                }),
            ),
            (
                "map_timestamp",
                model.map_timestamp.as_ref().map(|m| MapperParams::MapTimestamp {
                    attribute_name: m.attribute_name.clone(),
                }),
            ),
        ],
    )
}

fn expand_parse_attribute(
    model: &ParseAttributeModel,
    path: &str,
) -> Result<ParseAttributeParams, ProviderError> {
    let params = one_of(
        path,
        [
            (
                "grok",
                model.grok.as_ref().map(|g| ParseAttributeParams::Grok {
                    attribute_name: g.attribute_name.clone(),
                    rules: g.rules.clone(),
                    samples: g.samples.clone(),
                }),
            ),
            (
                "url",
                model.url.as_ref().map(|u| ParseAttributeParams::Url {
                    source_attribute: u.source_attribute.clone(),
                }),
            ),
            (
                "user_agent",
                model.user_agent.as_ref().map(|u| ParseAttributeParams::UserAgent {
                    source_attribute: u.source_attribute.clone(),
                }),
            ),
            (
                "key_value",
                model.key_value.as_ref().map(|kv| ParseAttributeParams::KeyValue {
                    source_attribute: kv.source_attribute.clone(),
                    target_attribute: kv.target_attribute.clone(),
                    key_value_splitter: kv.key_value_splitter.clone(),
                    pairs_splitter: kv.pairs_splitter.clone(),
                    accept_standalone_key: kv.accept_standalone_key,
                }),
            ),
        ],
    )?;
    if let ParseAttributeParams::Grok { rules, samples, .. } = &params {
        if rules.is_empty() {
            return Err(ProviderError::invalid(
                join_path(path, "grok.rules"),
                "at least one rule is required",
            ));
        }
        check_max_items(&join_path(path, "grok.rules"), rules.len(), MAX_GROK_RULES)?;
        let samples = samples.as_ref().map_or(0, Vec::len);
        check_max_items(&join_path(path, "grok.samples"), samples, MAX_GROK_RULES)?;
    }
    Ok(params)
}

fn expand_creator(model: &CreatorModel, path: &str) -> Result<CreatorParams, ProviderError> {
    one_of(
        path,
        [
            (
                "format_string",
                model.format_string.as_ref().map(|f| CreatorParams::FormatString {
                    target_attribute: f.target_attribute.clone(),
                    format_string: f.format_string.clone(),
                    override_target: f.override_target,
                    replace_missing_by_empty: f.replace_missing_by_empty,
                }),
            ),
            (
                "math_formula",
                model.math_formula.as_ref().map(|m| CreatorParams::MathFormula {
                    target_attribute: m.target_attribute.clone(),
                    formula: m.formula.clone(),
                    override_target: m.override_target,
                    replace_missing_by_0: m.replace_missing_by_0,
                }),
            ),
        ],
    )
}

fn expand_split(model: &SplitModel, depth: usize, path: &str) -> Result<SplitParams, ProviderError> {
    if depth == 0 {
        return Err(depth_exceeded(path));
    }
    check_max_items(&join_path(path, "items"), model.items.len(), MAX_SPLIT_ITEMS)?;
    let items = model
        .items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let item_path = index_path(&join_path(path, "items"), i);
            Ok(WireSplitItem {
                query: item.query.clone(),
                processors: expand_processors(
                    &item.processors,
                    depth - 1,
                    &join_path(&item_path, "processors"),
                )?,
            })
        })
        .collect::<Result<_, ProviderError>>()?;
    Ok(SplitParams { items })
}

fn depth_exceeded(path: &str) -> ProviderError {
    ProviderError::invalid(
        path,
        format!(
            "depth exceeded: split processors can be nested at most {} levels deep",
            MAX_PROCESSOR_DEPTH
        ),
    )
}

// Flatten

/// Convert wire processors back into models.
///
/// Unrecognized processor types become a warning and a processor whose
/// operation slots are all null. A split below the depth budget is an error.
pub fn flatten_processors(
    wire: Vec<WireProcessor>,
    depth: usize,
    path: &str,
) -> Result<(Vec<ProcessorModel>, Vec<Diagnostic>), ProviderError> {
    let mut diagnostics = Vec::new();
    let mut models = Vec::with_capacity(wire.len());
    for (i, processor) in wire.into_iter().enumerate() {
        let model = flatten_processor(processor, depth, &index_path(path, i), &mut diagnostics)?;
        models.push(model);
    }
    Ok((models, diagnostics))
}

fn flatten_processor(
    wire: WireProcessor,
    depth: usize,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<ProcessorModel, ProviderError> {
    let mut model = ProcessorModel {
        id: wire.id,
        name: non_blank(wire.name),
        description: non_blank(wire.description),
        tags: non_empty(wire.tags),
        ..Default::default()
    };

    match wire.operation {
        WireOperation::Known(ProcessorOperation::Mapper(params)) => {
            model.mapper = Some(flatten_mapper(params));
        }
        WireOperation::Known(ProcessorOperation::ParseAttribute(params)) => {
            model.parse_attribute = Some(flatten_parse_attribute(params));
        }
        WireOperation::Known(ProcessorOperation::Creator(params)) => {
            model.creator = Some(flatten_creator(params));
        }
        WireOperation::Known(ProcessorOperation::Split(params)) => {
            model.split = Some(flatten_split(params, depth, &join_path(path, "split"), diagnostics)?);
        }
        WireOperation::Unrecognized { kind, params } => {
            diagnostics.push(unrecognized(&kind, &params, path)?);
        }
    }
    Ok(model)
}

/// Warn about an operation this provider does not know, or fail when a
/// known operation came back malformed.
fn unrecognized(kind: &str, params: &Value, path: &str) -> Result<Diagnostic, ProviderError> {
    let subtype = params.get("subtype").and_then(Value::as_str);
    let known = KNOWN_SUBTYPES.iter().find(|(k, _)| *k == kind);
    let description = match (known, subtype) {
        (None, _) => format!("processor type {:?} is not supported", kind),
        (Some((_, subtypes)), Some(subtype)) if !subtypes.contains(&subtype) => {
            format!("{} subtype {:?} is not supported", kind, subtype)
        }
        _ => {
            let reason = serde_json::from_value::<ProcessorOperation>(
                serde_json::json!({"type": kind, "params": params}),
            )
            .err()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unexpected shape".to_string());
            return Err(ProviderError::Parse(format!(
                "malformed {} processor at {}: {}",
                kind, path, reason
            )));
        }
    };
    tracing::warn!(path, "{}", description);
    Ok(Diagnostic::warning("Unsupported processor")
        .with_detail(format!(
            "{}; it is kept on the server but cannot be managed by this provider version",
            description
        ))
        .with_attribute(path))
}

fn flatten_mapper(params: MapperParams) -> MapperModel {
    let mut model = MapperModel::default();
    match params {
        MapperParams::MapAttributes { attributes } => {
            model.map_attributes = Some(
                attributes
                    .into_iter()
                    .map(|a| MapAttributeModel {
                        origin_attribute: a.origin_attribute,
                        target_attribute: a.target_attribute,
                        keep_origin: a.keep_origin,
                        override_target: a.override_target,
                    })
                    .collect(),
            );
        }
        MapperParams::MapLevel { attribute_name } => {
            model.map_level = Some(AttributeNameModel { attribute_name });
        }
        MapperParams::MapTimestamp { attribute_name } => {
            model.map_timestamp = Some(AttributeNameModel { attribute_name });
        }
    }
    model
}

fn flatten_parse_attribute(params: ParseAttributeParams) -> ParseAttributeModel {
    let mut model = ParseAttributeModel::default();
    match params {
        ParseAttributeParams::Grok {
            attribute_name,
            rules,
            samples,
        } => {
            model.grok = Some(GrokModel {
                attribute_name,
                rules,
                samples,
            });
        }
        ParseAttributeParams::Url { source_attribute } => {
            model.url = Some(SourceAttributeModel { source_attribute });
        }
        ParseAttributeParams::UserAgent { source_attribute } => {
            model.user_agent = Some(SourceAttributeModel { source_attribute });
        }
        ParseAttributeParams::KeyValue {
            source_attribute,
            target_attribute,
            key_value_splitter,
            pairs_splitter,
            accept_standalone_key,
        } => {
            model.key_value = Some(KeyValueModel {
                source_attribute,
                target_attribute,
                key_value_splitter,
                pairs_splitter,
                accept_standalone_key,
            });
        }
    }
    model
}

fn flatten_creator(params: CreatorParams) -> CreatorModel {
    let mut model = CreatorModel::default();
    match params {
        CreatorParams::FormatString {
            target_attribute,
            format_string,
            override_target,
            replace_missing_by_empty,
        } => {
            model.format_string = Some(FormatStringModel {
                target_attribute,
                format_string,
                override_target,
                replace_missing_by_empty,
            });
        }
        CreatorParams::MathFormula {
            target_attribute,
            formula,
            override_target,
            replace_missing_by_0,
        } => {
            model.math_formula = Some(MathFormulaModel {
                target_attribute,
                formula,
                override_target,
                replace_missing_by_0,
            });
        }
    }
    model
}

fn flatten_split(
    params: SplitParams,
    depth: usize,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<SplitModel, ProviderError> {
    if depth == 0 {
        return Err(depth_exceeded(path));
    }
    let mut items = Vec::with_capacity(params.items.len());
    for (i, item) in params.items.into_iter().enumerate() {
        let item_path = index_path(&join_path(path, "items"), i);
        let (processors, item_diagnostics) =
            flatten_processors(item.processors, depth - 1, &join_path(&item_path, "processors"))?;
        diagnostics.extend(item_diagnostics);
        items.push(SplitItemModel {
            query: item.query,
            processors,
        });
    }
    Ok(SplitModel { items })
}
