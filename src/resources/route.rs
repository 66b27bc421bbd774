//! `tsuga_route`: a log route and its processor tree.

use serde::{Deserialize, Serialize};

use super::common::{check_length, check_tags, non_blank, non_empty, tags_attribute, Tag};
use super::processor::{
    expand_processors, flatten_processors, processors_type, ProcessorModel, WireProcessor,
    MAX_PROCESSOR_DEPTH,
};
use super::Resource;
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeType, Diagnostic, Schema};

/// A log route.
pub struct Route;

/// Route configuration and state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RouteModel {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub is_enabled: bool,
    pub query: String,
    /// Owning team id.
    pub owner: String,
    #[serde(default)]
    pub tags: Option<Vec<Tag>>,
    #[serde(default, deserialize_with = "super::common::null_as_default")]
    pub processors: Vec<ProcessorModel>,
}

/// Route create/update body and API entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteBody {
    #[serde(default, skip_serializing)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_enabled: bool,
    pub query: String,
    pub owner: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Tag>>,
    #[serde(default)]
    pub processors: Vec<WireProcessor>,
}

impl Resource for Route {
    const TYPE_NAME: &'static str = "tsuga_route";
    const PATH: &'static str = "/v1/routes";

    type Model = RouteModel;
    type Request = RouteBody;
    type Response = RouteBody;

    fn schema() -> Schema {
        Schema::v0()
            .with_description("A log route with its processing pipeline")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("description", Attribute::optional_string())
            .with_attribute("is_enabled", Attribute::required(AttributeType::Bool))
            .with_attribute(
                "query",
                Attribute::required_string()
                    .with_description("Query selecting the logs that enter the route"),
            )
            .with_attribute(
                "owner",
                Attribute::required_string().with_description("Team owning the route"),
            )
            .with_attribute("tags", tags_attribute())
            .with_attribute(
                "processors",
                Attribute::required(processors_type()).with_description(format!(
                    "Processors applied in order. `split` nests at most {} levels deep",
                    MAX_PROCESSOR_DEPTH
                )),
            )
    }

    fn expand(model: &RouteModel) -> Result<RouteBody, ProviderError> {
        check_length("name", &model.name, 0, 250)?;
        check_length("owner", &model.owner, 1, 250)?;
        check_length("query", &model.query, 0, 50_000)?;
        check_tags("tags", model.tags.as_ref())?;
        Ok(RouteBody {
            id: None,
            name: model.name.clone(),
            description: model.description.clone(),
            is_enabled: model.is_enabled,
            query: model.query.clone(),
            owner: model.owner.clone(),
            tags: model.tags.clone(),
            processors: expand_processors(&model.processors, MAX_PROCESSOR_DEPTH, "processors")?,
        })
    }

    fn flatten(
        response: RouteBody,
        _prior: Option<&RouteModel>,
    ) -> Result<(RouteModel, Vec<Diagnostic>), ProviderError> {
        let id = response
            .id
            .ok_or_else(|| ProviderError::Parse("route response has no id".to_string()))?;
        let (processors, diagnostics) =
            flatten_processors(response.processors, MAX_PROCESSOR_DEPTH, "processors")?;
        Ok((
            RouteModel {
                id: Some(id),
                name: response.name,
                description: non_blank(response.description),
                is_enabled: response.is_enabled,
                query: response.query,
                owner: response.owner,
                tags: non_empty(response.tags),
                processors,
            },
            diagnostics,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn split(id: &str, query: &str, processors: serde_json::Value) -> serde_json::Value {
        json!({"id": id, "split": {"items": [{"query": query, "processors": processors}]}})
    }

    /// Four mappers spread over three nested splits.
    fn nested_route() -> serde_json::Value {
        let level4 = json!([
            {"id": "mapper-4", "mapper": {"map_attributes": [
                {"origin_attribute": "foo", "target_attribute": "bar"}
            ]}}
        ]);
        let level3 = json!([
            {"id": "mapper-3", "mapper": {"map_timestamp": {"attribute_name": "ts_nested"}}},
            split("splitter-3", "status:deeper", level4)
        ]);
        let level2 = json!([
            {"id": "mapper-2", "mapper": {"map_level": {"attribute_name": "level"}}},
            split("splitter-2", "status:deep", level3)
        ]);
        json!({
            "name": "nested",
            "is_enabled": true,
            "query": "*",
            "owner": "team-1",
            "processors": [
                {"id": "mapper-1", "mapper": {"map_attributes": [
                    {"origin_attribute": "orig", "target_attribute": "dest", "keep_origin": true}
                ]}},
                {"id": "parser-1", "parse_attribute": {"grok": {"attribute_name": "message", "rules": [""]}}},
                {"id": "creator-1", "creator": {"format_string": {"target_attribute": "formatted", "format_string": "val"}}},
                split("splitter-1", "status:ok", level2)
            ]
        })
    }

    #[test]
    fn test_nested_route_is_valid() {
        let diagnostics = Route::validate(&nested_route());
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
    }

    #[test]
    fn test_nested_route_round_trips() {
        let model: RouteModel = serde_json::from_value(nested_route()).unwrap();
        let mut body = serde_json::to_value(Route::expand(&model).unwrap()).unwrap();
        body["id"] = json!("route-1");
        let response: RouteBody = serde_json::from_value(body).unwrap();
        let (back, diagnostics) = Route::flatten(response, Some(&model)).unwrap();
        assert!(diagnostics.is_empty());
        assert_eq!(back.id.as_deref(), Some("route-1"));
        assert_eq!(back.processors, model.processors);

        let top = &back.processors;
        assert_eq!(top.len(), 4);
        let level2 = &top[3].split.as_ref().unwrap().items[0].processors;
        assert_eq!(level2[0].id, "mapper-2");
        let level3 = &level2[1].split.as_ref().unwrap().items[0].processors;
        assert_eq!(level3[0].id, "mapper-3");
        let level4 = &level3[1].split.as_ref().unwrap().items[0].processors;
        assert_eq!(level4[0].id, "mapper-4");
    }

    #[test]
    fn test_body_wire_format() {
        let model: RouteModel = serde_json::from_value(nested_route()).unwrap();
        let body = serde_json::to_value(Route::expand(&model).unwrap()).unwrap();
        assert!(body.get("id").is_none());
        assert_eq!(body["isEnabled"], true);
        assert_eq!(body["processors"][3]["type"], "split");
        assert_eq!(
            body["processors"][3]["params"]["items"][0]["query"],
            "status:ok"
        );
        assert_eq!(body["processors"][1]["params"]["subtype"], "grok");
    }

    #[test]
    fn test_schema_rejects_split_below_last_level() {
        // Nine nested splits: the innermost `split` is declared as an empty object.
        let mut processors = json!([{"id": "leaf", "mapper": {"map_level": {"attribute_name": "l"}}}]);
        for level in 0..=MAX_PROCESSOR_DEPTH {
            processors = json!([{
                "id": format!("splitter-{level}"),
                "split": {"items": [{"query": "*", "processors": processors}]}
            }]);
        }
        let diagnostics = Route::validate(&json!({
            "name": "too deep", "is_enabled": true, "query": "*", "owner": "team-1",
            "processors": processors
        }));
        assert!(!diagnostics.is_empty());
    }
}
