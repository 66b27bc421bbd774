//! Configuration validation.
//!
//! Two kinds of checks live here:
//!
//! - [`validate`] checks a `serde_json::Value` against a [`Schema`]: required
//!   attributes, attribute types and unsupported object keys.
//! - [`one_of`] enforces "exactly one of N alternatives" for configuration
//!   blocks modelled as several nullable sub-blocks (aggregates,
//!   visualizations, monitor configurations, processors, ...).
//!
//! Both run before any network call.
//!
//! # Example
//!
//! ```
//! use tsuga_provider::schema::{Schema, Attribute};
//! use tsuga_provider::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("name", Attribute::required_string())
//!     .with_attribute("retention_days", Attribute::optional_int64());
//!
//! let diagnostics = validate(&schema, &json!({"name": "logs", "retention_days": 30}));
//! assert!(diagnostics.is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"name": "logs", "retention_days": "thirty"}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("retention_days".to_string()));
//! ```

use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeType, Block, Diagnostic, DiagnosticSeverity, Schema};
use serde_json::Value;
use std::collections::HashMap;

/// Validate a JSON value against a schema.
///
/// Returns a list of diagnostics for any validation errors found.
/// An empty list means the value is valid.
///
/// # Validation Rules
///
/// - Required attributes must be present and non-null
/// - Optional attributes may be absent or null
/// - Computed attributes are skipped (provider sets these)
/// - Attribute types must match the schema
/// - Object values may only carry the keys their type declares
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    validate_block(&schema.block, value, "", &mut diagnostics);
    diagnostics
}

/// Validate a JSON value against a schema, returning Ok if valid or Err with diagnostics.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// Check if a JSON value is valid against a schema.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

/// Select the single populated alternative of a oneof group.
///
/// `alternatives` pairs each attribute name with its value when set. Exactly
/// one must be `Some`; zero or several produce an
/// [`ProviderError::InvalidConfiguration`] naming `path` and the offending
/// attributes.
///
/// ```
/// use tsuga_provider::validation::one_of;
///
/// let picked = one_of("aggregate", [("count", None), ("sum", Some("duration"))]);
/// assert_eq!(picked.unwrap(), "duration");
///
/// let err = one_of::<&str, _>("aggregate", [("count", None), ("sum", None)]).unwrap_err();
/// assert!(err.to_string().contains("aggregate"));
/// ```
pub fn one_of<T, I>(path: &str, alternatives: I) -> Result<T, ProviderError>
where
    I: IntoIterator<Item = (&'static str, Option<T>)>,
{
    let mut names = Vec::new();
    let mut set = Vec::new();
    let mut chosen = None;
    for (name, value) in alternatives {
        names.push(name);
        if let Some(value) = value {
            set.push(name);
            chosen = Some(value);
        }
    }

    match (set.len(), chosen) {
        (1, Some(value)) => Ok(value),
        (0, _) => Err(ProviderError::invalid(
            path,
            format!("exactly one of {} must be set, found none", quote_all(&names)),
        )),
        (_, _) => Err(ProviderError::invalid(
            path,
            format!(
                "exactly one of {} must be set, found {}: {}",
                quote_all(&names),
                set.len(),
                quote_all(&set)
            ),
        )),
    }
}

fn quote_all(names: &[&str]) -> String {
    names
        .iter()
        .map(|name| format!("`{}`", name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Join an attribute path with a child attribute name.
pub fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", base, name)
    }
}

/// Join an attribute path with a list index.
pub fn index_path(base: &str, index: usize) -> String {
    format!("{}.{}", base, index)
}

fn validate_block(block: &Block, value: &Value, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    let obj = match value {
        Value::Object(map) => map,
        Value::Null => {
            // Null is valid for optional blocks, but we can't validate further
            return;
        }
        _ => {
            diagnostics.push(
                Diagnostic::error("Expected object")
                    .with_detail(format!("Got {}", value_type_name(value)))
                    .with_attribute_if_not_empty(path),
            );
            return;
        }
    };

    for (name, attr) in &block.attributes {
        let attr_path = join_path(path, name);
        validate_attribute(attr, obj.get(name), &attr_path, diagnostics);
    }
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    // Skip computed-only attributes (provider sets these)
    if attr.flags.computed && !attr.flags.optional && !attr.flags.required {
        return;
    }

    match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
        }
        Some(v) => validate_attribute_type(&attr.attr_type, v, path, diagnostics),
    }
}

fn validate_attribute_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    // Null is the absent value for nested attributes of every type.
    if value.is_null() {
        return;
    }

    match attr_type {
        AttributeType::String => {
            if !value.is_string() {
                diagnostics.push(type_error(path, "string", value));
            }
        }
        AttributeType::Int64 => {
            if !is_int64(value) {
                diagnostics.push(type_error(path, "int64", value));
            }
        }
        AttributeType::Float64 => {
            if !value.is_number() {
                diagnostics.push(type_error(path, "float64", value));
            }
        }
        AttributeType::Bool => {
            if !value.is_boolean() {
                diagnostics.push(type_error(path, "bool", value));
            }
        }
        AttributeType::List(element_type) => {
            if let Some(arr) = value.as_array() {
                for (i, elem) in arr.iter().enumerate() {
                    let elem_path = index_path(path, i);
                    validate_attribute_type(element_type, elem, &elem_path, diagnostics);
                }
            } else {
                diagnostics.push(type_error(path, "list", value));
            }
        }
        AttributeType::Object(attrs) => {
            if let Some(obj) = value.as_object() {
                validate_object_type(attrs, obj, path, diagnostics);
            } else {
                diagnostics.push(type_error(path, "object", value));
            }
        }
    }
}

fn validate_object_type(
    attrs: &HashMap<String, AttributeType>,
    obj: &serde_json::Map<String, Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for (name, value) in obj {
        let attr_path = join_path(path, name);
        match attrs.get(name) {
            Some(attr_type) => validate_attribute_type(attr_type, value, &attr_path, diagnostics),
            None if value.is_null() => {}
            None => diagnostics.push(
                Diagnostic::error(format!("Unsupported attribute '{}'", attr_path))
                    .with_detail(if attrs.is_empty() {
                        "No attributes are allowed here".to_string()
                    } else {
                        let mut allowed: Vec<&str> = attrs.keys().map(String::as_str).collect();
                        allowed.sort_unstable();
                        format!("Expected one of: {}", allowed.join(", "))
                    })
                    .with_attribute(attr_path),
            ),
        }
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_int64(value: &Value) -> bool {
    match value {
        Value::Number(n) => {
            if n.as_i64().is_some() {
                true
            } else if let Some(f) = n.as_f64() {
                f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64
            } else {
                false
            }
        }
        _ => false,
    }
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic {
        severity: DiagnosticSeverity::Error,
        summary: format!("Invalid type for attribute '{}'", path),
        detail: Some(format!(
            "Expected {}, got {}",
            expected,
            value_type_name(got)
        )),
        attribute: Some(path.to_string()),
    }
}

trait DiagnosticExt {
    fn with_attribute_if_not_empty(self, path: &str) -> Self;
}

impl DiagnosticExt for Diagnostic {
    fn with_attribute_if_not_empty(self, path: &str) -> Self {
        if path.is_empty() {
            self
        } else {
            self.with_attribute(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, AttributeFlags, Schema};
    use serde_json::json;

    #[test]
    fn test_validate_required_string() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());

        assert!(validate(&schema, &json!({"name": "payments"})).is_empty());

        let diagnostics = validate(&schema, &json!({}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("name".to_string()));

        let diagnostics = validate(&schema, &json!({"name": null}));
        assert_eq!(diagnostics.len(), 1);

        let diagnostics = validate(&schema, &json!({"name": 123}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Invalid type"));
    }

    #[test]
    fn test_validate_optional_attribute() {
        let schema = Schema::v0().with_attribute("priority", Attribute::optional_int64());

        assert!(validate(&schema, &json!({"priority": 2})).is_empty());
        assert!(validate(&schema, &json!({})).is_empty());
        assert!(validate(&schema, &json!({"priority": null})).is_empty());
        assert_eq!(validate(&schema, &json!({"priority": "high"})).len(), 1);
    }

    #[test]
    fn test_validate_computed_attribute_skipped() {
        let schema = Schema::v0().with_attribute("id", Attribute::computed_string());

        assert!(validate(&schema, &json!({})).is_empty());
        assert!(validate(&schema, &json!({"id": 123})).is_empty());
    }

    #[test]
    fn test_validate_int64() {
        let schema = Schema::v0().with_attribute("retention_days", Attribute::required_int64());

        assert!(validate(&schema, &json!({"retention_days": 30})).is_empty());
        assert!(validate(&schema, &json!({"retention_days": 30.0})).is_empty());
        assert_eq!(validate(&schema, &json!({"retention_days": 30.5})).len(), 1);
        assert_eq!(validate(&schema, &json!({"retention_days": "30"})).len(), 1);
    }

    #[test]
    fn test_validate_list() {
        let schema = Schema::v0().with_attribute(
            "monitor_ids",
            Attribute::new(
                AttributeType::list(AttributeType::String),
                AttributeFlags::required(),
            ),
        );

        assert!(validate(&schema, &json!({"monitor_ids": ["a", "b"]})).is_empty());
        assert!(validate(&schema, &json!({"monitor_ids": []})).is_empty());

        let diagnostics = validate(&schema, &json!({"monitor_ids": ["a", 123, "c"]}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("monitor_ids.1".to_string()));

        assert_eq!(validate(&schema, &json!({"monitor_ids": "a"})).len(), 1);
    }

    #[test]
    fn test_validate_object_type() {
        let schema = Schema::v0().with_attribute(
            "aggregate",
            Attribute::required(AttributeType::object_of([
                ("count", AttributeType::empty_object()),
                (
                    "percentile",
                    AttributeType::object_of([
                        ("field", AttributeType::String),
                        ("percentile", AttributeType::Float64),
                    ]),
                ),
            ])),
        );

        assert!(validate(
            &schema,
            &json!({"aggregate": {"percentile": {"field": "duration", "percentile": 99}}})
        )
        .is_empty());

        let diagnostics = validate(
            &schema,
            &json!({"aggregate": {"percentile": {"field": "duration", "percentile": "p99"}}}),
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].attribute,
            Some("aggregate.percentile.percentile".to_string())
        );
    }

    #[test]
    fn test_validate_object_rejects_unknown_keys() {
        let schema = Schema::v0().with_attribute(
            "split",
            Attribute::optional(AttributeType::empty_object()),
        );

        assert!(validate(&schema, &json!({"split": {}})).is_empty());
        assert!(validate(&schema, &json!({"split": {"items": null}})).is_empty());

        let diagnostics = validate(&schema, &json!({"split": {"items": []}}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("split.items".to_string()));
        assert!(diagnostics[0].summary.contains("Unsupported attribute"));
    }

    #[test]
    fn test_validate_list_of_objects() {
        let schema = Schema::v0().with_attribute(
            "targets",
            Attribute::required(AttributeType::list(AttributeType::object_of([
                ("id", AttributeType::String),
                ("rate_limit", AttributeType::object_of([("minutes", AttributeType::Int64)])),
            ]))),
        );

        assert!(validate(
            &schema,
            &json!({"targets": [{"id": "a"}, {"id": "b", "rate_limit": {"minutes": 5}}]})
        )
        .is_empty());

        let diagnostics = validate(&schema, &json!({"targets": [{"id": "a", "rate_limit": {"minutes": "5"}}]}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].attribute,
            Some("targets.0.rate_limit.minutes".to_string())
        );

        let diagnostics = validate(&schema, &json!({}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("targets".to_string()));
    }

    #[test]
    fn test_validate_multiple_errors() {
        let schema = Schema::v0()
            .with_attribute("name", Attribute::required_string())
            .with_attribute("priority", Attribute::required_int64())
            .with_attribute("enabled", Attribute::optional_bool());

        let diagnostics = validate(
            &schema,
            &json!({"name": 123, "priority": "high", "enabled": "yes"}),
        );
        assert_eq!(diagnostics.len(), 3);
    }

    #[test]
    fn test_is_valid_and_result_helpers() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());

        assert!(is_valid(&schema, &json!({"name": "test"})));
        assert!(!is_valid(&schema, &json!({})));

        assert!(validate_result(&schema, &json!({"name": "test"})).is_ok());
        assert_eq!(validate_result(&schema, &json!({})).unwrap_err().len(), 1);
    }

    #[test]
    fn test_validate_root_not_object() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());

        let diagnostics = validate(&schema, &json!("not an object"));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Expected object"));
    }

    #[test]
    fn test_one_of_accepts_exactly_one() {
        let picked = one_of("visualization", [("timeseries", None), ("top_list", Some(2))]);
        assert_eq!(picked.unwrap(), 2);
    }

    #[test]
    fn test_one_of_rejects_none_set() {
        let err = one_of::<u8, _>("graphs.0.visualization", [("timeseries", None), ("top_list", None)])
            .unwrap_err();
        assert_eq!(err.attribute_path(), Some("graphs.0.visualization"));
        assert!(err.to_string().contains("found none"));
    }

    #[test]
    fn test_one_of_rejects_several_set() {
        let err = one_of(
            "configuration",
            [("log", Some(1)), ("metric", Some(2)), ("heartbeat", None)],
        )
        .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("found 2"));
        assert!(message.contains("`log`, `metric`"));
    }

    #[test]
    fn test_path_helpers() {
        assert_eq!(join_path("", "processors"), "processors");
        assert_eq!(join_path("processors.0", "split"), "processors.0.split");
        assert_eq!(index_path("processors", 3), "processors.3");
    }
}
