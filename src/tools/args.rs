//! Argument validation and canonicalization
//!
//! Raw caller arguments are checked against a tool's parameter specs, coerced
//! to the declared types, case-normalized, and defaulted. The result is kept in
//! a `BTreeMap` so its JSON encoding has a stable key order and can serve as a
//! cache key. Unknown fields are dropped.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::{McpError, Result};

use super::definition::{Case, ParamSpec, ParamType, ToolDefinition};

/// Validated, canonical arguments for one tool call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArgs {
    values: BTreeMap<String, Value>,
}

impl ToolArgs {
    /// Validate raw arguments against a tool definition
    pub fn validate(definition: &ToolDefinition, raw: &Map<String, Value>) -> Result<Self> {
        let mut values = BTreeMap::new();

        for spec in &definition.params {
            let coerced = match raw.get(&spec.name) {
                Some(value) => coerce(&definition.name, spec, value)?,
                None => None,
            };

            match coerced.or_else(|| spec.default.clone()) {
                Some(value) => {
                    values.insert(spec.name.clone(), value);
                }
                None if spec.required => {
                    return Err(McpError::InvalidArgument(format!(
                        "tool '{}' requires argument '{}'",
                        definition.name, spec.name
                    )));
                }
                None => {}
            }
        }

        Ok(Self { values })
    }

    /// Stable JSON encoding used for cache keys
    pub fn canonical(&self) -> String {
        serde_json::to_string(&self.values).unwrap_or_default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    /// A string the schema marks as required
    pub fn require_str(&self, name: &str) -> Result<&str> {
        self.str(name)
            .ok_or_else(|| McpError::InvalidArgument(format!("missing argument '{}'", name)))
    }

    /// An integer the schema marks as required
    pub fn require_int(&self, name: &str) -> Result<i64> {
        self.int(name)
            .ok_or_else(|| McpError::InvalidArgument(format!("missing argument '{}'", name)))
    }
}

/// Coerce one raw value; `Ok(None)` means "treat as absent"
fn coerce(tool: &str, spec: &ParamSpec, value: &Value) -> Result<Option<Value>> {
    if value.is_null() {
        return Ok(None);
    }

    let invalid = |expected: &str| {
        McpError::InvalidArgument(format!(
            "tool '{}' argument '{}' must be {}, got {}",
            tool, spec.name, expected, value
        ))
    };

    match spec.param_type {
        ParamType::String => {
            let text = match value {
                Value::String(s) => s.trim().to_string(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => return Err(invalid("a string")),
            };
            if text.is_empty() {
                return Ok(None);
            }

            let text = match spec.case {
                Case::Preserve => text,
                Case::Upper => text.to_uppercase(),
                Case::Lower => text.to_lowercase(),
            };

            if !spec.allowed.is_empty() && !spec.allowed.contains(&text) {
                return Err(invalid(&format!("one of [{}]", spec.allowed.join(", "))));
            }

            Ok(Some(Value::String(text)))
        }

        ParamType::Integer => {
            let number = match value {
                Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                    (Some(i), _) => i,
                    (None, Some(f)) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => f as i64,
                    _ => return Err(invalid("an integer")),
                },
                Value::String(s) if s.trim().is_empty() => return Ok(None),
                Value::String(s) => s.trim().parse::<i64>().map_err(|_| invalid("an integer"))?,
                _ => return Err(invalid("an integer")),
            };

            if spec.min.is_some_and(|min| number < min) || spec.max.is_some_and(|max| number > max) {
                let range = format!(
                    "between {} and {}",
                    spec.min.map(|v| v.to_string()).unwrap_or_else(|| "-inf".to_string()),
                    spec.max.map(|v| v.to_string()).unwrap_or_else(|| "inf".to_string())
                );
                return Err(invalid(&range));
            }

            Ok(Some(Value::from(number)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::definition::ParamSpec;
    use crate::upstream::UpstreamRequest;
    use serde_json::json;

    fn route(_args: &ToolArgs) -> Result<UpstreamRequest> {
        Ok(UpstreamRequest::get(["victims", "recent"]))
    }

    fn victims_tool() -> ToolDefinition {
        ToolDefinition::new("list-recent-victims", "Recent victims", route)
            .with_param(
                ParamSpec::string("order", "Sort order")
                    .lower()
                    .one_of(&["discovered", "attacked"])
                    .with_default(json!("discovered")),
            )
            .with_param(ParamSpec::string("country", "Country code").upper())
            .with_param(ParamSpec::integer("limit", "Max records").range(1, 1000))
    }

    fn group_tool() -> ToolDefinition {
        ToolDefinition::new("get-group-detail", "Group profile", route)
            .with_param(ParamSpec::string("name", "Group name").required())
            .with_param(ParamSpec::integer("year", "Year").range(2000, 2100))
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_defaults_applied() {
        let parsed = ToolArgs::validate(&victims_tool(), &Map::new()).unwrap();
        assert_eq!(parsed.str("order"), Some("discovered"));
        assert_eq!(parsed.canonical(), r#"{"order":"discovered"}"#);
    }

    #[test]
    fn test_case_normalization() {
        let parsed = ToolArgs::validate(&victims_tool(), &args(json!({"country": "fr", "order": "ATTACKED"}))).unwrap();
        assert_eq!(parsed.str("country"), Some("FR"));
        assert_eq!(parsed.str("order"), Some("attacked"));
    }

    #[test]
    fn test_missing_required() {
        let err = ToolArgs::validate(&group_tool(), &Map::new()).unwrap_err();
        assert!(matches!(err, McpError::InvalidArgument(_)));
        assert!(err.to_string().contains("'name'"));
    }

    #[test]
    fn test_null_and_empty_count_as_missing() {
        let err = ToolArgs::validate(&group_tool(), &args(json!({"name": null}))).unwrap_err();
        assert!(matches!(err, McpError::InvalidArgument(_)));

        let err = ToolArgs::validate(&group_tool(), &args(json!({"name": "   "}))).unwrap_err();
        assert!(matches!(err, McpError::InvalidArgument(_)));
    }

    #[test]
    fn test_unknown_fields_dropped() {
        let parsed = ToolArgs::validate(&group_tool(), &args(json!({"name": "LockBit", "colour": "red"}))).unwrap();
        assert!(parsed.get("colour").is_none());
        assert_eq!(parsed.str("name"), Some("LockBit"));
    }

    #[test]
    fn test_integer_coercion() {
        let tool = victims_tool();
        assert_eq!(ToolArgs::validate(&tool, &args(json!({"limit": 10}))).unwrap().int("limit"), Some(10));
        assert_eq!(ToolArgs::validate(&tool, &args(json!({"limit": "25"}))).unwrap().int("limit"), Some(25));
        assert_eq!(ToolArgs::validate(&tool, &args(json!({"limit": 5.0}))).unwrap().int("limit"), Some(5));
    }

    #[test]
    fn test_integer_rejects_garbage() {
        let tool = victims_tool();
        for bad in [json!("ten"), json!(2.5), json!([1]), json!({"n": 1}), json!(true)] {
            let err = ToolArgs::validate(&tool, &args(json!({ "limit": bad }))).unwrap_err();
            assert!(matches!(err, McpError::InvalidArgument(_)), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_integer_range() {
        let tool = victims_tool();
        assert!(ToolArgs::validate(&tool, &args(json!({"limit": 0}))).is_err());
        assert!(ToolArgs::validate(&tool, &args(json!({"limit": 1001}))).is_err());
        assert!(ToolArgs::validate(&tool, &args(json!({"limit": 1000}))).is_ok());
    }

    #[test]
    fn test_enum_rejects_unknown_value() {
        let err = ToolArgs::validate(&victims_tool(), &args(json!({"order": "newest"}))).unwrap_err();
        assert!(err.to_string().contains("discovered"));
    }

    #[test]
    fn test_string_coerced_from_number() {
        let parsed = ToolArgs::validate(&group_tool(), &args(json!({"name": 8}))).unwrap();
        assert_eq!(parsed.str("name"), Some("8"));
    }

    #[test]
    fn test_string_rejects_object() {
        let err = ToolArgs::validate(&group_tool(), &args(json!({"name": {"x": 1}}))).unwrap_err();
        assert!(matches!(err, McpError::InvalidArgument(_)));
    }

    #[test]
    fn test_canonical_is_order_independent() {
        let tool = victims_tool();
        let a = ToolArgs::validate(&tool, &args(json!({"country": "fr", "limit": 10}))).unwrap();
        let b = ToolArgs::validate(&tool, &args(json!({"limit": "10", "country": "FR", "order": "discovered"}))).unwrap();

        assert_eq!(a.canonical(), b.canonical());
        assert_eq!(a.canonical(), r#"{"country":"FR","limit":10,"order":"discovered"}"#);
    }

    #[test]
    fn test_require_helpers() {
        let parsed = ToolArgs::validate(&group_tool(), &args(json!({"name": "akira", "year": "2024"}))).unwrap();
        assert_eq!(parsed.require_str("name").unwrap(), "akira");
        assert_eq!(parsed.require_int("year").unwrap(), 2024);
        assert!(parsed.require_str("missing").is_err());
        assert!(parsed.require_int("name").is_err());
    }
}
