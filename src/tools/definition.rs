//! Tool definitions, parameter specs and TTL classification
//!
//! A tool is a name, a parameter schema, and a pair of plain functions: one
//! mapping validated arguments to an upstream request, one (optional) shaping
//! the upstream payload with the same arguments.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::Result;
use crate::upstream::UpstreamRequest;

use super::args::ToolArgs;

/// Maps validated arguments to the upstream request shape
pub type RouteFn = fn(&ToolArgs) -> Result<UpstreamRequest>;

/// Client-side post-processing of an upstream payload
pub type PostFn = fn(Value, &ToolArgs) -> Result<Value>;

/// TTL class determines how long a tool's results stay cached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TtlClass {
    /// Fast-moving feeds - recent victims, recent press, stats
    Volatile,
    /// Searches and listings that change daily
    #[default]
    Standard,
    /// Reference data - group profiles, YARA rules, ransom notes
    Static,
    /// Never cached - connectivity checks
    Uncached,
}

impl TtlClass {
    /// Every class, shortest-lived first
    pub const ALL: [TtlClass; 4] = [Self::Volatile, Self::Standard, Self::Static, Self::Uncached];

    /// Get default TTL in seconds for this class
    pub fn default_ttl_secs(&self) -> u64 {
        match self {
            Self::Volatile => 300,
            Self::Standard => 1_800,
            Self::Static => 21_600,
            Self::Uncached => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Volatile => "volatile",
            Self::Standard => "standard",
            Self::Static => "static",
            Self::Uncached => "uncached",
        }
    }
}

/// Primitive argument types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
        }
    }
}

/// Case normalization applied to string arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Case {
    #[default]
    Preserve,
    Upper,
    Lower,
}

/// Schema for one tool argument
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub description: String,
    pub param_type: ParamType,
    pub required: bool,
    pub default: Option<Value>,
    pub case: Case,
    pub allowed: Vec<String>,
    pub min: Option<i64>,
    pub max: Option<i64>,
}

impl ParamSpec {
    fn new(name: impl Into<String>, description: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            param_type,
            required: false,
            default: None,
            case: Case::Preserve,
            allowed: Vec::new(),
            min: None,
            max: None,
        }
    }

    /// Optional string argument
    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, ParamType::String)
    }

    /// Optional integer argument
    pub fn integer(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, ParamType::Integer)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Upper-case the value (country codes)
    pub fn upper(mut self) -> Self {
        self.case = Case::Upper;
        self
    }

    /// Lower-case the value (group names, sectors, enum flags)
    pub fn lower(mut self) -> Self {
        self.case = Case::Lower;
        self
    }

    /// Restrict to a fixed set of values, compared after case normalization
    pub fn one_of(mut self, values: &[&str]) -> Self {
        self.allowed = values.iter().map(|v| v.to_string()).collect();
        self
    }

    /// Inclusive integer range
    pub fn range(mut self, min: i64, max: i64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    /// JSON schema fragment for this argument
    pub fn schema(&self) -> Value {
        let mut prop = Map::new();
        prop.insert("type".to_string(), Value::String(self.param_type.as_str().to_string()));
        prop.insert("description".to_string(), Value::String(self.description.clone()));
        if let Some(default) = &self.default {
            prop.insert("default".to_string(), default.clone());
        }
        if !self.allowed.is_empty() {
            prop.insert("enum".to_string(), json!(self.allowed));
        }
        if let Some(min) = self.min {
            prop.insert("minimum".to_string(), json!(min));
        }
        if let Some(max) = self.max {
            prop.insert("maximum".to_string(), json!(max));
        }
        Value::Object(prop)
    }
}

/// A tool definition bound to its upstream operation
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    /// Tool name (e.g., "get-group-detail")
    pub name: String,
    /// Human-readable description for the LLM
    pub description: String,
    /// Argument schema, in declaration order
    pub params: Vec<ParamSpec>,
    /// Cache TTL class
    pub ttl_class: TtlClass,
    /// Validated arguments → upstream request
    pub route: RouteFn,
    /// Optional client-side shaping of the upstream payload
    pub post: Option<PostFn>,
}

impl ToolDefinition {
    /// Create a new tool definition
    pub fn new(name: impl Into<String>, description: impl Into<String>, route: RouteFn) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params: Vec::new(),
            ttl_class: TtlClass::Standard,
            route,
            post: None,
        }
    }

    /// Add an argument
    pub fn with_param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    /// Set TTL class
    pub fn with_ttl_class(mut self, ttl_class: TtlClass) -> Self {
        self.ttl_class = ttl_class;
        self
    }

    /// Set payload post-processing
    pub fn with_post(mut self, post: PostFn) -> Self {
        self.post = Some(post);
        self
    }

    /// JSON schema for the whole argument object
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.params {
            properties.insert(param.name.clone(), param.schema());
        }
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required
        })
    }

    /// Discovery view of this tool
    pub fn summary(&self) -> ToolSummary {
        ToolSummary {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema(),
            ttl_class: self.ttl_class,
        }
    }
}

/// What callers see when enumerating tools
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSummary {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub ttl_class: TtlClass,
}
