//! Tool system - definitions, argument validation, and the catalog

mod args;
mod catalog;
mod definition;
pub mod ransomware_live;
pub mod records;

pub use args::ToolArgs;
pub use catalog::ToolCatalog;
pub use definition::{Case, ParamSpec, ParamType, PostFn, RouteFn, ToolDefinition, ToolSummary, TtlClass};
