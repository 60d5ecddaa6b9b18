//! Tool catalog: the fixed, ordered registry of supported operations
//!
//! Built once at startup by a sequence of `register` calls and read-only after
//! that, so it can be shared behind an `Arc` without locking.

use std::collections::HashMap;

use crate::error::{McpError, Result};

use super::definition::{ToolDefinition, ToolSummary, TtlClass};
use super::ransomware_live;

/// Catalog of tool definitions in registration order
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    tools: Vec<ToolDefinition>,
    index: HashMap<String, usize>,
}

impl ToolCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog holding every ransomware.live operation
    pub fn ransomware_live() -> Result<Self> {
        let mut catalog = Self::new();
        for definition in ransomware_live::definitions() {
            catalog.register(definition)?;
        }
        Ok(catalog)
    }

    /// Add a tool; names must be unique
    pub fn register(&mut self, definition: ToolDefinition) -> Result<()> {
        if self.index.contains_key(&definition.name) {
            return Err(McpError::DuplicateTool(definition.name));
        }
        self.index.insert(definition.name.clone(), self.tools.len());
        self.tools.push(definition);
        Ok(())
    }

    /// Get a tool by name, failing with `UnknownTool`
    pub fn lookup(&self, name: &str) -> Result<&ToolDefinition> {
        self.get(name)
            .ok_or_else(|| McpError::UnknownTool(name.to_string()))
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// Discovery summaries, in registration order
    ///
    /// The iterator borrows the catalog; call again to restart it.
    pub fn list_all(&self) -> impl Iterator<Item = ToolSummary> + '_ {
        self.tools.iter().map(ToolDefinition::summary)
    }

    /// Get all tools
    pub fn all(&self) -> impl Iterator<Item = &ToolDefinition> {
        self.tools.iter()
    }

    /// Get number of tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if catalog is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Get tools filtered by TTL class
    pub fn by_ttl_class(&self, ttl_class: TtlClass) -> Vec<&ToolDefinition> {
        self.tools.iter().filter(|t| t.ttl_class == ttl_class).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolArgs;
    use crate::upstream::UpstreamRequest;

    fn route(_args: &ToolArgs) -> Result<UpstreamRequest> {
        Ok(UpstreamRequest::get(["stats"]))
    }

    fn sample() -> ToolCatalog {
        let mut catalog = ToolCatalog::new();
        catalog
            .register(ToolDefinition::new("get-stats", "Stats", route).with_ttl_class(TtlClass::Volatile))
            .unwrap();
        catalog
            .register(ToolDefinition::new("list-active-groups", "Groups", route).with_ttl_class(TtlClass::Static))
            .unwrap();
        catalog
            .register(ToolDefinition::new("list-yara-rules", "YARA", route).with_ttl_class(TtlClass::Static))
            .unwrap();
        catalog
    }

    #[test]
    fn test_catalog_new_empty() {
        let catalog = ToolCatalog::new();
        assert!(catalog.is_empty());
        assert_eq!(catalog.len(), 0);
        assert_eq!(catalog.list_all().count(), 0);
    }

    #[test]
    fn test_register_and_lookup() {
        let catalog = sample();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.lookup("get-stats").unwrap().name, "get-stats");
        assert!(catalog.get("list-yara-rules").is_some());
    }

    #[test]
    fn test_register_duplicate() {
        let mut catalog = sample();
        let err = catalog
            .register(ToolDefinition::new("get-stats", "Again", route))
            .unwrap_err();

        assert!(matches!(err, McpError::DuplicateTool(ref name) if name == "get-stats"));
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.lookup("get-stats").unwrap().description, "Stats");
    }

    #[test]
    fn test_lookup_unknown() {
        let err = sample().lookup("get-weather").unwrap_err();
        assert!(matches!(err, McpError::UnknownTool(ref name) if name == "get-weather"));
        assert!(sample().get("get-weather").is_none());
    }

    #[test]
    fn test_list_all_order_and_restart() {
        let catalog = sample();
        let first: Vec<String> = catalog.list_all().map(|s| s.name).collect();
        let second: Vec<String> = catalog.list_all().map(|s| s.name).collect();

        assert_eq!(first, vec!["get-stats", "list-active-groups", "list-yara-rules"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_by_ttl_class() {
        let catalog = sample();
        assert_eq!(catalog.by_ttl_class(TtlClass::Static).len(), 2);
        assert_eq!(catalog.by_ttl_class(TtlClass::Volatile)[0].name, "get-stats");
        assert!(catalog.by_ttl_class(TtlClass::Uncached).is_empty());
    }

    #[test]
    fn test_ttl_classes_partition_catalog() {
        let catalog = ToolCatalog::ransomware_live().unwrap();
        let grouped: usize = TtlClass::ALL.iter().map(|&class| catalog.by_ttl_class(class).len()).sum();
        assert_eq!(grouped, catalog.len());
        assert_eq!(catalog.by_ttl_class(TtlClass::Uncached)[0].name, "validate-api-connectivity");
    }

    #[test]
    fn test_ransomware_live_catalog() {
        let catalog = ToolCatalog::ransomware_live().unwrap();
        assert_eq!(catalog.len(), 26);
        for summary in catalog.list_all() {
            assert!(catalog.lookup(&summary.name).is_ok());
        }
        assert_eq!(catalog.all().count(), 26);
    }
}
