use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;

use dispatch_core::ToolSchema;

/// The session's view of the server's tools.
///
/// Readers take an `Arc` snapshot; a refresh swaps the whole listing in one
/// store, so no reader ever observes a half-updated catalog. Usage counters
/// live outside the listing and survive refreshes; a counter for a tool that
/// vanished from the listing is retained but hidden from [`usage_stats`]
/// until the tool reappears.
///
/// [`usage_stats`]: ToolCatalog::usage_stats
pub struct ToolCatalog {
    tools: RwLock<Arc<Vec<ToolSchema>>>,
    usage: DashMap<String, u64>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self {
            tools: RwLock::new(Arc::new(Vec::new())),
            usage: DashMap::new(),
        }
    }

    /// Swap in a fresh tool listing.
    pub fn replace(&self, tools: Vec<ToolSchema>) {
        *self.tools.write() = Arc::new(tools);
    }

    /// Empty the listing. Counters are kept.
    pub fn clear(&self) {
        *self.tools.write() = Arc::new(Vec::new());
    }

    /// A consistent point-in-time view of the listing.
    pub fn snapshot(&self) -> Arc<Vec<ToolSchema>> {
        self.tools.read().clone()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.read().iter().any(|t| t.function.name == name)
    }

    pub fn record_use(&self, name: &str) {
        *self.usage.entry(name.to_string()).or_insert(0) += 1;
    }

    pub fn usage_count(&self, name: &str) -> u64 {
        self.usage.get(name).map(|entry| *entry).unwrap_or(0)
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools
            .read()
            .iter()
            .map(|t| t.function.name.clone())
            .collect()
    }

    /// Counters for currently-listed tools only.
    pub fn usage_stats(&self) -> HashMap<String, u64> {
        let listing = self.snapshot();
        self.usage
            .iter()
            .filter(|entry| listing.iter().any(|t| &t.function.name == entry.key()))
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.read().is_empty()
    }
}

impl Default for ToolCatalog {
    fn default() -> Self {
        Self::new()
    }
}
