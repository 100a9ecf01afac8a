//! Resolution of module identifiers to in-process tool entry points.

use std::fmt;
use std::sync::Arc;

use hashbrown::HashMap;

use crate::outcome::ToolResult;

/// Entry point of an in-process tool. It reads its arguments and streams
/// from [`crate::ambient`].
pub type ModuleEntry = Arc<dyn Fn() -> ToolResult + Send + Sync>;

/// Maps a module identifier (e.g. `"black"`) to a runnable entry point.
pub trait ModuleLoader: Send + Sync {
    fn resolve(&self, id: &str) -> Option<ModuleEntry>;
}

/// Table-backed [`ModuleLoader`].
#[derive(Clone, Default)]
pub struct ToolRegistry {
    entries: HashMap<String, ModuleEntry>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the bundled tools (`echo`, `cat`, `pwd`, `fail`).
    #[cfg(feature = "builtins")]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::builtins::register(&mut registry);
        registry
    }

    /// Register `entry` under `id`, replacing any previous entry.
    pub fn register<F>(&mut self, id: impl Into<String>, entry: F) -> &mut Self
    where
        F: Fn() -> ToolResult + Send + Sync + 'static,
    {
        self.entries.insert(id.into(), Arc::new(entry));
        self
    }

    pub fn with<F>(mut self, id: impl Into<String>, entry: F) -> Self
    where
        F: Fn() -> ToolResult + Send + Sync + 'static,
    {
        self.register(id, entry);
        self
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Registered identifiers in sorted order.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ModuleLoader for ToolRegistry {
    fn resolve(&self, id: &str) -> Option<ModuleEntry> {
        self.entries.get(id).cloned()
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}
