use std::{collections::HashMap, sync::Arc};

use crate::adapter::ChannelAdapter;

/// Maps channel selectors to adapters.
///
/// Adding a channel means adding a registration here, not growing a
/// conditional in the dispatch path. An unknown selector is a
/// whole-batch concern for the caller to surface.
#[derive(Default, Clone)]
pub struct ChannelRegistry {
    adapters: HashMap<String, Arc<dyn ChannelAdapter>>,
}

impl ChannelRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its own id. A later registration with
    /// the same id replaces the earlier one.
    pub fn register(&mut self, adapter: Arc<dyn ChannelAdapter>) {
        self.adapters.insert(adapter.id().to_string(), adapter);
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<dyn ChannelAdapter>> {
        self.adapters.get(id).cloned()
    }

    /// Registered channel selectors, sorted for stable output.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.adapters.keys().cloned().collect();
        ids.sort();
        ids
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}
