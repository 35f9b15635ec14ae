// Source Registry - adding a source is an additive change

use crate::port::JobSource;
use std::sync::Arc;
use tracing::warn;

/// Ordered collection of enabled sources
#[derive(Clone, Default)]
pub struct SourceRegistry {
    sources: Vec<Arc<dyn JobSource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source; a second source with the same name is ignored
    pub fn register(&mut self, source: Arc<dyn JobSource>) -> bool {
        if self.get(source.name()).is_some() {
            warn!(source = %source.name(), "Duplicate source name ignored");
            return false;
        }
        self.sources.push(source);
        true
    }

    pub fn with(mut self, source: Arc<dyn JobSource>) -> Self {
        self.register(source);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn JobSource>> {
        self.sources.iter().find(|s| s.name() == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn JobSource>> {
        self.sources.iter()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::source::mocks::ScriptedSource;

    #[test]
    fn test_duplicate_names_are_rejected() {
        let mut registry = SourceRegistry::new();
        assert!(registry.register(Arc::new(ScriptedSource::returning("a", vec![]))));
        assert!(!registry.register(Arc::new(ScriptedSource::returning("a", vec![]))));
        assert!(registry.register(Arc::new(ScriptedSource::returning("b", vec![]))));
        assert_eq!(registry.names(), vec!["a", "b"]);
    }
}
