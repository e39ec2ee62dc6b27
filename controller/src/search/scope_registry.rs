use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::Arc;

use common::filter_state::FilterSettings;
use common::suggest_state::SuggestSettings;

use crate::config::ClientConfig;
use crate::db_utils::elastic_utils::{ElasticSearchExecutor, SearchExecutor};
use crate::search::filter_scope::FilterScope;
use crate::search::suggest_scope::SuggestScope;

/// Named search scopes sharing one executor.
///
/// Binding a name that already exists replaces the old scope.
pub struct ScopeRegistry {
    executor: Arc<dyn SearchExecutor>,
    filters: BTreeMap<String, FilterScope>,
    suggests: BTreeMap<String, SuggestScope>,
}

impl ScopeRegistry {
    pub fn new(executor: Arc<dyn SearchExecutor>) -> Self {
        Self { executor, filters: BTreeMap::new(), suggests: BTreeMap::new() }
    }

    pub fn from_config(config: ClientConfig) -> anyhow::Result<Self> {
        tracing::info!("Search endpoint: {}", config.endpoint);
        let executor = ElasticSearchExecutor::new(config)?;
        Ok(Self::new(Arc::new(executor)))
    }

    pub fn bind_filter(&mut self, name: &str, settings: FilterSettings) -> &mut FilterScope {
        let scope = FilterScope::new(name, settings, self.executor.clone());
        match self.filters.entry(name.to_string()) {
            Entry::Occupied(mut entry) => {
                tracing::warn!("Filter scope [{}] rebound", name);
                entry.insert(scope);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(scope),
        }
    }

    pub fn bind_suggest(&mut self, name: &str, settings: SuggestSettings) -> &mut SuggestScope {
        let scope = SuggestScope::new(name, settings, self.executor.clone());
        match self.suggests.entry(name.to_string()) {
            Entry::Occupied(mut entry) => {
                tracing::warn!("Suggest scope [{}] rebound", name);
                entry.insert(scope);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(scope),
        }
    }

    pub fn filter(&self, name: &str) -> Option<&FilterScope> {
        self.filters.get(name)
    }

    pub fn filter_mut(&mut self, name: &str) -> Option<&mut FilterScope> {
        self.filters.get_mut(name)
    }

    pub fn suggest(&self, name: &str) -> Option<&SuggestScope> {
        self.suggests.get(name)
    }

    pub fn suggest_mut(&mut self, name: &str) -> Option<&mut SuggestScope> {
        self.suggests.get_mut(name)
    }

    pub fn remove_filter(&mut self, name: &str) -> Option<FilterScope> {
        self.filters.remove(name)
    }

    pub fn remove_suggest(&mut self, name: &str) -> Option<SuggestScope> {
        self.suggests.remove(name)
    }

    pub fn filter_names(&self) -> impl Iterator<Item = &str> {
        self.filters.keys().map(|k| k.as_str())
    }

    pub fn suggest_names(&self) -> impl Iterator<Item = &str> {
        self.suggests.keys().map(|k| k.as_str())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::test_support::{CannedExecutor, response};
    use serde_json::json;

    #[tokio::test]
    async fn scopes_share_the_executor() {
        let executor = Arc::new(CannedExecutor::default());
        executor.push_ok(response(&["a"], 1, json!({}))).await;
        executor.push_ok(response(&["b"], 1, json!({}))).await;
        let mut registry = ScopeRegistry::new(executor.clone());

        registry.bind_filter("events", FilterSettings::default());
        registry.bind_filter("posts", FilterSettings::default());
        registry.filter_mut("events").unwrap().submit().await.unwrap();
        registry.filter_mut("posts").unwrap().submit().await.unwrap();

        assert_eq!(executor.calls.lock().await.len(), 2);
        assert_eq!(registry.filter_names().collect::<Vec<_>>(), vec!["events", "posts"]);
        assert_eq!(registry.filter("posts").unwrap().view().documents[0].id.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn rebinding_replaces_the_scope() {
        let executor = Arc::new(CannedExecutor::default());
        executor.push_ok(response(&["a"], 1, json!({}))).await;
        let mut registry = ScopeRegistry::new(executor);

        registry.bind_filter("events", FilterSettings::default()).submit().await.unwrap();
        let rebound = registry.bind_filter("events", FilterSettings::default());

        assert_eq!(rebound.view().count(), 0);
        assert_eq!(registry.filter_names().count(), 1);
    }

    #[test]
    fn filter_and_suggest_names_are_separate() {
        let mut registry = ScopeRegistry::new(Arc::new(CannedExecutor::default()));
        registry.bind_suggest("site", SuggestSettings::default());
        registry.bind_filter("site", FilterSettings::default());

        assert!(registry.remove_suggest("site").is_some());
        assert!(registry.suggest("site").is_none());
        assert!(registry.filter("site").is_some());
        assert!(registry.remove_filter("missing").is_none());
    }

    #[tokio::test]
    async fn builds_from_client_config() {
        let registry = ScopeRegistry::from_config(ClientConfig::default()).unwrap();
        assert_eq!(registry.suggest_names().count(), 0);
    }
}
