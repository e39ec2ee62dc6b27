//! Autocomplete scope: debounced suggest queries over a shared state.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use common::suggest_state::{SuggestSettings, SuggestState};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::db_utils::elastic_utils::SearchExecutor;
use crate::search::debounce::DebounceGate;

/// Each dispatched request carries a sequence number; a response is only
/// applied if no newer input arrived while it was in flight.
pub struct SuggestScope {
    name: String,
    settings: SuggestSettings,
    state: Arc<Mutex<SuggestState>>,
    gate: DebounceGate,
    executor: Arc<dyn SearchExecutor>,
    latest_request: Arc<AtomicU64>,
}

impl SuggestScope {
    pub fn new(name: impl Into<String>, settings: SuggestSettings, executor: Arc<dyn SearchExecutor>) -> Self {
        let state = SuggestState::new(&settings);
        Self {
            name: name.into(),
            settings,
            state: Arc::new(Mutex::new(state)),
            gate: DebounceGate::new(),
            executor,
            latest_request: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &SuggestSettings {
        &self.settings
    }

    /// Shared handle for readers that render the dropdown.
    pub fn state(&self) -> Arc<Mutex<SuggestState>> {
        self.state.clone()
    }

    pub async fn snapshot(&self) -> SuggestState {
        self.state.lock().await.clone()
    }

    fn next_request(&self) -> u64 {
        self.latest_request.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Handles one keystroke. Returns the handle of the scheduled request,
    /// or `None` when the text is too short or the query cannot be built.
    pub async fn on_input(&mut self, text: &str) -> Option<JoinHandle<()>> {
        self.gate.cancel();
        let mut state = self.state.lock().await;
        state.query = text.to_string();

        if state.is_below_min_chars(text) {
            state.clear();
            self.next_request();
            return None;
        }

        let query = match self.settings.build_query(text) {
            Ok(query) => query,
            Err(e) => {
                tracing::error!("Suggest error [{}]: {}", self.name, e);
                state.loading = false;
                self.next_request();
                return None;
            }
        };
        state.loading = true;
        let request_id = self.next_request();
        drop(state);

        let latest_request = self.latest_request.clone();
        let state = self.state.clone();
        let executor = self.executor.clone();
        let result_type = self.settings.result_type();
        let name = self.name.clone();
        tracing::debug!("Suggest schedule [{}]: {:?} (#{})", name, text, request_id);

        let task = async move {
            let result = executor.execute(&query, &result_type).await;
            let mut state = state.lock().await;
            if latest_request.load(Ordering::SeqCst) != request_id {
                tracing::debug!("Suggest [{}]: dropping stale response #{}", name, request_id);
                return;
            }
            match result {
                Ok(response) => {
                    state.replace_documents(&response);
                    tracing::info!("Suggest success [{}]: {} documents", name, state.count());
                }
                Err(e) => {
                    state.loading = false;
                    tracing::error!("Suggest error [{}]: {:#}", name, e);
                }
            }
        };
        Some(self.gate.trigger(Duration::from_millis(self.settings.timeout_ms), task))
    }

    /// Hides the dropdown and forgets any request still pending.
    pub async fn dismiss(&mut self) {
        self.gate.cancel();
        self.next_request();
        self.state.lock().await.clear();
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::test_support::{CannedExecutor, EchoExecutor, response};
    use common::search_query::Query;
    use serde_json::json;

    fn scope_with(executor: Arc<CannedExecutor>) -> SuggestScope {
        SuggestScope::new("site-search", SuggestSettings::default(), executor)
    }

    fn ids(state: &SuggestState) -> Vec<&str> {
        state.documents.iter().filter_map(|d| d.id.as_deref()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn short_input_clears_without_querying() {
        let executor = Arc::new(CannedExecutor::default());
        let mut scope = scope_with(executor.clone());

        assert!(scope.on_input("pa").await.is_none());

        let state = scope.snapshot().await;
        assert_eq!(state.query, "pa");
        assert!(!state.loading);
        assert!(!state.visible());
        assert!(executor.calls.lock().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn typing_burst_sends_one_query() {
        let executor = Arc::new(CannedExecutor::default());
        executor.push_ok(response(&["x"], 1, json!({}))).await;
        let mut scope = scope_with(executor.clone());

        let mut handles = Vec::new();
        for text in ["p", "pa", "par", "pari", "paris"] {
            handles.extend(scope.on_input(text).await);
            tokio::time::sleep(Duration::from_millis(30)).await;
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let calls = executor.calls.lock().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, "unknown");
        let Query::MultiMatch(multi_match) = &calls[0].0.query else {
            panic!("expected a multi_match query");
        };
        assert_eq!(multi_match.query, "paris");
        let state = scope.snapshot().await;
        assert_eq!(ids(&state), vec!["x"]);
        assert!(state.visible());
    }

    #[tokio::test(start_paused = true)]
    async fn late_response_for_old_input_is_dropped() {
        let executor = Arc::new(CannedExecutor::default());
        executor.push_delayed(Duration::from_millis(500), Ok(response(&["old"], 1, json!({})))).await;
        executor.push_ok(response(&["new"], 1, json!({}))).await;
        let mut scope = scope_with(executor.clone());

        let first = scope.on_input("par").await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        let second = scope.on_input("pari").await.unwrap();
        second.await.unwrap();
        first.await.unwrap();

        assert_eq!(executor.calls.lock().await.len(), 2);
        let state = scope.snapshot().await;
        assert_eq!(ids(&state), vec!["new"]);
        assert!(!state.loading);
    }

    #[tokio::test(start_paused = true)]
    async fn shortening_below_min_chars_discards_in_flight_response() {
        let executor = Arc::new(CannedExecutor::default());
        executor.push_delayed(Duration::from_millis(500), Ok(response(&["old"], 1, json!({})))).await;
        let mut scope = scope_with(executor.clone());

        let first = scope.on_input("par").await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(scope.on_input("pa").await.is_none());
        first.await.unwrap();

        let state = scope.snapshot().await;
        assert!(state.documents.is_empty());
        assert!(!state.visible());
    }

    #[tokio::test(start_paused = true)]
    async fn error_clears_loading_and_keeps_documents() {
        let executor = Arc::new(CannedExecutor::default());
        executor.push_ok(response(&["a"], 1, json!({}))).await;
        executor.push_err("timeout").await;
        let mut scope = scope_with(executor.clone());

        scope.on_input("par").await.unwrap().await.unwrap();
        scope.on_input("pari").await.unwrap().await.unwrap();

        let state = scope.snapshot().await;
        assert_eq!(ids(&state), vec!["a"]);
        assert!(!state.loading);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_search_fields_never_queries() {
        let executor = Arc::new(CannedExecutor::default());
        let settings = SuggestSettings { search_fields: Vec::new(), ..Default::default() };
        let mut scope = SuggestScope::new("site-search", settings, executor.clone());

        assert!(scope.on_input("paris").await.is_none());

        assert!(executor.calls.lock().await.is_empty());
        assert!(!scope.snapshot().await.loading);
    }

    #[tokio::test(start_paused = true)]
    async fn dismiss_cancels_pending_request() {
        let executor = Arc::new(CannedExecutor::default());
        executor.push_ok(response(&["a"], 1, json!({}))).await;
        let mut scope = scope_with(executor.clone());

        let handle = scope.on_input("paris").await.unwrap();
        scope.dismiss().await;
        handle.await.unwrap();

        assert!(executor.calls.lock().await.is_empty());
        assert!(!scope.snapshot().await.visible());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn rapid_input_on_worker_threads_settles_on_latest_text() {
        let settings = SuggestSettings { timeout_ms: 0, ..Default::default() };
        let mut scope = SuggestScope::new("site-search", settings, Arc::new(EchoExecutor));
        let shared = scope.state();

        let mut handles = Vec::new();
        let mut last = String::new();
        for i in 0..200 {
            last = format!("query {i}");
            handles.extend(scope.on_input(&last).await);
            let state = shared.lock().await;
            assert_eq!(state.query, last);
            assert!(state.loading || ids(&state) == vec![last.as_str()], "stale documents applied: {:?}", ids(&state));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let state = scope.snapshot().await;
        assert_eq!(ids(&state), vec![last.as_str()]);
        assert!(!state.loading);
    }
}
