//! Filter scope: filter state, result view and executor bound together.

use std::sync::Arc;

use common::filter_state::{FilterSettings, FilterState, Period};
use common::form_fields::{FieldPath, FieldPathError, FormFields};
use common::search_query::{GeoPoint, SortDirection};
use common::search_result::{ResultDocument, ResultView};
use tokio::sync::broadcast;

use crate::db_utils::elastic_utils::SearchExecutor;

const EVENT_CHANNEL_CAPACITY: usize = 16;

fn malformed_path(path: &str) -> Option<FieldPathError> {
    FieldPath::parse(path).err()
}

#[derive(Debug, Clone)]
pub enum FilterEvent {
    SubmitSucceeded { scope: String, response: Arc<ResultDocument> },
}

/// Every public mutation runs exactly one build, execute and merge cycle.
///
/// On a transport error the view keeps its last good documents, `loading`
/// is cleared and the error is returned; the same action can be repeated.
pub struct FilterScope {
    name: String,
    state: FilterState,
    view: ResultView,
    geo: Option<GeoPoint>,
    executor: Arc<dyn SearchExecutor>,
    events: broadcast::Sender<FilterEvent>,
}

impl FilterScope {
    pub fn new(name: impl Into<String>, settings: FilterSettings, executor: Arc<dyn SearchExecutor>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            name: name.into(),
            state: FilterState::new(settings),
            view: ResultView::default(),
            geo: None,
            executor,
            events,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn view(&self) -> &ResultView {
        &self.view
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FilterEvent> {
        self.events.subscribe()
    }

    /// Coordinates used when sorting by distance.
    pub fn set_geo(&mut self, geo: Option<GeoPoint>) {
        self.geo = geo;
    }

    pub async fn submit(&mut self) -> anyhow::Result<()> {
        let query = self.state.build_query(self.geo);
        let append_mode = self.state.is_append_mode();
        self.view.loading = true;
        tracing::debug!(
            "Filter submit [{}]: from={} size={} append={}",
            self.name,
            self.state.offset(),
            self.state.page_size(),
            append_mode
        );

        match self.executor.execute(&query, self.state.result_type()).await {
            Ok(response) => {
                self.view.merge(&response, append_mode);
                tracing::info!(
                    "Filter success [{}]: {} of {} documents",
                    self.name,
                    self.view.count(),
                    self.view.total
                );
                let event = FilterEvent::SubmitSucceeded { scope: self.name.clone(), response: Arc::new(response) };
                if self.events.send(event).is_err() {
                    tracing::trace!("Filter success [{}]: no subscribers", self.name);
                }
                Ok(())
            }
            Err(e) => {
                self.view.loading = false;
                tracing::error!("Filter error [{}]: {:#}", self.name, e);
                Err(e)
            }
        }
    }

    fn log_dropped_field(&self, error: &FieldPathError) {
        tracing::debug!("Filter [{}]: dropping field: {}", self.name, error);
    }

    /// Malformed paths are kept in the raw form but never reach the query.
    pub async fn set_field(&mut self, path: &str, value: &str) -> anyhow::Result<()> {
        if let Some(e) = malformed_path(path) {
            self.log_dropped_field(&e);
        }
        self.state.set_field(path, value);
        self.submit().await
    }

    pub async fn add_field(&mut self, path: &str, value: &str) -> anyhow::Result<()> {
        if let Some(e) = malformed_path(path) {
            self.log_dropped_field(&e);
        }
        self.state.add_field(path, value);
        self.submit().await
    }

    pub async fn remove_field(&mut self, path: &str) -> anyhow::Result<()> {
        self.state.remove_field(path);
        self.submit().await
    }

    pub async fn set_form(&mut self, form: FormFields) -> anyhow::Result<()> {
        let (_, errors) = form.to_tree_with_errors();
        for e in errors.iter() {
            self.log_dropped_field(e);
        }
        self.state.set_form(form);
        self.submit().await
    }

    pub async fn set_term(&mut self, field: &str, value: &str) -> anyhow::Result<()> {
        self.state.set_term(field, value);
        self.submit().await
    }

    pub async fn set_date_range(&mut self, gte: Option<&str>, lte: Option<&str>) -> anyhow::Result<()> {
        self.state.set_date_range(gte, lte);
        self.submit().await
    }

    pub async fn set_period(&mut self, period: Period) -> anyhow::Result<()> {
        self.state.set_period(period);
        self.submit().await
    }

    pub async fn set_sort(&mut self, field: &str, dir: SortDirection) -> anyhow::Result<()> {
        self.state.set_sort(field, dir);
        self.submit().await
    }

    pub async fn toggle_sort(&mut self, field: &str) -> anyhow::Result<()> {
        self.state.toggle_sort(field);
        self.submit().await
    }

    /// Appends the next page after the documents already shown.
    pub async fn show_more(&mut self) -> anyhow::Result<()> {
        self.state.show_more(self.view.count());
        self.submit().await
    }
}
