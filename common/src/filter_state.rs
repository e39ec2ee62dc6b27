//! Filter scope state, its pagination state machine, and the filter query builder.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::form_fields::{FieldValue, FormFields};
use crate::search_const::{
    ANY_TERM_VALUE, DATE_RANGE_FORM_KEY, DEFAULT_MORE_COUNT, DEFAULT_PAGE_SIZE, DEFAULT_PERIOD_FIELD,
    DEFAULT_RESULT_TYPE, DISTANCE_SORT, TERMS_FORM_KEY,
};
use crate::search_query::{
    FacetRequest, GeoPoint, MustClause, Query, QueryDocument, QueryOverride,
    RangeBounds, Sort, SortClause, SortDirection,
};


/// Implicit date window applied to `period_field`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    #[default]
    Upcoming,
    Past,
    #[serde(other)]
    None,
}

/// Per-scope configuration. Missing keys keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    pub period: Period,
    pub period_field: String,
    pub sort_by: Option<String>,
    pub sort_dir: SortDirection,
    pub per_page: u64,
    /// Page size used by "show more".
    pub more_count: u64,
    /// Facet field to human label.
    pub facets: BTreeMap<String, String>,
    #[serde(rename = "type")]
    pub result_type: String,
    pub return_fields: Option<Vec<String>>,
    pub custom_query: QueryOverride,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            period: Period::Upcoming,
            period_field: DEFAULT_PERIOD_FIELD.to_string(),
            sort_by: Some("date".to_string()),
            sort_dir: SortDirection::Asc,
            per_page: DEFAULT_PAGE_SIZE,
            more_count: DEFAULT_MORE_COUNT,
            facets: BTreeMap::new(),
            result_type: DEFAULT_RESULT_TYPE.to_string(),
            return_fields: None,
            custom_query: QueryOverride::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaginationPhase {
    Initial,
    Filtered,
    Appending,
}

/// Mutable filter state. Every non-pagination mutation flushes the cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
    form: FormFields,
    period: Period,
    period_field: String,
    sort_by: Option<String>,
    sort_dir: SortDirection,
    page_size: u64,
    initial_page_size: u64,
    page_increment: u64,
    offset: u64,
    append_mode: bool,
    phase: PaginationPhase,
    facets: BTreeMap<String, String>,
    result_type: String,
    return_fields: Option<Vec<String>>,
    custom_query: QueryOverride,
}

impl FilterState {
    pub fn new(settings: FilterSettings) -> Self {
        Self {
            form: FormFields::new(),
            period: settings.period,
            period_field: settings.period_field,
            sort_by: settings.sort_by,
            sort_dir: settings.sort_dir,
            page_size: settings.per_page,
            initial_page_size: settings.per_page,
            page_increment: settings.more_count,
            offset: 0,
            append_mode: false,
            phase: PaginationPhase::Initial,
            facets: settings.facets,
            result_type: settings.result_type,
            return_fields: settings.return_fields,
            custom_query: settings.custom_query,
        }
    }

    pub fn form(&self) -> &FormFields {
        &self.form
    }
    pub fn period(&self) -> Period {
        self.period
    }
    pub fn period_field(&self) -> &str {
        &self.period_field
    }
    pub fn sort_by(&self) -> Option<&str> {
        self.sort_by.as_deref()
    }
    pub fn sort_dir(&self) -> SortDirection {
        self.sort_dir
    }
    pub fn page_size(&self) -> u64 {
        self.page_size
    }
    pub fn initial_page_size(&self) -> u64 {
        self.initial_page_size
    }
    pub fn page_increment(&self) -> u64 {
        self.page_increment
    }
    pub fn offset(&self) -> u64 {
        self.offset
    }
    pub fn is_append_mode(&self) -> bool {
        self.append_mode
    }
    pub fn phase(&self) -> PaginationPhase {
        self.phase
    }
    pub fn facet_labels(&self) -> &BTreeMap<String, String> {
        &self.facets
    }
    pub fn result_type(&self) -> &str {
        &self.result_type
    }
    pub fn return_fields(&self) -> Option<&[String]> {
        self.return_fields.as_deref()
    }
    pub fn custom_query(&self) -> &QueryOverride {
        &self.custom_query
    }

    /// Resets the pagination cursor to its initial values.
    pub fn flush(&mut self) {
        self.append_mode = false;
        self.offset = 0;
        self.page_size = self.initial_page_size;
    }

    fn field_changed(&mut self) {
        self.flush();
        self.phase = PaginationPhase::Filtered;
    }

    pub fn set_field(&mut self, path: impl Into<String>, value: impl Into<String>) {
        self.form.set(path, value);
        self.field_changed();
    }

    pub fn add_field(&mut self, path: impl Into<String>, value: impl Into<String>) {
        self.form.add(path, value);
        self.field_changed();
    }

    pub fn remove_field(&mut self, path: &str) {
        self.form.remove(path);
        self.field_changed();
    }

    /// Replaces the whole form, as a re-serialized form submission does.
    pub fn set_form(&mut self, form: FormFields) {
        self.form = form;
        self.field_changed();
    }

    pub fn set_term(&mut self, field: &str, value: impl Into<String>) {
        self.set_field(format!("{TERMS_FORM_KEY}[{field}]"), value);
    }

    pub fn set_date_range(&mut self, gte: Option<&str>, lte: Option<&str>) {
        for (bound, value) in [("gte", gte), ("lte", lte)] {
            let path = format!("{DATE_RANGE_FORM_KEY}[{bound}]");
            match value {
                Some(v) => self.form.set(path, v),
                None => self.form.remove(&path),
            }
        }
        self.field_changed();
    }

    pub fn set_period(&mut self, period: Period) {
        self.period = period;
        self.field_changed();
    }

    pub fn set_sort(&mut self, field: impl Into<String>, dir: SortDirection) {
        self.sort_by = Some(field.into());
        self.sort_dir = dir;
        self.field_changed();
    }

    /// Sort-button behavior: sort by `field`, flipping the current direction.
    pub fn toggle_sort(&mut self, field: impl Into<String>) {
        let dir = self.sort_dir.flipped();
        self.set_sort(field, dir);
    }

    /// Requests the next `page_increment` documents after the ones already shown.
    pub fn show_more(&mut self, current_count: usize) {
        self.page_size = self.page_increment;
        self.offset = current_count as u64;
        self.append_mode = true;
        self.phase = PaginationPhase::Appending;
    }

    /// Selected terms, excluding the "any" sentinel.
    pub fn term_filters(&self) -> BTreeMap<String, FieldValue> {
        term_filters_of(&self.form.to_tree().pruned())
    }

    pub fn date_range(&self) -> Option<RangeBounds> {
        date_range_of(&self.form.to_tree().pruned())
    }

    pub fn build_query(&self, geo: Option<GeoPoint>) -> QueryDocument {
        build_filter_query(self, geo)
    }
}

fn term_filters_of(tree: &FieldValue) -> BTreeMap<String, FieldValue> {
    let Some(terms) = tree.get(TERMS_FORM_KEY).and_then(|t| t.as_map()) else {
        return BTreeMap::new();
    };
    terms
        .iter()
        .filter(|(_, value)| value.as_str() != Some(ANY_TERM_VALUE))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn date_range_of(tree: &FieldValue) -> Option<RangeBounds> {
    let range = tree.get(DATE_RANGE_FORM_KEY)?.as_map()?;
    let mut bounds = RangeBounds::default();
    for (key, value) in range.iter() {
        match (key.as_str(), value.as_str()) {
            ("gte", Some(v)) => bounds.gte = Some(v.to_string()),
            ("lte", Some(v)) => bounds.lte = Some(v.to_string()),
            _ => {
                bounds.extra.insert(key.clone(), value.clone());
            }
        }
    }
    if bounds.is_empty() { None } else { Some(bounds) }
}

/// Derives the filter query. Pure: same state and geo give the same document.
///
/// A distance sort without `geo` sorts from `(0, 0)`.
pub fn build_filter_query(state: &FilterState, geo: Option<GeoPoint>) -> QueryDocument {
    let tree = state.form.to_tree().pruned();

    let mut must = Vec::new();
    match state.period {
        Period::Upcoming => must.push(MustClause::range(&state.period_field, RangeBounds::gte("now"))),
        Period::Past => must.push(MustClause::range(&state.period_field, RangeBounds::lte("now"))),
        Period::None => {}
    }
    if let Some(range) = date_range_of(&tree) {
        must.push(MustClause::range(&state.period_field, range));
    }
    for (field, value) in term_filters_of(&tree) {
        must.push(MustClause::term(field, value));
    }

    let facets = state
        .facets
        .keys()
        .map(|field| (field.clone(), FacetRequest::terms(field)))
        .collect();

    let mut sort = Vec::new();
    match state.sort_by.as_deref() {
        Some(DISTANCE_SORT) => sort.push(SortClause::geo_distance(geo.unwrap_or_default(), state.sort_dir)),
        Some(field) if !field.is_empty() => sort.push(SortClause::field(field, state.sort_dir)),
        _ => {}
    }

    let mut document = QueryDocument {
        size: state.page_size,
        from: Some(state.offset),
        query: Query::filtered(must),
        fields: state.return_fields.clone(),
        facets: Some(facets),
        sort: Sort::List(sort),
        extra: Default::default(),
    };
    document.apply_override(&state.custom_query);
    document
}
