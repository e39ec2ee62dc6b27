//! Autocomplete state and the suggest query builder.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::search_const::{DEFAULT_RESULT_TYPE, DEFAULT_SUGGEST_MIN_CHARS, DEFAULT_SUGGEST_SIZE, DEFAULT_SUGGEST_TIMEOUT_MS};
use crate::search_query::{MatchOperator, MultiMatch, Query, QueryDocument, QueryError, QueryOverride, Sort, SortClause, SortDirection};
use crate::search_result::{ResultDocument, SearchHit};


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestSettings {
    pub min_chars: usize,
    pub return_fields: Vec<String>,
    pub search_fields: Vec<String>,
    /// Typing pause before the query fires.
    #[serde(rename = "timeout")]
    pub timeout_ms: u64,
    /// Document type key to human label.
    pub document_type: BTreeMap<String, String>,
    pub sort_dir: SortDirection,
    pub size: u64,
    pub custom_query: QueryOverride,
}

impl Default for SuggestSettings {
    fn default() -> Self {
        Self {
            min_chars: DEFAULT_SUGGEST_MIN_CHARS,
            return_fields: vec!["post_title".to_string(), "permalink".to_string()],
            search_fields: vec!["post_title".to_string()],
            timeout_ms: DEFAULT_SUGGEST_TIMEOUT_MS,
            document_type: BTreeMap::from([(DEFAULT_RESULT_TYPE.to_string(), "Unknown".to_string())]),
            sort_dir: SortDirection::Asc,
            size: DEFAULT_SUGGEST_SIZE,
            custom_query: QueryOverride::default(),
        }
    }
}

impl SuggestSettings {
    /// All configured document types, comma separated.
    pub fn result_type(&self) -> String {
        self.document_type.keys().cloned().collect::<Vec<_>>().join(",")
    }

    pub fn build_query(&self, text: &str) -> Result<QueryDocument, QueryError> {
        let mut document =
            build_suggest_query(text, &self.search_fields, &self.return_fields, self.size, self.sort_dir)?;
        document.apply_override(&self.custom_query);
        Ok(document)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SuggestState {
    pub query: String,
    pub min_chars: usize,
    pub documents: Vec<SearchHit>,
    pub loading: bool,
    pub document_types: BTreeMap<String, String>,
}

impl SuggestState {
    pub fn new(settings: &SuggestSettings) -> Self {
        Self {
            query: String::new(),
            min_chars: settings.min_chars,
            documents: Vec::new(),
            loading: false,
            document_types: settings.document_type.clone(),
        }
    }

    pub fn count(&self) -> usize {
        self.documents.len()
    }

    /// The dropdown shows only when there is something to show and nothing pending.
    pub fn visible(&self) -> bool {
        !self.documents.is_empty() && !self.loading
    }

    pub fn is_below_min_chars(&self, text: &str) -> bool {
        text.chars().count() < self.min_chars
    }

    pub fn clear(&mut self) {
        self.documents.clear();
        self.loading = false;
    }

    pub fn replace_documents(&mut self, response: &ResultDocument) {
        self.documents = response.hits.hits.clone();
        self.loading = false;
    }

    pub fn type_label<'a>(&'a self, hit: &'a SearchHit) -> Option<&'a str> {
        let doc_type = hit.doc_type.as_deref()?;
        Some(self.document_types.get(doc_type).map(|l| l.as_str()).unwrap_or(doc_type))
    }
}

/// Builds an AND multi-field match, sorted by document type.
///
/// Empty text or no search fields is a caller error; the query must not run.
pub fn build_suggest_query(
    text: &str,
    search_fields: &[String],
    return_fields: &[String],
    size: u64,
    sort_dir: SortDirection,
) -> Result<QueryDocument, QueryError> {
    if text.is_empty() {
        return Err(QueryError::EmptyQueryString);
    }
    if search_fields.is_empty() {
        return Err(QueryError::EmptySearchFields);
    }
    Ok(QueryDocument {
        size,
        from: None,
        query: Query::MultiMatch(MultiMatch {
            operator: MatchOperator::And,
            query: text.to_string(),
            fields: search_fields.to_vec(),
            extra: Default::default(),
        }),
        fields: Some(return_fields.to_vec()),
        facets: None,
        sort: Sort::Single(SortClause::field("_type", sort_dir)),
        extra: Default::default(),
    })
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn builds_multi_match_query() {
        let document = build_suggest_query(
            "foo",
            &strings(&["post_title"]),
            &strings(&["post_title", "permalink"]),
            20,
            SortDirection::Asc,
        )
        .unwrap();
        let value = serde_json::to_value(&document).unwrap();
        assert_eq!(value["query"]["multi_match"]["query"], json!("foo"));
        assert_eq!(value["query"]["multi_match"]["fields"], json!(["post_title"]));
        assert_eq!(
            value,
            json!({
                "query": {"multi_match": {"operator": "and", "query": "foo", "fields": ["post_title"]}},
                "fields": ["post_title", "permalink"],
                "sort": {"_type": {"order": "asc"}},
                "size": 20
            })
        );
    }

    #[test]
    fn rejects_empty_text_and_fields() {
        let fields = strings(&["post_title"]);
        assert_eq!(
            build_suggest_query("", &fields, &[], 20, SortDirection::Asc),
            Err(QueryError::EmptyQueryString)
        );
        assert_eq!(
            build_suggest_query("foo", &[], &[], 20, SortDirection::Asc),
            Err(QueryError::EmptySearchFields)
        );
    }

    #[test]
    fn settings_apply_custom_query_and_join_types() {
        let settings: SuggestSettings = serde_json::from_value(json!({
            "document_type": {"event": "Events", "post": "Posts"},
            "custom_query": {"size": 5},
            "timeout": 250
        }))
        .unwrap();
        assert_eq!(settings.result_type(), "event,post");
        assert_eq!(settings.timeout_ms, 250);
        assert_eq!(settings.min_chars, 3);
        assert_eq!(settings.build_query("abc").unwrap().size, 5);
    }

    #[test]
    fn state_counts_visibility_and_labels() {
        let settings = SuggestSettings {
            document_type: BTreeMap::from([("event".to_string(), "Events".to_string())]),
            ..Default::default()
        };
        let mut state = SuggestState::new(&settings);
        assert!(state.is_below_min_chars("ab"));
        assert!(!state.is_below_min_chars("abc"));
        assert!(state.is_below_min_chars("éé"));

        let response: ResultDocument = serde_json::from_value(json!({
            "hits": {"total": 2, "hits": [{"_id": "1", "_type": "event"}, {"_id": "2", "_type": "page"}]}
        }))
        .unwrap();
        state.loading = true;
        state.replace_documents(&response);
        assert_eq!(state.count(), 2);
        assert!(state.visible());
        assert_eq!(state.type_label(&state.documents[0]), Some("Events"));
        assert_eq!(state.type_label(&state.documents[1]), Some("page"));

        state.loading = true;
        assert!(!state.visible());
        state.clear();
        assert_eq!(state.count(), 0);
        assert!(!state.loading);
    }
}
