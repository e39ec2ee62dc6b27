//! Search-engine query documents and the typed partial override merged over them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::form_fields::FieldValue;
use crate::search_const::FACET_BUCKET_SIZE;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// Document handed verbatim to the search endpoint.
///
/// `fields` is always serialized (as `null` when unset); `from` and `facets`
/// only when present, so suggest queries keep their smaller shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDocument {
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<u64>,
    pub query: Query,
    #[serde(default)]
    pub fields: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facets: Option<BTreeMap<String, FacetRequest>>,
    pub sort: Sort,
    /// Top-level keys contributed by an override that the builder does not model.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl QueryDocument {
    /// Shallow merge: every key present in `overrides` replaces the built one.
    /// Keys the document does not model are added to `extra`, replacing any
    /// earlier value under the same name.
    pub fn apply_override(&mut self, overrides: &QueryOverride) {
        if let Some(size) = overrides.size {
            self.size = size;
        }
        if let Some(from) = overrides.from {
            self.from = Some(from);
        }
        if let Some(query) = &overrides.query {
            self.query = query.clone();
        }
        if let Some(fields) = &overrides.fields {
            self.fields = Some(fields.clone());
        }
        if let Some(facets) = &overrides.facets {
            self.facets = Some(facets.clone());
        }
        if let Some(sort) = &overrides.sort {
            self.sort = sort.clone();
        }
        for (key, value) in overrides.extra.iter() {
            self.extra.insert(key.clone(), value.clone());
        }
    }
}

/// Caller customization merged over a built query. Every field is optional;
/// unknown keys are kept in `extra` and passed through untouched, at every
/// level of the typed query tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct QueryOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<Query>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facets: Option<BTreeMap<String, FacetRequest>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<Sort>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl QueryOverride {
    pub fn is_empty(&self) -> bool {
        self.size.is_none()
            && self.from.is_none()
            && self.query.is_none()
            && self.fields.is_none()
            && self.facets.is_none()
            && self.sort.is_none()
            && self.extra.is_empty()
    }
}

/// Query shapes the builders emit. Anything that does not fit them
/// (different filter kinds, non-string term values) reads back as `Custom`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Query {
    Filtered(FilteredQuery),
    MultiMatch(MultiMatch),
    #[serde(untagged)]
    Custom(Value),
}

impl Query {
    pub fn filtered(must: Vec<MustClause>) -> Self {
        Query::Filtered(FilteredQuery {
            filter: FilterClause { bool_clause: BoolClause { must, extra: Map::new() }, extra: Map::new() },
            extra: Map::new(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FilteredQuery {
    pub filter: FilterClause,
    /// Inner `query` and other siblings of `filter`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FilterClause {
    #[serde(rename = "bool")]
    pub bool_clause: BoolClause,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BoolClause {
    #[serde(default)]
    pub must: Vec<MustClause>,
    /// `must_not`, `should` and friends.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MustClause {
    Range(BTreeMap<String, RangeBounds>),
    Term(BTreeMap<String, FieldValue>),
}

impl MustClause {
    pub fn range(field: impl Into<String>, bounds: RangeBounds) -> Self {
        MustClause::Range(BTreeMap::from([(field.into(), bounds)]))
    }

    pub fn term(field: impl Into<String>, value: FieldValue) -> Self {
        MustClause::Term(BTreeMap::from([(field.into(), value)]))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RangeBounds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<String>,
    /// Any other range parameter the form supplied (`format`, `gt`, ...).
    #[serde(flatten)]
    pub extra: BTreeMap<String, FieldValue>,
}

impl RangeBounds {
    pub fn gte(value: impl Into<String>) -> Self {
        Self { gte: Some(value.into()), ..Default::default() }
    }

    pub fn lte(value: impl Into<String>) -> Self {
        Self { lte: Some(value.into()), ..Default::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.gte.is_none() && self.lte.is_none() && self.extra.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchOperator {
    #[default]
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiMatch {
    pub operator: MatchOperator,
    pub query: String,
    pub fields: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One facet request. Built facets are terms facets; an override may carry
/// any other facet kind (`date_histogram`, `statistical`, ...) in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FacetRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms: Option<TermsFacet>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FacetRequest {
    pub fn terms(field: impl Into<String>) -> Self {
        Self {
            terms: Some(TermsFacet { field: Some(field.into()), size: Some(FACET_BUCKET_SIZE), extra: Map::new() }),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TermsFacet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Filter queries sort with a list, suggest queries with a single clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Sort {
    List(Vec<SortClause>),
    Single(SortClause),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SortClause {
    GeoDistance {
        #[serde(rename = "_geo_distance")]
        geo_distance: GeoDistanceSort,
    },
    Field(BTreeMap<String, FieldSort>),
    Custom(Value),
}

impl SortClause {
    pub fn field(name: impl Into<String>, order: SortDirection) -> Self {
        SortClause::Field(BTreeMap::from([(name.into(), FieldSort { order, extra: Map::new() })]))
    }

    /// Location is written `[lat, lon]`.
    pub fn geo_distance(point: GeoPoint, order: SortDirection) -> Self {
        SortClause::GeoDistance {
            geo_distance: GeoDistanceSort {
                location: [point.lat, point.lon],
                order,
                extra: Map::new(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoDistanceSort {
    pub location: [f64; 2],
    pub order: SortDirection,
    /// `unit`, `distance_type`, ...
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSort {
    pub order: SortDirection,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Caller misuse of a query builder. The query must not be executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    EmptyQueryString,
    EmptySearchFields,
}

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyQueryString => write!(f, "Wrong query string: query is empty"),
            Self::EmptySearchFields => write!(f, "Autocompletion fields are empty"),
        }
    }
}

impl std::error::Error for QueryError {}
