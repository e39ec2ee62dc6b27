//! Raw search responses and the accumulated result view they are merged into.

use std::collections::BTreeMap;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};


/// Response document as returned by the search endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ResultDocument {
    pub took: u64,
    pub timed_out: bool,
    pub hits: ResultHits,
    pub facets: RawFacets,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ResultHits {
    pub total: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_score: Option<f64>,
    pub hits: Vec<SearchHit>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SearchHit {
    #[serde(rename = "_index", skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    #[serde(rename = "_type", skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "_score", skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(rename = "_source", skip_serializing_if = "Option::is_none")]
    pub source: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Value>,
    /// `sort`, `highlight` and anything else the engine attached to the hit.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Facet results keyed by field, kept in the order the engine returned them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawFacets(pub Vec<(String, RawFacet)>);

impl Serialize for RawFacets {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, facet) in self.0.iter() {
            map.serialize_entry(key, facet)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RawFacets {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(RawFacetsVisitor)
    }
}

struct RawFacetsVisitor;

impl<'de> Visitor<'de> for RawFacetsVisitor {
    type Value = RawFacets;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a map of facet results or null")
    }

    fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
        Ok(RawFacets::default())
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut facets = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, facet)) = access.next_entry::<String, RawFacet>()? {
            facets.push((key, facet));
        }
        Ok(RawFacets(facets))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RawFacet {
    #[serde(rename = "_type", skip_serializing_if = "Option::is_none")]
    pub facet_type: Option<String>,
    pub missing: u64,
    /// Hit count for terms facets, a sum for statistical ones.
    pub total: f64,
    pub other: u64,
    pub terms: Vec<RawFacetTerm>,
    /// Payload of other facet kinds: `entries`, `ranges`, `min`, `max`, ...
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFacetTerm {
    pub term: Value,
    #[serde(default)]
    pub count: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One facet's counts, tagged with the field it was computed for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetGroup {
    pub key: String,
    pub total: f64,
    pub missing: u64,
    pub other: u64,
    pub buckets: Vec<FacetBucket>,
    /// Non-terms payload, kept as returned.
    pub extra: Map<String, Value>,
}

impl FacetGroup {
    fn from_raw(key: &str, raw: &RawFacet) -> Self {
        FacetGroup {
            key: key.to_string(),
            total: raw.total,
            missing: raw.missing,
            other: raw.other,
            buckets: raw
                .terms
                .iter()
                .map(|t| FacetBucket {
                    display_string: display_string(&t.term),
                    original_value: t.term.clone(),
                    count: t.count,
                })
                .collect(),
            extra: raw.extra.clone(),
        }
    }

    /// Human label configured for this facet's field, or the field itself.
    pub fn label<'a>(&'a self, labels: &'a BTreeMap<String, String>) -> &'a str {
        labels.get(&self.key).map(|l| l.as_str()).unwrap_or(&self.key)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetBucket {
    pub display_string: String,
    pub original_value: Value,
    pub count: u64,
}

fn display_string(term: &Value) -> String {
    match term {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Documents, total and facets accumulated across the responses of one scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ResultView {
    pub documents: Vec<SearchHit>,
    pub total: u64,
    pub facets: Vec<FacetGroup>,
    pub loading: bool,
}

impl ResultView {
    pub fn count(&self) -> usize {
        self.documents.len()
    }

    pub fn has_more(&self) -> bool {
        self.total > self.documents.len() as u64
    }

    pub fn facet(&self, key: &str) -> Option<&FacetGroup> {
        self.facets.iter().find(|f| f.key == key)
    }

    /// Applies one response.
    ///
    /// Replace mode swaps documents, total and facets wholesale. Append mode
    /// concatenates the hits and takes the new total, but leaves the facets
    /// alone: they describe the base query, not the continuation page.
    pub fn merge(&mut self, response: &ResultDocument, append_mode: bool) {
        if append_mode {
            self.documents.extend(response.hits.hits.iter().cloned());
        } else {
            self.documents = response.hits.hits.clone();
        }
        self.total = response.hits.total;
        if !append_mode {
            self.facets = response
                .facets
                .0
                .iter()
                .map(|(key, raw)| FacetGroup::from_raw(key, raw))
                .collect();
        }
        self.loading = false;
    }
}
