//! Bracketed form-field paths (`terms[city]`, `tags[]`, `rows[2][name]`) parsed into a value tree.
//!
//! Grammar, parsed by recursive descent:
//!
//! ```text
//! path    := name ( "[" segment "]" )*
//! name    := ALPHA ( ALNUM | "_" )*
//! segment := ""                 push marker
//!          | DIGIT+             fixed index
//!          | ( ALNUM | "_" )+   named key
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Indices above this are rejected instead of allocating a huge sparse list.
const MAX_FIELD_INDEX: usize = 1024;


#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
    Push,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    pub name: String,
    pub segments: Vec<PathSegment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPathError {
    pub path: String,
    pub position: usize,
    pub reason: &'static str,
}

impl std::fmt::Display for FieldPathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Malformed field path {:?} at {}: {}", self.path, self.position, self.reason)
    }
}

impl std::error::Error for FieldPathError {}

impl FieldPath {
    pub fn parse(input: &str) -> Result<Self, FieldPathError> {
        PathParser { input, pos: 0 }.parse_path()
    }
}

struct PathParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> PathParser<'a> {
    fn parse_path(mut self) -> Result<FieldPath, FieldPathError> {
        let name = self.parse_name()?;
        let mut segments = Vec::new();
        while self.peek().is_some() {
            self.expect('[')?;
            segments.push(self.parse_segment()?);
            self.expect(']')?;
        }
        Ok(FieldPath { name, segments })
    }

    fn parse_name(&mut self) -> Result<String, FieldPathError> {
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() => {}
            _ => return Err(self.error("field name must start with a letter")),
        }
        Ok(self.take_word().to_string())
    }

    fn parse_segment(&mut self) -> Result<PathSegment, FieldPathError> {
        let start = self.pos;
        let word = self.take_word();
        if word.is_empty() {
            return Ok(PathSegment::Push);
        }
        if !word.bytes().all(|b| b.is_ascii_digit()) {
            return Ok(PathSegment::Key(word.to_string()));
        }
        match word.parse::<usize>() {
            Ok(index) if index <= MAX_FIELD_INDEX => Ok(PathSegment::Index(index)),
            _ => Err(FieldPathError {
                path: self.input.to_string(),
                position: start,
                reason: "index out of range",
            }),
        }
    }

    fn take_word(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !(c.is_ascii_alphanumeric() || c == '_') {
                break;
            }
            self.pos += c.len_utf8();
        }
        &self.input[start..self.pos]
    }

    fn expect(&mut self, expected: char) -> Result<(), FieldPathError> {
        match self.peek() {
            Some(c) if c == expected => {
                self.pos += 1;
                Ok(())
            }
            _ if expected == '[' => Err(self.error("expected '['")),
            _ => Err(self.error("expected ']'")),
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn error(&self, reason: &'static str) -> FieldPathError {
        FieldPathError { path: self.input.to_string(), position: self.pos, reason }
    }
}

/// Nested value built from form fields. Serializes as plain JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum FieldValue {
    #[default]
    Null,
    String(String),
    List(Vec<FieldValue>),
    Map(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, FieldValue>> {
        match self {
            FieldValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.as_map().and_then(|m| m.get(key))
    }

    /// Null, empty string, or a container without entries.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::String(s) => s.is_empty(),
            FieldValue::List(l) => l.is_empty(),
            FieldValue::Map(m) => m.is_empty(),
        }
    }

    /// Removes blank entries at every depth. Children are pruned before the
    /// blank check, so a map emptied by pruning disappears in the same pass.
    pub fn prune(&mut self) {
        match self {
            FieldValue::Map(map) => {
                for value in map.values_mut() {
                    value.prune();
                }
                map.retain(|_, value| !value.is_blank());
            }
            FieldValue::List(list) => {
                for value in list.iter_mut() {
                    value.prune();
                }
                list.retain(|value| !value.is_blank());
            }
            FieldValue::Null | FieldValue::String(_) => {}
        }
    }

    pub fn pruned(mut self) -> Self {
        self.prune();
        self
    }

    fn insert(&mut self, path: &[ResolvedSegment], value: String) {
        let Some((head, rest)) = path.split_first() else {
            *self = FieldValue::String(value);
            return;
        };
        match head {
            ResolvedSegment::Key(key) => {
                if !matches!(self, FieldValue::Map(_)) {
                    *self = FieldValue::Map(BTreeMap::new());
                }
                if let FieldValue::Map(map) = self {
                    map.entry(key.clone()).or_default().insert(rest, value);
                }
            }
            ResolvedSegment::Index(index) => {
                if !matches!(self, FieldValue::List(_)) {
                    *self = FieldValue::List(Vec::new());
                }
                if let FieldValue::List(list) = self {
                    if list.len() <= *index {
                        list.resize(*index + 1, FieldValue::Null);
                    }
                    list[*index].insert(rest, value);
                }
            }
        }
    }
}

enum ResolvedSegment {
    Key(String),
    Index(usize),
}

/// Ordered raw `(path, value)` pairs as a form would submit them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FormFields {
    fields: Vec<(String, String)>,
}

impl FormFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<P, V>(pairs: impl IntoIterator<Item = (P, V)>) -> Self
    where
        P: Into<String>,
        V: Into<String>,
    {
        Self { fields: pairs.into_iter().map(|(p, v)| (p.into(), v.into())).collect() }
    }

    /// Replaces every value stored under `path`, keeping the first position.
    pub fn set(&mut self, path: impl Into<String>, value: impl Into<String>) {
        let path = path.into();
        let value = value.into();
        match self.fields.iter().position(|(p, _)| *p == path) {
            Some(first) => {
                self.fields[first].1 = value;
                let mut index = 0;
                self.fields.retain(|(p, _)| {
                    let keep = index <= first || *p != path;
                    index += 1;
                    keep
                });
            }
            None => self.fields.push((path, value)),
        }
    }

    /// Appends another value, as repeated `tags[]` inputs do.
    pub fn add(&mut self, path: impl Into<String>, value: impl Into<String>) {
        self.fields.push((path.into(), value.into()));
    }

    pub fn remove(&mut self, path: &str) {
        self.fields.retain(|(p, _)| p != path);
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.fields.iter().find(|(p, _)| p == path).map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(p, v)| (p.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Builds the nested tree, silently dropping malformed paths.
    pub fn to_tree(&self) -> FieldValue {
        self.to_tree_with_errors().0
    }

    /// Builds the nested tree and reports which paths were dropped.
    pub fn to_tree_with_errors(&self) -> (FieldValue, Vec<FieldPathError>) {
        let mut root = FieldValue::Map(BTreeMap::new());
        let mut errors = Vec::new();
        let mut push_counters: BTreeMap<String, usize> = BTreeMap::new();

        for (raw_path, value) in self.fields.iter() {
            let path = match FieldPath::parse(raw_path) {
                Ok(path) => path,
                Err(e) => {
                    errors.push(e);
                    continue;
                }
            };
            let mut prefix = path.name.clone();
            let mut resolved = vec![ResolvedSegment::Key(path.name.clone())];
            for segment in path.segments.iter() {
                resolved.push(match segment {
                    PathSegment::Key(key) => ResolvedSegment::Key(key.clone()),
                    PathSegment::Index(index) => ResolvedSegment::Index(*index),
                    PathSegment::Push => {
                        let counter = push_counters.entry(prefix.clone()).or_insert(0);
                        let index = *counter;
                        *counter += 1;
                        ResolvedSegment::Index(index)
                    }
                });
                match segment {
                    PathSegment::Key(key) => prefix.push_str(&format!("[{key}]")),
                    PathSegment::Index(index) => prefix.push_str(&format!("[{index}]")),
                    PathSegment::Push => prefix.push_str("[]"),
                }
            }
            root.insert(&resolved, value.clone());
        }
        (root, errors)
    }
}
