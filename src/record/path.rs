//! Dotted field paths
//!
//! `"address.city"` addresses `record["address"]["city"]`. Lookups and
//! nested merges walk the path recursively over plain JSON objects.

use std::fmt;

use serde_json::{Map, Value};

use super::Record;
use crate::namespace::has_reserved_chars;
use crate::repository::{RepositoryError, RepositoryResult};

/// A parsed, validated field path
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath {
    raw: String,
    segments: Vec<String>,
}

impl FieldPath {
    /// Parse a dotted path.
    ///
    /// Empty paths, empty segments (`"a..b"`, `".a"`) and reserved separator
    /// characters are rejected.
    pub fn parse(raw: &str) -> RepositoryResult<Self> {
        if raw.is_empty() {
            return Err(RepositoryError::validation("field path must not be empty"));
        }
        if has_reserved_chars(raw) {
            return Err(RepositoryError::validation(format!(
                "field path {:?} contains a reserved separator character",
                raw
            )));
        }
        let segments: Vec<String> = raw.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(RepositoryError::validation(format!(
                "field path {:?} has an empty segment",
                raw
            )));
        }
        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The path as written
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Individual segments
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Value addressed by this path, if every step exists
    pub fn get<'r>(&self, record: &'r Record) -> Option<&'r Value> {
        lookup(record, &self.segments)
    }

    /// Shallow-merge `delta` into the object addressed by this path.
    ///
    /// Missing or null intermediate objects are created. Addressing through
    /// a scalar or array is a validation error and leaves `record` untouched.
    pub fn merge_into(&self, record: &mut Record, delta: Record) -> RepositoryResult<()> {
        if let Some(blocker) = self.first_non_object(record) {
            return Err(RepositoryError::validation(format!(
                "path {} crosses non-object value at {}",
                self.raw, blocker
            )));
        }
        merge_at(record, &self.segments, delta);
        Ok(())
    }

    fn first_non_object(&self, record: &Record) -> Option<String> {
        let mut current = record;
        for (depth, segment) in self.segments.iter().enumerate() {
            match current.get(segment) {
                None | Some(Value::Null) => return None,
                Some(Value::Object(inner)) => current = inner,
                Some(_) => return Some(self.segments[..=depth].join(".")),
            }
        }
        None
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

fn lookup<'v>(map: &'v Map<String, Value>, segments: &[String]) -> Option<&'v Value> {
    match segments {
        [] => None,
        [last] => map.get(last),
        [head, rest @ ..] => lookup(map.get(head)?.as_object()?, rest),
    }
}

fn merge_at(map: &mut Map<String, Value>, segments: &[String], delta: Record) {
    match segments {
        [] => map.extend(delta),
        [head, rest @ ..] => {
            let slot = map
                .entry(head.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            if let Value::Object(inner) = slot {
                merge_at(inner, rest, delta);
            }
        }
    }
}
