//! Record model for aerorepo
//!
//! Records are loosely typed JSON objects. The repository only cares about
//! three things inside them: the primary-key field, the declared indexed
//! field paths, and nested objects addressed by update paths.

mod codec;
mod path;

use serde_json::{Map, Value};

pub use codec::{Codec, RecordHook};
pub use path::FieldPath;

use crate::index::IndexKey;
use crate::namespace::validate_component;
use crate::repository::{RepositoryError, RepositoryResult};

/// A stored record: field name to value
pub type Record = Map<String, Value>;

/// Reads the primary-key value of `record` as a key string.
///
/// Missing, null and empty-string values yield `Ok(None)`. Strings and
/// numbers are accepted; anything else is a validation error.
pub fn primary_key_of(record: &Record, field: &str) -> RepositoryResult<Option<String>> {
    let key = match record.get(field) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) if s.is_empty() => return Ok(None),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => {
            return Err(RepositoryError::validation(format!(
                "primary key {} must be a string or number, got {}",
                field, other
            )))
        }
    };
    validate_component("primary key", &key)?;
    Ok(Some(key))
}

/// Typed scalar equality used by unindexed lookups.
///
/// Matches exactly when both sides map to the same index key, so getFor
/// and getBy agree on what "equal" means. Null, arrays and objects never
/// match anything.
pub fn values_match(candidate: &Value, expected: &Value) -> bool {
    match (IndexKey::from_json(candidate), IndexKey::from_json(expected)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Converts a JSON value into a record, rejecting non-objects
pub fn into_record(value: Value) -> RepositoryResult<Record> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(RepositoryError::validation(format!(
            "records must be JSON objects, got {}",
            other
        ))),
    }
}
