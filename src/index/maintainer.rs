//! Index maintenance
//!
//! Derives index entries from records and builds the scan interval for an
//! indexed equality lookup.
//!
//! Entry layout: `field \0 encode(value) \0 primary_key -> primary_key`.
//! Entries therefore sort by field, then value, then primary key.

use std::sync::Arc;

use serde_json::Value;

use super::key::IndexKey;
use super::registry::IndexRegistry;
use crate::namespace::{Namespace, Partition};
use crate::observability::{log_event_with_fields, Event};
use crate::record::{FieldPath, Record};
use crate::repository::{RepositoryError, RepositoryResult};
use crate::store::{BatchOp, KeyRange, StorageError, StorageResult};

/// Maintains the secondary indexes of one namespace
#[derive(Debug, Clone)]
pub struct IndexMaintainer {
    namespace: Namespace,
    partition: Partition,
    registry: Arc<IndexRegistry>,
}

impl IndexMaintainer {
    /// Bind a maintainer to `namespace`'s index partition
    pub fn new(namespace: Namespace, index_namespace: &str, registry: Arc<IndexRegistry>) -> Self {
        let partition = namespace.partition(index_namespace);
        Self {
            namespace,
            partition,
            registry,
        }
    }

    /// Declare an index on `field`. Idempotent per store handle.
    ///
    /// Returns true if the registration is new. Existing records are not
    /// backfilled.
    pub fn ensure_index(&self, field: &FieldPath) -> bool {
        let created = self.registry.ensure(&self.namespace, field);
        if created {
            let namespace = self.namespace.to_string();
            log_event_with_fields(
                Event::IndexRegistered,
                &[("namespace", namespace.as_str()), ("field", field.as_str())],
            );
        }
        created
    }

    /// Returns true if `field` has a declared index
    pub fn is_declared(&self, field: &FieldPath) -> bool {
        self.registry.is_registered(&self.namespace, field)
    }

    /// Declared index fields
    pub fn declared_fields(&self) -> Vec<FieldPath> {
        self.registry.fields(&self.namespace)
    }

    /// Storage key of one entry
    pub fn entry_key(&self, field: &FieldPath, value: &IndexKey, primary_key: &str) -> String {
        self.partition
            .compound_key(&[field.as_str(), &value.encode(), primary_key])
    }

    /// Entries for every declared field with an indexable value in `record`
    pub fn entries_for(&self, primary_key: &str, record: &Record) -> Vec<BatchOp> {
        self.declared_fields()
            .iter()
            .filter_map(|field| {
                let value = IndexKey::from_json(field.get(record)?)?;
                Some(BatchOp::put(
                    self.entry_key(field, &value, primary_key),
                    Value::String(primary_key.to_string()),
                ))
            })
            .collect()
    }

    /// Deletions for entries of `previous` that `next` no longer carries.
    ///
    /// Only used by the consistent index mode.
    pub fn retractions(
        &self,
        primary_key: &str,
        previous: &Record,
        next: Option<&Record>,
    ) -> Vec<BatchOp> {
        self.declared_fields()
            .iter()
            .filter_map(|field| {
                let old = IndexKey::from_json(field.get(previous)?)?;
                let new = next
                    .and_then(|record| field.get(record))
                    .and_then(IndexKey::from_json);
                if new.as_ref() == Some(&old) {
                    return None;
                }
                Some(BatchOp::delete(self.entry_key(field, &old, primary_key)))
            })
            .collect()
    }

    /// Scan interval holding every entry for `field == value`.
    ///
    /// Fails with `NoIndex` for undeclared fields. Returns `None` when
    /// `value` is not indexable (null, array, object): no entry can match.
    pub fn lookup_range(&self, field: &FieldPath, value: &Value) -> RepositoryResult<Option<KeyRange>> {
        if !self.is_declared(field) {
            return Err(RepositoryError::no_index(field.as_str()));
        }
        Ok(IndexKey::from_json(value)
            .map(|key| self.partition.group(&[field.as_str(), &key.encode()])))
    }

    /// Primary key stored in an index entry
    pub fn primary_key_of_entry(key: &str, value: &Value) -> StorageResult<String> {
        match value {
            Value::String(primary_key) => Ok(primary_key.clone()),
            other => Err(StorageError::corrupted(
                key,
                format!("index entry holds {} instead of a primary key", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn maintainer(fields: &[&str]) -> IndexMaintainer {
        let ns = Namespace::root("main").unwrap();
        let m = IndexMaintainer::new(ns, "~indexes", Arc::new(IndexRegistry::new()));
        for field in fields {
            m.ensure_index(&FieldPath::parse(field).unwrap());
        }
        m
    }

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_entries_for_declared_non_null_fields() {
        let m = maintainer(&["sex", "address.city", "age"]);
        let r = record(json!({"id": "1", "sex": "male", "address": {"city": "Oslo"}, "age": null}));

        let ops = m.entries_for("1", &r);

        assert_eq!(ops.len(), 2);
        for op in &ops {
            assert!(matches!(op, BatchOp::Put { value, .. } if value == &json!("1")));
        }
    }

    #[test]
    fn test_entries_skip_arrays_and_objects() {
        let m = maintainer(&["tags", "meta", "name"]);
        let r = record(json!({"tags": ["a"], "meta": {"k": 1}, "name": "x"}));

        let ops = m.entries_for("1", &r);

        assert_eq!(ops.len(), 1);
        assert!(ops[0].key().contains(&IndexKey::String("x".to_string()).encode()));
    }

    #[test]
    fn test_entry_falls_in_lookup_range() {
        let m = maintainer(&["sex"]);
        let sex = FieldPath::parse("sex").unwrap();
        let ops = m.entries_for("7", &record(json!({"sex": "male"})));

        let range = m.lookup_range(&sex, &json!("male")).unwrap().unwrap();
        assert!(range.contains(ops[0].key()));

        let other = m.lookup_range(&sex, &json!("female")).unwrap().unwrap();
        assert!(!other.contains(ops[0].key()));
    }

    #[test]
    fn test_lookup_range_requires_declared_index() {
        let m = maintainer(&["sex"]);
        let err = m
            .lookup_range(&FieldPath::parse("name").unwrap(), &json!("steve"))
            .unwrap_err();
        assert_eq!(err, RepositoryError::no_index("name"));
    }

    #[test]
    fn test_lookup_range_unindexable_value() {
        let m = maintainer(&["sex"]);
        let sex = FieldPath::parse("sex").unwrap();
        assert_eq!(m.lookup_range(&sex, &json!(null)).unwrap(), None);
        assert_eq!(m.lookup_range(&sex, &json!({"a": 1})).unwrap(), None);
    }

    #[test]
    fn test_retractions_only_for_changed_values() {
        let m = maintainer(&["sex", "age"]);
        let old = record(json!({"sex": "male", "age": 30}));
        let new = record(json!({"sex": "female", "age": 30}));

        let ops = m.retractions("1", &old, Some(&new));
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], BatchOp::Delete { .. }));

        let all = m.retractions("1", &old, None);
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_primary_key_of_entry() {
        assert_eq!(
            IndexMaintainer::primary_key_of_entry("k", &json!("1")).unwrap(),
            "1"
        );
        assert!(IndexMaintainer::primary_key_of_entry("k", &json!(1)).is_err());
    }
}
