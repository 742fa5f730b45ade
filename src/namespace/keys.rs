//! Partition key builders

use super::KEY_SEPARATOR;
use crate::store::KeyRange;

/// One partition of a namespace (records, events or indexes)
///
/// Every key in the partition is `base + suffix`, where `base` ends with the
/// key separator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Partition {
    base: String,
}

impl Partition {
    pub(crate) fn new(prefix: &str, name: &str) -> Self {
        Self {
            base: format!("{}{}{}{}", prefix, KEY_SEPARATOR, name, KEY_SEPARATOR),
        }
    }

    /// Key for `suffix` inside this partition
    pub fn key(&self, suffix: &str) -> String {
        let mut key = String::with_capacity(self.base.len() + suffix.len());
        key.push_str(&self.base);
        key.push_str(suffix);
        key
    }

    /// Key built from several components joined by the key separator
    pub fn compound_key(&self, components: &[&str]) -> String {
        let mut key = self.base.clone();
        for (i, component) in components.iter().enumerate() {
            if i > 0 {
                key.push(KEY_SEPARATOR);
            }
            key.push_str(component);
        }
        key
    }

    /// Range covering the whole partition
    pub fn range(&self) -> KeyRange {
        Self::closed_group(&self.base)
    }

    /// Range covering every key that extends the given components with a
    /// further separator-delimited component
    pub fn group(&self, components: &[&str]) -> KeyRange {
        let mut head = self.compound_key(components);
        head.push(KEY_SEPARATOR);
        Self::closed_group(&head)
    }

    /// `[head, head with its trailing separator bumped by one)`
    fn closed_group(head: &str) -> KeyRange {
        let stem = head.strip_suffix(KEY_SEPARATOR).unwrap_or(head);
        KeyRange::new(head, format!("{}\u{1}", stem))
    }
}
