//! Namespace resolution for aerorepo
//!
//! Every repository owns one namespace: a path of segments rendered into a
//! storage-key prefix. Sub-repositories extend the parent's path, so nesting
//! composes by concatenation.
//!
//! # Key layout
//!
//! ```text
//! prefix(path)     = concat("\u{1}" + segment)
//! partition(name)  = prefix + "\u{0}" + name + "\u{0}"
//! record key       = partition("~records") + primary_key
//! event key        = partition(event_ns)  + primary_key + "\u{0}" + uuid
//! index key        = partition(index_ns)  + field + "\u{0}" + value + "\u{0}" + primary_key
//! ```
//!
//! # Invariants
//!
//! - Segments and key components never contain `\u{0}` or `\u{1}`
//! - After its prefix, a parent's own keys continue with `\u{0}` and a child's
//!   with `\u{1}`, so parent and child key spaces are disjoint
//! - Sibling prefixes differ inside a segment, before either terminator, so
//!   sibling key spaces are disjoint

mod keys;

use std::fmt;

pub use keys::Partition;

use crate::repository::{RepositoryError, RepositoryResult};
use crate::store::KeyRange;

/// Separates the segments of a namespace path
pub const NAMESPACE_SEPARATOR: char = '\u{1}';

/// Separates a partition name and the components of a key
pub const KEY_SEPARATOR: char = '\u{0}';

/// Partition holding the primary records
pub const RECORD_PARTITION: &str = "~records";

/// Default partition for the event journal
pub const DEFAULT_EVENT_NAMESPACE: &str = "~events";

/// Default partition for secondary indexes
pub const DEFAULT_INDEX_NAMESPACE: &str = "~indexes";

/// Returns true if `s` contains a reserved separator character
pub fn has_reserved_chars(s: &str) -> bool {
    s.contains(KEY_SEPARATOR) || s.contains(NAMESPACE_SEPARATOR)
}

/// Checks that `value` can be embedded in a storage key
pub fn validate_component(what: &str, value: &str) -> RepositoryResult<()> {
    if value.is_empty() {
        return Err(RepositoryError::validation(format!("{} must not be empty", what)));
    }
    if has_reserved_chars(value) {
        return Err(RepositoryError::validation(format!(
            "{} {:?} contains a reserved separator character",
            what, value
        )));
    }
    Ok(())
}

/// A resolved namespace path and its key prefix
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    segments: Vec<String>,
    prefix: String,
}

impl Namespace {
    /// Create a top-level namespace
    pub fn root(name: &str) -> RepositoryResult<Self> {
        validate_component("namespace", name)?;
        Ok(Self {
            segments: vec![name.to_string()],
            prefix: format!("{}{}", NAMESPACE_SEPARATOR, name),
        })
    }

    /// Create a child namespace below this one
    pub fn child(&self, name: &str) -> RepositoryResult<Self> {
        validate_component("namespace", name)?;
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        Ok(Self {
            segments,
            prefix: format!("{}{}{}", self.prefix, NAMESPACE_SEPARATOR, name),
        })
    }

    /// Path segments, outermost first
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Nesting depth (1 for a top-level namespace)
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Storage-key prefix shared by everything in this namespace
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// A named partition inside this namespace
    pub fn partition(&self, name: &str) -> Partition {
        Partition::new(&self.prefix, name)
    }

    /// Every key owned by this namespace and all of its descendants
    pub fn subtree(&self) -> KeyRange {
        KeyRange::new(
            format!("{}{}", self.prefix, KEY_SEPARATOR),
            format!("{}\u{2}", self.prefix),
        )
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}
