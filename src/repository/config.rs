//! Repository configuration
//!
//! Plain fields load from JSON; the codec hooks and the completion handler
//! are code and have to be attached with the builder methods.

use serde::Deserialize;

use super::detached::CompletionHandler;
use super::errors::{RepositoryError, RepositoryResult};
use crate::index::IndexMode;
use crate::namespace::{
    has_reserved_chars, validate_component, DEFAULT_EVENT_NAMESPACE, DEFAULT_INDEX_NAMESPACE,
    RECORD_PARTITION,
};
use crate::record::{Codec, FieldPath, Record};

/// Options for one repository handle
#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryOptions {
    /// Namespace segment (required)
    pub namespace: String,

    /// Primary-key field (default: "id")
    #[serde(default = "default_primary_key")]
    pub primary_key: String,

    /// Indexed field paths (default: none)
    #[serde(default)]
    pub indexes: Vec<String>,

    /// Journal partition name (default: "~events")
    #[serde(default = "default_event_namespace")]
    pub event_namespace: String,

    /// Index partition name (default: "~indexes")
    #[serde(default = "default_index_namespace")]
    pub index_namespace: String,

    /// Index maintenance mode (default: append)
    #[serde(default)]
    pub index_mode: IndexMode,

    /// Encode/decode hooks (default: identity)
    #[serde(skip)]
    pub codec: Codec,

    /// Completion handler for detached writes (default: no-op)
    #[serde(skip)]
    pub completion: CompletionHandler,
}

fn default_primary_key() -> String {
    "id".to_string()
}

fn default_event_namespace() -> String {
    DEFAULT_EVENT_NAMESPACE.to_string()
}

fn default_index_namespace() -> String {
    DEFAULT_INDEX_NAMESPACE.to_string()
}

impl RepositoryOptions {
    /// Defaults for `namespace`
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            primary_key: default_primary_key(),
            indexes: Vec::new(),
            event_namespace: default_event_namespace(),
            index_namespace: default_index_namespace(),
            index_mode: IndexMode::default(),
            codec: Codec::default(),
            completion: CompletionHandler::default(),
        }
    }

    /// Parse options from a JSON document
    pub fn from_json(json: &str) -> RepositoryResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| RepositoryError::validation(format!("invalid repository options: {}", e)))
    }

    pub fn with_primary_key(mut self, field: impl Into<String>) -> Self {
        self.primary_key = field.into();
        self
    }

    /// Declare one more indexed field path
    pub fn with_index(mut self, path: impl Into<String>) -> Self {
        self.indexes.push(path.into());
        self
    }

    pub fn with_indexes<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.indexes.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn with_event_namespace(mut self, name: impl Into<String>) -> Self {
        self.event_namespace = name.into();
        self
    }

    pub fn with_index_namespace(mut self, name: impl Into<String>) -> Self {
        self.index_namespace = name.into();
        self
    }

    pub fn with_index_mode(mut self, mode: IndexMode) -> Self {
        self.index_mode = mode;
        self
    }

    pub fn with_codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    /// Set the encode hook, keeping the current decode hook
    pub fn with_encoder<F>(mut self, encoder: F) -> Self
    where
        F: Fn(Record) -> Record + Send + Sync + 'static,
    {
        self.codec = self.codec.with_encoder(encoder);
        self
    }

    /// Set the decode hook, keeping the current encode hook
    pub fn with_decoder<F>(mut self, decoder: F) -> Self
    where
        F: Fn(Record) -> Record + Send + Sync + 'static,
    {
        self.codec = self.codec.with_decoder(decoder);
        self
    }

    pub fn on_completion(mut self, handler: CompletionHandler) -> Self {
        self.completion = handler;
        self
    }

    /// Check every option and return the parsed index paths.
    ///
    /// Duplicate index paths are collapsed.
    pub fn validate(&self) -> RepositoryResult<Vec<FieldPath>> {
        validate_component("namespace", &self.namespace)?;
        validate_component("event namespace", &self.event_namespace)?;
        validate_component("index namespace", &self.index_namespace)?;

        if self.primary_key.is_empty() || has_reserved_chars(&self.primary_key) {
            return Err(RepositoryError::validation(format!(
                "primary key field {:?} must be non-empty and free of separators",
                self.primary_key
            )));
        }

        let partitions = [
            RECORD_PARTITION,
            self.event_namespace.as_str(),
            self.index_namespace.as_str(),
        ];
        for (i, a) in partitions.iter().enumerate() {
            if partitions[i + 1..].contains(a) {
                return Err(RepositoryError::validation(format!(
                    "partition name {:?} is used twice",
                    a
                )));
            }
        }

        let mut paths: Vec<FieldPath> = self
            .indexes
            .iter()
            .map(|raw| FieldPath::parse(raw))
            .collect::<RepositoryResult<_>>()?;
        paths.sort();
        paths.dedup();
        Ok(paths)
    }
}
