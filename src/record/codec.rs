//! Encode/decode hooks
//!
//! `encode` runs once on every record right before it is written; `decode`
//! runs once on every record right after it is read. Both default to the
//! identity. Hooks must be pure: the repository may call them from any task.

use std::fmt;
use std::sync::Arc;

use super::Record;

/// A record transform
pub type RecordHook = Arc<dyn Fn(Record) -> Record + Send + Sync>;

/// The pair of hooks wrapped around every write and read
#[derive(Clone, Default)]
pub struct Codec {
    encoder: Option<RecordHook>,
    decoder: Option<RecordHook>,
}

impl Codec {
    /// Identity codec
    pub fn identity() -> Self {
        Self::default()
    }

    /// Set the encode hook
    pub fn with_encoder<F>(mut self, encoder: F) -> Self
    where
        F: Fn(Record) -> Record + Send + Sync + 'static,
    {
        self.encoder = Some(Arc::new(encoder));
        self
    }

    /// Set the decode hook
    pub fn with_decoder<F>(mut self, decoder: F) -> Self
    where
        F: Fn(Record) -> Record + Send + Sync + 'static,
    {
        self.decoder = Some(Arc::new(decoder));
        self
    }

    /// Apply the encode hook
    pub fn encode(&self, record: Record) -> Record {
        match &self.encoder {
            Some(encoder) => encoder(record),
            None => record,
        }
    }

    /// Apply the decode hook
    pub fn decode(&self, record: Record) -> Record {
        match &self.decoder {
            Some(decoder) => decoder(record),
            None => record,
        }
    }
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec")
            .field("encoder", &self.encoder.is_some())
            .field("decoder", &self.decoder.is_some())
            .finish()
    }
}
