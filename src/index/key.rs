//! Index key values
//!
//! An indexed field value becomes an `IndexKey`, and an `IndexKey` renders
//! into a key component whose byte order matches the key's own ordering.

use std::fmt::Write;

/// Index key representing a typed scalar field value.
///
/// Supports String, Int (any JSON integer, i64 or u64), Float (f64 bits
/// for ordering), Bool.
/// Ordering is deterministic: Bool < Int < Float < String.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IndexKey {
    /// Boolean value (false < true)
    Bool(bool),
    /// Integer value, wide enough for both i64 and u64
    Int(i128),
    /// Float value (stored as bits for total ordering)
    Float(u64),
    /// String value
    String(String),
}

impl IndexKey {
    /// Create a key from a float
    ///
    /// Uses bit representation for total ordering. `-0.0` and `0.0` are
    /// the same key.
    pub fn from_float(v: f64) -> Self {
        let v = if v == 0.0 { 0.0 } else { v };
        let bits = v.to_bits();
        let ordered = if (bits >> 63) == 1 {
            !bits
        } else {
            bits ^ (1 << 63)
        };
        IndexKey::Float(ordered)
    }

    /// Create a key from a JSON value.
    ///
    /// Null, arrays and objects are not indexable.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(IndexKey::Bool(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(IndexKey::Int(i128::from(i)))
                } else if let Some(u) = n.as_u64() {
                    Some(IndexKey::Int(i128::from(u)))
                } else {
                    n.as_f64().map(IndexKey::from_float)
                }
            }
            serde_json::Value::String(s) => Some(IndexKey::String(s.clone())),
            _ => None,
        }
    }

    /// Render as an order-preserving key component.
    ///
    /// A one-digit type tag followed by lowercase hex. Integers are
    /// sign-flipped so negative values sort first; strings are hex-encoded
    /// byte by byte, which keeps their order and keeps separators out.
    pub fn encode(&self) -> String {
        match self {
            IndexKey::Bool(b) => format!("1{}", u8::from(*b)),
            IndexKey::Int(i) => format!("2{:032x}", (*i as u128) ^ (1 << 127)),
            IndexKey::Float(bits) => format!("3{:016x}", bits),
            IndexKey::String(s) => {
                let mut out = String::with_capacity(1 + s.len() * 2);
                out.push('4');
                for byte in s.as_bytes() {
                    let _ = write!(out, "{:02x}", byte);
                }
                out
            }
        }
    }
}
