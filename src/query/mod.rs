//! Query engine subsystem for aerorepo
//!
//! Point lookups, ordered scans, unindexed scan-filter, and indexed lookups
//! through a concurrent fan-out/join. Every record leaving this module has
//! been decoded exactly once.

mod engine;
mod join;

pub use engine::QueryEngine;
pub use join::{FanOutJoin, Latch};
