//! Client-side id generation
//!
//! Ids look like `node_1718000000000_7_3f9a1c2e`: a prefix, the wall clock
//! in milliseconds, a per-generator sequence number and a random suffix.
//! The sequence keeps ids from one generator distinct even within the same
//! millisecond; the random suffix keeps two sessions apart.

use chrono::Utc;
use uuid::Uuid;

/// Prefix of generated node ids
pub const NODE_PREFIX: &str = "node";

/// Prefix of generated edge ids
pub const EDGE_PREFIX: &str = "edge";

/// Source of fresh node and edge ids
pub trait IdSource: Send {
    fn next_id(&mut self, prefix: &str) -> String;

    fn node_id(&mut self) -> String {
        self.next_id(NODE_PREFIX)
    }

    fn edge_id(&mut self) -> String {
        self.next_id(EDGE_PREFIX)
    }
}

/// Timestamp plus random disambiguator
#[derive(Debug, Default)]
pub struct IdGenerator {
    seq: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdSource for IdGenerator {
    fn next_id(&mut self, prefix: &str) -> String {
        self.seq += 1;
        let random = Uuid::new_v4().simple().to_string();
        format!(
            "{}_{}_{}_{}",
            prefix,
            Utc::now().timestamp_millis(),
            self.seq,
            &random[..8]
        )
    }
}

/// Predictable ids (`node_1`, `edge_2`, ...) for tests and fixtures
#[derive(Debug, Default)]
pub struct SequentialIds {
    next: u64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdSource for SequentialIds {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next += 1;
        format!("{}_{}", prefix, self.next)
    }
}
