//! Undo/redo history using compressed snapshots
//!
//! Each entry is a zstd-compressed JSON snapshot of the whole graph. The
//! entry at the cursor is the graph currently shown; undo and redo move the
//! cursor and hand back the graph to restore.

use std::collections::VecDeque;

use crate::error::{GraphError, Result};
use crate::types::WorkflowGraph;

/// Default number of snapshots kept
pub const DEFAULT_UNDO_DEPTH: usize = 100;

/// Undo/redo stack using compressed snapshots
#[derive(Debug)]
pub struct UndoStack {
    /// Compressed graph states (zstd)
    snapshots: VecDeque<Vec<u8>>,
    /// Position of the current graph in the stack
    current: usize,
    max_snapshots: usize,
}

impl UndoStack {
    /// Create a new undo stack with the specified maximum size
    pub fn new(max_snapshots: usize) -> Self {
        Self {
            snapshots: VecDeque::new(),
            current: 0,
            max_snapshots: max_snapshots.max(1),
        }
    }

    /// Record a new current graph
    ///
    /// Truncates any redo history. A graph identical to the current entry
    /// is not recorded twice.
    pub fn push(&mut self, graph: &WorkflowGraph) -> Result<()> {
        let json = serde_json::to_vec(graph)?;
        let compressed =
            zstd::encode_all(&json[..], 3).map_err(|e| GraphError::Compression(e.to_string()))?;

        if self.snapshots.get(self.current) == Some(&compressed) {
            return Ok(());
        }

        self.snapshots.truncate(self.current + 1);
        self.snapshots.push_back(compressed);
        self.current = self.snapshots.len() - 1;

        while self.snapshots.len() > self.max_snapshots {
            self.snapshots.pop_front();
            self.current = self.current.saturating_sub(1);
        }

        Ok(())
    }

    /// Forget everything and start over from `graph`
    pub fn reset(&mut self, graph: &WorkflowGraph) -> Result<()> {
        self.clear();
        self.push(graph)
    }

    /// Move back one snapshot
    ///
    /// Returns the previous graph state, or None if at the beginning.
    pub fn undo(&mut self) -> Option<Result<WorkflowGraph>> {
        if !self.can_undo() {
            return None;
        }
        self.current -= 1;
        Some(self.decompress(self.current))
    }

    /// Move forward one snapshot
    ///
    /// Returns the next graph state, or None if at the end.
    pub fn redo(&mut self) -> Option<Result<WorkflowGraph>> {
        if !self.can_redo() {
            return None;
        }
        self.current += 1;
        Some(self.decompress(self.current))
    }

    pub fn can_undo(&self) -> bool {
        self.current > 0
    }

    pub fn can_redo(&self) -> bool {
        self.current + 1 < self.snapshots.len()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
        self.current = 0;
    }

    /// Total compressed size of all snapshots
    pub fn compressed_size(&self) -> usize {
        self.snapshots.iter().map(|s| s.len()).sum()
    }

    fn decompress(&self, index: usize) -> Result<WorkflowGraph> {
        let compressed = self
            .snapshots
            .get(index)
            .ok_or_else(|| GraphError::Compression(format!("No snapshot at {}", index)))?;
        let json =
            zstd::decode_all(&compressed[..]).map_err(|e| GraphError::Compression(e.to_string()))?;
        Ok(serde_json::from_slice(&json)?)
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new(DEFAULT_UNDO_DEPTH)
    }
}
