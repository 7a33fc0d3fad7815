//! Linear undo/redo history.
//!
//! `current` counts the transactions that are applied. Pushing drops
//! everything after it; there is no redo branching.

use crate::editor::Transaction;

#[derive(Debug, Clone)]
pub struct UndoLog {
    entries: Vec<Transaction>,
    current: usize,
    /// Maximum number of entries kept; 0 disables history
    limit: usize,
}

impl UndoLog {
    pub fn new(limit: usize) -> Self {
        UndoLog {
            entries: Vec::new(),
            current: 0,
            limit,
        }
    }

    pub fn push(&mut self, transaction: Transaction) {
        self.entries.truncate(self.current);
        if self.limit == 0 {
            self.current = 0;
            return;
        }
        self.entries.push(transaction);
        if self.entries.len() > self.limit {
            let excess = self.entries.len() - self.limit;
            self.entries.drain(..excess);
        }
        self.current = self.entries.len();
    }

    /// Step back; returns the transaction to revert.
    pub fn undo(&mut self) -> Option<&Transaction> {
        if self.current == 0 {
            return None;
        }
        self.current -= 1;
        self.entries.get(self.current)
    }

    /// Step forward; returns the transaction to re-apply.
    pub fn redo(&mut self) -> Option<&Transaction> {
        if self.current >= self.entries.len() {
            return None;
        }
        self.current += 1;
        self.entries.get(self.current - 1)
    }

    pub fn can_undo(&self) -> bool {
        self.current > 0
    }

    pub fn can_redo(&self) -> bool {
        self.current < self.entries.len()
    }

    pub fn reset(&mut self) {
        self.entries.clear();
        self.current = 0;
    }

    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit;
        if self.entries.len() > limit {
            let excess = self.entries.len() - limit;
            self.entries.drain(..excess);
            self.current = self.current.saturating_sub(excess);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of transactions currently applied.
    pub fn current(&self) -> usize {
        self.current
    }
}

impl Default for UndoLog {
    fn default() -> Self {
        UndoLog::new(256)
    }
}
