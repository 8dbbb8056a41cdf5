//! Ordered record of executed commands.
//!
//! Unbounded unless a capacity is given, in which case the oldest result is
//! dropped to make room.

use std::collections::VecDeque;

use super::CommandResult;

#[derive(Debug, Clone, Default)]
pub struct History {
    entries: VecDeque<CommandResult>,
    capacity: Option<usize>,
}

impl History {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
        }
    }

    /// Append a result, evicting the oldest one when at capacity.
    pub fn push(&mut self, result: CommandResult) {
        if let Some(cap) = self.capacity {
            if cap == 0 {
                return;
            }
            while self.entries.len() >= cap {
                self.entries.pop_front();
            }
        }
        self.entries.push_back(result);
    }

    /// All results, oldest first.
    pub fn entries(&self) -> Vec<CommandResult> {
        self.entries.iter().cloned().collect()
    }

    /// Get the most recent n results, oldest first.
    pub fn recent(&self, n: usize) -> Vec<CommandResult> {
        let start = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(start).cloned().collect()
    }

    pub fn last(&self) -> Option<&CommandResult> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
