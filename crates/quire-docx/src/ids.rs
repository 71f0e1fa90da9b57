//! Type-scoped id generation

use std::collections::HashMap;

use crate::error::{DocxError, Result};

/// Entity kinds that receive their own id sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdKind {
    Paragraph,
    Row,
    Cell,
    Table,
    Drawing,
    Bookmark,
    Header,
    Footer,
    Image,
}

/// Monotonically increasing counters, one per [`IdKind`].
///
/// Every sequence starts at 1 and never repeats.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    counters: HashMap<IdKind, u32>,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next id for a kind.
    ///
    /// Fails once the sequence has reached `u32::MAX`, which only happens
    /// after observing an id that large in a loaded document.
    pub fn next(&mut self, kind: IdKind) -> Result<u32> {
        let counter = self.counters.entry(kind).or_insert(0);
        *counter = counter.checked_add(1).ok_or_else(|| {
            DocxError::invalid_state("next id", format!("{:?} ids are exhausted", kind))
        })?;
        Ok(*counter)
    }

    /// Make sure the next id for `kind` is greater than `seen`
    pub fn observe(&mut self, kind: IdKind, seen: u32) {
        let counter = self.counters.entry(kind).or_insert(0);
        *counter = (*counter).max(seen);
    }

    /// Last id handed out (or observed) for a kind, 0 if none
    pub fn current(&self, kind: IdKind) -> u32 {
        self.counters.get(&kind).copied().unwrap_or(0)
    }
}
