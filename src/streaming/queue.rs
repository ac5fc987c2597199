//! FIFO of page requests without duplicates

use std::collections::{HashSet, VecDeque};

use crate::core::grid::PageCoord;

/// Page requests in arrival order; a page is queued at most once.
#[derive(Debug, Default)]
pub struct PageQueue {
    queue: VecDeque<PageCoord>,
    pending: HashSet<PageCoord>,
}

impl PageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a page; returns false if it is already queued
    pub fn push(&mut self, page: PageCoord) -> bool {
        if !self.pending.insert(page) {
            return false;
        }
        self.queue.push_back(page);
        true
    }

    pub fn pop(&mut self) -> Option<PageCoord> {
        let page = self.queue.pop_front()?;
        self.pending.remove(&page);
        Some(page)
    }

    pub fn contains(&self, page: PageCoord) -> bool {
        self.pending.contains(&page)
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PageCoord> {
        self.queue.iter()
    }
}
