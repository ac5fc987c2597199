//! Shared index buffers keyed by render level and stitch mask.
//!
//! The key space is bounded (levels × masks), so entries are built on first
//! use and kept until the cache is cleared.

use std::collections::HashMap;
use std::sync::Arc;

use super::stitch::{generate_indices, StitchMask};

/// Cache of generated tile index buffers
pub struct IndexCache {
    tile_size: u32,
    buffers: HashMap<(u32, StitchMask), Arc<[u32]>>,
    hits: u64,
    misses: u64,
}

impl IndexCache {
    pub fn new(tile_size: u32) -> Self {
        Self {
            tile_size,
            buffers: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    /// Get the index buffer for a level and mask, generating it on a miss.
    pub fn get(&mut self, level: u32, mask: StitchMask) -> Arc<[u32]> {
        if let Some(buffer) = self.buffers.get(&(level, mask)) {
            self.hits += 1;
            return Arc::clone(buffer);
        }

        self.misses += 1;
        let buffer: Arc<[u32]> = generate_indices(self.tile_size, level, mask).into();
        log::trace!(
            "Index cache miss: level {} mask {:#06x} ({} indices)",
            level,
            mask.bits(),
            buffer.len()
        );
        self.buffers.insert((level, mask), Arc::clone(&buffer));
        buffer
    }

    pub fn contains(&self, level: u32, mask: StitchMask) -> bool {
        self.buffers.contains_key(&(level, mask))
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// (hits, misses) since creation
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }

    pub fn clear(&mut self) {
        self.buffers.clear();
    }
}
