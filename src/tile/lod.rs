//! Distance-based render level selection with hysteresis.
//!
//! Level 0 is full detail; level `l` samples every `2^l` vertices.
//! Thresholds are squared distances so no square root is taken per tile.

use crate::core::config::TerrainConfig;

/// Squared-distance thresholds, one per render level.
///
/// `T[l] = (l * lod_factor * tile_extent)^2`. A renderable at level `l`
/// refines when the biased squared distance drops below `T[l]` and coarsens
/// only once it exceeds `2 * T[l + 1]`.
///
/// # Examples
/// ```
/// use terrapage::tile::lod::LodThresholds;
///
/// let lod = LodThresholds::new(3, 1.0, 10.0);
/// assert_eq!(lod.threshold(1), 100.0);
/// assert_eq!(lod.next_level(1, 50.0), 0);   // close: refine
/// assert_eq!(lod.next_level(1, 150.0), 1);  // inside the band: hold
/// assert_eq!(lod.next_level(1, 900.0), 2);  // past 2 * T[2]: coarsen
/// ```
#[derive(Clone, Debug)]
pub struct LodThresholds {
    thresholds: Vec<f32>,
}

impl LodThresholds {
    pub fn new(max_render_level: u32, lod_factor: f32, tile_extent: f32) -> Self {
        let thresholds = (0..=max_render_level)
            .map(|level| {
                let d = level as f32 * lod_factor * tile_extent;
                d * d
            })
            .collect();
        Self { thresholds }
    }

    pub fn from_config(config: &TerrainConfig) -> Self {
        let extent = config.tile_extent();
        Self::new(config.max_render_level, config.lod_factor, extent.x.max(extent.y))
    }

    pub fn max_level(&self) -> u32 {
        (self.thresholds.len() - 1) as u32
    }

    /// Squared distance threshold of a level
    pub fn threshold(&self, level: u32) -> f32 {
        self.thresholds[(level as usize).min(self.thresholds.len() - 1)]
    }

    /// Level a renderable should move to this frame; at most one step.
    pub fn next_level(&self, current: u32, biased_dist_sq: f32) -> u32 {
        let current = current.min(self.max_level());
        if current > 0 && biased_dist_sq < self.threshold(current) {
            current - 1
        } else if current < self.max_level() && biased_dist_sq > 2.0 * self.threshold(current + 1) {
            current + 1
        } else {
            current
        }
    }

    /// Level a fresh renderable starts at
    pub fn initial_level(&self) -> u32 {
        self.max_level() / 2
    }
}

/// Vertex stride of a render level
pub fn level_step(level: u32) -> u32 {
    1 << level
}
