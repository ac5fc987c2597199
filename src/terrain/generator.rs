//! Procedural height generation for pages without a stored height field

use noise::{Fbm, MultiFractal, NoiseFn, Perlin};

use crate::core::config::TerrainConfig;
use crate::core::grid::PageCoord;
use crate::core::types::Vec3;

/// Supplies heights on demand for generated pages.
///
/// Coordinates are page-local sample positions in `0..=page_size-1`; the
/// returned height is in world units.
pub trait HeightGenerator {
    fn height(&self, page: PageCoord, x: f32, z: f32) -> f32;

    /// Surface normal; defaults to central differences over `height`
    fn normal(&self, page: PageCoord, x: f32, z: f32, scale: Vec3) -> Vec3 {
        let dx = (self.height(page, x + 1.0, z) - self.height(page, x - 1.0, z)) / (2.0 * scale.x);
        let dz = (self.height(page, x, z + 1.0) - self.height(page, x, z - 1.0)) / (2.0 * scale.z);
        Vec3::new(-dx, 1.0, -dz).normalize()
    }
}

impl<F> HeightGenerator for F
where
    F: Fn(PageCoord, f32, f32) -> f32,
{
    fn height(&self, page: PageCoord, x: f32, z: f32) -> f32 {
        self(page, x, z)
    }
}

/// Parameters controlling noise terrain
#[derive(Clone, Debug)]
pub struct NoiseParams {
    pub seed: u32,
    pub scale: f32,        // Samples per noise feature (larger = smoother)
    pub octaves: u32,      // FBM octaves (detail levels)
    pub persistence: f32,  // FBM persistence (0.5 typical)
    pub lacunarity: f32,   // FBM lacunarity (2.0 typical)
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            seed: 12345,
            scale: 100.0,
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
        }
    }
}

/// Fractal Brownian motion terrain that is continuous across page borders
pub struct NoiseHeightGenerator {
    params: NoiseParams,
    noise: Fbm<Perlin>,
    page_quads: f32,
    height_scale: f32,
}

impl NoiseHeightGenerator {
    pub fn new(params: NoiseParams, config: &TerrainConfig) -> Self {
        let noise = Fbm::<Perlin>::new(params.seed)
            .set_octaves(params.octaves as usize)
            .set_persistence(params.persistence as f64)
            .set_lacunarity(params.lacunarity as f64);

        Self {
            params,
            noise,
            page_quads: (config.page_size - 1) as f32,
            height_scale: config.scale[1],
        }
    }

    pub fn params(&self) -> &NoiseParams {
        &self.params
    }

    /// Height at a global sample position
    pub fn height_at_global(&self, gx: f32, gz: f32) -> f32 {
        let nx = (gx / self.params.scale) as f64;
        let nz = (gz / self.params.scale) as f64;

        // Noise in [-1, 1] mapped to [0, height_scale]
        let normalized = ((self.noise.get([nx, nz]) + 1.0) / 2.0).clamp(0.0, 1.0);
        (normalized * self.height_scale as f64) as f32
    }
}

impl HeightGenerator for NoiseHeightGenerator {
    fn height(&self, page: PageCoord, x: f32, z: f32) -> f32 {
        self.height_at_global(
            page.x as f32 * self.page_quads + x,
            page.z as f32 * self.page_quads + z,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TerrainConfig {
        TerrainConfig {
            page_size: 17,
            tile_size: 16,
            max_render_level: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_noise_params_default() {
        let params = NoiseParams::default();
        assert_eq!(params.seed, 12345);
        assert_eq!(params.octaves, 4);
        assert_eq!(params.persistence, 0.5);
        assert_eq!(params.lacunarity, 2.0);
    }

    #[test]
    fn test_height_in_range_and_deterministic() {
        let config = config();
        let generator = NoiseHeightGenerator::new(NoiseParams::default(), &config);
        let page = PageCoord::new(2, 3);
        for (x, z) in [(0.0, 0.0), (8.5, 3.25), (16.0, 16.0)] {
            let h = generator.height(page, x, z);
            assert!(h >= 0.0 && h <= config.scale[1]);
            assert_eq!(h, generator.height(page, x, z));
        }
    }

    #[test]
    fn test_continuous_across_page_edge() {
        let generator = NoiseHeightGenerator::new(NoiseParams::default(), &config());
        let west = generator.height(PageCoord::new(0, 0), 16.0, 5.0);
        let east = generator.height(PageCoord::new(1, 0), 0.0, 5.0);
        assert_eq!(west, east);
    }

    #[test]
    fn test_different_seeds_differ() {
        let config = config();
        let a = NoiseHeightGenerator::new(NoiseParams { seed: 1, ..Default::default() }, &config);
        let b = NoiseHeightGenerator::new(NoiseParams { seed: 2, ..Default::default() }, &config);
        let page = PageCoord::new(0, 0);
        assert_ne!(a.height(page, 5.3, 7.1), b.height(page, 5.3, 7.1));
    }

    #[test]
    fn test_closure_generator_and_default_normal() {
        let plane = |_page: PageCoord, x: f32, _z: f32| x * 0.5;
        assert_eq!(plane.height(PageCoord::new(0, 0), 4.0, 1.0), 2.0);

        let n = plane.normal(PageCoord::new(0, 0), 4.0, 1.0, Vec3::ONE);
        assert!(n.x < 0.0);
        assert!((n.length() - 1.0).abs() < 1e-5);
    }
}
