//! Height data for every page of the world, loaded and released on demand.

use crate::core::config::TerrainConfig;
use crate::core::error::Error;
use crate::core::grid::PageCoord;
use crate::core::types::{Result, Vec3};
use crate::math::BoundingSphere;

use super::source::{HeightSource, PageDataSource};

/// A sample rewritten by a deformation
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DeformedSample {
    pub page: PageCoord,
    pub x: u32,
    pub z: u32,
    pub height: f32,
}

/// Owns the height source of each preloaded page.
pub struct HeightStore {
    config: TerrainConfig,
    sources: Vec<Option<HeightSource>>,
    loader: Box<dyn PageDataSource>,
    deformations: Vec<BoundingSphere>,
}

impl HeightStore {
    pub fn new(config: &TerrainConfig, loader: Box<dyn PageDataSource>) -> Self {
        let mut sources = Vec::with_capacity(config.page_count());
        sources.resize_with(config.page_count(), || None);
        Self {
            config: config.clone(),
            sources,
            loader,
            deformations: Vec::new(),
        }
    }

    fn slot(&self, page: PageCoord) -> Option<usize> {
        self.config
            .contains_page(page)
            .then(|| (page.z * self.config.world_width + page.x) as usize)
    }

    /// Load the height source of a page.
    ///
    /// Returns `Ok(false)` when the page was already loaded.
    pub fn preload(&mut self, page: PageCoord) -> Result<bool> {
        let slot = self.slot(page).ok_or(Error::OutOfWorld(page))?;
        if self.sources[slot].is_some() {
            return Ok(false);
        }
        let source = self.loader.load_page(page)?;
        if source.size() != self.config.page_size {
            return Err(Error::PageSizeMismatch {
                expected: self.config.page_size,
                actual: source.size(),
            });
        }
        log::debug!("Height data ready for page {}", page);
        self.sources[slot] = Some(source);
        Ok(true)
    }

    /// Drop the height source of a page. Returns whether anything was held.
    pub fn release(&mut self, page: PageCoord) -> bool {
        match self.slot(page) {
            Some(slot) => {
                let released = self.sources[slot].take().is_some();
                if released {
                    log::debug!("Height data released for page {}", page);
                }
                released
            }
            None => false,
        }
    }

    /// Release every page
    pub fn clear(&mut self) {
        self.sources.iter_mut().for_each(|s| *s = None);
    }

    pub fn is_loaded(&self, page: PageCoord) -> bool {
        self.source(page).is_some()
    }

    pub fn loaded_count(&self) -> usize {
        self.sources.iter().filter(|s| s.is_some()).count()
    }

    pub fn source(&self, page: PageCoord) -> Option<&HeightSource> {
        self.slot(page).and_then(|slot| self.sources[slot].as_ref())
    }

    fn source_mut(&mut self, page: PageCoord) -> Option<&mut HeightSource> {
        let slot = self.slot(page)?;
        self.sources[slot].as_mut()
    }

    pub fn height_at(&self, page: PageCoord, x: i64, z: i64) -> f32 {
        self.source(page).map_or(0.0, |s| s.height_at(x, z))
    }

    pub fn height(&self, page: PageCoord, x: f32, z: f32) -> f32 {
        self.source(page).map_or(0.0, |s| s.height(x, z))
    }

    pub fn height_at_pos(&self, page: PageCoord, pos: i64) -> f32 {
        self.source(page).map_or(0.0, |s| s.height_at_pos(pos))
    }

    pub fn normal_at(&self, page: PageCoord, x: i64, z: i64) -> Vec3 {
        self.source(page).map_or(Vec3::Y, |s| s.normal_at(x, z))
    }

    pub fn coverage_at(&self, page: PageCoord, x: i64, z: i64) -> [u8; 4] {
        self.source(page).map_or(super::height_field::WHITE, |s| s.coverage_at(x, z))
    }

    pub fn base_at(&self, page: PageCoord, x: i64, z: i64) -> [u8; 4] {
        self.source(page).map_or(super::height_field::WHITE, |s| s.base_at(x, z))
    }

    /// Page and fractional sample position under a world point, if inside the world
    fn locate(&self, point: Vec3) -> Option<(PageCoord, f32, f32)> {
        let (ix, iz) = self.config.page_index_unclamped(point);
        if ix < 0 || iz < 0 || ix >= self.config.world_width as i64 || iz >= self.config.world_height as i64 {
            return None;
        }
        let page = PageCoord::new(ix as u32, iz as u32);
        let local = point - self.config.page_origin(page);
        let scale = self.config.scale();
        Some((page, local.x / scale.x, local.z / scale.z))
    }

    /// Interpolated height under a world point; 0 when nothing is loaded there
    pub fn world_height(&self, point: Vec3) -> f32 {
        match self.locate(point) {
            Some((page, x, z)) => self.height(page, x, z),
            None => 0.0,
        }
    }

    /// Every (page, x, z) holding the same world sample as `(page, x, z)`.
    ///
    /// Edge samples are shared with the adjacent page, corner samples with up
    /// to three other pages.
    fn sample_aliases(&self, page: PageCoord, x: u32, z: u32) -> Vec<(PageCoord, u32, u32)> {
        let last = self.config.page_size - 1;

        let mut xs = vec![(page.x, x)];
        if x == 0 && page.x > 0 {
            xs.push((page.x - 1, last));
        }
        if x == last && page.x + 1 < self.config.world_width {
            xs.push((page.x + 1, 0));
        }

        let mut zs = vec![(page.z, z)];
        if z == 0 && page.z > 0 {
            zs.push((page.z - 1, last));
        }
        if z == last && page.z + 1 < self.config.world_height {
            zs.push((page.z + 1, 0));
        }

        xs.iter()
            .flat_map(|&(px, sx)| zs.iter().map(move |&(pz, sz)| (PageCoord::new(px, pz), sx, sz)))
            .collect()
    }

    /// Lower the sample nearest `point` by `delta` (clamped at 0).
    ///
    /// When the sample lies on a page edge the new value is copied into the
    /// matching sample of each loaded page sharing it. If the page under the
    /// point has no height data, the first loaded sharing page takes the edit
    /// instead. Returns every sample written; empty when the point is outside
    /// the world, no page holding the sample is loaded, or the pages are
    /// generated.
    pub fn deform_height(&mut self, point: Vec3, delta: f32) -> Vec<DeformedSample> {
        let Some((page, fx, fz)) = self.locate(point) else {
            return Vec::new();
        };
        let last = (self.config.page_size - 1) as f32;
        let x = fx.round().clamp(0.0, last) as u32;
        let z = fz.round().clamp(0.0, last) as u32;

        let mut aliases = self.sample_aliases(page, x, z);
        let Some(first) = aliases.iter().position(|&(p, _, _)| self.is_loaded(p)) else {
            return Vec::new();
        };
        let (page, x, z) = aliases.remove(first);
        let Some(height) = self.source_mut(page).and_then(|s| s.deform(x, z, delta)) else {
            return Vec::new();
        };

        let mut written = vec![DeformedSample { page, x, z, height }];
        for (alias, ax, az) in aliases {
            if let Some(source) = self.source_mut(alias) {
                if source.set_height(ax, az, height) {
                    written.push(DeformedSample { page: alias, x: ax, z: az, height });
                }
            }
        }
        log::trace!("Deformed {} sample(s) around page {}", written.len(), page);
        written
    }

    /// Register a deformation volume. Rejected if it overlaps an existing one.
    pub fn add_new_height(&mut self, volume: BoundingSphere) -> bool {
        if self.deformations.iter().any(|d| d.intersects(&volume)) {
            return false;
        }
        self.deformations.push(volume);
        true
    }

    /// Remove a previously registered deformation volume
    pub fn remove_new_height(&mut self, volume: &BoundingSphere) -> bool {
        match self.deformations.iter().position(|d| d == volume) {
            Some(idx) => {
                self.deformations.swap_remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn deformations(&self) -> &[BoundingSphere] {
        &self.deformations
    }
}
