//! Per-page height sources and the loaders that produce them

use std::fmt;
use std::sync::Arc;

use crate::core::grid::PageCoord;
use crate::core::types::{Result, Vec3};

use super::generator::HeightGenerator;
use super::height_field::{HeightField, WHITE};

/// Height data backing one page
pub enum HeightSource {
    /// Samples decoded from an image (or supplied directly)
    Static(HeightField),
    /// No stored samples; every query goes to the generator
    Generated {
        page: PageCoord,
        size: u32,
        scale: Vec3,
        generator: Arc<dyn HeightGenerator>,
    },
}

impl fmt::Debug for HeightSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeightSource::Static(field) => f.debug_tuple("Static").field(&field.size()).finish(),
            HeightSource::Generated { page, size, .. } => f
                .debug_struct("Generated")
                .field("page", page)
                .field("size", size)
                .finish(),
        }
    }
}

impl HeightSource {
    pub fn is_dynamic(&self) -> bool {
        matches!(self, HeightSource::Generated { .. })
    }

    pub fn size(&self) -> u32 {
        match self {
            HeightSource::Static(field) => field.size(),
            HeightSource::Generated { size, .. } => *size,
        }
    }

    fn in_range(&self, x: i64, z: i64) -> bool {
        let size = self.size() as i64;
        x >= 0 && z >= 0 && x < size && z < size
    }

    /// Height at an integer sample; 0 outside the page
    pub fn height_at(&self, x: i64, z: i64) -> f32 {
        match self {
            HeightSource::Static(field) => field.height_at(x, z),
            HeightSource::Generated { page, generator, .. } => {
                if self.in_range(x, z) {
                    generator.height(*page, x as f32, z as f32)
                } else {
                    0.0
                }
            }
        }
    }

    /// Height at fractional sample coordinates; 0 outside the page
    pub fn height(&self, x: f32, z: f32) -> f32 {
        match self {
            HeightSource::Static(field) => field.height(x, z),
            HeightSource::Generated { page, size, generator, .. } => {
                let last = (*size - 1) as f32;
                if (0.0..=last).contains(&x) && (0.0..=last).contains(&z) {
                    generator.height(*page, x, z)
                } else {
                    0.0
                }
            }
        }
    }

    /// Height at a flat array position (`z * size + x`); 0 outside the page
    pub fn height_at_pos(&self, pos: i64) -> f32 {
        match self {
            HeightSource::Static(field) => field.height_at_pos(pos),
            HeightSource::Generated { size, .. } => {
                let size = *size as i64;
                if pos < 0 || pos >= size * size {
                    return 0.0;
                }
                self.height_at(pos % size, pos / size)
            }
        }
    }

    pub fn normal_at(&self, x: i64, z: i64) -> Vec3 {
        match self {
            HeightSource::Static(field) => field.normal_at(x, z),
            HeightSource::Generated { page, scale, generator, .. } => {
                if self.in_range(x, z) {
                    generator.normal(*page, x as f32, z as f32, *scale)
                } else {
                    Vec3::Y
                }
            }
        }
    }

    /// Lower a stored sample. Generated pages have nothing to edit.
    pub fn deform(&mut self, x: u32, z: u32, delta: f32) -> Option<f32> {
        match self {
            HeightSource::Static(field) => field.deform(x, z, delta),
            HeightSource::Generated { .. } => None,
        }
    }

    pub fn set_height(&mut self, x: u32, z: u32, value: f32) -> bool {
        match self {
            HeightSource::Static(field) => field.set_height(x, z, value),
            HeightSource::Generated { .. } => false,
        }
    }

    pub fn coverage_at(&self, x: i64, z: i64) -> [u8; 4] {
        match self {
            HeightSource::Static(field) => field.coverage_at(x, z),
            HeightSource::Generated { .. } => WHITE,
        }
    }

    pub fn base_at(&self, x: i64, z: i64) -> [u8; 4] {
        match self {
            HeightSource::Static(field) => field.base_at(x, z),
            HeightSource::Generated { .. } => WHITE,
        }
    }
}

/// Produces the height source of a page when it is preloaded
pub trait PageDataSource {
    fn load_page(&self, page: PageCoord) -> Result<HeightSource>;
}

/// Binds every page to a shared generator
pub struct GeneratedSource {
    generator: Arc<dyn HeightGenerator>,
    page_size: u32,
    scale: Vec3,
}

impl GeneratedSource {
    pub fn new(generator: Arc<dyn HeightGenerator>, page_size: u32, scale: Vec3) -> Self {
        Self { generator, page_size, scale }
    }
}

impl PageDataSource for GeneratedSource {
    fn load_page(&self, page: PageCoord) -> Result<HeightSource> {
        Ok(HeightSource::Generated {
            page,
            size: self.page_size,
            scale: self.scale,
            generator: Arc::clone(&self.generator),
        })
    }
}
