//! Height pages decoded from image files on disk

use std::path::{Path, PathBuf};

use crate::core::config::TerrainConfig;
use crate::core::grid::PageCoord;
use crate::core::types::{Result, Vec3};

use super::height_field::{ColorMap, HeightField};
use super::source::{HeightSource, PageDataSource};

/// Reads `{prefix}.{x}.{z}.{extension}` height images from a directory.
///
/// Coverage and base color maps, when enabled, are read from
/// `{prefix}.Coverage.{x}.{z}.{extension}` and `{prefix}.Base.{x}.{z}.{extension}`.
#[derive(Clone, Debug)]
pub struct ImageSource {
    directory: PathBuf,
    prefix: String,
    extension: String,
    page_size: u32,
    scale: Vec3,
    load_coverage: bool,
    load_base: bool,
}

impl ImageSource {
    pub fn new(directory: impl Into<PathBuf>, prefix: impl Into<String>, config: &TerrainConfig) -> Self {
        Self {
            directory: directory.into(),
            prefix: prefix.into(),
            extension: "png".to_string(),
            page_size: config.page_size,
            scale: config.scale(),
            load_coverage: false,
            load_base: false,
        }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn with_coverage(mut self, enabled: bool) -> Self {
        self.load_coverage = enabled;
        self
    }

    pub fn with_base(mut self, enabled: bool) -> Self {
        self.load_base = enabled;
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of the height image for a page
    pub fn height_path(&self, page: PageCoord) -> PathBuf {
        self.directory
            .join(format!("{}.{}.{}.{}", self.prefix, page.x, page.z, self.extension))
    }

    fn map_path(&self, kind: &str, page: PageCoord) -> PathBuf {
        self.directory
            .join(format!("{}.{}.{}.{}.{}", self.prefix, kind, page.x, page.z, self.extension))
    }

    pub fn coverage_path(&self, page: PageCoord) -> PathBuf {
        self.map_path("Coverage", page)
    }

    pub fn base_path(&self, page: PageCoord) -> PathBuf {
        self.map_path("Base", page)
    }
}

impl PageDataSource for ImageSource {
    fn load_page(&self, page: PageCoord) -> Result<HeightSource> {
        let path = self.height_path(page);
        log::debug!("Loading height image {}", path.display());

        let image = image::open(&path)?;
        let mut field = HeightField::from_image(&image, self.page_size, self.scale)?;

        if self.load_coverage {
            let coverage = image::open(self.coverage_path(page))?;
            field = field.with_coverage(ColorMap::from_image(&coverage, self.page_size)?);
        }
        if self.load_base {
            let base = image::open(self.base_path(page))?;
            field = field.with_base(ColorMap::from_image(&base, self.page_size)?);
        }

        Ok(HeightSource::Static(field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::Error;
    use image::{GrayImage, Luma, Rgba, RgbaImage};
    use tempfile::TempDir;

    fn config() -> TerrainConfig {
        TerrainConfig {
            page_size: 5,
            tile_size: 4,
            max_render_level: 2,
            scale: [1.0, 255.0, 1.0],
            ..Default::default()
        }
    }

    #[test]
    fn test_paths() {
        let source = ImageSource::new("/data", "landscape", &config());
        let page = PageCoord::new(2, 7);
        assert_eq!(source.height_path(page), PathBuf::from("/data/landscape.2.7.png"));
        assert_eq!(source.coverage_path(page), PathBuf::from("/data/landscape.Coverage.2.7.png"));
        assert_eq!(source.base_path(page), PathBuf::from("/data/landscape.Base.2.7.png"));
    }

    #[test]
    fn test_load_height_and_maps() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let source = ImageSource::new(temp_dir.path(), "t", &config())
            .with_coverage(true)
            .with_base(true);
        let page = PageCoord::new(0, 1);

        let mut height = GrayImage::new(5, 5);
        height.put_pixel(4, 4, Luma([200]));
        height.save(source.height_path(page)).expect("write height");

        let mut coverage = RgbaImage::new(5, 5);
        coverage.put_pixel(1, 1, Rgba([1, 2, 3, 4]));
        coverage.save(source.coverage_path(page)).expect("write coverage");
        RgbaImage::new(5, 5).save(source.base_path(page)).expect("write base");

        let loaded = source.load_page(page).expect("page loads");
        assert!(!loaded.is_dynamic());
        assert!((loaded.height_at(4, 4) - 200.0).abs() < 1e-3);
        assert_eq!(loaded.coverage_at(1, 1), [1, 2, 3, 4]);
        assert_eq!(loaded.base_at(1, 1), [0, 0, 0, 0]);
    }

    #[test]
    fn test_missing_file_is_error() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let source = ImageSource::new(temp_dir.path(), "t", &config());
        assert!(matches!(source.load_page(PageCoord::new(0, 0)), Err(Error::Image(_))));
    }

    #[test]
    fn test_wrong_size_is_fatal() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let source = ImageSource::new(temp_dir.path(), "t", &config());
        GrayImage::new(6, 6).save(source.height_path(PageCoord::new(0, 0))).expect("write");
        assert!(matches!(
            source.load_page(PageCoord::new(0, 0)),
            Err(Error::InvalidDimensions { .. })
        ));
    }
}
