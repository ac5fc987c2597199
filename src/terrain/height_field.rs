//! Stored per-page height samples and companion color maps.

use image::DynamicImage;

use crate::core::error::Error;
use crate::core::types::{Result, Vec3};

/// Color returned for coverage/base lookups outside the map
pub const WHITE: [u8; 4] = [255, 255, 255, 255];

/// `n` is `2^k + 1` for some `k >= 1`
pub fn is_pow2_plus_one(n: u32) -> bool {
    n >= 3 && (n - 1).is_power_of_two()
}

fn check_dimensions(width: u32, height: u32, expected: u32) -> Result<()> {
    if !is_pow2_plus_one(width) || !is_pow2_plus_one(height) {
        return Err(Error::InvalidDimensions { width, height });
    }
    if width != expected || height != expected {
        return Err(Error::PageSizeMismatch {
            expected,
            actual: width.max(height),
        });
    }
    Ok(())
}

/// Square grid of world-space heights for one page.
#[derive(Clone, Debug)]
pub struct HeightField {
    size: u32,
    heights: Vec<f32>,
    scale: Vec3,
    coverage: Option<ColorMap>,
    base: Option<ColorMap>,
}

impl HeightField {
    /// Wrap already-scaled heights laid out row by row (`z * size + x`).
    pub fn from_heights(size: u32, heights: Vec<f32>, scale: Vec3) -> Result<Self> {
        check_dimensions(size, size, size)?;
        if heights.len() != (size * size) as usize {
            return Err(Error::PageSizeMismatch {
                expected: size,
                actual: (heights.len() as f64).sqrt() as u32,
            });
        }
        Ok(Self {
            size,
            heights,
            scale,
            coverage: None,
            base: None,
        })
    }

    /// Decode a height image.
    ///
    /// Accepts 8-bit greyscale or 8-bit RGBA, where the last channel holds
    /// the sample. Samples are normalized to 0..1 and multiplied by `scale.y`.
    pub fn from_image(image: &DynamicImage, expected_size: u32, scale: Vec3) -> Result<Self> {
        check_dimensions(image.width(), image.height(), expected_size)?;

        let samples: Vec<u8> = match image {
            DynamicImage::ImageLuma8(grey) => grey.as_raw().clone(),
            DynamicImage::ImageRgba8(rgba) => rgba.as_raw().chunks_exact(4).map(|px| px[3]).collect(),
            other => return Err(Error::UnsupportedChannels(other.color().channel_count())),
        };

        let heights = samples
            .into_iter()
            .map(|s| s as f32 / 255.0 * scale.y)
            .collect();

        Self::from_heights(expected_size, heights, scale)
    }

    pub fn with_coverage(mut self, map: ColorMap) -> Self {
        self.coverage = Some(map);
        self
    }

    pub fn with_base(mut self, map: ColorMap) -> Self {
        self.base = Some(map);
        self
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn is_loaded(&self) -> bool {
        !self.heights.is_empty()
    }

    /// One past the last valid flat array position
    pub fn max_array_pos(&self) -> usize {
        self.heights.len()
    }

    /// Height at a flat array position; 0 outside `[0, max_array_pos)`
    pub fn height_at_pos(&self, pos: i64) -> f32 {
        if pos < 0 {
            return 0.0;
        }
        self.heights.get(pos as usize).copied().unwrap_or(0.0)
    }

    /// Height at an integer sample; 0 outside the grid
    pub fn height_at(&self, x: i64, z: i64) -> f32 {
        if x < 0 || z < 0 || x >= self.size as i64 || z >= self.size as i64 {
            return 0.0;
        }
        self.height_at_pos(z * self.size as i64 + x)
    }

    /// Bilinearly interpolated height at fractional sample coordinates
    pub fn height(&self, x: f32, z: f32) -> f32 {
        let last = (self.size - 1) as f32;
        if !(0.0..=last).contains(&x) || !(0.0..=last).contains(&z) {
            return 0.0;
        }
        let x0 = x.floor() as i64;
        let z0 = z.floor() as i64;
        let x1 = (x0 + 1).min(self.size as i64 - 1);
        let z1 = (z0 + 1).min(self.size as i64 - 1);
        let fx = x - x0 as f32;
        let fz = z - z0 as f32;

        let top = self.height_at(x0, z0) * (1.0 - fx) + self.height_at(x1, z0) * fx;
        let bottom = self.height_at(x0, z1) * (1.0 - fx) + self.height_at(x1, z1) * fx;
        top * (1.0 - fz) + bottom * fz
    }

    /// Surface normal from central differences; up vector outside the grid
    pub fn normal_at(&self, x: i64, z: i64) -> Vec3 {
        if x < 0 || z < 0 || x >= self.size as i64 || z >= self.size as i64 {
            return Vec3::Y;
        }
        let last = self.size as i64 - 1;
        let (xl, xr) = ((x - 1).max(0), (x + 1).min(last));
        let (zn, zs) = ((z - 1).max(0), (z + 1).min(last));

        let dx = (self.height_at(xr, z) - self.height_at(xl, z)) / ((xr - xl) as f32 * self.scale.x);
        let dz = (self.height_at(x, zs) - self.height_at(x, zn)) / ((zs - zn) as f32 * self.scale.z);
        Vec3::new(-dx, 1.0, -dz).normalize()
    }

    /// Lower one sample by `delta`, clamped at 0. Returns the new height.
    pub fn deform(&mut self, x: u32, z: u32, delta: f32) -> Option<f32> {
        let idx = self.index(x, z)?;
        let value = (self.heights[idx] - delta).max(0.0);
        self.heights[idx] = value;
        Some(value)
    }

    /// Overwrite one sample. Returns false outside the grid.
    pub fn set_height(&mut self, x: u32, z: u32, value: f32) -> bool {
        match self.index(x, z) {
            Some(idx) => {
                self.heights[idx] = value;
                true
            }
            None => false,
        }
    }

    pub fn coverage_at(&self, x: i64, z: i64) -> [u8; 4] {
        self.coverage.as_ref().map_or(WHITE, |m| m.color_at(x, z))
    }

    pub fn base_at(&self, x: i64, z: i64) -> [u8; 4] {
        self.base.as_ref().map_or(WHITE, |m| m.color_at(x, z))
    }

    pub fn has_coverage(&self) -> bool {
        self.coverage.is_some()
    }

    pub fn has_base(&self) -> bool {
        self.base.is_some()
    }

    fn index(&self, x: u32, z: u32) -> Option<usize> {
        (x < self.size && z < self.size).then(|| (z * self.size + x) as usize)
    }
}

/// RGBA texel grid matching a page's sample grid (coverage or base colors)
#[derive(Clone, Debug)]
pub struct ColorMap {
    size: u32,
    texels: Vec<[u8; 4]>,
}

impl ColorMap {
    pub fn from_image(image: &DynamicImage, expected_size: u32) -> Result<Self> {
        check_dimensions(image.width(), image.height(), expected_size)?;
        let texels = image
            .to_rgba8()
            .pixels()
            .map(|p| p.0)
            .collect();
        Ok(Self { size: expected_size, texels })
    }

    /// Color at a sample; white outside the map
    pub fn color_at(&self, x: i64, z: i64) -> [u8; 4] {
        if x < 0 || z < 0 || x >= self.size as i64 || z >= self.size as i64 {
            return WHITE;
        }
        self.texels[(z * self.size as i64 + x) as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgba, RgbaImage, RgbImage};

    fn ramp(size: u32) -> HeightField {
        let heights = (0..size * size).map(|i| (i % size) as f32).collect();
        HeightField::from_heights(size, heights, Vec3::ONE).expect("valid ramp")
    }

    #[test]
    fn test_pow2_plus_one() {
        assert!(is_pow2_plus_one(3));
        assert!(is_pow2_plus_one(17));
        assert!(is_pow2_plus_one(513));
        assert!(!is_pow2_plus_one(16));
        assert!(!is_pow2_plus_one(2));
        assert!(!is_pow2_plus_one(100));
    }

    #[test]
    fn test_from_grey_image_scales_samples() {
        let mut img = GrayImage::new(5, 5);
        img.put_pixel(2, 3, Luma([255]));
        let field = HeightField::from_image(&DynamicImage::ImageLuma8(img), 5, Vec3::new(1.0, 10.0, 1.0))
            .expect("5x5 grey is valid");
        assert_eq!(field.height_at(2, 3), 10.0);
        assert_eq!(field.height_at(0, 0), 0.0);
    }

    #[test]
    fn test_from_rgba_uses_last_channel() {
        let mut img = RgbaImage::new(3, 3);
        img.put_pixel(1, 1, Rgba([255, 255, 255, 51]));
        let field = HeightField::from_image(&DynamicImage::ImageRgba8(img), 3, Vec3::new(1.0, 5.0, 1.0))
            .expect("3x3 rgba is valid");
        assert!((field.height_at(1, 1) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_rejects_bad_dimensions() {
        let img = DynamicImage::ImageLuma8(GrayImage::new(16, 16));
        assert!(matches!(
            HeightField::from_image(&img, 17, Vec3::ONE),
            Err(Error::InvalidDimensions { width: 16, height: 16 })
        ));

        let img = DynamicImage::ImageLuma8(GrayImage::new(9, 9));
        assert!(matches!(
            HeightField::from_image(&img, 17, Vec3::ONE),
            Err(Error::PageSizeMismatch { expected: 17, actual: 9 })
        ));
    }

    #[test]
    fn test_rejects_rgb_channels() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(5, 5));
        assert!(matches!(
            HeightField::from_image(&img, 5, Vec3::ONE),
            Err(Error::UnsupportedChannels(3))
        ));
    }

    #[test]
    fn test_out_of_range_returns_zero() {
        let field = ramp(5);
        assert_eq!(field.height_at(-1, 0), 0.0);
        assert_eq!(field.height_at(0, 5), 0.0);
        assert_eq!(field.height_at_pos(-3), 0.0);
        assert_eq!(field.height_at_pos(field.max_array_pos() as i64), 0.0);
        assert_eq!(field.height(4.5, 0.0), 0.0);
        assert_eq!(field.height_at(4, 4), 4.0);
    }

    #[test]
    fn test_bilinear_height() {
        let field = ramp(5);
        assert!((field.height(1.5, 2.0) - 1.5).abs() < 1e-5);
        assert!((field.height(4.0, 4.0) - 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_normals() {
        let flat = HeightField::from_heights(3, vec![2.0; 9], Vec3::ONE).expect("flat");
        assert_eq!(flat.normal_at(1, 1), Vec3::Y);
        assert_eq!(flat.normal_at(7, 7), Vec3::Y);

        // Height rises with x, so the normal leans toward -x
        let slope = ramp(5);
        let n = slope.normal_at(2, 2);
        assert!(n.x < 0.0);
        assert!(n.z.abs() < 1e-5);
    }

    #[test]
    fn test_deform_clamps_at_zero() {
        let mut field = ramp(5);
        assert_eq!(field.deform(3, 0, 1.0), Some(2.0));
        assert_eq!(field.deform(1, 0, 10.0), Some(0.0));
        assert_eq!(field.deform(9, 0, 1.0), None);
    }

    #[test]
    fn test_color_maps() {
        let mut img = RgbaImage::new(3, 3);
        img.put_pixel(0, 2, Rgba([10, 20, 30, 40]));
        let map = ColorMap::from_image(&DynamicImage::ImageRgba8(img), 3).expect("valid map");
        let field = ramp(3).with_coverage(map);

        assert!(field.has_coverage());
        assert!(!field.has_base());
        assert_eq!(field.coverage_at(0, 2), [10, 20, 30, 40]);
        assert_eq!(field.coverage_at(5, 5), WHITE);
        assert_eq!(field.base_at(0, 0), WHITE);
    }
}
