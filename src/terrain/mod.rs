//! Terrain height data: per-page fields, procedural generators and the store

pub mod height_field;
pub mod image_source;
pub mod generator;
pub mod source;
pub mod store;

pub use height_field::{ColorMap, HeightField};
pub use image_source::ImageSource;
pub use generator::{HeightGenerator, NoiseHeightGenerator, NoiseParams};
pub use source::{GeneratedSource, HeightSource, PageDataSource};
pub use store::{DeformedSample, HeightStore};
