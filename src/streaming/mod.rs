//! Page streaming around the camera

pub mod queue;
pub mod page;
pub mod grid;
pub mod manager;

pub use queue::PageQueue;
pub use page::{CameraZone, Page, PageState};
pub use grid::PageGrid;
pub use manager::{LoadAction, PageManager, StreamingStats};
