//! Grid addressing for pages and tiles

use std::fmt;

/// Cardinal direction on the XZ plane.
///
/// North is -Z, South is +Z, East is +X, West is -X.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    North = 0,
    South = 1,
    East = 2,
    West = 3,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// Slot of this direction in 4-element neighbor arrays
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }

    /// Grid step (dx, dz) taken when moving one cell in this direction
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::South => (0, 1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
        }
    }
}

/// Position of a page in the world table
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageCoord {
    pub x: u32,
    pub z: u32,
}

impl PageCoord {
    pub fn new(x: u32, z: u32) -> Self {
        Self { x, z }
    }

    /// Neighboring coordinate, or `None` when it falls outside `width x height`
    pub fn step(self, dir: Direction, width: u32, height: u32) -> Option<PageCoord> {
        let (dx, dz) = dir.offset();
        let x = self.x as i64 + dx as i64;
        let z = self.z as i64 + dz as i64;
        if x < 0 || z < 0 || x >= width as i64 || z >= height as i64 {
            return None;
        }
        Some(PageCoord::new(x as u32, z as u32))
    }
}

impl fmt::Display for PageCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Position of a tile inside its page
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub x: u32,
    pub z: u32,
}

impl TileCoord {
    pub fn new(x: u32, z: u32) -> Self {
        Self { x, z }
    }
}

/// World-unique tile identity
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileKey {
    pub page: PageCoord,
    pub tile: TileCoord,
}

impl TileKey {
    pub fn new(page: PageCoord, tile: TileCoord) -> Self {
        Self { page, tile }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposite_is_involution() {
        for dir in Direction::ALL {
            assert_eq!(dir.opposite().opposite(), dir);
            assert_ne!(dir.opposite(), dir);
        }
    }

    #[test]
    fn test_offsets_cancel() {
        for dir in Direction::ALL {
            let (ax, az) = dir.offset();
            let (bx, bz) = dir.opposite().offset();
            assert_eq!((ax + bx, az + bz), (0, 0));
        }
    }

    #[test]
    fn test_page_step_bounds() {
        let corner = PageCoord::new(0, 0);
        assert_eq!(corner.step(Direction::West, 3, 3), None);
        assert_eq!(corner.step(Direction::North, 3, 3), None);
        assert_eq!(corner.step(Direction::East, 3, 3), Some(PageCoord::new(1, 0)));
        assert_eq!(corner.step(Direction::South, 3, 3), Some(PageCoord::new(0, 1)));

        let far = PageCoord::new(2, 2);
        assert_eq!(far.step(Direction::East, 3, 3), None);
        assert_eq!(far.step(Direction::South, 3, 3), None);
    }

    #[test]
    fn test_page_coord_display() {
        assert_eq!(PageCoord::new(4, 7).to_string(), "(4, 7)");
    }
}
