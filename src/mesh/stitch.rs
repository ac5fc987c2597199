//! Tile index buffer generation with crack-free stitching to coarser neighbors.
//!
//! Vertices of a tile form a `(tile_size + 1)²` grid indexed `x + z * (tile_size + 1)`,
//! with north at `z = 0`, south at `z = tile_size`, west at `x = 0` and east at
//! `x = tile_size`. All triangles share one winding.

use crate::core::grid::Direction;

/// Per-edge stitching state packed into 16 bits.
///
/// Each edge owns one nibble (shift `4 * Direction::index()`): bit 3 marks the
/// edge as stitched and bits 0..=2 hold the render level delta to the coarser
/// neighbor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct StitchMask(u16);

impl StitchMask {
    pub const NONE: StitchMask = StitchMask(0);

    const FLAG: u16 = 0b1000;
    const DELTA: u16 = 0b0111;

    pub fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub fn bits(self) -> u16 {
        self.0
    }

    fn shift(dir: Direction) -> u16 {
        dir.index() as u16 * 4
    }

    /// Mark an edge as stitched to a neighbor `delta` levels coarser.
    /// A zero delta clears the edge.
    pub fn with_edge(self, dir: Direction, delta: u32) -> Self {
        let shift = Self::shift(dir);
        let cleared = self.0 & !(0xF << shift);
        if delta == 0 {
            return Self(cleared);
        }
        let nibble = Self::FLAG | (delta.min(Self::DELTA as u32) as u16);
        Self(cleared | (nibble << shift))
    }

    /// Level delta on an edge; 0 when the edge is not stitched
    pub fn delta(self, dir: Direction) -> u32 {
        let nibble = (self.0 >> Self::shift(dir)) & 0xF;
        if nibble & Self::FLAG != 0 {
            (nibble & Self::DELTA) as u32
        } else {
            0
        }
    }

    pub fn is_stitched(self, dir: Direction) -> bool {
        self.delta(dir) > 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Upper bound on the index count of one tile at a render level.
///
/// With `n = tile_size >> level` quads per side: `6n²` for the full grid
/// plus `6 * 2n` for each of the four stitched edges.
pub fn max_index_count(tile_size: u32, level: u32) -> usize {
    let n = (tile_size >> level).max(1) as usize;
    6 * n * n + 4 * 3 * 2 * n
}

/// Writes triangles into a preallocated index slice.
struct IndexWriter<'a> {
    indices: &'a mut [u32],
    len: usize,
    stride: u32,
}

impl<'a> IndexWriter<'a> {
    fn new(indices: &'a mut [u32], stride: u32) -> Self {
        Self { indices, len: 0, stride }
    }

    fn triangle(&mut self, a: (u32, u32), b: (u32, u32), c: (u32, u32)) {
        for (x, z) in [a, b, c] {
            self.indices[self.len] = x + z * self.stride;
            self.len += 1;
        }
    }
}

/// Grid position of a vertex `depth` samples inside an edge, `along` samples
/// from the edge's start. Edges are walked clockwise: north west-to-east,
/// east north-to-south, south east-to-west, west south-to-north.
fn edge_vertex(dir: Direction, tile_size: u32, along: u32, depth: u32) -> (u32, u32) {
    let t = tile_size;
    match dir {
        Direction::North => (along, depth),
        Direction::East => (t - depth, along),
        Direction::South => (t - along, t - depth),
        Direction::West => (depth, t - along),
    }
}

/// Edges in stitching order with the edges met at their first and last corner
const STITCH_ORDER: [(Direction, Direction, Direction); 4] = [
    (Direction::North, Direction::West, Direction::East),
    (Direction::East, Direction::North, Direction::South),
    (Direction::South, Direction::East, Direction::West),
    (Direction::West, Direction::South, Direction::North),
];

/// Build the triangle list of a tile at `level` stitched according to `mask`.
pub fn generate_indices(tile_size: u32, level: u32, mask: StitchMask) -> Vec<u32> {
    let step = 1u32 << level;
    let t = tile_size;
    let max = max_index_count(tile_size, level);
    let mut indices = vec![0u32; max];
    let mut writer = IndexWriter::new(&mut indices, t + 1);

    let inset = |dir| if mask.is_stitched(dir) { step } else { 0 };
    let (north, south) = (inset(Direction::North), inset(Direction::South));
    let (east, west) = (inset(Direction::East), inset(Direction::West));

    // Regular grid, minus the outer ring of every stitched edge
    for z in (north..t.saturating_sub(south)).step_by(step as usize) {
        for x in (west..t.saturating_sub(east)).step_by(step as usize) {
            writer.triangle((x, z), (x, z + step), (x + step, z));
            writer.triangle((x, z + step), (x + step, z + step), (x + step, z));
        }
    }

    for (dir, first, last) in STITCH_ORDER {
        let delta = mask.delta(dir);
        if delta == 0 {
            continue;
        }
        let coarse = (step << delta).min(t);
        stitch_edge(
            &mut writer,
            t,
            dir,
            step,
            coarse,
            mask.is_stitched(first),
            mask.is_stitched(last),
        );
    }

    let len = writer.len;
    debug_assert!(len <= max);
    indices.truncate(len);
    indices
}

/// Fill the outer ring of one edge with fans joining the fine inner row to the
/// coarse edge vertices.
///
/// Each coarse span gets fine triangles fanning to its start vertex up to the
/// span midpoint, one triangle across the full span, then fine triangles
/// fanning to its end vertex. The corner triangle is skipped when the edge
/// met at that corner is stitched as well; that edge covers it.
fn stitch_edge(
    writer: &mut IndexWriter<'_>,
    tile_size: u32,
    dir: Direction,
    step: u32,
    coarse: u32,
    omit_first: bool,
    omit_last: bool,
) {
    let half = coarse / 2;
    let v = |along: u32, depth: u32| edge_vertex(dir, tile_size, along, depth);

    for j in (0..tile_size).step_by(coarse as usize) {
        for k in (0..half).step_by(step as usize) {
            if omit_first && j == 0 && k == 0 {
                continue;
            }
            writer.triangle(v(j + k, step), v(j + k + step, step), v(j, 0));
        }

        writer.triangle(v(j + half, step), v(j + coarse, 0), v(j, 0));

        for k in (half..coarse).step_by(step as usize) {
            if omit_last && j + coarse == tile_size && k + step == coarse {
                continue;
            }
            writer.triangle(v(j + k, step), v(j + k + step, step), v(j + coarse, 0));
        }
    }
}
