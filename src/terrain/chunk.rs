//! Chunk coordinates, directions and per-LOD chunk mesh data

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

use crate::terrain::mesh::MeshPiece;

/// Level of detail. 0 is coarsest, `max_lod` is finest.
pub type Lod = u32;

/// Integer coordinate identifying a chunk in the world grid
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub x: i32,
    pub y: i32,
}

impl ChunkCoord {
    /// Create a new chunk coordinate
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Convert world position to the coordinate of the chunk containing it
    pub fn from_world_pos(pos: Vec2, chunk_width: f32) -> Self {
        Self {
            x: (pos.x / chunk_width).floor() as i32,
            y: (pos.y / chunk_width).floor() as i32,
        }
    }

    /// Get the world-space origin (minimum corner) of this chunk
    pub fn world_origin(&self, chunk_width: f32) -> Vec2 {
        Vec2::new(self.x as f32 * chunk_width, self.y as f32 * chunk_width)
    }

    /// Chunk sharing the given edge. `Center` returns self.
    pub fn neighbor(&self, direction: Direction) -> Self {
        let offset = direction.offset();
        Self::new(self.x + offset.x, self.y + offset.y)
    }

    /// Chebyshev distance in chunks
    pub fn chebyshev_distance(&self, other: ChunkCoord) -> u32 {
        (self.x - other.x).unsigned_abs().max((self.y - other.y).unsigned_abs())
    }
}

impl From<IVec2> for ChunkCoord {
    fn from(v: IVec2) -> Self {
        Self::new(v.x, v.y)
    }
}

/// Chunk edge (or the center patch)
///
/// `Up` is the -y edge, `Down` the +y edge, `Left` the -x edge and `Right`
/// the +x edge. Discriminants of the four edges are the border offsets used
/// by section indexing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Left = 0,
    Right = 1,
    Up = 2,
    Down = 3,
    Center = 4,
}

impl Direction {
    /// The four chunk edges in index order
    pub const BORDERS: [Direction; 4] = [Direction::Left, Direction::Right, Direction::Up, Direction::Down];

    /// Border index 0..4; `None` for `Center`
    pub fn border_index(self) -> Option<usize> {
        match self {
            Direction::Center => None,
            d => Some(d as usize),
        }
    }

    /// Inverse of [`Direction::border_index`]
    pub fn from_border_index(index: usize) -> Option<Self> {
        Self::BORDERS.get(index).copied()
    }

    /// Chunk-grid offset to the neighbour across this edge
    pub fn offset(self) -> IVec2 {
        match self {
            Direction::Left => IVec2::new(-1, 0),
            Direction::Right => IVec2::new(1, 0),
            Direction::Up => IVec2::new(0, -1),
            Direction::Down => IVec2::new(0, 1),
            Direction::Center => IVec2::ZERO,
        }
    }

    /// Edge seen from the neighbouring chunk
    pub fn opposite(self) -> Self {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Center => Direction::Center,
        }
    }
}

/// All mesh pieces generated for one chunk at one LOD
///
/// Produced by a worker and moved into the chunk store on completion.
#[derive(Clone, Debug, Default)]
pub struct ChunkLodData {
    pub center: MeshPiece,
    /// Same-or-finer neighbour variants, indexed by [`Direction::border_index`]
    pub borders: [MeshPiece; 4],
    /// Coarser neighbour (stitched) variants, indexed by [`Direction::border_index`]
    pub downscaled_borders: [MeshPiece; 4],
}

impl ChunkLodData {
    /// Border piece for an edge. `Center` yields the center patch.
    pub fn piece(&self, direction: Direction, downscaled: bool) -> &MeshPiece {
        match direction.border_index() {
            None => &self.center,
            Some(i) if downscaled => &self.downscaled_borders[i],
            Some(i) => &self.borders[i],
        }
    }

    /// Total vertices across all nine pieces
    pub fn vertex_count(&self) -> usize {
        self.center.vertex_count()
            + self.borders.iter().map(MeshPiece::vertex_count).sum::<usize>()
            + self.downscaled_borders.iter().map(MeshPiece::vertex_count).sum::<usize>()
    }
}
