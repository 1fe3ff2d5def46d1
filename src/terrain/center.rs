//! Center patch meshing
//!
//! The whole augmented grid is triangulated and shaded so the halo shapes
//! interior normals, then the outer rings are dropped. What remains spans
//! lattice `1..=2^lod - 1`; its boundary rows coincide with the inner rows
//! of the four border pieces.

use std::sync::Arc;

use crate::terrain::config::TerrainConfig;
use crate::terrain::grid::AugmentedGrid;
use crate::terrain::mesh::{grid_triangles, MeshPiece, TangentSolver};

/// Rings removed from each side of the augmented grid after shading
pub const HALO_RINGS: usize = 2;

/// Builds the center patch of a chunk
#[derive(Clone)]
pub struct PatchMeshBuilder {
    config: Arc<TerrainConfig>,
    solver: Arc<dyn TangentSolver>,
}

impl PatchMeshBuilder {
    pub fn new(config: Arc<TerrainConfig>, solver: Arc<dyn TangentSolver>) -> Self {
        Self { config, solver }
    }

    /// Triangulated and shaded full grid, halo included
    pub fn build_untrimmed(&self, grid: &AugmentedGrid) -> MeshPiece {
        let width = grid.width();
        let mut piece = MeshPiece::from_positions(grid.positions().to_vec(), self.config.uv_scale);
        piece.indices = grid_triangles(width, width);
        piece.compute_tangents(self.solver.as_ref());
        piece
    }

    /// Published center patch for `grid`
    pub fn build_center(&self, grid: &AugmentedGrid) -> MeshPiece {
        let full = self.build_untrimmed(grid);
        trim_rings(&full, grid.width(), HALO_RINGS)
    }
}

/// Drop `rings` outer rings of a square shaded grid and re-triangulate
fn trim_rings(piece: &MeshPiece, width: usize, rings: usize) -> MeshPiece {
    if width <= 2 * rings {
        return MeshPiece::default();
    }

    let inner = width - 2 * rings;
    let picks: Vec<usize> = (rings..width - rings)
        .flat_map(|gy| (rings..width - rings).map(move |gx| gy * width + gx))
        .collect();

    let mut trimmed = piece.extract(&picks);
    trimmed.indices = grid_triangles(inner, inner);
    trimmed
}
