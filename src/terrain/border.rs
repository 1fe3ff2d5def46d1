//! Border seam strips
//!
//! Each border is cut from the max-LOD augmented grid so the chunk edge
//! always carries full-resolution ground truth. A strip of four rows is
//! read in a local frame (`a` along the edge, `r` inward):
//!
//! - row 0: the halo just outside the chunk
//! - row 1: the chunk edge
//! - rows 2, 3: one and two LOD cells inward
//!
//! The strip is shaded as a regular grid, then reduced to the edge row and
//! the first inner row, joined by a trapezoid of triangles. The edge row is
//! shared with the neighbouring chunk and the inner row with the center patch.

use std::sync::Arc;

use glam::Vec3;

use crate::terrain::chunk::{Direction, Lod};
use crate::terrain::config::TerrainConfig;
use crate::terrain::grid::AugmentedGrid;
use crate::terrain::mesh::{grid_triangles, mirror_winding, MeshPiece, TangentSolver};

/// Rows read into a strip before trimming
pub const STRIP_ROWS: usize = 4;

const EDGE_ROW: usize = 1;
const INNER_ROW: usize = 2;

/// Builds the four directional border pieces in both variants
#[derive(Clone)]
pub struct BorderMeshBuilder {
    config: Arc<TerrainConfig>,
    solver: Arc<dyn TangentSolver>,
}

/// Index arithmetic for one strip
struct StripLayout {
    lod: Lod,
    /// Max-LOD grid width
    source_width: usize,
    /// Samples per strip row, `(1 << lod) + 3`
    row_width: usize,
    step: usize,
    direction: Direction,
}

impl StripLayout {
    /// Max-grid index along the edge for strip column `a`
    fn along(&self, a: usize) -> usize {
        if a == 0 {
            0
        } else if a == self.row_width - 1 {
            self.source_width - 1
        } else {
            1 + (a - 1) * self.step
        }
    }

    /// Max-grid depth from the edge side for strip row `r`
    fn depth(&self, r: usize) -> usize {
        if r == 0 {
            0
        } else {
            (1 + (r - 1) * self.step).min(self.source_width - 1)
        }
    }

    /// Max-grid (gx, gy) for an along index and a depth
    fn grid_index(&self, along: usize, depth: usize) -> (usize, usize) {
        let far = self.source_width - 1;
        match self.direction {
            Direction::Up => (along, depth),
            Direction::Down => (along, far - depth),
            Direction::Left => (depth, along),
            Direction::Right | Direction::Center => (far - depth, along),
        }
    }

    fn sample(&self, grid: &AugmentedGrid, along: usize, r: usize) -> Vec3 {
        let along = along.min(self.source_width - 1);
        let (gx, gy) = self.grid_index(along, self.depth(r));
        grid.get(gx, gy)
    }

    /// Down and Left frames are mirror images of the grid's handedness
    fn mirrored(&self) -> bool {
        matches!(self.direction, Direction::Down | Direction::Left)
    }
}

impl BorderMeshBuilder {
    pub fn new(config: Arc<TerrainConfig>, solver: Arc<dyn TangentSolver>) -> Self {
        Self { config, solver }
    }

    fn layout(&self, max_grid: &AugmentedGrid, lod: Lod, direction: Direction) -> StripLayout {
        let lod = lod.min(self.config.max_lod);
        StripLayout {
            lod,
            source_width: max_grid.width(),
            row_width: self.config.grid_width(lod),
            step: self.config.lod_step(lod),
            direction,
        }
    }

    /// Full four-row strip, shaded, before trimming
    pub fn build_strip(&self, max_grid: &AugmentedGrid, lod: Lod, direction: Direction, downscaled: bool) -> MeshPiece {
        let layout = self.layout(max_grid, lod, direction);
        let rw = layout.row_width;

        let mut vertices = Vec::with_capacity(rw * STRIP_ROWS);
        for r in 0..STRIP_ROWS {
            for a in 0..rw {
                let along = layout.along(a);
                let stitched = downscaled && layout.lod > 0 && r == EDGE_ROW && a >= 1 && a <= rw - 2 && (a - 1) % 2 == 1;
                let p = if stitched {
                    let lo = layout.sample(max_grid, along.saturating_sub(layout.step), r);
                    let hi = layout.sample(max_grid, along + layout.step, r);
                    (lo + hi) * 0.5
                } else {
                    layout.sample(max_grid, along, r)
                };
                vertices.push(p);
            }
        }

        let mut piece = MeshPiece::from_positions(vertices, self.config.uv_scale);
        piece.indices = grid_triangles(rw, STRIP_ROWS);
        if layout.mirrored() {
            mirror_winding(&mut piece.indices);
        }
        piece.compute_tangents(self.solver.as_ref());
        piece
    }

    /// Published border piece for one edge.
    ///
    /// `downscaled` snaps odd edge samples onto the segment between their even
    /// neighbours, matching a neighbour one LOD coarser. `Center` is not an
    /// edge and yields an empty piece.
    pub fn build_border(&self, max_grid: &AugmentedGrid, lod: Lod, direction: Direction, downscaled: bool) -> MeshPiece {
        if direction == Direction::Center {
            log::warn!("build_border called with Direction::Center");
            return MeshPiece::default();
        }

        let layout = self.layout(max_grid, lod, direction);
        let strip = self.build_strip(max_grid, lod, direction, downscaled);
        let rw = layout.row_width;
        let n = 1usize << layout.lod;

        let edge = (1..=rw - 2).map(|a| EDGE_ROW * rw + a);
        let inner = (2..=rw - 3).map(|a| INNER_ROW * rw + a);
        let picks: Vec<usize> = edge.chain(inner).collect();

        let mut piece = strip.extract(&picks);
        piece.indices = trapezoid_triangles(n);
        if layout.mirrored() {
            mirror_winding(&mut piece.indices);
        }
        piece
    }
}

/// Triangles joining an edge row of `n + 1` vertices (indices `0..=n`) to an
/// inner row of `n - 1` vertices (indices `n + 1..`) offset by one lattice step.
fn trapezoid_triangles(n: usize) -> Vec<u32> {
    if n < 2 {
        return Vec::new();
    }

    let e = |m: usize| m as u32;
    let c = |k: usize| (n + 1 + k) as u32;

    let mut indices = Vec::with_capacity((2 * n - 2) * 3);
    indices.extend_from_slice(&[e(0), e(1), c(0)]);
    for m in 1..n - 1 {
        indices.extend_from_slice(&[e(m), e(m + 1), c(m)]);
        indices.extend_from_slice(&[e(m), c(m), c(m - 1)]);
    }
    indices.extend_from_slice(&[e(n - 1), e(n), c(n - 2)]);
    indices
}
