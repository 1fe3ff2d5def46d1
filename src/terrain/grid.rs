//! Height field sampling and augmented vertex grids
//!
//! Every lattice point is addressed by its global max-LOD lattice index and
//! converted to world space in a single rounding step
//! (`TerrainConfig::lattice_position`). The same point therefore yields
//! bit-identical x/y at every LOD and in every chunk that touches it.

use std::sync::Arc;

use glam::Vec3;

use crate::terrain::chunk::{ChunkCoord, Lod};
use crate::terrain::config::TerrainConfig;
use crate::terrain::generator::HeightSampler;

/// Heights of one chunk at max-LOD resolution, without halo
///
/// `(1 << max_lod) + 1` samples per axis, row-major with rows along +y.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightField {
    width: usize,
    heights: Vec<f32>,
}

impl HeightField {
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height at max-LOD lattice point (i, j), i along x and j along y
    pub fn get(&self, i: usize, j: usize) -> f32 {
        self.heights[j * self.width + i]
    }

    pub fn heights(&self) -> &[f32] {
        &self.heights
    }
}

/// Square vertex grid for one chunk at one LOD, with a one-cell halo
///
/// Width is `(1 << lod) + 3`. Grid index `g` maps to lattice index `g - 1`,
/// so indices `1..=width-2` cover the chunk itself.
#[derive(Clone, Debug, PartialEq)]
pub struct AugmentedGrid {
    lod: Lod,
    width: usize,
    positions: Vec<Vec3>,
}

impl AugmentedGrid {
    pub fn lod(&self) -> Lod {
        self.lod
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// World position at grid index (gx, gy)
    pub fn get(&self, gx: usize, gy: usize) -> Vec3 {
        self.positions[gy * self.width + gx]
    }

    /// Row-major positions
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Grid row `gy`, ordered along +x
    pub fn row(&self, gy: usize) -> &[Vec3] {
        let start = gy * self.width;
        &self.positions[start..start + self.width]
    }
}

/// Samples height fields and builds augmented grids for chunks
#[derive(Clone)]
pub struct GridBuilder {
    config: Arc<TerrainConfig>,
    sampler: Arc<dyn HeightSampler>,
}

impl GridBuilder {
    pub fn new(config: Arc<TerrainConfig>, sampler: Arc<dyn HeightSampler>) -> Self {
        Self { config, sampler }
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    /// Sample the max-LOD height buffer for the chunk at `coord`
    pub fn height_field(&self, coord: ChunkCoord) -> HeightField {
        let width = self.config.height_field_width();
        let (base_x, base_y) = self.config.lattice_base(coord);

        let mut heights = Vec::with_capacity(width * width);
        for j in 0..width {
            let y = self.config.lattice_position(base_y + j as i64);
            for i in 0..width {
                let x = self.config.lattice_position(base_x + i as i64);
                heights.push(self.sampler.height(x, y));
            }
        }

        HeightField { width, heights }
    }

    /// Build the augmented grid at `lod` using a precomputed height field.
    ///
    /// Interior points read `field`; halo points sample the height function.
    pub fn build(&self, coord: ChunkCoord, lod: Lod, field: &HeightField) -> AugmentedGrid {
        let lod = lod.min(self.config.max_lod);
        let width = self.config.grid_width(lod);
        let step = self.config.lod_step(lod);
        let (base_x, base_y) = self.config.lattice_base(coord);
        let lattice = |base: i64, g: usize| self.config.lattice_position(base + (g as i64 - 1) * step as i64);

        let mut positions = Vec::with_capacity(width * width);
        for gy in 0..width {
            let y = lattice(base_y, gy);
            for gx in 0..width {
                let x = lattice(base_x, gx);
                let interior = (1..width - 1).contains(&gx) && (1..width - 1).contains(&gy);
                let z = if interior {
                    field.get((gx - 1) * step, (gy - 1) * step)
                } else {
                    self.sampler.height(x, y)
                };
                positions.push(Vec3::new(x, y, z));
            }
        }

        AugmentedGrid { lod, width, positions }
    }

    /// Sample a fresh height field and build the augmented grid at `lod`
    pub fn build_augmented_grid(&self, coord: ChunkCoord, lod: Lod) -> AugmentedGrid {
        let field = self.height_field(coord);
        self.build(coord, lod, &field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    fn builder(sampler: Arc<dyn HeightSampler>) -> GridBuilder {
        let config = TerrainConfig { chunk_width: 100.0, max_lod: 2, lod_rings: vec![1, 1, 1], ..Default::default() };
        GridBuilder::new(Arc::new(config), sampler)
    }

    fn wavy() -> Arc<dyn HeightSampler> {
        Arc::new(|x: f32, y: f32| (x * 0.037).sin() * 10.0 + (y * 0.051).cos() * 7.0)
    }

    #[test]
    fn test_grid_widths() {
        let b = builder(wavy());
        assert_eq!(b.build_augmented_grid(ChunkCoord::new(0, 0), 0).width(), 4);
        assert_eq!(b.build_augmented_grid(ChunkCoord::new(0, 0), 1).width(), 5);
        let g = b.build_augmented_grid(ChunkCoord::new(0, 0), 2);
        assert_eq!(g.width(), 7);
        assert_eq!(g.positions().len(), 49);
        assert_eq!(g.row(3).len(), 7);
    }

    #[test]
    fn test_grid_covers_chunk_with_halo() {
        let b = builder(wavy());
        let origin = Vec2::new(200.0, -100.0);
        let g = b.build_augmented_grid(ChunkCoord::new(2, -1), 2);

        assert_eq!(g.get(0, 0).truncate(), Vec2::new(175.0, -125.0));
        assert_eq!(g.get(1, 1).truncate(), origin);
        assert_eq!(g.get(5, 5).truncate(), Vec2::new(300.0, 0.0));
        assert_eq!(g.get(6, 6).truncate(), Vec2::new(325.0, 25.0));
    }

    #[test]
    fn test_grid_is_deterministic() {
        let b = builder(wavy());
        let coord = ChunkCoord::new(-3, 7);
        for lod in 0..=2 {
            assert_eq!(b.build_augmented_grid(coord, lod), b.build_augmented_grid(coord, lod));
        }
    }

    #[test]
    fn test_shared_lattice_points_match_across_lods() {
        let b = builder(wavy());
        let coord = ChunkCoord::new(1, 0);
        let field = b.height_field(coord);
        let fine = b.build(coord, 2, &field);
        let coarse = b.build(coord, 1, &field);

        for gy in 1..coarse.width() - 1 {
            for gx in 1..coarse.width() - 1 {
                let f = fine.get(1 + (gx - 1) * 2, 1 + (gy - 1) * 2);
                assert_eq!(coarse.get(gx, gy), f);
            }
        }
    }

    #[test]
    fn test_halo_samples_height_function() {
        let sampler = wavy();
        let b = builder(sampler.clone());
        let g = b.build_augmented_grid(ChunkCoord::new(0, 0), 1);
        let p = g.get(0, 2);
        assert_eq!(p.z, sampler.height(p.x, p.y));
    }

    #[test]
    fn test_height_field_layout() {
        let b = builder(Arc::new(|x: f32, y: f32| x + 1000.0 * y));
        let field = b.height_field(ChunkCoord::new(0, 0));
        assert_eq!(field.width(), 5);
        assert_eq!(field.heights().len(), 25);
        assert_eq!(field.get(4, 0), 100.0);
        assert_eq!(field.get(0, 1), 25000.0);
    }

    #[test]
    fn test_shared_edge_is_exact_for_any_chunk_width() {
        let sampler = wavy();
        for chunk_width in [123.4, 100.3, 0.7, 12345.6] {
            let config = TerrainConfig { chunk_width, max_lod: 4, lod_rings: vec![1, 1], ..Default::default() };
            let b = GridBuilder::new(Arc::new(config), sampler.clone());
            for cx in -20..20 {
                let a = b.build_augmented_grid(ChunkCoord::new(cx, 3), 4);
                let c = b.build_augmented_grid(ChunkCoord::new(cx + 1, 3), 4);
                let edge = a.width() - 2;
                for gy in 0..a.width() {
                    assert_eq!(a.get(edge, gy), c.get(1, gy), "width {} cx {} gy {}", chunk_width, cx, gy);
                    // Halo columns overlap the neighbour's first interior column
                    assert_eq!(a.get(edge + 1, gy).truncate(), c.get(2, gy).truncate());
                }
            }
        }
    }
}
