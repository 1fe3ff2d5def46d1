//! One-chunk mesh generation job

use std::sync::Arc;
use std::time::Instant;

use crate::core::{Error, Result};
use crate::terrain::border::BorderMeshBuilder;
use crate::terrain::center::PatchMeshBuilder;
use crate::terrain::chunk::{ChunkCoord, ChunkLodData, Direction, Lod};
use crate::terrain::config::TerrainConfig;
use crate::terrain::generator::HeightSampler;
use crate::terrain::grid::GridBuilder;
use crate::terrain::mesh::{FaceWeightedTangents, TangentSolver};

/// Builds the center patch and all eight border pieces of a chunk
///
/// Holds only shared read-only state, so one mesher is cloned into every
/// generation worker.
#[derive(Clone)]
pub struct ChunkMesher {
    config: Arc<TerrainConfig>,
    grids: GridBuilder,
    centers: PatchMeshBuilder,
    borders: BorderMeshBuilder,
}

impl ChunkMesher {
    /// Mesher using the built-in tangent solver
    pub fn new(config: Arc<TerrainConfig>, sampler: Arc<dyn HeightSampler>) -> Result<Self> {
        Self::with_solver(config, sampler, Arc::new(FaceWeightedTangents))
    }

    /// Mesher using an injected tangent solver
    pub fn with_solver(
        config: Arc<TerrainConfig>,
        sampler: Arc<dyn HeightSampler>,
        solver: Arc<dyn TangentSolver>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            grids: GridBuilder::new(config.clone(), sampler),
            centers: PatchMeshBuilder::new(config.clone(), solver.clone()),
            borders: BorderMeshBuilder::new(config.clone(), solver),
            config,
        })
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    pub fn grids(&self) -> &GridBuilder {
        &self.grids
    }

    /// Build every piece of `coord` at `lod`
    pub fn build_lod(&self, coord: ChunkCoord, lod: Lod) -> Result<ChunkLodData> {
        let max_lod = self.config.max_lod;
        if lod > max_lod {
            return Err(Error::Generation(format!(
                "chunk ({}, {}) requested LOD {} above max LOD {}",
                coord.x, coord.y, lod, max_lod
            )));
        }

        let start = Instant::now();
        let field = self.grids.height_field(coord);

        let max_grid = self.grids.build(coord, max_lod, &field);
        let center = if lod == max_lod {
            self.centers.build_center(&max_grid)
        } else {
            self.centers.build_center(&self.grids.build(coord, lod, &field))
        };

        let borders = Direction::BORDERS.map(|d| self.borders.build_border(&max_grid, lod, d, false));
        let downscaled_borders = Direction::BORDERS.map(|d| self.borders.build_border(&max_grid, lod, d, true));

        let data = ChunkLodData { center, borders, downscaled_borders };
        log::trace!(
            "Meshed chunk ({}, {}) LOD {}: {} vertices in {:.2}ms",
            coord.x,
            coord.y,
            lod,
            data.vertex_count(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(data)
    }
}
