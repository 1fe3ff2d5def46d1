//! Terrain chunk meshing: height sampling, grids, center patches and seam strips

pub mod config;
pub use config::{TerrainConfig, MAX_SUPPORTED_LOD};

pub mod generator;
pub use generator::{HeightParams, HeightSampler, NoiseHeightSampler};

pub mod chunk;
pub use chunk::{ChunkCoord, ChunkLodData, Direction, Lod};

pub mod mesh;
pub use mesh::{FaceWeightedTangents, MeshPiece, TangentSolver};

pub mod grid;
pub use grid::{AugmentedGrid, GridBuilder, HeightField};

pub mod center;
pub use center::PatchMeshBuilder;

pub mod border;
pub use border::BorderMeshBuilder;

pub mod parts;
pub use parts::{PartIndexer, PartSelector};

pub mod mesher;
pub use mesher::ChunkMesher;
