//! Terrain streaming configuration.

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};
use crate::terrain::chunk::{ChunkCoord, Lod};
use crate::terrain::generator::HeightParams;

/// Finest LOD the crate accepts (4099² vertices per augmented grid).
pub const MAX_SUPPORTED_LOD: Lod = 12;

/// Immutable configuration shared by every part of the streamer.
///
/// Constructed once, validated, then shared through an `Arc`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Side length of one chunk in world units.
    pub chunk_width: f32,
    /// UV = world xy * uv_scale.
    pub uv_scale: f32,
    /// Finest LOD; the finest grid has `(1 << max_lod) + 1` samples per axis.
    pub max_lod: Lod,
    /// Number of generation worker slots (and pool threads).
    pub worker_threads: usize,
    /// Maximum completed generations installed per tick.
    pub max_installs_per_tick: usize,
    /// Ring widths in chunks, outermost (LOD 0) first, innermost (finest) last.
    pub lod_rings: Vec<u32>,
    /// Evict stored chunks this many chunks beyond the render area. `None` keeps everything.
    pub eviction_margin: Option<u32>,
    /// Height field parameters for the default noise sampler.
    pub height: HeightParams,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            chunk_width: 12800.0,
            uv_scale: 0.1,
            max_lod: 8,
            worker_threads: 4,
            max_installs_per_tick: 2,
            lod_rings: vec![1, 1, 2, 2, 2, 2, 2, 2, 2],
            eviction_margin: None,
            height: HeightParams::default(),
        }
    }
}

impl TerrainConfig {
    /// Parse a JSON configuration and validate it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file and validate it.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Save as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Check every invariant the streamer relies on.
    pub fn validate(&self) -> Result<()> {
        if !self.chunk_width.is_finite() || self.chunk_width <= 0.0 {
            return Err(Error::Config(format!(
                "chunk_width must be a positive finite number, got {}",
                self.chunk_width
            )));
        }
        if !self.uv_scale.is_finite() {
            return Err(Error::Config("uv_scale must be finite".into()));
        }
        if self.max_lod > MAX_SUPPORTED_LOD {
            return Err(Error::Config(format!(
                "max_lod {} exceeds the supported maximum {}",
                self.max_lod, MAX_SUPPORTED_LOD
            )));
        }
        if self.worker_threads == 0 {
            return Err(Error::Config("worker_threads must be at least 1".into()));
        }
        if self.max_installs_per_tick == 0 {
            return Err(Error::Config("max_installs_per_tick must be at least 1".into()));
        }
        if self.lod_rings.iter().all(|&w| w == 0) {
            return Err(Error::Config("lod_rings produce a zero-width LOD matrix".into()));
        }
        if self.lod_rings.len() > self.max_lod as usize + 1 {
            return Err(Error::Config(format!(
                "lod_rings lists {} levels but max_lod is {}",
                self.lod_rings.len(),
                self.max_lod
            )));
        }
        let h = &self.height;
        if !(h.noise_scale.is_finite() && h.height_multiplier.is_finite()) {
            return Err(Error::Config("height parameters must be finite".into()));
        }
        Ok(())
    }

    /// Width of the augmented grid at `lod`, halo included.
    pub fn grid_width(&self, lod: Lod) -> usize {
        (1usize << lod) + 3
    }

    /// Samples per axis of the max-LOD height buffer.
    pub fn height_field_width(&self) -> usize {
        (1usize << self.max_lod) + 1
    }

    /// Distance between neighbouring lattice points at `lod`.
    pub fn cell_size(&self, lod: Lod) -> f32 {
        self.chunk_width / (1u32 << lod) as f32
    }

    /// Max-LOD samples between neighbouring lattice points at `lod`.
    pub fn lod_step(&self, lod: Lod) -> usize {
        1usize << (self.max_lod - lod.min(self.max_lod))
    }

    /// World-space origin (minimum corner) of a chunk.
    pub fn chunk_origin(&self, coord: ChunkCoord) -> Vec2 {
        let (x, y) = self.lattice_base(coord);
        Vec2::new(self.lattice_position(x), self.lattice_position(y))
    }

    /// Global max-LOD lattice index of a chunk's minimum corner.
    pub fn lattice_base(&self, coord: ChunkCoord) -> (i64, i64) {
        let n = 1i64 << self.max_lod;
        (coord.x as i64 * n, coord.y as i64 * n)
    }

    /// World coordinate of a global max-LOD lattice index, rounded once to f32.
    pub fn lattice_position(&self, index: i64) -> f32 {
        (index as f64 * self.chunk_width as f64 / (1u64 << self.max_lod) as f64) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_config_error(config: TerrainConfig) {
        match config.validate() {
            Err(Error::Config(_)) => {}
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_default_is_valid() {
        let config = TerrainConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunk_width, 12800.0);
        assert_eq!(config.max_lod, 8);
        assert_eq!(config.uv_scale, 0.1);
    }

    #[test]
    fn test_derived_sizes() {
        let config = TerrainConfig { chunk_width: 100.0, max_lod: 2, lod_rings: vec![1, 1, 1], ..Default::default() };
        assert_eq!(config.grid_width(0), 4);
        assert_eq!(config.grid_width(1), 5);
        assert_eq!(config.grid_width(2), 7);
        assert_eq!(config.height_field_width(), 5);
        assert_eq!(config.cell_size(2), 25.0);
        assert_eq!(config.lod_step(0), 4);
        assert_eq!(config.lod_step(2), 1);
    }

    #[test]
    fn test_lattice_positions() {
        let config = TerrainConfig { chunk_width: 100.0, max_lod: 2, lod_rings: vec![1, 1, 1], ..Default::default() };
        assert_eq!(config.lattice_base(ChunkCoord::new(-1, 3)), (-4, 12));
        assert_eq!(config.lattice_position(7), 175.0);
        assert_eq!(config.chunk_origin(ChunkCoord::new(-1, 3)), Vec2::new(-100.0, 300.0));

        // Last lattice point of one chunk is the first of the next
        let odd = TerrainConfig { chunk_width: 123.4, max_lod: 4, ..Default::default() };
        for cx in -20..20 {
            let (end, _) = odd.lattice_base(ChunkCoord::new(cx, 0));
            assert_eq!(odd.lattice_position(end + 16), odd.chunk_origin(ChunkCoord::new(cx + 1, 0)).x);
        }
    }

    #[test]
    fn test_invalid_max_lod() {
        assert_config_error(TerrainConfig { max_lod: MAX_SUPPORTED_LOD + 1, ..Default::default() });
    }

    #[test]
    fn test_zero_width_rings() {
        assert_config_error(TerrainConfig { lod_rings: vec![], ..Default::default() });
        assert_config_error(TerrainConfig { lod_rings: vec![0, 0], ..Default::default() });
    }

    #[test]
    fn test_too_many_rings() {
        assert_config_error(TerrainConfig { max_lod: 2, lod_rings: vec![1, 1, 1, 1], ..Default::default() });
    }

    #[test]
    fn test_zero_workers_and_installs() {
        assert_config_error(TerrainConfig { worker_threads: 0, ..Default::default() });
        assert_config_error(TerrainConfig { max_installs_per_tick: 0, ..Default::default() });
    }

    #[test]
    fn test_bad_chunk_width() {
        assert_config_error(TerrainConfig { chunk_width: 0.0, ..Default::default() });
        assert_config_error(TerrainConfig { chunk_width: f32::NAN, ..Default::default() });
    }

    #[test]
    fn test_json_partial_uses_defaults() {
        let config = TerrainConfig::from_json_str(r#"{ "chunk_width": 256.0, "max_lod": 4, "lod_rings": [1, 1, 2, 2] }"#)
            .expect("valid config");
        assert_eq!(config.chunk_width, 256.0);
        assert_eq!(config.max_lod, 4);
        assert_eq!(config.worker_threads, 4);
        assert_eq!(config.height, HeightParams::default());
    }

    #[test]
    fn test_json_invalid_rejected() {
        assert!(matches!(
            TerrainConfig::from_json_str(r#"{ "max_lod": 40 }"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(TerrainConfig::from_json_str("not json"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_save_load_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("terrain.json");

        let config = TerrainConfig { chunk_width: 512.0, eviction_margin: Some(3), ..Default::default() };
        config.save(&path).expect("save");
        let loaded = TerrainConfig::load(&path).expect("load");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(matches!(
            TerrainConfig::load(&dir.path().join("missing.json")),
            Err(Error::Io(_))
        ));
    }
}
