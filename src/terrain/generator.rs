//! Height sampling for terrain generation

use noise::{Fbm, MultiFractal, NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

/// Pure height function `z = height(x, y)`.
///
/// Called concurrently from generation workers, so implementations must be
/// deterministic and thread-safe.
pub trait HeightSampler: Send + Sync {
    /// Height at world position (x, y)
    fn height(&self, x: f32, y: f32) -> f32;
}

impl<F> HeightSampler for F
where
    F: Fn(f32, f32) -> f32 + Send + Sync,
{
    fn height(&self, x: f32, y: f32) -> f32 {
        self(x, y)
    }
}

/// Parameters controlling the noise height field
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeightParams {
    pub seed: u32,
    pub noise_scale: f32,       // World units -> noise space (smaller = smoother)
    pub height_multiplier: f32, // Vertical scale
    pub octaves: u32,           // FBM octaves (detail levels)
    pub persistence: f32,       // FBM persistence (0.5 typical)
    pub lacunarity: f32,        // FBM lacunarity (2.0 typical)
}

impl Default for HeightParams {
    fn default() -> Self {
        Self {
            seed: 12345,
            noise_scale: 0.0001,
            height_multiplier: 2500.0,
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
        }
    }
}

/// Offset applied in noise space so integer lattice points do not all land on
/// Perlin zero crossings.
const NOISE_OFFSET: f64 = 0.1;

/// Height sampler using fractal Brownian motion (FBM) over Perlin noise
pub struct NoiseHeightSampler {
    params: HeightParams,
    noise: Fbm<Perlin>,
}

impl NoiseHeightSampler {
    /// Create a new sampler with the given parameters
    pub fn new(params: HeightParams) -> Self {
        let noise = Fbm::<Perlin>::new(params.seed)
            .set_octaves(params.octaves.max(1) as usize)
            .set_persistence(params.persistence as f64)
            .set_lacunarity(params.lacunarity as f64);

        Self { params, noise }
    }

    /// Get sampler parameters
    pub fn params(&self) -> &HeightParams {
        &self.params
    }
}

impl HeightSampler for NoiseHeightSampler {
    fn height(&self, x: f32, y: f32) -> f32 {
        let nx = x as f64 * self.params.noise_scale as f64 + NOISE_OFFSET;
        let ny = y as f64 * self.params.noise_scale as f64 + NOISE_OFFSET;

        // Noise is roughly in [-1, 1]
        (self.noise.get([nx, ny]) * self.params.height_multiplier as f64) as f32
    }
}
