//! Observer-driven LOD selection
//!
//! A square matrix of concentric rings assigns each chunk around the
//! observer a target LOD, finest at the center. Every refresh re-centers the
//! matrix on the chunk-grid corner nearest the observer, requests missing
//! LODs and decides what each chunk displays meanwhile.

use std::collections::HashMap;

use glam::Vec2;

use crate::core::{Error, Result};
use crate::streaming::store::ChunkStore;
use crate::terrain::chunk::{ChunkCoord, Direction, Lod};

/// Target LODs at or below this value mean the chunk is hidden
pub const HIDDEN_LOD_CEILING: Lod = 1;

/// Concentric square rings of target LODs
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LodRingMatrix {
    /// LOD by distance from the matrix edge
    horizontal: Vec<Lod>,
    width: usize,
}

impl LodRingMatrix {
    /// Build from ring widths, outermost (LOD 0) first.
    ///
    /// `rings[i]` is how many chunks wide the LOD `i` ring is.
    pub fn new(rings: &[u32]) -> Result<Self> {
        let horizontal: Vec<Lod> = rings
            .iter()
            .enumerate()
            .flat_map(|(lod, &w)| std::iter::repeat(lod as Lod).take(w as usize))
            .collect();

        if horizontal.is_empty() {
            return Err(Error::Config("LOD rings produce a zero-width matrix".into()));
        }

        let width = horizontal.len() * 2;
        Ok(Self { horizontal, width })
    }

    /// Side length in chunks
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn half_width(&self) -> usize {
        self.horizontal.len()
    }

    /// Target LOD of matrix cell (x, y)
    pub fn lod_at(&self, x: usize, y: usize) -> Lod {
        let dx = x.min(self.width - 1 - x);
        let dy = y.min(self.width - 1 - y);
        self.horizontal[dx.min(dy)]
    }
}

/// What a chunk should display after a refresh
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FutureLodInfo {
    /// LOD to display (the target, or the nearest stored placeholder)
    pub lod: Lod,
    /// Bit per [`Direction::border_index`]: use the downscaled border
    pub downscale_mask: u8,
}

impl FutureLodInfo {
    pub fn is_downscaled(&self, direction: Direction) -> bool {
        direction.border_index().is_some_and(|i| self.downscale_mask & (1 << i) != 0)
    }
}

/// Result of one visibility refresh
#[derive(Clone, Debug, Default)]
pub struct VisibilityUpdate {
    /// Chunk at matrix cell (0, 0)
    pub origin: ChunkCoord,
    /// Chunks missing their target LOD
    pub requests: Vec<(ChunkCoord, Lod)>,
}

/// Decides target and displayed LODs for chunks around the observer
pub struct VisibilitySelector {
    matrix: LodRingMatrix,
    chunk_width: f32,
    origin: Option<ChunkCoord>,
    targets: HashMap<ChunkCoord, FutureLodInfo>,
}

impl VisibilitySelector {
    pub fn new(rings: &[u32], chunk_width: f32) -> Result<Self> {
        Ok(Self {
            matrix: LodRingMatrix::new(rings)?,
            chunk_width,
            origin: None,
            targets: HashMap::new(),
        })
    }

    pub fn matrix(&self) -> &LodRingMatrix {
        &self.matrix
    }

    /// Matrix origin of the last refresh
    pub fn origin(&self) -> Option<ChunkCoord> {
        self.origin
    }

    /// Chunks visible after the last refresh
    pub fn targets(&self) -> &HashMap<ChunkCoord, FutureLodInfo> {
        &self.targets
    }

    pub fn target(&self, coord: ChunkCoord) -> Option<FutureLodInfo> {
        self.targets.get(&coord).copied()
    }

    /// Chunk-grid corner nearest `observer`
    ///
    /// Corners of the containing chunk are compared in the order
    /// left-up, right-up, left-down, right-down; the first closest wins.
    pub fn closest_corner(&self, observer: Vec2) -> ChunkCoord {
        let base = ChunkCoord::from_world_pos(observer, self.chunk_width);
        let corners = [
            ChunkCoord::new(base.x, base.y),
            ChunkCoord::new(base.x + 1, base.y),
            ChunkCoord::new(base.x, base.y + 1),
            ChunkCoord::new(base.x + 1, base.y + 1),
        ];

        let mut best = corners[0];
        let mut best_dist = f32::INFINITY;
        for corner in corners {
            let dist = corner.world_origin(self.chunk_width).distance_squared(observer);
            if dist < best_dist {
                best = corner;
                best_dist = dist;
            }
        }
        best
    }

    /// Recompute targets around `observer`.
    ///
    /// Chunks holding their target LOD display it. Others are returned as
    /// requests and display their closest stored LOD, if any. Borders facing a
    /// coarser displayed neighbour are marked downscaled.
    pub fn refresh(&mut self, observer: Vec2, store: &ChunkStore) -> VisibilityUpdate {
        let corner = self.closest_corner(observer);
        let half = self.matrix.half_width() as i32;
        let origin = ChunkCoord::new(corner.x - half, corner.y - half);

        let mut requests = Vec::new();
        let mut displayed: HashMap<ChunkCoord, Lod> = HashMap::new();

        let width = self.matrix.width();
        for y in 0..width {
            for x in 0..width {
                let target = self.matrix.lod_at(x, y);
                if target <= HIDDEN_LOD_CEILING {
                    continue;
                }

                let coord = ChunkCoord::new(origin.x + x as i32, origin.y + y as i32);
                let record = store.get(coord);
                if record.is_some_and(|r| r.contains_lod(target)) {
                    displayed.insert(coord, target);
                    continue;
                }

                requests.push((coord, target));
                if let Some(lod) = record.and_then(|r| r.closest_lod(target)) {
                    displayed.insert(coord, lod);
                }
            }
        }

        self.targets = displayed
            .iter()
            .map(|(&coord, &lod)| {
                let mut downscale_mask = 0u8;
                for d in Direction::BORDERS {
                    if displayed.get(&coord.neighbor(d)).is_some_and(|&n| n < lod) {
                        downscale_mask |= 1 << d as u8;
                    }
                }
                (coord, FutureLodInfo { lod, downscale_mask })
            })
            .collect();

        if self.origin != Some(origin) {
            log::debug!("LOD matrix moved to ({}, {})", origin.x, origin.y);
        }
        self.origin = Some(origin);

        VisibilityUpdate { origin, requests }
    }

    /// Forget every target
    pub fn clear(&mut self) {
        self.targets.clear();
        self.origin = None;
    }
}
