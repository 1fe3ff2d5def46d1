//! Terrain streaming service
//!
//! Owns the chunk store, the generation scheduler and the visibility
//! selector, and drives them once per tick from the consumer thread:
//!
//! 1. install finished generations (rate limited) and emit their sections
//! 2. refresh visibility around the observer and queue missing LODs
//! 3. promote queued requests onto idle worker slots
//! 4. show and hide sections to match the new targets
//! 5. evict chunks far outside the render area, if configured

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use glam::Vec2;
use serde::Serialize;

use crate::core::Result;
use crate::streaming::scheduler::{ChunkGenerator, GenerationScheduler, RequestOutcome};
use crate::streaming::sink::MeshSectionSink;
use crate::streaming::store::ChunkStore;
use crate::streaming::visibility::{FutureLodInfo, VisibilitySelector};
use crate::terrain::chunk::{ChunkCoord, Direction, Lod};
use crate::terrain::config::TerrainConfig;
use crate::terrain::generator::HeightSampler;
use crate::terrain::mesher::ChunkMesher;
use crate::terrain::parts::{PartIndexer, PartSelector};

/// Summary of one tick
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TerrainStats {
    pub tick: u64,
    /// Generations installed this tick
    pub installed: usize,
    /// Visible chunks missing their target LOD
    pub requested: usize,
    /// Jobs started this tick
    pub launched: usize,
    pub pending: usize,
    pub in_flight: usize,
    /// Failed generations since startup
    pub failed: u64,
    pub visible_chunks: usize,
    pub stored_chunks: usize,
    /// Chunks evicted this tick
    pub evicted: usize,
}

/// LOD terrain streamer around a moving observer
pub struct TerrainService<S: MeshSectionSink, G: ChunkGenerator = ChunkMesher> {
    config: Arc<TerrainConfig>,
    indexer: PartIndexer,
    store: ChunkStore,
    scheduler: GenerationScheduler<G>,
    visibility: VisibilitySelector,
    sink: S,
    /// Sections currently shown per chunk
    shown: HashMap<ChunkCoord, HashSet<u32>>,
    tick: u64,
}

impl<S: MeshSectionSink> TerrainService<S, ChunkMesher> {
    /// Service meshing chunks from `sampler`
    pub fn new(config: TerrainConfig, sampler: Arc<dyn HeightSampler>, sink: S) -> Result<Self> {
        let config = Arc::new(config);
        let mesher = ChunkMesher::new(config.clone(), sampler)?;
        Self::with_generator(config, Arc::new(mesher), sink)
    }
}

impl<S: MeshSectionSink, G: ChunkGenerator> TerrainService<S, G> {
    /// Service using a custom generation job
    pub fn with_generator(config: Arc<TerrainConfig>, generator: Arc<G>, sink: S) -> Result<Self> {
        config.validate()?;

        let scheduler = GenerationScheduler::new(generator, config.worker_threads)?;
        let visibility = VisibilitySelector::new(&config.lod_rings, config.chunk_width)?;
        log::info!(
            "Terrain service: chunk width {}, max LOD {}, {} workers, {}x{} chunk LOD matrix",
            config.chunk_width,
            config.max_lod,
            config.worker_threads,
            visibility.matrix().width(),
            visibility.matrix().width()
        );

        Ok(Self {
            indexer: PartIndexer::new(config.max_lod),
            config,
            store: ChunkStore::new(),
            scheduler,
            visibility,
            sink,
            shown: HashMap::new(),
            tick: 0,
        })
    }

    /// Advance streaming by one step for an observer at `observer` (world xy)
    pub fn tick(&mut self, observer: Vec2) -> TerrainStats {
        self.tick += 1;

        let installed = self
            .scheduler
            .collect_completed(self.config.max_installs_per_tick, &mut self.store);
        for &(coord, lod) in &installed {
            self.install_completed(coord, lod);
        }

        let update = self.visibility.refresh(observer, &self.store);
        for &(coord, lod) in &update.requests {
            self.scheduler.request_generate(coord, lod, false);
        }

        let mut launched = 0;
        while let Some(outcome) = self.scheduler.drain_promote_one() {
            if outcome == RequestOutcome::Launched {
                launched += 1;
            }
        }

        self.apply_visibility();
        let evicted = self.evict_distant();

        let stats = TerrainStats {
            tick: self.tick,
            installed: installed.len(),
            requested: update.requests.len(),
            launched,
            pending: self.scheduler.pending_count(),
            in_flight: self.scheduler.in_flight_count(),
            failed: self.scheduler.stats().failed,
            visible_chunks: self.visibility.targets().len(),
            stored_chunks: self.store.len(),
            evicted,
        };
        log::debug!(
            "Tick {}: installed {}, launched {}, pending {}, in flight {}, visible {}",
            stats.tick,
            stats.installed,
            stats.launched,
            stats.pending,
            stats.in_flight,
            stats.visible_chunks
        );
        stats
    }

    /// Emit the nine sections of a freshly installed LOD, hidden
    fn install_completed(&mut self, coord: ChunkCoord, lod: Lod) {
        let Some(data) = self.store.get(coord).and_then(|r| r.get_lod(lod)) else {
            return;
        };

        let collision = lod == self.config.max_lod;
        let shown = self.shown.get_mut(&coord);
        let mut replaced = Vec::new();
        for (part, index) in self.indexer.lod_sections(lod) {
            self.sink
                .create_section(coord, index, data.piece(part.direction, part.downscaled), collision);
            replaced.push(index);
        }

        // Recreated sections start hidden
        if let Some(shown) = shown {
            for index in replaced {
                shown.remove(&index);
            }
        }
    }

    /// Sections a chunk should show for its target
    fn wanted_sections(&self, info: FutureLodInfo) -> HashSet<u32> {
        std::iter::once(PartSelector::center(info.lod))
            .chain(
                Direction::BORDERS
                    .into_iter()
                    .map(|d| PartSelector::border(info.lod, d, info.is_downscaled(d))),
            )
            .map(|part| self.indexer.to_index(part))
            .collect()
    }

    /// Diff shown sections against the visibility targets
    fn apply_visibility(&mut self) {
        let wanted: HashMap<ChunkCoord, HashSet<u32>> = self
            .visibility
            .targets()
            .iter()
            .map(|(&coord, &info)| (coord, self.wanted_sections(info)))
            .collect();

        for (coord, old) in &self.shown {
            let new = wanted.get(coord);
            for &index in old {
                if !new.is_some_and(|n| n.contains(&index)) {
                    self.sink.set_section_visible(*coord, index, false);
                }
            }
        }

        for (coord, new) in &wanted {
            let old = self.shown.get(coord);
            for &index in new {
                if !old.is_some_and(|o| o.contains(&index)) {
                    self.sink.set_section_visible(*coord, index, true);
                }
            }
        }

        self.shown = wanted;
    }

    /// Drop stored chunks and pending requests beyond the eviction margin
    fn evict_distant(&mut self) -> usize {
        let (Some(margin), Some(origin)) = (self.config.eviction_margin, self.visibility.origin()) else {
            return 0;
        };

        let half = self.visibility.matrix().half_width() as i32;
        let center = ChunkCoord::new(origin.x + half, origin.y + half);
        let limit = half as u32 + margin;
        let too_far = |c: &ChunkCoord| c.chebyshev_distance(center) > limit;

        let stale: Vec<ChunkCoord> = self.scheduler.pending().iter().map(|(c, _)| c).filter(too_far).collect();
        for coord in stale {
            self.scheduler.cancel_pending(coord);
        }

        let distant: Vec<ChunkCoord> = self.store.coords().filter(too_far).collect();
        for &coord in &distant {
            self.store.evict(coord);
            self.shown.remove(&coord);
            self.sink.clear_chunk(coord);
        }
        if !distant.is_empty() {
            log::debug!("Evicted {} chunks beyond {} chunks of ({}, {})", distant.len(), limit, center.x, center.y);
        }
        distant.len()
    }

    pub fn is_chunk_lod_generated(&self, coord: ChunkCoord, lod: Lod) -> bool {
        self.store.contains_lod(coord, lod)
    }

    pub fn is_chunk_lod_under_generation(&self, coord: ChunkCoord, lod: Lod) -> bool {
        self.scheduler.is_under_generation(coord, lod)
    }

    /// Section indices currently shown for a chunk
    pub fn shown_sections(&self, coord: ChunkCoord) -> Option<&HashSet<u32>> {
        self.shown.get(&coord)
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    pub fn indexer(&self) -> PartIndexer {
        self.indexer
    }

    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    pub fn scheduler(&self) -> &GenerationScheduler<G> {
        &self.scheduler
    }

    pub fn visibility(&self) -> &VisibilitySelector {
        &self.visibility
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Tear down: clear pending work, stored chunks and sink sections.
    ///
    /// Running jobs finish on their own; their results are dropped.
    pub fn shutdown(mut self) -> S {
        self.scheduler.clear_pending();
        let coords: Vec<ChunkCoord> = self.store.coords().collect();
        for coord in coords {
            self.sink.clear_chunk(coord);
        }
        self.store.clear();
        self.shown.clear();
        self.visibility.clear();
        log::info!("Terrain service shut down after {} ticks", self.tick);
        self.sink
    }
}
