//! Bounded asynchronous chunk generation
//!
//! A fixed number of worker slots run generation jobs on a dedicated rayon
//! pool. Each job writes its result once into a oneshot channel owned by its
//! slot; the consumer polls those channels without blocking and installs
//! finished results into the [`ChunkStore`]. Requests that cannot start
//! immediately wait in a coalescing [`RequestQueue`].

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::oneshot::{self, error::TryRecvError};

use crate::core::{Error, Result};
use crate::streaming::request_queue::RequestQueue;
use crate::streaming::store::ChunkStore;
use crate::terrain::chunk::{ChunkCoord, ChunkLodData, Lod};
use crate::terrain::mesher::ChunkMesher;

/// Background job body: build all pieces of one chunk at one LOD
pub trait ChunkGenerator: Send + Sync + 'static {
    fn generate(&self, coord: ChunkCoord, lod: Lod) -> Result<ChunkLodData>;
}

impl ChunkGenerator for ChunkMesher {
    fn generate(&self, coord: ChunkCoord, lod: Lod) -> Result<ChunkLodData> {
        self.build_lod(coord, lod)
    }
}

/// What `request_generate` did with a request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Stored in the pending queue
    Queued,
    /// Started on a worker slot
    Launched,
    /// Forcing request with every slot busy; nothing changed
    NoFreeSlot,
    /// The same chunk and LOD is already generating
    AlreadyInFlight,
}

/// Cumulative scheduler counters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    pub launched: u64,
    pub completed: u64,
    pub failed: u64,
}

struct InFlight {
    coord: ChunkCoord,
    lod: Lod,
    started: Instant,
    result: oneshot::Receiver<Result<ChunkLodData>>,
}

enum WorkerSlot {
    Idle,
    Running(InFlight),
}

/// Worker-slot pool with a pending request queue
pub struct GenerationScheduler<G: ChunkGenerator> {
    generator: Arc<G>,
    pool: rayon::ThreadPool,
    slots: Vec<WorkerSlot>,
    free_slots: usize,
    queue: RequestQueue,
    stats: SchedulerStats,
}

impl<G: ChunkGenerator> GenerationScheduler<G> {
    /// Create a scheduler with `worker_threads` slots and pool threads
    pub fn new(generator: Arc<G>, worker_threads: usize) -> Result<Self> {
        if worker_threads == 0 {
            return Err(Error::Config("worker_threads must be at least 1".into()));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(worker_threads)
            .thread_name(|i| format!("lodterrain-gen-{i}"))
            .build()
            .map_err(|e| Error::Config(format!("failed to build generation pool: {}", e)))?;

        Ok(Self {
            generator,
            pool,
            slots: (0..worker_threads).map(|_| WorkerSlot::Idle).collect(),
            free_slots: worker_threads,
            queue: RequestQueue::new(),
            stats: SchedulerStats::default(),
        })
    }

    pub fn generator(&self) -> &Arc<G> {
        &self.generator
    }

    /// Request generation of `lod` for `coord`.
    ///
    /// Non-forcing requests go to the pending queue (latest LOD per chunk
    /// wins). Forcing requests start immediately if a slot is idle and
    /// otherwise do nothing.
    pub fn request_generate(&mut self, coord: ChunkCoord, lod: Lod, force: bool) -> RequestOutcome {
        if self.is_under_generation(coord, lod) {
            if !force {
                self.queue.remove(coord);
            }
            return RequestOutcome::AlreadyInFlight;
        }

        if !force {
            self.queue.upsert(coord, lod);
            return RequestOutcome::Queued;
        }

        let Some(index) = self.slots.iter().position(|s| matches!(s, WorkerSlot::Idle)) else {
            return RequestOutcome::NoFreeSlot;
        };

        self.queue.remove(coord);
        self.launch(index, coord, lod);
        RequestOutcome::Launched
    }

    fn launch(&mut self, index: usize, coord: ChunkCoord, lod: Lod) {
        let (tx, rx) = oneshot::channel();
        let generator = Arc::clone(&self.generator);

        self.pool.spawn(move || {
            let result = catch_unwind(AssertUnwindSafe(|| generator.generate(coord, lod)))
                .unwrap_or_else(|panic| Err(Error::Generation(panic_message(panic.as_ref()))));
            // Receiver may be gone after shutdown
            let _ = tx.send(result);
        });

        self.slots[index] = WorkerSlot::Running(InFlight { coord, lod, started: Instant::now(), result: rx });
        self.free_slots -= 1;
        self.stats.launched += 1;
        log::trace!("Launched chunk ({}, {}) LOD {} on slot {}", coord.x, coord.y, lod, index);
    }

    /// Move one pending request onto an idle slot.
    ///
    /// # Returns
    /// `None` when no slot is idle or nothing is pending
    pub fn drain_promote_one(&mut self) -> Option<RequestOutcome> {
        if self.free_slots == 0 {
            return None;
        }
        let (coord, lod) = self.queue.pop_front()?;
        Some(self.request_generate(coord, lod, true))
    }

    /// Install finished jobs into `store`, at most `max_installs` per call.
    ///
    /// Failed jobs free their slot and are logged; they install nothing and
    /// do not count toward the limit.
    ///
    /// # Returns
    /// The (chunk, LOD) pairs installed by this call
    pub fn collect_completed(&mut self, max_installs: usize, store: &mut ChunkStore) -> Vec<(ChunkCoord, Lod)> {
        let mut installed = Vec::new();

        for slot in self.slots.iter_mut() {
            if installed.len() >= max_installs {
                break;
            }
            let WorkerSlot::Running(job) = slot else {
                continue;
            };

            let outcome = match job.result.try_recv() {
                Ok(result) => result,
                Err(TryRecvError::Empty) => continue,
                Err(TryRecvError::Closed) => Err(Error::Generation("worker dropped its result".into())),
            };
            let (coord, lod, elapsed) = (job.coord, job.lod, job.started.elapsed());

            *slot = WorkerSlot::Idle;
            self.free_slots += 1;

            match outcome {
                Ok(data) => {
                    if store.install(coord, lod, data) {
                        self.stats.completed += 1;
                        installed.push((coord, lod));
                        log::trace!(
                            "Installed chunk ({}, {}) LOD {} after {:.2}ms",
                            coord.x,
                            coord.y,
                            lod,
                            elapsed.as_secs_f64() * 1000.0
                        );
                    } else {
                        self.stats.failed += 1;
                    }
                }
                Err(e) => {
                    self.stats.failed += 1;
                    log::error!("Generation of chunk ({}, {}) LOD {} failed: {}", coord.x, coord.y, lod, e);
                }
            }
        }

        installed
    }

    /// True while `lod` of `coord` is running on a worker
    pub fn is_under_generation(&self, coord: ChunkCoord, lod: Lod) -> bool {
        self.slots
            .iter()
            .any(|s| matches!(s, WorkerSlot::Running(job) if job.coord == coord && job.lod == lod))
    }

    /// Drop the pending request for `coord`, if any
    pub fn cancel_pending(&mut self, coord: ChunkCoord) -> Option<Lod> {
        self.queue.remove(coord)
    }

    /// Drop every pending request. Running jobs are unaffected.
    pub fn clear_pending(&mut self) {
        self.queue.clear();
    }

    pub fn pending(&self) -> &RequestQueue {
        &self.queue
    }

    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    pub fn in_flight_count(&self) -> usize {
        self.slots.len() - self.free_slots
    }

    pub fn free_slots(&self) -> usize {
        self.free_slots
    }

    pub fn worker_count(&self) -> usize {
        self.slots.len()
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("generation panicked: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("generation panicked: {}", s)
    } else {
        "generation panicked".to_string()
    }
}
