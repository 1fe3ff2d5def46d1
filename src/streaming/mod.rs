//! Chunk streaming: generation scheduling, storage and LOD visibility

pub mod store;
pub mod request_queue;
pub mod scheduler;
pub mod visibility;
pub mod sink;
pub mod service;

pub use store::{ChunkRecord, ChunkStore};
pub use request_queue::RequestQueue;
pub use scheduler::{ChunkGenerator, GenerationScheduler, RequestOutcome, SchedulerStats};
pub use visibility::{FutureLodInfo, LodRingMatrix, VisibilitySelector, VisibilityUpdate, HIDDEN_LOD_CEILING};
pub use sink::{HeadlessSink, MeshSectionSink, SectionState};
pub use service::{TerrainService, TerrainStats};
