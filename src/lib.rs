//! lodterrain - LOD terrain chunk meshing and streaming
//!
//! Builds chunk meshes at several levels of detail with seam strips that
//! stitch neighbouring chunks of different resolution, and streams them
//! around a moving observer with a bounded pool of generation workers.

pub mod core;
pub mod terrain;
pub mod streaming;
