//! Mesh section output
//!
//! The streamer never renders anything itself. It emits create and
//! visibility calls keyed by chunk and section index to a
//! [`MeshSectionSink`] supplied by the host.

use std::collections::{HashMap, HashSet};

use crate::terrain::chunk::ChunkCoord;
use crate::terrain::mesh::MeshPiece;

/// Receiver of mesh sections produced by the terrain service
pub trait MeshSectionSink {
    /// Create or replace one section. New sections start hidden.
    ///
    /// `collision` is set for pieces of the finest LOD.
    fn create_section(&mut self, coord: ChunkCoord, section: u32, piece: &MeshPiece, collision: bool);

    /// Show or hide a previously created section
    fn set_section_visible(&mut self, coord: ChunkCoord, section: u32, visible: bool);

    /// Drop every section of a chunk
    fn clear_chunk(&mut self, _coord: ChunkCoord) {}
}

/// Section state recorded by [`HeadlessSink`]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SectionState {
    pub vertices: usize,
    pub triangles: usize,
    pub collision: bool,
    pub visible: bool,
}

/// In-memory sink for tools and tests
#[derive(Debug, Default)]
pub struct HeadlessSink {
    sections: HashMap<(ChunkCoord, u32), SectionState>,
    /// Visibility calls for sections never created
    pub orphan_toggles: usize,
    pub creates: usize,
    pub toggles: usize,
}

impl HeadlessSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn section(&self, coord: ChunkCoord, section: u32) -> Option<&SectionState> {
        self.sections.get(&(coord, section))
    }

    /// Visible section indices of one chunk
    pub fn visible_sections(&self, coord: ChunkCoord) -> HashSet<u32> {
        self.sections
            .iter()
            .filter(|((c, _), s)| *c == coord && s.visible)
            .map(|((_, i), _)| *i)
            .collect()
    }

    /// Chunks with at least one visible section
    pub fn visible_chunks(&self) -> HashSet<ChunkCoord> {
        self.sections.iter().filter(|(_, s)| s.visible).map(|((c, _), _)| *c).collect()
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// Triangles across every visible section
    pub fn visible_triangles(&self) -> usize {
        self.sections.values().filter(|s| s.visible).map(|s| s.triangles).sum()
    }
}

impl MeshSectionSink for HeadlessSink {
    fn create_section(&mut self, coord: ChunkCoord, section: u32, piece: &MeshPiece, collision: bool) {
        self.creates += 1;
        self.sections.insert(
            (coord, section),
            SectionState {
                vertices: piece.vertex_count(),
                triangles: piece.triangle_count(),
                collision,
                visible: false,
            },
        );
    }

    fn set_section_visible(&mut self, coord: ChunkCoord, section: u32, visible: bool) {
        self.toggles += 1;
        match self.sections.get_mut(&(coord, section)) {
            Some(state) => state.visible = visible,
            None => self.orphan_toggles += 1,
        }
    }

    fn clear_chunk(&mut self, coord: ChunkCoord) {
        self.sections.retain(|(c, _), _| *c != coord);
    }
}
