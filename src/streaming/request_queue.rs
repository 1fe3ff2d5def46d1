//! Pending generation requests
//!
//! Holds at most one desired LOD per chunk coordinate. Requests that arrive
//! for a coordinate already queued overwrite its LOD in place, so the latest
//! request wins while keeping the original queue position.

use std::collections::{HashMap, VecDeque};

use crate::terrain::chunk::{ChunkCoord, Lod};

/// Coalescing FIFO of chunk generation requests
///
/// Removal only drops the map entry. Order entries whose sequence number no
/// longer matches are stale and skipped, then compacted once they dominate.
#[derive(Debug, Default)]
pub struct RequestQueue {
    pending: HashMap<ChunkCoord, (Lod, u64)>,
    /// Insertion order of the coordinates in `pending`, tagged by sequence
    order: VecDeque<(ChunkCoord, u64)>,
    next_seq: u64,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `lod` for `coord`, replacing any pending LOD for it
    ///
    /// # Returns
    /// The LOD that was pending before, if any
    pub fn upsert(&mut self, coord: ChunkCoord, lod: Lod) -> Option<Lod> {
        if let Some((pending, _)) = self.pending.get_mut(&coord) {
            return Some(std::mem::replace(pending, lod));
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.insert(coord, (lod, seq));
        self.order.push_back((coord, seq));
        self.compact();
        None
    }

    /// Drop the pending request for `coord`
    pub fn remove(&mut self, coord: ChunkCoord) -> Option<Lod> {
        self.pending.remove(&coord).map(|(lod, _)| lod)
    }

    /// Take the oldest pending request
    pub fn pop_front(&mut self) -> Option<(ChunkCoord, Lod)> {
        while let Some((coord, seq)) = self.order.pop_front() {
            if self.is_live(coord, seq) {
                return self.pending.remove(&coord).map(|(lod, _)| (coord, lod));
            }
        }
        None
    }

    /// Pending requests, oldest first
    pub fn iter(&self) -> impl Iterator<Item = (ChunkCoord, Lod)> + '_ {
        self.order.iter().filter_map(|&(coord, seq)| match self.pending.get(&coord) {
            Some(&(lod, s)) if s == seq => Some((coord, lod)),
            _ => None,
        })
    }

    pub fn get(&self, coord: ChunkCoord) -> Option<Lod> {
        self.pending.get(&coord).map(|&(lod, _)| lod)
    }

    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.pending.contains_key(&coord)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.order.clear();
    }

    fn is_live(&self, coord: ChunkCoord, seq: u64) -> bool {
        matches!(self.pending.get(&coord), Some(&(_, s)) if s == seq)
    }

    /// Drop stale order entries once they outnumber live ones
    fn compact(&mut self) {
        if self.order.len() > 2 * self.pending.len() + 16 {
            let pending = &self.pending;
            self.order.retain(|&(coord, seq)| matches!(pending.get(&coord), Some(&(_, s)) if s == seq));
        }
    }

    #[cfg(test)]
    fn order_len(&self) -> usize {
        self.order.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_request_wins() {
        let mut queue = RequestQueue::new();
        let c = ChunkCoord::new(0, 0);

        assert_eq!(queue.upsert(c, 3), None);
        assert_eq!(queue.upsert(c, 5), Some(3));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.get(c), Some(5));
        assert_eq!(queue.pop_front(), Some((c, 5)));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_fifo_order_kept_on_overwrite() {
        let mut queue = RequestQueue::new();
        let a = ChunkCoord::new(1, 0);
        let b = ChunkCoord::new(2, 0);

        queue.upsert(a, 1);
        queue.upsert(b, 2);
        queue.upsert(a, 4);

        assert_eq!(queue.iter().collect::<Vec<_>>(), vec![(a, 4), (b, 2)]);
        assert_eq!(queue.pop_front(), Some((a, 4)));
        assert_eq!(queue.pop_front(), Some((b, 2)));
        assert_eq!(queue.pop_front(), None);
    }

    #[test]
    fn test_remove() {
        let mut queue = RequestQueue::new();
        let a = ChunkCoord::new(1, 1);
        let b = ChunkCoord::new(-1, 1);

        queue.upsert(a, 2);
        queue.upsert(b, 3);
        assert_eq!(queue.remove(a), Some(2));
        assert_eq!(queue.remove(a), None);
        assert!(!queue.contains(a));
        assert_eq!(queue.pop_front(), Some((b, 3)));
    }

    #[test]
    fn test_clear() {
        let mut queue = RequestQueue::new();
        queue.upsert(ChunkCoord::new(0, 1), 1);
        queue.upsert(ChunkCoord::new(0, 2), 1);
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.pop_front(), None);
    }

    #[test]
    fn test_requeue_after_remove_goes_to_back() {
        let mut queue = RequestQueue::new();
        let a = ChunkCoord::new(1, 0);
        let b = ChunkCoord::new(2, 0);

        queue.upsert(a, 1);
        queue.upsert(b, 2);
        queue.remove(a);
        queue.upsert(a, 3);

        assert_eq!(queue.iter().collect::<Vec<_>>(), vec![(b, 2), (a, 3)]);
        assert_eq!(queue.pop_front(), Some((b, 2)));
        assert_eq!(queue.pop_front(), Some((a, 3)));
        assert_eq!(queue.pop_front(), None);
    }

    #[test]
    fn test_stale_entries_are_compacted() {
        let mut queue = RequestQueue::new();
        let keep = ChunkCoord::new(0, 0);
        queue.upsert(keep, 1);
        for i in 0..1000 {
            let c = ChunkCoord::new(i, 1);
            queue.upsert(c, 2);
            queue.remove(c);
        }

        assert_eq!(queue.len(), 1);
        assert!(queue.order_len() <= 20);
        assert_eq!(queue.pop_front(), Some((keep, 1)));
        assert_eq!(queue.pop_front(), None);
    }
}
