//! Per-chunk storage of generated LODs
//!
//! Each chunk coordinate owns a [`ChunkRecord`]: a presence bitmask plus the
//! generated data for every LOD it holds. Only the consumer thread touches
//! the store.

use std::collections::HashMap;

use crate::terrain::chunk::{ChunkCoord, ChunkLodData, Lod};
use crate::terrain::config::MAX_SUPPORTED_LOD;

/// Generated LODs of one chunk
#[derive(Clone, Debug, Default)]
pub struct ChunkRecord {
    /// Bit i set means LOD i is stored
    mask: u32,
    lods: Vec<Option<ChunkLodData>>,
}

impl ChunkRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store data for `lod`, replacing any previous data for it
    ///
    /// # Returns
    /// false if `lod` is beyond the supported range and nothing was stored
    pub fn add_lod(&mut self, lod: Lod, data: ChunkLodData) -> bool {
        if lod > MAX_SUPPORTED_LOD {
            log::warn!("Ignoring LOD {} above supported maximum {}", lod, MAX_SUPPORTED_LOD);
            return false;
        }

        let slot = lod as usize;
        if self.lods.len() <= slot {
            self.lods.resize_with(slot + 1, || None);
        }
        self.lods[slot] = Some(data);
        self.mask |= 1 << lod;
        true
    }

    /// Drop one LOD, returning its data if present
    pub fn remove_lod(&mut self, lod: Lod) -> Option<ChunkLodData> {
        if !self.contains_lod(lod) {
            return None;
        }
        self.mask &= !(1 << lod);
        self.lods.get_mut(lod as usize).and_then(Option::take)
    }

    pub fn contains_lod(&self, lod: Lod) -> bool {
        lod <= MAX_SUPPORTED_LOD && self.mask & (1 << lod) != 0
    }

    pub fn get_lod(&self, lod: Lod) -> Option<&ChunkLodData> {
        if !self.contains_lod(lod) {
            return None;
        }
        self.lods.get(lod as usize).and_then(Option::as_ref)
    }

    /// Presence bitmask
    pub fn mask(&self) -> u32 {
        self.mask
    }

    pub fn is_empty(&self) -> bool {
        self.mask == 0
    }

    /// Stored LODs, coarsest first
    pub fn lods(&self) -> impl Iterator<Item = Lod> + '_ {
        (0..=MAX_SUPPORTED_LOD).filter(|&lod| self.contains_lod(lod))
    }

    /// Highest stored LOD that is `<= target`
    pub fn max_lower_lod(&self, target: Lod) -> Option<Lod> {
        (0..=target.min(MAX_SUPPORTED_LOD)).rev().find(|&lod| self.contains_lod(lod))
    }

    /// Lowest stored LOD that is `>= target`
    pub fn min_higher_lod(&self, target: Lod) -> Option<Lod> {
        (target..=MAX_SUPPORTED_LOD).find(|&lod| self.contains_lod(lod))
    }

    /// Stored LOD numerically closest to `target`; ties go to the higher LOD
    pub fn closest_lod(&self, target: Lod) -> Option<Lod> {
        match (self.max_lower_lod(target), self.min_higher_lod(target)) {
            (Some(lower), Some(higher)) => {
                if target - lower < higher - target {
                    Some(lower)
                } else {
                    Some(higher)
                }
            }
            (lower, higher) => higher.or(lower),
        }
    }

    /// Clear every LOD and the presence mask
    pub fn reset(&mut self) {
        self.mask = 0;
        self.lods.clear();
    }
}

/// Sparse table of chunk records keyed by coordinate
#[derive(Default)]
pub struct ChunkStore {
    records: HashMap<ChunkCoord, ChunkRecord>,
}

impl ChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install generated data, creating the record on first use
    ///
    /// # Returns
    /// true if the data was stored
    pub fn install(&mut self, coord: ChunkCoord, lod: Lod, data: ChunkLodData) -> bool {
        self.records.entry(coord).or_default().add_lod(lod, data)
    }

    pub fn get(&self, coord: ChunkCoord) -> Option<&ChunkRecord> {
        self.records.get(&coord)
    }

    pub fn get_mut(&mut self, coord: ChunkCoord) -> Option<&mut ChunkRecord> {
        self.records.get_mut(&coord)
    }

    pub fn contains_lod(&self, coord: ChunkCoord, lod: Lod) -> bool {
        self.records.get(&coord).is_some_and(|r| r.contains_lod(lod))
    }

    /// Remove a chunk entirely
    ///
    /// # Returns
    /// true if the chunk held any data
    pub fn evict(&mut self, coord: ChunkCoord) -> bool {
        match self.records.remove(&coord) {
            Some(mut record) => {
                let had_data = !record.is_empty();
                record.reset();
                had_data
            }
            None => false,
        }
    }

    /// Coordinates of every stored chunk
    pub fn coords(&self) -> impl Iterator<Item = ChunkCoord> + '_ {
        self.records.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Reset and drop every record
    pub fn clear(&mut self) {
        for record in self.records.values_mut() {
            record.reset();
        }
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with(lods: &[Lod]) -> ChunkRecord {
        let mut record = ChunkRecord::new();
        for &lod in lods {
            assert!(record.add_lod(lod, ChunkLodData::default()));
        }
        record
    }

    #[test]
    fn test_add_and_contains() {
        let record = record_with(&[2, 5]);
        assert!(record.contains_lod(2));
        assert!(record.contains_lod(5));
        assert!(!record.contains_lod(3));
        assert_eq!(record.mask(), 0b100100);
        assert!(record.get_lod(5).is_some());
        assert!(record.get_lod(4).is_none());
        assert_eq!(record.lods().collect::<Vec<_>>(), vec![2, 5]);
    }

    #[test]
    fn test_add_out_of_range() {
        let mut record = ChunkRecord::new();
        assert!(!record.add_lod(MAX_SUPPORTED_LOD + 1, ChunkLodData::default()));
        assert!(record.is_empty());
        assert!(!record.contains_lod(40));
    }

    #[test]
    fn test_lower_and_higher_lookup() {
        let record = record_with(&[2, 5]);
        assert_eq!(record.max_lower_lod(4), Some(2));
        assert_eq!(record.max_lower_lod(5), Some(5));
        assert_eq!(record.max_lower_lod(1), None);
        assert_eq!(record.min_higher_lod(3), Some(5));
        assert_eq!(record.min_higher_lod(2), Some(2));
        assert_eq!(record.min_higher_lod(6), None);
    }

    #[test]
    fn test_lod_zero_is_distinguishable_from_missing() {
        let empty = ChunkRecord::new();
        assert_eq!(empty.min_higher_lod(0), None);
        assert_eq!(empty.max_lower_lod(3), None);

        let zero = record_with(&[0]);
        assert_eq!(zero.min_higher_lod(0), Some(0));
        assert_eq!(zero.max_lower_lod(3), Some(0));
    }

    #[test]
    fn test_closest_lod() {
        let record = record_with(&[2, 6]);
        assert_eq!(record.closest_lod(3), Some(2));
        assert_eq!(record.closest_lod(5), Some(6));
        // Tie goes to the finer LOD
        assert_eq!(record.closest_lod(4), Some(6));
        assert_eq!(record.closest_lod(8), Some(6));
        assert_eq!(record.closest_lod(0), Some(2));
        assert_eq!(ChunkRecord::new().closest_lod(4), None);
    }

    #[test]
    fn test_remove_and_reset() {
        let mut record = record_with(&[1, 3]);
        assert!(record.remove_lod(1).is_some());
        assert!(record.remove_lod(1).is_none());
        assert!(!record.contains_lod(1));
        assert!(record.contains_lod(3));

        record.reset();
        assert!(record.is_empty());
        assert_eq!(record.mask(), 0);
        assert!(record.get_lod(3).is_none());
    }

    #[test]
    fn test_store_install_and_evict() {
        let mut store = ChunkStore::new();
        let c = ChunkCoord::new(1, -2);

        assert!(store.install(c, 3, ChunkLodData::default()));
        assert!(store.install(c, 4, ChunkLodData::default()));
        assert!(store.contains_lod(c, 3));
        assert!(!store.contains_lod(ChunkCoord::new(0, 0), 3));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(c).map(|r| r.mask()), Some(0b11000));

        assert!(store.evict(c));
        assert!(!store.evict(c));
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_clear() {
        let mut store = ChunkStore::new();
        for x in 0..4 {
            store.install(ChunkCoord::new(x, 0), 1, ChunkLodData::default());
        }
        assert_eq!(store.coords().count(), 4);
        store.clear();
        assert!(store.is_empty());
    }
}
