//! Section indexing for chunk mesh pieces
//!
//! Center pieces take indices `0..=max_lod`. Border pieces follow, eight per
//! LOD: the four directions, then the same four downscaled.

use crate::terrain::chunk::{Direction, Lod};

/// Identifies one mesh piece of a chunk
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PartSelector {
    pub lod: Lod,
    pub direction: Direction,
    /// Always false for `Direction::Center`
    pub downscaled: bool,
}

impl PartSelector {
    pub fn center(lod: Lod) -> Self {
        Self { lod, direction: Direction::Center, downscaled: false }
    }

    pub fn border(lod: Lod, direction: Direction, downscaled: bool) -> Self {
        Self { lod, direction, downscaled: downscaled && direction != Direction::Center }
    }
}

/// Stable bijection between part selectors and section indices
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PartIndexer {
    max_lod: Lod,
}

impl PartIndexer {
    pub fn new(max_lod: Lod) -> Self {
        Self { max_lod }
    }

    pub fn max_lod(&self) -> Lod {
        self.max_lod
    }

    /// Number of section indices per chunk
    pub fn section_count(&self) -> u32 {
        (self.max_lod + 1) * 9
    }

    /// Section index for a selector
    ///
    /// # Examples
    /// ```
    /// use lodterrain::terrain::{Direction, PartIndexer, PartSelector};
    ///
    /// let indexer = PartIndexer::new(8);
    /// assert_eq!(indexer.to_index(PartSelector::center(3)), 3);
    /// assert_eq!(indexer.to_index(PartSelector::border(0, Direction::Left, false)), 9);
    /// assert_eq!(indexer.to_index(PartSelector::border(1, Direction::Down, true)), 24);
    /// ```
    pub fn to_index(&self, part: PartSelector) -> u32 {
        match part.direction.border_index() {
            None => part.lod,
            Some(offset) => {
                (self.max_lod + 1) + 8 * part.lod + offset as u32 + if part.downscaled { 4 } else { 0 }
            }
        }
    }

    /// Selector for a section index, `None` when out of range
    pub fn from_index(&self, index: u32) -> Option<PartSelector> {
        if index >= self.section_count() {
            return None;
        }
        if index <= self.max_lod {
            return Some(PartSelector::center(index));
        }

        let rel = index - (self.max_lod + 1);
        let lod = rel / 8;
        let slot = rel % 8;
        let direction = Direction::from_border_index((slot % 4) as usize)?;
        Some(PartSelector::border(lod, direction, slot >= 4))
    }

    /// Indices of the nine pieces generated for one LOD
    pub fn lod_sections(&self, lod: Lod) -> impl Iterator<Item = (PartSelector, u32)> + '_ {
        std::iter::once(PartSelector::center(lod))
            .chain(
                [false, true]
                    .into_iter()
                    .flat_map(move |ds| Direction::BORDERS.into_iter().map(move |d| PartSelector::border(lod, d, ds))),
            )
            .map(move |part| (part, self.to_index(part)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn all_selectors(max_lod: Lod) -> Vec<PartSelector> {
        let mut parts = Vec::new();
        for lod in 0..=max_lod {
            parts.push(PartSelector::center(lod));
            for d in Direction::BORDERS {
                for ds in [false, true] {
                    parts.push(PartSelector::border(lod, d, ds));
                }
            }
        }
        parts
    }

    #[test]
    fn test_index_formula() {
        let idx = PartIndexer::new(8);
        assert_eq!(idx.to_index(PartSelector::center(0)), 0);
        assert_eq!(idx.to_index(PartSelector::center(8)), 8);
        assert_eq!(idx.to_index(PartSelector::border(0, Direction::Left, false)), 9);
        assert_eq!(idx.to_index(PartSelector::border(0, Direction::Down, true)), 9 + 3 + 4);
        assert_eq!(idx.to_index(PartSelector::border(3, Direction::Up, false)), 9 + 24 + 2);
        assert_eq!(idx.section_count(), 81);
    }

    #[test]
    fn test_indices_are_bijective() {
        for max_lod in [0, 2, 8] {
            let idx = PartIndexer::new(max_lod);
            let parts = all_selectors(max_lod);
            let indices: HashSet<u32> = parts.iter().map(|p| idx.to_index(*p)).collect();

            assert_eq!(indices.len(), parts.len());
            assert_eq!(indices, (0..idx.section_count()).collect());
            for p in parts {
                assert_eq!(idx.from_index(idx.to_index(p)), Some(p));
            }
        }
    }

    #[test]
    fn test_center_never_collides_with_border() {
        let idx = PartIndexer::new(4);
        let centers: HashSet<u32> = (0..=4).map(|l| idx.to_index(PartSelector::center(l))).collect();
        for p in all_selectors(4).into_iter().filter(|p| p.direction != Direction::Center) {
            assert!(!centers.contains(&idx.to_index(p)));
        }
    }

    #[test]
    fn test_center_ignores_downscale() {
        let p = PartSelector::border(2, Direction::Center, true);
        assert!(!p.downscaled);
        assert_eq!(p, PartSelector::center(2));
    }

    #[test]
    fn test_from_index_out_of_range() {
        let idx = PartIndexer::new(2);
        assert_eq!(idx.from_index(27), None);
        assert!(idx.from_index(26).is_some());
    }

    #[test]
    fn test_lod_sections() {
        let idx = PartIndexer::new(2);
        let sections: Vec<u32> = idx.lod_sections(1).map(|(_, i)| i).collect();
        assert_eq!(sections, vec![1, 11, 12, 13, 14, 15, 16, 17, 18]);
    }
}
