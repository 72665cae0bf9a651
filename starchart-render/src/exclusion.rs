//! Canvas space already taken by symbols and labels.

use crate::error::{RenderError, Result};
use crate::geometry::Rect;

pub const DEFAULT_EXCLUSION_CAPACITY: usize = 65_536;

/// Bounded list of plot-space rectangles that labels must not cover.
///
/// Lookups are a linear scan. A chart holds at most a few thousand
/// regions, and every query happens once per label candidate.
#[derive(Debug, Clone)]
pub struct ExclusionRegistry {
    regions: Vec<Rect>,
    capacity: usize,
}

impl Default for ExclusionRegistry {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_EXCLUSION_CAPACITY)
    }
}

impl ExclusionRegistry {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            regions: Vec::new(),
            capacity,
        }
    }

    /// Records a region; fails once `capacity` regions are held.
    pub fn add(&mut self, region: Rect) -> Result<()> {
        if self.regions.len() >= self.capacity {
            return Err(RenderError::ExclusionCapacity {
                limit: self.capacity,
            });
        }
        self.regions.push(region);
        Ok(())
    }

    pub fn overlaps(&self, region: &Rect) -> bool {
        self.regions.iter().any(|r| r.overlaps(region))
    }

    pub fn clear(&mut self) {
        self.regions.clear();
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn regions(&self) -> &[Rect] {
        &self.regions
    }
}
