//! Point data produced by one stream sample

use crate::foundation::math::{Bounds, Vec3};

/// An ordered set of point positions with optional 64-bit identifiers
///
/// Produced fresh for every sample and replaced wholesale; the renderer only
/// ever reads it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointSet {
    positions: Vec<Vec3>,
    ids: Option<Vec<u64>>,
    bounds: Bounds,
}

impl PointSet {
    /// Create a point set, computing its bounds from the positions
    pub fn new(positions: Vec<Vec3>) -> Self {
        let bounds = Bounds::from_points(&positions);
        Self {
            positions,
            ids: None,
            bounds,
        }
    }

    /// Attach identifiers
    ///
    /// A source may deliver an id array whose length disagrees with the
    /// positions; it is kept, but [`Self::ids`] will not expose it.
    pub fn with_ids(mut self, ids: Vec<u64>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Override the computed bounds with the ones stored in the source
    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = bounds;
        self
    }

    /// Point positions
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Identifiers, only when there is exactly one per point
    pub fn ids(&self) -> Option<&[u64]> {
        self.ids
            .as_deref()
            .filter(|ids| ids.len() == self.positions.len())
    }

    /// Bounding volume of the cloud
    pub const fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Number of points
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether the set holds no points
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_exposed_only_when_parallel() {
        let positions = vec![Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0)];

        let matching = PointSet::new(positions.clone()).with_ids(vec![7, 8]);
        assert_eq!(matching.ids(), Some(&[7u64, 8][..]));

        let short = PointSet::new(positions).with_ids(vec![7]);
        assert_eq!(short.ids(), None);
    }

    #[test]
    fn test_empty_set() {
        let set = PointSet::default();
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);
        assert_eq!(set.ids(), None);
    }
}
