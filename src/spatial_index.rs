use glam::Vec3;
use kdtree::{distance::squared_euclidean, KdTree};
use tracing::debug;

use crate::nav_graph::AreaId;

/// A KD-tree over the centers of areas, used to find the areas nearest to a
/// point.
pub struct SpatialIndex {
  tree: KdTree<f32, AreaId, [f32; 3]>,
}

impl SpatialIndex {
  /// Builds the index over `points`. Points with non-finite coordinates are
  /// skipped.
  pub fn build(points: impl IntoIterator<Item = (AreaId, Vec3)>) -> Self {
    let mut tree = KdTree::new(/* dimensions= */ 3);
    for (area, point) in points {
      if tree.add(point.to_array(), area).is_err() {
        debug!(%area, ?point, "skipped an area center that cannot be indexed");
      }
    }
    Self { tree }
  }

  pub fn len(&self) -> usize {
    self.tree.size()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Finds the area whose center is nearest to `point`, along with the
  /// distance to it. Returns `None` if the index is empty.
  pub fn find_nearest(&self, point: Vec3) -> Option<(AreaId, f32)> {
    self.find_k_nearest(point, 1).into_iter().next()
  }

  /// Finds the (up to) `k` areas whose centers are nearest to `point`, sorted
  /// by increasing distance.
  pub fn find_k_nearest(&self, point: Vec3, k: usize) -> Vec<(AreaId, f32)> {
    if k == 0 || self.is_empty() {
      return Vec::new();
    }
    match self.tree.nearest(&point.to_array(), k, &squared_euclidean) {
      Ok(nearest) => nearest
        .into_iter()
        .map(|(distance_squared, &area)| (area, distance_squared.sqrt()))
        .collect(),
      Err(_) => Vec::new(),
    }
  }
}

#[cfg(test)]
#[path = "spatial_index_test.rs"]
mod test;
