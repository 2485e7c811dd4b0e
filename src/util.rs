use glam::Vec2;

use crate::coords::Axis;

/// A horizontal, axis-aligned bounding box.
#[derive(PartialEq, Clone, Copy, Debug)]
pub struct Bounds {
  /// The minimum bounds of the box.
  pub min: Vec2,
  /// The maximum bounds of the box. Must be component-wise greater than or
  /// equal to `min`.
  pub max: Vec2,
}

impl Bounds {
  /// Creates the tightest box around `points`. Returns `None` if there are no
  /// points.
  pub fn from_points(points: impl IntoIterator<Item = Vec2>) -> Option<Self> {
    points.into_iter().fold(None, |acc, point| match acc {
      None => Some(Self { min: point, max: point }),
      Some(bounds) => Some(bounds.expand_to_point(point)),
    })
  }

  /// Expands the box to contain `point`.
  pub fn expand_to_point(&self, point: Vec2) -> Self {
    Self { min: self.min.min(point), max: self.max.max(point) }
  }

  /// Grows (or shrinks, for negative `margin`) the box on every side. A box
  /// shrunk past zero size collapses onto its center.
  pub fn expand_by(&self, margin: f32) -> Self {
    let min = self.min - Vec2::splat(margin);
    let max = self.max + Vec2::splat(margin);
    let center = self.center();
    Self { min: min.min(center), max: max.max(center) }
  }

  pub fn size(&self) -> Vec2 {
    self.max - self.min
  }

  pub fn center(&self) -> Vec2 {
    (self.min + self.max) * 0.5
  }

  /// The extent of the box along `axis`.
  pub fn range(&self, axis: Axis) -> (f32, f32) {
    (axis.of(self.min), axis.of(self.max))
  }

  /// Determines if `point` is in `self`, allowing `margin` of slack on every
  /// side.
  pub fn contains_point(&self, point: Vec2, margin: f32) -> bool {
    self.min.x - margin <= point.x
      && point.x <= self.max.x + margin
      && self.min.y - margin <= point.y
      && point.y <= self.max.y + margin
  }

  /// Moves `point` to the nearest point inside the box.
  pub fn clamp_point(&self, point: Vec2) -> Vec2 {
    point.clamp(self.min, self.max)
  }

  /// Determines if `other` overlaps `self` at all (touching counts).
  pub fn intersects(&self, other: &Self) -> bool {
    self.min.x <= other.max.x
      && other.min.x <= self.max.x
      && self.min.y <= other.max.y
      && other.min.y <= self.max.y
  }

  /// The overlap of `self` and `other`, or `None` if they do not overlap.
  pub fn intersection(&self, other: &Self) -> Option<Self> {
    self.intersects(other).then(|| Self {
      min: self.min.max(other.min),
      max: self.max.min(other.max),
    })
  }
}

#[cfg(test)]
#[path = "util_test.rs"]
mod test;
