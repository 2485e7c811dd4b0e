use std::collections::VecDeque;

use glam::{Vec3, Vec3Swizzles};

use crate::{
  geometry::distance_to_segment_2d,
  nav_graph::{AreaId, NodeId},
  walkability::WalkabilityChecker,
};

/// A single point of a path.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Waypoint {
  /// The node this waypoint visits.
  pub node: NodeId,
  /// The position of the node.
  pub position: Vec3,
}

/// An ordered list of waypoints from a start to a goal. Waypoints are removed
/// from the front as they are reached.
#[derive(Clone, PartialEq, Debug)]
pub struct Path {
  /// The waypoints that have not been reached yet.
  waypoints: VecDeque<Waypoint>,
  /// The node the path leads to.
  goal: NodeId,
  /// The most recently reached waypoint.
  last_reached: Option<Waypoint>,
  /// The cost of the whole path when it was found.
  total_cost: f32,
}

#[allow(clippy::len_without_is_empty)]
impl Path {
  /// Creates a path visiting `waypoints` in order. The last waypoint is the
  /// goal. Returns `None` if there are no waypoints.
  pub fn new(waypoints: Vec<Waypoint>, total_cost: f32) -> Option<Self> {
    let goal = waypoints.last()?.node;
    Some(Self {
      waypoints: waypoints.into(),
      goal,
      last_reached: None,
      total_cost,
    })
  }

  /// The remaining waypoints, starting with the next one.
  pub fn waypoints(&self) -> impl ExactSizeIterator<Item = &Waypoint> + '_ {
    self.waypoints.iter()
  }

  /// The next waypoint to reach.
  pub fn next(&self) -> Option<&Waypoint> {
    self.waypoints.front()
  }

  pub fn goal(&self) -> NodeId {
    self.goal
  }

  pub fn last_reached(&self) -> Option<&Waypoint> {
    self.last_reached.as_ref()
  }

  /// The cost of the path as found by the pathfinder.
  pub fn total_cost(&self) -> f32 {
    self.total_cost
  }

  /// The number of waypoints not yet reached. See also [`Self::is_finished`].
  pub fn len(&self) -> usize {
    self.waypoints.len()
  }

  /// Whether every waypoint has been reached.
  pub fn is_finished(&self) -> bool {
    self.waypoints.is_empty()
  }

  /// Marks the next waypoint as reached and returns it.
  pub fn advance(&mut self) -> Option<Waypoint> {
    let reached = self.waypoints.pop_front()?;
    self.last_reached = Some(reached);
    Some(reached)
  }

  /// Advances past the next waypoint if `position` is horizontally within
  /// `radius` of it. Returns whether the path advanced.
  pub fn advance_if_reached(&mut self, position: Vec3, radius: f32) -> bool {
    match self.next() {
      Some(next) if next.position.xy().distance(position.xy()) <= radius => {
        self.advance();
        true
      }
      _ => false,
    }
  }

  /// Drops interior waypoints that lie on the straight line between their
  /// neighbours, horizontally and vertically within `tolerance`. The next
  /// waypoint and the goal are always kept.
  pub fn straighten(&mut self, tolerance: f32) {
    if self.waypoints.len() < 3 {
      return;
    }
    let mut kept = VecDeque::with_capacity(self.waypoints.len());
    let last_index = self.waypoints.len() - 1;
    for index in 0..self.waypoints.len() {
      let current = self.waypoints[index];
      if index == 0 || index == last_index {
        kept.push_back(current);
        continue;
      }
      let previous = *kept.back().expect("the first waypoint is always kept");
      let next = self.waypoints[index + 1];
      let on_line = is_between(
        previous.position,
        current.position,
        next.position,
        tolerance,
      );
      if !on_line {
        kept.push_back(current);
      }
    }
    self.waypoints = kept;
  }

  /// Looks up to `lookahead` waypoints ahead for the farthest one that can be
  /// walked to directly from `position` (in `area`), and skips every waypoint
  /// before it. Returns the number of waypoints skipped.
  pub fn skip_ahead(
    &mut self,
    checker: &WalkabilityChecker<'_>,
    position: Vec3,
    area: AreaId,
    lookahead: usize,
  ) -> usize {
    let farthest = lookahead.min(self.waypoints.len().saturating_sub(1));
    for skip in (1..=farthest).rev() {
      let target = self.waypoints[skip].position;
      if checker.can_traverse(position, target, area) {
        for _ in 0..skip {
          self.advance();
        }
        return skip;
      }
    }
    0
  }
}

/// Determines whether `point` lies on the segment from `start` to `end`,
/// allowing `tolerance` of deviation both horizontally and vertically.
fn is_between(start: Vec3, point: Vec3, end: Vec3, tolerance: f32) -> bool {
  if distance_to_segment_2d(point.xy(), (start.xy(), end.xy())) > tolerance {
    return false;
  }
  let delta = end.xy() - start.xy();
  let length_squared = delta.length_squared();
  let t = if length_squared <= f32::EPSILON {
    0.0
  } else {
    (delta.dot(point.xy() - start.xy()) / length_squared).clamp(0.0, 1.0)
  };
  let height_on_line = start.z + (end.z - start.z) * t;
  (point.z - height_on_line).abs() <= tolerance
}

#[cfg(test)]
#[path = "path_test.rs"]
mod test;
