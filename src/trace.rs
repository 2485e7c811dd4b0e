use glam::Vec3;

/// The box swept through the world when tracing, relative to the traced
/// position (at the feet).
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Hull {
  pub mins: Vec3,
  pub maxs: Vec3,
}

impl Hull {
  /// A hull with no volume, so traces with it are line traces.
  pub const POINT: Hull = Hull { mins: Vec3::ZERO, maxs: Vec3::ZERO };

  /// Creates a hull `width` wide on both horizontal axes and `height` tall,
  /// standing on its origin.
  pub fn new(width: f32, height: f32) -> Self {
    let half_width = width * 0.5;
    Self {
      mins: Vec3::new(-half_width, -half_width, 0.0),
      maxs: Vec3::new(half_width, half_width, height),
    }
  }

  /// The larger of the two horizontal extents.
  pub fn width(&self) -> f32 {
    let size = self.maxs - self.mins;
    size.x.max(size.y)
  }

  pub fn height(&self) -> f32 {
    self.maxs.z - self.mins.z
  }
}

impl Default for Hull {
  fn default() -> Self {
    Self::new(32.0, 72.0)
  }
}

/// The outcome of a trace.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct TraceResult {
  /// How much of the segment was travelled before hitting something, from 0
  /// to 1.
  pub fraction: f32,
  /// Where the trace stopped.
  pub end_position: Vec3,
  /// The normal of the surface that was hit. Meaningless if nothing was hit.
  pub normal: Vec3,
}

impl TraceResult {
  /// A trace that reached `end` without hitting anything.
  pub fn clear(end: Vec3) -> Self {
    Self { fraction: 1.0, end_position: end, normal: Vec3::Z }
  }

  pub fn hit(&self) -> bool {
    self.fraction < 1.0
  }
}

/// Queries against the live world geometry, provided by the host.
pub trait WorldTracer {
  /// Sweeps `hull` from `start` to `end`, stopping at the first solid.
  fn trace_hull(&self, start: Vec3, end: Vec3, hull: &Hull) -> TraceResult;

  /// Traces a line from `start` to `end`.
  fn trace_line(&self, start: Vec3, end: Vec3) -> TraceResult {
    self.trace_hull(start, end, &Hull::POINT)
  }

  /// Finds the ground below `point`, at most `max_distance` down. Returns
  /// `None` if there is no ground within reach.
  fn ground_below(&self, point: Vec3, max_distance: f32) -> Option<Vec3> {
    let result = self.trace_line(point, point - Vec3::Z * max_distance);
    result.hit().then_some(result.end_position)
  }
}

/// How much a traversal check trusts the navigation mesh.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum TraceMode {
  /// Trust the mesh. Only hill tops and cave entrances are traced, and only
  /// when a tracer is available.
  #[default]
  Cheap,
  /// Trace every boundary crossing.
  Strict,
}

#[cfg(test)]
#[path = "trace_test.rs"]
mod test;
