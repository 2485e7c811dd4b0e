use glam::{Vec2, Vec3, Vec3Swizzles};
use ord_subset::OrdVar;
use thiserror::Error;
use tracing::debug;

use crate::{
  coords::Direction,
  geometry::{
    direction_along_surface, quad_normal_at, ray_exit_2d, slope_degrees,
  },
  nav_graph::{AreaId, AreaShape, NavigationGraph, NodeId},
  trace::{TraceMode, WorldTracer},
  NavigationOptions,
};

/// Positions closer than this are the same position.
const SAME_POSITION_DISTANCE: f32 = 1e-3;

/// Why a straight-line traversal is not possible.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum NotWalkable {
  #[error("area {0} is not in the navigation graph")]
  UnknownArea(AreaId),
  #[error("there is no way out of area {area} towards the goal")]
  NoExit { area: AreaId },
  #[error("there is no ground within reach at {point}")]
  NoGround { point: Vec3 },
  #[error("a rise of {height} is too high to jump")]
  LedgeTooHigh { height: f32 },
  #[error("area {area} is too steep ({degrees} degrees) to walk up")]
  TooSteep { area: AreaId, degrees: f32 },
  #[error("something is in the way after {fraction} of a segment")]
  Obstructed { fraction: f32 },
  #[error("gave up after crossing {0} areas")]
  TooManyHops(usize),
  #[error("stopped {distance} units away from the goal")]
  GoalMissed { distance: f32 },
}

/// Details of a successful traversal check.
#[derive(Debug, Clone, PartialEq)]
pub struct TraversalReport {
  /// The areas crossed, starting with the start area.
  pub areas: Vec<AreaId>,
  /// Hill tops and cave entrances along the way.
  pub checkpoints: Vec<Vec3>,
  /// Whether any step along the way is higher than a step up.
  pub needs_jump: bool,
  /// The ground point reached at the goal.
  pub end_position: Vec3,
}

/// Tracks the vertical profile of a traversal to find hill tops and cave
/// entrances.
#[derive(Default)]
struct HeightProfile {
  last: Option<Vec3>,
  /// The highest point of the current climb.
  climb_apex: Option<Vec3>,
}

impl HeightProfile {
  /// Records the next ground point. Returns a checkpoint if `point` closes a
  /// climb (the apex) or drops into a cave (the point itself).
  fn observe(&mut self, point: Vec3, threshold: f32) -> Option<Vec3> {
    let Some(last) = self.last.replace(point) else {
      return None;
    };
    let rise = point.z - last.z;
    if let Some(apex) = self.climb_apex {
      if point.z >= apex.z {
        self.climb_apex = Some(point);
        return None;
      }
      if rise < 0.0 {
        self.climb_apex = None;
        return Some(apex);
      }
      return None;
    }
    if rise > threshold {
      self.climb_apex = Some(point);
      None
    } else if -rise > threshold {
      Some(point)
    } else {
      None
    }
  }
}

/// Decides whether an agent can walk in a straight line between two points.
/// Heights come from the navigation mesh, and a [`WorldTracer`] (if present)
/// checks for obstructions the mesh does not know about.
pub struct WalkabilityChecker<'a> {
  graph: &'a NavigationGraph,
  options: &'a NavigationOptions,
  tracer: Option<&'a dyn WorldTracer>,
}

impl<'a> WalkabilityChecker<'a> {
  pub fn new(
    graph: &'a NavigationGraph,
    options: &'a NavigationOptions,
  ) -> Self {
    Self { graph, options, tracer: None }
  }

  /// Uses `tracer` to check for obstructions.
  pub fn with_tracer(mut self, tracer: &'a dyn WorldTracer) -> Self {
    self.tracer = Some(tracer);
    self
  }

  /// Determines whether an agent in `area` can walk straight from `start` to
  /// `goal`.
  pub fn can_traverse(&self, start: Vec3, goal: Vec3, area: AreaId) -> bool {
    match self.check(start, goal, area) {
      Ok(_) => true,
      Err(reason) => {
        debug!(?start, ?goal, %area, %reason, "not walkable");
        false
      }
    }
  }

  /// Checks whether an agent in `start_area` can walk straight from `start`
  /// to `goal`, crossing one area at a time.
  pub fn check(
    &self,
    start: Vec3,
    goal: Vec3,
    start_area: AreaId,
  ) -> Result<TraversalReport, NotWalkable> {
    let options = self.options;
    let mut area = start_area;
    let mut shape = self
      .graph
      .area(start_area)
      .ok_or(NotWalkable::UnknownArea(start_area))?;

    if start.distance(goal) <= SAME_POSITION_DISTANCE {
      return Ok(TraversalReport {
        areas: vec![start_area],
        checkpoints: Vec::new(),
        needs_jump: false,
        end_position: goal,
      });
    }

    if !shape.bounds.contains_point(start.xy(), options.boundary_tolerance) {
      area = self
        .graph
        .area_at(start, options.boundary_tolerance)
        .ok_or(NotWalkable::NoExit { area: start_area })?;
      shape = self.graph.area(area).ok_or(NotWalkable::UnknownArea(area))?;
      if !shape.bounds.contains_point(start.xy(), options.boundary_tolerance) {
        return Err(NotWalkable::NoExit { area: start_area });
      }
    }

    let mut report = TraversalReport {
      areas: vec![area],
      checkpoints: Vec::new(),
      needs_jump: false,
      end_position: goal,
    };
    let mut profile = HeightProfile::default();
    let mut position = ground_point(shape, start.xy());
    profile.observe(position, options.hill_threshold);
    // The start of the segment that the next checkpoint trace begins at.
    let mut trace_from = position;

    for _ in 0..=options.max_walk_hops {
      if shape.bounds.contains_point(goal.xy(), options.boundary_tolerance) {
        let goal_ground = ground_point(shape, goal.xy());
        let vertical_distance = (goal.z - goal_ground.z).abs();
        let on_boundary = !shape
          .bounds
          .expand_by(-options.boundary_tolerance)
          .contains_point(goal.xy(), 0.0);
        if vertical_distance <= options.goal_tolerance {
          self.walk_segment(
            &mut report,
            &mut profile,
            &mut trace_from,
            position,
            goal_ground,
          )?;
          if let Some(tracer_start) = report.checkpoints.last().copied() {
            if self.options.trace_mode == TraceMode::Cheap {
              self.trace_clear(tracer_start, goal_ground)?;
            }
          }
          report.end_position = goal_ground;
          return Ok(report);
        }
        if !on_boundary {
          return Err(NotWalkable::GoalMissed { distance: vertical_distance });
        }
        // The goal is on the edge of this area, but at the height of a
        // neighbour. Keep going into the neighbour.
      }

      let direction = goal.xy() - position.xy();
      if direction.length() <= SAME_POSITION_DISTANCE {
        return Err(NotWalkable::GoalMissed {
          distance: (goal.z - position.z).abs(),
        });
      }
      let direction = direction.normalize();

      let normal = quad_normal_at(&shape.corners, position.xy());
      let slope = slope_degrees(normal);
      if slope > options.max_slope_degrees
        && direction_along_surface(direction, normal).z > 0.0
      {
        return Err(NotWalkable::TooSteep { area, degrees: slope });
      }

      let exit = ray_exit_2d(position.xy(), direction, &shape.bounds)
        .ok_or(NotWalkable::NoExit { area })?;
      let exit_point = ground_point(shape, exit.point);
      let middle = ground_point(shape, position.xy().lerp(exit.point, 0.5));
      self.walk_segment(
        &mut report,
        &mut profile,
        &mut trace_from,
        position,
        middle,
      )?;
      self.walk_segment(
        &mut report,
        &mut profile,
        &mut trace_from,
        middle,
        exit_point,
      )?;

      let (next_area, next_shape) = self
        .find_neighbour(area, shape, exit.point, exit.side, exit_point.z)
        .ok_or(NotWalkable::NoExit { area })?;
      let entry_point =
        ground_point(next_shape, next_shape.bounds.clamp_point(exit.point));

      let rise = entry_point.z - exit_point.z;
      if rise > options.max_jump_height {
        return Err(NotWalkable::LedgeTooHigh { height: rise });
      }
      if -rise > options.max_fall_height {
        return Err(NotWalkable::NoGround { point: entry_point });
      }
      if rise > options.step_height {
        report.needs_jump = true;
      }
      if options.trace_mode == TraceMode::Strict {
        if let Some(tracer) = self.tracer {
          let probe = entry_point + Vec3::Z * options.step_height;
          if tracer
            .ground_below(probe, options.step_height + options.max_fall_height)
            .is_none()
          {
            return Err(NotWalkable::NoGround { point: entry_point });
          }
        }
      }
      self.walk_segment(
        &mut report,
        &mut profile,
        &mut trace_from,
        exit_point,
        entry_point,
      )?;

      area = next_area;
      shape = next_shape;
      position = entry_point;
      report.areas.push(area);
    }

    Err(NotWalkable::TooManyHops(options.max_walk_hops))
  }

  /// Moves along the ground from `from` to `to`, recording checkpoints and
  /// tracing as the trace mode requires.
  fn walk_segment(
    &self,
    report: &mut TraversalReport,
    profile: &mut HeightProfile,
    trace_from: &mut Vec3,
    from: Vec3,
    to: Vec3,
  ) -> Result<(), NotWalkable> {
    match self.options.trace_mode {
      TraceMode::Strict => self.trace_clear(from, to)?,
      TraceMode::Cheap => {}
    }
    if let Some(checkpoint) = profile.observe(to, self.options.hill_threshold)
    {
      if self.options.trace_mode == TraceMode::Cheap {
        self.trace_clear(*trace_from, checkpoint)?;
      }
      *trace_from = checkpoint;
      report.checkpoints.push(checkpoint);
    }
    Ok(())
  }

  /// Sweeps the agent's hull from `from` to `to`, both lifted by the step
  /// height so small steps are not obstructions. Passes if there is no
  /// tracer.
  fn trace_clear(&self, from: Vec3, to: Vec3) -> Result<(), NotWalkable> {
    let Some(tracer) = self.tracer else {
      return Ok(());
    };
    let lift = Vec3::Z * self.options.step_height;
    let climb = Vec3::Z * (to.z - from.z).max(0.0);
    let result =
      tracer.trace_hull(from + lift + climb, to + lift, &self.options.hull);
    if result.fraction < self.options.obstruction_fraction {
      return Err(NotWalkable::Obstructed { fraction: result.fraction });
    }
    Ok(())
  }

  /// Finds the area that `point` on the `side` boundary of `area` crosses
  /// into. Every side whose boundary `point` is near is considered, to
  /// handle leaving through a corner. Among the candidates, the one whose
  /// ground is closest to `height` wins.
  fn find_neighbour(
    &self,
    area: AreaId,
    shape: &AreaShape,
    point: Vec2,
    side: Direction,
    height: f32,
  ) -> Option<(AreaId, &'a AreaShape)> {
    let tolerance = self.options.boundary_tolerance;
    let node = self.graph.node(NodeId::Area(area))?;
    let near_sides = Direction::ALL.into_iter().filter(|&direction| {
      direction == side
        || distance_to_side(shape, point, direction) <= tolerance
    });

    near_sides
      .flat_map(|direction| node.connections[direction.index()].iter())
      .filter_map(|connection| {
        let neighbour = self.neighbour_area(area, connection.target)?;
        let neighbour_shape = self.graph.area(neighbour)?;
        if !neighbour_shape.bounds.contains_point(point, tolerance) {
          return None;
        }
        let entry = neighbour_shape.bounds.clamp_point(point);
        let vertical_distance =
          (neighbour_shape.height_at(entry) - height).abs();
        Some((neighbour, neighbour_shape, vertical_distance))
      })
      .min_by_key(|&(_, _, vertical_distance)| {
        OrdVar::new_unchecked(vertical_distance)
      })
      .map(|(neighbour, neighbour_shape, _)| (neighbour, neighbour_shape))
  }

  /// The area reached by taking a connection to `target` from `area`. Doors
  /// lead to the area on their other side.
  fn neighbour_area(&self, area: AreaId, target: NodeId) -> Option<AreaId> {
    match target {
      NodeId::Area(target) => (target != area).then_some(target),
      NodeId::Door(_) => {
        let info = self.graph.node(target)?.door_info()?;
        if info.source == area {
          Some(info.target)
        } else if info.target == area {
          Some(info.source)
        } else {
          None
        }
      }
    }
  }
}

/// The ground of `shape` at `point`.
fn ground_point(shape: &AreaShape, point: Vec2) -> Vec3 {
  point.extend(shape.height_at(point))
}

/// The distance from `point` to the line of the `side` boundary of `shape`.
fn distance_to_side(shape: &AreaShape, point: Vec2, side: Direction) -> f32 {
  match side {
    Direction::North => (point.y - shape.bounds.min.y).abs(),
    Direction::East => (point.x - shape.bounds.max.x).abs(),
    Direction::South => (point.y - shape.bounds.max.y).abs(),
    Direction::West => (point.x - shape.bounds.min.x).abs(),
  }
}

#[cfg(test)]
#[path = "walkability_test.rs"]
mod test;
