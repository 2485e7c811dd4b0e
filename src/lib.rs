#![doc = include_str!("../README.md")]

mod astar;
mod coords;
mod doors;
mod geometry;
mod mesh_file;
mod nav_graph;
mod path;
mod pathfinding;
mod spatial_index;
mod trace;
mod util;
mod walkability;
mod wall_corners;

use std::{
  path::{Path as FilePath, PathBuf},
  sync::Arc,
};

use thiserror::Error;
use tracing::{debug, info, warn};

pub use glam::{Vec2, Vec3};

pub use coords::{Axis, Corner, Direction};
pub use mesh_file::{
  load_mesh_file, read_mesh, save_mesh_file, write_mesh, LoadError,
  MeshFormatError, RawArea, RawConnection, MESH_MAGIC, MESH_VERSION,
};
pub use nav_graph::{
  AreaId, AreaShape, Connection, DoorGeometry, DoorId, DoorInfo,
  DoorPosition, GraphError, NavigationGraph, Node, NodeId, NodeKind,
};
pub use path::{Path, Waypoint};
pub use pathfinding::{find_path, FindPathError};
pub use spatial_index::SpatialIndex;
pub use trace::{Hull, TraceMode, TraceResult, WorldTracer};
pub use util::Bounds;
pub use walkability::{NotWalkable, TraversalReport, WalkabilityChecker};

/// Tunables for building navigation graphs and moving agents through them.
/// Distances are in world units.
#[derive(Clone, Debug, PartialEq)]
pub struct NavigationOptions {
  /// The tallest rise an agent walks up without jumping.
  pub step_height: f32,
  /// The tallest rise an agent can jump up.
  pub max_jump_height: f32,
  /// The steepest slope an agent can walk up, in degrees.
  pub max_slope_degrees: f32,
  /// Downward acceleration, in units per second squared.
  pub gravity: f32,
  /// How far doors are kept from wall corners.
  pub door_wall_clearance: f32,
  /// The narrowest boundary that still gets a left and right door.
  pub min_door_clearance: f32,
  /// Slack allowed when deciding whether a point is inside an area.
  pub boundary_tolerance: f32,
  /// How far (vertically) a traversal may end from its goal.
  pub goal_tolerance: f32,
  /// The smallest height change that counts as a hill or a cave.
  pub hill_threshold: f32,
  /// The longest drop an agent will take.
  pub max_fall_height: f32,
  /// The most areas a single traversal check crosses before giving up.
  pub max_walk_hops: usize,
  /// The most nodes a path search explores before giving up.
  pub max_path_expansions: u32,
  /// Traces that make it less than this fraction of the way are obstructed.
  pub obstruction_fraction: f32,
  /// The hull swept through the world for obstruction traces.
  pub hull: Hull,
  /// How much of a traversal is checked against the world, when a tracer is
  /// available.
  pub trace_mode: TraceMode,
}

impl Default for NavigationOptions {
  fn default() -> Self {
    Self {
      step_height: 18.0,
      max_jump_height: 72.0,
      max_slope_degrees: 45.0,
      gravity: 800.0,
      door_wall_clearance: 24.0,
      min_door_clearance: 16.0,
      boundary_tolerance: 5.0,
      goal_tolerance: 32.0,
      hill_threshold: 8.0,
      max_fall_height: 256.0,
      max_walk_hops: 32,
      max_path_expansions: 10_000,
      obstruction_fraction: 0.99,
      hull: Hull::default(),
      trace_mode: TraceMode::Cheap,
    }
  }
}

impl NavigationOptions {
  /// Creates the default options, but with door clearances and the hull
  /// derived from the width of the agent's hull.
  pub fn from_hull_width(width: f32) -> Self {
    let default = Self::default();
    Self {
      door_wall_clearance: width * 0.75,
      min_door_clearance: width * 0.5,
      hull: Hull::new(width, default.hull.height()),
      ..default
    }
  }

  /// The height reached by jumping straight up at `speed`.
  pub fn jump_height_for_speed(&self, speed: f32) -> f32 {
    speed * speed / (2.0 * self.gravity)
  }
}

/// Produces a navigation mesh file when one is missing.
pub trait MeshGenerator {
  /// Writes the mesh file for `path`.
  fn generate(
    &mut self,
    path: &FilePath,
  ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// An error while reloading the navigation graph. Each variant is the phase
/// that failed.
#[derive(Debug, Error)]
pub enum ReloadError {
  #[error("loading {} failed: {source}", .path.display())]
  Load { path: PathBuf, source: LoadError },
  #[error("building the graph for {} failed: {source}", .path.display())]
  Build { path: PathBuf, source: GraphError },
  #[error("generating {} failed: {reason}", .path.display())]
  Generation { path: PathBuf, reason: String },
}

impl ReloadError {
  /// The mesh file that was being reloaded.
  pub fn path(&self) -> &FilePath {
    match self {
      Self::Load { path, .. }
      | Self::Build { path, .. }
      | Self::Generation { path, .. } => path,
    }
  }
}

/// The outcome of checking the next segment of a path.
#[derive(Clone, Debug, PartialEq)]
pub enum SegmentStatus {
  /// The path has no waypoints left.
  Finished,
  /// The next waypoint can still be walked to.
  Clear,
  /// The next waypoint could not be walked to, and the path was replaced.
  Repathed {
    /// Whether the edge to the unreachable waypoint was pruned.
    pruned: bool,
  },
  /// The next waypoint could not be walked to, and there is no other path.
  Unreachable { pruned: bool, error: FindPathError },
}

/// Owns the current navigation graph of a map and answers queries against
/// it. Readers get immutable snapshots of the graph, so replacing the graph
/// never invalidates a snapshot in use.
pub struct Navigator {
  pub options: NavigationOptions,
  graph: Option<Arc<NavigationGraph>>,
}

impl Navigator {
  pub fn new(options: NavigationOptions) -> Self {
    Self { options, graph: None }
  }

  /// A snapshot of the current graph, if one is loaded.
  pub fn graph(&self) -> Option<Arc<NavigationGraph>> {
    self.graph.clone()
  }

  /// Replaces the current graph with `graph`. Returns the previous graph.
  pub fn replace_graph(
    &mut self,
    graph: NavigationGraph,
  ) -> Option<Arc<NavigationGraph>> {
    self.graph.replace(Arc::new(graph))
  }

  /// Loads the mesh file at `path` and builds a new graph from it. If the
  /// file is missing and a `generator` is given, the generator is asked to
  /// create it and loading is retried once. On failure, the previous graph
  /// is kept.
  pub fn reload(
    &mut self,
    path: &FilePath,
    generator: Option<&mut dyn MeshGenerator>,
  ) -> Result<Arc<NavigationGraph>, ReloadError> {
    match self.build_graph(path, generator) {
      Ok(graph) => {
        info!(
          path = %path.display(),
          areas = graph.area_count(),
          doors = graph.door_count(),
          "navigation graph ready"
        );
        let graph = Arc::new(graph);
        self.graph = Some(graph.clone());
        Ok(graph)
      }
      Err(error) => {
        warn!(%error, "navigation reload failed, keeping the previous graph");
        Err(error)
      }
    }
  }

  fn build_graph(
    &self,
    path: &FilePath,
    generator: Option<&mut dyn MeshGenerator>,
  ) -> Result<NavigationGraph, ReloadError> {
    let load_error = |source: LoadError| ReloadError::Load {
      path: path.to_path_buf(),
      source,
    };
    let areas = match load_mesh_file(path) {
      Ok(areas) => areas,
      Err(LoadError::FileNotFound(missing)) => {
        let Some(generator) = generator else {
          return Err(load_error(LoadError::FileNotFound(missing)));
        };
        debug!(path = %path.display(), "mesh file is missing, generating it");
        generator.generate(path).map_err(|error| ReloadError::Generation {
          path: path.to_path_buf(),
          reason: error.to_string(),
        })?;
        load_mesh_file(path).map_err(load_error)?
      }
      Err(source) => return Err(load_error(source)),
    };
    NavigationGraph::build(areas, &self.options)
      .map_err(|source| ReloadError::Build { path: path.to_path_buf(), source })
  }

  /// Finds a path between two nodes of the current graph.
  pub fn find_path_between(
    &self,
    start: NodeId,
    goal: NodeId,
  ) -> Result<Path, FindPathError> {
    let graph = self.graph.as_ref().ok_or(FindPathError::NoGraph)?;
    find_path(graph, start, goal, self.options.max_path_expansions)
  }

  /// Finds a path from the area containing `start` to the area containing
  /// `goal`.
  pub fn find_path(
    &self,
    start: Vec3,
    goal: Vec3,
  ) -> Result<Path, FindPathError> {
    let graph = self.graph.as_ref().ok_or(FindPathError::NoGraph)?;
    let tolerance = self.options.boundary_tolerance;
    let start_area =
      graph.area_at(start, tolerance).ok_or(FindPathError::NoPathFound)?;
    let goal_area =
      graph.area_at(goal, tolerance).ok_or(FindPathError::NoPathFound)?;
    find_path(
      graph,
      NodeId::Area(start_area),
      NodeId::Area(goal_area),
      self.options.max_path_expansions,
    )
  }

  /// Determines whether an agent in `area` can walk straight from `start` to
  /// `goal`, trusting the mesh. Returns false if no graph is loaded.
  pub fn can_traverse(&self, start: Vec3, goal: Vec3, area: AreaId) -> bool {
    self.graph.as_ref().is_some_and(|graph| {
      WalkabilityChecker::new(graph, &self.options)
        .can_traverse(start, goal, area)
    })
  }

  /// Checks that the next waypoint of `path` can still be walked to from
  /// `position` (in `area`). If it cannot, the edge from the last reached
  /// waypoint to the next one is pruned, and `path` is replaced with a new
  /// path to the same goal.
  ///
  /// When a `tracer` is given, the whole segment is traced against the world
  /// regardless of [`NavigationOptions::trace_mode`], so obstacles on flat
  /// ground are found too.
  pub fn check_next_segment(
    &mut self,
    path: &mut Path,
    position: Vec3,
    area: AreaId,
    tracer: Option<&dyn WorldTracer>,
  ) -> SegmentStatus {
    let Some(next) = path.next().copied() else {
      return SegmentStatus::Finished;
    };
    let Some(graph) = self.graph.as_ref() else {
      return SegmentStatus::Unreachable {
        pruned: false,
        error: FindPathError::NoGraph,
      };
    };
    let reachable = match tracer {
      None => WalkabilityChecker::new(graph, &self.options)
        .can_traverse(position, next.position, area),
      Some(tracer) => {
        let options = NavigationOptions {
          trace_mode: TraceMode::Strict,
          ..self.options.clone()
        };
        WalkabilityChecker::new(graph, &options)
          .with_tracer(tracer)
          .can_traverse(position, next.position, area)
      }
    };
    if reachable {
      return SegmentStatus::Clear;
    }

    let start =
      path.last_reached().map_or(NodeId::Area(area), |from| from.node);
    let pruned = self.prune_edge(start, next.node);
    match self.find_path_between(start, path.goal()) {
      Ok(new_path) => {
        *path = new_path;
        SegmentStatus::Repathed { pruned }
      }
      Err(error) => SegmentStatus::Unreachable { pruned, error },
    }
  }

  /// Removes the edge from `from` to `to` in the current graph. Snapshots
  /// taken before the change keep the edge.
  pub fn prune_edge(&mut self, from: NodeId, to: NodeId) -> bool {
    self
      .graph
      .as_mut()
      .is_some_and(|graph| Arc::make_mut(graph).prune_edge(from, to))
  }
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod test;
