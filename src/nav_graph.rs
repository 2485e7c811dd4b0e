use std::{
  collections::{HashMap, HashSet},
  fmt,
  sync::Arc,
};

use disjoint::DisjointSet;
use glam::{Vec2, Vec3, Vec3Swizzles};
use ord_subset::OrdVar;
use thiserror::Error;
use tracing::warn;

use crate::{
  coords::{Corner, Direction},
  doors::build_doors,
  geometry::quad_height_at,
  mesh_file::{RawArea, RawConnection},
  spatial_index::SpatialIndex,
  util::Bounds,
  wall_corners::detect_wall_corners,
  NavigationOptions,
};

/// The id of an area in a navigation mesh.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct AreaId(pub u32);

impl fmt::Display for AreaId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Where a door sits on the boundary it crosses.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub enum DoorPosition {
  Left,
  Middle,
  Right,
}

impl DoorPosition {
  pub const ALL: [DoorPosition; 3] =
    [DoorPosition::Left, DoorPosition::Middle, DoorPosition::Right];

  fn tag(self) -> &'static str {
    match self {
      Self::Left => "left",
      Self::Middle => "middle",
      Self::Right => "right",
    }
  }
}

/// The id of a door. It only depends on the pair of areas the door lies
/// between and its position on their boundary, so rebuilding the doors of the
/// same mesh gives the same ids.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct DoorId {
  /// The smaller id of the two areas.
  pub low: AreaId,
  /// The larger id of the two areas.
  pub high: AreaId,
  pub position: DoorPosition,
}

impl DoorId {
  pub fn new(a: AreaId, b: AreaId, position: DoorPosition) -> Self {
    Self { low: a.min(b), high: a.max(b), position }
  }
}

impl fmt::Display for DoorId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}_{}_{}", self.low, self.high, self.position.tag())
  }
}

/// The id of any node in a [`NavigationGraph`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub enum NodeId {
  Area(AreaId),
  Door(DoorId),
}

impl NodeId {
  pub fn area(self) -> Option<AreaId> {
    match self {
      Self::Area(area) => Some(area),
      Self::Door(_) => None,
    }
  }
}

impl From<AreaId> for NodeId {
  fn from(area: AreaId) -> Self {
    Self::Area(area)
  }
}

impl From<DoorId> for NodeId {
  fn from(door: DoorId) -> Self {
    Self::Door(door)
  }
}

impl fmt::Display for NodeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Area(area) => write!(f, "area {}", area),
      Self::Door(door) => write!(f, "door {}", door),
    }
  }
}

/// The geometry of the doors between two areas, attached to the connections
/// that lead into those doors.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct DoorGeometry {
  /// The left door, if the boundary is wide enough for one.
  pub left: Option<Vec3>,
  pub middle: Vec3,
  /// The right door, if the boundary is wide enough for one.
  pub right: Option<Vec3>,
  /// Whether crossing the boundary needs a jump.
  pub need_jump: bool,
  /// The area whose edge the doors lie on.
  pub owner: AreaId,
}

/// An edge of the navigation graph.
#[derive(Clone, PartialEq, Debug)]
pub struct Connection {
  /// The node this connection leads to.
  pub target: NodeId,
  /// The cost multiplier of this connection. The cost of taking the
  /// connection is this multiplied by the distance between the two nodes.
  pub cost: f32,
  /// The doors this connection leads through, if it leads into a door.
  pub door: Option<DoorGeometry>,
}

impl Connection {
  pub fn new(target: NodeId, cost: f32) -> Self {
    Self { target, cost, door: None }
  }
}

/// The geometry of an area node.
#[derive(Clone, PartialEq, Debug)]
pub struct AreaShape {
  /// The corners of the area, indexed by [`Corner::index`].
  pub corners: [Vec3; 4],
  /// The horizontal bounds of the corners.
  pub bounds: Bounds,
  /// The corners that no neighbouring area touches, sorted.
  pub wall_corners: Vec<Corner>,
}

impl AreaShape {
  pub fn corner(&self, corner: Corner) -> Vec3 {
    self.corners[corner.index()]
  }

  /// The two corners of the edge on the `direction` side, ordered by
  /// increasing coordinate along the edge.
  pub fn edge(&self, direction: Direction) -> (Vec3, Vec3) {
    let (first, second) = direction.facing_corners();
    (self.corner(first), self.corner(second))
  }

  /// The interpolated ground height at `point`.
  pub fn height_at(&self, point: Vec2) -> f32 {
    quad_height_at(&self.corners, point)
  }

  pub fn is_wall_corner(&self, corner: Corner) -> bool {
    self.wall_corners.binary_search(&corner).is_ok()
  }
}

/// What a door node connects.
#[derive(Clone, PartialEq, Debug)]
pub struct DoorInfo {
  /// The area whose edge the door lies on.
  pub owner: AreaId,
  /// The area the door was created from.
  pub source: AreaId,
  /// The area the door leads into.
  pub target: AreaId,
  /// The side of `source` the door lies on.
  pub side: Direction,
  /// Whether the door can also be taken from `target` back to `source`.
  pub bidirectional: bool,
  pub need_jump: bool,
}

impl DoorInfo {
  /// The side of `area` the door lies on, if the door touches `area`.
  pub fn side_of(&self, area: AreaId) -> Option<Direction> {
    if area == self.source {
      Some(self.side)
    } else if area == self.target {
      Some(self.side.opposite())
    } else {
      None
    }
  }
}

#[derive(Clone, PartialEq, Debug)]
pub enum NodeKind {
  Area(AreaShape),
  Door(DoorInfo),
}

/// A node of the navigation graph: either an area or a door.
#[derive(Clone, PartialEq, Debug)]
pub struct Node {
  pub id: NodeId,
  /// The center of an area, or the point of a door.
  pub position: Vec3,
  /// The connections leaving this node, indexed by [`Direction::index`].
  pub connections: [Vec<Connection>; 4],
  pub kind: NodeKind,
}

impl Node {
  pub fn area_shape(&self) -> Option<&AreaShape> {
    match &self.kind {
      NodeKind::Area(shape) => Some(shape),
      NodeKind::Door(_) => None,
    }
  }

  pub fn door_info(&self) -> Option<&DoorInfo> {
    match &self.kind {
      NodeKind::Area(_) => None,
      NodeKind::Door(info) => Some(info),
    }
  }

  pub fn is_door(&self) -> bool {
    matches!(self.kind, NodeKind::Door(_))
  }

  /// Iterates over every connection along with the side it leaves through.
  pub fn all_connections(
    &self,
  ) -> impl Iterator<Item = (Direction, &Connection)> + '_ {
    Direction::ALL.into_iter().flat_map(move |direction| {
      self.connections[direction.index()]
        .iter()
        .map(move |connection| (direction, connection))
    })
  }

  pub fn connects_to(&self, target: NodeId) -> bool {
    self.all_connections().any(|(_, connection)| connection.target == target)
  }
}

/// An error while building a navigation graph.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
  #[error("invalid graph: {0}")]
  InvalidGraph(String),
  #[error("area {0} appears more than once")]
  DuplicateArea(AreaId),
  #[error("area {0} has a non-finite corner")]
  NonFiniteArea(AreaId),
}

/// The full navigation graph of a map: areas, doors, and the lookups built
/// over them.
#[derive(Clone)]
pub struct NavigationGraph {
  nodes: HashMap<NodeId, Node>,
  /// The ids of all areas, sorted.
  area_ids: Vec<AreaId>,
  spatial_index: Arc<SpatialIndex>,
  /// The weakly connected region of each node. Pruning edges never merges
  /// regions, so this only needs to be computed once.
  regions: HashMap<NodeId, usize>,
  /// The smallest cost multiplier of any connection, capped to 1.
  min_cost: f32,
  door_count: usize,
}

impl fmt::Debug for NavigationGraph {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("NavigationGraph")
      .field("areas", &self.area_ids.len())
      .field("doors", &self.door_count)
      .field("min_cost", &self.min_cost)
      .finish()
  }
}

impl NavigationGraph {
  /// Builds the navigation graph from the areas of a mesh. This converts and
  /// normalizes the connections, indexes the area centers, detects wall
  /// corners, and finally builds the doors.
  pub fn build(
    areas: Vec<RawArea>,
    options: &NavigationOptions,
  ) -> Result<Self, GraphError> {
    let mut nodes = nodes_from_raw(areas)?;
    normalize_nodes(&mut nodes)?;
    let spatial_index = SpatialIndex::build(area_centers(&nodes));
    detect_wall_corners(&mut nodes, options.door_wall_clearance);
    build_doors(&mut nodes, options);
    Ok(Self::assemble(nodes, spatial_index))
  }

  /// Creates the graph lookups for fully built `nodes`.
  pub(crate) fn assemble(
    nodes: HashMap<NodeId, Node>,
    spatial_index: SpatialIndex,
  ) -> Self {
    let mut area_ids =
      nodes.keys().filter_map(|node_id| node_id.area()).collect::<Vec<_>>();
    area_ids.sort();

    let mut node_ids = nodes.keys().copied().collect::<Vec<_>>();
    node_ids.sort();
    let node_to_index = node_ids
      .iter()
      .enumerate()
      .map(|(index, &node_id)| (node_id, index))
      .collect::<HashMap<_, _>>();

    let mut region_sets = DisjointSet::with_len(node_ids.len());
    let mut min_cost = 1.0f32;
    for (node_id, node) in nodes.iter() {
      let node_index = node_to_index[node_id];
      for (_, connection) in node.all_connections() {
        min_cost = min_cost.min(connection.cost);
        if let Some(&target_index) = node_to_index.get(&connection.target) {
          region_sets.join(node_index, target_index);
        }
      }
    }
    let regions = node_ids
      .iter()
      .enumerate()
      .map(|(index, &node_id)| (node_id, region_sets.root_of(index)))
      .collect();

    let door_count = nodes.values().filter(|node| node.is_door()).count();
    Self {
      nodes,
      area_ids,
      spatial_index: Arc::new(spatial_index),
      regions,
      min_cost,
      door_count,
    }
  }

  pub fn node(&self, node_id: NodeId) -> Option<&Node> {
    self.nodes.get(&node_id)
  }

  pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
    self.nodes.values()
  }

  /// The shape of `area`. Returns `None` if there is no such area.
  pub fn area(&self, area: AreaId) -> Option<&AreaShape> {
    self.nodes.get(&NodeId::Area(area)).and_then(Node::area_shape)
  }

  /// The ids of all areas, sorted.
  pub fn area_ids(&self) -> &[AreaId] {
    &self.area_ids
  }

  pub fn area_count(&self) -> usize {
    self.area_ids.len()
  }

  pub fn door_count(&self) -> usize {
    self.door_count
  }

  /// The smallest cost multiplier in the graph (never more than 1).
  pub fn min_cost(&self) -> f32 {
    self.min_cost
  }

  pub fn spatial_index(&self) -> &SpatialIndex {
    &self.spatial_index
  }

  /// The first connection from `from` to `to`.
  pub fn edge(&self, from: NodeId, to: NodeId) -> Option<&Connection> {
    self.nodes.get(&from).and_then(|node| {
      node
        .all_connections()
        .map(|(_, connection)| connection)
        .find(|connection| connection.target == to)
    })
  }

  /// The interpolated ground height of `area` at `point`.
  pub fn ground_height(&self, area: AreaId, point: Vec2) -> Option<f32> {
    self.area(area).map(|shape| shape.height_at(point))
  }

  /// The area whose center is nearest to `point`.
  pub fn nearest_area(&self, point: Vec3) -> Option<AreaId> {
    self.spatial_index.find_nearest(point).map(|(area, _)| area)
  }

  /// Finds the area containing `point`. Every area whose bounds contain the
  /// point (with `tolerance` of slack) is a candidate, and the one whose
  /// ground is vertically closest to the point wins. If no area contains the
  /// point, the area with the nearest center is used instead.
  pub fn area_at(&self, point: Vec3, tolerance: f32) -> Option<AreaId> {
    self
      .area_ids
      .iter()
      .filter_map(|&area| {
        let shape = self.area(area)?;
        if !shape.bounds.contains_point(point.xy(), tolerance) {
          return None;
        }
        let height = shape.height_at(shape.bounds.clamp_point(point.xy()));
        Some((area, (height - point.z).abs()))
      })
      .min_by_key(|&(_, vertical_distance)| {
        OrdVar::new_unchecked(vertical_distance)
      })
      .map(|(area, _)| area)
      .or_else(|| self.nearest_area(point))
  }

  /// Determines whether a path could exist between `a` and `b`. Returns true
  /// if the nodes are in the same weakly connected region. A true result does
  /// not guarantee a path, but a false result rules one out.
  pub fn are_connected(&self, a: NodeId, b: NodeId) -> bool {
    match (self.regions.get(&a), self.regions.get(&b)) {
      (Some(region_a), Some(region_b)) => region_a == region_b,
      _ => false,
    }
  }

  /// Removes every connection from `from` to `to`. Returns whether any
  /// connection was removed.
  pub fn prune_edge(&mut self, from: NodeId, to: NodeId) -> bool {
    let Some(node) = self.nodes.get_mut(&from) else {
      return false;
    };
    let mut removed = false;
    for connections in node.connections.iter_mut() {
      let before = connections.len();
      connections.retain(|connection| connection.target != to);
      removed |= connections.len() != before;
    }
    if removed {
      warn!(%from, %to, "pruned navigation edge");
    }
    removed
  }
}

/// The center of every area node.
pub(crate) fn area_centers(
  nodes: &HashMap<NodeId, Node>,
) -> impl Iterator<Item = (AreaId, Vec3)> + '_ {
  nodes
    .values()
    .filter_map(|node| node.id.area().map(|area| (area, node.position)))
}

fn center_of(corners: &[Vec3; 4]) -> Vec3 {
  corners.iter().copied().sum::<Vec3>() / corners.len() as f32
}

/// Converts the raw areas of a mesh into area nodes. Every connection becomes
/// the enriched form, taking a cost of 1 where none is given. Connections to
/// unknown areas or to the area itself are dropped.
pub(crate) fn nodes_from_raw(
  areas: Vec<RawArea>,
) -> Result<HashMap<NodeId, Node>, GraphError> {
  if areas.is_empty() {
    return Err(GraphError::InvalidGraph("the mesh contains no areas".into()));
  }

  let mut known_areas = HashSet::with_capacity(areas.len());
  for area in areas.iter() {
    if !known_areas.insert(area.id) {
      return Err(GraphError::DuplicateArea(area.id));
    }
    if !area.corners.iter().all(|corner| corner.is_finite()) {
      return Err(GraphError::NonFiniteArea(area.id));
    }
  }

  let mut nodes = HashMap::with_capacity(areas.len());
  for area in areas {
    let node_id = NodeId::Area(area.id);
    let mut connections: [Vec<Connection>; 4] = Default::default();
    for direction in Direction::ALL {
      for raw in area.connections[direction.index()].iter() {
        let target = raw.target();
        if target == area.id {
          warn!(area = %area.id, "dropped a connection from an area to itself");
          continue;
        }
        if !known_areas.contains(&target) {
          warn!(
            area = %area.id,
            %target,
            "dropped a connection to an unknown area"
          );
          continue;
        }
        let cost = match *raw {
          RawConnection::Plain(_) => 1.0,
          RawConnection::Enriched { cost, .. } => cost,
        };
        connections[direction.index()]
          .push(Connection::new(NodeId::Area(target), cost));
      }
    }

    let bounds = corner_bounds(&area.corners);
    nodes.insert(
      node_id,
      Node {
        id: node_id,
        position: center_of(&area.corners),
        connections,
        kind: NodeKind::Area(AreaShape {
          corners: area.corners,
          bounds,
          wall_corners: Vec::new(),
        }),
      },
    );
  }
  Ok(nodes)
}

fn corner_bounds(corners: &[Vec3; 4]) -> Bounds {
  Bounds::from_points(corners.iter().map(|corner| corner.xy()))
    .expect("an area always has four corners")
}

/// Brings every node into its canonical form: the bounds and center of each
/// area match its corners, and every connection has a positive, finite cost.
/// Running this on normalized nodes changes nothing.
pub(crate) fn normalize_nodes(
  nodes: &mut HashMap<NodeId, Node>,
) -> Result<(), GraphError> {
  for (&node_id, node) in nodes.iter_mut() {
    if node.id != node_id {
      return Err(GraphError::InvalidGraph(format!(
        "{} is stored under the id of {}",
        node.id, node_id
      )));
    }
    if let NodeKind::Area(shape) = &mut node.kind {
      shape.bounds = corner_bounds(&shape.corners);
      node.position = center_of(&shape.corners);
    }
    for connections in node.connections.iter_mut() {
      for connection in connections.iter_mut() {
        if !connection.cost.is_finite() || connection.cost <= 0.0 {
          connection.cost = 1.0;
        }
      }
    }
  }
  Ok(())
}

#[cfg(test)]
#[path = "nav_graph_test.rs"]
mod test;
