use std::collections::{HashMap, HashSet};

use glam::{Vec3, Vec3Swizzles};
use tracing::debug;

use crate::{
  coords::{Axis, Direction},
  nav_graph::{
    AreaId, AreaShape, Connection, DoorGeometry, DoorId, DoorInfo,
    DoorPosition, Node, NodeId, NodeKind,
  },
  NavigationOptions,
};

/// The doors placed on the boundary between two areas.
#[derive(Clone, PartialEq, Debug)]
pub(crate) struct BoundaryDoors {
  pub(crate) geometry: DoorGeometry,
  /// The doors, in increasing order along the boundary.
  pub(crate) points: Vec<(DoorPosition, Vec3)>,
}

/// A straight edge of an area along with the axis it runs along.
#[derive(Clone, Copy)]
struct Edge {
  start: Vec3,
  end: Vec3,
  axis: Axis,
}

impl Edge {
  fn new((start, end): (Vec3, Vec3), axis: Axis) -> Self {
    Self { start, end, axis }
  }

  /// The extent of the edge along its axis.
  fn range(&self) -> (f32, f32) {
    let start = self.axis.of(self.start.xy());
    let end = self.axis.of(self.end.xy());
    (start.min(end), start.max(end))
  }

  fn top(&self) -> f32 {
    self.start.z.max(self.end.z)
  }

  /// The point on the edge line at `coordinate` along the axis. All three
  /// coordinates are interpolated so sloped edges stay sloped.
  fn point_at(&self, coordinate: f32) -> Vec3 {
    let start = self.axis.of(self.start.xy());
    let length = self.axis.of(self.end.xy()) - start;
    let t = if length.abs() <= f32::EPSILON {
      0.5
    } else {
      ((coordinate - start) / length).clamp(0.0, 1.0)
    };
    self.start.lerp(self.end, t)
  }
}

/// Places the doors on the `side` boundary of `source` that leads into
/// `target`. Returns `None` if the two edges do not overlap, or if the areas
/// are further apart than the boundary tolerance allows.
pub(crate) fn place_doors(
  (source, source_shape): (AreaId, &AreaShape),
  (target, target_shape): (AreaId, &AreaShape),
  side: Direction,
  options: &NavigationOptions,
) -> Option<BoundaryDoors> {
  let axis = side.edge_axis();
  let source_edge = Edge::new(source_shape.edge(side), axis);
  let target_edge = Edge::new(target_shape.edge(side.opposite()), axis);

  let (source_min, source_max) = source_edge.range();
  let (target_min, target_max) = target_edge.range();
  let low = source_min.max(target_min);
  let high = source_max.min(target_max);
  if !(high >= low) {
    return None;
  }

  // The door sits on the higher of the two edges.
  let source_owns = match source_edge.top().partial_cmp(&target_edge.top()) {
    Some(std::cmp::Ordering::Greater) => true,
    Some(std::cmp::Ordering::Less) => false,
    _ => source > target,
  };
  let (owner, owner_edge, other_edge) = if source_owns {
    (source, source_edge, target_edge)
  } else {
    (target, target_edge, source_edge)
  };

  // Doors must lie within both areas, give or take the boundary tolerance.
  let tolerance = options.boundary_tolerance;
  let shared = source_shape
    .bounds
    .expand_by(tolerance)
    .intersection(&target_shape.bounds.expand_by(tolerance))?;
  let door_point = |coordinate: f32| {
    let point = owner_edge.point_at(coordinate);
    shared.clamp_point(point.xy()).extend(point.z)
  };

  let (points, middle) = if high - low < options.min_door_clearance {
    // Too narrow for a hull: a single door in the middle of the smaller edge.
    let (smaller_min, smaller_max) =
      if source_max - source_min <= target_max - target_min {
        (source_min, source_max)
      } else {
        (target_min, target_max)
      };
    let middle = ((smaller_min + smaller_max) * 0.5).clamp(low, high);
    (vec![(DoorPosition::Middle, middle)], middle)
  } else {
    let mut left = low;
    let mut right = high;
    let clearance = options.door_wall_clearance;
    let left_point = owner_edge.point_at(left).xy();
    let right_point = owner_edge.point_at(right).xy();
    for shape in [source_shape, target_shape] {
      for &corner in shape.wall_corners.iter() {
        let wall = shape.corner(corner).xy();
        let coordinate = axis.of(wall);
        if wall.distance(left_point) <= clearance {
          left = left.max(coordinate + clearance);
        }
        if wall.distance(right_point) <= clearance {
          right = right.min(coordinate - clearance);
        }
      }
    }

    let middle = ((left + right) * 0.5).clamp(low, high);
    if right - left < 2.0 * options.min_door_clearance {
      (vec![(DoorPosition::Middle, middle)], middle)
    } else {
      (
        vec![
          (DoorPosition::Left, left),
          (DoorPosition::Middle, middle),
          (DoorPosition::Right, right),
        ],
        middle,
      )
    }
  };

  let need_jump = (owner_edge.point_at(middle).z
    - other_edge.point_at(middle).z)
    .abs()
    > options.step_height;

  let points = points
    .into_iter()
    .map(|(position, coordinate)| (position, door_point(coordinate)))
    .collect::<Vec<_>>();
  let point_of = |wanted: DoorPosition| {
    points
      .iter()
      .find(|&&(position, _)| position == wanted)
      .map(|&(_, point)| point)
  };
  let geometry = DoorGeometry {
    left: point_of(DoorPosition::Left),
    middle: door_point(middle),
    right: point_of(DoorPosition::Right),
    need_jump,
    owner,
  };
  Some(BoundaryDoors { geometry, points })
}

/// A pair of connected areas that doors are built for.
struct DoorPair {
  source: AreaId,
  target: AreaId,
  side: Direction,
  doors: BoundaryDoors,
}

/// The cost of the first connection from `from` to the area `to`.
fn area_connection_cost(node: &Node, to: AreaId) -> Option<f32> {
  node
    .all_connections()
    .find(|(_, connection)| connection.target == NodeId::Area(to))
    .map(|(_, connection)| connection.cost)
}

fn area_shape(
  nodes: &HashMap<NodeId, Node>,
  area: AreaId,
) -> Option<&AreaShape> {
  nodes.get(&NodeId::Area(area)).and_then(Node::area_shape)
}

/// Builds the doors between every pair of connected areas in `nodes` and
/// rewires the area connections to pass through them. Area pairs whose
/// boundary is unusable keep their direct connection. Returns the number of
/// doors created.
pub(crate) fn build_doors(
  nodes: &mut HashMap<NodeId, Node>,
  options: &NavigationOptions,
) -> usize {
  let mut area_ids =
    nodes.keys().filter_map(|node_id| node_id.area()).collect::<Vec<_>>();
  area_ids.sort();

  let mut seen_pairs = HashSet::new();
  let mut pairs = Vec::new();
  for &source in area_ids.iter() {
    let source_node = &nodes[&NodeId::Area(source)];
    let Some(source_shape) = source_node.area_shape() else {
      continue;
    };
    for (side, connection) in source_node.all_connections() {
      let Some(target) = connection.target.area() else {
        continue;
      };
      if !seen_pairs.insert((source.min(target), source.max(target))) {
        continue;
      }
      let Some(target_shape) = area_shape(nodes, target) else {
        continue;
      };
      match place_doors(
        (source, source_shape),
        (target, target_shape),
        side,
        options,
      ) {
        None => {
          debug!(
            %source,
            %target,
            ?side,
            "skipped doors for non-overlapping areas"
          );
        }
        Some(doors) => pairs.push(DoorPair { source, target, side, doors }),
      }
    }
  }

  // Create the door nodes.
  let mut door_count = 0;
  let mut pair_doors = HashMap::new();
  for pair in pairs.iter() {
    let source_node = &nodes[&NodeId::Area(pair.source)];
    let target_node = &nodes[&NodeId::Area(pair.target)];
    let forward_cost =
      area_connection_cost(source_node, pair.target).unwrap_or(1.0);
    let reverse_cost = area_connection_cost(target_node, pair.source);
    let bidirectional = reverse_cost.is_some();

    let mut door_ids = Vec::with_capacity(pair.doors.points.len());
    for &(position, point) in pair.doors.points.iter() {
      let door_id = DoorId::new(pair.source, pair.target, position);
      let mut connections: [Vec<Connection>; 4] = Default::default();
      connections[pair.side.index()]
        .push(Connection::new(NodeId::Area(pair.target), forward_cost));
      if let Some(reverse_cost) = reverse_cost {
        connections[pair.side.opposite().index()]
          .push(Connection::new(NodeId::Area(pair.source), reverse_cost));
      }
      door_ids.push(door_id);
      nodes.insert(
        NodeId::Door(door_id),
        Node {
          id: NodeId::Door(door_id),
          position: point,
          connections,
          kind: NodeKind::Door(DoorInfo {
            owner: pair.doors.geometry.owner,
            source: pair.source,
            target: pair.target,
            side: pair.side,
            bidirectional,
            need_jump: pair.doors.geometry.need_jump,
          }),
        },
      );
      door_count += 1;
    }
    pair_doors.insert(
      (pair.source.min(pair.target), pair.source.max(pair.target)),
      (door_ids, pair.doors.geometry),
    );
  }

  // Route the area connections through the doors.
  for &area in area_ids.iter() {
    let Some(node) = nodes.get_mut(&NodeId::Area(area)) else {
      continue;
    };
    for connections in node.connections.iter_mut() {
      let mut rewired = Vec::with_capacity(connections.len());
      for connection in connections.drain(..) {
        let doors = connection
          .target
          .area()
          .and_then(|target| {
            pair_doors.get(&(area.min(target), area.max(target)))
          });
        match doors {
          None => rewired.push(connection),
          Some((door_ids, geometry)) => {
            rewired.extend(door_ids.iter().map(|&door_id| Connection {
              target: NodeId::Door(door_id),
              cost: connection.cost,
              door: Some(*geometry),
            }))
          }
        }
      }
      *connections = rewired;
    }
  }

  connect_doors_within_areas(nodes, &area_ids);
  door_count
}

/// Connects the bidirectional doors of each area that lie on different sides
/// of it, so paths can cross an area without visiting its center.
fn connect_doors_within_areas(
  nodes: &mut HashMap<NodeId, Node>,
  area_ids: &[AreaId],
) {
  let mut doors_by_area = HashMap::<AreaId, Vec<(DoorId, Direction)>>::new();
  for node in nodes.values() {
    let (NodeId::Door(door_id), Some(info)) = (node.id, node.door_info())
    else {
      continue;
    };
    if !info.bidirectional {
      continue;
    }
    for area in [info.source, info.target] {
      if let Some(side) = info.side_of(area) {
        doors_by_area.entry(area).or_default().push((door_id, side));
      }
    }
  }

  let mut new_connections = Vec::new();
  for area in area_ids.iter() {
    let Some(doors) = doors_by_area.get_mut(area) else {
      continue;
    };
    doors.sort();
    let area_node = &nodes[&NodeId::Area(*area)];
    for &(from, from_side) in doors.iter() {
      for &(to, to_side) in doors.iter() {
        if from_side == to_side {
          continue;
        }
        let from_node = &nodes[&NodeId::Door(from)];
        let to_node = &nodes[&NodeId::Door(to)];
        let Some(cost_in) = area_connection_cost(from_node, *area) else {
          continue;
        };
        let Some(cost_out) = area_node
          .all_connections()
          .find(|(_, connection)| connection.target == NodeId::Door(to))
          .map(|(_, connection)| connection.cost)
        else {
          continue;
        };
        let slot = Direction::from_vector(
          to_node.position.xy() - from_node.position.xy(),
        );
        new_connections.push((
          from,
          slot,
          Connection::new(NodeId::Door(to), cost_in.max(cost_out)),
        ));
      }
    }
  }

  for (from, slot, connection) in new_connections {
    if let Some(node) = nodes.get_mut(&NodeId::Door(from)) {
      node.connections[slot.index()].push(connection);
    }
  }
}

#[cfg(test)]
#[path = "doors_test.rs"]
mod test;
