use std::collections::HashMap;

use glam::Vec3Swizzles;

use crate::{
  coords::{Corner, Direction},
  geometry::distance_to_segment_2d,
  nav_graph::{AreaShape, Node, NodeId, NodeKind},
};

/// Counts the neighbours of `shape` on its `direction` side whose facing edge
/// passes within `clearance` of `corner`.
fn corner_score(
  nodes: &HashMap<NodeId, Node>,
  node: &Node,
  shape: &AreaShape,
  corner: Corner,
  direction: Direction,
  clearance: f32,
) -> usize {
  let point = shape.corner(corner).xy();
  node.connections[direction.index()]
    .iter()
    .filter_map(|connection| {
      nodes.get(&connection.target).and_then(Node::area_shape)
    })
    .filter(|neighbour| {
      let (start, end) = neighbour.edge(direction.opposite());
      distance_to_segment_2d(point, (start.xy(), end.xy())) <= clearance
    })
    .count()
}

/// Finds the wall corners of an area. A corner is a wall corner when no
/// neighbouring area, on either of the two sides meeting at it, has an edge
/// within `clearance` of it.
pub(crate) fn find_wall_corners(
  nodes: &HashMap<NodeId, Node>,
  node: &Node,
  clearance: f32,
) -> Vec<Corner> {
  let Some(shape) = node.area_shape() else {
    return Vec::new();
  };
  Corner::ALL
    .into_iter()
    .filter(|&corner| {
      let score = corner
        .facing()
        .into_iter()
        .map(|direction| {
          corner_score(nodes, node, shape, corner, direction, clearance)
        })
        .sum::<usize>();
      score == 0
    })
    .collect()
}

/// Records the wall corners of every area in `nodes`.
pub(crate) fn detect_wall_corners(
  nodes: &mut HashMap<NodeId, Node>,
  clearance: f32,
) {
  let wall_corners = nodes
    .values()
    .filter(|node| !node.is_door())
    .map(|node| (node.id, find_wall_corners(nodes, node, clearance)))
    .collect::<Vec<_>>();

  for (node_id, corners) in wall_corners {
    if let Some(NodeKind::Area(shape)) =
      nodes.get_mut(&node_id).map(|node| &mut node.kind)
    {
      shape.wall_corners = corners;
    }
  }
}

#[cfg(test)]
#[path = "wall_corners_test.rs"]
mod test;
