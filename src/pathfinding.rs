use glam::Vec3;
use thiserror::Error;
use tracing::warn;

use crate::{
  astar::{self, AStarProblem},
  nav_graph::{NavigationGraph, NodeId},
  path::{Path, Waypoint},
};

/// Why a path could not be found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FindPathError {
  #[error("{0} is not in the navigation graph")]
  UnknownNode(NodeId),
  #[error("no navigation graph is loaded")]
  NoGraph,
  #[error("no path exists between the nodes")]
  NoPathFound,
}

/// A search over the nodes of a [`NavigationGraph`]. Both the states and the
/// actions are node ids: the action of an edge is the node it leads to.
struct NavigationPathProblem<'a> {
  graph: &'a NavigationGraph,
  start: NodeId,
  goal: NodeId,
  goal_position: Vec3,
}

impl NavigationPathProblem<'_> {
  fn position(&self, node_id: &NodeId) -> Option<Vec3> {
    self.graph.node(*node_id).map(|node| node.position)
  }
}

impl AStarProblem for NavigationPathProblem<'_> {
  type ActionType = NodeId;

  type StateType = NodeId;

  fn initial_state(&self) -> Self::StateType {
    self.start
  }

  fn successors(
    &self,
    state: &Self::StateType,
  ) -> Vec<(f32, Self::ActionType, Self::StateType)> {
    let Some(node) = self.graph.node(*state) else {
      return vec![];
    };
    node
      .all_connections()
      .filter_map(|(_, connection)| {
        let target_position = self.position(&connection.target)?;
        let cost = connection.cost * node.position.distance(target_position);
        Some((cost, connection.target, connection.target))
      })
      .collect()
  }

  fn heuristic(&self, state: &Self::StateType) -> f32 {
    // No edge costs less than its length times the smallest multiplier.
    self.position(state).map_or(0.0, |position| {
      position.distance(self.goal_position) * self.graph.min_cost()
    })
  }

  fn is_goal_state(&self, state: &Self::StateType) -> bool {
    *state == self.goal
  }
}

/// Finds the cheapest path from `start` to `goal` in `graph`, exploring at
/// most `max_explored_nodes` nodes. The returned path starts with `start`.
pub fn find_path(
  graph: &NavigationGraph,
  start: NodeId,
  goal: NodeId,
  max_explored_nodes: u32,
) -> Result<Path, FindPathError> {
  if graph.node(start).is_none() {
    return Err(FindPathError::UnknownNode(start));
  }
  let goal_position = graph
    .node(goal)
    .map(|node| node.position)
    .ok_or(FindPathError::UnknownNode(goal))?;
  if !graph.are_connected(start, goal) {
    return Err(FindPathError::NoPathFound);
  }

  let problem = NavigationPathProblem { graph, start, goal, goal_position };
  let result = match astar::find_path(&problem, max_explored_nodes) {
    Ok(result) => result,
    Err(stats) => {
      if stats.reached_limit {
        warn!(
          %start,
          %goal,
          explored_nodes = stats.explored_nodes,
          "path search reached its exploration limit"
        );
      }
      return Err(FindPathError::NoPathFound);
    }
  };

  let mut nodes = Vec::with_capacity(result.path.len() + 1);
  nodes.push(start);
  nodes.extend(result.path);
  elide_interior_areas(graph, &mut nodes);

  let total_cost = path_cost(graph, &nodes);
  let waypoints = nodes
    .into_iter()
    .filter_map(|node_id| {
      graph
        .node(node_id)
        .map(|node| Waypoint { node: node_id, position: node.position })
    })
    .collect();
  Path::new(waypoints, total_cost).ok_or(FindPathError::NoPathFound)
}

/// Removes areas that are only passed through between two of their own
/// doors, when the doors are also connected directly for no more cost. The
/// doors already mark where the agent crosses in and out of the area.
fn elide_interior_areas(graph: &NavigationGraph, nodes: &mut Vec<NodeId>) {
  let mut index = 1;
  while index + 1 < nodes.len() {
    let (before, current, after) =
      (nodes[index - 1], nodes[index], nodes[index + 1]);
    let is_interior = match current {
      NodeId::Area(area) => [before, after].into_iter().all(|door| {
        graph
          .node(door)
          .and_then(|node| node.door_info())
          .is_some_and(|info| info.side_of(area).is_some())
      }),
      NodeId::Door(_) => false,
    };
    let shortcut_is_no_worse = || {
      let direct = edge_cost(graph, before, after)?;
      let through =
        edge_cost(graph, before, current)? + edge_cost(graph, current, after)?;
      Some(direct <= through + 1e-4)
    };
    if is_interior && shortcut_is_no_worse() == Some(true) {
      nodes.remove(index);
    } else {
      index += 1;
    }
  }
}

/// The cost of the edge from `from` to `to`.
fn edge_cost(graph: &NavigationGraph, from: NodeId, to: NodeId) -> Option<f32> {
  let connection = graph.edge(from, to)?;
  let from = graph.node(from)?.position;
  let to = graph.node(to)?.position;
  Some(connection.cost * from.distance(to))
}

/// The cost of following `nodes` through the edges of `graph`.
fn path_cost(graph: &NavigationGraph, nodes: &[NodeId]) -> f32 {
  nodes.windows(2).filter_map(|pair| edge_cost(graph, pair[0], pair[1])).sum()
}

#[cfg(test)]
#[path = "pathfinding_test.rs"]
mod test;
