use glam::{Vec2, Vec3};
use googletest::{expect_eq, expect_that, matchers::*, verify_eq, verify_that};

use super::{
  nodes_from_raw, normalize_nodes, AreaId, DoorId, DoorPosition, GraphError,
  NavigationGraph, NodeId, NodeKind,
};
use crate::{
  coords::{Corner, Direction},
  mesh_file::{RawArea, RawConnection},
  NavigationOptions,
};

fn area(id: u32, min: (f32, f32), max: (f32, f32), z: f32) -> RawArea {
  RawArea::from_extents(
    AreaId(id),
    Vec3::new(min.0, min.1, z),
    Vec3::new(max.0, max.1, z),
  )
}

fn build(areas: Vec<RawArea>) -> Result<NavigationGraph, GraphError> {
  NavigationGraph::build(areas, &NavigationOptions::default())
}

/// An area rising from z = 0 on its north edge to z = 100 on its south edge.
fn ramp(id: u32) -> RawArea {
  RawArea::from_extents(
    AreaId(id),
    Vec3::new(0.0, 0.0, 0.0),
    Vec3::new(100.0, 100.0, 100.0),
  )
}

#[googletest::test]
fn rejects_bad_meshes() {
  assert!(matches!(build(vec![]), Err(GraphError::InvalidGraph(_))));
  expect_eq!(
    build(vec![
      area(1, (0.0, 0.0), (10.0, 10.0), 0.0),
      area(1, (10.0, 0.0), (20.0, 10.0), 0.0),
    ])
    .err(),
    Some(GraphError::DuplicateArea(AreaId(1)))
  );
  expect_eq!(
    build(vec![area(3, (0.0, 0.0), (f32::NAN, 10.0), 0.0)]).err(),
    Some(GraphError::NonFiniteArea(AreaId(3)))
  );
}

#[googletest::test]
fn drops_dangling_and_self_connections() {
  let graph = build(vec![area(1, (0.0, 0.0), (100.0, 100.0), 0.0)
    .with_connection(Direction::East, RawConnection::Plain(AreaId(9)))
    .with_connection(Direction::West, RawConnection::Plain(AreaId(1)))])
  .expect("the area is valid");

  let node = graph.node(NodeId::Area(AreaId(1))).expect("area exists");
  expect_eq!(node.all_connections().count(), 0);
  expect_eq!(graph.door_count(), 0);
}

#[googletest::test]
fn plain_connections_cost_one() {
  let nodes = nodes_from_raw(vec![
    area(1, (0.0, 0.0), (100.0, 100.0), 0.0)
      .with_connection(Direction::East, RawConnection::Plain(AreaId(2))),
    area(2, (100.0, 0.0), (200.0, 100.0), 0.0).with_connection(
      Direction::West,
      RawConnection::Enriched { target: AreaId(1), cost: 2.5 },
    ),
  ])
  .expect("areas are valid");

  let east = &nodes[&NodeId::Area(AreaId(1))].connections
    [Direction::East.index()];
  expect_eq!(east.len(), 1);
  expect_eq!(east[0].target, NodeId::Area(AreaId(2)));
  expect_eq!(east[0].cost, 1.0);

  let west = &nodes[&NodeId::Area(AreaId(2))].connections
    [Direction::West.index()];
  expect_eq!(west[0].cost, 2.5);
}

#[googletest::test]
fn normalization_is_idempotent() {
  let mut nodes = nodes_from_raw(vec![
    ramp(1).with_corner_heights(20.0, 80.0).with_connection(
      Direction::East,
      RawConnection::Enriched { target: AreaId(2), cost: -3.0 },
    ),
    area(2, (100.0, 0.0), (200.0, 100.0), 0.0).with_connection(
      Direction::West,
      RawConnection::Enriched { target: AreaId(1), cost: f32::NAN },
    ),
  ])
  .expect("areas are valid");

  // Break the derived values so normalization has something to fix.
  for node in nodes.values_mut() {
    if let NodeKind::Area(shape) = &mut node.kind {
      shape.bounds.max = Vec2::ZERO;
    }
    node.position = Vec3::ZERO;
  }

  normalize_nodes(&mut nodes).expect("nodes are valid");
  let once = nodes.clone();
  normalize_nodes(&mut nodes).expect("nodes are valid");
  expect_eq!(nodes, once);

  for node in nodes.values() {
    for (_, connection) in node.all_connections() {
      expect_eq!(connection.cost, 1.0);
    }
  }
  let ramp_node = &nodes[&NodeId::Area(AreaId(1))];
  expect_that!(
    ramp_node.position.distance(Vec3::new(50.0, 50.0, 50.0)),
    lt(1e-3)
  );
}

#[googletest::test]
fn bounds_contain_every_corner() {
  let graph = build(vec![
    ramp(1).with_corner_heights(30.0, 70.0),
    area(2, (-50.0, 200.0), (25.0, 260.0), -10.0),
  ])
  .expect("areas are valid");

  for &area in graph.area_ids() {
    let shape = graph.area(area).expect("area exists");
    for corner in Corner::ALL {
      let point = shape.corner(corner);
      expect_that!(
        shape.bounds.contains_point(point.truncate(), 0.0),
        eq(true)
      );
    }
  }
  let shape = graph.area(AreaId(2)).expect("area exists");
  expect_eq!(shape.bounds.min, Vec2::new(-50.0, 200.0));
  expect_eq!(shape.bounds.max, Vec2::new(25.0, 260.0));
}

#[googletest::test]
fn mismatched_node_id_is_invalid() {
  let mut nodes =
    nodes_from_raw(vec![area(1, (0.0, 0.0), (10.0, 10.0), 0.0)])
      .expect("areas are valid");
  let mut node = nodes
    .remove(&NodeId::Area(AreaId(1)))
    .expect("area 1 was just created");
  node.id = NodeId::Area(AreaId(2));
  nodes.insert(NodeId::Area(AreaId(1)), node);

  assert!(matches!(
    normalize_nodes(&mut nodes),
    Err(GraphError::InvalidGraph(_))
  ));
}

#[googletest::test]
fn ground_height_interpolates_corners() {
  let graph = build(vec![ramp(1)]).expect("the area is valid");

  expect_that!(
    graph.ground_height(AreaId(1), Vec2::new(50.0, 50.0)),
    some(near(50.0, 1e-3))
  );
  expect_that!(
    graph.ground_height(AreaId(1), Vec2::new(20.0, 80.0)),
    some(near(80.0, 1e-3))
  );
  expect_eq!(graph.ground_height(AreaId(2), Vec2::ZERO), None);
}

#[googletest::test]
fn area_at_prefers_closest_floor() {
  let graph = build(vec![
    area(1, (0.0, 0.0), (100.0, 100.0), 0.0),
    // A bridge directly above area 1.
    area(2, (0.0, 0.0), (100.0, 100.0), 200.0),
    area(3, (500.0, 0.0), (600.0, 100.0), 0.0),
  ])
  .expect("areas are valid");

  let area_at = |x: f32, z: f32| graph.area_at(Vec3::new(x, 50.0, z), 5.0);
  expect_eq!(area_at(50.0, 10.0), Some(AreaId(1)));
  expect_eq!(area_at(50.0, 190.0), Some(AreaId(2)));
  // Within the tolerance of the boundary.
  expect_eq!(area_at(603.0, 0.0), Some(AreaId(3)));
  // Outside every area, so the nearest center wins.
  expect_eq!(area_at(450.0, 0.0), Some(AreaId(3)));
}

#[googletest::test]
fn connectivity_and_pruning() {
  let graph = build(vec![
    area(1, (0.0, 0.0), (100.0, 100.0), 0.0)
      .with_connection(Direction::East, RawConnection::Plain(AreaId(2))),
    area(2, (100.0, 0.0), (200.0, 100.0), 0.0)
      .with_connection(Direction::West, RawConnection::Plain(AreaId(1))),
    area(3, (500.0, 0.0), (600.0, 100.0), 0.0),
  ])
  .expect("areas are valid");
  let area_1 = NodeId::Area(AreaId(1));
  let area_2 = NodeId::Area(AreaId(2));
  let area_3 = NodeId::Area(AreaId(3));
  let middle = NodeId::Door(DoorId::new(
    AreaId(1),
    AreaId(2),
    DoorPosition::Middle,
  ));

  expect_that!(graph.are_connected(area_1, area_2), eq(true));
  expect_that!(graph.are_connected(area_1, middle), eq(true));
  expect_that!(graph.are_connected(area_1, area_3), eq(false));
  expect_that!(
    graph.are_connected(area_1, NodeId::Area(AreaId(7))),
    eq(false)
  );

  let mut graph = graph;
  assert!(graph.edge(area_1, middle).is_some());
  expect_that!(graph.prune_edge(area_1, middle), eq(true));
  expect_eq!(graph.edge(area_1, middle), None);
  expect_that!(graph.prune_edge(area_1, middle), eq(false));
  // The reverse edge is untouched.
  assert!(graph.edge(middle, area_1).is_some());
}

#[googletest::test]
fn min_cost_tracks_cheapest_connection() {
  let graph = build(vec![
    area(1, (0.0, 0.0), (100.0, 100.0), 0.0).with_connection(
      Direction::East,
      RawConnection::Enriched { target: AreaId(2), cost: 0.5 },
    ),
    area(2, (100.0, 0.0), (200.0, 100.0), 0.0).with_connection(
      Direction::West,
      RawConnection::Enriched { target: AreaId(1), cost: 4.0 },
    ),
  ])
  .expect("areas are valid");
  expect_eq!(graph.min_cost(), 0.5);

  let graph = build(vec![area(1, (0.0, 0.0), (100.0, 100.0), 0.0)])
    .expect("the area is valid");
  expect_eq!(graph.min_cost(), 1.0);
}

#[googletest::test]
fn ids_display_compactly() {
  expect_eq!(
    DoorId::new(AreaId(7), AreaId(3), DoorPosition::Left).to_string(),
    "3_7_left"
  );
  expect_eq!(NodeId::Area(AreaId(4)).to_string(), "area 4");
}
