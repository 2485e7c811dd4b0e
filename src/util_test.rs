use glam::Vec2;

use crate::coords::Axis;

use super::Bounds;

#[test]
fn bounds_from_points() {
  assert_eq!(Bounds::from_points(Vec::<Vec2>::new()), None);

  let bounds = Bounds::from_points([
    Vec2::new(3.0, 5.0),
    Vec2::new(1.0, 7.0),
    Vec2::new(2.0, -1.0),
  ])
  .expect("there are points");
  assert_eq!(
    bounds,
    Bounds { min: Vec2::new(1.0, -1.0), max: Vec2::new(3.0, 7.0) }
  );
  assert_eq!(bounds.range(Axis::X), (1.0, 3.0));
  assert_eq!(bounds.range(Axis::Y), (-1.0, 7.0));
  assert_eq!(bounds.center(), Vec2::new(2.0, 3.0));
  assert_eq!(bounds.size(), Vec2::new(2.0, 8.0));
}

#[test]
fn bounds_contains_points_with_margin() {
  let bounds = Bounds { min: Vec2::new(0.0, 0.0), max: Vec2::new(10.0, 5.0) };

  assert!(bounds.contains_point(Vec2::new(0.0, 0.0), 0.0));
  assert!(bounds.contains_point(Vec2::new(10.0, 5.0), 0.0));
  assert!(bounds.contains_point(Vec2::new(4.0, 2.0), 0.0));

  assert!(!bounds.contains_point(Vec2::new(10.5, 2.0), 0.0));
  assert!(bounds.contains_point(Vec2::new(10.5, 2.0), 1.0));
  assert!(!bounds.contains_point(Vec2::new(-1.5, 2.0), 1.0));
}

#[test]
fn bounds_expand_and_collapse() {
  let bounds = Bounds { min: Vec2::new(0.0, 0.0), max: Vec2::new(10.0, 4.0) };

  assert_eq!(
    bounds.expand_by(1.0),
    Bounds { min: Vec2::new(-1.0, -1.0), max: Vec2::new(11.0, 5.0) }
  );
  // Shrinking by more than half the height collapses the Y axis onto the
  // center.
  assert_eq!(
    bounds.expand_by(-3.0),
    Bounds { min: Vec2::new(3.0, 2.0), max: Vec2::new(7.0, 2.0) }
  );
}

#[test]
fn bounds_clamp_and_intersect() {
  let bounds = Bounds { min: Vec2::new(0.0, 0.0), max: Vec2::new(10.0, 4.0) };

  assert_eq!(bounds.clamp_point(Vec2::new(-3.0, 2.0)), Vec2::new(0.0, 2.0));
  assert_eq!(bounds.clamp_point(Vec2::new(12.0, 9.0)), Vec2::new(10.0, 4.0));

  let touching =
    Bounds { min: Vec2::new(10.0, 0.0), max: Vec2::new(20.0, 4.0) };
  let apart = Bounds { min: Vec2::new(10.5, 0.0), max: Vec2::new(20.0, 4.0) };
  assert!(bounds.intersects(&touching));
  assert!(!bounds.intersects(&apart));

  assert_eq!(
    bounds.intersection(&touching),
    Some(Bounds { min: Vec2::new(10.0, 0.0), max: Vec2::new(10.0, 4.0) })
  );
  let overlapping =
    Bounds { min: Vec2::new(5.0, -2.0), max: Vec2::new(20.0, 3.0) };
  assert_eq!(
    bounds.intersection(&overlapping),
    Some(Bounds { min: Vec2::new(5.0, 0.0), max: Vec2::new(10.0, 3.0) })
  );
  assert_eq!(bounds.intersection(&apart), None);
}
