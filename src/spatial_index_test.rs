use glam::Vec3;
use googletest::{expect_eq, expect_that, matchers::*, verify_eq, verify_that};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::nav_graph::AreaId;

use super::SpatialIndex;

fn random_point(rng: &mut StdRng) -> Vec3 {
  Vec3::new(
    rng.gen_range(-1000.0..1000.0),
    rng.gen_range(-1000.0..1000.0),
    rng.gen_range(-200.0..200.0),
  )
}

/// Sorts every point by its distance to `query` the slow way.
fn linear_scan(points: &[(AreaId, Vec3)], query: Vec3) -> Vec<(AreaId, f32)> {
  let mut by_distance = points
    .iter()
    .map(|&(area, point)| (area, point.distance(query)))
    .collect::<Vec<_>>();
  by_distance.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
  by_distance
}

#[googletest::test]
fn empty_index_finds_nothing() {
  let index = SpatialIndex::build(std::iter::empty());
  expect_that!(index.is_empty(), eq(true));
  expect_eq!(index.find_nearest(Vec3::ZERO), None);
  expect_eq!(index.find_k_nearest(Vec3::ZERO, 3).len(), 0);
}

#[googletest::test]
fn finds_nearest_of_few_points() {
  let index = SpatialIndex::build([
    (AreaId(1), Vec3::new(0.0, 0.0, 0.0)),
    (AreaId(2), Vec3::new(10.0, 0.0, 0.0)),
    (AreaId(3), Vec3::new(0.0, 0.0, 50.0)),
  ]);

  expect_eq!(index.len(), 3);
  expect_eq!(
    index.find_nearest(Vec3::new(7.0, 0.0, 0.0)),
    Some((AreaId(2), 3.0))
  );
  expect_eq!(
    index.find_nearest(Vec3::new(0.0, 0.0, 30.0)),
    Some((AreaId(3), 20.0))
  );

  // Asking for more than there are returns everything, sorted.
  let all = index.find_k_nearest(Vec3::new(1.0, 0.0, 0.0), 10);
  expect_eq!(all.len(), 3);
  expect_eq!(all[0], (AreaId(1), 1.0));
  expect_eq!(all[1], (AreaId(2), 9.0));
  expect_eq!(all[2].0, AreaId(3));
  expect_that!(all[2].1, near(50.01, 1e-3));
}

#[test]
fn non_finite_points_are_skipped() {
  let index = SpatialIndex::build([
    (AreaId(1), Vec3::new(f32::NAN, 0.0, 0.0)),
    (AreaId(2), Vec3::new(1.0, 2.0, 3.0)),
  ]);
  assert_eq!(index.len(), 1);
  assert_eq!(index.find_nearest(Vec3::new(f32::NAN, 0.0, 0.0)), None);
}

#[test]
fn matches_linear_scan() {
  let mut rng = StdRng::seed_from_u64(0x5eed);
  for _ in 0..20 {
    let count = rng.gen_range(1..200);
    let points = (0..count)
      .map(|i| (AreaId(i), random_point(&mut rng)))
      .collect::<Vec<_>>();
    let index = SpatialIndex::build(points.iter().copied());

    for _ in 0..25 {
      let query = random_point(&mut rng);
      let expected = linear_scan(&points, query);

      let (nearest, distance) =
        index.find_nearest(query).expect("the index is not empty");
      assert!(
        (distance - expected[0].1).abs() < 1e-3,
        "nearest distance {} != {}",
        distance,
        expected[0].1
      );
      // Only compare ids when the nearest point is unambiguous.
      if expected.len() == 1 || expected[1].1 - expected[0].1 > 1e-3 {
        assert_eq!(nearest, expected[0].0);
      }

      let k = rng.gen_range(1..12);
      let k_nearest = index.find_k_nearest(query, k);
      assert_eq!(k_nearest.len(), k.min(points.len()));
      for (found, expected) in k_nearest.iter().zip(expected.iter()) {
        assert!((found.1 - expected.1).abs() < 1e-3);
      }
      assert!(k_nearest.windows(2).all(|pair| pair[0].1 <= pair[1].1));
    }
  }
}
