use glam::{Vec2, Vec3, Vec3Swizzles};

use crate::{coords::Direction, util::Bounds};

/// Distances below this are treated as zero.
const EPSILON: f32 = 1e-5;

/// Computes the horizontal distance from `point` to the closest point on
/// `segment`.
pub(crate) fn distance_to_segment_2d(
  point: Vec2,
  segment: (Vec2, Vec2),
) -> f32 {
  let delta = segment.1 - segment.0;
  let length_squared = delta.length_squared();
  if length_squared <= EPSILON * EPSILON {
    return point.distance(segment.0);
  }
  let t = (delta.dot(point - segment.0) / length_squared).clamp(0.0, 1.0);
  point.distance(segment.0 + delta * t)
}

/// The upward-facing unit normal of `triangle`. Degenerate triangles give
/// straight up.
pub(crate) fn triangle_normal(triangle: (Vec3, Vec3, Vec3)) -> Vec3 {
  let normal = (triangle.1 - triangle.0)
    .cross(triangle.2 - triangle.0)
    .try_normalize()
    .unwrap_or(Vec3::Z);
  if normal.z < 0.0 {
    -normal
  } else {
    normal
  }
}

/// Estimates the height of `triangle` at the horizontal `point` using
/// barycentric coordinates. The point may lie outside the triangle, in which
/// case the triangle's plane is extended. Returns `None` for triangles that
/// are degenerate horizontally.
pub(crate) fn triangle_height_at(
  triangle: (Vec3, Vec3, Vec3),
  point: Vec2,
) -> Option<f32> {
  // Similar to https://gamedev.stackexchange.com/a/63203
  let v0 = triangle.1.xy() - triangle.0.xy();
  let v1 = triangle.2.xy() - triangle.0.xy();
  let denominator = v0.perp_dot(v1);
  if denominator.abs() <= EPSILON {
    return None;
  }
  let v2 = point - triangle.0.xy();
  let v = v2.perp_dot(v1) / denominator;
  let w = v0.perp_dot(v2) / denominator;
  let u = 1.0 - v - w;
  Some(triangle.0.z * u + triangle.1.z * v + triangle.2.z * w)
}

/// Selects the triangle of the quad `corners` (northwest, northeast,
/// southeast, southwest) that `point` falls in. The quad is split along its
/// northwest-southeast diagonal.
pub(crate) fn quad_triangle_at(
  corners: &[Vec3; 4],
  point: Vec2,
) -> (Vec3, Vec3, Vec3) {
  let [north_west, north_east, south_east, south_west] = *corners;
  let diagonal = south_east.xy() - north_west.xy();
  if diagonal.perp_dot(point - north_west.xy()) <= 0.0 {
    (north_west, north_east, south_east)
  } else {
    (north_west, south_east, south_west)
  }
}

/// Estimates the ground height of the quad `corners` at `point`. The corners
/// may be non-coplanar.
pub(crate) fn quad_height_at(corners: &[Vec3; 4], point: Vec2) -> f32 {
  let triangle = quad_triangle_at(corners, point);
  triangle_height_at(triangle, point).unwrap_or_else(|| {
    corners.iter().map(|corner| corner.z).sum::<f32>() / corners.len() as f32
  })
}

/// The upward-facing surface normal of the quad `corners` at `point`.
pub(crate) fn quad_normal_at(corners: &[Vec3; 4], point: Vec2) -> Vec3 {
  triangle_normal(quad_triangle_at(corners, point))
}

/// The angle in degrees between `normal` and straight up.
pub(crate) fn slope_degrees(normal: Vec3) -> f32 {
  normal.normalize_or_zero().z.clamp(-1.0, 1.0).acos().to_degrees()
}

/// Tilts the horizontal `direction` so it runs along the plane with `normal`.
/// Returns a unit vector whose horizontal part points along `direction`.
pub(crate) fn direction_along_surface(direction: Vec2, normal: Vec3) -> Vec3 {
  if normal.z.abs() <= EPSILON {
    return direction.extend(0.0).normalize_or_zero();
  }
  let rise = -(direction.x * normal.x + direction.y * normal.y) / normal.z;
  direction.extend(rise).normalize_or_zero()
}

/// Intersects the ray `origin + t * direction` with `bounds` using the slab
/// method. Returns the `t` interval inside the box, or `None` if the ray
/// misses it entirely (or only touches it behind the origin).
pub(crate) fn ray_bounds_interval(
  origin: Vec2,
  direction: Vec2,
  bounds: &Bounds,
) -> Option<(f32, f32)> {
  let mut t_min = f32::NEG_INFINITY;
  let mut t_max = f32::INFINITY;
  for (origin, direction, min, max) in [
    (origin.x, direction.x, bounds.min.x, bounds.max.x),
    (origin.y, direction.y, bounds.min.y, bounds.max.y),
  ] {
    if direction.abs() <= EPSILON {
      if origin < min || origin > max {
        return None;
      }
      continue;
    }
    let t0 = (min - origin) / direction;
    let t1 = (max - origin) / direction;
    t_min = t_min.max(t0.min(t1));
    t_max = t_max.min(t0.max(t1));
  }
  if t_max < t_min || t_max < 0.0 {
    return None;
  }
  Some((t_min, t_max))
}

/// Where a ray leaves a box.
#[derive(Clone, Copy, PartialEq, Debug)]
pub(crate) struct BoundsExit {
  /// The distance along the ray (in units of the ray direction) to the exit.
  pub(crate) t: f32,
  /// The exit point.
  pub(crate) point: Vec2,
  /// The side of the box the ray leaves through.
  pub(crate) side: Direction,
}

/// Finds where the ray from `origin` along `direction` leaves `bounds`. The
/// origin is expected to be inside (or on) the box. Returns `None` if the
/// direction is zero or the ray never passes through the box.
pub(crate) fn ray_exit_2d(
  origin: Vec2,
  direction: Vec2,
  bounds: &Bounds,
) -> Option<BoundsExit> {
  if direction.length_squared() <= EPSILON * EPSILON {
    return None;
  }
  let (_, t_exit) = ray_bounds_interval(origin, direction, bounds)?;
  let t = t_exit.max(0.0);
  let point = origin + direction * t;

  // Pick the side whose plane the exit point lies on, preferring the axis the
  // ray is moving along more strongly when it leaves through a corner.
  let x_side = if direction.x > EPSILON {
    Some((Direction::East, (bounds.max.x - point.x).abs()))
  } else if direction.x < -EPSILON {
    Some((Direction::West, (point.x - bounds.min.x).abs()))
  } else {
    None
  };
  let y_side = if direction.y > EPSILON {
    Some((Direction::South, (bounds.max.y - point.y).abs()))
  } else if direction.y < -EPSILON {
    Some((Direction::North, (point.y - bounds.min.y).abs()))
  } else {
    None
  };
  let side = match (x_side, y_side) {
    (Some((x_side, _)), None) => x_side,
    (None, Some((y_side, _))) => y_side,
    (Some((x_side, x_gap)), Some((y_side, y_gap))) => {
      if (x_gap - y_gap).abs() <= EPSILON {
        if direction.x.abs() >= direction.y.abs() {
          x_side
        } else {
          y_side
        }
      } else if x_gap < y_gap {
        x_side
      } else {
        y_side
      }
    }
    (None, None) => return None,
  };
  Some(BoundsExit { t, point, side })
}

#[cfg(test)]
#[path = "geometry_test.rs"]
mod test;
