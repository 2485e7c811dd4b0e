use glam::Vec2;

/// One of the four sides of an area. Areas are axis-aligned rectangles in the
/// horizontal plane, where X points east, Y points south (so north is -Y), and
/// Z points up.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub enum Direction {
  North = 0,
  East = 1,
  South = 2,
  West = 3,
}

impl Direction {
  /// All directions in connection-slot order.
  pub const ALL: [Direction; 4] =
    [Direction::North, Direction::East, Direction::South, Direction::West];

  /// The index of this direction's connection slot.
  pub fn index(self) -> usize {
    self as usize
  }

  /// The direction for a connection slot index. Returns `None` for indices
  /// outside 0..4.
  pub fn from_index(index: usize) -> Option<Self> {
    Self::ALL.get(index).copied()
  }

  pub fn opposite(self) -> Self {
    match self {
      Self::North => Self::South,
      Self::East => Self::West,
      Self::South => Self::North,
      Self::West => Self::East,
    }
  }

  /// The horizontal unit vector pointing in this direction.
  pub fn unit(self) -> Vec2 {
    match self {
      Self::North => Vec2::new(0.0, -1.0),
      Self::East => Vec2::new(1.0, 0.0),
      Self::South => Vec2::new(0.0, 1.0),
      Self::West => Vec2::new(-1.0, 0.0),
    }
  }

  /// The axis that an area's edge on this side runs along. The edge is
  /// constant along the other axis.
  pub fn edge_axis(self) -> Axis {
    match self {
      Self::North | Self::South => Axis::X,
      Self::East | Self::West => Axis::Y,
    }
  }

  /// The two corners on this side of an area, ordered by increasing coordinate
  /// along [`Self::edge_axis`].
  pub fn facing_corners(self) -> (Corner, Corner) {
    match self {
      Self::North => (Corner::NorthWest, Corner::NorthEast),
      Self::East => (Corner::NorthEast, Corner::SouthEast),
      Self::South => (Corner::SouthWest, Corner::SouthEast),
      Self::West => (Corner::NorthWest, Corner::SouthWest),
    }
  }

  /// The direction best matching `vector` (the dominant axis wins, ties go to
  /// the X axis). A zero vector maps to east.
  pub fn from_vector(vector: Vec2) -> Self {
    if vector.x.abs() >= vector.y.abs() {
      if vector.x >= 0.0 {
        Self::East
      } else {
        Self::West
      }
    } else if vector.y > 0.0 {
      Self::South
    } else {
      Self::North
    }
  }
}

/// A corner of an area.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub enum Corner {
  NorthWest = 0,
  NorthEast = 1,
  SouthEast = 2,
  SouthWest = 3,
}

impl Corner {
  pub const ALL: [Corner; 4] = [
    Corner::NorthWest,
    Corner::NorthEast,
    Corner::SouthEast,
    Corner::SouthWest,
  ];

  pub fn index(self) -> usize {
    self as usize
  }

  /// The two sides of the area that meet at this corner.
  pub fn facing(self) -> [Direction; 2] {
    match self {
      Self::NorthWest => [Direction::North, Direction::West],
      Self::NorthEast => [Direction::North, Direction::East],
      Self::SouthEast => [Direction::South, Direction::East],
      Self::SouthWest => [Direction::South, Direction::West],
    }
  }
}

/// A horizontal axis.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Axis {
  X,
  Y,
}

impl Axis {
  /// Gets the component of `v` along this axis.
  pub fn of(self, v: Vec2) -> f32 {
    match self {
      Self::X => v.x,
      Self::Y => v.y,
    }
  }

  /// Returns `v` with its component along this axis replaced by `value`.
  pub fn with(self, v: Vec2, value: f32) -> Vec2 {
    match self {
      Self::X => Vec2::new(value, v.y),
      Self::Y => Vec2::new(v.x, value),
    }
  }
}
