use std::{
  fs::File,
  io::{self, BufReader, BufWriter, ErrorKind, Read, Write},
  path::{Path, PathBuf},
};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use glam::Vec3;
use thiserror::Error;
use tracing::debug;

use crate::{
  coords::{Corner, Direction},
  nav_graph::AreaId,
};

/// Magic number at the start of every navigation mesh file.
pub const MESH_MAGIC: u32 = 0xFEED_FACE;

/// The newest mesh file version. Version 1 files do not store the heights of
/// the north-east and south-west corners.
pub const MESH_VERSION: u32 = 2;

/// Tag of a connection entry holding only the target id.
const PLAIN_CONNECTION_TAG: u8 = 0;
/// Tag of a connection entry holding the target id and a cost.
const ENRICHED_CONNECTION_TAG: u8 = 1;

/// Upper bound on up-front allocations driven by counts read from a file.
const MAX_PREALLOCATION: usize = 1 << 16;

/// A connection as stored in a mesh file.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum RawConnection {
  /// Only the target area is known. The cost takes its default.
  Plain(AreaId),
  /// The target area and the cost multiplier of travelling to it.
  Enriched { target: AreaId, cost: f32 },
}

impl RawConnection {
  /// The area this connection leads to.
  pub fn target(&self) -> AreaId {
    match self {
      &Self::Plain(target) => target,
      &Self::Enriched { target, .. } => target,
    }
  }
}

/// An area as stored in a mesh file, before it is part of a graph.
#[derive(Clone, PartialEq, Debug)]
pub struct RawArea {
  /// The unique id of the area.
  pub id: AreaId,
  /// The corners of the area, indexed by [`Corner::index`].
  pub corners: [Vec3; 4],
  /// The connections leaving each side of the area, indexed by
  /// [`Direction::index`].
  pub connections: [Vec<RawConnection>; 4],
}

impl RawArea {
  /// Creates an area from its north-west and south-east corners. The other two
  /// corners borrow their heights: north-east from north-west and south-west
  /// from south-east.
  pub fn from_extents(id: AreaId, north_west: Vec3, south_east: Vec3) -> Self {
    Self {
      id,
      corners: [
        north_west,
        Vec3::new(south_east.x, north_west.y, north_west.z),
        south_east,
        Vec3::new(north_west.x, south_east.y, south_east.z),
      ],
      connections: Default::default(),
    }
  }

  /// Overrides the heights of the north-east and south-west corners.
  pub fn with_corner_heights(
    mut self,
    north_east: f32,
    south_west: f32,
  ) -> Self {
    self.corners[Corner::NorthEast.index()].z = north_east;
    self.corners[Corner::SouthWest.index()].z = south_west;
    self
  }

  /// Adds a connection leaving the `direction` side of this area.
  pub fn with_connection(
    mut self,
    direction: Direction,
    connection: RawConnection,
  ) -> Self {
    self.connections[direction.index()].push(connection);
    self
  }
}

/// A problem with the contents of a mesh file.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MeshFormatError {
  #[error("bad magic number {0:#010x}")]
  BadMagic(u32),
  #[error("unsupported version {0}")]
  UnsupportedVersion(u32),
  #[error("the data ended early")]
  Truncated,
  #[error("area {area} has a connection with unknown tag {tag}")]
  UnknownConnectionTag { area: AreaId, tag: u8 },
  #[error("area {area} has an invalid corner-height flag {flag}")]
  InvalidHeightFlag { area: AreaId, flag: u8 },
  #[error("the mesh contains no areas")]
  NoAreas,
  #[error("read failed: {0}")]
  Io(String),
}

impl From<io::Error> for MeshFormatError {
  fn from(error: io::Error) -> Self {
    match error.kind() {
      ErrorKind::UnexpectedEof => Self::Truncated,
      _ => Self::Io(error.to_string()),
    }
  }
}

/// An error while loading a mesh file from disk.
#[derive(Debug, Error)]
pub enum LoadError {
  #[error("navigation mesh file {} does not exist", .0.display())]
  FileNotFound(PathBuf),
  #[error("navigation mesh file {} is malformed: {source}", .path.display())]
  Parse { path: PathBuf, source: MeshFormatError },
  #[error(
    "navigation mesh file {} could not be read: {source}",
    .path.display()
  )]
  Io { path: PathBuf, source: io::Error },
}

/// Loads the areas of the mesh file at `path`.
pub fn load_mesh_file(path: &Path) -> Result<Vec<RawArea>, LoadError> {
  let file = match File::open(path) {
    Ok(file) => file,
    Err(error) if error.kind() == ErrorKind::NotFound => {
      return Err(LoadError::FileNotFound(path.to_path_buf()));
    }
    Err(source) => {
      return Err(LoadError::Io { path: path.to_path_buf(), source })
    }
  };
  let areas = read_mesh(&mut BufReader::new(file))
    .map_err(|source| LoadError::Parse { path: path.to_path_buf(), source })?;
  debug!(path = %path.display(), areas = areas.len(), "read navigation mesh");
  Ok(areas)
}

/// Parses the areas of a mesh from `reader`.
pub fn read_mesh<R: Read>(
  reader: &mut R,
) -> Result<Vec<RawArea>, MeshFormatError> {
  let magic = reader.read_u32::<LittleEndian>()?;
  if magic != MESH_MAGIC {
    return Err(MeshFormatError::BadMagic(magic));
  }
  let version = reader.read_u32::<LittleEndian>()?;
  if version == 0 || version > MESH_VERSION {
    return Err(MeshFormatError::UnsupportedVersion(version));
  }

  let area_count = reader.read_u32::<LittleEndian>()? as usize;
  if area_count == 0 {
    return Err(MeshFormatError::NoAreas);
  }

  let mut areas = Vec::with_capacity(area_count.min(MAX_PREALLOCATION));
  for _ in 0..area_count {
    areas.push(read_area(reader, version)?);
  }
  Ok(areas)
}

fn read_vec3<R: Read>(reader: &mut R) -> io::Result<Vec3> {
  Ok(Vec3::new(
    reader.read_f32::<LittleEndian>()?,
    reader.read_f32::<LittleEndian>()?,
    reader.read_f32::<LittleEndian>()?,
  ))
}

fn read_area<R: Read>(
  reader: &mut R,
  version: u32,
) -> Result<RawArea, MeshFormatError> {
  let id = AreaId(reader.read_u32::<LittleEndian>()?);
  let north_west = read_vec3(reader)?;
  let south_east = read_vec3(reader)?;
  let mut area = RawArea::from_extents(id, north_west, south_east);

  if version >= 2 {
    match reader.read_u8()? {
      0 => {}
      1 => {
        let north_east = reader.read_f32::<LittleEndian>()?;
        let south_west = reader.read_f32::<LittleEndian>()?;
        area = area.with_corner_heights(north_east, south_west);
      }
      flag => return Err(MeshFormatError::InvalidHeightFlag { area: id, flag }),
    }
  }

  for direction in Direction::ALL {
    let count = reader.read_u32::<LittleEndian>()? as usize;
    let connections = &mut area.connections[direction.index()];
    connections.reserve(count.min(MAX_PREALLOCATION));
    for _ in 0..count {
      let connection = match reader.read_u8()? {
        PLAIN_CONNECTION_TAG => {
          RawConnection::Plain(AreaId(reader.read_u32::<LittleEndian>()?))
        }
        ENRICHED_CONNECTION_TAG => RawConnection::Enriched {
          target: AreaId(reader.read_u32::<LittleEndian>()?),
          cost: reader.read_f32::<LittleEndian>()?,
        },
        tag => {
          return Err(MeshFormatError::UnknownConnectionTag { area: id, tag })
        }
      };
      connections.push(connection);
    }
  }

  Ok(area)
}

fn write_vec3<W: Write>(writer: &mut W, v: Vec3) -> io::Result<()> {
  writer.write_f32::<LittleEndian>(v.x)?;
  writer.write_f32::<LittleEndian>(v.y)?;
  writer.write_f32::<LittleEndian>(v.z)
}

/// Writes `areas` in the newest mesh file format. Corner heights are always
/// written.
pub fn write_mesh<W: Write>(
  writer: &mut W,
  areas: &[RawArea],
) -> io::Result<()> {
  writer.write_u32::<LittleEndian>(MESH_MAGIC)?;
  writer.write_u32::<LittleEndian>(MESH_VERSION)?;
  writer.write_u32::<LittleEndian>(areas.len() as u32)?;
  for area in areas {
    writer.write_u32::<LittleEndian>(area.id.0)?;
    write_vec3(writer, area.corners[Corner::NorthWest.index()])?;
    write_vec3(writer, area.corners[Corner::SouthEast.index()])?;
    writer.write_u8(1)?;
    for corner in [Corner::NorthEast, Corner::SouthWest] {
      writer.write_f32::<LittleEndian>(area.corners[corner.index()].z)?;
    }

    for connections in area.connections.iter() {
      writer.write_u32::<LittleEndian>(connections.len() as u32)?;
      for connection in connections {
        match *connection {
          RawConnection::Plain(target) => {
            writer.write_u8(PLAIN_CONNECTION_TAG)?;
            writer.write_u32::<LittleEndian>(target.0)?;
          }
          RawConnection::Enriched { target, cost } => {
            writer.write_u8(ENRICHED_CONNECTION_TAG)?;
            writer.write_u32::<LittleEndian>(target.0)?;
            writer.write_f32::<LittleEndian>(cost)?;
          }
        }
      }
    }
  }
  Ok(())
}

/// Writes `areas` to a new mesh file at `path`.
pub fn save_mesh_file(path: &Path, areas: &[RawArea]) -> io::Result<()> {
  let mut writer = BufWriter::new(File::create(path)?);
  write_mesh(&mut writer, areas)?;
  writer.flush()
}

#[cfg(test)]
#[path = "mesh_file_test.rs"]
mod test;
