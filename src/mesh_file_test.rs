use std::{io::Cursor, path::PathBuf};

use byteorder::{LittleEndian, WriteBytesExt};
use glam::Vec3;
use googletest::{expect_eq, expect_that, matchers::*, verify_eq, verify_that};

use crate::{coords::Direction, nav_graph::AreaId};

use super::{
  load_mesh_file, read_mesh, save_mesh_file, write_mesh, LoadError,
  MeshFormatError, RawArea, RawConnection, MESH_MAGIC,
};

fn two_areas() -> Vec<RawArea> {
  vec![
    RawArea::from_extents(
      AreaId(1),
      Vec3::new(0.0, 0.0, 0.0),
      Vec3::new(100.0, 100.0, 0.0),
    )
    .with_connection(Direction::East, RawConnection::Plain(AreaId(2))),
    RawArea::from_extents(
      AreaId(2),
      Vec3::new(100.0, 0.0, 10.0),
      Vec3::new(200.0, 100.0, 30.0),
    )
    .with_corner_heights(15.0, 25.0)
    .with_connection(
      Direction::West,
      RawConnection::Enriched { target: AreaId(1), cost: 2.5 },
    ),
  ]
}

/// Writes a version 1 header and a single area without corner heights.
fn version_1_bytes() -> Vec<u8> {
  let mut bytes = Vec::new();
  bytes.write_u32::<LittleEndian>(MESH_MAGIC).unwrap();
  bytes.write_u32::<LittleEndian>(1).unwrap();
  bytes.write_u32::<LittleEndian>(1).unwrap();

  bytes.write_u32::<LittleEndian>(7).unwrap();
  for value in [0.0, 0.0, 5.0, 50.0, 20.0, 9.0] {
    bytes.write_f32::<LittleEndian>(value).unwrap();
  }
  // North: one bare connection. East, South, West: empty.
  bytes.write_u32::<LittleEndian>(1).unwrap();
  bytes.write_u8(0).unwrap();
  bytes.write_u32::<LittleEndian>(8).unwrap();
  for _ in 0..3 {
    bytes.write_u32::<LittleEndian>(0).unwrap();
  }
  bytes
}

fn temp_path(name: &str) -> PathBuf {
  std::env::temp_dir()
    .join(format!("areanav-{}-{}.nav", name, std::process::id()))
}

#[googletest::test]
fn written_mesh_reads_back() {
  let areas = two_areas();
  let mut bytes = Vec::new();
  write_mesh(&mut bytes, &areas).expect("writing to a Vec cannot fail");

  let read = read_mesh(&mut Cursor::new(bytes)).expect("mesh is valid");
  assert_eq!(read, areas);
  expect_eq!(read[1].corners[1], Vec3::new(200.0, 0.0, 15.0));
  expect_eq!(read[1].corners[3], Vec3::new(100.0, 100.0, 25.0));
}

#[googletest::test]
fn version_1_borrows_diagonal_heights() {
  let read = read_mesh(&mut Cursor::new(version_1_bytes()))
    .expect("mesh is valid");

  expect_that!(
    read,
    elements_are![&RawArea {
      id: AreaId(7),
      corners: [
        Vec3::new(0.0, 0.0, 5.0),
        Vec3::new(50.0, 0.0, 5.0),
        Vec3::new(50.0, 20.0, 9.0),
        Vec3::new(0.0, 20.0, 9.0),
      ],
      connections: [
        vec![RawConnection::Plain(AreaId(8))],
        vec![],
        vec![],
        vec![],
      ],
    }]
  );
}

#[test]
fn rejects_bad_header() {
  let mut bytes = version_1_bytes();
  bytes[0] = 0;
  assert_eq!(
    read_mesh(&mut Cursor::new(bytes)),
    Err(MeshFormatError::BadMagic(0xFEED_FA00))
  );

  let mut bytes = version_1_bytes();
  bytes[4] = 9;
  assert_eq!(
    read_mesh(&mut Cursor::new(bytes)),
    Err(MeshFormatError::UnsupportedVersion(9))
  );
}

#[test]
fn rejects_empty_and_truncated_meshes() {
  let mut bytes = Vec::new();
  bytes.write_u32::<LittleEndian>(MESH_MAGIC).unwrap();
  bytes.write_u32::<LittleEndian>(2).unwrap();
  bytes.write_u32::<LittleEndian>(0).unwrap();
  assert_eq!(read_mesh(&mut Cursor::new(bytes)), Err(MeshFormatError::NoAreas));

  assert_eq!(
    read_mesh(&mut Cursor::new(Vec::new())),
    Err(MeshFormatError::Truncated)
  );

  let mut bytes = version_1_bytes();
  bytes.truncate(bytes.len() - 2);
  assert_eq!(
    read_mesh(&mut Cursor::new(bytes)),
    Err(MeshFormatError::Truncated)
  );
}

#[test]
fn rejects_unknown_connection_tag() {
  let mut bytes = version_1_bytes();
  // The tag of the north connection sits after the header (12 bytes), the id
  // (4 bytes), both corners (24 bytes) and the north count (4 bytes).
  bytes[44] = 3;
  assert_eq!(
    read_mesh(&mut Cursor::new(bytes)),
    Err(MeshFormatError::UnknownConnectionTag { area: AreaId(7), tag: 3 })
  );
}

#[test]
fn missing_file_is_reported() {
  let path = temp_path("missing");
  match load_mesh_file(&path) {
    Err(LoadError::FileNotFound(missing)) => assert_eq!(missing, path),
    other => panic!("expected FileNotFound, got {other:?}"),
  }
}

#[test]
fn loads_saved_file_and_reports_parse_errors() {
  let path = temp_path("saved");
  save_mesh_file(&path, &two_areas()).expect("temp dir is writable");
  let loaded = load_mesh_file(&path);
  assert_eq!(loaded.ok(), Some(two_areas()));

  std::fs::write(&path, [1, 2, 3]).expect("temp dir is writable");
  let error = load_mesh_file(&path);
  std::fs::remove_file(&path).expect("file was just written");
  match error {
    Err(LoadError::Parse { path: bad_path, source }) => {
      assert_eq!(bad_path, path);
      assert_eq!(source, MeshFormatError::Truncated);
    }
    other => panic!("expected Parse, got {other:?}"),
  }
}
