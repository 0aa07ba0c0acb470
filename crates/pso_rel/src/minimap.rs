//! Area minimaps (`r.rel`).
//!
//! The payload root is a [`Minimap`] pointing at an array of [`Room`]. Each room references a
//! single strip mesh through a [`MeshContainer`]. Vertex positions are stored relative to the
//! room's center.

use pso_ninja::nj::{read_index_list, read_vertex_list, write_index_list, write_vertex_list};
use pso_ninja::{Mesh, Vertex};
use pso_schema::{serializable, Archive, Ptr32};
use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::read::RelArchive;
use crate::write::RelWriter;

serializable! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct MeshContainer {
        pub unk1: u32,
        pub mesh: Ptr32,
    }
}

serializable! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Room {
        pub id: u16,
        pub flags: u16,
        pub x: f32,
        pub y: f32,
        pub z: f32,
        pub rot_x: i32,
        pub rot_y: i32,
        pub rot_z: i32,
        pub color_alpha: f32,
        pub discovery_radius: f32,
        pub mesh_container: Ptr32,
    }
}

serializable! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Minimap {
        pub rooms: Ptr32,
        pub unk1: u32,
        pub room_count: u32,
        pub unk2: u32,
    }
}

/// Rooms are visible from the start
pub const ROOM_FLAGS_VISIBLE: u16 = 1;

/// Geometry of a room, already split into triangle strips
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoomGeometry {
    /// Center of the room in world space
    pub center: [f32; 3],
    /// Vertex positions in world space
    pub vertices: Vec<[f32; 3]>,
    /// Triangle strips indexing `vertices`
    pub strips: Vec<Vec<u16>>,
}

/// A room read back from a minimap
#[derive(Debug, Clone, PartialEq)]
pub struct MinimapRoom {
    pub room: Room,
    pub mesh: Option<Mesh>,
    /// Vertices relative to the room's center
    pub vertices: Vec<Vertex>,
    pub strips: Vec<Vec<u16>>,
}

impl RoomGeometry {
    /// Vertices relative to the center along with the distance of the farthest one
    fn local_vertices(&self) -> (Vec<Vertex>, f32) {
        let [cx, cy, cz] = self.center;
        let vertices: Vec<Vertex> = self
            .vertices
            .iter()
            .map(|&[x, y, z]| Vertex::at(x - cx, y - cy, z - cz))
            .collect();
        let radius = vertices.iter().map(Vertex::length).fold(0.0, f32::max);
        (vertices, radius)
    }
}

/// Build an `r.rel` file from room geometry
#[instrument(skip_all, fields(rooms = rooms.len()))]
pub fn write_minimap(rooms: &[RoomGeometry]) -> Result<Vec<u8>> {
    let mut rel = RelWriter::new();

    let mut entries = Vec::with_capacity(rooms.len());
    for (i, geometry) in rooms.iter().enumerate() {
        let id = u16::try_from(i).map_err(|_| Error::TooManyElements(rooms.len()))?;
        let (vertices, discovery_radius) = geometry.local_vertices();
        let [x, y, z] = geometry.center;

        let vertex_list = write_vertex_list(&mut rel, vertices)?;
        let index_list = write_index_list(&mut rel, geometry.strips.clone())?;
        let mesh = rel.write_aligned(&Mesh {
            vertex_list,
            index_list,
            x,
            y,
            z,
        })?;
        let mesh_container = rel.write_aligned(&MeshContainer { unk1: 0, mesh })?;

        debug!(id, discovery_radius, "wrote room mesh");
        entries.push(Room {
            id,
            flags: ROOM_FLAGS_VISIBLE,
            x,
            y,
            z,
            discovery_radius,
            mesh_container,
            ..Default::default()
        });
    }

    let minimap = Minimap {
        rooms: rel.write_sequence(&entries, true)?,
        room_count: u32::try_from(entries.len())
            .map_err(|_| Error::TooManyElements(entries.len()))?,
        ..Default::default()
    };
    let root = rel.write_aligned(&minimap)?;
    rel.finish(root)
}

/// Read the rooms of an `r.rel` file
#[instrument(skip_all)]
pub fn read_minimap(archive: &RelArchive) -> Result<Vec<MinimapRoom>> {
    let minimap: Minimap = archive.read_root()?;
    let rooms: Vec<Room> = archive.read_sequence(minimap.rooms, minimap.room_count as usize)?;

    rooms
        .into_iter()
        .map(|room| -> Result<MinimapRoom> {
            if room.mesh_container.is_null() {
                return Ok(MinimapRoom {
                    room,
                    mesh: None,
                    vertices: Vec::new(),
                    strips: Vec::new(),
                });
            }

            let container: MeshContainer = archive.read(room.mesh_container)?;
            let mesh: Mesh = archive.read(container.mesh)?;
            let vertices = match mesh.vertex_list {
                ptr if ptr.is_null() => Vec::new(),
                ptr => read_vertex_list(archive.buffer(), ptr.offset())?
                    .into_iter()
                    .flat_map(|node| node.vertices)
                    .collect(),
            };
            let strips = match mesh.index_list {
                ptr if ptr.is_null() => Vec::new(),
                ptr => read_index_list(archive.buffer(), ptr.offset())?
                    .into_iter()
                    .flat_map(|node| node.strips)
                    .map(|strip| strip.indices)
                    .collect(),
            };

            Ok(MinimapRoom {
                room,
                mesh: Some(mesh),
                vertices,
                strips,
            })
        })
        .collect()
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    use crate::error::Result;
    use crate::minimap::{read_minimap, write_minimap, Minimap, Room, RoomGeometry};
    use crate::read::RelArchive;

    fn triangle(center: [f32; 3]) -> RoomGeometry {
        let [x, y, z] = center;
        RoomGeometry {
            center,
            vertices: vec![[x + 3.0, y, z], [x, y + 4.0, z], [x, y, z - 1.0]],
            strips: vec![vec![0, 1, 2]],
        }
    }

    #[test]
    #[traced_test]
    fn single_room_layout() -> Result<()> {
        let bytes = write_minimap(&[triangle([10.0, 0.0, -5.0])])?;
        let archive = RelArchive::new(bytes)?;

        // vertex node 8 + 72, terminator 8, index node 6 + 8 padded to 16, terminator 8, mesh 20,
        // container 8, room 40
        let rooms_at = 4 + 80 + 8 + 16 + 8 + 20 + 8;
        let minimap: Minimap = archive.read_root()?;
        assert_eq!(archive.payload().offset(), rooms_at + 40);
        assert_eq!(minimap.rooms.offset(), rooms_at);
        assert_eq!(minimap.room_count, 1);

        let room: Room = archive.read(minimap.rooms)?;
        assert_eq!(room.flags, 1);
        assert_eq!(room.discovery_radius, 4.0);
        assert_eq!((room.x, room.y, room.z), (10.0, 0.0, -5.0));

        assert!(archive
            .pointer_offsets()
            .iter()
            .all(|location| location % 4 == 0));

        Ok(())
    }

    #[test]
    fn rooms_round_trip() -> Result<()> {
        let geometry = vec![triangle([0.0, 0.0, 0.0]), triangle([-20.0, 1.0, 7.5])];
        let archive = RelArchive::new(write_minimap(&geometry)?)?;
        let rooms = read_minimap(&archive)?;

        assert_eq!(rooms.len(), 2);
        for (i, (room, geometry)) in rooms.iter().zip(&geometry).enumerate() {
            assert_eq!(room.room.id as usize, i);
            assert_eq!(room.strips, geometry.strips);
            assert_eq!(room.vertices.len(), 3);
            assert_eq!(room.vertices[1].y, 4.0);
            assert_eq!(room.mesh.as_ref().map(|mesh| mesh.x), Some(geometry.center[0]));
        }

        Ok(())
    }

    #[test]
    fn no_rooms() -> Result<()> {
        let archive = RelArchive::new(write_minimap(&[])?)?;
        assert_eq!(read_minimap(&archive)?, Vec::new());
        assert!(archive.pointer_offsets().is_empty());

        Ok(())
    }
}
