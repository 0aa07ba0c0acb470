//! Strip meshes: vertex list nodes and index list nodes.
//!
//! Both node lists are stored back to back and end with a terminator node whose low flag byte
//! is `0xFF`. A node's `offset_to_next` counts the bytes following its first 4 bytes, in units
//! of 4 bytes for vertex nodes and 2 bytes for index nodes.

use pso_schema::{serializable, Archive, Buffer, Ptr32, Serializable};
use tracing::{instrument, trace};

use crate::error::{count_u16, Error, Result};

/// Low flag byte of the node ending a node list
pub const NODE_TERMINATOR: u16 = 0xFF;

/// Vertex node holding positions and normals
pub const VERTEX_FLAGS_POSITION_NORMAL: u16 = 0x29;

/// Index node holding triangle strips
pub const STRIP_FLAGS: u16 = 0x0340;

serializable! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Vertex {
        pub x: f32,
        pub y: f32,
        pub z: f32,
        pub nx: f32,
        pub ny: f32,
        pub nz: f32,
    }
}

serializable! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct VertexListNode {
        pub flags: u16,
        pub offset_to_next: u16,
        pub unk1: u16,
        pub vertex_count: u16,
        pub vertices: Vec<Vertex> [count = vertex_count],
    }
}

serializable! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct IndexArray {
        pub length: u16,
        pub indices: Vec<u16> [count = length],
    }
}

serializable! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct IndexListNode {
        pub flags: u16,
        pub offset_to_next: u16,
        pub strip_count: u16,
        pub strips: Vec<IndexArray> [count = strip_count],
    }
}

serializable! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Mesh {
        pub vertex_list: Ptr32,
        pub index_list: Ptr32,
        pub x: f32,
        pub y: f32,
        pub z: f32,
    }
}

impl Vertex {
    /// Vertex with an upward facing normal
    pub fn at(x: f32, y: f32, z: f32) -> Self {
        Vertex {
            x,
            y,
            z,
            nx: 0.0,
            ny: 1.0,
            nz: 0.0,
        }
    }

    /// Distance from the origin
    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

impl VertexListNode {
    pub fn new(vertices: Vec<Vertex>) -> Result<Self> {
        let vertex_count = count_u16("vertices", vertices.len())?;
        let words = Vertex::type_size() * vertices.len() / 4 + 1;
        Ok(VertexListNode {
            flags: VERTEX_FLAGS_POSITION_NORMAL,
            offset_to_next: count_u16("vertex words", words)?,
            unk1: 0,
            vertex_count,
            vertices,
        })
    }

    pub fn terminator() -> Self {
        VertexListNode {
            flags: NODE_TERMINATOR,
            ..Default::default()
        }
    }

    pub fn is_terminator(&self) -> bool {
        self.flags & 0xFF == NODE_TERMINATOR
    }

    /// Bytes from the start of this node to the next one
    pub fn stride(&self) -> usize {
        4 + self.offset_to_next as usize * 4
    }
}

impl IndexArray {
    pub fn new(indices: Vec<u16>) -> Result<Self> {
        Ok(IndexArray {
            length: count_u16("strip indices", indices.len())?,
            indices,
        })
    }
}

impl IndexListNode {
    pub fn new(strips: Vec<Vec<u16>>) -> Result<Self> {
        let strip_count = count_u16("strips", strips.len())?;
        let strips = strips
            .into_iter()
            .map(IndexArray::new)
            .collect::<Result<Vec<_>>>()?;

        let mut node = IndexListNode {
            flags: STRIP_FLAGS,
            offset_to_next: 0,
            strip_count,
            strips,
        };
        node.offset_to_next = count_u16("strip halfwords", node.strips_size() / 2 + 1)?;
        Ok(node)
    }

    pub fn terminator() -> Self {
        IndexListNode {
            flags: NODE_TERMINATOR,
            ..Default::default()
        }
    }

    pub fn is_terminator(&self) -> bool {
        self.flags & 0xFF == NODE_TERMINATOR
    }

    /// Bytes taken by the strips following the fixed portion
    pub fn strips_size(&self) -> usize {
        self.strips.iter().map(|s| 2 + 2 * s.indices.len()).sum()
    }

    /// Bytes from the start of this node to the next one
    pub fn stride(&self) -> usize {
        4 + self.offset_to_next as usize * 2
    }
}

/// Write a vertex list holding a single node, followed by its terminator
pub fn write_vertex_list<A>(archive: &mut A, vertices: Vec<Vertex>) -> Result<Ptr32>
where
    A: Archive,
    Error: From<A::Error>,
{
    let node = VertexListNode::new(vertices)?;
    let ptr = archive.write(&node)?;
    archive.write(&VertexListNode::terminator())?;
    Ok(ptr)
}

/// Write an index list holding a single node of triangle strips, followed by its terminator.
///
/// Strips are made of 16-bit indices, the node is padded to keep the payload 4 byte aligned.
pub fn write_index_list<A>(archive: &mut A, strips: Vec<Vec<u16>>) -> Result<Ptr32>
where
    A: Archive,
    Error: From<A::Error>,
{
    let mut node = IndexListNode::new(strips)?;
    let end = archive.position() + IndexListNode::type_size() + node.strips_size();
    let padded = end % 4 != 0;
    if padded {
        node.offset_to_next += 1;
    }

    let ptr = archive.write(&node)?;
    if padded {
        archive.align(4)?;
    }
    archive.write(&IndexListNode::terminator())?;
    archive.align(4)?;
    Ok(ptr)
}

/// Read the nodes of a vertex list, the terminator excluded
#[instrument(level = "debug", skip(buf))]
pub fn read_vertex_list(buf: &Buffer, offset: usize) -> Result<Vec<VertexListNode>> {
    let mut nodes = Vec::new();
    let mut cursor = offset;
    loop {
        if cursor >= buf.len() {
            return Err(Error::MissingTerminator {
                what: "vertex",
                offset: cursor,
            });
        }
        let (node, _) = VertexListNode::deserialize_from(buf, cursor)?;
        if node.is_terminator() {
            break;
        }
        trace!(cursor, vertices = node.vertex_count, "vertex node");
        cursor += node.stride();
        nodes.push(node);
    }
    Ok(nodes)
}

/// Read the nodes of an index list, the terminator excluded
#[instrument(level = "debug", skip(buf))]
pub fn read_index_list(buf: &Buffer, offset: usize) -> Result<Vec<IndexListNode>> {
    let mut nodes = Vec::new();
    let mut cursor = offset;
    loop {
        if cursor >= buf.len() {
            return Err(Error::MissingTerminator {
                what: "index",
                offset: cursor,
            });
        }
        let (node, _) = IndexListNode::deserialize_from(buf, cursor)?;
        if node.is_terminator() {
            break;
        }
        trace!(cursor, strips = node.strip_count, "index node");
        cursor += node.stride();
        nodes.push(node);
    }
    Ok(nodes)
}
