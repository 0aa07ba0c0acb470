//! Ninja structures stored in the payloads of *Phantasy Star Online* model containers.
//!
//! ## Modules
//!
//! | Module   | Contents                                                             |
//! |----------|----------------------------------------------------------------------|
//! | [`nj`]   | Strip meshes: vertex list nodes, index list nodes and `Mesh`         |
//! | [`njcm`] | Mesh tree nodes and their evaluation flags                           |
//! | [`njtl`] | Texture name lists                                                   |
//! | [`tam`]  | Texture animation metadata, the only big-endian format of the set    |
//!
//! All structures are declared with [`pso_schema::serializable!`], so they can be written into
//! any [`pso_schema::Archive`]: a REL file or an IFF chunk.

pub mod error;
pub mod nj;
pub mod njcm;
pub mod njtl;
pub mod tam;

pub use nj::{IndexArray, IndexListNode, Mesh, Vertex, VertexListNode};
pub use njcm::{EvalFlags, MeshTree, MeshTreeNode};
pub use njtl::{AlignedString, TextureList, TextureListEntry};
