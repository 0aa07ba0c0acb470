//! Mesh trees of `NJCM` chunks.
//!
//! Nodes reference their first child and their next sibling by pointer. A tree read from disk is
//! flattened into an arena where links are indices, so shared or looping links cannot recurse.

use bitflags::bitflags;
use indexmap::IndexSet;
use pso_schema::{serializable, Buffer, Ptr32, Serializable};
use tracing::{debug, instrument};

use crate::error::Result;
use crate::nj::Mesh;

bitflags! {
    /// Evaluation flags of a mesh tree node
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct EvalFlags: u32 {
        /// Translation is zero, `x`, `y` and `z` are ignored
        const UNIT_POS = 0x001;
        /// Rotation is zero
        const UNIT_ANG = 0x002;
        /// Scale is one
        const UNIT_SCL = 0x004;
        const HIDE = 0x008;
        /// Do not descend into the children
        const BREAK = 0x010;
        /// Rotations are applied in Z, X, Y order
        const ZXY_ANG = 0x020;
        const SKIP = 0x040;
        const SHAPE_SKIP = 0x080;
        const CLIP = 0x100;
        const MODIFIER = 0x200;
    }
}

serializable! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct MeshTreeNode {
        pub eval_flags: u32,
        pub mesh: Ptr32,
        pub x: f32,
        pub y: f32,
        pub z: f32,
        pub rot_x: i32,
        pub rot_y: i32,
        pub rot_z: i32,
        pub scale_x: f32,
        pub scale_y: f32,
        pub scale_z: f32,
        pub child: Ptr32,
        pub next: Ptr32,
    }
}

impl MeshTreeNode {
    /// Node with identity transform pointing at `mesh`
    pub fn identity(mesh: Ptr32) -> Self {
        MeshTreeNode {
            eval_flags: (EvalFlags::UNIT_POS | EvalFlags::UNIT_ANG | EvalFlags::UNIT_SCL).bits(),
            mesh,
            scale_x: 1.0,
            scale_y: 1.0,
            scale_z: 1.0,
            ..Default::default()
        }
    }

    /// Known flags, unknown bits are dropped
    pub fn flags(&self) -> EvalFlags {
        EvalFlags::from_bits_truncate(self.eval_flags)
    }

    pub fn set_flags(&mut self, flags: EvalFlags) {
        self.eval_flags = flags.bits();
    }
}

/// A node of a [`MeshTree`]
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    /// Offset the node was read from
    pub offset: usize,
    pub node: MeshTreeNode,
    pub mesh: Option<Mesh>,
    /// Index of the first child
    pub child: Option<usize>,
    /// Index of the next sibling
    pub next: Option<usize>,
}

/// Mesh tree flattened into an arena, the root being the first node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshTree {
    nodes: Vec<TreeNode>,
}

impl MeshTree {
    pub fn root(&self) -> Option<&TreeNode> {
        self.nodes.first()
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn get(&self, index: usize) -> Option<&TreeNode> {
        self.nodes.get(index)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Children of the node at `index`, following sibling links
    pub fn children(&self, index: usize) -> Children<'_> {
        Children {
            tree: self,
            cursor: self.get(index).and_then(|n| n.child),
            remaining: self.nodes.len(),
        }
    }
}

/// Iterator over the children of a tree node
pub struct Children<'a> {
    tree: &'a MeshTree,
    cursor: Option<usize>,
    remaining: usize,
}

impl<'a> Iterator for Children<'a> {
    type Item = (usize, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        // a sibling loop would never end otherwise
        self.remaining = self.remaining.checked_sub(1)?;
        let index = self.cursor?;
        let node = self.tree.get(index)?;
        self.cursor = node.next;
        Some((index, node))
    }
}

/// Read the mesh tree whose root node is at `offset`, along with the meshes it references.
///
/// Pointers are offsets into `buf`.
#[instrument(level = "debug", skip(buf))]
pub fn read_tree(buf: &Buffer, offset: usize) -> Result<MeshTree> {
    let mut offsets = IndexSet::new();
    offsets.insert(offset);

    let mut nodes = Vec::new();
    let mut index = 0;
    while let Some(&at) = offsets.get_index(index) {
        let (node, _) = MeshTreeNode::deserialize_from(buf, at)?;

        let mesh = match node.mesh {
            ptr if ptr.is_null() => None,
            ptr => Some(Mesh::deserialize_from(buf, ptr.offset())?.0),
        };
        let mut link = |ptr: Ptr32| (!ptr.is_null()).then(|| offsets.insert_full(ptr.offset()).0);
        let child = link(node.child);
        let next = link(node.next);

        nodes.push(TreeNode {
            offset: at,
            node,
            mesh,
            child,
            next,
        });
        index += 1;
    }

    debug!(nodes = nodes.len(), "read mesh tree");
    Ok(MeshTree { nodes })
}

#[cfg(test)]
mod test {
    use binrw::Endian;
    use pretty_assertions::assert_eq;
    use pso_schema::{Archive, Buffer, Ptr32, RelocatableBuffer, Serializable};
    use tracing_test::traced_test;

    use crate::error::Result;
    use crate::nj::Mesh;
    use crate::njcm::{read_tree, EvalFlags, MeshTreeNode};

    #[test]
    fn node_layout() -> Result<()> {
        assert_eq!(MeshTreeNode::type_size(), 52);
        assert_eq!(MeshTreeNode::schema().offset_of("child"), Some(44));

        let node = MeshTreeNode::identity(Ptr32(0x40));
        assert_eq!(
            node.flags(),
            EvalFlags::UNIT_POS | EvalFlags::UNIT_ANG | EvalFlags::UNIT_SCL
        );
        assert_eq!(node.nonnull_pointer_offsets()?, vec![4]);

        Ok(())
    }

    #[test]
    #[traced_test]
    fn read_tree_with_siblings() -> Result<()> {
        // offset 0 is NULL, keep it for a header
        let mut archive = RelocatableBuffer::new(Buffer::from_bytes(vec![0; 4], Endian::Little), 0);
        let mesh = archive.write(&Mesh {
            x: 1.0,
            ..Default::default()
        })?;

        // written leaves first so the root can point at them
        let second = archive.write(&MeshTreeNode::identity(Ptr32::NULL))?;
        let first = archive.write(&MeshTreeNode {
            next: second,
            ..MeshTreeNode::identity(mesh)
        })?;
        let root = archive.write(&MeshTreeNode {
            child: first,
            ..MeshTreeNode::identity(Ptr32::NULL)
        })?;

        let (buf, relocations) = archive.into_parts();
        assert_eq!(relocations.len(), 3);

        let tree = read_tree(&buf, root.offset())?;
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.root().map(|n| n.offset), Some(root.offset()));

        let children: Vec<_> = tree.children(0).map(|(_, n)| n.offset).collect();
        assert_eq!(children, vec![first.offset(), second.offset()]);
        assert_eq!(tree.get(1).and_then(|n| n.mesh.as_ref()).map(|m| m.x), Some(1.0));

        Ok(())
    }

    #[test]
    fn sibling_loop_is_finite() -> Result<()> {
        let mut archive = RelocatableBuffer::new(Buffer::new(Endian::Little), 0);
        let root = archive.write(&MeshTreeNode::identity(Ptr32::NULL))?;
        let child = archive.write(&MeshTreeNode::identity(Ptr32::NULL))?;
        let next = MeshTreeNode::schema().offset_of("next").unwrap();
        archive.patch_pointer(child.offset() + next, child)?;
        let root_child = MeshTreeNode::schema().offset_of("child").unwrap();
        archive.patch_pointer(root.offset() + root_child, child)?;

        let (buf, _) = archive.into_parts();
        let tree = read_tree(&buf, root.offset())?;
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.children(0).count(), 2);

        Ok(())
    }
}
