use binrw::binread;
use serde_derive::Serialize;
use strum::{Display, EnumString};

use crate::{
    error::{PigError, Result},
    format::{CQuaternion, CVector3f, K_IDENT},
    util::read::{expect_ident, read_record, read_string, Reader},
};

/// Node kind used for object placement anchors rather than skeleton joints.
pub const K_NODE_KIND_ANCHOR: u8 = 0;

#[binread]
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Node {
    #[br(parse_with = read_string)]
    pub name: String,
    pub kind: u8,
    /// -1 for roots, otherwise an index into the same node table.
    pub parent_index: i16,
    pub position: CVector3f,
    pub rotation: CQuaternion,
    pub scale: CVector3f,
    pub length_hint: f32,
    pub reserved_pair: [u8; 2],
}

impl Node {
    #[inline]
    pub fn is_root(&self) -> bool { self.parent_index == -1 }

    #[inline]
    pub fn parent(&self) -> Option<usize> { usize::try_from(self.parent_index).ok() }

    #[inline]
    pub fn is_anchor(&self) -> bool { self.kind == K_NODE_KIND_ANCHOR }

    /// Rotation as (x, y, z, w) under the given reading of the stored components.
    pub fn rotation_with(&self, order: QuatOrder) -> [f32; 4] {
        let q = self.rotation;
        match order {
            QuatOrder::Xyzw => [q.x, q.y, q.z, q.w],
            QuatOrder::Zyxw => [q.z, q.y, q.x, q.w],
            QuatOrder::XyzNegW => [q.x, q.y, q.z, -q.w],
        }
    }
}

/// How consumers reassemble the stored rotation. Tools in the wild disagree,
/// so this is left to the caller.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Display, EnumString)]
pub enum QuatOrder {
    /// Stored components are (x, y, z, w).
    #[default]
    #[strum(serialize = "xyzw")]
    Xyzw,
    /// Stored components are (z, y, x, w).
    #[strum(serialize = "zyxw")]
    Zyxw,
    /// Stored as (x, y, z, w) with the scalar part negated.
    #[strum(serialize = "xyz-negw")]
    XyzNegW,
}

/// Reads the node count and node table. Parents must precede their children.
pub fn read_nodes(reader: &mut Reader) -> Result<Vec<Node>> {
    let count: u16 = read_record(reader, "node count")?;
    let mut nodes = Vec::with_capacity(count as usize);
    for index in 0..count as usize {
        let offset = reader.position();
        expect_ident(reader, "node", K_IDENT)?;
        let node: Node = read_record(reader, "node")?;
        if node.parent_index != -1 && node.parent().map_or(true, |parent| parent >= index) {
            return Err(PigError::DanglingReference {
                what: "node parent",
                offset,
                index: node.parent_index as i64,
                len: index,
            });
        }
        log::trace!("Node {index} '{}' parent {}", node.name, node.parent_index);
        nodes.push(node);
    }
    Ok(nodes)
}
