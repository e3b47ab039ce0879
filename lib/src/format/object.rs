use binrw::binread;
use serde_derive::Serialize;

use crate::{
    error::{PigError, Result},
    format::{mesh::Mesh, CAABox, K_IDENT},
    util::read::{expect_ident, read_record, Reader},
};

#[binread]
#[derive(Clone, Debug)]
struct SLodHeader {
    skinning: u16,
    bounds: CAABox,
    mesh_count: u16,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Lod {
    pub id: u8,
    /// Raw skinning value; any non-zero value enables skin data.
    pub skinning: u16,
    pub bounds: CAABox,
    pub meshes: Vec<Mesh>,
}

impl Lod {
    pub fn read(reader: &mut Reader) -> Result<Self> {
        let id: u8 = read_record(reader, "LOD id")?;
        expect_ident(reader, "LOD", K_IDENT)?;
        let header: SLodHeader = read_record(reader, "LOD header")?;
        let has_skinning = header.skinning != 0;
        log::trace!("LOD {id}: {} meshes, skinning {}", header.mesh_count, header.skinning);
        let meshes = (0..header.mesh_count)
            .map(|_| Mesh::read(reader, has_skinning))
            .collect::<Result<Vec<_>>>()?;
        Ok(Lod { id, skinning: header.skinning, bounds: header.bounds, meshes })
    }

    #[inline]
    pub fn has_skinning(&self) -> bool { self.skinning != 0 }
}

#[binread]
#[derive(Clone, Debug)]
struct SObjectHeader {
    node_index: u32,
    lod_count: u16,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Object {
    /// Node supplying the object's placement.
    pub node_index: u32,
    pub lods: Vec<Lod>,
}

impl Object {
    pub fn read(reader: &mut Reader, node_count: usize) -> Result<Self> {
        let offset = reader.position();
        expect_ident(reader, "object", K_IDENT)?;
        let header: SObjectHeader = read_record(reader, "object header")?;
        if header.node_index as usize >= node_count {
            return Err(PigError::DanglingReference {
                what: "object node",
                offset,
                index: header.node_index as i64,
                len: node_count,
            });
        }
        let lods = (0..header.lod_count).map(|_| Lod::read(reader)).collect::<Result<Vec<_>>>()?;
        Ok(Object { node_index: header.node_index, lods })
    }

    #[inline]
    pub fn node_index(&self) -> usize { self.node_index as usize }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::error::ErrorCategory;

    #[test]
    fn empty_lod() {
        let mut data = vec![3u8];
        data.extend_from_slice(&K_IDENT.to_le_bytes());
        data.extend_from_slice(&2u16.to_le_bytes());
        for v in [-1.0f32, -2.0, -3.0, 1.0, 2.0, 3.0] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        data.extend_from_slice(&0u16.to_le_bytes());
        let lod = Lod::read(&mut Cursor::new(&data[..])).unwrap();
        assert_eq!(lod.id, 3);
        assert_eq!(lod.skinning, 2);
        assert!(lod.has_skinning());
        assert_eq!(lod.bounds.min.z, -3.0);
        assert_eq!(lod.bounds.max.y, 2.0);
        assert!(lod.meshes.is_empty());
    }

    #[test]
    fn lod_ident_follows_id() {
        let mut data = vec![0u8];
        data.extend_from_slice(&7u32.to_le_bytes());
        let err = Lod::read(&mut Cursor::new(&data[..])).unwrap_err();
        assert!(matches!(err, PigError::BadIdent { record: "LOD", offset: 1, found: 7, .. }));
    }

    fn object_bytes(node_index: u32) -> Vec<u8> {
        let mut data = K_IDENT.to_le_bytes().to_vec();
        data.extend_from_slice(&node_index.to_le_bytes());
        data.extend_from_slice(&0u16.to_le_bytes());
        data
    }

    #[test]
    fn object_node_bounds() {
        let object = Object::read(&mut Cursor::new(&object_bytes(1)[..]), 2).unwrap();
        assert_eq!(object.node_index(), 1);
        assert!(object.lods.is_empty());

        let err = Object::read(&mut Cursor::new(&object_bytes(2)[..]), 2).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::DanglingReference);
        assert!(matches!(
            err,
            PigError::DanglingReference { what: "object node", index: 2, len: 2, .. }
        ));
    }
}
