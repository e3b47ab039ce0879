use std::io::Cursor;

use serde_derive::Serialize;

use crate::{
    error::Result,
    format::{
        node::{read_nodes, Node},
        object::Object,
        K_IDENT,
    },
    util::read::{expect_ident, read_record, remaining, skip, Reader},
};

/// A fully decoded PIG model: node hierarchy plus the objects placed on it.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Document {
    pub nodes: Vec<Node>,
    pub objects: Vec<Object>,
}

impl Document {
    /// Decodes a complete document held in `data`.
    pub fn read(data: &[u8]) -> Result<Self> {
        let mut reader: Reader = Cursor::new(data);
        expect_ident(&mut reader, "document", K_IDENT)?;
        let nodes = read_nodes(&mut reader)?;
        skip(&mut reader, 1, "document reserved byte")?;
        let object_count: u16 = read_record(&mut reader, "object count")?;
        let objects = (0..object_count)
            .map(|_| Object::read(&mut reader, nodes.len()))
            .collect::<Result<Vec<_>>>()?;
        let trailing = remaining(&reader);
        if trailing != 0 {
            log::debug!("{trailing} trailing bytes after document");
        }
        log::debug!("Decoded {} nodes, {} objects", nodes.len(), objects.len());
        Ok(Document { nodes, objects })
    }

    /// Indices of the nodes directly parented to `index`.
    pub fn children_of(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(move |(_, node)| node.parent() == Some(index))
            .map(|(i, _)| i)
    }

    /// Node an object is placed on. Always present for decoded documents.
    #[inline]
    pub fn object_anchor(&self, object: &Object) -> Option<&Node> {
        self.nodes.get(object.node_index())
    }

    pub fn root_nodes(&self) -> impl Iterator<Item = usize> + '_ {
        self.nodes.iter().enumerate().filter(|(_, node)| node.is_root()).map(|(i, _)| i)
    }

    pub fn mesh_count(&self) -> usize {
        self.objects.iter().flat_map(|o| &o.lods).map(|l| l.meshes.len()).sum()
    }
}

/// Decodes one PIG document from an in-memory buffer.
#[inline]
pub fn decode(data: &[u8]) -> Result<Document> { Document::read(data) }

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorCategory, PigError};

    fn node(parent: i16) -> Vec<u8> {
        let mut out = K_IDENT.to_le_bytes().to_vec();
        out.extend_from_slice(&[1, 0, b'n', 0]);
        out.extend_from_slice(&parent.to_le_bytes());
        for v in [0.0f32, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 0.0] {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out.extend_from_slice(&[0, 0]);
        out
    }

    fn document(parents: &[i16], object_nodes: &[u32]) -> Vec<u8> {
        let mut out = K_IDENT.to_le_bytes().to_vec();
        out.extend_from_slice(&(parents.len() as u16).to_le_bytes());
        for &parent in parents {
            out.extend(node(parent));
        }
        out.push(0xAA);
        out.extend_from_slice(&(object_nodes.len() as u16).to_le_bytes());
        for &index in object_nodes {
            out.extend_from_slice(&K_IDENT.to_le_bytes());
            out.extend_from_slice(&index.to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes());
        }
        out
    }

    #[test]
    fn hierarchy_helpers() {
        let data = document(&[-1, 0, 0, 1, -1], &[3, 4]);
        let doc = decode(&data).unwrap();
        assert_eq!(doc.nodes.len(), 5);
        assert_eq!(doc.objects.len(), 2);
        assert_eq!(doc.children_of(0).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(doc.children_of(1).collect::<Vec<_>>(), vec![3]);
        assert_eq!(doc.children_of(3).count(), 0);
        assert_eq!(doc.root_nodes().collect::<Vec<_>>(), vec![0, 4]);
        let anchor = doc.object_anchor(&doc.objects[0]).unwrap();
        assert_eq!(anchor.parent_index, 1);
        assert_eq!(doc.mesh_count(), 0);
    }

    #[test]
    fn empty_document() {
        let doc = decode(&document(&[], &[])).unwrap();
        assert_eq!(doc, Document::default());
    }

    #[test]
    fn document_ident() {
        let mut data = document(&[-1], &[]);
        data[0] = 101;
        let err = decode(&data).unwrap_err();
        assert!(matches!(err, PigError::BadIdent { record: "document", offset: 0, found: 101, .. }));
    }

    #[test]
    fn dangling_object_node() {
        let err = decode(&document(&[-1], &[1])).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::DanglingReference);
    }

    #[test]
    fn missing_object_table() {
        let data = document(&[-1], &[]);
        let err = decode(&data[..data.len() - 2]).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::TruncatedInput);
    }
}
