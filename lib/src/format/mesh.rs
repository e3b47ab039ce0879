use std::io::{Cursor, Read, Seek};

use binrw::{binread, binrw, BinRead, BinResult, Endian};
use bitflags::bitflags;
use serde_derive::Serialize;
use zerocopy::byteorder::{LittleEndian, I16};

use crate::{
    error::{PigError, Result},
    format::{
        faces::decode_faces,
        vertex::{read_vertices, Quantization, VertexChannel, VertexFormat, VertexSchema, Vertices},
        CMatrix4f, CVector3f, K_IDENT,
    },
    util::{
        compression::{decompress_buffer, CompressionMode, DecompressError},
        read::{
            align, expect_ident, read_record, read_slice, read_string, read_vec, remaining,
            skip_zero_words, Reader,
        },
    },
};

pub const K_TEXTURE_SLOT_COUNT: usize = 8;
/// Offset of the bone index inside a RIG_RELATED entry.
pub const K_RIG_BONE_INDEX_BYTE: usize = 7;

bitflags! {
    /// Mesh flags. Only bit 0 is understood; the rest are kept as-is.
    #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
    #[serde(transparent)]
    pub struct MeshFlags: u32 {
        const PACKED_VERTEX_DATA = 0x1;
    }
}

#[binread]
#[br(import(name_len: u16))]
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TextureSlot {
    #[br(count = name_len, map = |bytes: Vec<u8>| String::from_utf8_lossy(&bytes).into_owned())]
    pub name: String,
    pub unk_value: u16,
}

/// Reads the fixed table of texture slots. A zero name length marks an empty slot.
pub fn read_texture_slots<R: Read + Seek>(
    reader: &mut R,
    endian: Endian,
    _: (),
) -> BinResult<[Option<TextureSlot>; K_TEXTURE_SLOT_COUNT]> {
    let mut slots: [Option<TextureSlot>; K_TEXTURE_SLOT_COUNT] = Default::default();
    for slot in &mut slots {
        let name_len = u16::read_options(reader, endian, ())?;
        if name_len != 0 {
            *slot = Some(TextureSlot::read_options(reader, endian, (name_len,))?);
        }
    }
    Ok(slots)
}

#[binread]
#[derive(Clone, Debug)]
struct SMeshHeader {
    #[br(map = MeshFlags::from_bits_retain)]
    flags: MeshFlags,
    #[br(map = VertexFormat::from_bits_retain)]
    vertex_format: VertexFormat,
    pivot_point: CVector3f,
    #[br(if(flags.contains(MeshFlags::PACKED_VERTEX_DATA)))]
    quantization: Option<Quantization>,
    vertex_count: u16,
    face_count: u32,
    #[br(parse_with = read_string)]
    material_name: String,
    unk_value: u16,
    #[br(parse_with = read_texture_slots)]
    textures: [Option<TextureSlot>; K_TEXTURE_SLOT_COUNT],
}

#[binread]
#[derive(Clone, Debug)]
struct SBlockHeader {
    mode: u8,
    compressed_size: u32,
    decompressed_size: u32,
}

#[binread]
#[derive(Clone, Debug)]
struct SSkinHeader {
    unk0: u16,
    count: u16,
    unk1: u32,
}

/// Per-bone auxiliary record from the skin block.
#[binrw]
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SkinBone {
    pub values: [f32; 6],
    pub extra: [u16; 2],
}

const K_SKIN_BONE_SIZE: usize = 6 * 4 + 2 * 2;
const K_MATRIX_SIZE: usize = 16 * 4;

/// Skinning data stored after the geometry of every mesh in a skinned LOD.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SkinBlock {
    pub header_unk0: u16,
    pub header_unk1: u32,
    pub bones: Vec<SkinBone>,
    pub inverse_bind_matrices: Vec<CMatrix4f>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Mesh {
    pub flags: MeshFlags,
    pub vertex_format: VertexFormat,
    pub pivot_point: CVector3f,
    pub quantization: Quantization,
    pub vertex_count: u16,
    pub face_count: u32,
    pub material_name: String,
    pub unk_value: u16,
    pub textures: [Option<TextureSlot>; K_TEXTURE_SLOT_COUNT],
    pub vertices: Vertices,
    pub faces: Vec<[u32; 3]>,
    pub skin: Option<SkinBlock>,
}

impl Mesh {
    pub fn read(reader: &mut Reader, has_skinning: bool) -> Result<Self> {
        let offset = reader.position();
        expect_ident(reader, "mesh", K_IDENT)?;
        let header: SMeshHeader = read_record(reader, "mesh header")?;
        if header.face_count % 3 != 0 {
            return Err(PigError::InvalidFaceCount { offset, face_count: header.face_count });
        }

        align(reader, 4)?;
        let padding = skip_zero_words(reader)?;
        if padding > 0 {
            log::trace!("Skipped {padding} padding words before geometry block");
        }
        let geometry_offset = reader.position();
        let geometry = read_block(reader, "geometry block")?;
        let skin = if has_skinning { Some(read_skin_block(reader)?) } else { None };

        let packed = header.flags.contains(MeshFlags::PACKED_VERTEX_DATA);
        let quantization = header.quantization.unwrap_or_default();
        let schema = VertexSchema::resolve(header.vertex_format, has_skinning);
        let vertex_count = header.vertex_count as usize;
        let face_count = header.face_count as usize;
        let needed = schema.stream_stride(packed) * vertex_count + face_count * 2;
        if geometry.len() < needed {
            return Err(PigError::PayloadTooSmall {
                what: "geometry payload",
                offset: geometry_offset,
                needed: needed as u64,
                available: geometry.len() as u64,
            });
        }

        let mut geo = Cursor::new(&geometry[..]);
        let vertices = read_vertices(&mut geo, &schema, vertex_count, packed, &quantization)?;
        let deltas: Vec<I16<LittleEndian>> = read_vec(&mut geo, face_count, "face indices")?;
        let deltas: Vec<i16> = deltas.iter().map(|d| d.get()).collect();
        let faces = decode_faces(&deltas);
        if let Some(&index) = faces.iter().flatten().find(|&&i| i as usize >= vertex_count) {
            return Err(PigError::DanglingReference {
                what: "face vertex",
                offset: geometry_offset,
                index: index as i64,
                len: vertex_count,
            });
        }
        let trailing = remaining(&geo);
        if trailing > 0 {
            log::debug!("Ignoring {trailing} trailing bytes in geometry payload at {geometry_offset:#x}");
        }

        log::debug!(
            "Mesh '{}': {} vertices, {} triangles, format {:?}, flags {:?}",
            header.material_name,
            vertex_count,
            faces.len(),
            header.vertex_format,
            header.flags
        );
        Ok(Mesh {
            flags: header.flags,
            vertex_format: header.vertex_format,
            pivot_point: header.pivot_point,
            quantization,
            vertex_count: header.vertex_count,
            face_count: header.face_count,
            material_name: header.material_name,
            unk_value: header.unk_value,
            textures: header.textures,
            vertices,
            faces,
            skin,
        })
    }

    #[inline]
    pub fn is_packed(&self) -> bool { self.flags.contains(MeshFlags::PACKED_VERTEX_DATA) }

    /// Bone index byte of every vertex, when the mesh carries rig data.
    pub fn rig_bone_indices(&self) -> Option<Vec<u8>> {
        let rig = self.vertices.byte8(VertexChannel::RigRelated)?;
        Some(rig.iter().map(|entry| entry[K_RIG_BONE_INDEX_BYTE]).collect())
    }

    /// Distinct bone indices referenced by the mesh, in order of first use.
    pub fn bone_remap_table(&self) -> Option<Vec<u8>> {
        let mut seen = [false; 256];
        let mut table = Vec::new();
        for bone in self.rig_bone_indices()? {
            if !seen[bone as usize] {
                seen[bone as usize] = true;
                table.push(bone);
            }
        }
        Some(table)
    }
}

/// Reads one compressed block and returns its decompressed payload.
fn read_block(reader: &mut Reader, what: &'static str) -> Result<Vec<u8>> {
    let offset = reader.position();
    let header: SBlockHeader = read_record(reader, what)?;
    let Some(mode) = CompressionMode::from_tag(header.mode) else {
        return Err(PigError::UnknownCompressionMode { offset, mode: header.mode });
    };
    if !mode.is_supported() {
        return Err(PigError::Decompress { offset, source: DecompressError::Unsupported(mode) });
    }
    let data = read_slice(reader, header.compressed_size as u64, what)?;
    decompress_buffer(mode, data, header.decompressed_size as usize)
        .map_err(|source| PigError::Decompress { offset, source })
}

fn read_skin_block(reader: &mut Reader) -> Result<SkinBlock> {
    let header: SSkinHeader = read_record(reader, "skin header")?;
    let offset = reader.position();
    let payload = read_block(reader, "skin block")?;
    let count = header.count as usize;
    let needed = count * (K_SKIN_BONE_SIZE + K_MATRIX_SIZE);
    if payload.len() < needed {
        return Err(PigError::PayloadTooSmall {
            what: "skin payload",
            offset,
            needed: needed as u64,
            available: payload.len() as u64,
        });
    }
    let mut skin = Cursor::new(&payload[..]);
    let bones = (0..count)
        .map(|_| read_record::<SkinBone>(&mut skin, "skin bone"))
        .collect::<Result<Vec<_>>>()?;
    let inverse_bind_matrices = (0..count)
        .map(|_| read_record::<CMatrix4f>(&mut skin, "inverse bind matrix"))
        .collect::<Result<Vec<_>>>()?;
    Ok(SkinBlock {
        header_unk0: header.unk0,
        header_unk1: header.unk1,
        bones,
        inverse_bind_matrices,
    })
}
