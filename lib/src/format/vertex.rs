use binrw::binread;
use bitflags::bitflags;
use indexmap::IndexMap;
use serde_derive::Serialize;
use strum::{Display, IntoStaticStr};
use zerocopy::byteorder::{LittleEndian, F32, I16};

use crate::{
    error::Result,
    format::CVector3f,
    util::read::{read_vec, Reader},
};

bitflags! {
    /// Vertex channels present in a mesh. Unnamed bits are kept as-is.
    #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
    #[serde(transparent)]
    pub struct VertexFormat: u32 {
        const POSITION = 0x1;
        const NORMAL = 0x2;
        const TANGENT = 0x4;
        const UNK_0X8 = 0x8;
        const UNK_0X10 = 0x10;
        const UNK_0X20 = 0x20;
        const UNK_0X40 = 0x40;
        const UV1 = 0x80;
        const UV2 = 0x100;
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Display, IntoStaticStr, Serialize)]
pub enum VertexChannel {
    #[strum(serialize = "POSITION")]
    #[serde(rename = "POSITION")]
    Position,
    #[strum(serialize = "NORMAL")]
    #[serde(rename = "NORMAL")]
    Normal,
    #[strum(serialize = "TANGENT")]
    #[serde(rename = "TANGENT")]
    Tangent,
    #[strum(serialize = "UNK0x8")]
    #[serde(rename = "UNK0x8")]
    Unk0x8,
    #[strum(serialize = "UNK0x40")]
    #[serde(rename = "UNK0x40")]
    Unk0x40,
    #[strum(serialize = "UV1")]
    #[serde(rename = "UV1")]
    Uv1,
    #[strum(serialize = "UV2")]
    #[serde(rename = "UV2")]
    Uv2,
    /// Per-vertex skinning bytes; byte 7 is the bone index.
    #[strum(serialize = "RIG_RELATED")]
    #[serde(rename = "RIG_RELATED")]
    RigRelated,
}

/// Format bit and channel, in stream order.
const FORMAT_CHANNELS: [(VertexFormat, VertexChannel); 7] = [
    (VertexFormat::POSITION, VertexChannel::Position),
    (VertexFormat::NORMAL, VertexChannel::Normal),
    (VertexFormat::TANGENT, VertexChannel::Tangent),
    (VertexFormat::UNK_0X8, VertexChannel::Unk0x8),
    (VertexFormat::UNK_0X40, VertexChannel::Unk0x40),
    (VertexFormat::UV1, VertexChannel::Uv1),
    (VertexFormat::UV2, VertexChannel::Uv2),
];

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub enum ElementType {
    F32,
    U8,
}

/// Decoded layout of one vertex channel.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ChannelDesc {
    pub channel: VertexChannel,
    pub element: ElementType,
    pub count: usize,
}

impl ChannelDesc {
    pub fn for_channel(channel: VertexChannel) -> Self {
        let (element, count) = match channel {
            VertexChannel::Position | VertexChannel::Normal => (ElementType::F32, 3),
            VertexChannel::Tangent => (ElementType::F32, 4),
            VertexChannel::Unk0x8 | VertexChannel::Unk0x40 => (ElementType::U8, 4),
            VertexChannel::Uv1 | VertexChannel::Uv2 => (ElementType::F32, 2),
            VertexChannel::RigRelated => (ElementType::U8, 8),
        };
        Self { channel, element, count }
    }

    /// Encoded bytes per vertex in the geometry payload.
    pub fn stream_stride(&self, packed: bool) -> usize {
        match self.channel {
            VertexChannel::Position if packed => 8,
            VertexChannel::Position => 12,
            VertexChannel::Normal
            | VertexChannel::Tangent
            | VertexChannel::Unk0x8
            | VertexChannel::Unk0x40 => 4,
            VertexChannel::Uv1 | VertexChannel::Uv2 | VertexChannel::RigRelated => 8,
        }
    }
}

/// Ordered vertex record layout for one mesh.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct VertexSchema {
    pub channels: Vec<ChannelDesc>,
}

impl VertexSchema {
    pub fn resolve(format: VertexFormat, has_skinning: bool) -> Self {
        let mut channels: Vec<ChannelDesc> = FORMAT_CHANNELS
            .iter()
            .filter(|(bit, _)| format.contains(*bit))
            .map(|&(_, channel)| ChannelDesc::for_channel(channel))
            .collect();
        if has_skinning {
            channels.push(ChannelDesc::for_channel(VertexChannel::RigRelated));
        }
        Self { channels }
    }

    #[inline]
    pub fn len(&self) -> usize { self.channels.len() }

    #[inline]
    pub fn is_empty(&self) -> bool { self.channels.is_empty() }

    pub fn contains(&self, channel: VertexChannel) -> bool {
        self.channels.iter().any(|c| c.channel == channel)
    }

    pub fn stream_stride(&self, packed: bool) -> usize {
        self.channels.iter().map(|c| c.stream_stride(packed)).sum()
    }
}

/// Affine transform applied to packed positions.
#[binread]
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Quantization {
    pub offset: CVector3f,
    pub scale: CVector3f,
}

impl Default for Quantization {
    fn default() -> Self { Self { offset: CVector3f::ZERO, scale: CVector3f::ONE } }
}

impl Quantization {
    #[inline]
    pub fn dequantize(&self, raw: [i16; 3]) -> [f32; 3] {
        let unit = |v: i16| v as f32 / 32767.0;
        [
            unit(raw[0]) * self.scale.x + self.offset.x,
            unit(raw[1]) * self.scale.y + self.offset.y,
            unit(raw[2]) * self.scale.z + self.offset.z,
        ]
    }
}

#[inline]
fn snorm8(v: i8) -> f32 { v as f32 / 127.0 }

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeData {
    Float2(Vec<[f32; 2]>),
    Float3(Vec<[f32; 3]>),
    Float4(Vec<[f32; 4]>),
    Byte4(Vec<[u8; 4]>),
    Byte8(Vec<[u8; 8]>),
}

impl AttributeData {
    pub fn len(&self) -> usize {
        match self {
            AttributeData::Float2(v) => v.len(),
            AttributeData::Float3(v) => v.len(),
            AttributeData::Float4(v) => v.len(),
            AttributeData::Byte4(v) => v.len(),
            AttributeData::Byte8(v) => v.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

/// Vertex records stored column-wise, one array per channel in schema order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Vertices {
    pub count: usize,
    pub attributes: IndexMap<VertexChannel, AttributeData>,
}

impl Vertices {
    #[inline]
    pub fn len(&self) -> usize { self.count }

    #[inline]
    pub fn is_empty(&self) -> bool { self.count == 0 }

    #[inline]
    pub fn get(&self, channel: VertexChannel) -> Option<&AttributeData> {
        self.attributes.get(&channel)
    }

    pub fn channels(&self) -> impl Iterator<Item = VertexChannel> + '_ {
        self.attributes.keys().copied()
    }

    pub fn float2(&self, channel: VertexChannel) -> Option<&[[f32; 2]]> {
        match self.get(channel)? {
            AttributeData::Float2(v) => Some(v),
            _ => None,
        }
    }

    pub fn float3(&self, channel: VertexChannel) -> Option<&[[f32; 3]]> {
        match self.get(channel)? {
            AttributeData::Float3(v) => Some(v),
            _ => None,
        }
    }

    pub fn float4(&self, channel: VertexChannel) -> Option<&[[f32; 4]]> {
        match self.get(channel)? {
            AttributeData::Float4(v) => Some(v),
            _ => None,
        }
    }

    pub fn byte4(&self, channel: VertexChannel) -> Option<&[[u8; 4]]> {
        match self.get(channel)? {
            AttributeData::Byte4(v) => Some(v),
            _ => None,
        }
    }

    pub fn byte8(&self, channel: VertexChannel) -> Option<&[[u8; 8]]> {
        match self.get(channel)? {
            AttributeData::Byte8(v) => Some(v),
            _ => None,
        }
    }
}

/// Reads every channel of `schema` from the geometry payload, in schema order.
pub fn read_vertices(
    reader: &mut Reader,
    schema: &VertexSchema,
    count: usize,
    packed: bool,
    quantization: &Quantization,
) -> Result<Vertices> {
    let mut attributes = IndexMap::with_capacity(schema.len());
    for desc in &schema.channels {
        let data = match desc.channel {
            VertexChannel::Position if packed => {
                let raw: Vec<[I16<LittleEndian>; 4]> = read_vec(reader, count, "packed positions")?;
                AttributeData::Float3(
                    raw.iter()
                        .map(|p| quantization.dequantize([p[0].get(), p[1].get(), p[2].get()]))
                        .collect(),
                )
            }
            VertexChannel::Position => {
                let raw: Vec<[F32<LittleEndian>; 3]> = read_vec(reader, count, "positions")?;
                AttributeData::Float3(raw.iter().map(|p| p.map(|v| v.get())).collect())
            }
            VertexChannel::Normal => {
                let raw: Vec<[i8; 4]> = read_vec(reader, count, "normals")?;
                AttributeData::Float3(
                    raw.iter().map(|n| [snorm8(n[0]), snorm8(n[1]), snorm8(n[2])]).collect(),
                )
            }
            VertexChannel::Tangent => {
                let raw: Vec<[i8; 4]> = read_vec(reader, count, "tangents")?;
                AttributeData::Float4(raw.iter().map(|t| t.map(snorm8)).collect())
            }
            VertexChannel::Unk0x8 | VertexChannel::Unk0x40 => {
                AttributeData::Byte4(read_vec(reader, count, "vertex data")?)
            }
            VertexChannel::Uv1 | VertexChannel::Uv2 => {
                let raw: Vec<[F32<LittleEndian>; 2]> = read_vec(reader, count, "texture coords")?;
                AttributeData::Float2(raw.iter().map(|uv| uv.map(|v| v.get())).collect())
            }
            VertexChannel::RigRelated => {
                AttributeData::Byte8(read_vec(reader, count, "rig data")?)
            }
        };
        attributes.insert(desc.channel, data);
    }
    Ok(Vertices { count, attributes })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn schema_order() {
        let format = VertexFormat::UV1 | VertexFormat::NORMAL | VertexFormat::POSITION;
        let schema = VertexSchema::resolve(format, false);
        assert_eq!(schema.channels, vec![
            ChannelDesc { channel: VertexChannel::Position, element: ElementType::F32, count: 3 },
            ChannelDesc { channel: VertexChannel::Normal, element: ElementType::F32, count: 3 },
            ChannelDesc { channel: VertexChannel::Uv1, element: ElementType::F32, count: 2 },
        ]);

        let skinned = VertexSchema::resolve(format, true);
        assert_eq!(skinned.len(), 4);
        assert_eq!(skinned.channels[..3], schema.channels[..]);
        assert_eq!(skinned.channels[3], ChannelDesc {
            channel: VertexChannel::RigRelated,
            element: ElementType::U8,
            count: 8,
        });
    }

    #[test]
    fn reserved_bits_have_no_channel() {
        let format = VertexFormat::from_bits_retain(0x10 | 0x20 | 0x8000);
        assert!(VertexSchema::resolve(format, false).is_empty());
        assert_eq!(format.bits(), 0x8030);
    }

    #[test]
    fn full_schema_strides() {
        let schema = VertexSchema::resolve(VertexFormat::all(), true);
        let names: Vec<&str> = schema.channels.iter().map(|c| c.channel.into()).collect();
        assert_eq!(names, [
            "POSITION",
            "NORMAL",
            "TANGENT",
            "UNK0x8",
            "UNK0x40",
            "UV1",
            "UV2",
            "RIG_RELATED"
        ]);
        assert_eq!(schema.stream_stride(true), 8 + 4 + 4 + 4 + 4 + 8 + 8 + 8);
        assert_eq!(schema.stream_stride(false), 12 + 4 + 4 + 4 + 4 + 8 + 8 + 8);
    }

    #[test]
    fn dequantize_extremes() {
        let q = Quantization { offset: CVector3f::ZERO, scale: CVector3f::new(2.0, 2.0, 2.0) };
        let max = q.dequantize([32767, 32767, 32767]);
        let min = q.dequantize([-32767, -32767, -32767]);
        for (hi, lo) in max.iter().zip(&min) {
            assert!((hi - 2.0).abs() < 1e-6);
            assert!((lo + 2.0).abs() < 1e-6);
        }
        let shifted = Quantization { offset: CVector3f::new(1.0, -1.0, 0.5), scale: CVector3f::ONE };
        assert_eq!(shifted.dequantize([0, 0, 0]), [1.0, -1.0, 0.5]);
        assert_eq!(Quantization::default().dequantize([32767, 0, -32767]), [1.0, 0.0, -1.0]);
    }

    #[test]
    fn packed_channels() {
        let schema = VertexSchema::resolve(
            VertexFormat::POSITION | VertexFormat::NORMAL | VertexFormat::TANGENT,
            false,
        );
        let mut data = Vec::new();
        for v in [32767i16, 0, -32767, 1234] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        data.extend_from_slice(&[127, 0x81, 0, 55]);
        data.extend_from_slice(&[0, 127, 0x81, 127]);
        let q = Quantization { offset: CVector3f::new(1.0, 1.0, 1.0), scale: CVector3f::ONE };
        let mut reader = Cursor::new(&data[..]);
        let vertices = read_vertices(&mut reader, &schema, 1, true, &q).unwrap();
        assert_eq!(reader.position(), data.len() as u64);
        assert_eq!(vertices.float3(VertexChannel::Position).unwrap(), &[[2.0, 1.0, 0.0]]);
        assert_eq!(vertices.float3(VertexChannel::Normal).unwrap(), &[[1.0, -1.0, 0.0]]);
        assert_eq!(vertices.float4(VertexChannel::Tangent).unwrap(), &[[0.0, 1.0, -1.0, 1.0]]);
    }

    #[test]
    fn unpacked_channels() {
        let schema = VertexSchema::resolve(
            VertexFormat::POSITION | VertexFormat::UNK_0X40 | VertexFormat::UV2,
            true,
        );
        let mut data = Vec::new();
        for v in [1.5f32, -2.0, 3.25] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        data.extend_from_slice(&[1, 2, 3, 4]);
        for v in [0.25f32, 0.75] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        data.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0, 5]);
        let mut reader = Cursor::new(&data[..]);
        let vertices =
            read_vertices(&mut reader, &schema, 1, false, &Quantization::default()).unwrap();
        assert_eq!(vertices.len(), 1);
        assert_eq!(
            vertices.channels().collect::<Vec<_>>(),
            [
                VertexChannel::Position,
                VertexChannel::Unk0x40,
                VertexChannel::Uv2,
                VertexChannel::RigRelated
            ]
        );
        assert_eq!(vertices.float3(VertexChannel::Position).unwrap(), &[[1.5, -2.0, 3.25]]);
        assert_eq!(vertices.byte4(VertexChannel::Unk0x40).unwrap(), &[[1, 2, 3, 4]]);
        assert_eq!(vertices.float2(VertexChannel::Uv2).unwrap(), &[[0.25, 0.75]]);
        assert_eq!(vertices.byte8(VertexChannel::RigRelated).unwrap()[0][7], 5);
        assert!(vertices.get(VertexChannel::Uv1).is_none());
    }
}
