use std::{
    collections::BTreeMap,
    fs::{self, DirBuilder, File},
    io::{BufWriter, Cursor},
    path::PathBuf,
};

use anyhow::{Context, Result};
use argh::FromArgs;
use binrw::BinWriterExt;
use gltf_json::{self as json, validation::USize64};
use json::validation::Checked::Valid;
use piglib::{
    format::{mesh::Mesh, node::QuatOrder, vertex::VertexChannel},
    Document,
};
use serde_json::json;

use crate::cmd::load_document;

#[derive(FromArgs, PartialEq, Eq, Debug)]
/// converts a PIG file to glTF
#[argh(subcommand, name = "convert")]
pub struct Args {
    #[argh(positional)]
    /// input file
    input: PathBuf,
    #[argh(positional)]
    /// output directory
    out_dir: PathBuf,
    #[argh(option, default = "0")]
    /// level of detail exported for every object
    lod: usize,
    #[argh(option, default = "QuatOrder::default()")]
    /// node rotation convention: xyzw, zyxw or xyz-negw
    quat_order: QuatOrder,
}

pub fn run(args: Args) -> Result<()> {
    let doc = load_document(&args.input)?;
    let stem = args.input.file_stem().and_then(|s| s.to_str()).unwrap_or("model").to_string();

    let mut builder = GltfBuilder::default();
    let mut json_meshes = Vec::new();
    // (anchor node, mesh index)
    let mut mesh_nodes = Vec::new();
    for (object_idx, object) in doc.objects.iter().enumerate() {
        let Some(lod) = object.lods.get(args.lod) else {
            log::warn!("Object {object_idx} has no LOD {}, skipping", args.lod);
            continue;
        };
        for (mesh_idx, mesh) in lod.meshes.iter().enumerate() {
            if mesh.vertices.is_empty() || mesh.faces.is_empty() {
                log::debug!("Skipping empty mesh {mesh_idx} of object {object_idx}");
                continue;
            }
            let name = format!("Object {object_idx} LOD {} mesh {mesh_idx}", lod.id);
            json_meshes.push(builder.mesh(mesh, name)?);
            mesh_nodes.push((object.node_index(), json_meshes.len() - 1));
        }
    }

    let (json_nodes, json_scene_nodes) = build_nodes(&doc, &mesh_nodes, args.quat_order);

    DirBuilder::new().recursive(true).create(&args.out_dir)?;
    let buffer = builder.buffer.into_inner();
    let mut json_buffers = Vec::new();
    if !buffer.is_empty() {
        let file_name = format!("{stem}.bin");
        fs::write(args.out_dir.join(&file_name), &buffer)?;
        json_buffers.push(json::Buffer {
            byte_length: buffer.len().into(),
            extensions: Default::default(),
            extras: Default::default(),
            name: None,
            uri: Some(file_name),
        });
    }

    let mesh_count = json_meshes.len();
    let json_root = json::Root {
        accessors: builder.accessors,
        animations: vec![],
        asset: Default::default(),
        buffers: json_buffers,
        buffer_views: builder.views,
        scene: Some(json::Index::new(0)),
        extensions: None,
        extras: Default::default(),
        extensions_used: vec![],
        extensions_required: vec![],
        cameras: vec![],
        images: vec![],
        materials: vec![],
        meshes: json_meshes,
        nodes: json_nodes,
        samplers: vec![],
        scenes: vec![json::Scene {
            extensions: Default::default(),
            extras: Default::default(),
            name: Some(stem.clone()),
            nodes: json_scene_nodes,
        }],
        skins: vec![],
        textures: vec![],
    };
    let out_path = args.out_dir.join(format!("{stem}.gltf"));
    let writer = BufWriter::new(
        File::create(&out_path)
            .with_context(|| format!("Failed to create file '{}'", out_path.display()))?,
    );
    json::serialize::to_writer_pretty(writer, &json_root)?;
    log::info!(
        "Wrote {} ({} nodes, {} meshes)",
        out_path.display(),
        doc.nodes.len(),
        mesh_count
    );
    Ok(())
}

/// Mirrors the node table, then hangs one extra node per exported mesh off its object's anchor.
fn build_nodes(
    doc: &Document,
    mesh_nodes: &[(usize, usize)],
    quat_order: QuatOrder,
) -> (Vec<json::Node>, Vec<json::Index<json::Node>>) {
    let mut children: Vec<Vec<json::Index<json::Node>>> = (0..doc.nodes.len())
        .map(|idx| doc.children_of(idx).map(|c| json::Index::new(c as u32)).collect())
        .collect();
    for (i, &(anchor, _)) in mesh_nodes.iter().enumerate() {
        children[anchor].push(json::Index::new((doc.nodes.len() + i) as u32));
    }

    let mut json_nodes = Vec::with_capacity(doc.nodes.len() + mesh_nodes.len());
    for (node, children) in doc.nodes.iter().zip(children) {
        json_nodes.push(json::Node {
            camera: None,
            children: if children.is_empty() { None } else { Some(children) },
            extensions: None,
            extras: None,
            matrix: None,
            mesh: None,
            name: Some(node.name.clone()),
            rotation: Some(json::scene::UnitQuaternion(node.rotation_with(quat_order))),
            scale: Some(node.scale.to_array()),
            translation: Some(node.position.to_array()),
            skin: None,
            weights: None,
        });
    }
    for &(_, mesh_idx) in mesh_nodes {
        json_nodes.push(json::Node {
            camera: None,
            children: None,
            extensions: None,
            extras: None,
            matrix: None,
            mesh: Some(json::Index::new(mesh_idx as u32)),
            name: None,
            rotation: None,
            scale: None,
            translation: None,
            skin: None,
            weights: None,
        });
    }
    let scene_nodes = doc.root_nodes().map(|idx| json::Index::new(idx as u32)).collect();
    (json_nodes, scene_nodes)
}

#[derive(Default)]
struct GltfBuilder {
    buffer: Cursor<Vec<u8>>,
    views: Vec<json::buffer::View>,
    accessors: Vec<json::Accessor>,
}

impl GltfBuilder {
    fn begin_view(&mut self) -> Result<u64> {
        while self.buffer.position() % 4 != 0 {
            self.buffer.write_le(&0u8)?;
        }
        Ok(self.buffer.position())
    }

    fn end_view(
        &mut self,
        start: u64,
        target: json::buffer::Target,
        name: String,
    ) -> json::Index<json::buffer::View> {
        self.views.push(json::buffer::View {
            buffer: json::Index::new(0),
            byte_length: USize64(self.buffer.position() - start),
            byte_offset: Some(USize64(start)),
            byte_stride: None,
            extensions: Default::default(),
            extras: Default::default(),
            name: Some(name),
            target: Some(Valid(target)),
        });
        json::Index::new(self.views.len() as u32 - 1)
    }

    fn accessor(
        &mut self,
        view: json::Index<json::buffer::View>,
        count: usize,
        component: json::accessor::ComponentType,
        type_: json::accessor::Type,
        bounds: Option<(json::Value, json::Value)>,
        name: String,
    ) -> json::Index<json::Accessor> {
        let (min, max) = match bounds {
            Some((min, max)) => (Some(min), Some(max)),
            None => (None, None),
        };
        self.accessors.push(json::Accessor {
            buffer_view: Some(view),
            byte_offset: None,
            count: USize64(count as u64),
            component_type: Valid(json::accessor::GenericComponentType(component)),
            extensions: None,
            extras: Default::default(),
            type_: Valid(type_),
            min,
            max,
            name: Some(name),
            normalized: false,
            sparse: None,
        });
        json::Index::new(self.accessors.len() as u32 - 1)
    }

    fn floats<const N: usize>(
        &mut self,
        values: &[[f32; N]],
        type_: json::accessor::Type,
        with_bounds: bool,
        name: String,
    ) -> Result<json::Index<json::Accessor>> {
        let start = self.begin_view()?;
        for v in values {
            self.buffer.write_le(v)?;
        }
        let view = self.end_view(start, json::buffer::Target::ArrayBuffer, name.clone());
        let bounds = with_bounds.then(|| {
            let mut min = [f32::INFINITY; N];
            let mut max = [f32::NEG_INFINITY; N];
            for v in values {
                for i in 0..N {
                    min[i] = min[i].min(v[i]);
                    max[i] = max[i].max(v[i]);
                }
            }
            let to_json = |a: [f32; N]| json::Value::Array(a.iter().map(|v| json!(v)).collect());
            (to_json(min), to_json(max))
        });
        let component = json::accessor::ComponentType::F32;
        Ok(self.accessor(view, values.len(), component, type_, bounds, name))
    }

    fn bytes4(&mut self, values: &[[u8; 4]], name: String) -> Result<json::Index<json::Accessor>> {
        let start = self.begin_view()?;
        for v in values {
            self.buffer.write_le(v)?;
        }
        let view = self.end_view(start, json::buffer::Target::ArrayBuffer, name.clone());
        let component = json::accessor::ComponentType::U8;
        Ok(self.accessor(view, values.len(), component, json::accessor::Type::Vec4, None, name))
    }

    fn indices(&mut self, faces: &[[u32; 3]], name: String) -> Result<json::Index<json::Accessor>> {
        let start = self.begin_view()?;
        for &index in faces.iter().flatten() {
            self.buffer.write_le(&u16::try_from(index)?)?;
        }
        let view = self.end_view(start, json::buffer::Target::ElementArrayBuffer, name.clone());
        let component = json::accessor::ComponentType::U16;
        Ok(self.accessor(view, faces.len() * 3, component, json::accessor::Type::Scalar, None, name))
    }

    fn mesh(&mut self, mesh: &Mesh, name: String) -> Result<json::Mesh> {
        use json::{accessor::Type, mesh::Semantic};

        let mut attributes = BTreeMap::new();
        for channel in mesh.vertices.channels() {
            let vertices = &mesh.vertices;
            let accessor_name = format!("{name} {channel}");
            let (semantic, accessor) = match channel {
                VertexChannel::Position => (
                    Semantic::Positions,
                    vertices.float3(channel).map(|v| self.floats(v, Type::Vec3, true, accessor_name)),
                ),
                VertexChannel::Normal => (
                    Semantic::Normals,
                    vertices.float3(channel).map(|v| self.floats(v, Type::Vec3, false, accessor_name)),
                ),
                VertexChannel::Tangent => (
                    Semantic::Tangents,
                    vertices.float4(channel).map(|v| self.floats(v, Type::Vec4, false, accessor_name)),
                ),
                VertexChannel::Uv1 | VertexChannel::Uv2 => (
                    Semantic::TexCoords(if channel == VertexChannel::Uv1 { 0 } else { 1 }),
                    vertices.float2(channel).map(|v| self.floats(v, Type::Vec2, false, accessor_name)),
                ),
                VertexChannel::Unk0x8 | VertexChannel::Unk0x40 => (
                    Semantic::Extras(channel.to_string().to_ascii_uppercase()),
                    vertices.byte4(channel).map(|v| self.bytes4(v, accessor_name)),
                ),
                // Skins are not exported
                VertexChannel::RigRelated => continue,
            };
            if let Some(accessor) = accessor.transpose()? {
                attributes.insert(Valid(semantic), accessor);
            }
        }
        let indices = self.indices(&mesh.faces, format!("{name} indices"))?;
        Ok(json::Mesh {
            extensions: None,
            extras: Default::default(),
            name: Some(name),
            primitives: vec![json::mesh::Primitive {
                attributes,
                extensions: None,
                extras: Default::default(),
                indices: Some(indices),
                material: None,
                mode: Default::default(),
                targets: None,
            }],
            weights: None,
        })
    }
}
