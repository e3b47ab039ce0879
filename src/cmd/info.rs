use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use argh::FromArgs;
use piglib::{util::file::collect_pig_files, Document};
use rayon::prelude::*;

use crate::cmd::load_document;

#[derive(FromArgs, PartialEq, Eq, Debug)]
/// summarizes PIG files
#[argh(subcommand, name = "info")]
pub struct Args {
    #[argh(positional)]
    /// input files or directories
    inputs: Vec<PathBuf>,
}

#[derive(Debug, Default)]
struct Summary {
    nodes: usize,
    objects: usize,
    lods: usize,
    meshes: usize,
    vertices: usize,
    triangles: usize,
    skinned_meshes: usize,
}

impl Summary {
    fn of(doc: &Document) -> Self {
        let mut summary =
            Summary { nodes: doc.nodes.len(), objects: doc.objects.len(), ..Default::default() };
        for lod in doc.objects.iter().flat_map(|o| &o.lods) {
            summary.lods += 1;
            for mesh in &lod.meshes {
                summary.meshes += 1;
                summary.vertices += mesh.vertices.len();
                summary.triangles += mesh.faces.len();
                if mesh.skin.is_some() {
                    summary.skinned_meshes += 1;
                }
            }
        }
        summary
    }
}

fn inspect(path: &Path) -> Result<Summary> { Ok(Summary::of(&load_document(path)?)) }

pub fn run(args: Args) -> Result<()> {
    let files = collect_pig_files(&args.inputs)?;
    let results: Vec<(&PathBuf, Result<Summary>)> =
        files.par_iter().map(|path| (path, inspect(path))).collect();

    let mut failed = 0usize;
    for (path, result) in &results {
        match result {
            Ok(s) => log::info!(
                "{}: {} nodes, {} objects, {} LODs, {} meshes ({} skinned), {} vertices, {} triangles",
                path.display(),
                s.nodes,
                s.objects,
                s.lods,
                s.meshes,
                s.skinned_meshes,
                s.vertices,
                s.triangles
            ),
            Err(e) => {
                failed += 1;
                log::error!("{}: {e:#}", path.display());
            }
        }
    }
    if failed > 0 {
        bail!("{failed} of {} files failed to decode", results.len());
    }
    log::info!("Decoded {} files", results.len());
    Ok(())
}
