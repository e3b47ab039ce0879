use std::{
    fs::File,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use memmap2::{Mmap, MmapOptions};
use walkdir::WalkDir;

pub const PIG_EXTENSION: &str = "pig";

/// Opens a memory mapped file.
pub fn map_file<P: AsRef<Path>>(path: P) -> Result<Mmap> {
    let file = File::open(&path)
        .with_context(|| format!("Failed to open file '{}'", path.as_ref().display()))?;
    let map = unsafe { MmapOptions::new().map(&file) }
        .with_context(|| format!("Failed to mmap file: '{}'", path.as_ref().display()))?;
    Ok(map)
}

pub fn has_pig_extension(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case(PIG_EXTENSION))
}

/// Expands directories into the `.pig` files below them; plain files pass through as given.
pub fn collect_pig_files<P: AsRef<Path>>(inputs: &[P]) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for input in inputs {
        let input = input.as_ref();
        if !input.is_dir() {
            out.push(input.to_path_buf());
            continue;
        }
        let mut found = Vec::new();
        for entry in WalkDir::new(input) {
            let entry = entry
                .with_context(|| format!("Failed to walk directory '{}'", input.display()))?;
            if entry.file_type().is_file() && has_pig_extension(entry.path()) {
                found.push(entry.into_path());
            }
        }
        found.sort();
        out.append(&mut found);
    }
    Ok(out)
}
