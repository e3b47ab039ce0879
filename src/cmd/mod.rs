pub mod convert;
pub mod dump;
pub mod info;

use std::path::Path;

use anyhow::{Context, Result};
use argh::FromArgs;
use piglib::{util::file::map_file, Document};

#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand)]
pub enum SubCommand {
    Convert(convert::Args),
    Dump(dump::Args),
    Info(info::Args),
}

/// Maps and decodes one PIG file.
pub fn load_document(path: &Path) -> Result<Document> {
    let data = map_file(path)?;
    piglib::decode(&data).with_context(|| format!("Failed to decode '{}'", path.display()))
}
