use std::{
    fs::File,
    io::{stdout, BufWriter, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use argh::FromArgs;

use crate::cmd::load_document;

#[derive(FromArgs, PartialEq, Eq, Debug)]
/// writes a decoded PIG file as JSON
#[argh(subcommand, name = "dump")]
pub struct Args {
    #[argh(positional)]
    /// input file
    input: PathBuf,
    #[argh(option, short = 'o')]
    /// output file (default: stdout)
    output: Option<PathBuf>,
}

pub fn run(args: Args) -> Result<()> {
    let doc = load_document(&args.input)?;
    let mut writer: BufWriter<Box<dyn Write>> = match &args.output {
        Some(path) => BufWriter::new(Box::new(
            File::create(path)
                .with_context(|| format!("Failed to create file '{}'", path.display()))?,
        )),
        None => BufWriter::new(Box::new(stdout().lock())),
    };
    serde_json::to_writer_pretty(&mut writer, &doc)?;
    writeln!(writer)?;
    writer.flush()?;
    if let Some(path) = &args.output {
        log::info!("Wrote {}", path.display());
    }
    Ok(())
}
