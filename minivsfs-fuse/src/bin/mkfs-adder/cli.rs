use clap::Parser;
use std::path::PathBuf;

/// Copy one host file into the root directory of a MiniVSFS image
#[derive(Parser)]
#[command(version)]
pub struct Cli {
    /// Existing image to read
    #[arg(long)]
    pub input: PathBuf,

    /// Where to write the modified image, may equal `--input`
    #[arg(long)]
    pub output: PathBuf,

    /// Host file to add, stored under its base name
    #[arg(long)]
    pub file: PathBuf,
}
