use clap::Parser;
use std::path::PathBuf;

/// Create an empty MiniVSFS image holding only the root directory
#[derive(Parser)]
#[command(version)]
pub struct Cli {
    /// Output image path
    #[arg(long)]
    pub image: PathBuf,

    /// Image size in KiB: 180..=4096, a multiple of 4
    #[arg(long)]
    pub size_kib: u64,

    /// Number of inodes: 128..=512
    #[arg(long)]
    pub inodes: u64,
}
