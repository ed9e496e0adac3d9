use clap::Parser;
use std::path::PathBuf;

struct DefaultArgs;

impl DefaultArgs {
    pub const DIR: &'static str = ".";
}

/// Pack directory trees into one checksummed block stream.
#[derive(Clone, Parser)]
#[command(name = "packstream")]
#[command(about = "Archive directories into a checksummed block stream (stdout by default).")]
pub struct Cli {
    /// Directories to archive. Must be relative. Default: current directory.
    #[arg(value_name = "DIR", default_value = DefaultArgs::DIR)]
    pub dirs: Vec<PathBuf>,

    /// Archive file to write. `-` writes to stdout.
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Exclude patterns (glob syntax). Can specify multiple: -e pattern1 pattern2 pattern3
    #[arg(long, short = 'e', num_args = 1..)]
    pub exclude: Vec<String>,

    /// Verbose output: log every archived path.
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,

    /// Directory scanner threads.
    #[arg(long)]
    pub dir_workers: Option<usize>,

    /// File reader threads.
    #[arg(long)]
    pub file_workers: Option<usize>,

    /// Capacity of the directory queue.
    #[arg(long)]
    pub dir_queue: Option<usize>,

    /// Capacity of the file queue.
    #[arg(long)]
    pub file_queue: Option<usize>,

    /// Capacity of the block queue in front of the writer.
    #[arg(long)]
    pub block_queue: Option<usize>,

    /// Bytes per data block (max 65535).
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Read FIFOs, sockets and device nodes like regular files instead of skipping them.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub read_special: Option<bool>,
}
