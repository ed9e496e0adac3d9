//! Public and internal types for the packstream API and pipeline.

use std::path::PathBuf;

use crate::utils::config::{FormatConsts, PipelineDefaults};

/// Owner, group and permission bits captured from an open handle.
///
/// `mode` is the raw Unix `st_mode` (file type and permission bits).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Ownership {
    pub uid: u32,
    pub gid: u32,
    pub mode: u32,
}

/// Wire tag of a block. The discriminant is the byte written to the stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BlockKind {
    Data = 0,
    StartOfFile = 1,
    EndOfFile = 2,
    Directory = 3,
    Checksum = 4,
}

impl BlockKind {
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(BlockKind::Data),
            1 => Some(BlockKind::StartOfFile),
            2 => Some(BlockKind::EndOfFile),
            3 => Some(BlockKind::Directory),
            4 => Some(BlockKind::Checksum),
            _ => None,
        }
    }
}

/// One record of the archive stream.
///
/// Blocks for a single file always arrive as `StartOfFile`, any number of `Data`, then
/// `EndOfFile`. Directories have no end marker; their children follow as independent blocks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Block {
    Directory { path: PathBuf, owner: Ownership },
    StartOfFile { path: PathBuf, owner: Ownership },
    /// One chunk of file content; never empty, never longer than the chunk size.
    Data { path: PathBuf, data: Vec<u8> },
    EndOfFile { path: PathBuf },
    /// Running CRC-64 over every byte written so far.
    Checksum(u64),
}

impl Block {
    pub fn kind(&self) -> BlockKind {
        match self {
            Block::Directory { .. } => BlockKind::Directory,
            Block::StartOfFile { .. } => BlockKind::StartOfFile,
            Block::Data { .. } => BlockKind::Data,
            Block::EndOfFile { .. } => BlockKind::EndOfFile,
            Block::Checksum(_) => BlockKind::Checksum,
        }
    }

    /// Path the block refers to. `None` for checksum blocks.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Block::Directory { path, .. }
            | Block::StartOfFile { path, .. }
            | Block::Data { path, .. }
            | Block::EndOfFile { path } => Some(path),
            Block::Checksum(_) => None,
        }
    }
}

/// What scanners do with entries that are neither regular files, directories nor symlinks
/// (FIFOs, sockets, device nodes).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SpecialFiles {
    /// Log a warning and leave the entry out of the archive.
    #[default]
    Skip,
    /// Hand the entry to the file readers as if it were a regular file.
    Read,
}

/// Counters collected while a run is in progress. Returned by
/// [`Archiver::run`](crate::pipeline::Archiver::run).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArchiveSummary {
    /// Directory blocks emitted.
    pub directories: u64,
    /// Files fully or partially archived (one per `StartOfFile`).
    pub files: u64,
    /// Blocks taken from the queue and written (checksum blocks excluded).
    pub blocks: u64,
    /// Checksum blocks written, the final one included.
    pub checksums: u64,
    /// Bytes of file content carried by data blocks.
    pub bytes: u64,
    /// Entries left out: open/stat failures, symlinks, special files. Exclusions are not counted.
    pub skipped: u64,
    /// Files whose content was cut short by a read error.
    pub truncated: u64,
}

/// Lib-only options for [`Archiver`](crate::pipeline::Archiver) and
/// [`archive_dirs`](crate::archive_dirs).
#[derive(Clone, Debug)]
pub struct ArchiveOpts {
    /// Directory scanner threads.
    pub dir_workers: usize,
    /// File reader threads.
    pub file_workers: usize,
    /// Capacity of the bounded directory queue fed by the staging dispatcher.
    pub dir_queue_size: usize,
    /// Capacity of the file queue between scanners and readers.
    pub file_queue_size: usize,
    /// Capacity of the block queue in front of the stream writer.
    pub block_queue_size: usize,
    /// Exclude patterns matched against the whole relative path (e.g. `src/target`, `*/*.log`).
    pub exclude: Vec<String>,
    /// Bytes per data block. Clamped to `1..=u16::MAX`.
    pub chunk_size: usize,
    /// Queue blocks between two checksum blocks.
    pub checksum_interval: u64,
    /// Handling of FIFOs, sockets and device nodes.
    pub special_files: SpecialFiles,
}

impl Default for ArchiveOpts {
    fn default() -> Self {
        Self {
            dir_workers: PipelineDefaults::DIR_WORKERS,
            file_workers: PipelineDefaults::FILE_WORKERS,
            dir_queue_size: PipelineDefaults::DIR_QUEUE_SIZE,
            file_queue_size: PipelineDefaults::FILE_QUEUE_SIZE,
            block_queue_size: PipelineDefaults::BLOCK_QUEUE_SIZE,
            exclude: Vec::new(),
            chunk_size: FormatConsts::CHUNK_SIZE,
            checksum_interval: FormatConsts::CHECKSUM_INTERVAL,
            special_files: SpecialFiles::Skip,
        }
    }
}

impl From<&ArchiveOpts> for Opts {
    fn from(o: &ArchiveOpts) -> Self {
        Opts {
            output: None,
            dir_workers: o.dir_workers,
            file_workers: o.file_workers,
            dir_queue_size: o.dir_queue_size,
            file_queue_size: o.file_queue_size,
            block_queue_size: o.block_queue_size,
            exclude: o.exclude.clone(),
            chunk_size: o.chunk_size,
            checksum_interval: o.checksum_interval,
            special_files: o.special_files,
            verbose: false,
        }
    }
}

/// Full options (CLI and config file). Use [`ArchiveOpts`] for lib.
#[derive(Clone, Debug)]
pub struct Opts {
    /// Archive destination. `None` writes to stdout.
    pub output: Option<PathBuf>,
    pub dir_workers: usize,
    pub file_workers: usize,
    pub dir_queue_size: usize,
    pub file_queue_size: usize,
    pub block_queue_size: usize,
    pub exclude: Vec<String>,
    pub chunk_size: usize,
    pub checksum_interval: u64,
    pub special_files: SpecialFiles,
    /// Trace every path at debug level.
    pub verbose: bool,
}

impl Default for Opts {
    fn default() -> Self {
        Opts::from(&ArchiveOpts::default())
    }
}

impl From<&Opts> for ArchiveOpts {
    fn from(o: &Opts) -> Self {
        ArchiveOpts {
            dir_workers: o.dir_workers,
            file_workers: o.file_workers,
            dir_queue_size: o.dir_queue_size,
            file_queue_size: o.file_queue_size,
            block_queue_size: o.block_queue_size,
            exclude: o.exclude.clone(),
            chunk_size: o.chunk_size,
            checksum_interval: o.checksum_interval,
            special_files: o.special_files,
        }
    }
}
