//! Pipeline context: shared settings, statistics and the queues connecting the worker pools.

use crossbeam_channel::{Receiver, Sender, bounded};
use glob::Pattern;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;

use crate::engine::tools::compile_patterns;
use crate::utils::config::effective_chunk_size;
use crate::{ArchiveOpts, ArchiveSummary, Block, SpecialFiles};

use super::counter::PendingPath;
use super::error_handler::FirstError;

/// Started pipeline threads, tagged with their role for panic reports.
pub type WorkerHandles = Vec<(&'static str, JoinHandle<()>)>;

/// Counters bumped by the workers. Relaxed ordering: they are only read after every worker
/// has been joined.
#[derive(Debug, Default)]
pub struct PipelineStats {
    pub directories: AtomicU64,
    pub files: AtomicU64,
    pub bytes: AtomicU64,
    pub skipped: AtomicU64,
    pub truncated: AtomicU64,
}

impl PipelineStats {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_bytes(&self, n: u64) {
        self.bytes.fetch_add(n, Ordering::Relaxed);
    }

    pub fn summary(&self, blocks: u64, checksums: u64) -> ArchiveSummary {
        ArchiveSummary {
            directories: self.directories.load(Ordering::Relaxed),
            files: self.files.load(Ordering::Relaxed),
            blocks,
            checksums,
            bytes: self.bytes.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            truncated: self.truncated.load(Ordering::Relaxed),
        }
    }
}

/// Read-only settings plus the shared error cell and statistics. Built once when the run
/// starts and shared by every worker behind an `Arc`.
pub struct PipelineContext {
    /// Exclude patterns, compiled once and fixed for the whole run.
    pub exclude: Vec<Pattern>,
    /// Exact paths never archived (the archive output itself and its temp file).
    pub skip_paths: Vec<PathBuf>,
    pub special_files: SpecialFiles,
    pub chunk_size: usize,
    pub first_error: FirstError,
    pub stats: PipelineStats,
}

impl PipelineContext {
    pub fn new(opts: &ArchiveOpts, skip_paths: Vec<PathBuf>) -> Arc<Self> {
        Arc::new(Self {
            exclude: compile_patterns(&opts.exclude),
            skip_paths,
            special_files: opts.special_files,
            chunk_size: effective_chunk_size(opts.chunk_size),
            first_error: FirstError::default(),
            stats: PipelineStats::default(),
        })
    }
}

/// Queues created when a run starts. The unbounded staging queue lives on the
/// [`Archiver`](super::Archiver) instead, since roots can be registered before the run.
///
/// Closing is driven by sender ownership: `close_tx` is dropped by the terminator, the
/// dispatcher then drops the only `dir_tx`, scanners exit and drop their `file_tx` clones,
/// readers exit and drop their `block_tx` clones, and the writer's receive loop ends.
pub struct PipelineChannels {
    pub dir_tx: Sender<PendingPath>,
    pub dir_rx: Receiver<PendingPath>,
    pub file_tx: Sender<PendingPath>,
    pub file_rx: Receiver<PendingPath>,
    pub block_tx: Sender<Block>,
    pub block_rx: Receiver<Block>,
    pub close_tx: Sender<()>,
    pub close_rx: Receiver<()>,
}

pub fn create_pipeline_channels(opts: &ArchiveOpts) -> PipelineChannels {
    let (dir_tx, dir_rx) = bounded::<PendingPath>(opts.dir_queue_size.max(1));
    let (file_tx, file_rx) = bounded::<PendingPath>(opts.file_queue_size.max(1));
    let (block_tx, block_rx) = bounded::<Block>(opts.block_queue_size.max(1));
    // Never sent on; disconnecting it is the close signal.
    let (close_tx, close_rx) = bounded::<()>(0);

    PipelineChannels {
        dir_tx,
        dir_rx,
        file_tx,
        file_rx,
        block_tx,
        block_rx,
        close_tx,
        close_rx,
    }
}
