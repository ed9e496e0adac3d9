use crossbeam_channel::{Receiver, Sender, unbounded};
use log::debug;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::engine::tools::normalize_lexically;
use crate::engine::writer::{StreamWriter, drain_blocks};
use crate::error::ArchiveError;
use crate::utils::fd_limit::cap_workers_by_fd_limit;
use crate::{ArchiveOpts, ArchiveSummary, Block};

use super::context::{PipelineChannels, PipelineContext, WorkerHandles, create_pipeline_channels};
use super::counter::{PendingPath, WorkCounter};
use super::dispatcher::spawn_dispatcher;
use super::error_handler::{RunOutcome, check_run_result};
use super::reader::spawn_readers;
use super::scanner::{ScannerQueues, spawn_scanners};

/// Cloneable handle for registering root directories, including from another thread while
/// [`Archiver::run`] is in progress.
#[derive(Clone)]
pub struct RootRegistrar {
    counter: Arc<WorkCounter>,
    staging_tx: Sender<PendingPath>,
}

impl RootRegistrar {
    /// Queue `path` for archiving. Fails with [`ArchiveError::Closed`] once the run has
    /// drained all of its work.
    ///
    /// Absolute paths are accepted here and rejected by the scanner, which fails the run.
    pub fn add_dir(&self, path: impl Into<PathBuf>) -> Result<(), ArchiveError> {
        let unit = self.counter.try_begin().ok_or(ArchiveError::Closed)?;
        self.staging_tx
            .send(PendingPath {
                path: path.into(),
                unit,
            })
            .map_err(|_| ArchiveError::Closed)
    }
}

/// Packs directory trees into one block stream.
///
/// ```no_run
/// use packstream::{ArchiveOpts, Archiver};
///
/// let archiver = Archiver::new(ArchiveOpts::default());
/// archiver.add_dir("src")?;
/// let out = std::fs::File::create("src.pstr")?;
/// let summary = archiver.run(out)?;
/// println!("{} files", summary.files);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Archiver {
    opts: ArchiveOpts,
    skip_paths: Vec<PathBuf>,
    counter: Arc<WorkCounter>,
    staging_tx: Sender<PendingPath>,
    staging_rx: Receiver<PendingPath>,
}

impl Archiver {
    pub fn new(opts: ArchiveOpts) -> Self {
        let (staging_tx, staging_rx) = unbounded();
        Self {
            opts,
            skip_paths: Vec::new(),
            counter: WorkCounter::new(),
            staging_tx,
            staging_rx,
        }
    }

    /// Register a root directory. Must be relative.
    pub fn add_dir(&self, path: impl Into<PathBuf>) -> Result<(), ArchiveError> {
        self.registrar().add_dir(path)
    }

    pub fn registrar(&self) -> RootRegistrar {
        RootRegistrar {
            counter: Arc::clone(&self.counter),
            staging_tx: self.staging_tx.clone(),
        }
    }

    /// Never archive this exact path (compared after lexical normalization).
    pub fn skip_path(&mut self, path: &Path) {
        self.skip_paths.push(normalize_lexically(path));
    }

    /// Run the pipeline to completion and write the stream to `output`.
    ///
    /// Blocks until every registered directory has been archived. Returns the sink's I/O
    /// error if writing failed, otherwise the first fatal error any worker recorded.
    /// Unreadable entries are skipped with a warning and do not fail the run.
    pub fn run<W: Write>(self, output: W) -> Result<ArchiveSummary, ArchiveError> {
        let Archiver {
            opts,
            skip_paths,
            counter,
            staging_tx,
            staging_rx,
        } = self;
        let (dir_workers, file_workers) =
            cap_workers_by_fd_limit(opts.dir_workers, opts.file_workers);
        debug!(
            "{} CONFIG:{:#?} (scanners={}, readers={})",
            env!("CARGO_PKG_NAME").to_uppercase(),
            opts,
            dir_workers,
            file_workers
        );

        let ctx = PipelineContext::new(&opts, skip_paths);
        let PipelineChannels {
            dir_tx,
            dir_rx,
            file_tx,
            file_rx,
            block_tx,
            block_rx,
            close_tx,
            close_rx,
        } = create_pipeline_channels(&opts);
        let scanner_queues = ScannerQueues {
            dir_rx,
            staging_tx,
            file_tx,
            block_tx: block_tx.clone(),
        };

        // Consumers first: nothing flows until the dispatcher starts. If a spawn fails, the
        // closures not yet run drop their channel ends and every started thread can exit.
        let mut handles = WorkerHandles::new();
        let started = spawn_readers(&file_rx, &block_tx, &ctx, file_workers, &mut handles)
            .and_then(|()| {
                spawn_scanners(&scanner_queues, &counter, &ctx, dir_workers, &mut handles)
            })
            .and_then(|()| spawn_dispatcher(staging_rx, dir_tx, close_rx))
            .map(|h| handles.push(("dispatcher", h)))
            .and_then(|()| spawn_terminator(Arc::clone(&counter), close_tx))
            .map(|h| handles.push(("terminator", h)));

        // Scanners hold the only remaining file queue senders.
        drop(scanner_queues);
        drop(file_rx);
        // Dropping the last sender closes the channel so the writer exits.
        drop(block_tx);

        if let Err(e) = started {
            drop(block_rx);
            join_workers(handles);
            return Err(e);
        }

        let mut sink = BufWriter::new(output);
        let write = write_stream(&mut sink, block_rx, opts.checksum_interval);
        let flush = sink.flush();
        let panicked = join_workers(handles);

        let (blocks, checksums) = write.as_ref().copied().unwrap_or_default();
        let summary = ctx.stats.summary(blocks, checksums);
        debug!("run finished: {:?}", summary);
        check_run_result(
            RunOutcome {
                write: write.map(|_| ()),
                flush,
                panicked,
            },
            &ctx.first_error,
            summary,
        )
    }
}

/// Join every started thread. Returns the role of the first one that panicked.
fn join_workers(handles: WorkerHandles) -> Option<&'static str> {
    let mut panicked = None;
    for (role, h) in handles {
        if h.join().is_err() {
            panicked.get_or_insert(role);
        }
    }
    panicked
}

/// Wait for the pending-work counter to reach zero, then signal close.
fn spawn_terminator(
    counter: Arc<WorkCounter>,
    close_tx: Sender<()>,
) -> Result<JoinHandle<()>, ArchiveError> {
    thread::Builder::new()
        .name("terminator".to_string())
        .spawn(move || {
            counter.wait_until_idle();
            debug!("terminator: no pending work, closing queues");
            drop(close_tx);
        })
        .map_err(|source| ArchiveError::Spawn {
            role: "terminator",
            source,
        })
}

/// Header, every queued block, final checksum. Returns `(blocks, checksums)` written.
fn write_stream<W: Write>(
    sink: &mut W,
    block_rx: Receiver<Block>,
    checksum_interval: u64,
) -> io::Result<(u64, u64)> {
    let mut writer = StreamWriter::new(sink, checksum_interval)?;
    drain_blocks(block_rx, &mut writer)?;
    let blocks = writer.blocks_written();
    let checksums = writer.checksums_written() + 1;
    writer.finish()?;
    Ok((blocks, checksums))
}
