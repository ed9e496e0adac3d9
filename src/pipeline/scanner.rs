//! Directory scanner pool: expands directories into Directory blocks, staged subdirectories
//! and queued files.

use crossbeam_channel::{Receiver, Sender};
use log::{debug, warn};
use std::path::Path;
use std::sync::Arc;
use std::thread;

use crate::engine::fs::{EntryKind, OpenDir, classify};
use crate::engine::tools::{is_excluded, is_rooted, join_entry};
use crate::error::ArchiveError;
use crate::{Block, SpecialFiles};

use super::context::{PipelineContext, PipelineStats, WorkerHandles};
use super::counter::{PendingPath, WorkCounter};

/// Queue ends held by one scanner.
///
/// Subdirectories go to the unbounded staging queue, never straight back onto the directory
/// queue this pool drains: a full directory queue would otherwise leave every scanner blocked
/// on a send with nobody left to receive.
#[derive(Clone)]
pub struct ScannerQueues {
    pub dir_rx: Receiver<PendingPath>,
    pub staging_tx: Sender<PendingPath>,
    pub file_tx: Sender<PendingPath>,
    pub block_tx: Sender<Block>,
}

/// Where a listed entry goes next.
enum Route {
    Directory,
    File,
    Skip,
}

fn route_entry(path: &Path, ctx: &PipelineContext) -> Route {
    if is_excluded(path, &ctx.exclude) {
        debug!("skipping excluded file {}", path.display());
        return Route::Skip;
    }
    if ctx.skip_paths.iter().any(|p| p == path) {
        debug!("skipping archive output {}", path.display());
        return Route::Skip;
    }
    let kind = match classify(path) {
        Ok(kind) => kind,
        Err(e) => {
            warn!("unable to lstat {}: {}", path.display(), e);
            PipelineStats::bump(&ctx.stats.skipped);
            return Route::Skip;
        }
    };
    match (kind, ctx.special_files) {
        (EntryKind::Directory, _) => Route::Directory,
        (EntryKind::File, _) | (EntryKind::Special, SpecialFiles::Read) => Route::File,
        (EntryKind::Symlink, _) => {
            warn!("skipping symbolic link {}", path.display());
            PipelineStats::bump(&ctx.stats.skipped);
            Route::Skip
        }
        (EntryKind::Special, SpecialFiles::Skip) => {
            warn!("skipping special file {}", path.display());
            PipelineStats::bump(&ctx.stats.skipped);
            Route::Skip
        }
    }
}

/// Scan one directory. The directory's own unit completes when `pending` drops at the end of
/// this call, after every child has taken its own unit.
fn scan_directory(
    pending: PendingPath,
    queues: &ScannerQueues,
    counter: &Arc<WorkCounter>,
    ctx: &PipelineContext,
) {
    let PendingPath { path, unit: _unit } = pending;
    if is_rooted(&path) {
        ctx.first_error.record(ArchiveError::AbsolutePath { path });
        return;
    }
    debug!("{}", path.display());

    let dir = match OpenDir::open(&path) {
        Ok(dir) => dir,
        Err(e) => {
            warn!("directory read error: {}: {}", path.display(), e);
            PipelineStats::bump(&ctx.stats.skipped);
            return;
        }
    };

    let directory = Block::Directory {
        path: path.clone(),
        owner: dir.owner,
    };
    if queues.block_tx.send(directory).is_err() {
        // writer has stopped; nothing more can be archived
        return;
    }
    PipelineStats::bump(&ctx.stats.directories);

    for name in dir {
        let name = match name {
            Ok(name) => name,
            Err(e) => {
                warn!("error reading directory {}: {}", path.display(), e);
                continue;
            }
        };
        let child = join_entry(&path, &name);
        let route = route_entry(&child, ctx);
        if matches!(route, Route::Skip) {
            continue;
        }
        let Some(unit) = counter.try_begin() else {
            continue;
        };
        let pending = PendingPath { path: child, unit };
        match route {
            Route::Directory => {
                let _ = queues.staging_tx.send(pending);
            }
            Route::File => {
                if queues.file_tx.send(pending).is_err() {
                    return;
                }
            }
            Route::Skip => {}
        }
    }
}

fn scanner_loop(queues: ScannerQueues, counter: Arc<WorkCounter>, ctx: Arc<PipelineContext>) {
    while let Ok(pending) = queues.dir_rx.recv() {
        scan_directory(pending, &queues, &counter, &ctx);
    }
}

/// Spawn `num_workers` scanners. They exit once the directory queue is closed.
/// Each handle is pushed as soon as its thread starts, so a later spawn failure leaves the
/// earlier ones joinable.
pub fn spawn_scanners(
    queues: &ScannerQueues,
    counter: &Arc<WorkCounter>,
    ctx: &Arc<PipelineContext>,
    num_workers: usize,
    handles: &mut WorkerHandles,
) -> Result<(), ArchiveError> {
    for id in 0..num_workers {
        let queues = queues.clone();
        let counter = Arc::clone(counter);
        let ctx = Arc::clone(ctx);
        let handle = thread::Builder::new()
            .name(format!("scanner-{id}"))
            .spawn(move || scanner_loop(queues, counter, ctx))
            .map_err(|source| ArchiveError::Spawn {
                role: "scanner",
                source,
            })?;
        handles.push(("scanner", handle));
    }
    Ok(())
}
