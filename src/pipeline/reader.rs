//! File reader pool: turns queued files into StartOfFile, Data and EndOfFile blocks.

use crossbeam_channel::{Receiver, Sender};
use log::{debug, warn};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use crate::{Block, Ownership};
use crate::engine::fs::open_file;
use crate::error::ArchiveError;

use super::context::{PipelineContext, PipelineStats, WorkerHandles};
use super::counter::PendingPath;

/// Result of streaming one file body.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ChunkOutcome {
    pub bytes: u64,
    /// A read error cut the content short.
    pub truncated: bool,
    /// The block queue closed under us.
    pub disconnected: bool,
}

/// Fill `buf` from `reader` until it is full or the reader is exhausted. Returns the bytes
/// read and the error that stopped reading early, if any.
fn fill_chunk<R: Read>(reader: &mut R, buf: &mut [u8]) -> (usize, Option<io::Error>) {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return (filled, Some(e)),
        }
    }
    (filled, None)
}

/// Send `reader`'s content as data blocks of `chunk_size` bytes; only the last may be shorter.
/// On a read error the bytes already read are still sent and streaming stops.
pub fn stream_chunks<R: Read>(
    path: &Path,
    mut reader: R,
    chunk_size: usize,
    block_tx: &Sender<Block>,
) -> ChunkOutcome {
    let mut outcome = ChunkOutcome::default();
    loop {
        let mut buf = vec![0u8; chunk_size];
        let (n, err) = fill_chunk(&mut reader, &mut buf);
        if n > 0 {
            buf.truncate(n);
            let data = Block::Data {
                path: path.to_path_buf(),
                data: buf,
            };
            if block_tx.send(data).is_err() {
                outcome.disconnected = true;
                return outcome;
            }
            outcome.bytes += n as u64;
        }
        if let Some(e) = err {
            warn!(
                "file read error on {}; file contents will be incomplete: {}",
                path.display(),
                e
            );
            outcome.truncated = true;
            return outcome;
        }
        if n < chunk_size {
            return outcome;
        }
    }
}

/// Emit one file: StartOfFile, its data blocks, then exactly one EndOfFile, even after a read
/// error. Only a closed block queue ends the sequence early.
fn archive_contents<R: Read>(
    path: PathBuf,
    owner: Ownership,
    reader: R,
    block_tx: &Sender<Block>,
    ctx: &PipelineContext,
) {
    let start = Block::StartOfFile {
        path: path.clone(),
        owner,
    };
    if block_tx.send(start).is_err() {
        return;
    }
    PipelineStats::bump(&ctx.stats.files);

    let outcome = stream_chunks(&path, reader, ctx.chunk_size, block_tx);
    ctx.stats.add_bytes(outcome.bytes);
    if outcome.truncated {
        PipelineStats::bump(&ctx.stats.truncated);
    }
    if !outcome.disconnected {
        let _ = block_tx.send(Block::EndOfFile { path });
    }
}

fn read_file(pending: PendingPath, block_tx: &Sender<Block>, ctx: &PipelineContext) {
    let PendingPath { path, unit: _unit } = pending;
    debug!("{}", path.display());

    let (file, owner) = match open_file(&path) {
        Ok(opened) => opened,
        Err(e) => {
            warn!("file open error: {}: {}", path.display(), e);
            PipelineStats::bump(&ctx.stats.skipped);
            return;
        }
    };
    let reader = BufReader::with_capacity(ctx.chunk_size, file);
    archive_contents(path, owner, reader, block_tx, ctx);
}

fn reader_loop(file_rx: Receiver<PendingPath>, block_tx: Sender<Block>, ctx: Arc<PipelineContext>) {
    while let Ok(pending) = file_rx.recv() {
        read_file(pending, &block_tx, &ctx);
    }
    drop(block_tx);
}

/// Spawn `num_workers` readers. They exit once the file queue is closed. Caller must drop its
/// own `block_tx` afterwards so the writer sees the block queue close. Handles are pushed as
/// threads start.
pub fn spawn_readers(
    file_rx: &Receiver<PendingPath>,
    block_tx: &Sender<Block>,
    ctx: &Arc<PipelineContext>,
    num_workers: usize,
    handles: &mut WorkerHandles,
) -> Result<(), ArchiveError> {
    for id in 0..num_workers {
        let file_rx = file_rx.clone();
        let block_tx = block_tx.clone();
        let ctx = Arc::clone(ctx);
        let handle = thread::Builder::new()
            .name(format!("reader-{id}"))
            .spawn(move || reader_loop(file_rx, block_tx, ctx))
            .map_err(|source| ArchiveError::Spawn {
                role: "reader",
                source,
            })?;
        handles.push(("reader", handle));
    }
    Ok(())
}
