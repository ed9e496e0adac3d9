//! Staging dispatcher: moves staged directories into the bounded directory queue.

use crossbeam_channel::{Receiver, Sender, select};
use log::debug;
use std::thread::{self, JoinHandle};

use crate::error::ArchiveError;

use super::counter::PendingPath;

/// Forward staged directories until the close signal. This thread never consumes the
/// directory queue, so blocking on a full one here cannot stall the scanners.
fn dispatch_loop(
    staging_rx: Receiver<PendingPath>,
    dir_tx: Sender<PendingPath>,
    close_rx: Receiver<()>,
) {
    let mut forwarded = 0_usize;
    loop {
        select! {
            recv(staging_rx) -> msg => match msg {
                // A failed send means every scanner is gone; the dropped item releases its unit.
                Ok(pending) => {
                    if dir_tx.send(pending).is_ok() {
                        forwarded += 1;
                    }
                }
                Err(_) => break,
            },
            recv(close_rx) -> _ => break,
        }
    }
    debug!("dispatcher: closing directory queue after {} directories", forwarded);
    drop(dir_tx);
}

pub fn spawn_dispatcher(
    staging_rx: Receiver<PendingPath>,
    dir_tx: Sender<PendingPath>,
    close_rx: Receiver<()>,
) -> Result<JoinHandle<()>, ArchiveError> {
    thread::Builder::new()
        .name("dispatcher".to_string())
        .spawn(move || dispatch_loop(staging_rx, dir_tx, close_rx))
        .map_err(|source| ArchiveError::Spawn {
            role: "dispatcher",
            source,
        })
}
