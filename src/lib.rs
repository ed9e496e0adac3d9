//! Packstream: parallel directory archiver producing a checksummed block stream.

pub mod archive;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

pub use error::ArchiveError;
pub use pipeline::{Archiver, RootRegistrar};

use anyhow::Context;
use log::debug;
use std::io::Write;
use std::path::Path;

/// Result alias used by public packstream API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Single entry point: archive every directory in `roots` into `output` and return the run summary.
///
/// Roots must be relative paths; an absolute root fails the run with
/// [`ArchiveError::AbsolutePath`] once the rest of the tree has drained. Use [`Archiver`]
/// directly to register roots while the run is in progress.
///
/// ```no_run
/// let out = std::fs::File::create("site.pstr")?;
/// let summary = packstream::archive_dirs(&["site"], &packstream::ArchiveOpts::default(), out)?;
/// assert!(summary.checksums >= 1);
/// # Ok::<(), packstream::Error>(())
/// ```
pub fn archive_dirs<W, P>(roots: &[P], opts: &ArchiveOpts, output: W) -> Result<ArchiveSummary>
where
    W: Write,
    P: AsRef<Path>,
{
    let archiver = Archiver::new(opts.clone());
    for root in roots {
        let root = root.as_ref();
        archiver
            .add_dir(root)
            .with_context(|| format!("register {}", root.display()))?;
    }
    let summary = archiver.run(output).context("archive run failed")?;
    debug!("archived {} roots: {:?}", roots.len(), summary);
    Ok(summary)
}
