//! Archive operation: pick the output, run the pipeline, publish the result.

use anyhow::{Context, Result};
use log::{debug, warn};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use crate::pipeline::Archiver;
use crate::utils::{prepare_output_work_path, rename_temp_to_final};
use crate::{ArchiveOpts, ArchiveSummary, Opts};

/// Walk-relative form of `path`, used to keep the archive from packing itself.
/// Absolute paths under the current directory are made relative to it.
fn walk_relative(path: &Path) -> PathBuf {
    if !path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .ok()
        .and_then(|cwd| path.strip_prefix(cwd).ok().map(Path::to_path_buf))
        .unwrap_or_else(|| path.to_path_buf())
}

fn new_archiver(roots: &[PathBuf], opts: &Opts) -> Result<Archiver> {
    let archiver = Archiver::new(ArchiveOpts::from(opts));
    for root in roots {
        archiver
            .add_dir(root.clone())
            .with_context(|| format!("register {}", root.display()))?;
    }
    Ok(archiver)
}

/// Archive `roots` to `opts.output`, or to stdout when no output is set.
///
/// File output goes to a temp file next to the target and is renamed into place only when the
/// run succeeds. Both paths are left out of the walk.
pub fn archive_to_output(roots: &[PathBuf], opts: &Opts) -> Result<ArchiveSummary> {
    let mut archiver = new_archiver(roots, opts)?;

    let Some(output) = opts.output.as_deref() else {
        debug!("writing archive to stdout");
        let stdout = io::stdout().lock();
        return archiver.run(stdout).context("archive to stdout");
    };

    let temp_path = prepare_output_work_path(output)?;
    archiver.skip_path(&walk_relative(output));
    archiver.skip_path(&walk_relative(&temp_path));

    let file = File::create(&temp_path)
        .with_context(|| format!("create temp archive {}", temp_path.display()))?;
    debug!("writing archive to {}", temp_path.display());
    match archiver.run(file) {
        Ok(summary) => {
            rename_temp_to_final(&temp_path, output)?;
            Ok(summary)
        }
        Err(e) => {
            if let Err(rm) = fs::remove_file(&temp_path) {
                warn!("could not remove {}: {}", temp_path.display(), rm);
            }
            Err(e).with_context(|| format!("archive to {}", output.display()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walk_relative_keeps_relative_paths() {
        assert_eq!(walk_relative(Path::new("out.pstr")), PathBuf::from("out.pstr"));
    }

    #[test]
    fn test_walk_relative_strips_current_dir() {
        let cwd = std::env::current_dir().unwrap();
        let abs = cwd.join("sub").join("out.pstr");
        assert_eq!(walk_relative(&abs), PathBuf::from("sub/out.pstr"));
    }
}
