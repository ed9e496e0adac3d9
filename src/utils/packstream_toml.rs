//! Load `.packstream.toml` from a directory (CLI only). Lib callers pass
//! [`ArchiveOpts`](crate::ArchiveOpts) directly.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::utils::config::PackagePaths;
use crate::{Opts, SpecialFiles};

#[derive(Debug, Deserialize)]
pub(crate) struct PackstreamToml {
    #[serde(default)]
    settings: ArchiveSection,
}

#[derive(Debug, Default, Deserialize)]
struct ArchiveSection {
    output: Option<String>,
    exclude: Option<Vec<String>>,
    dir_workers: Option<usize>,
    file_workers: Option<usize>,
    dir_queue_size: Option<usize>,
    file_queue_size: Option<usize>,
    block_queue_size: Option<usize>,
    chunk_size: Option<usize>,
    read_special: Option<bool>,
    verbose: Option<bool>,
}

/// Load the config file from `dir` if present. Returns None if missing or unreadable. CLI only.
pub(crate) fn load_packstream_toml(dir: &Path) -> Option<PackstreamToml> {
    let path = dir.join(PackagePaths::get().config_filename());
    let s = std::fs::read_to_string(&path).ok()?;
    parse_packstream_toml(&s)
        .map_err(|e| log::warn!("{}: {}", path.display(), e))
        .ok()
}

pub(crate) fn parse_packstream_toml(s: &str) -> Result<PackstreamToml, toml::de::Error> {
    toml::from_str(s)
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($sec:expr, $opts:expr, $sec_field:ident => $opts_field:ident) => {
        if let Some(v) = $sec.$sec_field {
            $opts.$opts_field = v;
        }
    };
}

/// Apply file config to opts (only fields present in the file). Call before applying CLI flags.
pub(crate) fn apply_file_to_opts(file: &PackstreamToml, opts: &mut Opts) {
    let sec = &file.settings;
    if let Some(ref p) = sec.output {
        opts.output = (p != "-").then(|| PathBuf::from(p));
    }
    if let Some(ref v) = sec.exclude {
        opts.exclude = v.clone();
    }
    apply_file_opt!(sec, opts, dir_workers => dir_workers);
    apply_file_opt!(sec, opts, file_workers => file_workers);
    apply_file_opt!(sec, opts, dir_queue_size => dir_queue_size);
    apply_file_opt!(sec, opts, file_queue_size => file_queue_size);
    apply_file_opt!(sec, opts, block_queue_size => block_queue_size);
    apply_file_opt!(sec, opts, chunk_size => chunk_size);
    apply_file_opt!(sec, opts, verbose => verbose);
    if let Some(read) = sec.read_special {
        opts.special_files = if read {
            SpecialFiles::Read
        } else {
            SpecialFiles::Skip
        };
    }
}
