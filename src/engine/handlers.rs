//! CLI command handler: resolve options, archive, report the summary.

use anyhow::Result;
use log::{debug, info};
use std::path::Path;

use crate::archive::archive_to_output;
use crate::engine::arg_parser::Cli;
use crate::utils::packstream_toml::{apply_file_to_opts, load_packstream_toml};
use crate::utils::setup_logging;
use crate::{Opts, SpecialFiles};

/// Overwrite opts field from a CLI flag when given.
macro_rules! apply_cli_opt {
    ($cli:expr, $opts:expr, $cli_field:ident => $opts_field:ident) => {
        if let Some(v) = $cli.$cli_field {
            $opts.$opts_field = v;
        }
    };
}

/// Defaults, then `.packstream.toml` in the current directory, then CLI flags.
fn setup_opts(cli: &Cli) -> Opts {
    let mut opts = Opts::default();
    if let Some(file) = load_packstream_toml(Path::new(".")) {
        apply_file_to_opts(&file, &mut opts);
    }
    if let Some(ref out) = cli.output {
        opts.output = (out != Path::new("-")).then(|| out.clone());
    }
    if !cli.exclude.is_empty() {
        opts.exclude = cli.exclude.clone();
    }
    apply_cli_opt!(cli, opts, verbose => verbose);
    apply_cli_opt!(cli, opts, dir_workers => dir_workers);
    apply_cli_opt!(cli, opts, file_workers => file_workers);
    apply_cli_opt!(cli, opts, dir_queue => dir_queue_size);
    apply_cli_opt!(cli, opts, file_queue => file_queue_size);
    apply_cli_opt!(cli, opts, block_queue => block_queue_size);
    apply_cli_opt!(cli, opts, chunk_size => chunk_size);
    if let Some(read) = cli.read_special {
        opts.special_files = if read {
            SpecialFiles::Read
        } else {
            SpecialFiles::Skip
        };
    }
    opts
}

/// Archive the CLI's directories with options resolved from defaults, config file and flags.
pub fn handle_run(cli: &Cli) -> Result<()> {
    let opts = setup_opts(cli);
    setup_logging(opts.verbose);
    debug!("Archiving {} directories...", cli.dirs.len());

    let summary = archive_to_output(&cli.dirs, &opts)?;
    info!(
        "archived {} directories, {} files ({} bytes) in {} blocks + {} checksums",
        summary.directories, summary.files, summary.bytes, summary.blocks, summary.checksums
    );
    if let Some(ref out) = opts.output {
        info!("wrote {}", out.display());
    }
    Ok(())
}
