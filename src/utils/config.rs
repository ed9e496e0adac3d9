//! Application configuration constants.
//! Pipeline sizing and format parameters in one place.

use std::sync::OnceLock;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    config_filename: String,
    temp_suffix: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                config_filename: format!(".{pkg}.toml"),
                temp_suffix: "tmp".to_string(),
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// CLI config file looked up in the working directory.
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }

    /// Extension appended to the output path while the archive is being written.
    pub fn temp_suffix(&self) -> &str {
        &self.temp_suffix
    }
}

// ---- Worker pools and queues ----

/// Default pool and queue sizes.
pub struct PipelineDefaults;

impl PipelineDefaults {
    pub const DIR_WORKERS: usize = 16;
    pub const FILE_WORKERS: usize = 16;
    pub const DIR_QUEUE_SIZE: usize = 128;
    pub const FILE_QUEUE_SIZE: usize = 128;
    pub const BLOCK_QUEUE_SIZE: usize = 128;
}

// ---- Wire format ----

/// Stream format parameters.
pub struct FormatConsts;

impl FormatConsts {
    /// Written once at the start of every stream.
    pub const MAGIC: [u8; 8] = *b"PKSTRM\x00\x01";
    /// Bytes per data block. The length field is a u16, so this is also the maximum.
    pub const CHUNK_SIZE: usize = u16::MAX as usize;
    /// Queue blocks between two checksum blocks.
    pub const CHECKSUM_INTERVAL: u64 = 1000;
}

/// Clamp a configured chunk size to what a data block can carry.
pub fn effective_chunk_size(requested: usize) -> usize {
    requested.clamp(1, FormatConsts::CHUNK_SIZE)
}
