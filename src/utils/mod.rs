pub mod config;
pub mod fd_limit;
pub mod logger;
pub mod packstream_toml;
pub mod tempfiles;

pub use config::*;
pub use fd_limit::{cap_workers_by_fd_limit, max_open_fds};
pub use logger::setup_logging;
pub use tempfiles::{prepare_output_work_path, rename_temp_to_final, temp_path_for};
