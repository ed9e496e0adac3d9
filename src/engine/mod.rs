//! Engine module: block encoding, checksumming, filesystem access and the CLI front end

pub mod arg_parser;
pub mod checksum;
pub mod codec;
pub mod fs;
pub mod handlers;
pub mod tools;
pub mod writer;

// Re-export commonly used functions
pub use arg_parser::Cli;
pub use checksum::{ChecksumWriter, crc64};
pub use codec::{encode_block, write_header};
pub use handlers::handle_run;
pub use tools::{compile_patterns, is_excluded, join_entry, normalize_lexically};
pub use writer::{StreamWriter, drain_blocks};
