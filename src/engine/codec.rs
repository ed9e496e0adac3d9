//! Block wire encoding.
//!
//! ```text
//! STREAM := MAGIC BLOCK*
//! BLOCK  := path_len:u16 path:[u8; path_len] tag:u8 payload
//!   Directory | StartOfFile -> uid:u32 gid:u32 mode:u32
//!   EndOfFile               -> (empty)
//!   Data                    -> len:u16 data:[u8; len]
//!   Checksum (path_len = 0) -> value:u64
//! ```
//!
//! All integers are big-endian.

use std::io::{self, Write};

use crate::engine::tools::path_to_wire_bytes;
use crate::utils::config::FormatConsts;
use crate::{Block, BlockKind, Ownership};

/// Write the stream magic. Done once, before any block.
pub fn write_header<W: Write>(out: &mut W) -> io::Result<()> {
    out.write_all(&FormatConsts::MAGIC)
}

fn u16_len(len: usize, what: &str) -> io::Result<u16> {
    u16::try_from(len).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{what} of {len} bytes exceeds the 65535 byte block limit"),
        )
    })
}

fn write_prefix<W: Write>(out: &mut W, path: &[u8], kind: BlockKind) -> io::Result<()> {
    out.write_all(&u16_len(path.len(), "path")?.to_be_bytes())?;
    out.write_all(path)?;
    out.write_all(&[kind.tag()])
}

fn write_ownership<W: Write>(out: &mut W, owner: &Ownership) -> io::Result<()> {
    out.write_all(&owner.uid.to_be_bytes())?;
    out.write_all(&owner.gid.to_be_bytes())?;
    out.write_all(&owner.mode.to_be_bytes())
}

/// The part of a checksum block that precedes its value: an empty path and the tag.
///
/// Split out because the stored value covers these bytes too.
pub fn write_checksum_prefix<W: Write>(out: &mut W) -> io::Result<()> {
    write_prefix(out, &[], BlockKind::Checksum)
}

pub fn write_checksum_value<W: Write>(out: &mut W, value: u64) -> io::Result<()> {
    out.write_all(&value.to_be_bytes())
}

/// Encode one block. Paths or data longer than 65535 bytes are rejected with `InvalidInput`.
pub fn encode_block<W: Write>(block: &Block, out: &mut W) -> io::Result<()> {
    match block {
        Block::Directory { path, owner } => {
            write_prefix(out, &path_to_wire_bytes(path), BlockKind::Directory)?;
            write_ownership(out, owner)
        }
        Block::StartOfFile { path, owner } => {
            write_prefix(out, &path_to_wire_bytes(path), BlockKind::StartOfFile)?;
            write_ownership(out, owner)
        }
        Block::Data { path, data } => {
            let len = u16_len(data.len(), "data block")?;
            write_prefix(out, &path_to_wire_bytes(path), BlockKind::Data)?;
            out.write_all(&len.to_be_bytes())?;
            out.write_all(data)
        }
        Block::EndOfFile { path } => {
            write_prefix(out, &path_to_wire_bytes(path), BlockKind::EndOfFile)
        }
        Block::Checksum(value) => {
            write_checksum_prefix(out)?;
            write_checksum_value(out, *value)
        }
    }
}
