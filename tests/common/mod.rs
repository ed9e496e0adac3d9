//! Test-only stream decoder and fixture helpers.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use packstream::engine::crc64;
use packstream::utils::FormatConsts;
use packstream::{BlockKind, Ownership};
use tempfile::TempDir;

/// One decoded block with the offset of its first byte in the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub offset: usize,
    pub kind: BlockKind,
    pub path: String,
    pub owner: Option<Ownership>,
    pub data: Vec<u8>,
    pub checksum: Option<u64>,
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> &'a [u8] {
        let s = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        s
    }

    fn u16(&mut self) -> u16 {
        u16::from_be_bytes(self.take(2).try_into().unwrap())
    }

    fn u32(&mut self) -> u32 {
        u32::from_be_bytes(self.take(4).try_into().unwrap())
    }

    fn u64(&mut self) -> u64 {
        u64::from_be_bytes(self.take(8).try_into().unwrap())
    }
}

/// Decode a whole stream. Panics on anything malformed.
pub fn decode(stream: &[u8]) -> Vec<Decoded> {
    let magic = FormatConsts::MAGIC;
    assert_eq!(&stream[..magic.len()], &magic, "bad magic");
    let mut cur = Cursor {
        buf: stream,
        pos: magic.len(),
    };
    let mut blocks = Vec::new();
    while cur.pos < stream.len() {
        let offset = cur.pos;
        let path_len = cur.u16() as usize;
        let path = String::from_utf8(cur.take(path_len).to_vec()).unwrap();
        let tag = cur.take(1)[0];
        let kind = BlockKind::from_tag(tag).unwrap_or_else(|| panic!("unknown tag {tag}"));
        let mut block = Decoded {
            offset,
            kind,
            path,
            owner: None,
            data: Vec::new(),
            checksum: None,
        };
        match kind {
            BlockKind::Directory | BlockKind::StartOfFile => {
                block.owner = Some(Ownership {
                    uid: cur.u32(),
                    gid: cur.u32(),
                    mode: cur.u32(),
                });
            }
            BlockKind::Data => {
                let len = cur.u16() as usize;
                block.data = cur.take(len).to_vec();
            }
            BlockKind::EndOfFile => {}
            BlockKind::Checksum => {
                assert_eq!(path_len, 0, "checksum block with a path");
                block.checksum = Some(cur.u64());
            }
        }
        blocks.push(block);
    }
    blocks
}

/// Assert every checksum block holds the CRC-64 of all bytes before its value.
pub fn verify_checksums(stream: &[u8], blocks: &[Decoded]) {
    for b in blocks.iter().filter(|b| b.kind == BlockKind::Checksum) {
        let value_at = b.offset + 3;
        assert_eq!(
            b.checksum,
            Some(crc64(&stream[..value_at])),
            "checksum at offset {}",
            b.offset
        );
    }
}

/// Concatenated data of `path`, in stream order.
pub fn content_of(blocks: &[Decoded], path: &str) -> Vec<u8> {
    blocks
        .iter()
        .filter(|b| b.kind == BlockKind::Data && b.path == path)
        .flat_map(|b| b.data.iter().copied())
        .collect()
}

/// Kinds of the blocks that mention `path`, in stream order.
pub fn kinds_for(blocks: &[Decoded], path: &str) -> Vec<BlockKind> {
    blocks
        .iter()
        .filter(|b| b.path == path)
        .map(|b| b.kind)
        .collect()
}

/// A scratch tree under the current directory, so it can be archived by a relative root.
pub struct Fixture {
    pub tmp: TempDir,
    pub root: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let tmp = tempfile::Builder::new()
            .prefix("pstest")
            .tempdir_in(".")
            .unwrap();
        let root = PathBuf::from(tmp.path().file_name().unwrap());
        Fixture { tmp, root }
    }

    /// Relative path of `rel` inside the fixture, as it appears in the stream.
    pub fn wire(&self, rel: &str) -> String {
        if rel.is_empty() {
            self.root.to_string_lossy().into_owned()
        } else {
            format!("{}/{}", self.root.display(), rel)
        }
    }

    pub fn abs(&self, rel: &str) -> PathBuf {
        self.tmp.path().join(rel)
    }

    pub fn mkdir(&self, rel: &str) {
        fs::create_dir_all(self.abs(rel)).unwrap();
    }

    pub fn write(&self, rel: &str, content: &[u8]) {
        let path = self.abs(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }
}

pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

pub fn exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}
