//! Stream writer: the single consumer of the block queue.

use crossbeam_channel::Receiver;
use log::debug;
use std::io::{self, Write};

use crate::Block;
use crate::engine::checksum::ChecksumWriter;
use crate::engine::codec;

/// Serializes blocks in arrival order and interleaves cumulative checksum blocks.
///
/// Every byte, the magic header and earlier checksum blocks included, goes through one CRC-64
/// digest. A checksum block follows every `checksum_interval` blocks, and [`finish`](Self::finish)
/// always closes the stream with one.
pub struct StreamWriter<W: Write> {
    out: ChecksumWriter<W>,
    checksum_interval: u64,
    blocks_written: u64,
    checksums_written: u64,
}

impl<W: Write> StreamWriter<W> {
    /// Write the magic header and return a writer ready for blocks.
    /// A `checksum_interval` of 0 disables periodic checksums; the final one is still written.
    pub fn new(out: W, checksum_interval: u64) -> io::Result<Self> {
        let mut out = ChecksumWriter::new(out);
        codec::write_header(&mut out)?;
        Ok(Self {
            out,
            checksum_interval,
            blocks_written: 0,
            checksums_written: 0,
        })
    }

    pub fn write_block(&mut self, block: &Block) -> io::Result<()> {
        codec::encode_block(block, &mut self.out)?;
        self.blocks_written += 1;
        if self.checksum_interval > 0
            && self.blocks_written.is_multiple_of(self.checksum_interval)
        {
            self.write_checksum()?;
        }
        Ok(())
    }

    /// Write a checksum block and return the value stored in it. The value covers the block's
    /// own path length and tag bytes, which are written before the digest is read.
    pub fn write_checksum(&mut self) -> io::Result<u64> {
        codec::write_checksum_prefix(&mut self.out)?;
        let value = self.out.sum64();
        codec::write_checksum_value(&mut self.out, value)?;
        self.checksums_written += 1;
        Ok(value)
    }

    pub fn blocks_written(&self) -> u64 {
        self.blocks_written
    }

    pub fn checksums_written(&self) -> u64 {
        self.checksums_written
    }

    /// Write the closing checksum and hand back the sink (not flushed).
    pub fn finish(mut self) -> io::Result<W> {
        self.write_checksum()?;
        Ok(self.out.into_inner())
    }
}

/// Drain `block_rx` into `writer` until every producer has hung up. The first write error
/// stops the drain; dropping the receiver then makes every producer's next send fail.
pub fn drain_blocks<W: Write>(
    block_rx: Receiver<Block>,
    writer: &mut StreamWriter<W>,
) -> io::Result<()> {
    while let Ok(block) = block_rx.recv() {
        writer.write_block(&block)?;
    }
    debug!(
        "writer: block queue closed after {} blocks ({} checksums)",
        writer.blocks_written(),
        writer.checksums_written()
    );
    Ok(())
}
