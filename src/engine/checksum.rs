//! Running CRC-64 over everything written to the archive sink.

use crc::{CRC_64_XZ, Crc, Digest};
use std::io::{self, Write};

/// CRC-64 with the ECMA-182 polynomial, reflected, all-ones init and final xor.
pub static CRC64: Crc<u64> = Crc::<u64>::new(&CRC_64_XZ);

/// One-shot CRC-64 of `bytes`, same parameters as [`ChecksumWriter`].
pub fn crc64(bytes: &[u8]) -> u64 {
    CRC64.checksum(bytes)
}

/// `Write` adapter that feeds every byte the inner writer accepts into a CRC-64 digest.
pub struct ChecksumWriter<W> {
    inner: W,
    digest: Digest<'static, u64>,
}

impl<W: Write> ChecksumWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            digest: CRC64.digest(),
        }
    }

    /// CRC of every byte written so far. The digest keeps running.
    pub fn sum64(&self) -> u64 {
        self.digest.clone().finalize()
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for ChecksumWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.digest.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
