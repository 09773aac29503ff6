/*!
Memory chunk registry.

An ordered collection of disjoint physical address ranges, each lazily
backed by a driver supplied read callback. Taken as a whole the
registry represents the complete known physical memory of the captured
machine. Reads outside any chunk are rejected, never zero filled.
*/

use crate::error::{Error, Result};
use crate::source::Source;
use crate::types::Address;

use std::fmt;

use log::debug;

/// Read callback bound to a chunk at creation time.
///
/// Receives the session source, an offset relative to the chunk start
/// and the destination buffer. Whatever driver state the read needs
/// (file offsets, block lists) lives in the closure capture and is
/// released when the registry is dropped.
pub type ChunkReadFn = Box<dyn Fn(&mut dyn Source, u64, &mut [u8]) -> Result<()>>;

/// A contiguous physical address range `[start, start + size)`.
pub struct MemChunk {
    start: Address,
    size: u64,
    read_fn: ChunkReadFn,
}

impl MemChunk {
    pub fn start(&self) -> Address {
        self.start
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// First address past the chunk.
    pub fn end(&self) -> Address {
        self.start + self.size
    }

    pub fn contains(&self, addr: Address) -> bool {
        addr >= self.start && addr < self.end()
    }
}

impl fmt::Debug for MemChunk {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("MemChunk")
            .field("start", &self.start)
            .field("size", &self.size)
            .finish()
    }
}

/// The ordered set of memory chunks of one dump.
#[derive(Debug, Default)]
pub struct MemChunks {
    chunks: Vec<MemChunk>,
}

impl MemChunks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a chunk.
    ///
    /// The registry does not check disjointness; each driver
    /// guarantees disjoint, coverage complete insertion for its own
    /// format.
    pub fn add(&mut self, start: Address, size: u64, read_fn: ChunkReadFn) {
        debug!("adding memory chunk: start={:x} size={:x}", start, size);
        self.chunks.push(MemChunk {
            start,
            size,
            read_fn,
        });
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MemChunk> {
        self.chunks.iter()
    }

    /// Sum of all chunk sizes.
    pub fn total_size(&self) -> u64 {
        self.chunks.iter().map(|c| c.size).sum()
    }

    /// First address past the highest chunk.
    pub fn end_addr(&self) -> Address {
        self.chunks
            .iter()
            .map(|c| c.end())
            .max()
            .unwrap_or(Address::NULL)
    }

    /// Returns the chunk owning `addr`, if any.
    pub fn chunk_containing(&self, addr: Address) -> Option<&MemChunk> {
        self.chunks.iter().find(|c| c.contains(addr))
    }

    /// Reads `buf.len()` bytes of physical memory starting at `addr`.
    ///
    /// A read may span adjacent chunks. Any address without an owning
    /// chunk fails with `AddressNotMapped`.
    pub fn read(&self, src: &mut dyn Source, addr: Address, buf: &mut [u8]) -> Result<()> {
        let mut pos = addr;
        let mut done = 0;
        while done < buf.len() {
            let chunk = self
                .chunk_containing(pos)
                .ok_or(Error::AddressNotMapped(pos))?;
            let off = pos - chunk.start;
            let len = std::cmp::min((chunk.size - off) as usize, buf.len() - done);
            (chunk.read_fn)(src, off, &mut buf[done..done + len])?;
            pos = pos + len as u64;
            done += len;
        }
        Ok(())
    }
}
