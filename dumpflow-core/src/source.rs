/*!
Byte-range access to a dump's backing store.

A [`Source`](trait.Source.html) is the seek/read surface every format
driver parses from. It is opened once per session and shared by
reference among all stages. [`FileSource`](struct.FileSource.html)
covers regular files and block devices; any in-memory buffer works
through the blanket `io::Cursor` impl.
*/

use crate::error::{Error, Result};

use std::fs::File;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::Path;

/// Seek/read access to the raw bytes of a dump.
///
/// All offsets are absolute. Short reads are errors: a dump that ends
/// in the middle of a requested record is truncated, not empty.
pub trait Source: Read + Seek {
    /// Returns the logical block size of the backing store.
    ///
    /// Only block devices report anything other than 512 here. The
    /// value is a device capability consumed by drivers that address
    /// the source in blocks.
    fn block_size(&mut self) -> Result<u32> {
        Ok(512)
    }

    /// Returns the total size of the backing store in bytes.
    fn size(&mut self) -> Result<u64> {
        let pos = self
            .seek(SeekFrom::Current(0))
            .map_err(|_| Error::Io("seek failed"))?;
        let end = self
            .seek(SeekFrom::End(0))
            .map_err(|_| Error::Io("seek failed"))?;
        self.seek(SeekFrom::Start(pos))
            .map_err(|_| Error::Io("seek failed"))?;
        Ok(end)
    }

    /// Reads exactly `buf.len()` bytes at the given absolute offset.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.seek(SeekFrom::Start(offset))
            .map_err(|_| Error::Io("seek failed"))?;
        self.read_exact(buf).map_err(|_| Error::Io("read failed"))
    }

    /// Reads exactly `len` bytes at the given absolute offset into a
    /// freshly allocated buffer.
    fn read_vec_at(&mut self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_at(offset, &mut buf)?;
        Ok(buf)
    }
}

impl<T: AsRef<[u8]>> Source for Cursor<T> {}

/// A dump source backed by a regular file or a block device.
pub struct FileSource {
    file: File,
}

impl FileSource {
    /// Opens the file at `path` read-only as a dump source.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path).map_err(|_| Error::Io("unable to open dump file"))?;
        Ok(Self { file })
    }
}

impl From<File> for FileSource {
    fn from(file: File) -> Self {
        Self { file }
    }
}

impl Read for FileSource {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.file.read(buf)
    }
}

impl Seek for FileSource {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.file.seek(pos)
    }
}

impl Source for FileSource {
    #[cfg(target_os = "linux")]
    fn block_size(&mut self) -> Result<u32> {
        use std::os::unix::fs::FileTypeExt;
        use std::os::unix::io::AsRawFd;

        let metadata = self
            .file
            .metadata()
            .map_err(|_| Error::Io("unable to stat dump file"))?;
        if !metadata.file_type().is_block_device() {
            return Ok(512);
        }

        let mut size: libc::c_int = 0;
        let ret = unsafe { libc::ioctl(self.file.as_raw_fd(), libc::BLKSSZGET, &mut size) };
        if ret != 0 {
            return Err(Error::Io("BLKSSZGET failed"));
        }
        Ok(size as u32)
    }

    fn size(&mut self) -> Result<u64> {
        let metadata = self
            .file
            .metadata()
            .map_err(|_| Error::Io("unable to stat dump file"))?;
        Ok(metadata.len())
    }
}
