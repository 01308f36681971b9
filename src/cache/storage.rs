use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use memmap2::{MmapMut, MmapOptions};

use crate::foundation::error::{StrataError, StrataResult};

/// Backing buffer of one cache entry. Exactly one representation is live at a time.
#[derive(Debug)]
pub enum Storage {
    /// Plain heap buffer (memory tier only).
    Heap(Vec<u8>),
    /// Open shared mapping of a cache file.
    Mapped(MappedFile),
    /// Cache file with no live mapping. Bytes are reachable only after [`ClosedFile::reopen`].
    Closed(ClosedFile),
}

impl Storage {
    /// Zero-filled heap buffer. Reports allocation failure instead of aborting.
    pub fn allocate_heap(len: usize) -> StrataResult<Self> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(len)
            .map_err(|e| StrataError::allocation(format!("heap buffer of {len} bytes: {e}")))?;
        buf.resize(len, 0);
        Ok(Self::Heap(buf))
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Heap(b) => b.len(),
            Self::Mapped(m) => m.len(),
            Self::Closed(c) => c.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes are addressable without reopening anything.
    pub fn is_resident(&self) -> bool {
        !matches!(self, Self::Closed(_))
    }

    pub fn is_file_backed(&self) -> bool {
        !matches!(self, Self::Heap(_))
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Heap(b) => Some(b),
            Self::Mapped(m) => Some(m.bytes()),
            Self::Closed(_) => None,
        }
    }

    pub fn bytes_mut(&mut self) -> Option<&mut [u8]> {
        match self {
            Self::Heap(b) => Some(b),
            Self::Mapped(m) => Some(m.bytes_mut()),
            Self::Closed(_) => None,
        }
    }

    /// Reopen the mapping of a closed file. No-op for resident storage.
    pub fn ensure_resident(&mut self) -> StrataResult<()> {
        if self.is_resident() {
            return Ok(());
        }
        let Self::Closed(closed) = std::mem::replace(self, Self::Heap(Vec::new())) else {
            return Ok(());
        };
        let path = closed.path.clone();
        let len = closed.len;
        match closed.reopen() {
            Ok(mapped) => {
                *self = Self::Mapped(mapped);
                Ok(())
            }
            Err(e) => {
                *self = Self::Closed(ClosedFile::new(path, len));
                Err(e)
            }
        }
    }

    /// Move the bytes out of memory: heap buffers are written to a new file at `path`, open
    /// mappings are flushed and closed in place (`path` is ignored for them).
    pub fn spill_to(&mut self, path: &Path) -> StrataResult<()> {
        match std::mem::replace(self, Self::Heap(Vec::new())) {
            Self::Heap(buf) => {
                let written = write_new_file(path, &buf);
                match written {
                    Ok(()) => {
                        *self = Self::Closed(ClosedFile::new(path.to_path_buf(), buf.len()));
                        Ok(())
                    }
                    Err(e) => {
                        *self = Self::Heap(buf);
                        Err(e)
                    }
                }
            }
            Self::Mapped(m) => {
                let path = m.path.clone();
                let len = m.len();
                match m.close() {
                    Ok(closed) => {
                        *self = Self::Closed(closed);
                        Ok(())
                    }
                    Err(e) => {
                        *self = Self::Closed(ClosedFile::new(path, len));
                        Err(e)
                    }
                }
            }
            closed @ Self::Closed(_) => {
                *self = closed;
                Ok(())
            }
        }
    }

    pub fn flush(&self) -> StrataResult<()> {
        match self {
            Self::Mapped(m) => m.flush(),
            Self::Heap(_) | Self::Closed(_) => Ok(()),
        }
    }
}

/// An open, writable shared mapping of a cache file.
///
/// Created once with [`MappedFile::create`]; afterwards the file only cycles between
/// [`MappedFile::close`] and [`ClosedFile::reopen`].
#[derive(Debug)]
pub struct MappedFile {
    path: PathBuf,
    map: MmapMut,
}

impl MappedFile {
    /// Create a new zero-filled file of `len` bytes and map it. Fails if the file exists.
    pub fn create(path: impl Into<PathBuf>, len: usize) -> StrataResult<Self> {
        let path = path.into();
        if len == 0 {
            return Err(StrataError::validation(
                "memory-mapped cache files must not be empty",
            ));
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| StrataError::io(&path, e))?;
        file.set_len(len as u64)
            .map_err(|e| StrataError::io(&path, e))?;
        let map = map_file(&path, &file, len)?;
        Ok(Self { path, map })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.map
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.map
    }

    pub fn flush(&self) -> StrataResult<()> {
        self.map.flush().map_err(|e| StrataError::io(&self.path, e))
    }

    /// Flush dirty pages and drop the mapping, keeping the file.
    pub fn close(self) -> StrataResult<ClosedFile> {
        self.flush()?;
        let len = self.map.len();
        Ok(ClosedFile::new(self.path, len))
    }
}

/// A cache file on disk with no live mapping.
#[derive(Debug)]
pub struct ClosedFile {
    path: PathBuf,
    len: usize,
}

impl ClosedFile {
    pub(crate) fn new(path: PathBuf, len: usize) -> Self {
        Self { path, len }
    }

    /// Adopt a file left by an earlier process. Its size must match `len`.
    pub fn existing(path: impl Into<PathBuf>, len: usize) -> StrataResult<Self> {
        let path = path.into();
        let meta = std::fs::metadata(&path).map_err(|e| StrataError::io(&path, e))?;
        if meta.len() != len as u64 || len == 0 {
            return Err(StrataError::validation(format!(
                "cache file {} has {} bytes, expected {len}",
                path.display(),
                meta.len()
            )));
        }
        Ok(Self { path, len })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Map the file again. The file must still have the size it was closed with.
    pub fn reopen(self) -> StrataResult<MappedFile> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)
            .map_err(|e| StrataError::io(&self.path, e))?;
        let actual = file
            .metadata()
            .map_err(|e| StrataError::io(&self.path, e))?
            .len();
        if actual != self.len as u64 {
            return Err(StrataError::validation(format!(
                "cache file {} changed size: {actual} bytes, expected {}",
                self.path.display(),
                self.len
            )));
        }
        let map = map_file(&self.path, &file, self.len)?;
        Ok(MappedFile {
            path: self.path,
            map,
        })
    }
}

#[allow(unsafe_code)]
fn map_file(path: &Path, file: &File, len: usize) -> StrataResult<MmapMut> {
    // SAFETY: cache files live in a directory owned by this cache. They are created, resized
    // and unlinked only under the cache mutex, never truncated while mapped, and byte access
    // through the mapping is serialized by the owning entry's RwLock.
    unsafe { MmapOptions::new().len(len).map_mut(file) }.map_err(|e| StrataError::io(path, e))
}

fn write_new_file(path: &Path, bytes: &[u8]) -> StrataResult<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| StrataError::io(path, e))?;
    file.write_all(bytes).map_err(|e| StrataError::io(path, e))?;
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/cache/storage.rs"]
mod tests;
