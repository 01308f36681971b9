use std::fmt::Debug;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::cache::key::ContentKey;
use crate::cache::storage::Storage;
use crate::foundation::error::{StrataError, StrataResult};
use crate::foundation::sync;

/// Allocation parameters stored next to a key.
pub trait EntryParams:
    Clone + Debug + Send + Sync + Serialize + DeserializeOwned + 'static
{
    /// Size of the backing buffer.
    fn byte_len(&self) -> usize;

    /// Storage cost class: `0` allocates on the heap, anything else backs the entry with a
    /// memory-mapped cache file when the cache has a disk tier.
    fn cost(&self) -> u32;
}

/// An artifact type storable in a [`ContentCache`](crate::ContentCache).
pub trait Cacheable: Send + Sync + 'static {
    type Key: ContentKey;
    type Params: EntryParams;

    /// Wrap a freshly allocated entry. `restored` is true when the bytes come from a
    /// previous session's disk tier.
    fn from_entry(entry: CacheEntry<Self::Key, Self::Params>, restored: bool) -> Self;

    fn entry(&self) -> &CacheEntry<Self::Key, Self::Params>;

    /// Whether the artifact holds its final content. Only complete artifacts are persisted.
    fn is_complete(&self) -> bool {
        true
    }
}

/// One stored artifact: key, params and exactly one backing buffer.
///
/// Byte access goes through [`CacheEntry::read`] / [`CacheEntry::write`], which reopen a closed
/// file mapping on demand. The cache mutex is never held while those guards are alive.
pub struct CacheEntry<K, P> {
    key: K,
    params: P,
    storage: RwLock<Storage>,
    path: Option<PathBuf>,
    claim: u64,
    disowned: AtomicBool,
}

impl<K: ContentKey, P: EntryParams> CacheEntry<K, P> {
    pub(crate) fn new(
        key: K,
        params: P,
        storage: Storage,
        path: Option<PathBuf>,
        claim: u64,
    ) -> Self {
        Self {
            key,
            params,
            storage: RwLock::new(storage),
            path,
            claim,
            disowned: AtomicBool::new(false),
        }
    }

    /// Entry not owned by any cache. Used for artifacts produced outside a cache.
    pub fn detached(key: K, params: P) -> StrataResult<Self> {
        let storage = Storage::allocate_heap(params.byte_len())?;
        let entry = Self::new(key, params, storage, None, 0);
        entry.disown();
        Ok(entry)
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn params(&self) -> &P {
        &self.params
    }

    pub fn hash(&self) -> u64 {
        self.key.content_hash()
    }

    pub fn byte_len(&self) -> usize {
        self.params.byte_len()
    }

    pub fn is_resident(&self) -> bool {
        sync::read(&self.storage).is_resident()
    }

    pub fn is_file_backed(&self) -> bool {
        sync::read(&self.storage).is_file_backed()
    }

    /// Shared access to the bytes, reopening the mapping of a closed file first.
    pub fn read(&self) -> StrataResult<EntryRead<'_>> {
        for _ in 0..3 {
            let guard = sync::read(&self.storage);
            if guard.is_resident() {
                return Ok(EntryRead { guard });
            }
            drop(guard);
            self.ensure_resident()?;
        }
        Err(StrataError::allocation(format!(
            "entry {:016x} was closed again before it could be read",
            self.hash()
        )))
    }

    /// Exclusive access to the bytes, reopening the mapping of a closed file first.
    pub fn write(&self) -> StrataResult<EntryWrite<'_>> {
        let mut guard = sync::write(&self.storage);
        if !guard.is_resident() {
            self.check_owned()?;
            guard.ensure_resident()?;
        }
        Ok(EntryWrite { guard })
    }

    pub(crate) fn ensure_resident(&self) -> StrataResult<()> {
        let mut guard = sync::write(&self.storage);
        if guard.is_resident() {
            return Ok(());
        }
        self.check_owned()?;
        guard.ensure_resident()
    }

    /// Move the bytes to the entry's cache file and drop the mapping.
    pub(crate) fn spill(&self) -> StrataResult<()> {
        let Some(path) = self.path.as_deref() else {
            return Err(StrataError::validation("entry has no cache file path"));
        };
        sync::write(&self.storage).spill_to(path)
    }

    pub(crate) fn flush(&self) -> StrataResult<()> {
        sync::read(&self.storage).flush()
    }

    pub(crate) fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub(crate) fn claim(&self) -> u64 {
        self.claim
    }

    /// Forget the cache file. A disowned entry keeps any live mapping but never reopens its
    /// path again, since the path may now belong to a newer entry.
    pub(crate) fn disown(&self) {
        self.disowned.store(true, Ordering::Release);
    }

    pub(crate) fn is_disowned(&self) -> bool {
        self.disowned.load(Ordering::Acquire)
    }

    fn check_owned(&self) -> StrataResult<()> {
        if self.is_disowned() {
            return Err(StrataError::allocation(format!(
                "entry {:016x} lost its cache file",
                self.hash()
            )));
        }
        Ok(())
    }
}

impl<K: Debug, P: Debug> Debug for CacheEntry<K, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEntry")
            .field("key", &self.key)
            .field("params", &self.params)
            .field("path", &self.path)
            .field("disowned", &self.disowned.load(Ordering::Relaxed))
            .finish()
    }
}

/// Shared byte guard returned by [`CacheEntry::read`].
pub struct EntryRead<'a> {
    guard: RwLockReadGuard<'a, Storage>,
}

impl Deref for EntryRead<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.guard.bytes().unwrap_or_default()
    }
}

/// Exclusive byte guard returned by [`CacheEntry::write`].
pub struct EntryWrite<'a> {
    guard: RwLockWriteGuard<'a, Storage>,
}

impl Deref for EntryWrite<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.guard.bytes().unwrap_or_default()
    }
}

impl DerefMut for EntryWrite<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.guard.bytes_mut().unwrap_or_default()
    }
}
