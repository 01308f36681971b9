use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::ops::Deref;
use std::path::Path;
use std::sync::{Arc, Mutex};

use lru::LruCache;

use crate::cache::entry::{CacheEntry, Cacheable, EntryParams};
use crate::cache::key::ContentKey;
use crate::cache::storage::{ClosedFile, MappedFile, Storage};
use crate::cache::toc::{DiskLayout, SHARD_COUNT, TableOfContents, TocRecord};
use crate::foundation::config::CacheOpts;
use crate::foundation::error::{StrataError, StrataResult};
use crate::foundation::hash::hash_hex;
use crate::foundation::sync;

/// Snapshot of a cache's occupancy and counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub memory_bytes: u64,
    pub memory_entries: usize,
    pub max_memory_bytes: u64,
    pub disk_bytes: u64,
    pub disk_entries: usize,
    pub max_disk_bytes: u64,
    pub disk_enabled: bool,
    pub hits: u64,
    pub misses: u64,
    /// Entries pushed out of a tier by the LRU policy.
    pub evictions: u64,
    /// Memory-tier entries that landed in the disk tier.
    pub migrations: u64,
}

/// Two-tier (memory + disk) LRU store of artifacts addressed by content hash.
///
/// One mutex guards the containers and byte counters. It is never held while artifact bytes
/// are read or written: entries leaving the memory tier are detached under the lock, spilled
/// to disk with the lock released, then re-inserted. Every create, rename or unlink of a cache
/// file path happens under the lock.
pub struct ContentCache<T: Cacheable> {
    name: &'static str,
    inner: Mutex<Inner<T>>,
}

struct Inner<T: Cacheable> {
    memory: LruCache<u64, Arc<T>>,
    disk: LruCache<u64, Arc<T>>,
    /// Memory-tier victims on their way to the disk tier.
    migrating: HashMap<u64, Arc<T>>,
    /// Newest unsealed claim per hash. Only that claim may seal.
    claims: HashMap<u64, u64>,
    /// Claim whose bytes currently own the cache file path of a hash.
    file_owner: HashMap<u64, u64>,
    /// Claims whose files are listed in the saved TOC and survive teardown.
    persisted: HashSet<u64>,
    next_claim: u64,
    memory_bytes: u64,
    disk_bytes: u64,
    max_memory_bytes: u64,
    max_disk_bytes: u64,
    layout: Option<DiskLayout>,
    disk_ok: bool,
    hits: u64,
    misses: u64,
    evictions: u64,
    migrations: u64,
}

/// Result of [`ContentCache::get_or_create`].
pub enum CacheLookup<'a, T: Cacheable> {
    /// The key was cached already.
    Found(Arc<T>),
    /// Nothing was cached; a fresh entry was allocated for the caller to fill.
    Created(EntryHandle<'a, T>),
}

impl<T: Cacheable> CacheLookup<'_, T> {
    pub fn artifact(&self) -> &Arc<T> {
        match self {
            Self::Found(a) => a,
            Self::Created(h) => h.artifact(),
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

/// Exclusive handle on a newly allocated entry. Sealing it (explicitly or on drop) inserts the
/// entry into the memory tier.
pub struct EntryHandle<'a, T: Cacheable> {
    cache: &'a ContentCache<T>,
    artifact: Arc<T>,
    sealed: bool,
}

impl<T: Cacheable> EntryHandle<'_, T> {
    pub fn artifact(&self) -> &Arc<T> {
        &self.artifact
    }

    pub fn seal(mut self) -> Arc<T> {
        self.sealed = true;
        self.cache.seal(&self.artifact);
        Arc::clone(&self.artifact)
    }
}

impl<T: Cacheable> Deref for EntryHandle<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.artifact
    }
}

impl<T: Cacheable> Drop for EntryHandle<'_, T> {
    fn drop(&mut self) {
        if !self.sealed {
            self.cache.seal(&self.artifact);
        }
    }
}

impl<T: Cacheable> ContentCache<T> {
    /// Build a cache from options. A disk tier that cannot be set up is logged and skipped.
    pub fn open(name: &'static str, opts: &CacheOpts) -> Self {
        let layout = match (&opts.disk_root, opts.disk_enabled()) {
            (Some(root), true) => match DiskLayout::open(root) {
                Ok(layout) => Some(layout),
                Err(e) => {
                    tracing::warn!(cache = name, error = %e, "disk tier unavailable, running memory-only");
                    None
                }
            },
            _ => None,
        };
        let disk_ok = layout.is_some();
        Self {
            name,
            inner: Mutex::new(Inner {
                memory: LruCache::unbounded(),
                disk: LruCache::unbounded(),
                migrating: HashMap::new(),
                claims: HashMap::new(),
                file_owner: HashMap::new(),
                persisted: HashSet::new(),
                next_claim: 0,
                memory_bytes: 0,
                disk_bytes: 0,
                max_memory_bytes: opts.max_memory_bytes,
                max_disk_bytes: if disk_ok { opts.max_disk_bytes } else { 0 },
                layout,
                disk_ok,
                hits: 0,
                misses: 0,
                evictions: 0,
                migrations: 0,
            }),
        }
    }

    pub fn memory_only(name: &'static str, max_memory_bytes: u64) -> Self {
        Self::open(name, &CacheOpts::memory_only(max_memory_bytes))
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn stats(&self) -> CacheStats {
        let inner = sync::lock(&self.inner);
        CacheStats {
            memory_bytes: inner.memory_bytes,
            memory_entries: inner.memory.len(),
            max_memory_bytes: inner.max_memory_bytes,
            disk_bytes: inner.disk_bytes,
            disk_entries: inner.disk.len(),
            max_disk_bytes: inner.max_disk_bytes,
            disk_enabled: inner.disk_layout().is_some(),
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
            migrations: inner.migrations,
        }
    }

    /// Look up `key`: memory tier first, then disk tier.
    ///
    /// A disk hit reopens the file mapping but leaves the entry in the disk tier. A hash match
    /// whose semantic key differs counts as a miss.
    pub fn get(&self, key: &T::Key) -> Option<Arc<T>> {
        let hash = key.content_hash();
        let (found, from_disk) = {
            let mut inner = sync::lock(&self.inner);
            let (candidate, from_disk) = if let Some(a) = inner.memory.get(&hash) {
                (Some(Arc::clone(a)), false)
            } else if let Some(a) = inner.disk.get(&hash) {
                (Some(Arc::clone(a)), true)
            } else {
                (inner.migrating.get(&hash).cloned(), false)
            };
            match candidate {
                Some(a) if a.entry().key() == key => {
                    inner.hits = inner.hits.saturating_add(1);
                    (a, from_disk)
                }
                Some(_) => {
                    tracing::debug!(cache = self.name, hash = %hash_hex(hash), "hash collision, treating as miss");
                    inner.misses = inner.misses.saturating_add(1);
                    return None;
                }
                None => {
                    inner.misses = inner.misses.saturating_add(1);
                    return None;
                }
            }
        };

        if from_disk && let Err(e) = found.entry().ensure_resident() {
            tracing::debug!(cache = self.name, hash = %hash_hex(hash), error = %e, "disk entry could not be reopened");
            self.forget(&found);
            return None;
        }
        Some(found)
    }

    /// Allocate a new entry for `key`. Heap storage when `params.cost() == 0` (or no disk
    /// tier is available), a memory-mapped cache file otherwise.
    ///
    /// Any entry already cached under the same hash is dropped from the cache; holders keep
    /// their `Arc`. Returns `None` when no storage could be allocated.
    pub fn new_entry(&self, key: T::Key, params: T::Params) -> Option<EntryHandle<'_, T>> {
        let hash = key.content_hash();
        let len = params.byte_len();
        let wants_file = params.cost() > 0 && len > 0;
        let mut garbage = Vec::new();

        let (claim, path, mapped) = {
            let mut inner = sync::lock(&self.inner);
            let claim = inner.next_claim();
            inner.claims.insert(hash, claim);
            inner.detach_hash(hash, &mut garbage);
            let path = inner
                .disk_layout()
                .map(|l| l.path_for(hash, T::Key::FILE_EXTENSION));
            let mapped = match (&path, wants_file) {
                (Some(p), true) => match create_mapped(p, len) {
                    Ok(m) => {
                        inner.file_owner.insert(hash, claim);
                        Some(m)
                    }
                    Err(e) => {
                        inner.degrade(self.name, &e);
                        None
                    }
                },
                _ => None,
            };
            (claim, path, mapped)
        };
        drop(garbage);

        let storage = match mapped {
            Some(m) => Storage::Mapped(m),
            None => match Storage::allocate_heap(len) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(cache = self.name, bytes = len, error = %e, "cache allocation failed");
                    let mut inner = sync::lock(&self.inner);
                    if inner.claims.get(&hash) == Some(&claim) {
                        inner.claims.remove(&hash);
                    }
                    return None;
                }
            },
        };

        let entry = CacheEntry::new(key, params, storage, path, claim);
        Some(EntryHandle {
            cache: self,
            artifact: Arc::new(T::from_entry(entry, false)),
            sealed: false,
        })
    }

    /// Return the cached artifact for `key`, or allocate a new entry for the caller to fill.
    ///
    /// The lookup and the allocation are separate critical sections: two threads missing the
    /// same key both get `Created`, both compute, and the later allocation wins the slot.
    /// `None` means the allocation failed.
    pub fn get_or_create(&self, key: T::Key, params: T::Params) -> Option<CacheLookup<'_, T>> {
        if let Some(found) = self.get(&key) {
            return Some(CacheLookup::Found(found));
        }
        self.new_entry(key, params).map(CacheLookup::Created)
    }

    /// Drop the entry cached under `key`, deleting its cache file. Returns whether one existed.
    pub fn remove_entry(&self, key: &T::Key) -> bool {
        let hash = key.content_hash();
        let mut garbage = Vec::new();
        {
            let mut inner = sync::lock(&self.inner);
            let matches = [
                inner.memory.peek(&hash),
                inner.disk.peek(&hash),
                inner.migrating.get(&hash),
            ]
            .into_iter()
            .flatten()
            .any(|a| a.entry().key() == key);
            if matches {
                inner.detach_hash(hash, &mut garbage);
            }
        }
        !garbage.is_empty()
    }

    /// Drop every entry of both tiers and delete their cache files.
    #[tracing::instrument(skip(self), fields(cache = self.name))]
    pub fn clear(&self) {
        let mut garbage = Vec::new();
        {
            let mut inner = sync::lock(&self.inner);
            while let Some((_, a)) = inner.memory.pop_lru() {
                inner.release(&a);
                garbage.push(a);
            }
            while let Some((_, a)) = inner.disk.pop_lru() {
                inner.release(&a);
                garbage.push(a);
            }
            let migrating: Vec<_> = inner.migrating.drain().map(|(_, a)| a).collect();
            for a in migrating {
                inner.release(&a);
                garbage.push(a);
            }
            inner.claims.clear();
            inner.memory_bytes = 0;
            inner.disk_bytes = 0;
        }
        tracing::debug!(entries = garbage.len(), "cache cleared");
    }

    /// Move every memory-tier entry to the disk tier (dropping those that do not fit).
    #[tracing::instrument(skip(self), fields(cache = self.name))]
    pub fn clear_in_memory_portion(&self) {
        let victims = {
            let mut inner = sync::lock(&self.inner);
            inner.evict_memory_until(0)
        };
        self.migrate(victims);
    }

    /// Best-effort pass evicting until both tiers are within budget.
    pub fn enforce_budget(&self) {
        let (victims, dropped) = {
            let mut inner = sync::lock(&self.inner);
            let max = inner.max_memory_bytes;
            let victims = inner.evict_memory_until(max);
            let max_disk = inner.max_disk_bytes;
            (victims, inner.evict_disk_until(max_disk))
        };
        drop(dropped);
        self.migrate(victims);
    }

    /// Change the budgets, evicting as needed to honor them.
    pub fn set_limits(&self, max_memory_bytes: u64, max_disk_bytes: u64) {
        {
            let mut inner = sync::lock(&self.inner);
            inner.max_memory_bytes = max_memory_bytes;
            if inner.disk_layout().is_some() {
                inner.max_disk_bytes = max_disk_bytes;
            }
        }
        self.enforce_budget();
    }

    /// Move the memory tier to disk, then persist the TOC of every complete entry on disk.
    /// Returns the number of records.
    ///
    /// Entries the disk budget cannot hold are dropped by the migration, as on eviction.
    #[tracing::instrument(skip(self), fields(cache = self.name))]
    pub fn save(&self) -> StrataResult<usize> {
        if sync::lock(&self.inner).disk_layout().is_none() {
            return Ok(0);
        }
        self.clear_in_memory_portion();

        let (layout, candidates) = {
            let inner = sync::lock(&self.inner);
            let Some(layout) = inner.disk_layout().cloned() else {
                return Ok(0);
            };
            let candidates: Vec<Arc<T>> = inner
                .memory
                .iter()
                .chain(inner.disk.iter())
                .map(|(_, a)| a)
                .filter(|a| inner.owns_file(a.entry()))
                .cloned()
                .collect();
            (layout, candidates)
        };

        let mut toc = TableOfContents::default();
        let mut saved = Vec::new();
        for artifact in candidates {
            if !artifact.is_complete() {
                continue;
            }
            let entry = artifact.entry();
            if let Err(e) = entry.flush() {
                tracing::warn!(hash = %hash_hex(entry.hash()), error = %e, "skipping entry that failed to flush");
                continue;
            }
            toc.records.push(TocRecord {
                hash: entry.hash(),
                key: entry.key().clone(),
                params: entry.params().clone(),
            });
            saved.push(entry.claim());
        }

        layout.write_toc(&toc)?;
        let mut inner = sync::lock(&self.inner);
        inner.persisted.extend(saved);
        tracing::info!(records = toc.records.len(), "cache table of contents saved");
        Ok(toc.records.len())
    }

    /// Adopt the entries listed in the saved TOC whose files still exist with the recorded
    /// size, then delete cache files nothing refers to. Returns the number adopted.
    #[tracing::instrument(skip(self), fields(cache = self.name))]
    pub fn restore(&self) -> StrataResult<usize> {
        let Some(layout) = sync::lock(&self.inner).disk_layout().cloned() else {
            return Ok(0);
        };
        let toc: TableOfContents<T::Key, T::Params> = match layout.read_toc() {
            Ok(toc) => toc,
            Err(e) => {
                tracing::warn!(error = %e, "unreadable cache TOC, resetting disk tier");
                layout.reset()?;
                return Ok(0);
            }
        };

        let mut adopted = 0usize;
        let mut garbage = Vec::new();
        for record in toc.records {
            if record.key.content_hash() != record.hash {
                tracing::debug!(hash = %hash_hex(record.hash), "TOC record hash does not match its key");
                continue;
            }
            let path = layout.path_for(record.hash, T::Key::FILE_EXTENSION);
            let Ok(closed) = ClosedFile::existing(&path, record.params.byte_len()) else {
                continue;
            };
            let n = record.params.byte_len() as u64;

            let mut inner = sync::lock(&self.inner);
            if inner.is_live(record.hash) || n > inner.max_disk_bytes {
                continue;
            }
            let claim = inner.next_claim();
            let entry = CacheEntry::new(
                record.key,
                record.params,
                Storage::Closed(closed),
                Some(path),
                claim,
            );
            let max = inner.max_disk_bytes - n;
            garbage.extend(inner.evict_disk_until(max));
            inner.disk.put(record.hash, Arc::new(T::from_entry(entry, true)));
            inner.disk_bytes = inner.disk_bytes.saturating_add(n);
            inner.file_owner.insert(record.hash, claim);
            inner.persisted.insert(claim);
            adopted += 1;
        }

        self.prune_orphans(&layout);
        tracing::info!(adopted, "cache restored from disk");
        Ok(adopted)
    }

    fn prune_orphans(&self, layout: &DiskLayout) {
        let ext = T::Key::FILE_EXTENSION;
        let inner = sync::lock(&self.inner);
        for shard in 0..SHARD_COUNT {
            let dir = layout.root().join(format!("{shard:02x}"));
            let Ok(files) = std::fs::read_dir(&dir) else {
                continue;
            };
            for file in files.flatten() {
                let path = file.path();
                let owned = parse_cache_file_name(shard, &path, ext)
                    .is_some_and(|hash| inner.file_owner.contains_key(&hash));
                if path.extension().is_some_and(|e| e == ext) && !owned {
                    remove_file_quiet(&path);
                }
            }
        }
    }

    fn seal(&self, artifact: &Arc<T>) {
        let entry = artifact.entry();
        let hash = entry.hash();
        let n = entry.byte_len() as u64;
        let mut garbage = Vec::new();
        let victims = {
            let mut inner = sync::lock(&self.inner);
            if inner.claims.get(&hash) != Some(&entry.claim()) {
                tracing::debug!(cache = self.name, hash = %hash_hex(hash), "superseded entry not retained");
                entry.disown();
                return;
            }
            inner.claims.remove(&hash);
            inner.detach_hash(hash, &mut garbage);

            if n > inner.max_memory_bytes {
                inner.migrating.insert(hash, Arc::clone(artifact));
                vec![Arc::clone(artifact)]
            } else {
                let max = inner.max_memory_bytes - n;
                let victims = inner.evict_memory_until(max);
                inner.memory.put(hash, Arc::clone(artifact));
                inner.memory_bytes = inner.memory_bytes.saturating_add(n);
                victims
            }
        };
        drop(garbage);
        self.migrate(victims);
    }

    /// Move detached memory-tier victims into the disk tier.
    fn migrate(&self, victims: Vec<Arc<T>>) {
        for artifact in victims {
            let entry = artifact.entry();
            let hash = entry.hash();
            let n = entry.byte_len() as u64;

            {
                let mut inner = sync::lock(&self.inner);
                if !inner.is_migrating(&artifact) {
                    continue;
                }
                let fits = n > 0 && n <= inner.max_disk_bytes && entry.path().is_some();
                if inner.disk_layout().is_none() || !fits {
                    inner.migrating.remove(&hash);
                    inner.release(&artifact);
                    continue;
                }
                if !inner.owns_file(entry) {
                    inner.file_owner.insert(hash, entry.claim());
                    if let Some(p) = entry.path() {
                        remove_file_quiet(p);
                    }
                }
            }

            let spilled = entry.spill();

            let mut garbage = Vec::new();
            let mut inner = sync::lock(&self.inner);
            if !inner.is_migrating(&artifact) {
                if spilled.is_ok()
                    && !inner.file_owner.contains_key(&hash)
                    && let Some(p) = entry.path()
                {
                    remove_file_quiet(p);
                }
                continue;
            }
            inner.migrating.remove(&hash);
            if let Err(e) = spilled {
                if !is_already_exists(&e) {
                    inner.degrade(self.name, &e);
                }
                inner.release(&artifact);
                continue;
            }
            if inner.disk_layout().is_none() || n > inner.max_disk_bytes {
                inner.release(&artifact);
                continue;
            }
            let max = inner.max_disk_bytes - n;
            garbage.extend(inner.evict_disk_until(max));
            inner.disk.put(hash, Arc::clone(&artifact));
            inner.disk_bytes = inner.disk_bytes.saturating_add(n);
            inner.migrations = inner.migrations.saturating_add(1);
            drop(inner);
            tracing::trace!(cache = self.name, hash = %hash_hex(hash), bytes = n, "migrated to disk tier");
        }
    }

    /// Remove an entry that turned out to be unusable.
    fn forget(&self, artifact: &Arc<T>) {
        let hash = artifact.entry().hash();
        let mut inner = sync::lock(&self.inner);
        if inner.disk.peek(&hash).is_some_and(|a| Arc::ptr_eq(a, artifact)) {
            inner.disk.pop(&hash);
            inner.disk_bytes = inner.disk_bytes.saturating_sub(artifact.entry().byte_len() as u64);
            inner.release(artifact);
        }
    }
}

impl<T: Cacheable> Drop for ContentCache<T> {
    fn drop(&mut self) {
        let inner = sync::lock(&self.inner);
        let Some(layout) = inner.layout.as_ref() else {
            return;
        };
        for (hash, claim) in &inner.file_owner {
            if !inner.persisted.contains(claim) {
                remove_file_quiet(&layout.path_for(*hash, T::Key::FILE_EXTENSION));
            }
        }
    }
}

impl<T: Cacheable> Inner<T> {
    fn next_claim(&mut self) -> u64 {
        self.next_claim += 1;
        self.next_claim
    }

    fn disk_layout(&self) -> Option<&DiskLayout> {
        if self.disk_ok {
            self.layout.as_ref()
        } else {
            None
        }
    }

    fn degrade(&mut self, name: &str, err: &StrataError) {
        if self.disk_ok {
            tracing::warn!(cache = name, error = %err, "disk tier failed, continuing memory-only");
            self.disk_ok = false;
        }
    }

    fn owns_file(&self, entry: &CacheEntry<T::Key, T::Params>) -> bool {
        self.file_owner.get(&entry.hash()) == Some(&entry.claim())
    }

    fn is_migrating(&self, artifact: &Arc<T>) -> bool {
        self.migrating
            .get(&artifact.entry().hash())
            .is_some_and(|a| Arc::ptr_eq(a, artifact))
    }

    fn is_live(&self, hash: u64) -> bool {
        self.memory.contains(&hash)
            || self.disk.contains(&hash)
            || self.migrating.contains_key(&hash)
            || self.claims.contains_key(&hash)
            || self.file_owner.contains_key(&hash)
    }

    /// Disown an entry leaving the cache and delete its file if it still owns the path.
    fn release(&mut self, artifact: &Arc<T>) {
        let entry = artifact.entry();
        entry.disown();
        if self.owns_file(entry) {
            self.file_owner.remove(&entry.hash());
            self.persisted.remove(&entry.claim());
            if let Some(p) = entry.path() {
                remove_file_quiet(p);
            }
        }
    }

    fn detach_hash(&mut self, hash: u64, out: &mut Vec<Arc<T>>) {
        if let Some(a) = self.memory.pop(&hash) {
            self.memory_bytes = self
                .memory_bytes
                .saturating_sub(a.entry().byte_len() as u64);
            self.release(&a);
            out.push(a);
        }
        if let Some(a) = self.disk.pop(&hash) {
            self.disk_bytes = self.disk_bytes.saturating_sub(a.entry().byte_len() as u64);
            self.release(&a);
            out.push(a);
        }
        if let Some(a) = self.migrating.remove(&hash) {
            self.release(&a);
            out.push(a);
        }
    }

    /// Pop memory-tier LRU entries into `migrating` until `memory_bytes <= max`.
    fn evict_memory_until(&mut self, max: u64) -> Vec<Arc<T>> {
        let mut victims = Vec::new();
        while self.memory_bytes > max {
            let Some((hash, a)) = self.memory.pop_lru() else {
                break;
            };
            self.memory_bytes = self
                .memory_bytes
                .saturating_sub(a.entry().byte_len() as u64);
            self.evictions = self.evictions.saturating_add(1);
            self.migrating.insert(hash, Arc::clone(&a));
            victims.push(a);
        }
        victims
    }

    /// Drop disk-tier LRU entries until `disk_bytes <= max`.
    fn evict_disk_until(&mut self, max: u64) -> Vec<Arc<T>> {
        let mut dropped = Vec::new();
        while self.disk_bytes > max {
            let Some((_, a)) = self.disk.pop_lru() else {
                break;
            };
            self.disk_bytes = self.disk_bytes.saturating_sub(a.entry().byte_len() as u64);
            self.evictions = self.evictions.saturating_add(1);
            self.release(&a);
            dropped.push(a);
        }
        dropped
    }
}

/// Create a cache file at `path`, replacing whatever stale file is there.
fn create_mapped(path: &Path, len: usize) -> StrataResult<MappedFile> {
    let mut last = None;
    for _ in 0..3 {
        remove_file_quiet(path);
        match MappedFile::create(path, len) {
            Ok(m) => return Ok(m),
            Err(e) if is_already_exists(&e) => last = Some(e),
            Err(e) => return Err(e),
        }
    }
    Err(last.unwrap_or_else(|| StrataError::allocation("could not create cache file")))
}

fn is_already_exists(err: &StrataError) -> bool {
    matches!(err, StrataError::Io { source, .. } if source.kind() == ErrorKind::AlreadyExists)
}

fn remove_file_quiet(path: &Path) {
    if let Err(e) = std::fs::remove_file(path)
        && e.kind() != ErrorKind::NotFound
    {
        tracing::debug!(path = %path.display(), error = %e, "could not delete cache file");
    }
}

/// Recover the hash from `<root>/<hh>/<rest>.<ext>`.
fn parse_cache_file_name(shard: usize, path: &Path, ext: &str) -> Option<u64> {
    if path.extension()? != ext {
        return None;
    }
    let rest = path.file_stem()?.to_str()?;
    if rest.len() != 14 {
        return None;
    }
    u64::from_str_radix(&format!("{shard:02x}{rest}"), 16).ok()
}

#[cfg(test)]
#[path = "../../tests/unit/cache/content_cache.rs"]
mod tests;
