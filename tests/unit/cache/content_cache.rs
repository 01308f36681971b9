use std::sync::atomic::{AtomicBool, Ordering};

use super::*;

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
struct TestKey {
    id: u32,
    hash: u64,
}

impl ContentKey for TestKey {
    const FILE_EXTENSION: &'static str = "blob";

    fn content_hash(&self) -> u64 {
        self.hash
    }
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
struct BlobParams {
    len: usize,
    cost: u32,
}

impl EntryParams for BlobParams {
    fn byte_len(&self) -> usize {
        self.len
    }

    fn cost(&self) -> u32 {
        self.cost
    }
}

struct Blob {
    entry: CacheEntry<TestKey, BlobParams>,
    restored: bool,
    complete: AtomicBool,
}

impl Cacheable for Blob {
    type Key = TestKey;
    type Params = BlobParams;

    fn from_entry(entry: CacheEntry<TestKey, BlobParams>, restored: bool) -> Self {
        Self {
            entry,
            restored,
            complete: AtomicBool::new(true),
        }
    }

    fn entry(&self) -> &CacheEntry<TestKey, BlobParams> {
        &self.entry
    }

    fn is_complete(&self) -> bool {
        self.complete.load(Ordering::Relaxed)
    }
}

fn key(id: u32) -> TestKey {
    TestKey {
        id,
        hash: 0x9e37_79b9_7f4a_7c15_u64.wrapping_mul(u64::from(id) + 1),
    }
}

fn put(cache: &ContentCache<Blob>, id: u32, len: usize, cost: u32, fill: u8) -> Arc<Blob> {
    let handle = cache.new_entry(key(id), BlobParams { len, cost }).unwrap();
    handle.entry.write().unwrap().fill(fill);
    handle.seal()
}

fn bytes(blob: &Blob) -> Vec<u8> {
    blob.entry().read().unwrap().to_vec()
}

fn disk_cache(root: &Path, mem: u64, disk: u64) -> ContentCache<Blob> {
    ContentCache::open("test", &CacheOpts::with_disk(mem, disk, root))
}

#[test]
fn lru_evicts_least_recently_touched() {
    let cache = ContentCache::<Blob>::memory_only("test", 300);
    put(&cache, 1, 100, 0, 1);
    put(&cache, 2, 100, 0, 2);
    put(&cache, 3, 100, 0, 3);
    assert!(cache.get(&key(1)).is_some());

    put(&cache, 4, 100, 0, 4);

    assert!(cache.get(&key(2)).is_none());
    for id in [1, 3, 4] {
        assert!(cache.get(&key(id)).is_some(), "entry {id} should survive");
    }
    let stats = cache.stats();
    assert_eq!(stats.memory_bytes, 300);
    assert_eq!(stats.memory_entries, 3);
    assert_eq!(stats.evictions, 1);
}

#[test]
fn cache_sized_for_n_entries_holds_n() {
    let cache = ContentCache::<Blob>::memory_only("test", 400);
    for id in 0..4 {
        put(&cache, id, 100, 0, 0);
    }
    assert_eq!(cache.stats().memory_entries, 4);
    assert_eq!(cache.stats().evictions, 0);
}

#[test]
fn hash_collision_is_a_miss() {
    let cache = ContentCache::<Blob>::memory_only("test", 1000);
    let a = TestKey { id: 1, hash: 42 };
    let b = TestKey { id: 2, hash: 42 };
    cache
        .new_entry(a.clone(), BlobParams { len: 4, cost: 0 })
        .unwrap()
        .seal();

    assert!(cache.get(&b).is_none());
    assert!(cache.get(&a).is_some());
    let stats = cache.stats();
    assert_eq!((stats.hits, stats.misses), (1, 1));
}

#[test]
fn handle_drop_seals_entry() {
    let cache = ContentCache::<Blob>::memory_only("test", 1000);
    {
        let handle = cache.new_entry(key(1), BlobParams { len: 8, cost: 0 }).unwrap();
        handle.entry.write().unwrap().fill(5);
    }
    let found = cache.get(&key(1)).unwrap();
    assert_eq!(bytes(&found), vec![5; 8]);
}

#[test]
fn get_or_create_race_keeps_the_later_allocation() {
    let cache = ContentCache::<Blob>::memory_only("test", 1000);
    let params = BlobParams { len: 4, cost: 0 };
    let Some(CacheLookup::Created(first)) = cache.get_or_create(key(1), params.clone()) else {
        panic!("expected a fresh entry");
    };
    let Some(CacheLookup::Created(second)) = cache.get_or_create(key(1), params.clone()) else {
        panic!("the first entry is not sealed yet, so the second caller also misses");
    };
    let first = first.seal();
    let second = second.seal();

    let found = cache.get(&key(1)).unwrap();
    assert!(Arc::ptr_eq(&found, &second));
    assert!(!Arc::ptr_eq(&found, &first));
    assert_eq!(cache.stats().memory_entries, 1);

    let again = cache.get_or_create(key(1), params).unwrap();
    assert!(again.is_found());
}

#[test]
fn oversized_entry_is_not_retained_without_disk() {
    let cache = ContentCache::<Blob>::memory_only("test", 100);
    let blob = put(&cache, 1, 101, 0, 9);
    assert_eq!(bytes(&blob), vec![9; 101]);
    assert!(cache.get(&key(1)).is_none());
    assert_eq!(cache.stats().memory_bytes, 0);
}

#[test]
fn allocation_failure_yields_none() {
    let cache = ContentCache::<Blob>::memory_only("test", 100);
    let handle = cache.new_entry(
        key(1),
        BlobParams {
            len: usize::MAX,
            cost: 0,
        },
    );
    assert!(handle.is_none());
    assert!(cache.new_entry(key(2), BlobParams { len: 4, cost: 0 }).is_some());
}

#[test]
fn evicted_heap_entry_migrates_to_disk_without_promotion() {
    let dir = tempfile::tempdir().unwrap();
    let cache = disk_cache(dir.path(), 200, 1000);
    put(&cache, 1, 100, 0, 1);
    put(&cache, 2, 100, 0, 2);
    put(&cache, 3, 100, 0, 3);

    let stats = cache.stats();
    assert_eq!((stats.memory_entries, stats.disk_entries), (2, 1));
    assert_eq!(stats.migrations, 1);
    let layout = DiskLayout::open(dir.path()).unwrap();
    assert!(layout.path_for(key(1).hash, "blob").is_file());

    let first = cache.get(&key(1)).unwrap();
    assert_eq!(bytes(&first), vec![1; 100]);
    let stats = cache.stats();
    assert_eq!((stats.memory_entries, stats.disk_entries), (2, 1));
}

#[test]
fn file_backed_entries_live_in_shard_files() {
    let dir = tempfile::tempdir().unwrap();
    let cache = disk_cache(dir.path(), 1000, 1000);
    let blob = put(&cache, 1, 64, 1, 3);
    assert!(blob.entry().is_file_backed());
    let path = DiskLayout::open(dir.path())
        .unwrap()
        .path_for(key(1).hash, "blob");
    assert_eq!(std::fs::read(&path).unwrap(), vec![3; 64]);
}

#[test]
fn disk_tier_drops_its_lru_entry_and_file() {
    let dir = tempfile::tempdir().unwrap();
    let cache = disk_cache(dir.path(), 100, 200);
    for id in 0..4 {
        put(&cache, id, 100, 1, id as u8);
    }
    let stats = cache.stats();
    assert_eq!((stats.memory_entries, stats.disk_entries), (1, 2));
    assert!(cache.get(&key(0)).is_none());
    let layout = DiskLayout::open(dir.path()).unwrap();
    assert!(!layout.path_for(key(0).hash, "blob").exists());
    assert_eq!(bytes(&cache.get(&key(1)).unwrap()), vec![1; 100]);
}

#[test]
fn save_then_restore_round_trips_complete_entries() {
    let dir = tempfile::tempdir().unwrap();
    {
        let cache = disk_cache(dir.path(), 1000, 1000);
        put(&cache, 1, 64, 1, 7);
        put(&cache, 2, 32, 0, 8);
        let partial = put(&cache, 3, 16, 1, 9);
        partial.complete.store(false, Ordering::Relaxed);
        assert_eq!(cache.save().unwrap(), 2);
    }

    let cache = disk_cache(dir.path(), 1000, 1000);
    assert_eq!(cache.restore().unwrap(), 2);
    let restored = cache.get(&key(1)).unwrap();
    assert!(restored.restored);
    assert_eq!(bytes(&restored), vec![7; 64]);
    assert_eq!(bytes(&cache.get(&key(2)).unwrap()), vec![8; 32]);
    assert!(cache.get(&key(3)).is_none());
    assert_eq!(cache.stats().disk_entries, 2);
}

#[test]
fn save_spills_heap_entries_and_keeps_them_readable() {
    let dir = tempfile::tempdir().unwrap();
    let cache = disk_cache(dir.path(), 1000, 1000);
    put(&cache, 2, 32, 0, 8);
    assert_eq!(cache.save().unwrap(), 1);

    let stats = cache.stats();
    assert_eq!((stats.memory_entries, stats.disk_entries), (0, 1));
    assert!(DiskLayout::at(dir.path()).path_for(key(2).hash, "blob").exists());
    assert_eq!(bytes(&cache.get(&key(2)).unwrap()), vec![8; 32]);
}

#[test]
fn save_drops_heap_entries_the_disk_budget_cannot_hold() {
    let dir = tempfile::tempdir().unwrap();
    {
        let cache = disk_cache(dir.path(), 1000, 40);
        put(&cache, 1, 32, 0, 1);
        put(&cache, 2, 32, 0, 2);
        assert_eq!(cache.save().unwrap(), 1);
    }
    let cache = disk_cache(dir.path(), 1000, 40);
    assert_eq!(cache.restore().unwrap(), 1);
    assert!(cache.get(&key(1)).is_none());
    assert_eq!(bytes(&cache.get(&key(2)).unwrap()), vec![2; 32]);
}

#[test]
fn restore_skips_files_with_wrong_size() {
    let dir = tempfile::tempdir().unwrap();
    {
        let cache = disk_cache(dir.path(), 1000, 1000);
        put(&cache, 1, 64, 1, 7);
        cache.save().unwrap();
    }
    let layout = DiskLayout::open(dir.path()).unwrap();
    std::fs::write(layout.path_for(key(1).hash, "blob"), [0u8; 10]).unwrap();

    let cache = disk_cache(dir.path(), 1000, 1000);
    assert_eq!(cache.restore().unwrap(), 0);
    assert!(cache.get(&key(1)).is_none());
}

#[test]
fn unsaved_files_are_removed_on_teardown() {
    let dir = tempfile::tempdir().unwrap();
    let path = DiskLayout::open(dir.path())
        .unwrap()
        .path_for(key(1).hash, "blob");
    {
        let cache = disk_cache(dir.path(), 1000, 1000);
        put(&cache, 1, 64, 1, 7);
        assert!(path.exists());
    }
    assert!(!path.exists());
}

#[test]
fn clear_in_memory_portion_moves_entries_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let cache = disk_cache(dir.path(), 1000, 1000);
    put(&cache, 1, 100, 0, 1);
    put(&cache, 2, 100, 1, 2);
    cache.clear_in_memory_portion();

    let stats = cache.stats();
    assert_eq!((stats.memory_entries, stats.disk_entries), (0, 2));
    assert_eq!(stats.memory_bytes, 0);
    assert_eq!(stats.disk_bytes, 200);
    assert_eq!(bytes(&cache.get(&key(2)).unwrap()), vec![2; 100]);
}

#[test]
fn clear_and_remove_delete_files() {
    let dir = tempfile::tempdir().unwrap();
    let layout = DiskLayout::open(dir.path()).unwrap();
    let cache = disk_cache(dir.path(), 1000, 1000);
    put(&cache, 1, 10, 1, 1);
    put(&cache, 2, 10, 1, 2);

    assert!(cache.remove_entry(&key(1)));
    assert!(!cache.remove_entry(&key(1)));
    assert!(!layout.path_for(key(1).hash, "blob").exists());

    cache.clear();
    assert!(!layout.path_for(key(2).hash, "blob").exists());
    let stats = cache.stats();
    assert_eq!(stats.memory_entries + stats.disk_entries, 0);
    assert_eq!(stats.memory_bytes + stats.disk_bytes, 0);
}

#[test]
fn unusable_disk_root_degrades_to_memory_only() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("not-a-dir");
    std::fs::write(&file, b"x").unwrap();
    let cache = disk_cache(&file, 100, 1000);
    assert!(!cache.stats().disk_enabled);

    let blob = put(&cache, 1, 50, 1, 4);
    assert!(!blob.entry().is_file_backed());
    put(&cache, 2, 100, 0, 4);
    assert!(cache.get(&key(1)).is_none());
}

#[test]
fn set_limits_enforces_new_budget() {
    let cache = ContentCache::<Blob>::memory_only("test", 1000);
    for id in 0..5 {
        put(&cache, id, 100, 0, 0);
    }
    cache.set_limits(250, 0);
    let stats = cache.stats();
    assert_eq!(stats.memory_entries, 2);
    assert!(stats.memory_bytes <= 250);
}

#[test]
fn budgets_hold_under_random_operations() {
    let dir = tempfile::tempdir().unwrap();
    let cache = disk_cache(dir.path(), 1_000, 2_000);
    let mut state = 0x2545_f491_4f6c_dd1d_u64;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };

    for _ in 0..500 {
        let id = (next() % 40) as u32;
        match next() % 5 {
            0 | 1 => {
                let len = 1 + (next() % 300) as usize;
                let cost = (next() % 2) as u32;
                put(&cache, id, len, cost, id as u8);
            }
            2 | 3 => {
                if let Some(found) = cache.get(&key(id)) {
                    assert!(bytes(&found).iter().all(|b| *b == id as u8));
                }
            }
            _ => {
                cache.remove_entry(&key(id));
            }
        }
        let stats = cache.stats();
        assert!(stats.memory_bytes <= 1_000, "memory tier over budget: {stats:?}");
        assert!(stats.disk_bytes <= 2_000, "disk tier over budget: {stats:?}");
    }
}

#[test]
fn cache_file_names_parse_back_to_hashes() {
    let layout = DiskLayout::open(tempfile::tempdir().unwrap().path()).unwrap();
    let hash = 0xfe01_2345_6789_abcd;
    let path = layout.path_for(hash, "blob");
    assert_eq!(parse_cache_file_name(0xfe, &path, "blob"), Some(hash));
    assert_eq!(parse_cache_file_name(0xfe, &path, "img"), None);
}
