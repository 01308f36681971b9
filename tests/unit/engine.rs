use super::*;
use crate::cache::entry::EntryParams;
use crate::effects::ConstantColor;
use crate::foundation::config::CacheOpts;
use crate::foundation::core::{RectI, Rgba8Premul};

fn small_opts() -> EngineOpts {
    EngineOpts {
        node_cache: CacheOpts::memory_only(1 << 20),
        frame_cache: CacheOpts::memory_only(1 << 20),
        tile_threads: Some(2),
        ..EngineOpts::default()
    }
}

#[test]
fn zero_tile_threads_is_rejected() {
    let err = Engine::new(EngineOpts {
        tile_threads: Some(0),
        ..small_opts()
    })
    .unwrap_err();
    assert!(matches!(err, StrataError::Validation(_)));
}

#[test]
fn type_locks_are_shared_per_type() {
    let engine = Engine::new(small_opts()).unwrap();
    let a = engine.type_lock("fx.a");
    let b = engine.type_lock("fx.a");
    let c = engine.type_lock("fx.b");
    assert!(Arc::ptr_eq(&a, &b));
    assert!(!Arc::ptr_eq(&a, &c));
}

#[test]
fn nodes_get_unique_ids_and_bump_age() {
    let engine = Engine::new(small_opts()).unwrap();
    let before = engine.age().current();
    let c = ConstantColor::new(Rgba8Premul::transparent(), RectI::new(0, 0, 1, 1));
    let a = engine.create_node("a", c);
    let b = engine.create_node("b", c);
    assert_ne!(a.id(), b.id());
    assert!(engine.age().current() > before);
    assert_eq!(engine.tile_pool().current_num_threads(), 2);
}

#[test]
fn memory_only_caches_save_nothing() {
    let engine = Engine::new(small_opts()).unwrap();
    assert_eq!(engine.save_caches().unwrap(), (0, 0));
    let (nodes, frames) = engine.cache_stats();
    assert!(!nodes.disk_enabled);
    assert!(!frames.disk_enabled);
}

#[test]
fn disk_caches_survive_engine_restart() {
    let dir = tempfile::tempdir().unwrap();
    let opts = EngineOpts {
        node_cache: CacheOpts::with_disk(1 << 20, 1 << 20, dir.path().join("nodes")),
        ..small_opts()
    };
    let key = crate::cache::key::ImageKey::new(
        42,
        crate::foundation::core::FrameIndex(0),
        crate::foundation::core::ViewIdx(0),
        crate::foundation::core::RenderScale::FULL,
    );
    {
        let engine = Engine::new(opts.clone()).unwrap();
        let params = crate::image::image::ImageParams {
            rod: RectI::new(0, 0, 4, 4),
            cost: 1,
        };
        assert_eq!(params.byte_len(), 64);
        let img = engine.node_cache().new_entry(key.clone(), params).unwrap().seal();
        img.write()
            .unwrap()
            .window(RectI::new(0, 0, 4, 4))
            .unwrap()
            .fill([1, 2, 3, 4]);
        img.mark_rendered(RectI::new(0, 0, 4, 4));
        assert_eq!(engine.save_caches().unwrap(), (1, 0));
    }
    let engine = Engine::new(opts).unwrap();
    let img = engine.node_cache().get(&key).unwrap();
    assert!(img.is_fully_rendered());
    assert_eq!(img.pixel(3, 3).unwrap(), [1, 2, 3, 4]);
}
