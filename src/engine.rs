use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::cache::content_cache::{CacheStats, ContentCache};
use crate::foundation::config::EngineOpts;
use crate::foundation::error::{StrataError, StrataResult};
use crate::foundation::sync;
use crate::image::frame::Frame;
use crate::image::image::Image;
use crate::node::effect::Effect;
use crate::node::in_flight::InFlightRegistry;
use crate::node::render_node::{GraphAge, NodeId, RenderNode};

/// Application context shared by every node, graph and scheduler of one project.
///
/// Owns the node and frame caches, the per-effect-type locks used by
/// [`crate::ThreadSafety::Unsafe`] effects, the in-flight registry, the tile pool and the graph
/// age. Passed around as `Arc<Engine>`; there is no global state.
pub struct Engine {
    opts: EngineOpts,
    node_cache: ContentCache<Image>,
    frame_cache: ContentCache<Frame>,
    type_locks: Mutex<HashMap<&'static str, Arc<Mutex<()>>>>,
    in_flight: InFlightRegistry,
    tile_pool: rayon::ThreadPool,
    age: GraphAge,
    next_node_id: AtomicU64,
}

impl Engine {
    /// Validate `opts`, open both caches and restore their disk tiers.
    ///
    /// A disk tier that cannot be restored is logged and starts empty.
    pub fn new(opts: EngineOpts) -> StrataResult<Arc<Self>> {
        opts.validate()?;
        let tile_pool = build_thread_pool(opts.tile_threads)?;
        let node_cache = ContentCache::open("node", &opts.node_cache);
        let frame_cache = ContentCache::open("frame", &opts.frame_cache);

        for (name, restored) in [
            ("node", opts.node_cache.disk_enabled().then(|| node_cache.restore())),
            ("frame", opts.frame_cache.disk_enabled().then(|| frame_cache.restore())),
        ] {
            match restored {
                Some(Ok(n)) => tracing::info!(cache = name, entries = n, "restored disk cache"),
                Some(Err(e)) => tracing::warn!(cache = name, error = %e, "disk cache not restored"),
                None => {}
            }
        }

        tracing::debug!(
            tile_threads = tile_pool.current_num_threads(),
            views = opts.views,
            "engine ready"
        );
        Ok(Arc::new(Self {
            opts,
            node_cache,
            frame_cache,
            type_locks: Mutex::new(HashMap::new()),
            in_flight: InFlightRegistry::new(),
            tile_pool,
            age: GraphAge::new(),
            next_node_id: AtomicU64::new(1),
        }))
    }

    pub fn opts(&self) -> &EngineOpts {
        &self.opts
    }

    pub fn node_cache(&self) -> &ContentCache<Image> {
        &self.node_cache
    }

    pub fn frame_cache(&self) -> &ContentCache<Frame> {
        &self.frame_cache
    }

    pub fn in_flight(&self) -> &InFlightRegistry {
        &self.in_flight
    }

    pub fn tile_pool(&self) -> &rayon::ThreadPool {
        &self.tile_pool
    }

    pub fn age(&self) -> &GraphAge {
        &self.age
    }

    /// Lock serializing every compute of one effect type.
    pub fn type_lock(&self, type_id: &'static str) -> Arc<Mutex<()>> {
        Arc::clone(
            sync::lock(&self.type_locks)
                .entry(type_id)
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    /// Create a node sharing this engine's graph age.
    pub fn create_node(&self, name: impl Into<String>, effect: impl Effect) -> Arc<RenderNode> {
        let id = NodeId(self.next_node_id.fetch_add(1, Ordering::Relaxed));
        self.age.bump();
        Arc::new(RenderNode::new(
            id,
            name.into(),
            Arc::new(effect),
            self.age.clone(),
        ))
    }

    /// Persist the disk tiers of both caches. Returns the entry counts (node, frame).
    pub fn save_caches(&self) -> StrataResult<(usize, usize)> {
        let nodes = if self.opts.node_cache.disk_enabled() {
            self.node_cache.save()?
        } else {
            0
        };
        let frames = if self.opts.frame_cache.disk_enabled() {
            self.frame_cache.save()?
        } else {
            0
        };
        Ok((nodes, frames))
    }

    pub fn clear_caches(&self) {
        self.node_cache.clear();
        self.frame_cache.clear();
    }

    pub fn cache_stats(&self) -> (CacheStats, CacheStats) {
        (self.node_cache.stats(), self.frame_cache.stats())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("opts", &self.opts)
            .field("age", &self.age.current())
            .finish()
    }
}

fn build_thread_pool(threads: Option<usize>) -> StrataResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(StrataError::validation(
            "engine 'tile_threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("strata-tile-{i}"));
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| StrataError::Other(anyhow::anyhow!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../tests/unit/engine.rs"]
mod tests;
