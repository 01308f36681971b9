#![deny(unsafe_code)]
//! Node-based image compositing core.
//!
//! Render nodes memoize a content hash over their parameters and inputs; rendered regions
//! land in a two-tier (RAM + memory-mapped disk) content cache keyed by that hash, and a
//! playback scheduler drives an output node through time with cooperative abort.

pub mod cache;
pub mod effects;
pub mod engine;
pub mod foundation;
pub mod graph;
pub mod image;
pub mod node;
pub mod playback;

pub use cache::content_cache::{CacheLookup, CacheStats, ContentCache, EntryHandle};
pub use cache::entry::{CacheEntry, Cacheable, EntryParams};
pub use cache::key::{ContentKey, FrameKey, ImageKey};
pub use engine::Engine;
pub use foundation::config::{CacheOpts, EngineOpts};
pub use foundation::core::{FrameIndex, FrameRange, RectI, RenderScale, Rgba8Premul, ViewIdx};
pub use foundation::error::{StrataError, StrataResult};
pub use foundation::hash::StableHasher;
pub use graph::RenderGraph;
pub use image::frame::Frame;
pub use image::image::{Image, ImageView, ImageViewMut};
pub use node::abort::AbortToken;
pub use node::effect::{
    ActiveInputSelector, ComputeArgs, ComputeStatus, Effect, InputRegions, RenderArgs,
    ThreadSafety,
};
pub use node::render_node::{GraphAge, NodeId, RenderNode, RenderRequest};
pub use playback::{
    Direction, LoopMode, PlaybackEvent, PlaybackRequest, PlaybackScheduler, SchedulerState,
    Timeline,
};
