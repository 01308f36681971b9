use std::fmt::Debug;
use std::sync::OnceLock;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::foundation::core::{FrameIndex, RenderScale, ViewIdx};
use crate::foundation::hash::StableHasher;

/// Key of a cached artifact.
///
/// The 64-bit hash addresses the cache slot and the backing file. The semantic fields are kept
/// next to it so a lookup can tell a true hit from a hash collision: two keys are equal only
/// when both their hashes and their fields match.
pub trait ContentKey:
    Clone + Debug + PartialEq + Send + Sync + Serialize + DeserializeOwned + 'static
{
    /// Extension of the backing file in the disk tier.
    const FILE_EXTENSION: &'static str;

    /// Content hash, computed on first use and memoized inside the key.
    fn content_hash(&self) -> u64;
}

/// Identity of one rendered node image.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ImageKey {
    node_hash: u64,
    time: FrameIndex,
    view: ViewIdx,
    scale: RenderScale,
    #[serde(skip)]
    hash: OnceLock<u64>,
}

impl ImageKey {
    pub fn new(node_hash: u64, time: FrameIndex, view: ViewIdx, scale: RenderScale) -> Self {
        Self {
            node_hash,
            time,
            view,
            scale,
            hash: OnceLock::new(),
        }
    }

    pub fn node_hash(&self) -> u64 {
        self.node_hash
    }

    pub fn time(&self) -> FrameIndex {
        self.time
    }

    pub fn view(&self) -> ViewIdx {
        self.view
    }

    pub fn scale(&self) -> RenderScale {
        self.scale
    }
}

impl PartialEq for ImageKey {
    fn eq(&self, other: &Self) -> bool {
        self.content_hash() == other.content_hash()
            && self.node_hash == other.node_hash
            && self.time == other.time
            && self.view == other.view
            && self.scale.to_bits() == other.scale.to_bits()
    }
}

impl ContentKey for ImageKey {
    const FILE_EXTENSION: &'static str = "img";

    fn content_hash(&self) -> u64 {
        *self.hash.get_or_init(|| {
            let mut h = StableHasher::new();
            h.write_str("image");
            h.write_u64(self.node_hash);
            h.write_i64(self.time.0);
            h.write_u32(self.view.0);
            let (sx, sy) = self.scale.to_bits();
            h.write_u64(sx);
            h.write_u64(sy);
            h.finish()
        })
    }
}

/// Identity of one final output frame shown by a viewer.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct FrameKey {
    output_hash: u64,
    time: FrameIndex,
    view: ViewIdx,
    #[serde(skip)]
    hash: OnceLock<u64>,
}

impl FrameKey {
    pub fn new(output_hash: u64, time: FrameIndex, view: ViewIdx) -> Self {
        Self {
            output_hash,
            time,
            view,
            hash: OnceLock::new(),
        }
    }

    pub fn output_hash(&self) -> u64 {
        self.output_hash
    }

    pub fn time(&self) -> FrameIndex {
        self.time
    }

    pub fn view(&self) -> ViewIdx {
        self.view
    }
}

impl PartialEq for FrameKey {
    fn eq(&self, other: &Self) -> bool {
        self.content_hash() == other.content_hash()
            && self.output_hash == other.output_hash
            && self.time == other.time
            && self.view == other.view
    }
}

impl ContentKey for FrameKey {
    const FILE_EXTENSION: &'static str = "frame";

    fn content_hash(&self) -> u64 {
        *self.hash.get_or_init(|| {
            let mut h = StableHasher::new();
            h.write_str("frame");
            h.write_u64(self.output_hash);
            h.write_i64(self.time.0);
            h.write_u32(self.view.0);
            h.finish()
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/cache/key.rs"]
mod tests;
