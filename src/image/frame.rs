use std::sync::atomic::{AtomicBool, Ordering};

use crate::cache::entry::{CacheEntry, Cacheable, EntryParams};
use crate::cache::key::FrameKey;
use crate::foundation::core::RectI;
use crate::foundation::error::StrataResult;
use crate::image::image::{BYTES_PER_PIXEL, Image};

/// Allocation parameters of a viewer frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FrameParams {
    /// Window of the output image the frame shows.
    pub rect: RectI,
    pub cost: u32,
}

impl EntryParams for FrameParams {
    fn byte_len(&self) -> usize {
        self.rect.area().saturating_mul(BYTES_PER_PIXEL)
    }

    fn cost(&self) -> u32 {
        self.cost
    }
}

/// Final RGBA8 frame of an output node, kept in the viewer cache for replay.
pub struct Frame {
    entry: CacheEntry<FrameKey, FrameParams>,
    filled: AtomicBool,
}

impl Cacheable for Frame {
    type Key = FrameKey;
    type Params = FrameParams;

    fn from_entry(entry: CacheEntry<FrameKey, FrameParams>, restored: bool) -> Self {
        Self {
            entry,
            filled: AtomicBool::new(restored),
        }
    }

    fn entry(&self) -> &CacheEntry<FrameKey, FrameParams> {
        &self.entry
    }

    fn is_complete(&self) -> bool {
        self.is_filled()
    }
}

impl Frame {
    pub fn key(&self) -> &FrameKey {
        self.entry.key()
    }

    pub fn rect(&self) -> RectI {
        self.entry.params().rect
    }

    pub fn width(&self) -> u32 {
        self.rect().width()
    }

    pub fn height(&self) -> u32 {
        self.rect().height()
    }

    pub fn is_filled(&self) -> bool {
        self.filled.load(Ordering::Acquire)
    }

    /// Copy the frame's window out of `image`.
    pub fn fill_from(&self, image: &Image) -> StrataResult<()> {
        let pixels = image.copy_region(self.rect())?;
        self.entry.write()?.copy_from_slice(&pixels);
        self.filled.store(true, Ordering::Release);
        Ok(())
    }

    /// Tightly packed premultiplied RGBA8 rows.
    pub fn to_rgba8(&self) -> StrataResult<Vec<u8>> {
        Ok(self.entry.read()?.to_vec())
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("key", self.key())
            .field("rect", &self.rect())
            .field("filled", &self.is_filled())
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/image/frame.rs"]
mod tests;
