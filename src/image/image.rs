use std::sync::Mutex;

use smallvec::SmallVec;

use crate::cache::entry::{CacheEntry, Cacheable, EntryParams, EntryRead, EntryWrite};
use crate::cache::key::ImageKey;
use crate::foundation::core::RectI;
use crate::foundation::error::StrataResult;
use crate::foundation::sync;
use crate::image::bitmap::Bitmap;

pub const BYTES_PER_PIXEL: usize = 4;

/// Allocation parameters of a node image: its region of definition and storage cost class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ImageParams {
    pub rod: RectI,
    pub cost: u32,
}

impl EntryParams for ImageParams {
    fn byte_len(&self) -> usize {
        self.rod.area().saturating_mul(BYTES_PER_PIXEL)
    }

    fn cost(&self) -> u32 {
        self.cost
    }
}

/// Premultiplied RGBA8 image covering one node's RoD at one (time, view, scale).
///
/// Pixels are filled progressively: the coverage bitmap records which ones are final, so a
/// later request for a larger region only computes what is missing.
pub struct Image {
    entry: CacheEntry<ImageKey, ImageParams>,
    coverage: Mutex<Bitmap>,
}

impl Cacheable for Image {
    type Key = ImageKey;
    type Params = ImageParams;

    fn from_entry(entry: CacheEntry<ImageKey, ImageParams>, restored: bool) -> Self {
        let mut coverage = Bitmap::new(entry.params().rod);
        if restored {
            coverage.mark_all();
        }
        Self {
            entry,
            coverage: Mutex::new(coverage),
        }
    }

    fn entry(&self) -> &CacheEntry<ImageKey, ImageParams> {
        &self.entry
    }

    fn is_complete(&self) -> bool {
        self.is_fully_rendered()
    }
}

impl Image {
    pub fn key(&self) -> &ImageKey {
        self.entry.key()
    }

    pub fn rod(&self) -> RectI {
        self.entry.params().rod
    }

    pub fn rects_to_render(&self, roi: RectI) -> SmallVec<[RectI; 4]> {
        sync::lock(&self.coverage).rects_to_render(roi)
    }

    pub fn mark_rendered(&self, rect: RectI) {
        sync::lock(&self.coverage).mark(rect);
    }

    pub fn is_fully_rendered(&self) -> bool {
        sync::lock(&self.coverage).is_fully_rendered()
    }

    pub fn is_rendered(&self, x: i32, y: i32) -> bool {
        sync::lock(&self.coverage).is_rendered(x, y)
    }

    /// Lock the pixels for reading.
    pub fn read(&self) -> StrataResult<ImageReadGuard<'_>> {
        Ok(ImageReadGuard {
            bytes: self.entry.read()?,
            rod: self.rod(),
        })
    }

    /// Lock the pixels for writing.
    pub fn write(&self) -> StrataResult<ImageWriteGuard<'_>> {
        Ok(ImageWriteGuard {
            bytes: self.entry.write()?,
            rod: self.rod(),
        })
    }

    pub fn pixel(&self, x: i32, y: i32) -> StrataResult<[u8; 4]> {
        Ok(self.read()?.view().pixel(x, y))
    }

    /// Copy `rect` (clipped to the RoD) into a tightly packed RGBA8 buffer of
    /// `rect.width() * rect.height()` pixels. Pixels outside the RoD are transparent.
    pub fn copy_region(&self, rect: RectI) -> StrataResult<Vec<u8>> {
        let guard = self.read()?;
        let view = guard.view();
        let mut out = vec![0u8; rect.area() * BYTES_PER_PIXEL];
        let Some(clip) = rect.intersect(view.rod()) else {
            return Ok(out);
        };
        let dst_stride = rect.width() as usize * BYTES_PER_PIXEL;
        for y in clip.y1..clip.y2 {
            let src = view.row(y, clip.x1, clip.x2);
            let dst_row = (y - rect.y1) as usize * dst_stride;
            let dst = dst_row + (clip.x1 - rect.x1) as usize * BYTES_PER_PIXEL;
            out[dst..dst + src.len()].copy_from_slice(src);
        }
        Ok(out)
    }
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("key", self.key())
            .field("rod", &self.rod())
            .finish()
    }
}

pub struct ImageReadGuard<'a> {
    bytes: EntryRead<'a>,
    rod: RectI,
}

impl ImageReadGuard<'_> {
    pub fn view(&self) -> ImageView<'_> {
        ImageView::new(&self.bytes, self.rod)
    }
}

pub struct ImageWriteGuard<'a> {
    bytes: EntryWrite<'a>,
    rod: RectI,
}

impl ImageWriteGuard<'_> {
    /// Mutable view restricted to the rows of `window`. `None` when `window` leaves the RoD.
    pub fn window(&mut self, window: RectI) -> Option<ImageViewMut<'_>> {
        if window.is_empty() || !self.rod.contains(window) {
            return None;
        }
        let stride = self.rod.width() as usize * BYTES_PER_PIXEL;
        let start = (window.y1 - self.rod.y1) as usize * stride;
        let end = (window.y2 - self.rod.y1) as usize * stride;
        Some(ImageViewMut {
            data: &mut self.bytes[start..end],
            rows: RectI::new(self.rod.x1, window.y1, self.rod.x2, window.y2),
            window,
        })
    }
}

/// Read-only RGBA8 pixels over `rod`.
#[derive(Clone, Copy)]
pub struct ImageView<'a> {
    data: &'a [u8],
    rod: RectI,
}

impl<'a> ImageView<'a> {
    pub fn new(data: &'a [u8], rod: RectI) -> Self {
        Self { data, rod }
    }

    pub fn rod(&self) -> RectI {
        self.rod
    }

    /// Pixel at `(x, y)`, transparent outside the RoD.
    pub fn pixel(&self, x: i32, y: i32) -> [u8; 4] {
        if !self.rod.contains_point(x, y) {
            return [0; 4];
        }
        let i = self.offset(x, y);
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    /// Bytes of row `y` for `x1..x2`; both must lie inside the RoD.
    pub fn row(&self, y: i32, x1: i32, x2: i32) -> &'a [u8] {
        let start = self.offset(x1, y);
        &self.data[start..start + (x2 - x1) as usize * BYTES_PER_PIXEL]
    }

    fn offset(&self, x: i32, y: i32) -> usize {
        let stride = self.rod.width() as usize * BYTES_PER_PIXEL;
        (y - self.rod.y1) as usize * stride + (x - self.rod.x1) as usize * BYTES_PER_PIXEL
    }
}

/// Writable RGBA8 pixels of one output window.
///
/// `data` holds full-width rows of the image for the window's rows; only `window` may be
/// written through the accessors.
pub struct ImageViewMut<'a> {
    data: &'a mut [u8],
    rows: RectI,
    window: RectI,
}

impl ImageViewMut<'_> {
    pub fn window(&self) -> RectI {
        self.window
    }

    /// Bytes of row `y` restricted to the window's columns.
    pub fn row_mut(&mut self, y: i32) -> &mut [u8] {
        let stride = self.rows.width() as usize * BYTES_PER_PIXEL;
        let start = (y - self.rows.y1) as usize * stride
            + (self.window.x1 - self.rows.x1) as usize * BYTES_PER_PIXEL;
        &mut self.data[start..start + self.window.width() as usize * BYTES_PER_PIXEL]
    }

    pub fn set_pixel(&mut self, x: i32, y: i32, px: [u8; 4]) {
        if !self.window.contains_point(x, y) {
            return;
        }
        let i = (x - self.window.x1) as usize * BYTES_PER_PIXEL;
        let row = self.row_mut(y);
        row[i..i + BYTES_PER_PIXEL].copy_from_slice(&px);
    }

    pub fn fill(&mut self, px: [u8; 4]) {
        for y in self.window.y1..self.window.y2 {
            for dst in self.row_mut(y).chunks_exact_mut(BYTES_PER_PIXEL) {
                dst.copy_from_slice(&px);
            }
        }
    }

    /// Split into disjoint views of at most `n` horizontal bands.
    pub fn split_rows(self, n: usize) -> Vec<Self> {
        let stride = self.rows.width() as usize * BYTES_PER_PIXEL;
        let mut rest = self.data;
        let mut out = Vec::new();
        for band in self.window.split_rows(n) {
            let (head, tail) = std::mem::take(&mut rest).split_at_mut(band.height() as usize * stride);
            rest = tail;
            out.push(ImageViewMut {
                data: head,
                rows: RectI::new(self.rows.x1, band.y1, self.rows.x2, band.y2),
                window: band,
            });
        }
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/image/image.rs"]
mod tests;
