use crate::foundation::error::{StrataError, StrataResult};

/// Frame number on the project timeline. Signed: timelines may start before 0.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub i64);

/// Half-open frame range `[start, end)`.
///
/// [`FrameRange::UNBOUNDED`] is the sentinel a node reports when it does not constrain time
/// (generators); the scheduler replaces it with the timeline bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FrameRange {
    /// Inclusive range start.
    pub start: FrameIndex,
    /// Exclusive range end.
    pub end: FrameIndex,
}

impl FrameRange {
    pub const UNBOUNDED: FrameRange = FrameRange {
        start: FrameIndex(i64::MIN),
        end: FrameIndex(i64::MAX),
    };

    /// Create a validated range with `start <= end`.
    pub fn new(start: FrameIndex, end: FrameIndex) -> StrataResult<Self> {
        if start.0 > end.0 {
            return Err(StrataError::validation("FrameRange start must be <= end"));
        }
        Ok(Self { start, end })
    }

    /// Inclusive `[first, last]` convenience constructor.
    pub fn inclusive(first: i64, last: i64) -> StrataResult<Self> {
        Self::new(FrameIndex(first), FrameIndex(last.saturating_add(1)))
    }

    pub fn len_frames(self) -> u64 {
        self.end.0.saturating_sub(self.start.0).max(0) as u64
    }

    pub fn is_empty(self) -> bool {
        self.start.0 >= self.end.0
    }

    pub fn contains(self, f: FrameIndex) -> bool {
        self.start.0 <= f.0 && f.0 < self.end.0
    }

    /// Last frame inside the range. Empty ranges return `start`.
    pub fn last(self) -> FrameIndex {
        if self.is_empty() {
            return self.start;
        }
        FrameIndex(self.end.0 - 1)
    }

    pub fn is_start_unbounded(self) -> bool {
        self.start.0 == i64::MIN
    }

    pub fn is_end_unbounded(self) -> bool {
        self.end.0 == i64::MAX
    }

    /// Replace unbounded sentinels with the matching bound of `fallback`.
    pub fn bounded_by(self, fallback: FrameRange) -> FrameRange {
        FrameRange {
            start: if self.is_start_unbounded() {
                fallback.start
            } else {
                self.start
            },
            end: if self.is_end_unbounded() {
                fallback.end
            } else {
                self.end
            },
        }
    }

    /// Smallest range covering both.
    pub fn union(self, other: FrameRange) -> FrameRange {
        FrameRange {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn clamp(self, f: FrameIndex) -> FrameIndex {
        if self.is_empty() {
            return self.start;
        }
        FrameIndex(f.0.clamp(self.start.0, self.end.0 - 1))
    }
}

/// Index of a stereo/multi-view output. Single-view projects only use view 0.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct ViewIdx(pub u32);

/// Render scale relative to the full-resolution image (1.0 = full res).
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RenderScale {
    pub x: f64,
    pub y: f64,
}

impl RenderScale {
    pub const FULL: RenderScale = RenderScale { x: 1.0, y: 1.0 };

    pub fn uniform(s: f64) -> Self {
        Self { x: s, y: s }
    }

    /// Bit patterns used for hashing and equality in cache keys.
    pub fn to_bits(self) -> (u64, u64) {
        (self.x.to_bits(), self.y.to_bits())
    }
}

impl Default for RenderScale {
    fn default() -> Self {
        Self::FULL
    }
}

/// Integer pixel rectangle, half-open: `[x1, x2) x [y1, y2)`.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct RectI {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl RectI {
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn from_xywh(x: i32, y: i32, w: u32, h: u32) -> Self {
        Self {
            x1: x,
            y1: y,
            x2: x.saturating_add(w as i32),
            y2: y.saturating_add(h as i32),
        }
    }

    pub fn width(self) -> u32 {
        self.x2.saturating_sub(self.x1).max(0) as u32
    }

    pub fn height(self) -> u32 {
        self.y2.saturating_sub(self.y1).max(0) as u32
    }

    pub fn area(self) -> usize {
        (self.width() as usize).saturating_mul(self.height() as usize)
    }

    pub fn is_empty(self) -> bool {
        self.x1 >= self.x2 || self.y1 >= self.y2
    }

    pub fn contains_point(self, x: i32, y: i32) -> bool {
        x >= self.x1 && x < self.x2 && y >= self.y1 && y < self.y2
    }

    pub fn contains(self, other: RectI) -> bool {
        other.is_empty()
            || (other.x1 >= self.x1
                && other.y1 >= self.y1
                && other.x2 <= self.x2
                && other.y2 <= self.y2)
    }

    /// Overlap of the two rectangles, `None` when they do not intersect.
    pub fn intersect(self, other: RectI) -> Option<RectI> {
        let r = RectI {
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
            x2: self.x2.min(other.x2),
            y2: self.y2.min(other.y2),
        };
        if r.is_empty() { None } else { Some(r) }
    }

    /// Bounding box of both rectangles. Empty rectangles are ignored.
    pub fn union(self, other: RectI) -> RectI {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }
        RectI {
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
            x2: self.x2.max(other.x2),
            y2: self.y2.max(other.y2),
        }
    }

    /// Split into at most `n` horizontal bands of near-equal height, top to bottom.
    pub fn split_rows(self, n: usize) -> Vec<RectI> {
        if self.is_empty() {
            return Vec::new();
        }
        let h = self.height() as usize;
        let n = n.clamp(1, h);
        let base = h / n;
        let extra = h % n;
        let mut out = Vec::with_capacity(n);
        let mut y = self.y1;
        for i in 0..n {
            let rows = base + usize::from(i < extra);
            let y2 = y + rows as i32;
            out.push(RectI::new(self.x1, y, self.x2, y2));
            y = y2;
        }
        out
    }
}

/// Premultiplied RGBA8 (r,g,b already multiplied by a).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8Premul {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8Premul {
    pub fn transparent() -> Self {
        Self {
            r: 0,
            g: 0,
            b: 0,
            a: 0,
        }
    }

    /// Convert straight-alpha RGBA8 into premultiplied RGBA8.
    pub fn from_straight_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        fn premul(c: u8, a: u8) -> u8 {
            let c = u16::from(c);
            let a = u16::from(a);
            (((c * a) + 127) / 255) as u8
        }

        Self {
            r: premul(r, a),
            g: premul(g, a),
            b: premul(b, a),
            a,
        }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
