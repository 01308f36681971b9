use smallvec::SmallVec;

use crate::foundation::core::RectI;

/// Per-pixel "already rendered" flags over an image's region of definition.
#[derive(Clone, Debug)]
pub struct Bitmap {
    rod: RectI,
    bits: Vec<u8>,
    rendered: usize,
}

impl Bitmap {
    pub fn new(rod: RectI) -> Self {
        Self {
            rod,
            bits: vec![0; rod.area()],
            rendered: 0,
        }
    }

    pub fn rod(&self) -> RectI {
        self.rod
    }

    pub fn rendered_pixels(&self) -> usize {
        self.rendered
    }

    pub fn is_fully_rendered(&self) -> bool {
        self.rendered == self.bits.len()
    }

    pub fn mark_all(&mut self) {
        self.bits.fill(1);
        self.rendered = self.bits.len();
    }

    /// Flag `rect` (clipped to the RoD) as rendered.
    pub fn mark(&mut self, rect: RectI) {
        let Some(r) = rect.intersect(self.rod) else {
            return;
        };
        for y in r.y1..r.y2 {
            let row = self.row_range(y, r.x1, r.x2);
            for b in &mut self.bits[row] {
                if *b == 0 {
                    *b = 1;
                    self.rendered += 1;
                }
            }
        }
    }

    pub fn is_rendered(&self, x: i32, y: i32) -> bool {
        self.rod.contains_point(x, y) && self.bits[self.index(x, y)] != 0
    }

    /// Rectangles covering every pixel of `roi ∩ rod` not rendered yet.
    ///
    /// The bounding box of the missing pixels is cut into runs of consecutive rows that still
    /// have gaps; each run keeps its own horizontal extent. Rectangles may include pixels that
    /// are already rendered.
    pub fn rects_to_render(&self, roi: RectI) -> SmallVec<[RectI; 4]> {
        let mut out = SmallVec::new();
        let Some(clip) = roi.intersect(self.rod) else {
            return out;
        };
        if self.is_fully_rendered() {
            return out;
        }

        let mut run: Option<RectI> = None;
        for y in clip.y1..clip.y2 {
            let row = &self.bits[self.row_range(y, clip.x1, clip.x2)];
            let first = row.iter().position(|b| *b == 0);
            let last = row.iter().rposition(|b| *b == 0);
            match (first, last) {
                (Some(f), Some(l)) => {
                    let span = RectI::new(clip.x1 + f as i32, y, clip.x1 + l as i32 + 1, y + 1);
                    run = Some(match run {
                        Some(r) => r.union(span),
                        None => span,
                    });
                }
                _ => {
                    if let Some(r) = run.take() {
                        out.push(r);
                    }
                }
            }
        }
        if let Some(r) = run {
            out.push(r);
        }
        out
    }

    fn index(&self, x: i32, y: i32) -> usize {
        let w = self.rod.width() as usize;
        (y - self.rod.y1) as usize * w + (x - self.rod.x1) as usize
    }

    fn row_range(&self, y: i32, x1: i32, x2: i32) -> std::ops::Range<usize> {
        let start = self.index(x1, y);
        start..start + (x2 - x1) as usize
    }
}

#[cfg(test)]
#[path = "../../tests/unit/image/bitmap.rs"]
mod tests;
