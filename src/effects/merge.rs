use crate::foundation::error::StrataResult;
use crate::foundation::hash::StableHasher;
use crate::image::image::{ImageView, ImageViewMut};
use crate::node::effect::{ComputeArgs, ComputeStatus, Effect, ThreadSafety};

/// Input carrying the background plate.
pub const INPUT_B: usize = 0;
/// Optional foreground composited over B.
pub const INPUT_A: usize = 1;
/// Optional mask; its alpha scales the foreground opacity.
pub const INPUT_MASK: usize = 2;

/// Premultiplied `A over B` with a global opacity and an optional mask.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MergeOver {
    pub opacity: f32,
}

impl MergeOver {
    pub fn new(opacity: f32) -> Self {
        Self { opacity }
    }
}

impl Default for MergeOver {
    fn default() -> Self {
        Self { opacity: 1.0 }
    }
}

impl Effect for MergeOver {
    fn type_id(&self) -> &'static str {
        "strata.merge_over"
    }

    fn max_inputs(&self) -> usize {
        3
    }

    fn is_input_optional(&self, input: usize) -> bool {
        input != INPUT_B
    }

    fn is_input_mask(&self, input: usize) -> bool {
        input == INPUT_MASK
    }

    fn thread_safety(&self) -> ThreadSafety {
        ThreadSafety::InstanceSafe
    }

    fn hash_params(&self, h: &mut StableHasher) {
        h.write_f32(self.opacity);
    }

    fn compute(
        &self,
        args: &ComputeArgs<'_>,
        inputs: &[Option<ImageView<'_>>],
        out: &mut ImageViewMut<'_>,
    ) -> StrataResult<ComputeStatus> {
        let input = |i: usize| inputs.get(i).copied().flatten();
        let (b, a, mask) = (input(INPUT_B), input(INPUT_A), input(INPUT_MASK));
        let w = out.window();
        for y in w.y1..w.y2 {
            if args.abort.is_aborted() {
                return Ok(ComputeStatus::Aborted);
            }
            for x in w.x1..w.x2 {
                let dst = b.map_or([0; 4], |v| v.pixel(x, y));
                let px = match a {
                    Some(a) => {
                        let m = mask.map_or(1.0, |v| f32::from(v.pixel(x, y)[3]) / 255.0);
                        over(dst, a.pixel(x, y), self.opacity * m)
                    }
                    None => dst,
                };
                out.set_pixel(x, y, px);
            }
        }
        Ok(ComputeStatus::Done)
    }
}

/// Composite premultiplied `src` over `dst`, with `src` scaled by `opacity`.
pub fn over(dst: [u8; 4], src: [u8; 4], opacity: f32) -> [u8; 4] {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }
    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = sa.saturating_add(mul_div255(u16::from(dst[3]), inv));
    for i in 0..3 {
        let sc = mul_div255(u16::from(src[i]), op);
        let dc = mul_div255(u16::from(dst[i]), inv);
        out[i] = sc.saturating_add(dc);
    }
    out
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/effects/merge.rs"]
mod tests;
