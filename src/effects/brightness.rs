use crate::foundation::error::StrataResult;
use crate::foundation::hash::StableHasher;
use crate::image::image::{ImageView, ImageViewMut};
use crate::node::effect::{ComputeArgs, ComputeStatus, Effect};

/// Multiplies the color channels of its input by `factor`, keeping alpha.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Brightness {
    pub factor: f32,
}

impl Brightness {
    pub fn new(factor: f32) -> Self {
        Self { factor }
    }

    /// Scale one premultiplied pixel. Color stays `<= alpha`.
    pub fn apply(&self, px: [u8; 4]) -> [u8; 4] {
        let f = self.factor.max(0.0);
        let a = px[3];
        let scale = |c: u8| ((f32::from(c) * f).round() as i32).clamp(0, i32::from(a)) as u8;
        [scale(px[0]), scale(px[1]), scale(px[2]), a]
    }
}

impl Effect for Brightness {
    fn type_id(&self) -> &'static str {
        "strata.brightness"
    }

    fn max_inputs(&self) -> usize {
        1
    }

    fn hash_params(&self, h: &mut StableHasher) {
        h.write_f32(self.factor);
    }

    fn compute(
        &self,
        args: &ComputeArgs<'_>,
        inputs: &[Option<ImageView<'_>>],
        out: &mut ImageViewMut<'_>,
    ) -> StrataResult<ComputeStatus> {
        let Some(src) = inputs.first().copied().flatten() else {
            out.fill([0; 4]);
            return Ok(ComputeStatus::Done);
        };
        let w = out.window();
        for y in w.y1..w.y2 {
            if args.abort.is_aborted() {
                return Ok(ComputeStatus::Aborted);
            }
            for x in w.x1..w.x2 {
                out.set_pixel(x, y, self.apply(src.pixel(x, y)));
            }
        }
        Ok(ComputeStatus::Done)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/brightness.rs"]
mod tests;
