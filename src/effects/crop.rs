use crate::foundation::core::RectI;
use crate::foundation::error::StrataResult;
use crate::foundation::hash::StableHasher;
use crate::image::image::{ImageView, ImageViewMut};
use crate::node::effect::{ComputeArgs, ComputeStatus, Effect, InputRegions, RenderArgs};

/// Restricts its input to `rect`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Crop {
    pub rect: RectI,
}

impl Crop {
    pub fn new(rect: RectI) -> Self {
        Self { rect }
    }
}

impl Effect for Crop {
    fn type_id(&self) -> &'static str {
        "strata.crop"
    }

    fn max_inputs(&self) -> usize {
        1
    }

    fn hash_params(&self, h: &mut StableHasher) {
        h.write_i32(self.rect.x1);
        h.write_i32(self.rect.y1);
        h.write_i32(self.rect.x2);
        h.write_i32(self.rect.y2);
    }

    fn region_of_definition(
        &self,
        _args: &RenderArgs,
        input_rods: &[Option<RectI>],
    ) -> StrataResult<RectI> {
        Ok(input_rods
            .first()
            .copied()
            .flatten()
            .and_then(|rod| rod.intersect(self.rect))
            .unwrap_or_default())
    }

    fn regions_of_interest(&self, _args: &RenderArgs, window: RectI) -> InputRegions {
        std::iter::once(window.intersect(self.rect)).collect()
    }

    fn compute(
        &self,
        _args: &ComputeArgs<'_>,
        inputs: &[Option<ImageView<'_>>],
        out: &mut ImageViewMut<'_>,
    ) -> StrataResult<ComputeStatus> {
        let w = out.window();
        for y in w.y1..w.y2 {
            for x in w.x1..w.x2 {
                let px = match inputs.first().copied().flatten() {
                    Some(src) if self.rect.contains_point(x, y) => src.pixel(x, y),
                    _ => [0; 4],
                };
                out.set_pixel(x, y, px);
            }
        }
        Ok(ComputeStatus::Done)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/crop.rs"]
mod tests;
