use crate::foundation::core::{RectI, Rgba8Premul};
use crate::foundation::error::StrataResult;
use crate::foundation::hash::StableHasher;
use crate::image::image::{ImageView, ImageViewMut};
use crate::node::effect::{ComputeArgs, ComputeStatus, Effect, RenderArgs};

/// Fills `rect` with one premultiplied color. Defined over all time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConstantColor {
    pub color: Rgba8Premul,
    pub rect: RectI,
}

impl ConstantColor {
    pub fn new(color: Rgba8Premul, rect: RectI) -> Self {
        Self { color, rect }
    }
}

impl Effect for ConstantColor {
    fn type_id(&self) -> &'static str {
        "strata.constant"
    }

    fn hash_params(&self, h: &mut StableHasher) {
        h.write_bytes(&self.color.to_array());
        h.write_i32(self.rect.x1);
        h.write_i32(self.rect.y1);
        h.write_i32(self.rect.x2);
        h.write_i32(self.rect.y2);
    }

    fn region_of_definition(
        &self,
        _args: &RenderArgs,
        _input_rods: &[Option<RectI>],
    ) -> StrataResult<RectI> {
        Ok(self.rect)
    }

    fn compute(
        &self,
        args: &ComputeArgs<'_>,
        _inputs: &[Option<ImageView<'_>>],
        out: &mut ImageViewMut<'_>,
    ) -> StrataResult<ComputeStatus> {
        if args.abort.is_aborted() {
            return Ok(ComputeStatus::Aborted);
        }
        out.fill(self.color.to_array());
        Ok(ComputeStatus::Done)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/constant.rs"]
mod tests;
