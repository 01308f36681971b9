use smallvec::SmallVec;

use crate::foundation::core::{FrameRange, RectI};
use crate::foundation::error::StrataResult;
use crate::foundation::hash::StableHasher;
use crate::image::image::{ImageView, ImageViewMut};
use crate::node::effect::{
    ActiveInputSelector, ComputeArgs, ComputeStatus, Effect, InputRegions, RenderArgs,
};

/// Passes one of up to `inputs` optional inputs through unchanged.
///
/// Only the active input is rendered, hashed as upstream content and followed by graph
/// traversal. Switching the active input installs a new `Inspector`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Inspector {
    inputs: usize,
    active: Option<usize>,
}

impl Inspector {
    /// Viewer with `inputs` slots, showing the first one.
    pub fn new(inputs: usize) -> Self {
        Self {
            inputs,
            active: (inputs > 0).then_some(0),
        }
    }

    /// Same slots, showing `active` (`None` for nothing). Out-of-range indices show nothing.
    pub fn with_active(self, active: Option<usize>) -> Self {
        Self {
            active: active.filter(|i| *i < self.inputs),
            ..self
        }
    }
}

impl ActiveInputSelector for Inspector {
    fn active_input(&self) -> Option<usize> {
        self.active
    }
}

impl Effect for Inspector {
    fn type_id(&self) -> &'static str {
        "strata.inspector"
    }

    fn max_inputs(&self) -> usize {
        self.inputs
    }

    fn is_input_optional(&self, _input: usize) -> bool {
        true
    }

    fn hash_params(&self, h: &mut StableHasher) {
        h.write_u64(self.inputs as u64);
        match self.active {
            Some(i) => {
                h.write_u8(1);
                h.write_u64(i as u64);
            }
            None => h.write_u8(0),
        }
    }

    fn region_of_definition(
        &self,
        _args: &RenderArgs,
        input_rods: &[Option<RectI>],
    ) -> StrataResult<RectI> {
        Ok(self
            .active
            .and_then(|i| input_rods.get(i).copied().flatten())
            .unwrap_or_default())
    }

    fn regions_of_interest(&self, _args: &RenderArgs, window: RectI) -> InputRegions {
        (0..self.inputs)
            .map(|i| (Some(i) == self.active).then_some(window))
            .collect::<SmallVec<_>>()
    }

    fn compute(
        &self,
        _args: &ComputeArgs<'_>,
        inputs: &[Option<ImageView<'_>>],
        out: &mut ImageViewMut<'_>,
    ) -> StrataResult<ComputeStatus> {
        let src = self.active.and_then(|i| inputs.get(i).copied().flatten());
        let w = out.window();
        for y in w.y1..w.y2 {
            match src {
                Some(src) if src.rod().contains(RectI::new(w.x1, y, w.x2, y + 1)) => {
                    out.row_mut(y).copy_from_slice(src.row(y, w.x1, w.x2));
                }
                _ => {
                    for x in w.x1..w.x2 {
                        out.set_pixel(x, y, src.map_or([0; 4], |s| s.pixel(x, y)));
                    }
                }
            }
        }
        Ok(ComputeStatus::Done)
    }

    fn frame_range(&self, input_ranges: &[Option<FrameRange>]) -> FrameRange {
        self.active
            .and_then(|i| input_ranges.get(i).copied().flatten())
            .unwrap_or(FrameRange::UNBOUNDED)
    }

    fn active_input_selector(&self) -> Option<&dyn ActiveInputSelector> {
        Some(self)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/inspector.rs"]
mod tests;
