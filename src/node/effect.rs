use smallvec::SmallVec;

use crate::foundation::core::{FrameIndex, FrameRange, RectI, RenderScale, ViewIdx};
use crate::foundation::error::StrataResult;
use crate::foundation::hash::StableHasher;
use crate::image::image::{ImageView, ImageViewMut};
use crate::node::abort::AbortToken;

/// How much concurrency an effect's compute step tolerates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ThreadSafety {
    /// One compute at a time across every instance of the effect type.
    Unsafe,
    /// Instances run concurrently; one compute at a time per instance.
    InstanceSafe,
    /// Windows are split into row bands computed in parallel.
    FullySafe,
}

/// Where in time and space a query is made.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderArgs {
    pub time: FrameIndex,
    pub scale: RenderScale,
    pub view: ViewIdx,
}

/// Arguments handed to [`Effect::compute`].
pub struct ComputeArgs<'a> {
    pub time: FrameIndex,
    pub scale: RenderScale,
    pub view: ViewIdx,
    /// Name of the node being computed, for error messages.
    pub node: &'a str,
    /// The node's abort token. Long computations should poll it and return
    /// [`ComputeStatus::Aborted`].
    pub abort: &'a AbortToken,
}

impl ComputeArgs<'_> {
    pub fn render_args(&self) -> RenderArgs {
        RenderArgs {
            time: self.time,
            scale: self.scale,
            view: self.view,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComputeStatus {
    Done,
    Aborted,
}

/// Capability of nodes that route exactly one of their inputs downstream (viewers,
/// inspectors, switches). Graph traversal follows only the active input of such nodes.
pub trait ActiveInputSelector: Send + Sync {
    fn active_input(&self) -> Option<usize>;
}

/// Per-input regions requested by [`Effect::regions_of_interest`]. `None` means the input is
/// not needed.
pub type InputRegions = SmallVec<[Option<RectI>; 4]>;

/// The image operation wrapped by a render node.
pub trait Effect: Send + Sync + 'static {
    /// Stable identifier of the effect type. Part of the node hash and the key of the
    /// type-wide lock used by [`ThreadSafety::Unsafe`] effects.
    fn type_id(&self) -> &'static str;

    fn max_inputs(&self) -> usize {
        0
    }

    fn is_input_optional(&self, _input: usize) -> bool {
        false
    }

    fn is_input_mask(&self, _input: usize) -> bool {
        false
    }

    fn thread_safety(&self) -> ThreadSafety {
        ThreadSafety::FullySafe
    }

    /// Whether the effect can compute an arbitrary window. When `false`, every input is
    /// rendered over its whole RoD.
    fn supports_tiles(&self) -> bool {
        true
    }

    /// Feed every parameter that influences the output, in a fixed order.
    fn hash_params(&self, hasher: &mut StableHasher);

    /// Region over which the output is defined. `input_rods` has one slot per input, `None`
    /// for disconnected ones. Defaults to the union of the non-mask inputs.
    fn region_of_definition(
        &self,
        _args: &RenderArgs,
        input_rods: &[Option<RectI>],
    ) -> StrataResult<RectI> {
        Ok(input_rods
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.is_input_mask(*i))
            .filter_map(|(_, rod)| *rod)
            .fold(RectI::default(), RectI::union))
    }

    /// Region of each input needed to produce `window`. Defaults to `window` itself.
    fn regions_of_interest(&self, _args: &RenderArgs, window: RectI) -> InputRegions {
        (0..self.max_inputs()).map(|_| Some(window)).collect()
    }

    /// Fill `out.window()`.
    ///
    /// `inputs` holds one view per input slot (`None` when disconnected or not requested).
    /// Called concurrently on disjoint windows for [`ThreadSafety::FullySafe`] effects.
    fn compute(
        &self,
        args: &ComputeArgs<'_>,
        inputs: &[Option<ImageView<'_>>],
        out: &mut ImageViewMut<'_>,
    ) -> StrataResult<ComputeStatus>;

    /// Frames over which the effect produces output. Defaults to the union of the connected
    /// inputs' ranges, or unbounded for generators.
    fn frame_range(&self, input_ranges: &[Option<FrameRange>]) -> FrameRange {
        input_ranges
            .iter()
            .flatten()
            .copied()
            .reduce(FrameRange::union)
            .unwrap_or(FrameRange::UNBOUNDED)
    }

    fn active_input_selector(&self) -> Option<&dyn ActiveInputSelector> {
        None
    }

    /// Called once before a playback sequence renders its first frame.
    fn begin_sequence(&self, _range: FrameRange) {}

    /// Called once after a playback sequence stops.
    fn end_sequence(&self) {}
}
