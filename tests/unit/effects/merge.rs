use super::*;
use crate::foundation::core::{FrameIndex, RectI, RenderScale, ViewIdx};
use crate::node::effect::RenderArgs;

#[test]
fn over_opacity_0_is_noop() {
    let dst = [10, 20, 30, 40];
    assert_eq!(over(dst, [255, 255, 255, 255], 0.0), dst);
}

#[test]
fn over_opaque_src_replaces_dst() {
    assert_eq!(over([0, 0, 0, 255], [255, 0, 0, 255], 1.0), [255, 0, 0, 255]);
}

#[test]
fn over_half_alpha_blends() {
    let out = over([0, 0, 255, 255], [128, 0, 0, 128], 1.0);
    assert_eq!(out, [128, 0, 127, 255]);
}

#[test]
fn only_b_is_required_and_mask_is_excluded_from_rod() {
    let m = MergeOver::default();
    assert!(!m.is_input_optional(INPUT_B));
    assert!(m.is_input_optional(INPUT_A));
    assert!(m.is_input_mask(INPUT_MASK));
    let args = RenderArgs {
        time: FrameIndex(0),
        scale: RenderScale::FULL,
        view: ViewIdx(0),
    };
    let rod = m
        .region_of_definition(
            &args,
            &[
                Some(RectI::new(0, 0, 4, 4)),
                Some(RectI::new(2, 2, 6, 6)),
                Some(RectI::new(-50, -50, 50, 50)),
            ],
        )
        .unwrap();
    assert_eq!(rod, RectI::new(0, 0, 6, 6));
}
