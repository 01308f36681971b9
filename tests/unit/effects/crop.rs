use super::*;
use crate::foundation::core::{FrameIndex, RenderScale, ViewIdx};

fn args() -> RenderArgs {
    RenderArgs {
        time: FrameIndex(0),
        scale: RenderScale::FULL,
        view: ViewIdx(0),
    }
}

#[test]
fn rod_is_input_clipped_to_rect() {
    let crop = Crop::new(RectI::new(5, 5, 20, 20));
    let rod = crop
        .region_of_definition(&args(), &[Some(RectI::new(0, 0, 10, 10))])
        .unwrap();
    assert_eq!(rod, RectI::new(5, 5, 10, 10));
    assert!(
        crop.region_of_definition(&args(), &[None])
            .unwrap()
            .is_empty()
    );
}

#[test]
fn roi_never_leaves_rect() {
    let crop = Crop::new(RectI::new(5, 5, 20, 20));
    let rois = crop.regions_of_interest(&args(), RectI::new(0, 0, 8, 8));
    assert_eq!(rois.as_slice(), &[Some(RectI::new(5, 5, 8, 8))]);
    let rois = crop.regions_of_interest(&args(), RectI::new(0, 0, 2, 2));
    assert_eq!(rois.as_slice(), &[None]);
}
