use super::*;

#[test]
fn fresh_bitmap_needs_whole_roi() {
    let bm = Bitmap::new(RectI::new(0, 0, 10, 10));
    let rects = bm.rects_to_render(RectI::new(2, 3, 6, 8));
    assert_eq!(rects.as_slice(), &[RectI::new(2, 3, 6, 8)]);
}

#[test]
fn roi_is_clipped_to_rod() {
    let bm = Bitmap::new(RectI::new(0, 0, 10, 10));
    let rects = bm.rects_to_render(RectI::new(-5, -5, 4, 4));
    assert_eq!(rects.as_slice(), &[RectI::new(0, 0, 4, 4)]);
    assert!(bm.rects_to_render(RectI::new(20, 20, 30, 30)).is_empty());
}

#[test]
fn rendered_band_splits_remaining_work() {
    let mut bm = Bitmap::new(RectI::new(0, 0, 10, 10));
    bm.mark(RectI::new(0, 4, 10, 6));
    let rects = bm.rects_to_render(RectI::new(0, 0, 10, 10));
    assert_eq!(
        rects.as_slice(),
        &[RectI::new(0, 0, 10, 4), RectI::new(0, 6, 10, 10)]
    );
}

#[test]
fn partially_rendered_rows_shrink_horizontally() {
    let mut bm = Bitmap::new(RectI::new(0, 0, 8, 4));
    bm.mark(RectI::new(0, 0, 5, 4));
    let rects = bm.rects_to_render(RectI::new(0, 0, 8, 4));
    assert_eq!(rects.as_slice(), &[RectI::new(5, 0, 8, 4)]);
}

#[test]
fn progressive_fill_reaches_full_coverage() {
    let mut bm = Bitmap::new(RectI::new(0, 0, 4, 4));
    bm.mark(RectI::new(0, 0, 4, 2));
    assert!(!bm.is_fully_rendered());
    assert_eq!(bm.rendered_pixels(), 8);
    bm.mark(RectI::new(0, 1, 4, 4));
    assert!(bm.is_fully_rendered());
    assert_eq!(bm.rendered_pixels(), 16);
    assert!(bm.rects_to_render(RectI::new(0, 0, 4, 4)).is_empty());
}

#[test]
fn negative_origin_rod_indexes_correctly() {
    let mut bm = Bitmap::new(RectI::new(-4, -4, 4, 4));
    bm.mark(RectI::new(-4, -4, 0, 0));
    assert!(bm.is_rendered(-4, -4));
    assert!(bm.is_rendered(-1, -1));
    assert!(!bm.is_rendered(0, 0));
    assert!(!bm.is_rendered(10, 10));
}
