use super::*;

#[test]
fn frame_range_contains_boundaries() {
    let r = FrameRange::new(FrameIndex(2), FrameIndex(5)).unwrap();
    assert!(!r.contains(FrameIndex(1)));
    assert!(r.contains(FrameIndex(2)));
    assert!(r.contains(FrameIndex(4)));
    assert!(!r.contains(FrameIndex(5)));
    assert_eq!(r.last(), FrameIndex(4));
    assert_eq!(r.len_frames(), 3);
    assert!(FrameRange::new(FrameIndex(3), FrameIndex(1)).is_err());
}

#[test]
fn unbounded_sentinels_fall_back_per_side() {
    let timeline = FrameRange::inclusive(1, 100).unwrap();
    assert_eq!(FrameRange::UNBOUNDED.bounded_by(timeline), timeline);

    let half = FrameRange {
        start: FrameIndex(10),
        end: FrameIndex(i64::MAX),
    };
    let r = half.bounded_by(timeline);
    assert_eq!(r.start, FrameIndex(10));
    assert_eq!(r.end, FrameIndex(101));
}

#[test]
fn rect_intersect_and_union() {
    let a = RectI::new(0, 0, 10, 10);
    let b = RectI::new(5, 5, 20, 20);
    assert_eq!(a.intersect(b), Some(RectI::new(5, 5, 10, 10)));
    assert_eq!(a.union(b), RectI::new(0, 0, 20, 20));
    assert_eq!(a.intersect(RectI::new(10, 0, 12, 10)), None);
    assert_eq!(RectI::default().union(b), b);
    assert!(a.contains(RectI::new(2, 2, 3, 3)));
    assert!(!a.contains(b));
}

#[test]
fn split_rows_covers_rect_exactly() {
    let r = RectI::new(3, 0, 13, 10);
    let bands = r.split_rows(3);
    assert_eq!(bands.len(), 3);
    assert_eq!(bands[0], RectI::new(3, 0, 13, 4));
    assert_eq!(bands[1], RectI::new(3, 4, 13, 7));
    assert_eq!(bands[2], RectI::new(3, 7, 13, 10));
    let total: usize = bands.iter().map(|b| b.area()).sum();
    assert_eq!(total, r.area());

    // Never more bands than rows.
    assert_eq!(RectI::new(0, 0, 4, 2).split_rows(16).len(), 2);
    assert!(RectI::default().split_rows(4).is_empty());
}

#[test]
fn premultiply_rounds() {
    let p = Rgba8Premul::from_straight_rgba(255, 128, 0, 128);
    assert_eq!(p.to_array(), [128, 64, 0, 128]);
}
