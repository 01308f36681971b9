use super::*;
use crate::cache::key::ImageKey;
use crate::foundation::core::{FrameIndex, RenderScale, ViewIdx};

fn image(rod: RectI) -> Image {
    let key = ImageKey::new(1, FrameIndex(0), ViewIdx(0), RenderScale::FULL);
    let entry = CacheEntry::detached(key, ImageParams { rod, cost: 0 }).unwrap();
    Image::from_entry(entry, false)
}

#[test]
fn params_size_matches_rod() {
    let p = ImageParams {
        rod: RectI::new(0, 0, 10, 3),
        cost: 0,
    };
    assert_eq!(p.byte_len(), 120);
}

#[test]
fn window_writes_only_its_pixels() {
    let img = image(RectI::new(-2, -2, 2, 2));
    {
        let mut guard = img.write().unwrap();
        let mut view = guard.window(RectI::new(0, -1, 2, 1)).unwrap();
        view.fill([10, 20, 30, 40]);
    }
    assert_eq!(img.pixel(0, -1).unwrap(), [10, 20, 30, 40]);
    assert_eq!(img.pixel(1, 0).unwrap(), [10, 20, 30, 40]);
    assert_eq!(img.pixel(-1, 0).unwrap(), [0, 0, 0, 0]);
    assert_eq!(img.pixel(0, 1).unwrap(), [0, 0, 0, 0]);
    assert_eq!(img.pixel(5, 5).unwrap(), [0, 0, 0, 0]);
}

#[test]
fn window_outside_rod_is_rejected() {
    let img = image(RectI::new(0, 0, 4, 4));
    let mut guard = img.write().unwrap();
    assert!(guard.window(RectI::new(2, 2, 6, 6)).is_none());
    assert!(guard.window(RectI::new(1, 1, 1, 3)).is_none());
}

#[test]
fn split_rows_yields_disjoint_bands() {
    let img = image(RectI::new(0, 0, 3, 5));
    {
        let mut guard = img.write().unwrap();
        let view = guard.window(RectI::new(1, 0, 3, 5)).unwrap();
        let bands = view.split_rows(2);
        assert_eq!(bands.len(), 2);
        for (i, mut band) in bands.into_iter().enumerate() {
            let w = band.window();
            band.fill([i as u8 + 1, 0, 0, 255]);
            assert_eq!((w.x1, w.x2), (1, 3));
        }
    }
    assert_eq!(img.pixel(1, 0).unwrap(), [1, 0, 0, 255]);
    assert_eq!(img.pixel(2, 2).unwrap(), [1, 0, 0, 255]);
    assert_eq!(img.pixel(2, 3).unwrap(), [2, 0, 0, 255]);
    assert_eq!(img.pixel(0, 3).unwrap(), [0, 0, 0, 0]);
}

#[test]
fn set_pixel_addresses_offset_windows() {
    let img = image(RectI::new(-3, -1, 3, 3));
    {
        let mut guard = img.write().unwrap();
        let mut view = guard.window(RectI::new(-1, 0, 2, 2)).unwrap();
        view.set_pixel(-1, 0, [9, 8, 7, 6]);
        view.set_pixel(1, 1, [5, 4, 3, 2]);
        view.set_pixel(2, 1, [1, 1, 1, 1]);
    }
    assert_eq!(img.pixel(-1, 0).unwrap(), [9, 8, 7, 6]);
    assert_eq!(img.pixel(1, 1).unwrap(), [5, 4, 3, 2]);
    assert_eq!(img.pixel(0, 0).unwrap(), [0, 0, 0, 0]);
    assert_eq!(img.pixel(2, 1).unwrap(), [0, 0, 0, 0]);
}

#[test]
fn copy_region_pads_outside_rod() {
    let img = image(RectI::new(0, 0, 2, 2));
    {
        let mut guard = img.write().unwrap();
        guard
            .window(RectI::new(0, 0, 2, 2))
            .unwrap()
            .set_pixel(1, 1, [1, 2, 3, 4]);
    }
    let out = img.copy_region(RectI::new(1, 1, 3, 2)).unwrap();
    assert_eq!(out, vec![1, 2, 3, 4, 0, 0, 0, 0]);
}

#[test]
fn coverage_tracks_marked_regions() {
    let img = image(RectI::new(0, 0, 4, 4));
    assert!(!img.is_complete());
    img.mark_rendered(RectI::new(0, 0, 4, 2));
    assert_eq!(
        img.rects_to_render(RectI::new(0, 0, 4, 4)).as_slice(),
        &[RectI::new(0, 2, 4, 4)]
    );
    img.mark_rendered(RectI::new(0, 2, 4, 4));
    assert!(img.is_complete());
}

#[test]
fn restored_images_are_fully_rendered() {
    let key = ImageKey::new(1, FrameIndex(0), ViewIdx(0), RenderScale::FULL);
    let rod = RectI::new(0, 0, 2, 2);
    let entry = CacheEntry::detached(key, ImageParams { rod, cost: 0 }).unwrap();
    let img = Image::from_entry(entry, true);
    assert!(img.is_fully_rendered());
    assert!(img.rects_to_render(rod).is_empty());
}
