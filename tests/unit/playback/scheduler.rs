use super::*;
use crate::effects::{Brightness, ConstantColor, Inspector};
use crate::engine::Engine;
use crate::foundation::config::{CacheOpts, EngineOpts};
use crate::foundation::core::{RectI, Rgba8Premul};

fn setup(first: i64, last: i64) -> (PlaybackScheduler, mpsc::Receiver<PlaybackEvent>) {
    let engine = Engine::new(EngineOpts {
        node_cache: CacheOpts::memory_only(8 << 20),
        frame_cache: CacheOpts::memory_only(8 << 20),
        tile_threads: Some(2),
        threaded_playback: false,
        desired_fps: 1000.0,
        timeline_first: first,
        timeline_last: last,
        ..EngineOpts::default()
    })
    .unwrap();
    let c = engine.create_node(
        "constant",
        ConstantColor::new(
            Rgba8Premul::from_straight_rgba(0, 200, 0, 255),
            RectI::new(0, 0, 8, 8),
        ),
    );
    let b = engine.create_node("brightness", Brightness::new(0.5));
    let v = engine.create_node("viewer", Inspector::new(1));
    b.connect_input(0, &c).unwrap();
    v.connect_input(0, &b).unwrap();
    let graph = Arc::new(RenderGraph::new(engine, v));
    PlaybackScheduler::new(graph).unwrap()
}

fn rendered_frames(events: &[PlaybackEvent]) -> Vec<(i64, bool)> {
    events
        .iter()
        .filter_map(|e| match e {
            PlaybackEvent::FrameRendered {
                time, from_cache, ..
            } => Some((time.0, *from_cache)),
            _ => None,
        })
        .collect()
}

#[test]
fn current_frame_renders_without_start_stop_events() {
    let (s, rx) = setup(1, 10);
    s.start(PlaybackRequest::current_frame()).unwrap();
    let events: Vec<_> = rx.try_iter().collect();
    assert_eq!(events.len(), 1);
    let PlaybackEvent::FrameRendered { time, frames, .. } = &events[0] else {
        panic!("unexpected {events:?}");
    };
    assert_eq!(*time, FrameIndex(1));
    assert_eq!(frames.len(), 1);
    let px = frames[0].to_rgba8().unwrap();
    assert_eq!(&px[..4], &[0, 100, 0, 255]);
    assert_eq!(s.state(), SchedulerState::Idle);
    assert!(!s.is_working());
}

#[test]
fn sequence_plays_requested_frames_in_order() {
    let (s, rx) = setup(1, 10);
    s.start(PlaybackRequest::frames(3, Direction::Forward)).unwrap();
    let events: Vec<_> = rx.try_iter().collect();
    assert!(matches!(events.first(), Some(PlaybackEvent::EngineStarted { .. })));
    assert!(matches!(events.last(), Some(PlaybackEvent::EngineStopped)));
    assert_eq!(
        rendered_frames(&events),
        vec![(1, false), (2, false), (3, false)]
    );
    assert_eq!(s.current_frame(), FrameIndex(3));
}

#[test]
fn second_pass_replays_from_frame_cache() {
    let (s, rx) = setup(1, 10);
    s.start(PlaybackRequest::frames(2, Direction::Forward)).unwrap();
    s.seek(FrameIndex(1));
    s.start(PlaybackRequest::frames(2, Direction::Forward)).unwrap();
    let events: Vec<_> = rx.try_iter().collect();
    assert_eq!(
        rendered_frames(&events),
        vec![(1, false), (2, false), (1, true), (2, true)]
    );
}

#[test]
fn loop_mode_wraps_to_first_frame() {
    let (s, rx) = setup(1, 3);
    s.seek(FrameIndex(3));
    s.start(PlaybackRequest::frames(3, Direction::Forward)).unwrap();
    let frames: Vec<i64> = rendered_frames(&rx.try_iter().collect::<Vec<_>>())
        .into_iter()
        .map(|(t, _)| t)
        .collect();
    assert_eq!(frames, vec![3, 1, 2]);
}

#[test]
fn once_mode_stops_at_range_end() {
    let (s, rx) = setup(1, 3);
    s.set_loop_mode(LoopMode::Once);
    assert_eq!(s.loop_mode(), LoopMode::Once);
    s.seek(FrameIndex(2));
    s.start(PlaybackRequest::play(Direction::Forward)).unwrap();
    let frames: Vec<i64> = rendered_frames(&rx.try_iter().collect::<Vec<_>>())
        .into_iter()
        .map(|(t, _)| t)
        .collect();
    assert_eq!(frames, vec![2, 3]);
}

#[test]
fn bounce_mode_reverses_at_the_end() {
    let (s, rx) = setup(1, 3);
    s.set_loop_mode(LoopMode::Bounce);
    s.seek(FrameIndex(2));
    s.start(PlaybackRequest::frames(4, Direction::Forward)).unwrap();
    let frames: Vec<i64> = rendered_frames(&rx.try_iter().collect::<Vec<_>>())
        .into_iter()
        .map(|(t, _)| t)
        .collect();
    assert_eq!(frames, vec![2, 3, 2, 1]);
}

#[test]
fn invalid_graph_reports_render_failure() {
    let (s, rx) = setup(1, 10);
    let output = Arc::clone(s.graph().output());
    let b = output.input(0).unwrap();
    b.disconnect_input(0);
    s.start(PlaybackRequest::frames(5, Direction::Forward)).unwrap();
    let events: Vec<_> = rx.try_iter().collect();
    assert!(rendered_frames(&events).is_empty());
    assert!(
        events
            .iter()
            .any(|e| matches!(e, PlaybackEvent::RenderFailed { time, .. } if *time == FrameIndex(1)))
    );
    assert!(matches!(events.last(), Some(PlaybackEvent::EngineStopped)));
}

#[test]
fn preview_nodes_are_announced_per_frame() {
    let (s, rx) = setup(1, 10);
    let output = Arc::clone(s.graph().output());
    output.set_preview_enabled(true);
    s.start(PlaybackRequest::current_frame()).unwrap();
    let events: Vec<_> = rx.try_iter().collect();
    assert!(events.iter().any(|e| matches!(
        e,
        PlaybackEvent::PreviewRequested { node, .. } if *node == output.id()
    )));
}

#[test]
fn fps_is_reported_every_ten_frames() {
    let (s, rx) = setup(1, 100);
    s.start(PlaybackRequest::frames(20, Direction::Forward)).unwrap();
    let fps_events = rx
        .try_iter()
        .filter(|e| matches!(e, PlaybackEvent::FpsChanged { .. }))
        .count();
    assert_eq!(fps_events, 2);
}

#[test]
fn rejects_bad_requests_and_settings() {
    let (s, _rx) = setup(1, 10);
    assert!(s.start(PlaybackRequest::frames(0, Direction::Forward)).is_err());
    assert!(s.set_desired_fps(0.0).is_err());
    assert!(s.set_desired_fps(f64::NAN).is_err());
    assert!(s.set_desired_fps(1e-20).is_err());
    s.set_desired_fps(30.0).unwrap();
    assert_eq!(s.desired_fps(), 30.0);
    s.quit();
    assert!(matches!(
        s.start(PlaybackRequest::current_frame()),
        Err(StrataError::Playback(_))
    ));
}

#[test]
fn abort_when_idle_returns_immediately() {
    let (s, _rx) = setup(1, 10);
    s.abort_rendering();
    assert!(!s.graph().output().is_aborted());
}

#[test]
fn refresh_and_continue_rerenders_current_frame_when_idle() {
    let (s, rx) = setup(1, 10);
    s.seek(FrameIndex(4));
    s.refresh_and_continue().unwrap();
    s.update_graph_and_continue().unwrap();
    let frames: Vec<i64> = rendered_frames(&rx.try_iter().collect::<Vec<_>>())
        .into_iter()
        .map(|(t, _)| t)
        .collect();
    assert_eq!(frames, vec![4, 4]);
}
