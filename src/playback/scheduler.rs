use std::sync::mpsc;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};

use crate::cache::entry::EntryParams;
use crate::cache::key::FrameKey;
use crate::foundation::core::{FrameIndex, FrameRange, RenderScale, ViewIdx};
use crate::foundation::error::{StrataError, StrataResult};
use crate::foundation::sync;
use crate::graph::render_graph::RenderGraph;
use crate::image::frame::{Frame, FrameParams};
use crate::node::effect::RenderArgs;
use crate::node::render_node::RenderRequest;
use crate::playback::events::PlaybackEvent;
use crate::playback::timeline::{
    Direction, LoopMode, Timeline, nearest_in_sequence, next_in_sequence,
};
use crate::playback::timer::{FrameTimer, MIN_FPS};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Starting,
    Running,
    Stopping,
}

/// Arguments of [`PlaybackScheduler::start`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaybackRequest {
    /// Frames to render. `None` plays until aborted or until a [`LoopMode::Once`] sequence
    /// reaches its end.
    pub frame_count: Option<u64>,
    pub direction: Direction,
    /// Re-render the current frame: no start/stop notifications and no pacing.
    pub same_frame: bool,
    /// Rebuild the graph's node list before the first frame.
    pub refresh_graph: bool,
}

impl PlaybackRequest {
    pub fn current_frame() -> Self {
        Self {
            frame_count: Some(1),
            direction: Direction::Forward,
            same_frame: true,
            refresh_graph: false,
        }
    }

    pub fn play(direction: Direction) -> Self {
        Self {
            frame_count: None,
            direction,
            same_frame: false,
            refresh_graph: false,
        }
    }

    pub fn frames(count: u64, direction: Direction) -> Self {
        Self {
            frame_count: Some(count),
            ..Self::play(direction)
        }
    }
}

struct Control {
    state: SchedulerState,
    pending: Option<PlaybackRequest>,
    quit: bool,
    thread_exited: bool,
    abort_requested: bool,
    /// Completed sequences; abort waiters watch it move.
    stops: u64,
    runner: Option<ThreadId>,
    same_frame: bool,
    remaining: Option<u64>,
    direction: Direction,
    loop_mode: LoopMode,
    desired_fps: f64,
    timeline: Timeline,
}

impl Control {
    fn is_working(&self) -> bool {
        self.state != SchedulerState::Idle || self.pending.is_some()
    }
}

struct Shared {
    graph: Arc<RenderGraph>,
    control: Mutex<Control>,
    start_cv: Condvar,
    ack_cv: Condvar,
    events: mpsc::Sender<PlaybackEvent>,
}

impl Shared {
    fn control(&self) -> MutexGuard<'_, Control> {
        sync::lock(&self.control)
    }

    fn emit(&self, event: PlaybackEvent) {
        let _ = self.events.send(event);
    }
}

/// Drives rendering of a graph's output: one frame, or continuous playback over the output's
/// frame range.
///
/// Sequences run on a dedicated scheduler thread, or on the caller of [`start`] when
/// threaded playback is disabled (or no thread could be spawned). Progress is reported as
/// [`PlaybackEvent`]s on the channel returned by [`PlaybackScheduler::new`].
///
/// [`start`]: PlaybackScheduler::start
pub struct PlaybackScheduler {
    shared: Arc<Shared>,
    thread: Mutex<Option<JoinHandle<()>>>,
    threaded: bool,
}

impl PlaybackScheduler {
    pub fn new(graph: Arc<RenderGraph>) -> StrataResult<(Self, mpsc::Receiver<PlaybackEvent>)> {
        let opts = graph.engine().opts().clone();
        let timeline = Timeline::new(opts.timeline_first, opts.timeline_last)?;
        let (tx, rx) = mpsc::channel();
        let shared = Arc::new(Shared {
            graph,
            control: Mutex::new(Control {
                state: SchedulerState::Idle,
                pending: None,
                quit: false,
                thread_exited: false,
                abort_requested: false,
                stops: 0,
                runner: None,
                same_frame: false,
                remaining: None,
                direction: Direction::Forward,
                loop_mode: LoopMode::default(),
                desired_fps: opts.desired_fps,
                timeline,
            }),
            start_cv: Condvar::new(),
            ack_cv: Condvar::new(),
            events: tx,
        });
        Ok((
            Self {
                shared,
                thread: Mutex::new(None),
                threaded: opts.threaded_playback,
            },
            rx,
        ))
    }

    pub fn graph(&self) -> &Arc<RenderGraph> {
        &self.shared.graph
    }

    /// Queue `req`. A running sequence stops at the next frame boundary and the new one
    /// starts. In synchronous mode the whole sequence runs before this returns.
    #[tracing::instrument(skip(self))]
    pub fn start(&self, req: PlaybackRequest) -> StrataResult<()> {
        if req.frame_count == Some(0) {
            return Err(StrataError::validation(
                "playback 'frame_count' must be >= 1 when set",
            ));
        }
        {
            let mut c = self.shared.control();
            if c.quit {
                return Err(StrataError::playback("scheduler has quit"));
            }
            c.pending = Some(req);
            c.abort_requested = false;
        }

        if !self.threaded {
            return self.run_synchronously();
        }

        let mut slot = sync::lock(&self.thread);
        if slot.is_none() {
            let shared = Arc::clone(&self.shared);
            match thread::Builder::new()
                .name("strata-scheduler".to_owned())
                .spawn(move || scheduler_main(&shared))
            {
                Ok(handle) => *slot = Some(handle),
                Err(e) => {
                    drop(slot);
                    tracing::warn!(error = %e, "no scheduler thread, rendering synchronously");
                    return self.run_synchronously();
                }
            }
        }
        drop(slot);
        self.shared.start_cv.notify_all();
        Ok(())
    }

    fn run_synchronously(&self) -> StrataResult<()> {
        loop {
            let req = {
                let mut c = self.shared.control();
                if c.state != SchedulerState::Idle {
                    // The active runner picks the request up at its next frame boundary.
                    return Ok(());
                }
                let Some(req) = c.pending.take() else {
                    return Ok(());
                };
                c.state = SchedulerState::Starting;
                c.runner = Some(thread::current().id());
                req
            };
            run_sequence(&self.shared, req);
        }
    }

    /// Raise every node's abort token (output first) and wait until the running sequence has
    /// stopped. Returns at once when idle or when called from the thread running the sequence.
    #[tracing::instrument(skip(self))]
    pub fn abort_rendering(&self) {
        let mut c = self.shared.control();
        if !c.is_working() {
            return;
        }
        c.abort_requested = true;
        self.shared.graph.request_abort();
        if c.runner == Some(thread::current().id()) {
            return;
        }
        let seen = c.stops;
        while c.stops == seen && c.is_working() && !c.thread_exited {
            c = self
                .shared
                .ack_cv
                .wait(c)
                .unwrap_or_else(PoisonError::into_inner);
        }
        tracing::debug!("abort acknowledged");
    }

    /// Abort, stop the scheduler thread and join it. Later `start` calls fail.
    pub fn quit(&self) {
        {
            let mut c = self.shared.control();
            if !c.quit {
                c.quit = true;
                c.pending = None;
                if c.is_working() {
                    c.abort_requested = true;
                    self.shared.graph.request_abort();
                }
            }
        }
        self.shared.start_cv.notify_all();
        self.shared.ack_cv.notify_all();

        let handle = sync::lock(&self.thread).take();
        if let Some(handle) = handle
            && handle.thread().id() != thread::current().id()
            && handle.join().is_err()
        {
            tracing::warn!("scheduler thread panicked");
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.shared.control().state
    }

    pub fn is_working(&self) -> bool {
        self.shared.control().is_working()
    }

    pub fn loop_mode(&self) -> LoopMode {
        self.shared.control().loop_mode
    }

    pub fn set_loop_mode(&self, mode: LoopMode) {
        self.shared.control().loop_mode = mode;
    }

    pub fn desired_fps(&self) -> f64 {
        self.shared.control().desired_fps
    }

    /// Takes effect from the next frame of a running sequence.
    pub fn set_desired_fps(&self, fps: f64) -> StrataResult<()> {
        if !fps.is_finite() || fps < MIN_FPS {
            return Err(StrataError::validation(format!(
                "playback fps must be finite and >= {MIN_FPS}"
            )));
        }
        self.shared.control().desired_fps = fps;
        Ok(())
    }

    pub fn timeline(&self) -> Timeline {
        self.shared.control().timeline
    }

    pub fn current_frame(&self) -> FrameIndex {
        self.shared.control().timeline.current()
    }

    /// Move the timeline cursor. The next sequence starts there.
    pub fn seek(&self, frame: FrameIndex) {
        self.shared.control().timeline.seek(frame);
    }

    /// Re-render the current frame after an edit, unless playback is running and will show
    /// the change on its own.
    pub fn refresh_and_continue(&self) -> StrataResult<()> {
        {
            let c = self.shared.control();
            if c.is_working() && !c.same_frame {
                return Ok(());
            }
        }
        self.start(PlaybackRequest::current_frame())
    }

    /// Restart after a topology change: abort, refresh the graph and resume with the frames
    /// left in the interrupted sequence (or re-render the current frame when idle).
    pub fn update_graph_and_continue(&self) -> StrataResult<()> {
        let resume = {
            let c = self.shared.control();
            (c.is_working() && !c.same_frame && c.remaining != Some(0))
                .then_some((c.remaining, c.direction))
        };
        self.abort_rendering();
        let req = match resume {
            Some((frame_count, direction)) => PlaybackRequest {
                frame_count,
                direction,
                same_frame: false,
                refresh_graph: true,
            },
            None => PlaybackRequest {
                refresh_graph: true,
                ..PlaybackRequest::current_frame()
            },
        };
        self.start(req)
    }
}

impl Drop for PlaybackScheduler {
    fn drop(&mut self) {
        self.quit();
    }
}

impl std::fmt::Debug for PlaybackScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackScheduler")
            .field("state", &self.state())
            .field("threaded", &self.threaded)
            .finish()
    }
}

fn scheduler_main(shared: &Shared) {
    loop {
        let req = {
            let mut c = shared.control();
            loop {
                if c.quit {
                    c.thread_exited = true;
                    shared.ack_cv.notify_all();
                    return;
                }
                if let Some(req) = c.pending.take() {
                    c.state = SchedulerState::Starting;
                    c.runner = Some(thread::current().id());
                    break req;
                }
                c = shared
                    .start_cv
                    .wait(c)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        };
        run_sequence(shared, req);
    }
}

/// Run one sequence to completion on the current thread.
fn run_sequence(shared: &Shared, req: PlaybackRequest) {
    let graph = &shared.graph;
    if req.refresh_graph {
        graph.refresh();
    }
    let output_range = graph.frame_range();

    let (range, start, fps) = {
        let mut c = shared.control();
        let range = output_range.bounded_by(c.timeline.bounds());
        c.same_frame = req.same_frame;
        c.direction = req.direction;
        c.remaining = req.frame_count;
        if !c.abort_requested {
            graph.clear_abort();
        }
        (range, c.timeline.current(), c.desired_fps)
    };

    tracing::info!(
        output = %graph.output().name(),
        first = range.start.0,
        end = range.end.0,
        direction = ?req.direction,
        frames = ?req.frame_count,
        "playback started"
    );
    if range.is_empty() {
        tracing::warn!("output frame range is empty");
    } else {
        graph.begin_sequence(range);
        if !req.same_frame {
            shared.emit(PlaybackEvent::EngineStarted {
                direction: req.direction,
                frame_count: req.frame_count,
            });
        }
        shared.control().state = SchedulerState::Running;
        play(shared, req, range, start, fps);
        shared.control().state = SchedulerState::Stopping;
        graph.end_sequence();
        if !req.same_frame {
            shared.emit(PlaybackEvent::EngineStopped);
        }
    }

    let mut c = shared.control();
    graph.clear_abort();
    c.abort_requested = false;
    c.state = SchedulerState::Idle;
    c.runner = None;
    c.stops += 1;
    drop(c);
    shared.ack_cv.notify_all();
    tracing::info!("playback stopped");
}

fn play(
    shared: &Shared,
    req: PlaybackRequest,
    range: FrameRange,
    start: FrameIndex,
    fps: f64,
) {
    let graph = &shared.graph;
    let mut frame = nearest_in_sequence(req.direction, start, range);
    let mut direction = req.direction;
    let mut timer = FrameTimer::new(fps);

    loop {
        {
            let mut c = shared.control();
            if c.quit || c.abort_requested || c.pending.is_some() || c.remaining == Some(0) {
                return;
            }
            c.timeline.seek(frame);
            timer.set_desired_fps(c.desired_fps);
        }

        let outcome = render_frame(graph, frame);
        let aborted = {
            let c = shared.control();
            c.abort_requested || c.quit
        };
        let stop = match outcome {
            Ok(Some((frames, from_cache))) if !aborted => {
                tracing::debug!(frame = frame.0, from_cache, "frame rendered");
                shared.emit(PlaybackEvent::FrameRendered {
                    time: frame,
                    frames,
                    from_cache,
                });
                false
            }
            Ok(_) => {
                tracing::debug!(frame = frame.0, "frame aborted");
                true
            }
            Err(e) => {
                tracing::warn!(frame = frame.0, error = %e, "frame render failed");
                shared.emit(PlaybackEvent::RenderFailed {
                    time: frame,
                    message: e.to_string(),
                });
                true
            }
        };

        if !req.same_frame
            && !stop
            && let Some(actual) = timer.wait_until_next_frame_is_due()
        {
            shared.emit(PlaybackEvent::FpsChanged {
                actual,
                desired: timer.desired_fps(),
            });
        }
        for node in graph.nodes() {
            if node.preview_enabled() {
                shared.emit(PlaybackEvent::PreviewRequested {
                    node: node.id(),
                    time: frame,
                });
            }
        }
        graph.clear_abort();
        if stop {
            return;
        }

        let loop_mode = {
            let mut c = shared.control();
            c.remaining = c.remaining.map(|n| n.saturating_sub(1));
            c.loop_mode
        };
        match next_in_sequence(loop_mode, direction, frame, range) {
            Some((next, dir)) => {
                frame = next;
                direction = dir;
            }
            None => return,
        }
    }
}

/// Produce one frame per view: replayed from the frame cache when possible, rendered through
/// the graph otherwise. `Ok(None)` when aborted.
fn render_frame(
    graph: &RenderGraph,
    time: FrameIndex,
) -> StrataResult<Option<(Vec<Arc<Frame>>, bool)>> {
    graph.refresh_hashes();
    graph.validate()?;
    let engine = graph.engine();
    let output = graph.output();
    let output_hash = output.hash();

    let mut frames = Vec::new();
    let mut from_cache = true;
    for v in 0..engine.opts().views {
        let view = ViewIdx(v);
        let key = FrameKey::new(output_hash, time, view);
        if let Some(frame) = engine.frame_cache().get(&key)
            && frame.is_filled()
        {
            frames.push(frame);
            continue;
        }
        from_cache = false;

        let args = RenderArgs {
            time,
            scale: RenderScale::FULL,
            view,
        };
        let rod = output.region_of_definition(&args)?;
        if rod.is_empty() {
            continue;
        }
        let Some(image) = output.render_region(engine, RenderRequest::new(time, view, rod))?
        else {
            return Ok(None);
        };
        let params = FrameParams { rect: rod, cost: 1 };
        let Some(handle) = engine.frame_cache().new_entry(key, params) else {
            return Err(StrataError::allocation(format!(
                "no storage for frame {} ({} bytes)",
                time.0,
                params.byte_len()
            )));
        };
        handle.fill_from(&image)?;
        frames.push(handle.seal());
    }
    Ok(Some((frames, from_cache)))
}

#[cfg(test)]
#[path = "../../tests/unit/playback/scheduler.rs"]
mod tests;
