use crate::foundation::core::{FrameIndex, FrameRange};
use crate::foundation::error::StrataResult;

/// What happens when playback reaches an end of its range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopMode {
    /// Jump back to the other end.
    #[default]
    Loop,
    /// Reverse direction.
    Bounce,
    /// Stop.
    Once,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

/// Project time bounds and the current frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timeline {
    bounds: FrameRange,
    current: FrameIndex,
}

impl Timeline {
    /// Timeline over `first..=last`, positioned on `first`.
    pub fn new(first: i64, last: i64) -> StrataResult<Self> {
        let bounds = FrameRange::inclusive(first, last)?;
        Ok(Self {
            bounds,
            current: bounds.start,
        })
    }

    pub fn bounds(&self) -> FrameRange {
        self.bounds
    }

    pub fn current(&self) -> FrameIndex {
        self.current
    }

    /// Move to `frame`, clamped to the bounds.
    pub fn seek(&mut self, frame: FrameIndex) {
        self.current = self.bounds.clamp(frame);
    }
}

/// Frame following `frame` in `range` when playing in `direction`.
///
/// Returns the frame and the direction to continue in (bouncing flips it), or `None` when a
/// [`LoopMode::Once`] sequence has run off its end.
pub fn next_in_sequence(
    mode: LoopMode,
    direction: Direction,
    frame: FrameIndex,
    range: FrameRange,
) -> Option<(FrameIndex, Direction)> {
    let first = range.start.0;
    let last = range.last().0;
    if first == last {
        return Some((FrameIndex(first), direction));
    }
    let step = |f: i64, d: Direction| match d {
        Direction::Forward => f + 1,
        Direction::Backward => f - 1,
    };

    let next = if frame.0 <= first {
        match (mode, direction) {
            (LoopMode::Loop, Direction::Forward) | (LoopMode::Once, Direction::Forward) => {
                (first + 1, direction)
            }
            (LoopMode::Loop, Direction::Backward) => (last, direction),
            (LoopMode::Bounce, Direction::Forward) => (frame.0.max(first) + 1, direction),
            (LoopMode::Bounce, Direction::Backward) => (first + 1, Direction::Forward),
            (LoopMode::Once, Direction::Backward) => return None,
        }
    } else if frame.0 >= last {
        match (mode, direction) {
            (LoopMode::Loop, Direction::Forward) => (first, direction),
            (LoopMode::Loop, Direction::Backward) | (LoopMode::Once, Direction::Backward) => {
                (last - 1, direction)
            }
            (LoopMode::Bounce, Direction::Forward) => (last - 1, Direction::Backward),
            (LoopMode::Bounce, Direction::Backward) => (frame.0.min(last) - 1, direction),
            (LoopMode::Once, Direction::Forward) => return None,
        }
    } else {
        (step(frame.0, direction), direction)
    };
    Some((FrameIndex(next.0), next.1))
}

/// `frame` if it lies in `range`, else the end playback in `direction` should start from.
pub fn nearest_in_sequence(direction: Direction, frame: FrameIndex, range: FrameRange) -> FrameIndex {
    if range.contains(frame) {
        return frame;
    }
    let before = frame.0 < range.start.0;
    match (before, direction) {
        (true, Direction::Forward) | (false, Direction::Backward) => range.start,
        (true, Direction::Backward) | (false, Direction::Forward) => range.last(),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/timeline.rs"]
mod tests;
