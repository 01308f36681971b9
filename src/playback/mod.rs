//! Playback: the scheduler thread driving a graph's output through time.

pub mod events;
pub mod scheduler;
/// Frame ranges, loop modes and frame stepping.
pub mod timeline;
pub mod timer;

pub use events::PlaybackEvent;
pub use scheduler::{PlaybackRequest, PlaybackScheduler, SchedulerState};
pub use timeline::{Direction, LoopMode, Timeline};
pub use timer::{FrameTimer, MIN_FPS};
