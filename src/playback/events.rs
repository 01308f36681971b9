use std::sync::Arc;

use crate::foundation::core::FrameIndex;
use crate::image::frame::Frame;
use crate::node::render_node::NodeId;
use crate::playback::timeline::Direction;

/// Notification sent by a [`crate::PlaybackScheduler`]. Delivery is fire-and-forget: events to
/// a dropped receiver are discarded.
#[derive(Clone, Debug)]
pub enum PlaybackEvent {
    EngineStarted {
        direction: Direction,
        frame_count: Option<u64>,
    },
    EngineStopped,
    /// One frame per view, in view order.
    FrameRendered {
        time: FrameIndex,
        frames: Vec<Arc<Frame>>,
        from_cache: bool,
    },
    FpsChanged {
        actual: f64,
        desired: f64,
    },
    /// A node with previews enabled should refresh its thumbnail.
    PreviewRequested {
        node: NodeId,
        time: FrameIndex,
    },
    RenderFailed {
        time: FrameIndex,
        message: String,
    },
}
