//! Render nodes and the contract their effects implement.
//!
//! A [`render_node::RenderNode`] wraps one [`effect::Effect`], memoizes its content hash
//! against the shared graph age and renders regions of its output through the node cache.

/// Cooperative cancellation.
pub mod abort;
pub mod effect;
pub mod in_flight;
pub mod render_node;
