//! Dependency-ordered views over a node graph.

pub mod render_graph;

pub use render_graph::RenderGraph;
