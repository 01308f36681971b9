use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use crate::engine::Engine;
use crate::foundation::core::{FrameIndex, FrameRange, RenderScale, ViewIdx};
use crate::foundation::error::{StrataError, StrataResult};
use crate::foundation::sync;
use crate::image::image::Image;
use crate::node::effect::RenderArgs;
use crate::node::render_node::{NodeId, RenderNode, RenderRequest};

/// Nodes upstream of one output, inputs before their consumers.
///
/// Built by a depth-first walk from the output that follows only active inputs. The list is
/// a snapshot: call [`RenderGraph::refresh`] after reconnecting nodes.
pub struct RenderGraph {
    engine: Arc<Engine>,
    output: Arc<RenderNode>,
    nodes: RwLock<Vec<Arc<RenderNode>>>,
}

impl RenderGraph {
    pub fn new(engine: Arc<Engine>, output: Arc<RenderNode>) -> Self {
        let graph = Self {
            engine,
            output,
            nodes: RwLock::new(Vec::new()),
        };
        graph.refresh();
        graph
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub fn output(&self) -> &Arc<RenderNode> {
        &self.output
    }

    /// Rebuild the node list. Every reachable node appears once, after all its active inputs.
    #[tracing::instrument(skip(self), fields(output = %self.output.name()))]
    pub fn refresh(&self) {
        let mut order = Vec::new();
        let mut seen = HashSet::new();
        visit(&self.output, &mut seen, &mut order);
        tracing::debug!(nodes = order.len(), "graph refreshed");
        *sync::write(&self.nodes) = order;
    }

    /// Recompute stale hashes inputs-first. Returns the output hash.
    pub fn refresh_hashes(&self) -> u64 {
        for node in sync::read(&self.nodes).iter() {
            node.hash();
        }
        self.output.hash()
    }

    /// Fail when any node of the graph misses a required input.
    pub fn validate(&self) -> StrataResult<()> {
        for node in sync::read(&self.nodes).iter() {
            let missing = node.missing_required_inputs();
            if !missing.is_empty() {
                return Err(StrataError::validation(format!(
                    "node '{}' is missing required inputs {:?}",
                    node.name(),
                    missing.as_slice()
                )));
            }
        }
        Ok(())
    }

    pub fn nodes(&self) -> Vec<Arc<RenderNode>> {
        sync::read(&self.nodes).clone()
    }

    pub fn len(&self) -> usize {
        sync::read(&self.nodes).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn position(&self, id: NodeId) -> Option<usize> {
        sync::read(&self.nodes).iter().position(|n| n.id() == id)
    }

    pub fn age(&self) -> u64 {
        self.engine.age().current()
    }

    /// Invalidate every memoized hash.
    pub fn bump_age(&self) -> u64 {
        self.engine.age().bump()
    }

    /// Frames the output produces.
    pub fn frame_range(&self) -> FrameRange {
        self.output.frame_range()
    }

    /// Raise every abort token, output first.
    pub fn request_abort(&self) {
        for node in self.abort_order() {
            node.request_abort();
        }
    }

    /// Nodes in the order their tokens are raised: every consumer before its inputs.
    pub(crate) fn abort_order(&self) -> Vec<Arc<RenderNode>> {
        sync::read(&self.nodes).iter().rev().cloned().collect()
    }

    pub fn clear_abort(&self) {
        for node in sync::read(&self.nodes).iter() {
            node.clear_abort();
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.output.is_aborted()
    }

    pub fn begin_sequence(&self, range: FrameRange) {
        for node in sync::read(&self.nodes).iter() {
            node.begin_sequence(range);
        }
    }

    pub fn end_sequence(&self) {
        for node in sync::read(&self.nodes).iter() {
            node.end_sequence();
        }
    }

    /// Render the output over its full region of definition.
    ///
    /// `Ok(None)` when aborted. An output with an empty region is a validation error.
    pub fn render_output(&self, time: FrameIndex, view: ViewIdx) -> StrataResult<Option<Arc<Image>>> {
        let args = RenderArgs {
            time,
            scale: RenderScale::FULL,
            view,
        };
        let rod = self.output.region_of_definition(&args)?;
        if rod.is_empty() {
            return Err(StrataError::validation(format!(
                "output '{}' is empty at frame {}",
                self.output.name(),
                time.0
            )));
        }
        self.output
            .render_region(&self.engine, RenderRequest::new(time, view, rod))
    }
}

fn visit(node: &Arc<RenderNode>, seen: &mut HashSet<NodeId>, order: &mut Vec<Arc<RenderNode>>) {
    if !seen.insert(node.id()) {
        return;
    }
    for input in node.active_inputs() {
        visit(&input, seen, order);
    }
    order.push(Arc::clone(node));
}

impl std::fmt::Debug for RenderGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderGraph")
            .field("output", &self.output.name())
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/graph/render_graph.rs"]
mod tests;
