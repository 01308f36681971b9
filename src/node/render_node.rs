use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};

use rayon::prelude::*;
use smallvec::SmallVec;

use crate::cache::entry::EntryParams;
use crate::cache::key::{ContentKey, ImageKey};
use crate::engine::Engine;
use crate::foundation::core::{FrameIndex, FrameRange, RectI, RenderScale, ViewIdx};
use crate::foundation::error::{StrataError, StrataResult};
use crate::foundation::hash::StableHasher;
use crate::foundation::sync;
use crate::image::image::{Image, ImageParams, ImageView};
use crate::node::abort::AbortToken;
use crate::node::effect::{ComputeArgs, ComputeStatus, Effect, RenderArgs, ThreadSafety};
use crate::node::in_flight::InFlightKey;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u64);

/// Monotonic counter shared by every node of an engine. Bumped on any change that can alter
/// a node hash; a memoized hash is valid only while its stamp equals the current age.
#[derive(Clone, Debug, Default)]
pub struct GraphAge(Arc<AtomicU64>);

impl GraphAge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    pub fn bump(&self) -> u64 {
        self.0.fetch_add(1, Ordering::AcqRel) + 1
    }
}

/// One request to [`RenderNode::render_region`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderRequest {
    pub time: FrameIndex,
    pub scale: RenderScale,
    pub view: ViewIdx,
    pub roi: RectI,
}

impl RenderRequest {
    pub fn new(time: FrameIndex, view: ViewIdx, roi: RectI) -> Self {
        Self {
            time,
            scale: RenderScale::FULL,
            view,
            roi,
        }
    }

    pub fn args(&self) -> RenderArgs {
        RenderArgs {
            time: self.time,
            scale: self.scale,
            view: self.view,
        }
    }
}

type Inputs = SmallVec<[Option<Weak<RenderNode>>; 4]>;

/// A graph node: one effect, its inputs, a memoized content hash and the render protocol.
///
/// Inputs are held weakly; the graph owner keeps nodes alive.
pub struct RenderNode {
    id: NodeId,
    name: String,
    effect: RwLock<Arc<dyn Effect>>,
    inputs: RwLock<Inputs>,
    hash: Mutex<Option<(u64, u64)>>,
    age: GraphAge,
    abort: AbortToken,
    instance_lock: Mutex<()>,
    preview: AtomicBool,
}

impl RenderNode {
    pub(crate) fn new(id: NodeId, name: String, effect: Arc<dyn Effect>, age: GraphAge) -> Self {
        let slots = effect.max_inputs();
        Self {
            id,
            name,
            effect: RwLock::new(effect),
            inputs: RwLock::new((0..slots).map(|_| None).collect()),
            hash: Mutex::new(None),
            age,
            abort: AbortToken::new(),
            instance_lock: Mutex::new(()),
            preview: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn effect(&self) -> Arc<dyn Effect> {
        Arc::clone(&sync::read(&self.effect))
    }

    /// Swap the effect (a parameter edit). Inputs beyond the new effect's arity are dropped.
    pub fn set_effect(&self, effect: impl Effect) {
        let slots = effect.max_inputs();
        *sync::write(&self.effect) = Arc::new(effect);
        sync::write(&self.inputs).resize(slots, None);
        self.age.bump();
    }

    pub fn input(&self, index: usize) -> Option<Arc<RenderNode>> {
        sync::read(&self.inputs)
            .get(index)
            .and_then(|slot| slot.as_ref())
            .and_then(Weak::upgrade)
    }

    /// One slot per input, `None` where disconnected.
    pub fn inputs(&self) -> SmallVec<[Option<Arc<RenderNode>>; 4]> {
        sync::read(&self.inputs)
            .iter()
            .map(|slot| slot.as_ref().and_then(Weak::upgrade))
            .collect()
    }

    /// Connect `input` to slot `index`. Rejects edges that would close a cycle.
    pub fn connect_input(&self, index: usize, input: &Arc<RenderNode>) -> StrataResult<()> {
        let max = self.effect().max_inputs();
        if index >= max {
            return Err(StrataError::validation(format!(
                "node '{}' has {max} inputs, cannot connect slot {index}",
                self.name
            )));
        }
        if input.id == self.id || input.depends_on(self.id) {
            return Err(StrataError::validation(format!(
                "connecting '{}' into '{}' would create a cycle",
                input.name, self.name
            )));
        }
        sync::write(&self.inputs)[index] = Some(Arc::downgrade(input));
        self.age.bump();
        Ok(())
    }

    pub fn disconnect_input(&self, index: usize) {
        let mut inputs = sync::write(&self.inputs);
        if let Some(slot) = inputs.get_mut(index)
            && slot.take().is_some()
        {
            drop(inputs);
            self.age.bump();
        }
    }

    /// Whether `id` is reachable upstream of this node.
    pub fn depends_on(&self, id: NodeId) -> bool {
        self.inputs()
            .into_iter()
            .flatten()
            .any(|n| n.id == id || n.depends_on(id))
    }

    /// Inputs followed by graph traversal: only the active one for selector nodes, every
    /// connected input otherwise.
    pub fn active_inputs(&self) -> SmallVec<[Arc<RenderNode>; 4]> {
        let effect = self.effect();
        if let Some(selector) = effect.active_input_selector() {
            return selector
                .active_input()
                .and_then(|i| self.input(i))
                .into_iter()
                .collect();
        }
        self.inputs().into_iter().flatten().collect()
    }

    /// Indices of required inputs that are not connected.
    pub fn missing_required_inputs(&self) -> SmallVec<[usize; 4]> {
        let effect = self.effect();
        self.inputs()
            .iter()
            .enumerate()
            .filter(|(i, slot)| slot.is_none() && !effect.is_input_optional(*i))
            .map(|(i, _)| i)
            .collect()
    }

    /// Content hash: parameters, then each input slot's hash (a marker byte for disconnected
    /// slots), then the effect type. Memoized until the graph age moves.
    pub fn hash(&self) -> u64 {
        let age = self.age.current();
        if let Some((hash, stamp)) = *sync::lock(&self.hash)
            && stamp == age
        {
            return hash;
        }
        let hash = self.compute_hash();
        *sync::lock(&self.hash) = Some((hash, age));
        hash
    }

    /// Whether the memoized hash is valid for the current age.
    pub fn is_hash_fresh(&self) -> bool {
        matches!(*sync::lock(&self.hash), Some((_, stamp)) if stamp == self.age.current())
    }

    fn compute_hash(&self) -> u64 {
        let effect = self.effect();
        let mut h = StableHasher::new();
        effect.hash_params(&mut h);
        for slot in self.inputs() {
            match slot {
                Some(input) => {
                    h.write_u8(1);
                    h.write_u64(input.hash());
                }
                None => h.write_u8(0),
            }
        }
        h.write_str(effect.type_id());
        h.finish()
    }

    pub fn frame_range(&self) -> FrameRange {
        let ranges: SmallVec<[Option<FrameRange>; 4]> = self
            .inputs()
            .iter()
            .map(|slot| slot.as_ref().map(|n| n.frame_range()))
            .collect();
        self.effect().frame_range(&ranges)
    }

    pub fn region_of_definition(&self, args: &RenderArgs) -> StrataResult<RectI> {
        let effect = self.effect();
        let mut rods: SmallVec<[Option<RectI>; 4]> = SmallVec::new();
        for slot in self.inputs() {
            rods.push(match slot {
                Some(input) => Some(input.region_of_definition(args)?),
                None => None,
            });
        }
        effect.region_of_definition(args, &rods)
    }

    pub fn abort_token(&self) -> &AbortToken {
        &self.abort
    }

    pub fn request_abort(&self) {
        self.abort.abort();
    }

    pub fn clear_abort(&self) {
        self.abort.reset();
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.is_aborted()
    }

    pub fn set_preview_enabled(&self, enabled: bool) {
        self.preview.store(enabled, Ordering::Relaxed);
    }

    pub fn preview_enabled(&self) -> bool {
        self.preview.load(Ordering::Relaxed)
    }

    pub fn begin_sequence(&self, range: FrameRange) {
        self.effect().begin_sequence(range);
    }

    pub fn end_sequence(&self) {
        self.effect().end_sequence();
    }

    /// Render `req.roi` of this node's output through the node cache.
    ///
    /// Returns the cached image (possibly larger than the request), or `Ok(None)` when the
    /// node's abort token was raised before the region was complete.
    #[tracing::instrument(skip(self, engine), fields(node = %self.name, time = req.time.0))]
    pub fn render_region(
        &self,
        engine: &Engine,
        req: RenderRequest,
    ) -> StrataResult<Option<Arc<Image>>> {
        if self.is_aborted() {
            return Ok(None);
        }
        let missing = self.missing_required_inputs();
        if let Some(i) = missing.first() {
            return Err(StrataError::upstream(
                &self.name,
                format!("required input {i} is not connected"),
            ));
        }
        let effect = self.effect();
        let args = req.args();
        let key = ImageKey::new(self.hash(), req.time, req.view, req.scale);
        let in_flight_key = InFlightKey {
            node: self.id,
            image_hash: key.content_hash(),
        };

        let image = match engine.in_flight().get(&in_flight_key) {
            Some(image) => image,
            None => match engine.node_cache().get(&key) {
                Some(image) => image,
                None => {
                    let rod = self.region_of_definition(&args)?;
                    let params = ImageParams { rod, cost: 0 };
                    let Some(handle) = engine.node_cache().new_entry(key, params) else {
                        return Err(StrataError::allocation(format!(
                            "no storage for '{}' ({} bytes)",
                            self.name,
                            params.byte_len()
                        )));
                    };
                    handle.seal()
                }
            },
        };

        let guard = engine.in_flight().register(in_flight_key, &image);

        let rects = image.rects_to_render(req.roi);
        if !rects.is_empty() {
            let window = rects.iter().fold(RectI::default(), |acc, r| acc.union(*r));
            let Some(inputs) = self.render_inputs(engine, effect.as_ref(), req, window)? else {
                return Ok(None);
            };
            let status = self.compute_rects(engine, &effect, &args, &image, &rects, &inputs)?;
            if status == ComputeStatus::Aborted {
                return Ok(None);
            }
        }

        drop(guard);
        engine.node_cache().enforce_budget();
        Ok(Some(image))
    }

    /// Render every needed input over its region of interest. `Ok(None)` when an input was
    /// aborted.
    fn render_inputs(
        &self,
        engine: &Engine,
        effect: &dyn Effect,
        req: RenderRequest,
        window: RectI,
    ) -> StrataResult<Option<SmallVec<[Option<Arc<Image>>; 4]>>> {
        let args = req.args();
        let rois = effect.regions_of_interest(&args, window);
        let mut out = SmallVec::new();
        for (i, slot) in self.inputs().into_iter().enumerate() {
            let Some(input) = slot else {
                out.push(None);
                continue;
            };
            let Some(roi) = rois.get(i).copied().flatten() else {
                out.push(None);
                continue;
            };
            // Untiled effects see the whole input.
            let roi = if effect.supports_tiles() {
                roi
            } else {
                input.region_of_definition(&args)?
            };
            match input.render_region(engine, RenderRequest { roi, ..req }) {
                Ok(Some(image)) => out.push(Some(image)),
                Ok(None) => return Ok(None),
                Err(e) => return Err(StrataError::upstream(&self.name, e.to_string())),
            }
        }
        Ok(Some(out))
    }

    fn compute_rects(
        &self,
        engine: &Engine,
        effect: &Arc<dyn Effect>,
        args: &RenderArgs,
        image: &Image,
        rects: &[RectI],
        inputs: &[Option<Arc<Image>>],
    ) -> StrataResult<ComputeStatus> {
        let guards = inputs
            .iter()
            .map(|slot| slot.as_ref().map(|img| img.read()).transpose())
            .collect::<StrataResult<SmallVec<[_; 4]>>>()?;
        let views: SmallVec<[Option<ImageView<'_>>; 4]> = guards
            .iter()
            .map(|g| g.as_ref().map(|g| g.view()))
            .collect();
        let cargs = ComputeArgs {
            time: args.time,
            scale: args.scale,
            view: args.view,
            node: &self.name,
            abort: &self.abort,
        };

        for rect in rects {
            if self.is_aborted() {
                return Ok(ComputeStatus::Aborted);
            }
            let mut out = image.write()?;
            let Some(mut window) = out.window(*rect) else {
                continue;
            };
            let status = match effect.thread_safety() {
                ThreadSafety::Unsafe => {
                    let lock = engine.type_lock(effect.type_id());
                    let _serial = sync::lock(&lock);
                    effect.compute(&cargs, &views, &mut window)
                }
                ThreadSafety::InstanceSafe => {
                    let _serial = sync::lock(&self.instance_lock);
                    effect.compute(&cargs, &views, &mut window)
                }
                ThreadSafety::FullySafe => {
                    let pool = engine.tile_pool();
                    let bands = window.split_rows(pool.current_num_threads());
                    let statuses: Vec<StrataResult<ComputeStatus>> = pool.install(|| {
                        bands
                            .into_par_iter()
                            .map(|mut band| effect.compute(&cargs, &views, &mut band))
                            .collect()
                    });
                    fold_statuses(statuses)
                }
            }
            .map_err(|e| match e {
                StrataError::Compute { .. } => e,
                other => StrataError::compute(&self.name, other.to_string()),
            })?;
            drop(out);

            if status == ComputeStatus::Aborted {
                return Ok(ComputeStatus::Aborted);
            }
            image.mark_rendered(*rect);
        }
        Ok(ComputeStatus::Done)
    }
}

fn fold_statuses(statuses: Vec<StrataResult<ComputeStatus>>) -> StrataResult<ComputeStatus> {
    let mut aborted = false;
    for status in statuses {
        aborted |= status? == ComputeStatus::Aborted;
    }
    Ok(if aborted {
        ComputeStatus::Aborted
    } else {
        ComputeStatus::Done
    })
}

impl std::fmt::Debug for RenderNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderNode")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("type", &self.effect().type_id())
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/node/render_node.rs"]
mod tests;
