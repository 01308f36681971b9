use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex};

use crate::foundation::sync;
use crate::image::image::Image;
use crate::node::render_node::NodeId;

/// Identity of one in-progress render: node plus image key hash (time, view, scale).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InFlightKey {
    pub node: NodeId,
    pub image_hash: u64,
}

/// Images currently being computed.
///
/// Entries pin the partially built image so recursive or concurrent requests for the same
/// (node, time, view) reuse it even if the cache evicted it meanwhile. Registration never
/// blocks: a second caller simply shares the entry.
#[derive(Default)]
pub struct InFlightRegistry {
    entries: Mutex<HashMap<InFlightKey, (Arc<Image>, usize)>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &InFlightKey) -> Option<Arc<Image>> {
        sync::lock(&self.entries)
            .get(key)
            .map(|(img, _)| Arc::clone(img))
    }

    /// Register `image` under `key` until the returned guard is dropped.
    pub fn register(&self, key: InFlightKey, image: &Arc<Image>) -> InFlightGuard<'_> {
        let mut entries = sync::lock(&self.entries);
        match entries.entry(key) {
            Entry::Occupied(mut e) => e.get_mut().1 += 1,
            Entry::Vacant(e) => {
                e.insert((Arc::clone(image), 1));
            }
        }
        InFlightGuard { registry: self, key }
    }

    pub fn len(&self) -> usize {
        sync::lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn release(&self, key: &InFlightKey) {
        let mut entries = sync::lock(&self.entries);
        if let Entry::Occupied(mut e) = entries.entry(*key) {
            e.get_mut().1 -= 1;
            if e.get().1 == 0 {
                e.remove();
            }
        }
    }
}

/// Deregisters its key on drop.
pub struct InFlightGuard<'a> {
    registry: &'a InFlightRegistry,
    key: InFlightKey,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.registry.release(&self.key);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/node/in_flight.rs"]
mod tests;
