//! Identity registry: the universe of explorable objects
//!
//! The registry is captured once, before the browser creates anything of its
//! own, and never changes afterwards. Objects allocated later (including any
//! the browser itself might create) are invisible to the graph explorer.

use crate::error::RegistryError;
use crate::heap::{Heap, ObjectId};
use rustc_hash::FxHashSet;

/// Immutable set of identity tokens captured at session start
#[derive(Debug, Clone)]
pub struct IdentityRegistry {
    ids: FxHashSet<ObjectId>,
}

impl IdentityRegistry {
    /// Snapshot every object currently alive in `heap`
    pub fn capture(heap: &Heap) -> Result<Self, RegistryError> {
        let ids: FxHashSet<ObjectId> = heap.ids()?.into_iter().collect();
        log::info!("Captured identity registry with {} objects", ids.len());
        Ok(IdentityRegistry { ids })
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl FromIterator<ObjectId> for IdentityRegistry {
    fn from_iter<I: IntoIterator<Item = ObjectId>>(iter: I) -> Self {
        IdentityRegistry {
            ids: iter.into_iter().collect(),
        }
    }
}
