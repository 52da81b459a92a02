//! Graph explorer: filtered in/out edges of an object
//!
//! Both queries read the live heap at call time, keep only objects known to
//! the [`IdentityRegistry`], drop duplicates (a list holding the same object
//! twice is still one edge for browsing purposes) and drop dangling edges to
//! collected objects. Results are ordered by the identity token's string form
//! so repeated calls against an unchanged heap agree.

use crate::error::HeapError;
use crate::heap::{ObjRef, ObjectId};
use crate::registry::IdentityRegistry;
use crate::tree::node::{KEY_REFERENTS, KEY_REFERRERS};
use std::sync::Arc;

/// Which way edges are followed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Objects this object points to
    Referents,
    /// Objects pointing at this object
    Referrers,
}

impl Direction {
    /// Child key of the matching reference group under an object node
    pub fn key(self) -> &'static str {
        match self {
            Direction::Referents => KEY_REFERENTS,
            Direction::Referrers => KEY_REFERRERS,
        }
    }
}

/// Edge queries bounded to a registry
#[derive(Debug, Clone)]
pub struct GraphExplorer {
    registry: Arc<IdentityRegistry>,
}

impl GraphExplorer {
    pub fn new(registry: Arc<IdentityRegistry>) -> Self {
        GraphExplorer { registry }
    }

    pub fn registry(&self) -> &IdentityRegistry {
        &self.registry
    }

    /// Objects directly referenced by `obj`
    pub fn referents(&self, obj: &ObjRef) -> Result<Vec<ObjRef>, HeapError> {
        self.edges(obj, Direction::Referents)
    }

    /// Objects directly referencing `obj`
    pub fn referrers(&self, obj: &ObjRef) -> Result<Vec<ObjRef>, HeapError> {
        self.edges(obj, Direction::Referrers)
    }

    pub fn edges(&self, obj: &ObjRef, direction: Direction) -> Result<Vec<ObjRef>, HeapError> {
        let heap = obj.heap();
        let raw = match direction {
            Direction::Referents => heap.referents_of(obj.id())?,
            Direction::Referrers => heap.referrers_of(obj.id())?,
        };

        let mut ids: Vec<ObjectId> = raw
            .into_iter()
            .filter(|id| self.registry.contains(*id))
            .filter(|id| heap.get(*id).is_some())
            .collect();
        ids.sort_by_cached_key(|id| id.to_string());
        ids.dedup();

        Ok(ids.into_iter().map(|id| obj.sibling(id)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::{Heap, Value};

    #[test]
    fn test_referents_sorted_and_deduplicated() {
        let heap = Heap::new();
        let a = heap.alloc(Value::Int(1)).unwrap();
        let b = heap.alloc(Value::Int(2)).unwrap();
        let list = heap
            .alloc(Value::List(vec![b.id(), a.id(), b.id()]))
            .unwrap();
        let explorer = GraphExplorer::new(Arc::new(IdentityRegistry::capture(&heap).unwrap()));

        let ids: Vec<ObjectId> = explorer
            .referents(&list)
            .unwrap()
            .iter()
            .map(ObjRef::id)
            .collect();
        assert_eq!(ids, vec![a.id(), b.id()]);
    }

    #[test]
    fn test_unregistered_objects_are_filtered() {
        let heap = Heap::new();
        let known = heap.alloc(Value::Int(1)).unwrap();
        let list = heap.alloc(Value::List(vec![known.id()])).unwrap();
        let explorer = GraphExplorer::new(Arc::new(IdentityRegistry::capture(&heap).unwrap()));

        // Created after capture: the heap reports both edges, the explorer one
        let stranger = heap.alloc(Value::Str("new".to_string())).unwrap();
        list.set(Value::List(vec![known.id(), stranger.id()])).unwrap();
        let holder = heap.alloc(Value::List(vec![list.id()])).unwrap();

        let referents = explorer.referents(&list).unwrap();
        assert_eq!(referents, vec![known.clone()]);
        assert!(heap.referrers_of(list.id()).unwrap().contains(&holder.id()));
        assert!(explorer.referrers(&list).unwrap().is_empty());
    }

    #[test]
    fn test_collected_objects_are_skipped() {
        let heap = Heap::new();
        let gone = heap.alloc(Value::None).unwrap();
        let list = heap.alloc(Value::List(vec![gone.id()])).unwrap();
        let explorer = GraphExplorer::new(Arc::new(IdentityRegistry::capture(&heap).unwrap()));
        heap.free(gone.id()).unwrap();

        assert!(explorer.referents(&list).unwrap().is_empty());
        assert_eq!(
            explorer.referrers(&gone),
            Err(HeapError::Collected(gone.id()))
        );
    }
}
