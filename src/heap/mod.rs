//! The live object heap
//!
//! This module provides the object graph the browser explores:
//! - [`value`]: what a heap slot holds, and the [`NativeObject`] extension point
//! - [`repr`]: recursive textual representation of objects
//!
//! # Identity
//!
//! Every allocation receives an [`ObjectId`], the object's address. Addresses
//! start at [`HEAP_ADDRESS_START`] and advance by [`ADDRESS_STRIDE`]; they are
//! never handed out twice, even after the object is freed, so an id denotes
//! the same object for the whole session.
//!
//! # Edges
//!
//! There is no runtime-wide reflection to ask "what does this object point
//! at?". Instead each value declares its outgoing edges (container elements,
//! record fields, or [`NativeObject::referents`]). Incoming edges are found by
//! scanning every live object, which is what a tracing collector would do too.
//!
//! # Concurrency
//!
//! The heap is shared between the render thread and the representation
//! workers, so slots sit behind an [`RwLock`]. A poisoned lock surfaces as
//! [`HeapError::Poisoned`] rather than a panic.

pub mod repr;
pub mod value;

pub use value::{NativeObject, Value};

use crate::error::{HeapError, ReprError};
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Address of the first allocation
pub const HEAP_ADDRESS_START: u64 = 0x0001_0000;

/// Distance between consecutive allocations
pub const ADDRESS_STRIDE: u64 = 0x10;

/// Identity token of a heap object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    pub fn from_addr(addr: u64) -> Self {
        ObjectId(addr)
    }

    pub fn addr(self) -> u64 {
        self.0
    }
}

/// Fixed-width hex, so sorting the string form agrees with numeric order
impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

/// The heap
pub struct Heap {
    objects: RwLock<FxHashMap<ObjectId, Value>>,
    next_address: AtomicU64,
}

impl Heap {
    /// Create an empty heap, ready to be shared
    pub fn new() -> Arc<Self> {
        Arc::new(Heap {
            objects: RwLock::new(FxHashMap::default()),
            next_address: AtomicU64::new(HEAP_ADDRESS_START),
        })
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, FxHashMap<ObjectId, Value>>, HeapError> {
        self.objects.read().map_err(|_| HeapError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, FxHashMap<ObjectId, Value>>, HeapError> {
        self.objects.write().map_err(|_| HeapError::Poisoned)
    }

    /// Allocate a new object holding `value`
    pub fn alloc(self: &Arc<Self>, value: Value) -> Result<ObjRef, HeapError> {
        let id = ObjectId(self.next_address.fetch_add(ADDRESS_STRIDE, Ordering::Relaxed));
        self.write()?.insert(id, value);
        Ok(ObjRef::new(Arc::clone(self), id))
    }

    /// Replace the contents of a live object.
    ///
    /// This is how self-referential structures are built: allocate first,
    /// then store a value mentioning the object's own id.
    pub fn set(&self, id: ObjectId, value: Value) -> Result<(), HeapError> {
        match self.write()?.get_mut(&id) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(HeapError::Collected(id)),
        }
    }

    /// Collect an object. Edges pointing at it become dangling.
    pub fn free(&self, id: ObjectId) -> Result<(), HeapError> {
        match self.write()?.remove(&id) {
            Some(_) => Ok(()),
            None => Err(HeapError::Collected(id)),
        }
    }

    /// Handle to an existing object, if it is still alive
    pub fn get(self: &Arc<Self>, id: ObjectId) -> Option<ObjRef> {
        let alive = self.read().ok()?.contains_key(&id);
        alive.then(|| ObjRef::new(Arc::clone(self), id))
    }

    /// Ids of every live object, in address order
    pub fn ids(&self) -> Result<Vec<ObjectId>, HeapError> {
        let mut ids: Vec<ObjectId> = self.read()?.keys().copied().collect();
        ids.sort_unstable();
        Ok(ids)
    }

    /// Number of live objects
    pub fn len(&self) -> Result<usize, HeapError> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, HeapError> {
        Ok(self.read()?.is_empty())
    }

    /// Type name of a live object
    pub fn type_name(&self, id: ObjectId) -> Result<String, HeapError> {
        self.with_value(id, |v| v.type_name().to_string())
    }

    /// Length of a live object, `None` if its type has no length
    pub fn len_of(&self, id: ObjectId) -> Result<Option<usize>, HeapError> {
        self.with_value(id, Value::len)
    }

    /// Outgoing edges as the object declares them, duplicates and dangling
    /// edges included
    pub fn referents_of(&self, id: ObjectId) -> Result<Vec<ObjectId>, HeapError> {
        self.with_value(id, Value::referents)
    }

    /// Every live object with an edge pointing at `id`
    pub fn referrers_of(&self, id: ObjectId) -> Result<Vec<ObjectId>, HeapError> {
        let objects = self.read()?;
        if !objects.contains_key(&id) {
            return Err(HeapError::Collected(id));
        }
        Ok(objects
            .iter()
            .filter(|(_, value)| value.references(id))
            .map(|(&other, _)| other)
            .collect())
    }

    /// Untruncated representation of the object.
    ///
    /// May call into [`NativeObject::repr`], so this belongs on a worker
    /// thread, never on the render thread.
    pub fn repr(&self, id: ObjectId) -> Result<String, ReprError> {
        let objects = self.read()?;
        repr::repr_object(&objects, id)
    }

    fn with_value<T>(&self, id: ObjectId, f: impl FnOnce(&Value) -> T) -> Result<T, HeapError> {
        let objects = self.read()?;
        objects.get(&id).map(f).ok_or(HeapError::Collected(id))
    }
}

impl fmt::Debug for Heap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let live = self.read().map(|o| o.len()).ok();
        f.debug_struct("Heap").field("live_objects", &live).finish()
    }
}

/// A reference to a live object: the heap plus an identity token.
///
/// Cloning is cheap and the handle is `Send`, so it can travel to workers.
#[derive(Clone)]
pub struct ObjRef {
    heap: Arc<Heap>,
    id: ObjectId,
}

impl ObjRef {
    fn new(heap: Arc<Heap>, id: ObjectId) -> Self {
        ObjRef { heap, id }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn heap(&self) -> &Arc<Heap> {
        &self.heap
    }

    /// Handle to another object in the same heap
    pub fn sibling(&self, id: ObjectId) -> ObjRef {
        ObjRef::new(Arc::clone(&self.heap), id)
    }

    pub fn type_name(&self) -> Result<String, HeapError> {
        self.heap.type_name(self.id)
    }

    pub fn len(&self) -> Result<Option<usize>, HeapError> {
        self.heap.len_of(self.id)
    }

    pub fn repr(&self) -> Result<String, ReprError> {
        self.heap.repr(self.id)
    }

    /// Overwrite this object's value
    pub fn set(&self, value: Value) -> Result<(), HeapError> {
        self.heap.set(self.id, value)
    }
}

impl PartialEq for ObjRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Arc::ptr_eq(&self.heap, &other.heap)
    }
}

impl Eq for ObjRef {}

impl fmt::Debug for ObjRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjRef({})", self.id)
    }
}
