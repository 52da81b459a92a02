//! Node types of the browser tree

use crate::error::HeapError;
use crate::explorer::Direction;
use crate::heap::{ObjRef, ObjectId};
use rustc_hash::FxHashMap;
use std::fmt;

/// Index of a node in its [`NodeTree`](super::NodeTree) arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub const KEY_ROOT: &str = "root";
pub const KEY_TYPE: &str = "type";
pub const KEY_LEN: &str = "len";
pub const KEY_REPR: &str = "repr";
pub const KEY_CYCLE: &str = "cycle";
pub const KEY_REFERENTS: &str = "referents";
pub const KEY_REFERRERS: &str = "referrers";

/// Key of the object node for `id`. Depends on identity only, never on the
/// path the object was reached by.
pub fn object_key(id: ObjectId) -> String {
    format!("obj-{}", id)
}

/// Loading state of a representation node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReprState {
    Pending,
    Resolved(String),
    /// Computing the text failed; holds the diagnostic shown instead
    Failed(String),
}

/// What a node shows, and how it finds its children
#[derive(Debug)]
pub enum NodeKind {
    /// The session root; its only child is the root object
    Root { obj: ObjRef },
    /// One object under examination
    Object { obj: ObjRef },
    Type { obj: ObjRef },
    Length { obj: ObjRef },
    Repr { obj: ObjRef, state: ReprState },
    /// The parent object node repeats an ancestor
    Cycle,
    /// Referents or referrers of `obj`
    Group {
        obj: ObjRef,
        direction: Direction,
        /// Filled on first enumeration, keyed like the child object nodes
        members: FxHashMap<String, ObjRef>,
        error: Option<HeapError>,
    },
}

impl NodeKind {
    pub fn is_leaf(&self) -> bool {
        matches!(
            self,
            NodeKind::Type { .. } | NodeKind::Length { .. } | NodeKind::Repr { .. } | NodeKind::Cycle
        )
    }

    /// The object this node is about, for variants that carry one
    pub fn object(&self) -> Option<&ObjRef> {
        match self {
            NodeKind::Root { obj }
            | NodeKind::Object { obj }
            | NodeKind::Type { obj }
            | NodeKind::Length { obj }
            | NodeKind::Repr { obj, .. }
            | NodeKind::Group { obj, .. } => Some(obj),
            NodeKind::Cycle => None,
        }
    }
}

/// A node in the arena
#[derive(Debug)]
pub struct Node {
    pub(crate) key: String,
    pub(crate) parent: Option<NodeId>,
    pub(crate) kind: NodeKind,
    pub(crate) expanded: bool,
    /// Child keys in display order; `None` until first enumeration
    pub(crate) child_keys: Option<Vec<String>>,
    /// Children created so far
    pub(crate) child_nodes: FxHashMap<String, NodeId>,
}

impl Node {
    pub(crate) fn new(key: String, parent: Option<NodeId>, kind: NodeKind) -> Self {
        Node {
            key,
            parent,
            kind,
            expanded: false,
            child_keys: None,
            child_nodes: FxHashMap::default(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn is_object(&self) -> bool {
        matches!(self.kind, NodeKind::Object { .. })
    }
}
