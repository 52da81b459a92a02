//! Lazy tree of nodes over the object graph
//!
//! The tree is an arena: nodes live in a `Vec` and refer to their parent by
//! [`NodeId`]. Parents own their children through the arena; the parent
//! index is only ever followed upwards, for cycle detection and depth.
//!
//! # Laziness
//!
//! Nothing below a node exists until someone asks for its children. The
//! first call to [`NodeTree::child_keys`] computes and caches the key list;
//! [`NodeTree::child`] creates a child node on first request and returns the
//! cached one afterwards. Both stay fixed for the node's lifetime even though
//! the heap underneath keeps changing.
//!
//! # Layout
//!
//! ```text
//! root
//! └── <list 0x00010000>          object node, key obj-0x00010000
//!     ├── type: list
//!     ├── len: 1                 only for types with a length
//!     ├── repr: [[...]]          filled in by a background worker
//!     ├── referents: 1
//!     │   └── <list 0x00010000>
//!     │       └── cycle: see 1 levels above
//!     └── referrers: 1
//! ```
//!
//! # Cycles
//!
//! Object node keys depend only on object identity. An object node whose key
//! matches an ancestor object node shows a single `cycle` child instead of
//! its usual children. The distance is counted in object levels: group nodes
//! between two object nodes do not count.

pub mod node;

pub use node::{object_key, Node, NodeId, NodeKind, ReprState};

use crate::explorer::{Direction, GraphExplorer};
use crate::heap::ObjRef;
use node::{KEY_CYCLE, KEY_LEN, KEY_REFERENTS, KEY_REFERRERS, KEY_REPR, KEY_ROOT, KEY_TYPE};
use rustc_hash::FxHashMap;
use std::mem;

/// A representation node waiting for its text
#[derive(Debug, Clone)]
pub struct ReprRequest {
    pub node: NodeId,
    pub obj: ObjRef,
}

/// One line of the flattened, expanded tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Row {
    pub id: NodeId,
    pub depth: usize,
}

/// The browser tree
pub struct NodeTree {
    nodes: Vec<Node>,
    explorer: GraphExplorer,
    repr_requests: Vec<ReprRequest>,
    pending_reprs: usize,
}

impl NodeTree {
    /// Tree with an expanded root entry for `root`
    pub fn new(root: ObjRef, explorer: GraphExplorer) -> Self {
        let mut entry = Node::new(KEY_ROOT.to_string(), None, NodeKind::Root { obj: root });
        entry.expanded = true;
        NodeTree {
            nodes: vec![entry],
            explorer,
            repr_requests: Vec::new(),
            pending_reprs: 0,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Number of nodes created so far
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn explorer(&self) -> &GraphExplorer {
        &self.explorer
    }

    pub fn key(&self, id: NodeId) -> &str {
        &self.nodes[id.0].key
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Parent, grandparent, ... up to the root entry
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&current| self.parent(current))
    }

    pub fn depth(&self, id: NodeId) -> usize {
        self.ancestors(id).count()
    }

    /// For an object node repeating an ancestor, how many object levels up
    /// the nearest repeat is. Walks the chain every time: the same object can
    /// sit at different depths along different paths.
    pub fn cycle_depth(&self, id: NodeId) -> Option<usize> {
        let node = self.node(id);
        if !node.is_object() {
            return None;
        }

        let mut levels = 0;
        for ancestor in self.ancestors(id).map(|a| self.node(a)) {
            if ancestor.is_object() {
                levels += 1;
                if ancestor.key == node.key {
                    return Some(levels);
                }
            }
        }
        None
    }

    fn load_child_keys(&mut self, id: NodeId) -> Vec<String> {
        if self.node(id).is_object() && self.cycle_depth(id).is_some() {
            return vec![KEY_CYCLE.to_string()];
        }

        let explorer = &self.explorer;
        match &mut self.nodes[id.0].kind {
            NodeKind::Root { obj } => vec![object_key(obj.id())],
            NodeKind::Object { obj } => {
                let mut keys = vec![KEY_TYPE];
                if matches!(obj.len(), Ok(Some(_))) {
                    keys.push(KEY_LEN);
                }
                keys.extend([KEY_REPR, KEY_REFERENTS, KEY_REFERRERS]);
                keys.into_iter().map(String::from).collect()
            }
            NodeKind::Group {
                obj,
                direction,
                members,
                error,
            } => match explorer.edges(obj, *direction) {
                Ok(objects) => objects
                    .into_iter()
                    .map(|member| {
                        let key = object_key(member.id());
                        members.insert(key.clone(), member);
                        key
                    })
                    .collect(),
                Err(e) => {
                    log::warn!("Listing {} of {} failed: {}", direction.key(), obj.id(), e);
                    *error = Some(e);
                    Vec::new()
                }
            },
            NodeKind::Type { .. }
            | NodeKind::Length { .. }
            | NodeKind::Repr { .. }
            | NodeKind::Cycle => Vec::new(),
        }
    }

    fn ensure_child_keys(&mut self, id: NodeId) {
        if self.nodes[id.0].child_keys.is_none() {
            let keys = self.load_child_keys(id);
            self.nodes[id.0].child_keys = Some(keys);
        }
    }

    /// Keys of the node's children, computed on first call
    pub fn child_keys(&mut self, id: NodeId) -> &[String] {
        self.ensure_child_keys(id);
        self.nodes[id.0].child_keys.as_deref().unwrap_or_default()
    }

    /// The child under `key`, created on first request.
    ///
    /// # Panics
    ///
    /// If `key` is not one of the node's child keys. Keys are produced by the
    /// tree itself, so an unknown key is a bug in the caller.
    pub fn child(&mut self, id: NodeId, key: &str) -> NodeId {
        self.ensure_child_keys(id);
        if let Some(&existing) = self.nodes[id.0].child_nodes.get(key) {
            return existing;
        }

        let parent = &self.nodes[id.0];
        let known = parent
            .child_keys
            .as_ref()
            .is_some_and(|keys| keys.iter().any(|k| k == key));
        assert!(
            known,
            "unexpected child key {:?} under node {} ({:?})",
            key, id, parent.key
        );

        let kind = match (&parent.kind, key) {
            (NodeKind::Root { obj }, _) => NodeKind::Object { obj: obj.clone() },
            (NodeKind::Object { obj }, KEY_TYPE) => NodeKind::Type { obj: obj.clone() },
            (NodeKind::Object { obj }, KEY_LEN) => NodeKind::Length { obj: obj.clone() },
            (NodeKind::Object { obj }, KEY_REPR) => NodeKind::Repr {
                obj: obj.clone(),
                state: ReprState::Pending,
            },
            (NodeKind::Object { .. }, KEY_CYCLE) => NodeKind::Cycle,
            (NodeKind::Object { obj }, KEY_REFERENTS) => group(obj, Direction::Referents),
            (NodeKind::Object { obj }, KEY_REFERRERS) => group(obj, Direction::Referrers),
            (NodeKind::Group { members, .. }, _) => match members.get(key) {
                Some(member) => NodeKind::Object {
                    obj: member.clone(),
                },
                None => unreachable!("group member {:?} missing", key),
            },
            (other, _) => unreachable!("{:?} has no child {:?}", other, key),
        };

        let child = NodeId(self.nodes.len());
        if let NodeKind::Repr { obj, .. } = &kind {
            self.repr_requests.push(ReprRequest {
                node: child,
                obj: obj.clone(),
            });
            self.pending_reprs += 1;
        }
        self.nodes.push(Node::new(key.to_string(), Some(id), kind));
        self.nodes[id.0].child_nodes.insert(key.to_string(), child);
        child
    }

    /// Every child, in key order
    pub fn children(&mut self, id: NodeId) -> Vec<NodeId> {
        let keys = self.child_keys(id).to_vec();
        keys.iter().map(|key| self.child(id, key)).collect()
    }

    /// Follow a path of child keys from `from`
    pub fn walk(&mut self, from: NodeId, path: &[&str]) -> NodeId {
        path.iter().fold(from, |id, key| self.child(id, key))
    }

    pub fn is_expanded(&self, id: NodeId) -> bool {
        self.nodes[id.0].expanded
    }

    /// Whether the node can have children at all
    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.nodes[id.0].kind.is_leaf()
    }

    pub fn expand(&mut self, id: NodeId) {
        if !self.is_leaf(id) {
            self.nodes[id.0].expanded = true;
        }
    }

    pub fn collapse(&mut self, id: NodeId) {
        self.nodes[id.0].expanded = false;
    }

    /// Flip the expanded flag and return the new state
    pub fn toggle(&mut self, id: NodeId) -> bool {
        if self.is_expanded(id) {
            self.collapse(id);
        } else {
            self.expand(id);
        }
        self.is_expanded(id)
    }

    /// Text the render layer shows for a node
    pub fn display_text(&mut self, id: NodeId) -> String {
        if let NodeKind::Group { .. } = self.nodes[id.0].kind {
            self.ensure_child_keys(id);
        }

        let node = &self.nodes[id.0];
        match &node.kind {
            NodeKind::Root { obj } => format!("{}: {}", KEY_ROOT, describe(obj)),
            NodeKind::Object { obj } => describe(obj),
            NodeKind::Type { obj } => match obj.type_name() {
                Ok(name) => format!("{}: {}", KEY_TYPE, name),
                Err(e) => format!("{}: <{}>", KEY_TYPE, e.diagnostic()),
            },
            NodeKind::Length { obj } => match obj.len() {
                Ok(Some(n)) => format!("{}: {}", KEY_LEN, n),
                Ok(None) => format!("{}: <unsized>", KEY_LEN),
                Err(e) => format!("{}: <{}>", KEY_LEN, e.diagnostic()),
            },
            NodeKind::Repr { state, .. } => match state {
                ReprState::Pending => format!("{}: loading...", KEY_REPR),
                ReprState::Resolved(text) | ReprState::Failed(text) => {
                    format!("{}: {}", KEY_REPR, text)
                }
            },
            NodeKind::Cycle => {
                let levels = node
                    .parent
                    .and_then(|parent| self.cycle_depth(parent))
                    .unwrap_or(0);
                format!("{}: see {} levels above", KEY_CYCLE, levels)
            }
            NodeKind::Group {
                direction, error, ..
            } => match error {
                Some(e) => format!("{}: <{}>", direction.key(), e.diagnostic()),
                None => format!(
                    "{}: {}",
                    direction.key(),
                    node.child_keys.as_ref().map_or(0, Vec::len)
                ),
            },
        }
    }

    /// Store the computed text of a representation node.
    ///
    /// Only the first call for a node, this or [`fail_repr`], has any effect.
    ///
    /// [`fail_repr`]: NodeTree::fail_repr
    pub fn resolve_repr(&mut self, id: NodeId, text: String) -> bool {
        self.finish_repr(id, ReprState::Resolved(text))
    }

    /// Record that the representation could not be computed
    pub fn fail_repr(&mut self, id: NodeId, diagnostic: String) -> bool {
        self.finish_repr(id, ReprState::Failed(diagnostic))
    }

    fn finish_repr(&mut self, id: NodeId, outcome: ReprState) -> bool {
        match &mut self.nodes[id.0].kind {
            NodeKind::Repr { state, .. } if *state == ReprState::Pending => {
                *state = outcome;
                self.pending_reprs -= 1;
                true
            }
            NodeKind::Repr { .. } => {
                log::debug!("Ignoring second representation for node {}", id);
                false
            }
            other => panic!("node {} is not a representation node: {:?}", id, other),
        }
    }

    /// Representation nodes created since the last call
    pub fn take_repr_requests(&mut self) -> Vec<ReprRequest> {
        mem::take(&mut self.repr_requests)
    }

    /// Representation nodes still showing the loading placeholder
    pub fn pending_reprs(&self) -> usize {
        self.pending_reprs
    }

    /// Depth-first list of every node visible with the current expansion
    pub fn visible_rows(&mut self) -> Vec<Row> {
        let mut rows = Vec::new();
        let mut stack = vec![Row {
            id: self.root(),
            depth: 0,
        }];
        while let Some(row) = stack.pop() {
            rows.push(row);
            if self.is_expanded(row.id) {
                let children = self.children(row.id);
                stack.extend(children.into_iter().rev().map(|id| Row {
                    id,
                    depth: row.depth + 1,
                }));
            }
        }
        rows
    }
}

fn group(obj: &ObjRef, direction: Direction) -> NodeKind {
    NodeKind::Group {
        obj: obj.clone(),
        direction,
        members: FxHashMap::default(),
        error: None,
    }
}

fn describe(obj: &ObjRef) -> String {
    match obj.type_name() {
        Ok(name) => format!("<{} {}>", name, obj.id()),
        Err(e) => format!("<{} {}>", e.diagnostic(), obj.id()),
    }
}
