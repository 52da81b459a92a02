//! # Introduction
//!
//! refscope is an interactive terminal browser for a live in-memory object
//! graph. Starting from one root object the operator expands a lazily built
//! tree: each object shows its type, length, a representation computed in the
//! background, and the objects it refers to and is referred to by. Cycles are
//! detected and shown as a back-reference instead of recursing forever.
//!
//! ## Browsing pipeline
//!
//! ```text
//! Heap → IdentityRegistry → GraphExplorer → NodeTree → Session → TUI
//!                                              ↑          │
//!                                              └─ drain ← PresentationBridge (workers)
//! ```
//!
//! 1. [`heap`]: the object graph: tagged [`heap::Value`] slots addressed by
//!    [`heap::ObjectId`], plus recursive representation.
//! 2. [`registry`]: snapshot of the object identities known when browsing
//!    starts; later allocations stay invisible.
//! 3. [`explorer`]: referents and referrers of an object, filtered to the
//!    registry and ordered by identity string.
//! 4. [`tree`]: arena of lazily created nodes with stable keys and cycle
//!    detection.
//! 5. [`bridge`]: worker pool computing representations and a bounded
//!    handoff queue applying results on the render thread.
//! 6. [`session`]: ties the tree to the bridge and owns their lifetime.
//! 7. [`ui`]: ratatui-based TUI; not part of the stable library API.
//!
//! Ambient pieces: [`config`] reads `REFSCOPE_*` environment variables,
//! [`limits`] installs the address-space guard, [`demo`] builds the sample
//! graphs the binary browses, and [`error`] holds the error types.

pub mod bridge;
pub mod config;
pub mod demo;
pub mod error;
pub mod explorer;
pub mod heap;
pub mod limits;
pub mod registry;
pub mod session;
pub mod tree;
pub mod ui;
