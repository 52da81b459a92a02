//! Error types for the object browser
//!
//! The browser separates failures by how far they are allowed to travel:
//!
//! - [`HeapError`] and [`ReprError`] describe a problem inspecting *one*
//!   object. They never abort a session; the tree renders them as a short
//!   per-node diagnostic instead.
//! - [`RegistryError`] and [`ConfigError`] happen during session setup and are
//!   fatal, surfaced through [`BrowseError`] before the render loop starts.
//! - [`LimitError`] comes from the optional memory guard. It is logged and
//!   otherwise ignored.

use crate::heap::ObjectId;
use std::io;
use thiserror::Error;

/// Failure reading the live heap
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeapError {
    /// The object was freed after something referenced it
    #[error("object {0} has been collected")]
    Collected(ObjectId),

    /// A thread panicked while holding the heap lock
    #[error("heap lock poisoned")]
    Poisoned,
}

impl HeapError {
    /// Short label used when the failure is shown inside the tree
    pub fn diagnostic(&self) -> &'static str {
        match self {
            HeapError::Collected(_) => "collected",
            HeapError::Poisoned => "heap unavailable",
        }
    }
}

/// Failure producing the textual representation of an object
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReprError {
    /// A native object's own conversion reported a failure
    #[error("{kind}: {message}")]
    Failed { kind: String, message: String },

    /// The conversion panicked on the worker thread
    #[error("representation panicked")]
    Panicked,

    /// Nesting went deeper than the renderer allows
    #[error("maximum representation depth exceeded")]
    TooDeep,

    #[error(transparent)]
    Heap(#[from] HeapError),
}

impl ReprError {
    /// Name of the failure kind, without any message text.
    ///
    /// Messages come from arbitrary objects and may be huge or contain
    /// terminal control sequences, so only the kind is ever displayed.
    pub fn kind(&self) -> &str {
        match self {
            ReprError::Failed { kind, .. } => kind,
            ReprError::Panicked => "Panic",
            ReprError::TooDeep => "RecursionLimit",
            ReprError::Heap(HeapError::Collected(_)) => "Collected",
            ReprError::Heap(HeapError::Poisoned) => "Poisoned",
        }
    }
}

/// The live object universe could not be enumerated
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to capture object registry: {source}")]
pub struct RegistryError {
    #[from]
    pub source: HeapError,
}

/// Invalid value in an environment variable
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{var}: expected {expected}, got {value:?}")]
    Invalid {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// The memory guard could not install its ceiling
#[derive(Debug, Error)]
pub enum LimitError {
    #[error("failed to read resource usage: {0}")]
    Usage(#[source] io::Error),

    #[error("failed to set RLIMIT_AS to {limit} bytes: {source}")]
    SetLimit {
        limit: u64,
        #[source]
        source: io::Error,
    },

    #[error("memory limits are not supported on this platform")]
    Unsupported,
}

/// Fatal errors that end a browsing session before or during startup
#[derive(Debug, Error)]
pub enum BrowseError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("heap error: {0}")]
    Heap(#[from] HeapError),

    #[error("terminal error: {0}")]
    Io(#[from] io::Error),
}
