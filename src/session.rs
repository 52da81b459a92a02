//! Browsing session: owns the tree, the registry and the worker pool
//!
//! A [`Session`] acquires its worker pool on construction and releases it on
//! [`Session::shutdown`] or drop, whichever comes first, so every way out of
//! the render loop (quit key, I/O error, panic unwinding) cancels
//! outstanding work and joins the workers.

use crate::bridge::PresentationBridge;
use crate::config::Config;
use crate::error::BrowseError;
use crate::explorer::GraphExplorer;
use crate::heap::ObjRef;
use crate::registry::IdentityRegistry;
use crate::tree::NodeTree;
use crate::ui::App;
use ratatui::{Terminal, backend::Backend};
use std::io;
use std::sync::Arc;

/// One exploration of one root object
pub struct Session {
    tree: NodeTree,
    bridge: PresentationBridge<NodeTree>,
    registry: Arc<IdentityRegistry>,
    config: Config,
}

impl Session {
    /// Start a session rooted at `root`, exploring only objects in `registry`
    pub fn new(root: ObjRef, registry: IdentityRegistry, config: Config) -> Result<Self, BrowseError> {
        let registry = Arc::new(registry);
        let tree = NodeTree::new(root, GraphExplorer::new(Arc::clone(&registry)));
        let bridge = PresentationBridge::start(&config.bridge())?;
        Ok(Session {
            tree,
            bridge,
            registry,
            config,
        })
    }

    pub fn tree(&self) -> &NodeTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut NodeTree {
        &mut self.tree
    }

    pub fn registry(&self) -> &IdentityRegistry {
        &self.registry
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Hand representation nodes created since the last call to the workers
    pub fn flush(&mut self) -> usize {
        let requests = self.tree.take_repr_requests();
        let count = requests.len();
        for request in requests {
            let node = request.node;
            self.bridge
                .set_repr_later(request.obj, move |tree: &mut NodeTree, outcome| {
                    match outcome {
                        Ok(text) => tree.resolve_repr(node, text),
                        Err(diagnostic) => tree.fail_repr(node, diagnostic),
                    };
                });
        }
        count
    }

    /// One poll tick: submit new work, then apply whatever results are ready
    pub fn tick(&mut self) -> usize {
        self.flush();
        self.bridge.drain(&mut self.tree)
    }

    /// Run the terminal UI until the operator quits
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        App::new(self).run(terminal)
    }

    /// Cancel outstanding work and stop the workers. Idempotent.
    pub fn shutdown(&mut self) {
        if self.bridge.is_running() {
            log::info!(
                "Ending session with {} representations outstanding",
                self.tree.pending_reprs()
            );
            self.bridge.shutdown();
        }
    }

    pub fn is_running(&self) -> bool {
        self.bridge.is_running()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}
