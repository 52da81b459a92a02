//! TUI pane rendering modules
//!
//! - [`tree`]: the object tree, one row per visible node
//! - [`status`]: status bar with keybindings and session counters
//!
//! Each pane module exports a `render_*` function taking plain data; panes
//! never touch the session or the node tree directly.

pub mod status;
pub mod tree;

pub use status::{render_status_bar, StatusRenderData};
pub use tree::{render_tree_pane, Marker, RowView, Tone, TreeScrollState};
