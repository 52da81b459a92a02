//! Terminal user interface built on [ratatui](https://github.com/ratatui-org/ratatui).
//!
//! The UI is organized into three layers:
//!
//! - **[`app`]**: event loop, cursor, expand/collapse keys, drain cadence
//! - **[`panes`]**: stateless render functions for the tree pane and the status bar
//! - **[`theme`]**: centralized color palette used by all panes
//!
//! The entry point is [`Session::run`], which builds an [`App`] around the
//! session and runs it until the operator quits.
//!
//! [`Session::run`]: crate::session::Session::run

pub mod app;
pub mod panes;
pub mod theme;

pub use app::App;
