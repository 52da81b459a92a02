//! Main TUI application state and event loop

use super::panes::{
    Marker, RowView, StatusRenderData, Tone, TreeScrollState, render_status_bar, render_tree_pane,
};
use crate::session::Session;
use crate::tree::{NodeKind, ReprState, Row};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    Frame, Terminal,
    backend::Backend,
    layout::{Constraint, Direction, Layout},
};
use std::io;
use std::time::Instant;

/// The main application state
pub struct App<'a> {
    session: &'a mut Session,

    /// Visible rows as of the last draw
    rows: Vec<Row>,

    /// Index of the cursor row
    pub selected: usize,

    pub scroll: TreeScrollState,

    /// Whether the app should quit
    pub should_quit: bool,

    /// Status message to display
    pub status_message: String,
}

impl<'a> App<'a> {
    pub fn new(session: &'a mut Session) -> Self {
        App {
            session,
            rows: Vec::new(),
            selected: 0,
            scroll: TreeScrollState::default(),
            should_quit: false,
            status_message: String::from("Ready!"),
        }
    }

    /// Run the TUI until the operator quits.
    ///
    /// The handoff queue is drained once per poll interval; between drains
    /// the loop waits for input with a timeout ending at the next drain.
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        let poll_interval = self.session.config().poll_interval;
        let mut next_drain = Instant::now();

        loop {
            if Instant::now() >= next_drain {
                let applied = self.session.tick();
                if applied > 0 {
                    log::debug!("Applied {} representation results", applied);
                }
                next_drain = Instant::now() + poll_interval;
            }

            self.draw(terminal)?;

            if self.should_quit {
                break;
            }

            let timeout = next_drain.saturating_duration_since(Instant::now());
            if event::poll(timeout)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key_event(key);
                    }
                }
            }
        }

        Ok(())
    }

    /// Lay out the tree, draw one frame and submit any work it created
    pub fn draw<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        self.rows = self.session.tree_mut().visible_rows();
        self.selected = self.selected.min(self.rows.len().saturating_sub(1));
        let views = self.row_views();

        terminal.draw(|f| self.render(f, &views))?;
        self.session.flush();
        Ok(())
    }

    fn row_views(&mut self) -> Vec<RowView> {
        let tree = self.session.tree_mut();
        self.rows
            .iter()
            .map(|row| {
                let text = tree.display_text(row.id);
                let marker = if tree.is_leaf(row.id) {
                    Marker::Leaf
                } else if tree.is_expanded(row.id) {
                    Marker::Expanded
                } else {
                    Marker::Collapsed
                };
                let tone = match tree.node(row.id).kind() {
                    NodeKind::Root { .. } | NodeKind::Object { .. } => Tone::Object,
                    NodeKind::Group { error: Some(_), .. } => Tone::Error,
                    NodeKind::Group { .. } => Tone::Group,
                    NodeKind::Type { .. } | NodeKind::Length { .. } => Tone::Info,
                    NodeKind::Repr {
                        state: ReprState::Pending,
                        ..
                    } => Tone::Loading,
                    NodeKind::Repr {
                        state: ReprState::Failed(_),
                        ..
                    } => Tone::Error,
                    NodeKind::Repr { .. } => Tone::Repr,
                    NodeKind::Cycle => Tone::Cycle,
                };
                RowView {
                    depth: row.depth,
                    marker,
                    tone,
                    text,
                }
            })
            .collect()
    }

    fn render(&mut self, frame: &mut Frame, views: &[RowView]) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(frame.area());

        render_tree_pane(
            frame,
            chunks[0],
            "Object Graph",
            views,
            self.selected,
            &mut self.scroll,
        );

        render_status_bar(
            frame,
            chunks[1],
            StatusRenderData {
                message: &self.status_message,
                selected: self.selected,
                total_rows: views.len(),
                pending_reprs: self.session.tree().pending_reprs(),
                known_objects: self.session.registry().len(),
            },
        );
    }

    /// Handle keyboard events
    pub fn handle_key_event(&mut self, key: KeyEvent) {
        let last = self.rows.len().saturating_sub(1);
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.selected = (self.selected + 1).min(last);
            }
            KeyCode::PageUp => {
                self.selected = self.selected.saturating_sub(self.scroll.page.max(1));
            }
            KeyCode::PageDown => {
                self.selected = (self.selected + self.scroll.page.max(1)).min(last);
            }
            KeyCode::Home => {
                self.selected = 0;
            }
            KeyCode::End => {
                self.selected = last;
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                if let Some(row) = self.current_row() {
                    let tree = self.session.tree_mut();
                    if tree.is_leaf(row.id) {
                        self.status_message = "Nothing to expand".to_string();
                    } else if tree.toggle(row.id) {
                        self.status_message = format!("Expanded {}", tree.key(row.id));
                    } else {
                        self.status_message = format!("Collapsed {}", tree.key(row.id));
                    }
                }
            }
            KeyCode::Right | KeyCode::Char('l') => {
                if let Some(row) = self.current_row() {
                    let tree = self.session.tree_mut();
                    if tree.is_expanded(row.id) {
                        // Step onto the first child
                        self.selected = (self.selected + 1).min(last);
                    } else if !tree.is_leaf(row.id) {
                        tree.expand(row.id);
                        self.status_message = format!("Expanded {}", tree.key(row.id));
                    }
                }
            }
            KeyCode::Left | KeyCode::Char('h') => {
                if let Some(row) = self.current_row() {
                    let tree = self.session.tree_mut();
                    if tree.is_expanded(row.id) && row.depth > 0 {
                        tree.collapse(row.id);
                        self.status_message = format!("Collapsed {}", tree.key(row.id));
                    } else if let Some(parent) = tree.parent(row.id) {
                        if let Some(pos) = self.rows.iter().position(|r| r.id == parent) {
                            self.selected = pos;
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn current_row(&self) -> Option<Row> {
        self.rows.get(self.selected).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::heap::{Heap, Value};
    use crate::registry::IdentityRegistry;
    use crate::tree::{NodeId, NodeTree, object_key};
    use crossterm::event::KeyModifiers;
    use ratatui::backend::TestBackend;

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key_event(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn screen(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_expand_and_quit() {
        let heap = Heap::new();
        let list = heap.alloc(Value::List(Vec::new())).unwrap();
        list.set(Value::List(vec![list.id()])).unwrap();
        let registry = IdentityRegistry::capture(&heap).unwrap();
        let mut session = Session::new(list.clone(), registry, Config::default()).unwrap();
        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();

        let mut app = App::new(&mut session);
        app.draw(&mut terminal).unwrap();
        let text = screen(&terminal);
        assert!(text.contains("root: <list"));
        assert!(text.contains("1 objects"));

        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Right);
        app.draw(&mut terminal).unwrap();
        let text = screen(&terminal);
        assert!(text.contains("type: list"));
        assert!(text.contains("len: 1"));
        assert!(text.contains("referents: 1"));

        press(&mut app, KeyCode::Left);
        app.draw(&mut terminal).unwrap();
        assert!(!screen(&terminal).contains("type: list"));

        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit);
    }

    /// Tone of the root object's repr row once `finish` has settled it
    fn repr_tone(finish: impl FnOnce(&mut NodeTree, NodeId)) -> Tone {
        let heap = Heap::new();
        let n = heap.alloc(Value::Int(3)).unwrap();
        let registry = IdentityRegistry::capture(&heap).unwrap();
        let mut session = Session::new(n.clone(), registry, Config::default()).unwrap();

        let tree = session.tree_mut();
        let top = tree.child(tree.root(), &object_key(n.id()));
        let repr = tree.child(top, "repr");
        tree.expand(top);
        finish(tree, repr);

        let mut app = App::new(&mut session);
        app.rows = app.session.tree_mut().visible_rows();
        let views = app.row_views();
        views
            .iter()
            .find(|view| view.text.starts_with("repr: "))
            .map(|view| view.tone)
            .unwrap()
    }

    #[test]
    fn test_repr_tone_follows_outcome_not_text() {
        let lookalike = repr_tone(|tree, repr| {
            tree.resolve_repr(repr, "repr error: just a string".to_string());
        });
        assert_eq!(lookalike, Tone::Repr);

        let failed = repr_tone(|tree, repr| {
            tree.fail_repr(repr, "repr error: ValueError".to_string());
        });
        assert_eq!(failed, Tone::Error);
    }

    #[test]
    fn test_left_moves_to_parent() {
        let heap = Heap::new();
        let n = heap.alloc(Value::Int(42)).unwrap();
        let registry = IdentityRegistry::capture(&heap).unwrap();
        let mut session = Session::new(n, registry, Config::default()).unwrap();
        let mut terminal = Terminal::new(TestBackend::new(80, 12)).unwrap();

        let mut app = App::new(&mut session);
        app.draw(&mut terminal).unwrap();
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Enter);
        app.draw(&mut terminal).unwrap();
        press(&mut app, KeyCode::End);
        assert_eq!(app.selected, 5);

        press(&mut app, KeyCode::Left);
        assert_eq!(app.selected, 1);

        // An expanded row folds first, then the cursor climbs
        press(&mut app, KeyCode::Left);
        assert_eq!(app.selected, 1);
        press(&mut app, KeyCode::Left);
        assert_eq!(app.selected, 0);
    }
}
