//! Object tree pane
//!
//! Renders the flattened tree as an indented list. Each row carries an
//! expansion marker and a [`Tone`] picked by the app from the node kind, so
//! this module knows nothing about nodes.

use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
    Frame,
};

/// Expansion state shown before a row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Expanded,
    Collapsed,
    Leaf,
}

impl Marker {
    fn symbol(self) -> &'static str {
        match self {
            Marker::Expanded => "▾ ",
            Marker::Collapsed => "▸ ",
            Marker::Leaf => "  ",
        }
    }
}

/// Coloring class of a row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Object,
    Group,
    Info,
    Loading,
    Repr,
    Cycle,
    Error,
}

impl Tone {
    fn style(self) -> Style {
        let fg = match self {
            Tone::Object => DEFAULT_THEME.type_name,
            Tone::Group => DEFAULT_THEME.primary,
            Tone::Info => DEFAULT_THEME.fg,
            Tone::Loading => DEFAULT_THEME.comment,
            Tone::Repr => DEFAULT_THEME.repr,
            Tone::Cycle => DEFAULT_THEME.secondary,
            Tone::Error => DEFAULT_THEME.error,
        };
        Style::default().fg(fg)
    }
}

/// One prepared row
#[derive(Debug, Clone)]
pub struct RowView {
    pub depth: usize,
    pub marker: Marker,
    pub tone: Tone,
    pub text: String,
}

/// Scroll state for the tree pane
#[derive(Debug, Default)]
pub struct TreeScrollState {
    pub offset: usize,
    /// Rows that fit in the pane at the last render
    pub page: usize,
}

/// Keep `selected` inside the window of `height` rows starting at `offset`
pub fn scroll_to_selection(offset: usize, selected: usize, height: usize) -> usize {
    let height = height.max(1);
    if selected < offset {
        selected
    } else if selected >= offset + height {
        selected + 1 - height
    } else {
        offset
    }
}

/// Render the tree pane
pub fn render_tree_pane(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    rows: &[RowView],
    selected: usize,
    scroll_state: &mut TreeScrollState,
) {
    let block = Block::default()
        .title(format!(" {} ", title))
        .borders(Borders::ALL)
        .border_style(
            Style::default()
                .fg(DEFAULT_THEME.border_focused)
                .add_modifier(Modifier::BOLD),
        );

    let visible_height = area.height.saturating_sub(2).max(1) as usize; // borders
    scroll_state.page = visible_height;
    scroll_state.offset = scroll_to_selection(scroll_state.offset, selected, visible_height);

    let items: Vec<ListItem> = rows
        .iter()
        .enumerate()
        .skip(scroll_state.offset)
        .take(visible_height)
        .map(|(i, row)| {
            let line = Line::from(vec![
                Span::raw("  ".repeat(row.depth)),
                Span::styled(row.marker.symbol(), Style::default().fg(DEFAULT_THEME.comment)),
                Span::styled(row.text.clone(), row.tone.style()),
            ]);
            let item = ListItem::new(line);
            if i == selected {
                item.style(
                    Style::default()
                        .bg(DEFAULT_THEME.selected_bg)
                        .add_modifier(Modifier::BOLD),
                )
            } else {
                item
            }
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scroll_follows_selection() {
        assert_eq!(scroll_to_selection(0, 3, 10), 0);
        assert_eq!(scroll_to_selection(0, 12, 10), 3);
        assert_eq!(scroll_to_selection(5, 2, 10), 2);
        assert_eq!(scroll_to_selection(0, 0, 0), 0);
    }
}
