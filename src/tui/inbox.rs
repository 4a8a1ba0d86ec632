//! Inbox tab: conversation list with filter cycling.

use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};
use unicode_width::UnicodeWidthStr;

use crate::format;
use crate::models::{Conversation, ConversationStatus};
use crate::store::{InboxFilter, StoreState};

#[derive(Debug, Default)]
pub struct InboxState {
    pub filter: InboxFilter,
    pub selected: usize,
}

impl InboxState {
    pub fn clamp(&mut self, state: &StoreState) {
        let len = state.conversations(self.filter).len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    /// Returns the conversation id to open on Enter.
    pub fn handle_key(&mut self, key: KeyEvent, state: &StoreState) -> Option<String> {
        let rows = state.conversations(self.filter);
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < rows.len() {
                    self.selected += 1;
                }
            }
            KeyCode::Home | KeyCode::Char('g') => self.selected = 0,
            KeyCode::End | KeyCode::Char('G') => self.selected = rows.len().saturating_sub(1),
            KeyCode::Char('f') => {
                self.filter = self.filter.next();
                self.selected = 0;
            }
            KeyCode::Enter => return rows.get(self.selected).map(|c| c.id.clone()),
            _ => {}
        }
        None
    }
}

fn status_color(status: ConversationStatus) -> Color {
    match status {
        ConversationStatus::New => Color::Cyan,
        ConversationStatus::Assigned => Color::Green,
        ConversationStatus::WaitingReply => Color::Yellow,
        ConversationStatus::Closed => Color::DarkGray,
    }
}

/// Keep the selected row on screen.
fn scroll_offset(selected: usize, height: usize, total: usize) -> usize {
    if height == 0 || total <= height || selected < height {
        return 0;
    }
    (selected + 1 - height).min(total - height)
}

fn row_line(c: &Conversation, selected: bool, width: usize) -> Line<'static> {
    let base = if selected {
        Style::default().bg(Color::DarkGray).fg(Color::White)
    } else {
        Style::default()
    };
    let name_style = if c.unread_count > 0 {
        base.add_modifier(Modifier::BOLD)
    } else {
        base
    };

    let badge = if c.unread_count > 0 {
        format!("({}) ", c.unread_count)
    } else {
        String::new()
    };
    let status = format!("[{}]", format::conversation_status_label(c.status));
    let when = format::relative_time(c.last_activity_at, Utc::now());
    let place = match &c.unit {
        Some(u) => format!("{} {}", c.property.name, u.label),
        None => c.property.name.clone(),
    };
    let flags = match (c.bot_active, c.escalated) {
        (_, true) => " !",
        (true, false) => " bot",
        _ => "",
    };

    let fixed = badge.width() + status.width() + when.width() + flags.width() + 4;
    let name_budget = width.saturating_sub(fixed) / 2;
    let name = format::truncate(&c.visitor_alias, name_budget.max(4));
    let place_budget = width.saturating_sub(fixed + name.width());
    let place = format::truncate(&place, place_budget);
    let pad = width.saturating_sub(fixed + name.width() + place.width());

    Line::from(vec![
        Span::styled(badge, base.fg(Color::Yellow).add_modifier(Modifier::BOLD)),
        Span::styled(name, name_style),
        Span::styled(" ", base),
        Span::styled(place, base.fg(Color::Gray)),
        Span::styled(" ".repeat(pad), base),
        Span::styled(flags.to_string(), base.fg(Color::Red)),
        Span::styled(" ", base),
        Span::styled(status, base.fg(status_color(c.status))),
        Span::styled(" ", base),
        Span::styled(when, base.fg(Color::DarkGray)),
        Span::styled(" ", base),
    ])
}

pub fn render(area: Rect, buf: &mut Buffer, inbox: &InboxState, state: &StoreState) {
    let filters: Vec<Span> = InboxFilter::ALL
        .iter()
        .flat_map(|f| {
            let style = if *f == inbox.filter {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            [Span::styled(format!(" {} ", f.label()), style), Span::raw("|")]
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Line::from(filters));
    let inner = block.inner(area);
    block.render(area, buf);
    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let rows = state.conversations(inbox.filter);
    if rows.is_empty() {
        Paragraph::new(Span::styled(
            " No conversations here. Press f to change the filter.",
            Style::default().fg(Color::DarkGray),
        ))
        .render(inner, buf);
        return;
    }

    let height = inner.height as usize;
    let offset = scroll_offset(inbox.selected, height, rows.len());
    for (row, (idx, c)) in rows.iter().enumerate().skip(offset).take(height).enumerate() {
        let line_area = Rect::new(inner.x, inner.y + row as u16, inner.width, 1);
        Paragraph::new(row_line(c, idx == inbox.selected, inner.width as usize))
            .render(line_area, buf);
    }
}
