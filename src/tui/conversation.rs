//! Conversation screen: message bubbles, compose bar and staff actions.

use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Widget},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use super::backend::BackendCommand;
use super::input::TextInput;
use crate::format;
use crate::models::{Capability, Message, SenderType, User};
use crate::store::StoreState;

/// Bubbles take at most this share of the width.
const BUBBLE_WIDTH_PERCENT: usize = 70;

#[derive(Debug)]
pub struct ConversationView {
    pub id: String,
    pub compose: TextInput,
    pub photo: TextInput,
    photo_focus: bool,
    /// Lines scrolled up from the newest message.
    scroll_back: usize,
}

impl ConversationView {
    pub fn new(id: String) -> Self {
        Self {
            id,
            compose: TextInput::default(),
            photo: TextInput::default(),
            photo_focus: false,
            scroll_back: 0,
        }
    }

    pub fn editing_photo(&self) -> bool {
        self.photo_focus
    }

    pub fn handle_key(
        &mut self,
        key: KeyEvent,
        user: &User,
        state: &StoreState,
    ) -> Option<BackendCommand> {
        let closed = state
            .conversation(&self.id)
            .map_or(true, |c| c.status.is_closed());
        let staff = user.can(Capability::ManageConversations);
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::PageUp => {
                self.scroll_back += 5;
                return None;
            }
            KeyCode::PageDown => {
                self.scroll_back = self.scroll_back.saturating_sub(5);
                return None;
            }
            KeyCode::Char('a') if ctrl && staff && !closed => {
                return Some(BackendCommand::Assign(self.id.clone()))
            }
            KeyCode::Char('x') if ctrl && staff && !closed => {
                return Some(BackendCommand::CloseConversation(self.id.clone()))
            }
            KeyCode::Char('p') if ctrl => {
                self.photo_focus = !self.photo_focus;
                return None;
            }
            KeyCode::Esc if self.photo_focus => {
                self.photo_focus = false;
                return None;
            }
            KeyCode::Enter => {
                if closed || (self.compose.is_blank() && self.photo.is_blank()) {
                    return None;
                }
                let text = self.compose.take();
                let photo = self.photo.take();
                self.photo_focus = false;
                self.scroll_back = 0;
                return Some(BackendCommand::SendMessage {
                    conversation_id: self.id.clone(),
                    text,
                    photo_url: Some(photo).filter(|p| !p.trim().is_empty()),
                });
            }
            _ => {}
        }

        if closed {
            return None;
        }
        if self.photo_focus {
            self.photo.handle_key(key);
        } else {
            self.compose.handle_key(key);
        }
        None
    }
}

/// Word-wrap `text` to `width` columns. Long words are split.
fn wrap(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return Vec::new();
    }
    let mut out = Vec::new();
    for raw in text.lines() {
        let mut current = String::new();
        for word in raw.split_whitespace() {
            let mut word = word.to_string();
            while word.width() > width {
                if !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                }
                let mut used = 0;
                let taken = word
                    .chars()
                    .take_while(|ch| {
                        used += ch.width().unwrap_or(0);
                        used <= width
                    })
                    .count()
                    .max(1);
                out.push(word.chars().take(taken).collect());
                word = word.chars().skip(taken).collect();
            }
            if current.is_empty() {
                current = word;
            } else if current.width() + 1 + word.width() <= width {
                current.push(' ');
                current.push_str(&word);
            } else {
                out.push(std::mem::replace(&mut current, word));
            }
        }
        out.push(current);
    }
    out
}

#[derive(Clone, Copy, PartialEq, Debug)]
enum Side {
    Left,
    Right,
    Center,
}

/// Resident and bot on the left, staff on the right, system notes centered.
fn side_for(message: &Message) -> Side {
    match message.sender_type {
        SenderType::Manager => Side::Right,
        SenderType::System => Side::Center,
        SenderType::Visitor | SenderType::Bot => Side::Left,
    }
}

fn place(text: String, side: Side, width: usize, style: Style) -> Line<'static> {
    let w = text.width();
    let pad = match side {
        Side::Left => 1,
        Side::Right => width.saturating_sub(w + 1),
        Side::Center => width.saturating_sub(w) / 2,
    };
    Line::from(vec![Span::raw(" ".repeat(pad)), Span::styled(text, style)])
}

fn bubble_lines(message: &Message, width: usize) -> Vec<Line<'static>> {
    let side = side_for(message);
    let mut lines = Vec::new();

    if side == Side::Center {
        let style = Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC);
        for l in wrap(&message.body, width.saturating_sub(4)) {
            lines.push(place(format!("- {} -", l), side, width, style));
        }
        lines.push(Line::from(""));
        return lines;
    }

    let bubble_width = (width * BUBBLE_WIDTH_PERCENT / 100).max(12);
    let (fg, bg) = match (side, message.sender_type) {
        (Side::Right, _) => (Color::Black, Color::Cyan),
        (_, SenderType::Bot) => (Color::White, Color::Magenta),
        _ => (Color::White, Color::DarkGray),
    };
    let body_style = Style::default().fg(fg).bg(bg);

    let header = format!(
        "{} · {}",
        message.sender_name,
        format::relative_time(message.created_at, Utc::now())
    );
    lines.push(place(
        format::truncate(&header, bubble_width),
        side,
        width,
        Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD),
    ));

    let mut body = if message.body.trim().is_empty() {
        Vec::new()
    } else {
        wrap(&message.body, bubble_width.saturating_sub(2))
    };
    if let Some(url) = &message.photo_url {
        body.push(format::truncate(&format!("[photo] {}", url), bubble_width.saturating_sub(2)));
    }
    let inner = body.iter().map(|l| l.width()).max().unwrap_or(0);
    for l in body {
        let padded = format!(" {}{} ", l, " ".repeat(inner - l.width()));
        lines.push(place(padded, side, width, body_style));
    }
    lines.push(Line::from(""));
    lines
}

fn render_header(area: Rect, buf: &mut Buffer, view: &ConversationView, state: &StoreState, live: bool) {
    let Some(c) = state.conversation(&view.id) else {
        Paragraph::new(" Conversation not found").render(area, buf);
        return;
    };
    let mut spans = vec![
        Span::styled(
            format!(" {} ", c.visitor_alias),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(
                "{}{} ",
                c.property.name,
                c.unit.as_ref().map(|u| format!(" {}", u.label)).unwrap_or_default()
            ),
            Style::default().fg(Color::Gray),
        ),
        Span::styled(
            format!("[{}] ", format::conversation_status_label(c.status)),
            Style::default().fg(Color::Yellow),
        ),
    ];
    if let Some(a) = &c.assigned_to {
        spans.push(Span::styled(
            format!("→ {} ", a.name),
            Style::default().fg(Color::Green),
        ));
    }
    if let Some(case_ref) = &c.case_ref {
        spans.push(Span::styled(
            format!("#{} ", case_ref),
            Style::default().fg(Color::DarkGray),
        ));
    }
    spans.push(if live {
        Span::styled("● live", Style::default().fg(Color::Green))
    } else {
        Span::styled("○ offline", Style::default().fg(Color::DarkGray))
    });
    Paragraph::new(Line::from(spans))
        .style(Style::default().bg(Color::Black))
        .render(area, buf);

    let linked = state.maintenance_for_conversation(&view.id);
    if let Some(m) = linked.first() {
        if area.height > 1 {
            let line = Line::from(Span::styled(
                format!(
                    " Maintenance: {} [{}]",
                    m.title,
                    format::maintenance_status_label(m.status)
                ),
                Style::default().fg(Color::Cyan),
            ));
            Paragraph::new(line).render(Rect::new(area.x, area.y + 1, area.width, 1), buf);
        }
    }
}

fn render_timeline(area: Rect, buf: &mut Buffer, view: &ConversationView, state: &StoreState) {
    let width = area.width as usize;
    let lines: Vec<Line<'static>> = state
        .messages_for(&view.id)
        .into_iter()
        .flat_map(|m| bubble_lines(m, width))
        .collect();

    let height = area.height as usize;
    let max_back = lines.len().saturating_sub(height);
    let back = view.scroll_back.min(max_back);
    let start = lines.len().saturating_sub(height + back);

    for (row, line) in lines.iter().skip(start).take(height).enumerate() {
        Paragraph::new(line.clone()).render(
            Rect::new(area.x, area.y + row as u16, area.width, 1),
            buf,
        );
    }
}

pub fn render(
    frame: &mut Frame,
    area: Rect,
    view: &ConversationView,
    user: &User,
    state: &StoreState,
    live: bool,
) {
    let [header_area, timeline_area, compose_area, hint_area] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Fill(1),
        Constraint::Length(4),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(header_area, frame.buffer_mut(), view, state, live);
    render_timeline(timeline_area, frame.buffer_mut(), view, state);

    let closed = state
        .conversation(&view.id)
        .map_or(true, |c| c.status.is_closed());
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(if closed { Color::DarkGray } else { Color::Yellow }));
    let inner = block.inner(compose_area);
    frame.render_widget(block, compose_area);

    if closed {
        frame.render_widget(
            Paragraph::new(Span::styled(
                " This conversation is closed.",
                Style::default().fg(Color::DarkGray),
            )),
            inner,
        );
    } else if inner.height >= 2 {
        let [text_row, photo_row] =
            Layout::vertical([Constraint::Length(1), Constraint::Length(1)]).areas(inner);
        view.compose
            .render(frame, text_row, "", "Type a reply…", !view.photo_focus);
        view.photo
            .render(frame, photo_row, "Photo", "Ctrl+P to attach a photo URL", view.photo_focus);
    }

    let mut hints = vec!["Enter send", "Ctrl+P photo", "PgUp/PgDn scroll", "Esc back"];
    if user.can(Capability::ManageConversations) && !closed {
        hints.insert(1, "Ctrl+A assign to me");
        hints.insert(2, "Ctrl+X close");
    }
    frame.render_widget(
        Paragraph::new(Span::styled(
            format!(" {}", hints.join("  ·  ")),
            Style::default().fg(Color::DarkGray),
        )),
        hint_area,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake;
    use crate::models::{ConversationStatus, Role};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn state(status: ConversationStatus) -> StoreState {
        StoreState {
            conversations: vec![fake::conversation("c1", status, 0)],
            messages: vec![fake::message("m1", "c1", 0)],
            ..Default::default()
        }
    }

    fn type_into(view: &mut ConversationView, user: &User, s: &StoreState, text: &str) {
        for c in text.chars() {
            view.handle_key(key(KeyCode::Char(c)), user, s);
        }
    }

    #[test]
    fn test_enter_sends_text_and_photo() {
        let s = state(ConversationStatus::Assigned);
        let user = fake::user("pm", "Pat", Role::Manager);
        let mut view = ConversationView::new("c1".into());

        assert!(view.handle_key(key(KeyCode::Enter), &user, &s).is_none());

        type_into(&mut view, &user, &s, "On my way");
        view.handle_key(ctrl('p'), &user, &s);
        type_into(&mut view, &user, &s, "https://x/y.jpg");
        let cmd = view.handle_key(key(KeyCode::Enter), &user, &s);
        match cmd {
            Some(BackendCommand::SendMessage {
                conversation_id,
                text,
                photo_url,
            }) => {
                assert_eq!(conversation_id, "c1");
                assert_eq!(text, "On my way");
                assert_eq!(photo_url.as_deref(), Some("https://x/y.jpg"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(view.compose.value().is_empty());
        assert!(!view.editing_photo());
    }

    #[test]
    fn test_staff_actions_need_capability() {
        let s = state(ConversationStatus::New);
        let mut view = ConversationView::new("c1".into());

        let tenant = fake::user("t", "Tess", Role::Tenant);
        assert!(view.handle_key(ctrl('a'), &tenant, &s).is_none());

        let manager = fake::user("pm", "Pat", Role::Manager);
        assert!(matches!(
            view.handle_key(ctrl('a'), &manager, &s),
            Some(BackendCommand::Assign(_))
        ));
        assert!(matches!(
            view.handle_key(ctrl('x'), &manager, &s),
            Some(BackendCommand::CloseConversation(_))
        ));
    }

    #[test]
    fn test_closed_conversation_takes_no_input() {
        let s = state(ConversationStatus::Closed);
        let user = fake::user("pm", "Pat", Role::Manager);
        let mut view = ConversationView::new("c1".into());
        type_into(&mut view, &user, &s, "hello");
        assert!(view.compose.value().is_empty());
        assert!(view.handle_key(ctrl('x'), &user, &s).is_none());
    }

    #[test]
    fn test_wrap() {
        assert_eq!(wrap("one two three", 7), vec!["one two", "three"]);
        assert_eq!(wrap("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(wrap("a\nb", 10), vec!["a", "b"]);
        assert!(wrap("anything", 0).is_empty());
    }

    #[test]
    fn test_bubble_sides() {
        let mut m = fake::message("m1", "c1", 0);
        assert_eq!(side_for(&m), Side::Left);
        m.sender_type = SenderType::Manager;
        assert_eq!(side_for(&m), Side::Right);
        m.sender_type = SenderType::System;
        assert_eq!(side_for(&m), Side::Center);

        m.sender_type = SenderType::Manager;
        m.photo_url = Some("https://cdn/p.jpg".into());
        let lines = bubble_lines(&m, 60);
        // header, body, photo, spacer
        assert_eq!(lines.len(), 4);
    }
}
